use bevy::math::Vec2;
use rand::Rng;
use serde::Serialize;

use crate::audio::AudioCue;
use crate::components::{Tile, Tuning, PLAYER_HEIGHT, PLAYER_WIDTH};
use crate::events::{GameEventBus, SimEvent};
use crate::input::InputState;
use crate::particles::{Burst, ParticleSystem, DIRT_COLOR};
use crate::physics_core::{apply_gravity, damp_horizontal, integrate, resolve_ground, Body};
use crate::tilemap::GridWorld;

/// Position used when a level has no spawn marker.
pub const FALLBACK_SPAWN: Vec2 = Vec2::new(40.0, 40.0);

/// One-shot actions fire on the first held tick and re-arm on release.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ActionLatches {
    pub jump: bool,
    pub dash: bool,
    pub mine: bool,
}

/// What the player tick reports back to the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerTickOutcome {
    /// The player dropped past the bottom of the world.
    pub fell_into_void: bool,
}

/// The controllable character. Lives for the whole process; level loads only
/// reposition it.
#[derive(Clone, Debug, Serialize)]
pub struct Player {
    pub body: Body,
    /// `1.0` facing right, `-1.0` facing left.
    pub facing: f32,
    pub grounded: bool,
    pub can_double_jump: bool,
    pub dash_cooldown: f32,
    pub health: i32,
    pub souls: u32,
    pub latches: ActionLatches,
}

impl Player {
    pub fn new(health: i32) -> Self {
        Self {
            body: Body::new(FALLBACK_SPAWN, Vec2::new(PLAYER_WIDTH, PLAYER_HEIGHT)),
            facing: 1.0,
            grounded: false,
            can_double_jump: false,
            dash_cooldown: 0.0,
            health,
            souls: 0,
            latches: ActionLatches::default(),
        }
    }

    /// Spawn cell for a marker at (`col`, `row`): inset 4 px from the cell's
    /// left edge and standing on the cell's bottom edge.
    pub fn spawn_position(col: i32, row: i32, tile_size: f32) -> Vec2 {
        Vec2::new(
            col as f32 * tile_size + 4.0,
            (row + 1) as f32 * tile_size - PLAYER_HEIGHT,
        )
    }

    /// Moves the player to `pos` and drops any motion carried from before.
    pub fn place_at(&mut self, pos: Vec2) {
        self.body.pos = pos;
        self.body.vel = Vec2::ZERO;
        self.grounded = false;
    }

    pub fn center(&self) -> Vec2 {
        self.body.aabb().center()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        input: InputState,
        world: &mut GridWorld,
        tuning: &Tuning,
        dt_ms: f32,
        rng: &mut impl Rng,
        particles: &mut ParticleSystem,
        events: &mut GameEventBus,
    ) -> PlayerTickOutcome {
        self.steer(input, tuning);
        apply_gravity(
            &mut self.body.vel.y,
            tuning.gravity * tuning.player_gravity_scale,
            tuning.max_fall,
        );
        self.handle_jump(input.jump, tuning, events);
        self.handle_dash(input.dash, tuning, dt_ms, events);

        integrate(&mut self.body);
        self.body.pos.x = self
            .body
            .pos
            .x
            .clamp(0.0, (world.width_px() - self.body.size.x).max(0.0));

        let contact = resolve_ground(world, &mut self.body, 1.0, tuning.landing_speed);
        if contact.grounded {
            if contact.hard_landing {
                events.cue(AudioCue::Land);
            }
            self.can_double_jump = true;
        }
        self.grounded = contact.grounded;

        let fell_into_void = self.body.pos.y > world.height_px() + tuning.void_margin;

        if input.mine && !self.latches.mine {
            self.latches.mine = true;
            self.mine(world, tuning, rng, particles, events);
        }
        if !input.mine {
            self.latches.mine = false;
        }

        PlayerTickOutcome { fell_into_void }
    }

    fn steer(&mut self, input: InputState, tuning: &Tuning) {
        if input.left {
            self.body.vel.x -= tuning.player_accel;
            self.facing = -1.0;
        }
        if input.right {
            self.body.vel.x += tuning.player_accel;
            self.facing = 1.0;
        }
        damp_horizontal(
            &mut self.body.vel.x,
            tuning.horizontal_damping,
            tuning.player_max_speed,
        );
    }

    fn handle_jump(&mut self, held: bool, tuning: &Tuning, events: &mut GameEventBus) {
        if held && !self.latches.jump {
            self.latches.jump = true;
            if self.grounded {
                self.body.vel.y = -tuning.jump_impulse;
                self.grounded = false;
                self.can_double_jump = true;
                events.cue(AudioCue::Jump);
            } else if self.can_double_jump {
                self.body.vel.y = -tuning.double_jump_impulse;
                self.can_double_jump = false;
                events.cue(AudioCue::Jump);
            }
        }
        if !held {
            self.latches.jump = false;
        }
    }

    /// The impulse lands after the speed clamp, so a dash is the one tick
    /// where horizontal speed may exceed the run cap.
    fn handle_dash(&mut self, held: bool, tuning: &Tuning, dt_ms: f32, events: &mut GameEventBus) {
        if held && self.dash_cooldown <= 0.0 && !self.latches.dash {
            self.latches.dash = true;
            self.dash_cooldown = tuning.dash_cooldown;
            self.body.vel.x += self.facing * tuning.dash_impulse;
            events.cue(AudioCue::Dash);
        }
        if !held {
            self.latches.dash = false;
        }
        if self.dash_cooldown > 0.0 {
            self.dash_cooldown = (self.dash_cooldown - dt_ms * tuning.cooldown_rate).max(0.0);
        }
    }

    /// Acts on the cell just ahead of the player at mid height.
    fn mine(
        &mut self,
        world: &mut GridWorld,
        tuning: &Tuning,
        rng: &mut impl Rng,
        particles: &mut ParticleSystem,
        events: &mut GameEventBus,
    ) {
        let ahead_x = self.body.feet_x() + self.facing * tuning.mine_reach;
        let (col, row) = world.cell_of(ahead_x, self.body.mid_y());
        let tile = world.get(col, row);
        let ts = world.tile_size();

        match tile {
            Tile::Dirt | Tile::Stone => {
                world.set_tile(col, row, Tile::Empty);
                let mut burst = Burst::new(
                    Vec2::new(col as f32 * ts + 6.0, row as f32 * ts + 6.0),
                    10,
                    DIRT_COLOR,
                );
                burst.scatter = Vec2::splat(6.0);
                burst.size = (1.0, 1.0);
                particles.burst(&burst, rng);
                events.cue(AudioCue::Mine);
                events.emit(SimEvent::TileMined { col, row, tile });

                if row > 0
                    && world.get(col, row - 1).is_empty()
                    && rng.gen_bool(tuning.soul_drop_chance.clamp(0.0, 1.0))
                {
                    world.set_tile(col, row - 1, Tile::Soul);
                }
            }
            Tile::Soul => {
                world.set_tile(col, row, Tile::Empty);
                self.souls = self.souls.saturating_add(1);
                events.cue(AudioCue::Collect);
                events.emit(SimEvent::SoulCollected { souls: self.souls });
            }
            Tile::Heart => {
                world.set_tile(col, row, Tile::Empty);
                self.health = (self.health + 1).min(tuning.max_health);
                events.cue(AudioCue::Collect);
                events.emit(SimEvent::HeartCollected {
                    health: self.health,
                });
            }
            _ => {}
        }
    }
}
