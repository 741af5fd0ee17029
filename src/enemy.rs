use bevy::math::Vec2;
use rand::Rng;

use crate::actor::{Actor, ActorContext, ActorEvent, ActorSnapshot};
use crate::audio::AudioCue;
use crate::components::{Tuning, ENEMY_SIZE};
use crate::particles::{sample, Burst, ENEMY_COLOR};
use crate::physics_core::{apply_gravity, blocked_ahead, integrate, resolve_ground, Body};

/// Ground enemy that walks back and forth, turning at walls.
#[derive(Clone, Debug)]
pub struct Patroller {
    pub body: Body,
    /// Contact damage is off while recovering from a hit.
    pub active: bool,
    pub reactivate_in_ms: f32,
}

impl Patroller {
    /// Spawned at the top-left of its marker cell with a random speed and
    /// direction.
    pub fn spawn(col: i32, row: i32, tuning: &Tuning, rng: &mut impl Rng) -> Self {
        let speed = sample(rng, tuning.enemy_speed_min, tuning.enemy_speed_max);
        let dir = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let mut body = Body::new(
            Vec2::new(col as f32 * tuning.tile_size, row as f32 * tuning.tile_size),
            Vec2::splat(ENEMY_SIZE),
        );
        body.vel.x = speed * dir;
        Self {
            body,
            active: true,
            reactivate_in_ms: 0.0,
        }
    }
}

impl Actor for Patroller {
    fn tick(&mut self, ctx: &mut ActorContext) -> Vec<ActorEvent> {
        if !self.active {
            self.reactivate_in_ms -= ctx.dt_ms;
            if self.reactivate_in_ms <= 0.0 {
                self.reactivate_in_ms = 0.0;
                self.active = true;
            }
        }

        apply_gravity(
            &mut self.body.vel.y,
            ctx.tuning.gravity * ctx.tuning.enemy_gravity_scale,
            ctx.tuning.max_fall,
        );
        if blocked_ahead(ctx.world, &self.body) {
            self.body.vel.x = -self.body.vel.x;
        }
        integrate(&mut self.body);
        resolve_ground(ctx.world, &mut self.body, 0.0, f32::INFINITY);

        if !self.active || !self.body.aabb().overlaps(&ctx.player.aabb()) {
            return Vec::new();
        }

        self.body.vel.x = -self.body.vel.x;
        self.active = false;
        self.reactivate_in_ms = ctx.tuning.enemy_contact_cooldown_ms;
        ctx.particles.burst(
            &Burst::new(self.body.aabb().center(), 6, ENEMY_COLOR),
            &mut *ctx.rng,
        );
        ctx.events.cue(AudioCue::Hit);
        vec![ActorEvent::HitPlayer { damage: 1 }]
    }

    fn snapshot(&self) -> ActorSnapshot {
        ActorSnapshot::Patroller {
            body: self.body,
            active: self.active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Tile, PLAYER_HEIGHT, PLAYER_WIDTH};
    use crate::events::GameEventBus;
    use crate::particles::ParticleSystem;
    use crate::tilemap::GridWorld;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn corridor() -> GridWorld {
        // Walls at columns 0 and 7, floor on row 2.
        let mut rows = vec![vec![Tile::Empty; 8]; 2];
        for row in rows.iter_mut() {
            row[0] = Tile::Stone;
            row[7] = Tile::Stone;
        }
        rows.push(vec![Tile::Stone; 8]);
        GridWorld::from_rows(&rows, 16.0)
    }

    fn run(
        enemy: &mut Patroller,
        world: &GridWorld,
        player: &Body,
        ticks: usize,
    ) -> Vec<ActorEvent> {
        let tuning = Tuning::default();
        let mut rng = SmallRng::seed_from_u64(5);
        let mut particles = ParticleSystem::new(0.06);
        let mut events = GameEventBus::default();
        let mut out = Vec::new();
        for _ in 0..ticks {
            let mut ctx = ActorContext {
                world,
                player,
                tuning: &tuning,
                dt_ms: 16.0,
                rng: &mut rng,
                particles: &mut particles,
                events: &mut events,
            };
            out.extend(enemy.tick(&mut ctx));
        }
        out
    }

    fn far_player() -> Body {
        Body::new(Vec2::new(-500.0, -500.0), Vec2::new(PLAYER_WIDTH, PLAYER_HEIGHT))
    }

    #[test]
    fn spawn_speed_is_in_range() {
        let tuning = Tuning::default();
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..50 {
            let enemy = Patroller::spawn(3, 1, &tuning, &mut rng);
            let speed = enemy.body.vel.x.abs();
            assert!((0.6..=1.2).contains(&speed), "speed {speed}");
            assert_eq!(enemy.body.pos, Vec2::new(48.0, 16.0));
        }
    }

    #[test]
    fn patrol_turns_at_walls_and_stays_in_corridor() {
        let world = corridor();
        let tuning = Tuning::default();
        let mut rng = SmallRng::seed_from_u64(2);
        let mut enemy = Patroller::spawn(3, 1, &tuning, &mut rng);
        enemy.body.vel.x = 1.0;
        let mut saw_left = false;
        let mut saw_right = false;
        let player = far_player();
        for _ in 0..600 {
            run(&mut enemy, &world, &player, 1);
            saw_left |= enemy.body.vel.x < 0.0;
            saw_right |= enemy.body.vel.x > 0.0;
            assert!(enemy.body.pos.x >= 15.0 && enemy.body.pos.x + 12.0 <= 113.0);
        }
        assert!(saw_left && saw_right);
        assert_eq!(enemy.body.bottom(), 32.0);
    }

    #[test]
    fn contact_hits_once_then_recovers() {
        let world = corridor();
        let tuning = Tuning::default();
        let mut rng = SmallRng::seed_from_u64(4);
        let mut enemy = Patroller::spawn(3, 1, &tuning, &mut rng);
        enemy.body.vel.x = 0.0;
        let player = Body::new(
            enemy.body.pos + Vec2::new(2.0, 0.0),
            Vec2::new(PLAYER_WIDTH, PLAYER_HEIGHT),
        );

        let hits = run(&mut enemy, &world, &player, 1);
        assert_eq!(hits, vec![ActorEvent::HitPlayer { damage: 1 }]);
        assert!(!enemy.active);

        // 600 ms of cooldown at 16 ms per tick.
        let hits = run(&mut enemy, &world, &player, 37);
        assert!(hits.is_empty());
        let hits = run(&mut enemy, &world, &player, 1);
        assert_eq!(hits.len(), 1);
    }
}
