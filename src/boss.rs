use bevy::math::Vec2;
use rand::Rng;
use serde::Serialize;

use crate::actor::{Actor, ActorContext, ActorEvent, ActorSnapshot};
use crate::audio::AudioCue;
use crate::components::{Tuning, BOSS_SIZE};
use crate::events::{GameEventBus, Narrative, SimEvent};
use crate::particles::sample;
use crate::physics_core::{Aabb, Body};

/// Projectile hitbox edge length.
pub const PROJECTILE_SIZE: f32 = 4.0;
/// Projectiles leave from up to this far off the boss center.
const MUZZLE_SPREAD: f32 = 10.0;

/// Combat stage. Only ever moves forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BossPhase {
    Shielded,
    Vulnerable,
    Enraged,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Projectile {
    pub pos: Vec2,
    pub vel: Vec2,
    pub life_ms: f32,
}

impl Projectile {
    pub fn aabb(&self) -> Aabb {
        Aabb::new(self.pos, Vec2::splat(PROJECTILE_SIZE))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct GuardianSnapshot {
    pub body: Body,
    pub phase: BossPhase,
    pub health: i32,
    pub max_health: i32,
    pub shield: i32,
    pub alive: bool,
    pub timer: f32,
    pub projectiles: Vec<Projectile>,
}

/// The final-level boss. It does not move; it fires homing shots and takes
/// damage from fast impacts into its core.
#[derive(Clone, Debug)]
pub struct CoreGuardian {
    pub body: Body,
    pub max_health: i32,
    pub health: i32,
    pub shield: i32,
    pub phase: BossPhase,
    pub projectiles: Vec<Projectile>,
    pub alive: bool,
    /// Cosmetic pulse clock; hits push it forward.
    pub timer: f32,
    hit_cooldown_ms: f32,
    enrage_ratio: f32,
}

impl CoreGuardian {
    pub fn new(pos: Vec2, tuning: &Tuning) -> Self {
        Self {
            body: Body::new(pos, Vec2::splat(BOSS_SIZE)),
            max_health: tuning.boss_health,
            health: tuning.boss_health,
            shield: tuning.boss_shield,
            phase: BossPhase::Shielded,
            projectiles: Vec::new(),
            alive: true,
            timer: 0.0,
            hit_cooldown_ms: 0.0,
            enrage_ratio: tuning.boss_enrage_ratio,
        }
    }

    /// Placed at a fixed fraction of the level size, floored to whole pixels.
    pub fn spawn_in(world_size: Vec2, tuning: &Tuning) -> Self {
        let pos = Vec2::new(
            (world_size.x * tuning.boss_offset.0).floor(),
            (world_size.y * tuning.boss_offset.1).floor(),
        );
        Self::new(pos, tuning)
    }

    pub fn center(&self) -> Vec2 {
        self.body.aabb().center()
    }

    /// Applies one hit. While shielded the damage only wears down the shield.
    /// Returns true when the hit landed on the body.
    pub fn receive_hit(&mut self, damage: i32, events: &mut GameEventBus) -> bool {
        if !self.alive {
            return false;
        }
        if self.phase == BossPhase::Shielded {
            self.shield = (self.shield - damage).max(0);
            self.timer += damage as f32 * 6.0;
            if self.shield == 0 {
                self.phase = BossPhase::Vulnerable;
                events.emit(SimEvent::BossPhaseChanged { phase: self.phase });
                events.cue(AudioCue::BossMusicStart);
                events.emit(SimEvent::Narrative(Narrative::new(
                    "Shield Broken",
                    "The Core's shield collapses. Strike the heart!",
                )));
                events.cue(AudioCue::Hit);
            }
            return false;
        }

        self.health = (self.health - damage).max(0);
        events.cue(AudioCue::Hit);
        if self.health == 0 {
            self.alive = false;
            self.projectiles.clear();
            events.emit(SimEvent::BossDefeated);
        } else if self.phase != BossPhase::Enraged
            && self.health as f32 <= self.max_health as f32 * self.enrage_ratio
        {
            self.phase = BossPhase::Enraged;
            events.emit(SimEvent::BossPhaseChanged { phase: self.phase });
            events.emit(SimEvent::Narrative(Narrative::new(
                "Core Enraged",
                "Attacks intensify!",
            )));
        }
        true
    }

    /// Checks the player against the core region. A hit needs a fast fall or
    /// a dash; plain touching does nothing. Returns `None` when no impact
    /// registered, otherwise whether it was a body hit. Body hits knock the
    /// player back.
    pub fn try_impact(
        &mut self,
        player: &mut Body,
        tuning: &Tuning,
        events: &mut GameEventBus,
    ) -> Option<bool> {
        if !self.alive || self.hit_cooldown_ms > 0.0 {
            return None;
        }
        let core = Aabb::from_center(self.center(), tuning.boss_core_half);
        if !player.aabb().overlaps(&core) {
            return None;
        }
        let impact =
            player.vel.y > tuning.boss_fall_impact || player.vel.x.abs() > tuning.boss_dash_impact;
        if !impact {
            return None;
        }

        self.hit_cooldown_ms = tuning.boss_hit_cooldown_ms;
        let body_hit = self.receive_hit(tuning.boss_impact_damage, events);
        if body_hit {
            player.vel.y = -tuning.boss_knockback_vy;
            player.vel.x *= tuning.boss_knockback_vx_scale;
        }
        Some(body_hit)
    }

    fn fire(&mut self, target: Vec2, tuning: &Tuning, rng: &mut impl Rng) {
        let center = self.center();
        let origin = center
            + Vec2::new(
                sample(rng, -MUZZLE_SPREAD, MUZZLE_SPREAD),
                sample(rng, -MUZZLE_SPREAD, MUZZLE_SPREAD),
            );
        let (lo, hi) = if self.phase == BossPhase::Enraged {
            tuning.projectile_speed_enraged
        } else {
            tuning.projectile_speed
        };
        let speed = sample(rng, lo, hi);
        let dir = (target - origin).try_normalize().unwrap_or(Vec2::X);
        let jitter = tuning.projectile_jitter;
        let vel = dir * speed
            + Vec2::new(
                sample(rng, -jitter, jitter),
                sample(rng, -jitter, jitter),
            );
        self.projectiles.push(Projectile {
            pos: origin,
            vel,
            life_ms: tuning.projectile_life_ms,
        });
    }

    pub fn guardian_snapshot(&self) -> GuardianSnapshot {
        GuardianSnapshot {
            body: self.body,
            phase: self.phase,
            health: self.health,
            max_health: self.max_health,
            shield: self.shield,
            alive: self.alive,
            timer: self.timer,
            projectiles: self.projectiles.clone(),
        }
    }
}

impl Actor for CoreGuardian {
    fn tick(&mut self, ctx: &mut ActorContext) -> Vec<ActorEvent> {
        if !self.alive {
            return Vec::new();
        }
        self.timer += ctx.dt_ms * 0.06;
        self.hit_cooldown_ms = (self.hit_cooldown_ms - ctx.dt_ms).max(0.0);

        let chance = if self.phase == BossPhase::Enraged {
            ctx.tuning.projectile_chance_enraged
        } else {
            ctx.tuning.projectile_chance
        };
        if ctx.rng.gen_bool(chance.clamp(0.0, 1.0)) {
            let target = ctx.player.aabb().center();
            self.fire(target, ctx.tuning, &mut *ctx.rng);
        }

        let player = ctx.player.aabb();
        let gravity = ctx.tuning.projectile_gravity;
        let dt_ms = ctx.dt_ms;
        let mut out = Vec::new();
        self.projectiles.retain_mut(|shot| {
            shot.vel.y += gravity;
            shot.pos += shot.vel;
            shot.life_ms -= dt_ms;
            if shot.aabb().overlaps(&player) {
                out.push(ActorEvent::HitPlayer { damage: 1 });
                return false;
            }
            shot.life_ms > 0.0
        });
        out
    }

    fn snapshot(&self) -> ActorSnapshot {
        ActorSnapshot::Guardian(self.guardian_snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Tile, PLAYER_HEIGHT, PLAYER_WIDTH};
    use crate::particles::ParticleSystem;
    use crate::tilemap::GridWorld;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn guardian() -> CoreGuardian {
        CoreGuardian::new(Vec2::new(100.0, 20.0), &Tuning::default())
    }

    fn dashing_player_at(center: Vec2) -> Body {
        let mut body = Body::new(
            center - Vec2::new(PLAYER_WIDTH, PLAYER_HEIGHT) * 0.5,
            Vec2::new(PLAYER_WIDTH, PLAYER_HEIGHT),
        );
        body.vel.x = 6.0;
        body
    }

    #[test]
    fn spawn_uses_floored_level_fraction() {
        let boss = CoreGuardian::spawn_in(Vec2::new(192.0, 80.0), &Tuning::default());
        assert_eq!(boss.body.pos, Vec2::new(105.0, 20.0));
        assert_eq!(boss.phase, BossPhase::Shielded);
        assert_eq!((boss.health, boss.shield), (36, 14));
    }

    #[test]
    fn seven_dash_impacts_break_the_shield_without_body_damage() {
        let tuning = Tuning::default();
        let mut events = GameEventBus::default();
        let mut boss = guardian();
        for hit in 1..=7 {
            let mut player = dashing_player_at(boss.center());
            assert_eq!(boss.try_impact(&mut player, &tuning, &mut events), Some(false));
            assert_eq!(player.vel.x, 6.0, "no knockback on shield hits");
            boss.hit_cooldown_ms = 0.0;
            if hit < 7 {
                assert_eq!(boss.phase, BossPhase::Shielded);
            }
        }
        assert_eq!(boss.phase, BossPhase::Vulnerable);
        assert_eq!(boss.health, 36);
        assert!(events.contains(&SimEvent::BossPhaseChanged {
            phase: BossPhase::Vulnerable
        }));
    }

    #[test]
    fn slow_touch_does_not_register() {
        let tuning = Tuning::default();
        let mut events = GameEventBus::default();
        let mut boss = guardian();
        let mut player = dashing_player_at(boss.center());
        player.vel = Vec2::new(2.0, 1.0);
        assert_eq!(boss.try_impact(&mut player, &tuning, &mut events), None);
        assert_eq!(boss.shield, 14);
    }

    #[test]
    fn impacts_register_every_overlapping_tick_by_default() {
        let tuning = Tuning::default();
        let mut events = GameEventBus::default();
        let mut boss = guardian();
        let mut player = dashing_player_at(boss.center());
        for _ in 0..3 {
            assert_eq!(boss.try_impact(&mut player, &tuning, &mut events), Some(false));
        }
        assert_eq!(boss.shield, 8);
    }

    #[test]
    fn impacts_are_rate_limited_when_tuned() {
        let tuning = Tuning {
            boss_hit_cooldown_ms: 250.0,
            ..Tuning::default()
        };
        let mut events = GameEventBus::default();
        let mut boss = guardian();
        let mut player = dashing_player_at(boss.center());
        assert!(boss.try_impact(&mut player, &tuning, &mut events).is_some());
        assert!(boss.try_impact(&mut player, &tuning, &mut events).is_none());
        assert_eq!(boss.shield, 12);
    }

    #[test]
    fn body_hits_enrage_then_kill() {
        let mut events = GameEventBus::default();
        let mut boss = guardian();
        boss.phase = BossPhase::Vulnerable;

        let mut last = boss.health;
        while boss.alive {
            assert!(boss.receive_hit(2, &mut events));
            assert!(boss.health < last);
            last = boss.health;
            if boss.health > 0 && boss.health as f32 <= 36.0 * 0.35 {
                assert_eq!(boss.phase, BossPhase::Enraged);
            }
        }
        assert_eq!(boss.health, 0);
        assert!(events.contains(&SimEvent::BossDefeated));
        assert!(!boss.receive_hit(2, &mut events), "dead boss ignores hits");
    }

    #[test]
    fn body_hit_knocks_player_back() {
        let tuning = Tuning::default();
        let mut events = GameEventBus::default();
        let mut boss = guardian();
        boss.phase = BossPhase::Vulnerable;
        let mut player = dashing_player_at(boss.center());
        player.vel.y = 5.0;
        assert_eq!(boss.try_impact(&mut player, &tuning, &mut events), Some(true));
        assert_eq!(player.vel.y, -3.0);
        assert!((player.vel.x - -2.4).abs() < 1e-5);
        assert_eq!(boss.health, 34);
    }

    #[test]
    fn projectiles_home_in_and_hurt_on_contact() {
        let tuning = Tuning {
            projectile_chance: 1.0,
            projectile_jitter: 0.0,
            projectile_gravity: 0.0,
            projectile_life_ms: 100_000.0,
            ..Tuning::default()
        };
        let world = GridWorld::from_rows(&[vec![Tile::Empty; 20]], 16.0);
        let mut boss = guardian();
        let player = Body::new(Vec2::new(20.0, 44.0), Vec2::new(PLAYER_WIDTH, PLAYER_HEIGHT));
        let mut rng = SmallRng::seed_from_u64(8);
        let mut particles = ParticleSystem::new(0.06);
        let mut events = GameEventBus::default();

        let mut hits = 0;
        for _ in 0..200 {
            let mut ctx = ActorContext {
                world: &world,
                player: &player,
                tuning: &tuning,
                dt_ms: 16.0,
                rng: &mut rng,
                particles: &mut particles,
                events: &mut events,
            };
            hits += boss.tick(&mut ctx).len();
        }
        assert!(hits > 0);
        assert!(boss.projectiles.iter().all(|p| p.vel.x < 0.0));
    }

    #[test]
    fn projectiles_expire() {
        let tuning = Tuning {
            projectile_chance: 0.0,
            ..Tuning::default()
        };
        let world = GridWorld::from_rows(&[vec![Tile::Empty; 4]], 16.0);
        let mut boss = guardian();
        boss.projectiles.push(Projectile {
            pos: Vec2::new(500.0, 500.0),
            vel: Vec2::ZERO,
            life_ms: 30.0,
        });
        let player = Body::new(Vec2::ZERO, Vec2::new(PLAYER_WIDTH, PLAYER_HEIGHT));
        let mut rng = SmallRng::seed_from_u64(1);
        let mut particles = ParticleSystem::new(0.06);
        let mut events = GameEventBus::default();
        for _ in 0..2 {
            let mut ctx = ActorContext {
                world: &world,
                player: &player,
                tuning: &tuning,
                dt_ms: 16.0,
                rng: &mut rng,
                particles: &mut particles,
                events: &mut events,
            };
            boss.tick(&mut ctx);
        }
        assert!(boss.projectiles.is_empty());
    }
}
