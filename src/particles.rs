use bevy::math::Vec2;
use rand::Rng;

/// A cosmetic particle. Nothing in the simulation reads these back.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Remaining ticks.
    pub life: u32,
    pub color: [f32; 4],
    pub size: f32,
}

/// Parameters for one particle. Unset fields fall back to the defaults
/// below: white, size 1, drifting upward at 1 px/tick, 40 ticks of life.
#[derive(Clone, Debug)]
pub struct ParticleSpawn {
    pub color: [f32; 4],
    pub size: f32,
    pub vel: Vec2,
    pub life: u32,
}

impl Default for ParticleSpawn {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0, 1.0],
            size: 1.0,
            vel: Vec2::new(0.0, -1.0),
            life: 40,
        }
    }
}

impl ParticleSpawn {
    pub fn colored(color: [f32; 4]) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    pub fn size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn velocity(mut self, vel: Vec2) -> Self {
        self.vel = vel;
        self
    }
}

/// A cloud of particles scattered around a point.
#[derive(Clone, Debug)]
pub struct Burst {
    pub origin: Vec2,
    pub count: usize,
    /// Spawn positions are offset by up to this much on each axis.
    pub scatter: Vec2,
    pub color: [f32; 4],
    pub size: (f32, f32),
    pub vel_x: (f32, f32),
    pub vel_y: (f32, f32),
}

impl Burst {
    pub fn new(origin: Vec2, count: usize, color: [f32; 4]) -> Self {
        Self {
            origin,
            count,
            scatter: Vec2::ZERO,
            color,
            size: (2.0, 2.0),
            vel_x: (-1.0, 1.0),
            vel_y: (-2.0, -0.2),
        }
    }
}

pub const DIRT_COLOR: [f32; 4] = [0.227, 0.169, 0.165, 1.0];
pub const ENEMY_COLOR: [f32; 4] = [0.804, 0.682, 1.0, 1.0];
pub const HURT_COLOR: [f32; 4] = [1.0, 0.541, 0.541, 1.0];
pub const BOSS_BURST_COLOR: [f32; 4] = [1.0, 0.839, 0.839, 1.0];

#[derive(Default, Clone, Debug)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    gravity: f32,
}

impl ParticleSystem {
    pub fn new(gravity: f32) -> Self {
        Self {
            particles: Vec::new(),
            gravity,
        }
    }

    pub fn spawn(&mut self, pos: Vec2, params: ParticleSpawn) {
        self.particles.push(Particle {
            pos,
            vel: params.vel,
            life: params.life,
            color: params.color,
            size: params.size,
        });
    }

    pub fn burst(&mut self, burst: &Burst, rng: &mut impl Rng) {
        for _ in 0..burst.count {
            let offset = Vec2::new(
                sample(rng, -burst.scatter.x, burst.scatter.x),
                sample(rng, -burst.scatter.y, burst.scatter.y),
            );
            let params = ParticleSpawn::colored(burst.color)
                .size(sample(rng, burst.size.0, burst.size.1))
                .velocity(Vec2::new(
                    sample(rng, burst.vel_x.0, burst.vel_x.1),
                    sample(rng, burst.vel_y.0, burst.vel_y.1),
                ));
            self.spawn(burst.origin + offset, params);
        }
    }

    pub fn update(&mut self) {
        let gravity = self.gravity;
        self.particles.retain_mut(|p| {
            p.pos += p.vel;
            p.vel.y += gravity;
            p.life = p.life.saturating_sub(1);
            p.life > 0
        });
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }
}

/// Uniform sample in `[min, max)`, or `min` for an empty range.
pub fn sample(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn spawn_uses_documented_defaults() {
        let mut system = ParticleSystem::new(0.06);
        system.spawn(Vec2::new(5.0, 5.0), ParticleSpawn::default());
        let p = system.iter().next().expect("particle spawned");
        assert_eq!(p.life, 40);
        assert_eq!(p.size, 1.0);
        assert_eq!(p.vel, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn particles_drift_and_expire() {
        let mut system = ParticleSystem::new(0.5);
        system.spawn(
            Vec2::ZERO,
            ParticleSpawn {
                life: 2,
                ..ParticleSpawn::colored(DIRT_COLOR).velocity(Vec2::new(1.0, 0.0))
            },
        );
        system.update();
        let p = system.iter().next().expect("still alive");
        assert_eq!(p.pos, Vec2::new(1.0, 0.0));
        assert_eq!(p.vel.y, 0.5);
        system.update();
        assert!(system.is_empty());
    }

    #[test]
    fn burst_spawns_requested_count_within_scatter() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut system = ParticleSystem::new(0.06);
        let mut burst = Burst::new(Vec2::new(100.0, 100.0), 120, BOSS_BURST_COLOR);
        burst.scatter = Vec2::splat(40.0);
        burst.size = (2.0, 4.0);
        system.burst(&burst, &mut rng);
        assert_eq!(system.len(), 120);
        for p in system.iter() {
            assert!((p.pos.x - 100.0).abs() <= 40.0);
            assert!(p.size >= 2.0 && p.size <= 4.0);
            assert!(p.vel.y < 0.0);
        }
    }
}
