use bevy::math::Vec2;

use crate::tilemap::GridWorld;

/// Axis-aligned box anchored at its top-left corner. World space is y-down.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Aabb {
    pub min: Vec2,
    pub size: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    pub fn from_center(center: Vec2, half: f32) -> Self {
        Self {
            min: center - Vec2::splat(half),
            size: Vec2::splat(half * 2.0),
        }
    }

    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    pub fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }

    /// Strict overlap; touching edges do not count.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        let a_max = self.max();
        let b_max = other.max();
        self.min.x < b_max.x
            && a_max.x > other.min.x
            && self.min.y < b_max.y
            && a_max.y > other.min.y
    }
}

/// Position, extent and velocity of anything that moves through the grid.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Body {
    pub pos: Vec2,
    pub size: Vec2,
    pub vel: Vec2,
}

impl Body {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Self {
            pos,
            size,
            vel: Vec2::ZERO,
        }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::new(self.pos, self.size)
    }

    pub fn bottom(&self) -> f32 {
        self.pos.y + self.size.y
    }

    pub fn feet_x(&self) -> f32 {
        self.pos.x + self.size.x * 0.5
    }

    pub fn mid_y(&self) -> f32 {
        self.pos.y + self.size.y * 0.5
    }
}

/// Outcome of the end-of-tick ground check.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GroundContact {
    pub grounded: bool,
    /// Vertical speed at touchdown exceeded the landing threshold.
    pub hard_landing: bool,
}

pub fn apply_gravity(vy: &mut f32, gravity: f32, max_fall: f32) {
    *vy = (*vy + gravity).clamp(-max_fall, max_fall);
}

pub fn damp_horizontal(vx: &mut f32, damping: f32, max_speed: f32) {
    *vx = (*vx * damping).clamp(-max_speed, max_speed);
}

pub fn integrate(body: &mut Body) {
    body.pos += body.vel;
}

/// Samples the tile `sample_depth` pixels below the feet center. If it is
/// non-empty the bottom edge snaps to that tile's top boundary and vertical
/// velocity is zeroed.
pub fn resolve_ground(
    world: &GridWorld,
    body: &mut Body,
    sample_depth: f32,
    landing_speed: f32,
) -> GroundContact {
    let (_, row) = world.cell_of(body.feet_x(), body.bottom() + sample_depth);
    let tile = world.tile_at(body.feet_x(), body.bottom() + sample_depth);
    if tile.is_empty() {
        return GroundContact::default();
    }
    let hard_landing = body.vel.y.abs() > landing_speed;
    body.pos.y = row as f32 * world.tile_size() - body.size.y;
    body.vel.y = 0.0;
    GroundContact {
        grounded: true,
        hard_landing,
    }
}

/// Probe one pixel past the leading edge at mid height.
pub fn blocked_ahead(world: &GridWorld, body: &Body) -> bool {
    let ahead_x = if body.vel.x > 0.0 {
        body.pos.x + body.size.x + 1.0
    } else {
        body.pos.x - 1.0
    };
    world.tile_at(ahead_x, body.mid_y()).is_supporting()
}
