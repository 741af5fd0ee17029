use bevy::prelude::*;
use rand::Rng;

use crate::particles::sample;
use crate::runtime::SessionResource;

/// Shake below this magnitude is dropped to zero.
const SHAKE_EPSILON: f32 = 0.05;

/// Smoothed follow camera in world space (top-left of the viewport).
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct FollowCamera {
    pub position: Vec2,
    pub target: Vec2,
    pub shake: f32,
    /// Jitter applied on top of `position` for display only.
    pub jitter: Vec2,
    pub viewport: Vec2,
    pub smoothing: f32,
    pub shake_decay: f32,
}

impl FollowCamera {
    pub fn new(viewport: Vec2, smoothing: f32, shake_decay: f32) -> Self {
        Self {
            viewport,
            smoothing,
            shake_decay,
            ..Default::default()
        }
    }

    /// Viewport origin that centers `focus`, clamped so the view stays inside
    /// a world of `world_size` pixels.
    pub fn target_for(&self, focus: Vec2, world_size: Vec2) -> Vec2 {
        let max = (world_size - self.viewport).max(Vec2::ZERO);
        (focus - self.viewport * 0.5).clamp(Vec2::ZERO, max)
    }

    /// Jump straight to the target with no smoothing.
    pub fn recenter(&mut self, focus: Vec2, world_size: Vec2) {
        self.target = self.target_for(focus, world_size);
        self.position = self.target;
        self.jitter = Vec2::ZERO;
    }

    pub fn follow(&mut self, focus: Vec2, world_size: Vec2, rng: &mut impl Rng) {
        self.target = self.target_for(focus, world_size);
        self.position += (self.target - self.position) * self.smoothing;

        if self.shake > 0.0 {
            self.shake *= self.shake_decay;
            if self.shake < SHAKE_EPSILON {
                self.shake = 0.0;
            }
        }
        self.jitter = if self.shake > 0.0 {
            Vec2::new(
                sample(rng, -self.shake, self.shake),
                sample(rng, -self.shake, self.shake),
            )
        } else {
            Vec2::ZERO
        };
    }

    /// Shakes do not stack; the larger magnitude wins.
    pub fn add_shake(&mut self, magnitude: f32) {
        self.shake = self.shake.max(magnitude);
    }

    pub fn display_position(&self) -> Vec2 {
        self.position + self.jitter
    }
}

#[derive(Component)]
pub struct MainCamera;

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_camera).add_systems(
            PostUpdate,
            sync_main_camera.before(bevy::transform::TransformSystem::TransformPropagate),
        );
    }
}

/// Pixels on screen per world pixel.
pub const PIXEL_SCALE: f32 = 3.0;

fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        MainCamera,
        Camera2d,
        OrthographicProjection {
            scale: 1.0 / PIXEL_SCALE,
            ..OrthographicProjection::default_2d()
        },
        Transform::from_xyz(0.0, 0.0, 100.0),
    ));
}

/// World space is y-down with the origin at the top-left of the level; Bevy
/// is y-up with the camera at the view center.
fn sync_main_camera(
    session: Res<SessionResource>,
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
) {
    let Ok(mut cam_transform) = camera_query.get_single_mut() else {
        return;
    };
    let camera = session.0.camera();
    let center = camera.display_position() + camera.viewport * 0.5;
    cam_transform.translation.x = center.x;
    cam_transform.translation.y = -center.y;
}
