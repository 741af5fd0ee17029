use bevy::prelude::*;
use bevy::utils::Instant;

use crate::actor::ActorSnapshot;
use crate::boss::{BossPhase, PROJECTILE_SIZE};
use crate::components::Tile;
use crate::perf::PerfAccum;
use crate::runtime::SessionResource;

const Z_TILES: f32 = 1.0;
const Z_ENEMIES: f32 = 2.0;
const Z_BOSS: f32 = 3.0;
const Z_PLAYER: f32 = 4.0;
const Z_PARTICLES: f32 = 5.0;

pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (sync_tile_sprites, sync_dynamic_sprites)
                .chain()
                .after(crate::runtime::tick_session),
        );
    }
}

#[derive(Component)]
struct TileSprite;

/// Redrawn from the snapshot every frame.
#[derive(Component)]
struct DynamicSprite;

fn tile_color(tile: Tile) -> Option<Color> {
    match tile {
        Tile::Dirt => Some(Color::srgb_u8(0x3a, 0x2b, 0x2a)),
        Tile::Stone => Some(Color::srgb_u8(0x4a, 0x50, 0x58)),
        Tile::Grass => Some(Color::srgb_u8(0x2f, 0x6b, 0x5f)),
        Tile::Soul => Some(Color::srgb_u8(0xd4, 0xf0, 0xff)),
        Tile::Heart => Some(Color::srgb_u8(0xff, 0x8f, 0xa0)),
        Tile::Exit => Some(Color::srgba(1.0, 1.0, 1.0, 0.35)),
        Tile::Empty | Tile::EnemyMarker | Tile::SpawnMarker => None,
    }
}

/// Inset and edge length of a tile's drawn square.
fn tile_rect(tile: Tile, tile_size: f32) -> (f32, f32) {
    match tile {
        Tile::Soul | Tile::Heart => (tile_size * 0.25, tile_size * 0.5),
        Tile::Exit => (2.0, tile_size - 4.0),
        _ => (0.0, tile_size),
    }
}

/// World space is y-down from the level's top-left; sprites are centered.
fn world_transform(min: Vec2, size: Vec2, z: f32) -> Transform {
    let center = min + size * 0.5;
    Transform::from_xyz(center.x, -center.y, z)
}

fn sync_tile_sprites(
    mut commands: Commands,
    session: Res<SessionResource>,
    mut last_drawn: Local<Option<(u64, u64)>>,
    existing: Query<Entity, With<TileSprite>>,
) {
    let session = &session.0;
    let world = session.world();
    let key = (session.generation(), world.revision());
    if *last_drawn == Some(key) {
        return;
    }
    *last_drawn = Some(key);

    for entity in existing.iter() {
        commands.entity(entity).despawn_recursive();
    }
    let ts = world.tile_size();
    for (col, row, tile) in world.occupied() {
        let Some(color) = tile_color(tile) else {
            continue;
        };
        let (inset, edge) = tile_rect(tile, ts);
        let min = Vec2::new(col as f32 * ts + inset, row as f32 * ts + inset);
        commands.spawn((
            Sprite::from_color(color, Vec2::splat(edge)),
            world_transform(min, Vec2::splat(edge), Z_TILES),
            TileSprite,
        ));
    }
}

fn boss_color(phase: BossPhase) -> Color {
    match phase {
        BossPhase::Shielded => Color::srgb_u8(0x9b, 0xb8, 0xff),
        BossPhase::Vulnerable => Color::srgb_u8(0xff, 0x9b, 0x9b),
        BossPhase::Enraged => Color::srgb_u8(0xff, 0x5a, 0x5a),
    }
}

fn sync_dynamic_sprites(
    mut commands: Commands,
    session: Res<SessionResource>,
    perf: Option<ResMut<PerfAccum>>,
    existing: Query<Entity, With<DynamicSprite>>,
) {
    let start = Instant::now();
    for entity in existing.iter() {
        commands.entity(entity).despawn();
    }

    let snapshot = session.0.snapshot();
    let mut spawned = 0usize;
    let mut draw = |color: Color, min: Vec2, size: Vec2, z: f32| {
        commands.spawn((
            Sprite::from_color(color, size),
            world_transform(min, size, z),
            DynamicSprite,
        ));
        spawned += 1;
    };

    for actor in &snapshot.actors {
        match actor {
            ActorSnapshot::Patroller { body, active } => {
                let alpha = if *active { 1.0 } else { 0.5 };
                draw(
                    Color::srgba(0.804, 0.682, 1.0, alpha),
                    body.pos,
                    body.size,
                    Z_ENEMIES,
                );
            }
            ActorSnapshot::Guardian(boss) => {
                if !boss.alive {
                    continue;
                }
                let pulse = 1.0 + (boss.timer * 0.05).sin() * 0.04;
                let size = boss.body.size * pulse;
                let min = boss.body.pos + (boss.body.size - size) * 0.5;
                draw(boss_color(boss.phase), min, size, Z_BOSS);
                for shot in &boss.projectiles {
                    draw(
                        Color::srgb_u8(0xff, 0xd6, 0xd6),
                        shot.pos,
                        Vec2::splat(PROJECTILE_SIZE),
                        Z_BOSS + 0.1,
                    );
                }
            }
        }
    }

    let player = &snapshot.player.body;
    draw(
        Color::srgb_u8(0xcf, 0xe8, 0xff),
        player.pos,
        player.size,
        Z_PLAYER,
    );

    for p in &snapshot.particles {
        let [r, g, b, a] = p.color;
        draw(
            Color::srgba(r, g, b, a),
            p.pos,
            Vec2::splat(p.size),
            Z_PARTICLES,
        );
    }

    if let Some(mut perf) = perf {
        perf.sprite_count = spawned;
        perf.render_time_ms += start.elapsed().as_secs_f32() * 1000.0;
    }
}
