/// One cell of the level grid.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum Tile {
    #[default]
    Empty = 0,
    Dirt = 1,
    Stone = 2,
    Grass = 3,
    Soul = 4,
    Heart = 5,
    Exit = 7,
    EnemyMarker = 8,
    SpawnMarker = 9,
}

impl Tile {
    /// Level-table codes; anything unknown reads as empty.
    pub fn from_code(v: u8) -> Self {
        match v {
            1 => Tile::Dirt,
            2 => Tile::Stone,
            3 => Tile::Grass,
            4 => Tile::Soul,
            5 => Tile::Heart,
            7 => Tile::Exit,
            8 => Tile::EnemyMarker,
            9 => Tile::SpawnMarker,
            _ => Tile::Empty,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_empty(self) -> bool {
        self == Tile::Empty
    }

    /// Anything non-empty supports a body standing on it and blocks patrols.
    pub fn is_supporting(self) -> bool {
        !self.is_empty()
    }

    pub fn is_diggable(self) -> bool {
        matches!(self, Tile::Dirt | Tile::Stone)
    }

}

pub const PLAYER_WIDTH: f32 = 12.0;
pub const PLAYER_HEIGHT: f32 = 16.0;
pub const ENEMY_SIZE: f32 = 12.0;
pub const BOSS_SIZE: f32 = 64.0;

/// Gameplay constants. Velocities are in pixels per tick and were tuned
/// against a 60 Hz frame cadence; timers marked `_ms` run on wall time.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub tile_size: f32,
    pub gravity: f32,
    pub player_gravity_scale: f32,
    pub enemy_gravity_scale: f32,
    pub max_fall: f32,
    pub player_accel: f32,
    pub player_max_speed: f32,
    pub horizontal_damping: f32,
    pub jump_impulse: f32,
    pub double_jump_impulse: f32,
    pub dash_impulse: f32,
    pub dash_cooldown: f32,
    /// Cooldown units drained per elapsed millisecond.
    pub cooldown_rate: f32,
    pub landing_speed: f32,
    pub void_margin: f32,
    pub mine_reach: f32,
    pub soul_drop_chance: f64,
    pub max_health: i32,
    pub restart_health: i32,
    pub hurt_shake: f32,
    pub enemy_speed_min: f32,
    pub enemy_speed_max: f32,
    pub enemy_contact_cooldown_ms: f32,
    pub boss_shield: i32,
    pub boss_health: i32,
    pub boss_enrage_ratio: f32,
    pub boss_impact_damage: i32,
    pub boss_fall_impact: f32,
    pub boss_dash_impact: f32,
    pub boss_core_half: f32,
    /// Zero lets every overlapping tick register an impact.
    pub boss_hit_cooldown_ms: f32,
    /// Upward speed given to the player after a confirmed body hit.
    pub boss_knockback_vy: f32,
    /// Multiplier applied to the player's horizontal speed on a body hit.
    pub boss_knockback_vx_scale: f32,
    pub boss_offset: (f32, f32),
    pub projectile_chance: f64,
    pub projectile_chance_enraged: f64,
    pub projectile_speed: (f32, f32),
    pub projectile_speed_enraged: (f32, f32),
    pub projectile_jitter: f32,
    pub projectile_gravity: f32,
    pub projectile_life_ms: f32,
    pub exit_delay_ms: f32,
    pub restart_delay_ms: f32,
    pub camera_smoothing: f32,
    pub shake_decay: f32,
    pub viewport: (f32, f32),
    pub narrative_ms: f32,
    pub max_step_ms: f32,
    pub particle_gravity: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            tile_size: 16.0,
            gravity: 0.9,
            player_gravity_scale: 0.6,
            enemy_gravity_scale: 0.15,
            max_fall: 18.0,
            player_accel: 1.6,
            player_max_speed: 4.2,
            horizontal_damping: 0.9,
            jump_impulse: 8.6,
            double_jump_impulse: 7.0,
            dash_impulse: 6.0,
            dash_cooldown: 80.0,
            cooldown_rate: 0.06,
            landing_speed: 3.0,
            void_margin: 200.0,
            mine_reach: 12.0,
            soul_drop_chance: 0.22,
            max_health: 9,
            restart_health: 5,
            hurt_shake: 6.0,
            enemy_speed_min: 0.6,
            enemy_speed_max: 1.2,
            enemy_contact_cooldown_ms: 600.0,
            boss_shield: 14,
            boss_health: 36,
            boss_enrage_ratio: 0.35,
            boss_impact_damage: 2,
            boss_fall_impact: 4.0,
            boss_dash_impact: 5.0,
            boss_core_half: 20.0,
            boss_hit_cooldown_ms: 0.0,
            boss_knockback_vy: 3.0,
            boss_knockback_vx_scale: -0.4,
            boss_offset: (0.55, 0.25),
            projectile_chance: 0.015,
            projectile_chance_enraged: 0.03,
            projectile_speed: (1.6, 2.4),
            projectile_speed_enraged: (2.6, 3.4),
            projectile_jitter: 0.3,
            projectile_gravity: 0.02,
            projectile_life_ms: 600.0,
            exit_delay_ms: 600.0,
            restart_delay_ms: 900.0,
            camera_smoothing: 0.12,
            shake_decay: 0.9,
            viewport: (320.0, 180.0),
            narrative_ms: 3000.0,
            max_step_ms: 40.0,
            particle_gravity: 0.06,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_codes_read_as_empty() {
        assert_eq!(Tile::from_code(6), Tile::Empty);
        assert_eq!(Tile::from_code(200), Tile::Empty);
        assert_eq!(Tile::from_code(9), Tile::SpawnMarker);
        assert_eq!(Tile::Exit.code(), 7);
    }

    #[test]
    fn only_dirt_and_stone_are_diggable() {
        let diggable: Vec<Tile> = [
            Tile::Empty,
            Tile::Dirt,
            Tile::Stone,
            Tile::Grass,
            Tile::Soul,
            Tile::Heart,
            Tile::Exit,
            Tile::EnemyMarker,
            Tile::SpawnMarker,
        ]
        .into_iter()
        .filter(|t| t.is_diggable())
        .collect();
        assert_eq!(diggable, vec![Tile::Dirt, Tile::Stone]);
    }

    #[test]
    fn partial_tuning_json_keeps_defaults() {
        let tuning: Tuning = serde_json::from_str(r#"{"gravity": 1.2}"#).expect("valid tuning");
        assert!((tuning.gravity - 1.2).abs() < f32::EPSILON);
        assert_eq!(tuning.boss_shield, 14);
        assert_eq!(tuning.viewport, (320.0, 180.0));
    }
}
