use bevy::log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::components::Tile;

/// Immutable level template. `map` holds numeric tile codes, one inner
/// vector per row; rows may differ in length.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelDef {
    pub id: u32,
    pub title: String,
    pub objective: String,
    pub story: String,
    pub map: Vec<Vec<u8>>,
    /// The boss level. The last level in the table is final when no level
    /// sets this.
    #[serde(default)]
    pub final_level: bool,
}

impl LevelDef {
    pub fn tile_rows(&self) -> Vec<Vec<Tile>> {
        self.map
            .iter()
            .map(|row| row.iter().copied().map(Tile::from_code).collect())
            .collect()
    }
}

/// Ordered level list.
#[derive(Clone, Debug)]
pub struct LevelTable {
    levels: Vec<LevelDef>,
}

impl LevelTable {
    pub fn new(mut levels: Vec<LevelDef>) -> Result<Self, String> {
        if levels.is_empty() {
            return Err("Level table is empty".to_string());
        }
        if let Some(bad) = levels.iter().find(|l| l.map.is_empty()) {
            return Err(format!("Level {} ('{}') has no rows", bad.id, bad.title));
        }
        if !levels.iter().any(|l| l.final_level) {
            if let Some(last) = levels.last_mut() {
                last.final_level = true;
            }
        }
        Ok(Self { levels })
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        let levels: Vec<LevelDef> =
            serde_json::from_str(json).map_err(|e| format!("Invalid level pack: {e}"))?;
        Self::new(levels)
    }

    /// The pack embedded at build time, or the built-in campaign when none was
    /// embedded or it fails to parse.
    pub fn embedded_or_builtin() -> Self {
        let embedded = include_str!(concat!(env!("OUT_DIR"), "/wayhome_embedded_levels.json"));
        if embedded.trim() == "[]" || embedded.trim().is_empty() {
            return Self::builtin();
        }
        match Self::from_json(embedded) {
            Ok(table) => {
                info!("[WayHome levels] Loaded embedded level pack ({} levels)", table.len());
                table
            }
            Err(err) => {
                warn!("[WayHome levels] {err}; falling back to built-in levels");
                Self::builtin()
            }
        }
    }

    pub fn builtin() -> Self {
        Self {
            levels: builtin_levels(),
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LevelDef> {
        self.levels.get(index)
    }
}

fn level(id: u32, title: &str, objective: &str, story: &str, map: Vec<Vec<u8>>) -> LevelDef {
    LevelDef {
        id,
        title: title.to_string(),
        objective: objective.to_string(),
        story: story.to_string(),
        map,
        final_level: false,
    }
}

/// Solid floor whose last cell is the exit.
fn exit_floor(width: usize) -> Vec<u8> {
    let mut row = vec![Tile::Stone.code(); width];
    row[width - 1] = Tile::Exit.code();
    row
}

fn builtin_levels() -> Vec<LevelDef> {
    vec![
        level(
            0,
            "Waking Hollow",
            "Reach the faint light on the right.",
            "You wake under cold stone. The air hums.",
            vec![
                vec![0; 20],
                vec![0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0],
                vec![9, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 8],
                exit_floor(20),
                vec![2; 20],
            ],
        ),
        level(
            1,
            "Shaded Glade",
            "Find more souls and head deeper.",
            "A quiet grove. Shadows move.",
            vec![
                vec![0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0, 5, 0, 0, 0, 0, 0],
                vec![0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0, 8],
                vec![9, 0, 0, 0, 1, 1, 0, 1, 1, 0, 0, 0, 0, 1, 3, 1],
                exit_floor(20),
                vec![2; 20],
            ],
        ),
        level(
            2,
            "Cavern of Echoes",
            "Descend and reach the crystal chamber.",
            "Your footsteps echo. The ground feels alive.",
            vec![
                vec![0, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0],
                vec![0, 8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0],
                vec![9, 0, 0, 0, 1, 1, 0, 1, 3, 1, 0, 0, 0, 0, 0, 0],
                exit_floor(16),
                vec![2; 16],
            ],
        ),
        level(
            3,
            "Ruined Sanctum",
            "Solve the rune puzzle to reach the Core.",
            "Ruins whisper ancient patterns.",
            vec![
                vec![0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0],
                vec![0, 0, 0, 5, 0, 0, 0, 0, 0, 0, 0, 0, 8, 0],
                vec![9, 0, 0, 1, 1, 1, 0, 1, 3, 1, 0, 0, 0, 0],
                exit_floor(14),
                vec![2; 14],
            ],
        ),
        LevelDef {
            final_level: true,
            ..level(
                4,
                "The Core - Final",
                "Defeat the Core Guardian and find the portal home.",
                "A heavy pulse fills the air.",
                vec![
                    vec![0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0],
                    vec![9, 0, 0, 0, 0, 0, 0, 0, 0, 0, 8, 0],
                    vec![2; 12],
                    vec![2; 12],
                    vec![2; 12],
                ],
            )
        },
    ]
}
