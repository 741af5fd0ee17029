use bevy::prelude::*;
use serde::Serialize;

use crate::components::Tuning;
use crate::events::{Narrative, SimEvent};
use crate::runtime::SessionResource;

/// Receiver for story text. Showing a new narrative replaces the old one.
pub trait NarrativeSink {
    fn show(&mut self, narrative: &Narrative);
}

/// The narrative box. Each narrative stays up for `duration_ms`.
#[derive(Resource, Clone, Debug, Serialize)]
pub struct NarrativeBoard {
    pub current: Option<Narrative>,
    pub remaining_ms: f32,
    pub duration_ms: f32,
    pub shown: u64,
}

impl NarrativeBoard {
    pub fn new(duration_ms: f32) -> Self {
        Self {
            current: None,
            remaining_ms: 0.0,
            duration_ms,
            shown: 0,
        }
    }

    pub fn tick(&mut self, dt_ms: f32) {
        if self.current.is_none() {
            return;
        }
        self.remaining_ms -= dt_ms;
        if self.remaining_ms <= 0.0 {
            self.current = None;
            self.remaining_ms = 0.0;
        }
    }
}

impl Default for NarrativeBoard {
    fn default() -> Self {
        Self::new(Tuning::default().narrative_ms)
    }
}

impl NarrativeSink for NarrativeBoard {
    fn show(&mut self, narrative: &Narrative) {
        self.current = Some(narrative.clone());
        self.remaining_ms = self.duration_ms;
        self.shown = self.shown.saturating_add(1);
    }
}

/// Health, souls and stage title.
pub fn hud_line(health: i32, souls: u32, title: &str) -> String {
    format!("HP {health}   Souls {souls}   {title}")
}

#[derive(Resource, Default)]
struct UiEventCursor {
    last_seq: u64,
}

#[derive(Component)]
struct HudText;

#[derive(Component)]
struct NarrativePanel;

#[derive(Component)]
struct NarrativeText;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<NarrativeBoard>()
            .insert_resource(UiEventCursor::default())
            .add_systems(Startup, spawn_ui)
            .add_systems(
                Update,
                (collect_narratives, tick_narrative_board, sync_ui_to_bevy)
                    .chain()
                    .after(crate::runtime::tick_session),
            );
    }
}

fn collect_narratives(
    session: Res<SessionResource>,
    mut board: ResMut<NarrativeBoard>,
    mut cursor: ResMut<UiEventCursor>,
) {
    for ev in session.0.events().since(cursor.last_seq) {
        cursor.last_seq = ev.seq;
        if let SimEvent::Narrative(narrative) = &ev.event {
            info!("[WayHome ui] {}: {}", narrative.title, narrative.body);
            board.show(narrative);
        }
    }
}

fn tick_narrative_board(time: Res<Time>, mut board: ResMut<NarrativeBoard>) {
    board.tick(time.delta_secs() * 1000.0);
}

fn spawn_ui(mut commands: Commands) {
    commands.spawn((
        Text::new(""),
        TextFont {
            font_size: 16.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(8.0),
            top: Val::Px(6.0),
            ..default()
        },
        HudText,
        PickingBehavior::IGNORE,
    ));

    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                left: Val::Percent(20.0),
                right: Val::Percent(20.0),
                bottom: Val::Px(24.0),
                padding: UiRect::all(Val::Px(10.0)),
                ..default()
            },
            BackgroundColor(Color::srgba(0.02, 0.06, 0.1, 0.85)),
            Visibility::Hidden,
            NarrativePanel,
            GlobalZIndex(100),
            PickingBehavior::IGNORE,
        ))
        .with_children(|panel| {
            panel.spawn((
                Text::new(""),
                TextFont {
                    font_size: 15.0,
                    ..default()
                },
                TextColor(Color::srgb(0.81, 0.91, 1.0)),
                NarrativeText,
            ));
        });
}

fn narrative_text(narrative: &Narrative) -> String {
    let mut text = format!("{}\n{}", narrative.title, narrative.body);
    if let Some(sub) = &narrative.subtext {
        text.push('\n');
        text.push_str(sub);
    }
    text
}

fn sync_ui_to_bevy(
    session: Res<SessionResource>,
    board: Res<NarrativeBoard>,
    mut hud: Query<&mut Text, (With<HudText>, Without<NarrativeText>)>,
    mut narrative: Query<&mut Text, (With<NarrativeText>, Without<HudText>)>,
    mut panel: Query<&mut Visibility, With<NarrativePanel>>,
) {
    let session = &session.0;
    let title = session
        .level_def()
        .map(|d| d.title.as_str())
        .unwrap_or_default();
    let player = session.player();
    let line = hud_line(player.health, player.souls, title);
    for mut text in hud.iter_mut() {
        if text.0 != line {
            text.0 = line.clone();
        }
    }

    let body = board.current.as_ref().map(narrative_text);
    for mut vis in panel.iter_mut() {
        *vis = if body.is_some() {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
    }
    if let Some(body) = body {
        for mut text in narrative.iter_mut() {
            if text.0 != body {
                text.0 = body.clone();
            }
        }
    }
}

/// `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    let bytes: Vec<u8> = (0..hex.len())
        .step_by(2)
        .filter_map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect();
    match bytes.len() {
        3 => Some(Color::srgb(
            bytes[0] as f32 / 255.0,
            bytes[1] as f32 / 255.0,
            bytes[2] as f32 / 255.0,
        )),
        4 => Some(Color::srgba(
            bytes[0] as f32 / 255.0,
            bytes[1] as f32 / 255.0,
            bytes[2] as f32 / 255.0,
            bytes[3] as f32 / 255.0,
        )),
        _ => None,
    }
}
