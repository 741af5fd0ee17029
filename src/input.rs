use bevy::prelude::*;
use std::collections::HashSet;

pub const ACTION_LEFT: &str = "left";
pub const ACTION_RIGHT: &str = "right";
pub const ACTION_JUMP: &str = "jump";
pub const ACTION_DASH: &str = "dash";
pub const ACTION_MINE: &str = "mine";
pub const ACTION_SAVE: &str = "save";
pub const ACTION_LOAD: &str = "load";
pub const ACTION_RESTART: &str = "restart";
pub const ACTION_MUTE: &str = "mute";

/// Held controls for one tick. Edge detection lives in the player's latches,
/// so only the level state is needed here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub dash: bool,
    pub mine: bool,
}

impl InputState {
    pub fn from_actions<'a>(active: impl IntoIterator<Item = &'a str>) -> Self {
        let mut state = Self::default();
        for action in active {
            match action {
                ACTION_LEFT => state.left = true,
                ACTION_RIGHT => state.right = true,
                ACTION_JUMP => state.jump = true,
                ACTION_DASH => state.dash = true,
                ACTION_MINE => state.mine = true,
                _ => {}
            }
        }
        state
    }
}

/// Abstraction layer between raw input and game systems.
/// Filled from the keyboard each frame; tests write to it directly.
#[derive(Resource, Default, Clone)]
pub struct VirtualInput {
    pub active: HashSet<String>,
    pub just_pressed: HashSet<String>,
}

impl VirtualInput {
    pub fn pressed(&self, action: &str) -> bool {
        self.active.contains(action)
    }

    pub fn just_pressed(&self, action: &str) -> bool {
        self.just_pressed.contains(action)
    }

    pub fn state(&self) -> InputState {
        InputState::from_actions(self.active.iter().map(String::as_str))
    }
}

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(VirtualInput::default())
            .add_systems(
                PreUpdate,
                keyboard_to_virtual.run_if(resource_exists::<ButtonInput<KeyCode>>),
            )
            .add_systems(Last, clear_virtual_input);
    }
}

const BINDINGS: &[(&str, &[KeyCode])] = &[
    (ACTION_LEFT, &[KeyCode::KeyA, KeyCode::ArrowLeft]),
    (ACTION_RIGHT, &[KeyCode::KeyD, KeyCode::ArrowRight]),
    (
        ACTION_JUMP,
        &[KeyCode::Space, KeyCode::KeyW, KeyCode::ArrowUp],
    ),
    (ACTION_DASH, &[KeyCode::ShiftLeft, KeyCode::ShiftRight]),
    (ACTION_MINE, &[KeyCode::KeyE]),
    (ACTION_SAVE, &[KeyCode::F5]),
    (ACTION_LOAD, &[KeyCode::F9]),
    (ACTION_RESTART, &[KeyCode::KeyR]),
    (ACTION_MUTE, &[KeyCode::KeyM]),
];

/// Translate keyboard input to VirtualInput action names
fn keyboard_to_virtual(keyboard: Res<ButtonInput<KeyCode>>, mut vinput: ResMut<VirtualInput>) {
    vinput.active.clear();
    vinput.just_pressed.clear();

    for (action, keys) in BINDINGS {
        if keyboard.any_pressed(keys.iter().copied()) {
            vinput.active.insert((*action).into());
        }
        if keyboard.any_just_pressed(keys.iter().copied()) {
            vinput.just_pressed.insert((*action).into());
        }
    }
}

fn clear_virtual_input(mut vinput: ResMut<VirtualInput>) {
    vinput.just_pressed.clear();
}
