use bevy::prelude::*;
use bevy::utils::Instant;

use crate::input::{VirtualInput, ACTION_LOAD, ACTION_MUTE, ACTION_RESTART, ACTION_SAVE};
use crate::perf::PerfAccum;
use crate::session::SimulationSession;

/// The running session, owned by the ECS world.
#[derive(Resource)]
pub struct SessionResource(pub SimulationSession);

/// Frames are ticked only while this is set.
#[derive(Resource, Clone, Copy)]
pub struct SessionRunning(pub bool);

impl Default for SessionRunning {
    fn default() -> Self {
        Self(true)
    }
}

pub struct RuntimePlugin;

impl Plugin for RuntimePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SessionRunning>()
            .add_systems(Update, (apply_hotkeys, tick_session).chain());
    }
}

fn apply_hotkeys(vinput: Res<VirtualInput>, mut session: ResMut<SessionResource>) {
    let session = &mut session.0;
    if vinput.just_pressed(ACTION_SAVE) {
        match session.save_progress() {
            Ok(()) => info!("[WayHome] Saved at level {}", session.current_level()),
            Err(err) => warn!("[WayHome save] {err}"),
        }
    }
    if vinput.just_pressed(ACTION_LOAD) && !session.load_saved() {
        info!("[WayHome] Nothing to load");
    }
    if vinput.just_pressed(ACTION_RESTART) {
        session.restart();
    }
    if vinput.just_pressed(ACTION_MUTE) {
        session.toggle_mute();
    }
}

/// Advances the session by the frame delta in milliseconds.
pub fn tick_session(
    time: Res<Time>,
    vinput: Res<VirtualInput>,
    running: Res<SessionRunning>,
    perf: Option<ResMut<PerfAccum>>,
    mut session: ResMut<SessionResource>,
) {
    if !running.0 {
        return;
    }
    let start = Instant::now();
    let dt_ms = time.delta_secs() * 1000.0;
    session.0.tick(vinput.state(), dt_ms);
    if let Some(mut perf) = perf {
        perf.tick_time_ms += start.elapsed().as_secs_f32() * 1000.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Tuning;
    use crate::events::SimEvent;
    use crate::level::LevelTable;
    use crate::progress::{MemoryProgressStore, Progress};

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(VirtualInput::default())
            .insert_resource(SessionResource(SimulationSession::new(
                LevelTable::builtin(),
                Tuning::default(),
                Box::new(MemoryProgressStore::default()),
                Some(3),
            )))
            .add_plugins(RuntimePlugin);
        app
    }

    #[test]
    fn frames_tick_the_session() {
        let mut app = app();
        let before = app.world().resource::<SessionResource>().0.events().frame;
        app.update();
        app.update();
        let after = app.world().resource::<SessionResource>().0.events().frame;
        assert_eq!(after, before + 2);
    }

    #[test]
    fn paused_session_does_not_tick() {
        let mut app = app();
        app.insert_resource(SessionRunning(false));
        app.update();
        assert_eq!(app.world().resource::<SessionResource>().0.events().frame, 0);
    }

    #[test]
    fn hotkeys_save_and_mute() {
        let mut app = app();
        {
            let mut vinput = app.world_mut().resource_mut::<VirtualInput>();
            vinput.just_pressed.insert(ACTION_SAVE.into());
            vinput.just_pressed.insert(ACTION_MUTE.into());
        }
        app.update();
        let session = &app.world().resource::<SessionResource>().0;
        assert_eq!(session.saved_progress(), Some(Progress::Level(0)));
        assert!(session.events().contains(&SimEvent::Cue {
            cue: crate::audio::AudioCue::MuteToggle
        }));
    }
}
