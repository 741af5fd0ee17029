use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::events::SimEvent;
use crate::runtime::SessionResource;

const MAX_AUDIO_EVENTS: usize = 256;

/// Fire-and-forget sound cues raised by the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCue {
    Jump,
    Land,
    Hit,
    Collect,
    Portal,
    Dash,
    Mine,
    AmbientMusicStart,
    BossMusicStart,
    MusicStop,
    MuteToggle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MusicTrack {
    Ambient,
    Boss,
}

/// Output side of the audio collaborator. Return values are never consumed.
pub trait AudioSink {
    fn cue(&mut self, cue: AudioCue);
    fn set_muted(&mut self, muted: bool);
    fn is_muted(&self) -> bool;
    fn current_music(&self) -> Option<MusicTrack>;
}

#[derive(Clone, Serialize)]
pub struct AudioEventLog {
    pub cue: AudioCue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// Records cues and tracks the music/mute state. Synthesis itself lives
/// outside the crate.
pub struct AudioManager {
    pub current_music: Option<MusicTrack>,
    pub muted: bool,
    pub recent_events: Vec<AudioEventLog>,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self {
            current_music: None,
            muted: false,
            recent_events: Vec::new(),
        }
    }
}

impl AudioManager {
    fn push_event(&mut self, cue: AudioCue, action: Option<&str>) {
        self.recent_events.push(AudioEventLog {
            cue,
            action: action.map(str::to_string),
        });
        if self.recent_events.len() > MAX_AUDIO_EVENTS {
            let excess = self.recent_events.len() - MAX_AUDIO_EVENTS;
            self.recent_events.drain(0..excess);
        }
    }

    fn start_music(&mut self, track: MusicTrack, cue: AudioCue) {
        if self.muted {
            return;
        }
        self.current_music = Some(track);
        self.push_event(cue, Some("start"));
        debug!("[WayHome audio] Music {:?}", track);
    }

    fn stop_music(&mut self) {
        if self.current_music.take().is_some() {
            self.push_event(AudioCue::MusicStop, Some("stop"));
        }
    }
}

impl AudioSink for AudioManager {
    fn cue(&mut self, cue: AudioCue) {
        match cue {
            AudioCue::AmbientMusicStart => self.start_music(MusicTrack::Ambient, cue),
            AudioCue::BossMusicStart => self.start_music(MusicTrack::Boss, cue),
            AudioCue::MusicStop => self.stop_music(),
            AudioCue::MuteToggle => {
                let muted = !self.muted;
                self.set_muted(muted);
            }
            sfx => {
                if !self.muted {
                    self.push_event(sfx, Some("play"));
                }
            }
        }
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if muted {
            self.stop_music();
        }
        info!("[WayHome audio] {}", if muted { "Muted" } else { "Unmuted" });
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn current_music(&self) -> Option<MusicTrack> {
        self.current_music
    }
}

/// Stand-in when no audio output is available.
#[derive(Default)]
pub struct MutedAudio;

impl AudioSink for MutedAudio {
    fn cue(&mut self, _cue: AudioCue) {}

    fn set_muted(&mut self, _muted: bool) {}

    fn is_muted(&self) -> bool {
        true
    }

    fn current_music(&self) -> Option<MusicTrack> {
        None
    }
}

#[derive(Resource)]
pub struct AudioOut(pub Box<dyn AudioSink + Send + Sync>);

impl AudioOut {
    pub fn new(enabled: bool, start_muted: bool) -> Self {
        if !enabled {
            warn!("[WayHome audio] Audio disabled; using muted sink");
            return Self(Box::new(MutedAudio));
        }
        Self(Box::new(AudioManager {
            muted: start_muted,
            ..Default::default()
        }))
    }
}

#[derive(Resource, Default)]
struct AudioEventCursor {
    last_seq: u64,
}

pub struct AudioPlugin;

impl Plugin for AudioPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(AudioEventCursor::default())
            .add_systems(Update, forward_session_cues.after(crate::runtime::tick_session));
    }
}

fn forward_session_cues(
    session: Res<SessionResource>,
    mut audio: ResMut<AudioOut>,
    mut cursor: ResMut<AudioEventCursor>,
) {
    for ev in session.0.events().since(cursor.last_seq) {
        cursor.last_seq = ev.seq;
        if let SimEvent::Cue { cue } = ev.event {
            audio.0.cue(cue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sfx_cues_are_logged() {
        let mut audio = AudioManager::default();
        audio.cue(AudioCue::Jump);
        assert_eq!(audio.recent_events.len(), 1);
        let ev = &audio.recent_events[0];
        assert_eq!(ev.cue, AudioCue::Jump);
        assert_eq!(ev.action.as_deref(), Some("play"));
    }

    #[test]
    fn music_cues_switch_tracks() {
        let mut audio = AudioManager::default();
        audio.cue(AudioCue::AmbientMusicStart);
        assert_eq!(audio.current_music(), Some(MusicTrack::Ambient));
        audio.cue(AudioCue::BossMusicStart);
        assert_eq!(audio.current_music(), Some(MusicTrack::Boss));
        audio.cue(AudioCue::MusicStop);
        assert_eq!(audio.current_music(), None);
    }

    #[test]
    fn mute_toggle_stops_music_and_silences_sfx() {
        let mut audio = AudioManager::default();
        audio.cue(AudioCue::AmbientMusicStart);
        audio.cue(AudioCue::MuteToggle);
        assert!(audio.is_muted());
        assert_eq!(audio.current_music(), None);
        let logged = audio.recent_events.len();
        audio.cue(AudioCue::Hit);
        audio.cue(AudioCue::BossMusicStart);
        assert_eq!(audio.recent_events.len(), logged);
        audio.cue(AudioCue::MuteToggle);
        assert!(!audio.is_muted());
    }

    #[test]
    fn disabled_audio_degrades_to_muted_sink() {
        let mut out = AudioOut::new(false, false);
        out.0.cue(AudioCue::BossMusicStart);
        assert!(out.0.is_muted());
        assert_eq!(out.0.current_music(), None);
    }
}
