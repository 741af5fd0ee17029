use std::collections::VecDeque;

use bevy::prelude::*;
use serde::Serialize;

use crate::audio::AudioCue;
use crate::boss::BossPhase;
use crate::components::Tile;
use crate::progress::Progress;

const MAX_EVENTS: usize = 500;

/// Text for the narrative box.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Narrative {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtext: Option<String>,
}

impl Narrative {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            subtext: None,
        }
    }

    pub fn with_subtext(mut self, subtext: impl Into<String>) -> Self {
        self.subtext = Some(subtext.into());
        self
    }
}

/// Everything the simulation reports to its collaborators.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    Cue { cue: AudioCue },
    Narrative(Narrative),
    LevelLoaded { index: usize, generation: u64 },
    PlayerDamaged { amount: i32, health: i32 },
    PlayerDied,
    TileMined { col: i32, row: i32, tile: Tile },
    SoulCollected { souls: u32 },
    HeartCollected { health: i32 },
    BossPhaseChanged { phase: BossPhase },
    BossDefeated,
    ExitPlaced { col: i32, row: i32 },
    ProgressSaved { progress: Progress },
}

#[derive(Serialize, Clone, Debug)]
pub struct GameEvent {
    pub seq: u64,
    pub frame: u64,
    #[serde(flatten)]
    pub event: SimEvent,
}

/// Bounded log of recent events, stamped with the tick that produced them.
#[derive(Default)]
pub struct GameEventBus {
    pub recent: VecDeque<GameEvent>,
    pub frame: u64,
    pub next_seq: u64,
    pub dropped_events: u64,
    last_overflow_log_frame: u64,
}

impl GameEventBus {
    pub fn emit(&mut self, event: SimEvent) {
        self.next_seq = self.next_seq.saturating_add(1);
        self.recent.push_back(GameEvent {
            seq: self.next_seq,
            frame: self.frame,
            event,
        });
        if self.recent.len() > MAX_EVENTS {
            let excess = self.recent.len() - MAX_EVENTS;
            for _ in 0..excess {
                self.recent.pop_front();
            }
            self.dropped_events = self.dropped_events.saturating_add(excess as u64);
            if self.frame.saturating_sub(self.last_overflow_log_frame) >= 60 {
                self.last_overflow_log_frame = self.frame;
                warn!(
                    "[WayHome events] Dropped {} buffered events (total dropped: {})",
                    excess, self.dropped_events
                );
            }
        }
    }

    pub fn cue(&mut self, cue: AudioCue) {
        self.emit(SimEvent::Cue { cue });
    }

    pub fn advance_frame(&mut self) {
        self.frame = self.frame.saturating_add(1);
    }

    /// Events emitted after the one numbered `after_seq`. Sequence numbers
    /// start at 1, so `since(0)` yields everything still buffered.
    pub fn since(&self, after_seq: u64) -> impl Iterator<Item = &GameEvent> {
        self.recent.iter().filter(move |ev| ev.seq > after_seq)
    }

    pub fn contains(&self, event: &SimEvent) -> bool {
        self.recent.iter().any(|ev| &ev.event == event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_bus_tracks_dropped_events() {
        let mut bus = GameEventBus::default();
        for i in 0..(MAX_EVENTS + 25) {
            bus.emit(SimEvent::SoulCollected { souls: i as u32 });
        }
        assert_eq!(bus.recent.len(), MAX_EVENTS);
        assert!(bus.dropped_events >= 25);
    }

    #[test]
    fn since_filters_by_sequence() {
        let mut bus = GameEventBus::default();
        bus.cue(AudioCue::Jump);
        bus.advance_frame();
        bus.cue(AudioCue::Land);
        assert_eq!(bus.since(0).count(), 2);
        let newer: Vec<_> = bus.since(1).map(|ev| ev.event.clone()).collect();
        assert_eq!(newer, vec![SimEvent::Cue { cue: AudioCue::Land }]);
        assert_eq!(bus.recent[1].frame, 1);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let ev = GameEvent {
            seq: 1,
            frame: 3,
            event: SimEvent::ExitPlaced { col: 10, row: 2 },
        };
        let json = serde_json::to_value(&ev).expect("serializable");
        assert_eq!(json["type"], "exit_placed");
        assert_eq!(json["frame"], 3);
        assert_eq!(json["col"], 10);
    }
}
