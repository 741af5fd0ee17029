use serde::{Deserialize, Serialize};

use crate::components::Tuning;
use crate::events::{GameEvent, SimEvent};
use crate::input::InputState;
use crate::level::{LevelDef, LevelTable};
use crate::progress::{MemoryProgressStore, Progress};
use crate::session::SimulationSession;

#[derive(Deserialize, Clone)]
pub struct SimulationRequest {
    /// Level index to start on.
    #[serde(default)]
    pub level: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: f32,
    #[serde(default)]
    pub inputs: Vec<SimInput>,
    pub max_frames: u32,
    #[serde(default = "default_record_interval")]
    pub record_interval: u32,
    /// Replaces the built-in campaign.
    pub levels: Option<Vec<LevelDef>>,
    pub tuning: Option<Tuning>,
}

fn default_seed() -> u64 {
    1
}

fn default_tick_ms() -> f32 {
    1000.0 / 60.0
}

fn default_record_interval() -> u32 {
    1
}

#[derive(Deserialize, Clone)]
pub struct SimInput {
    pub frame: u32,
    pub action: String,
    #[serde(default)]
    pub duration: u32,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimOutcome {
    LevelComplete,
    StoryComplete,
    Died,
    Timeout,
}

#[derive(Serialize, Clone)]
pub struct SimulationResult {
    pub outcome: SimOutcome,
    pub frames_elapsed: u32,
    pub final_level: usize,
    pub trace: Vec<TraceFrame>,
    pub events: Vec<GameEvent>,
}

#[derive(Serialize, Clone)]
pub struct TraceFrame {
    pub frame: u32,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub grounded: bool,
    pub health: i32,
}

/// Runs a scripted session without a window and reports how it ended.
pub fn run_simulation(request: &SimulationRequest) -> Result<SimulationResult, String> {
    let levels = match &request.levels {
        Some(levels) => LevelTable::new(levels.clone())?,
        None => LevelTable::builtin(),
    };
    if request.level >= levels.len() {
        return Err(format!(
            "Start level {} is out of range (0..{})",
            request.level,
            levels.len()
        ));
    }
    let tuning = request.tuning.clone().unwrap_or_default();
    let mut session = SimulationSession::new(
        levels,
        tuning,
        Box::new(MemoryProgressStore::default()),
        Some(request.seed),
    );
    if request.level != 0 {
        session.load_level(request.level);
    }

    // Pre-process inputs into per-frame active actions
    let mut active_inputs: Vec<Vec<&str>> = vec![Vec::new(); request.max_frames as usize];
    for input in &request.inputs {
        let duration = input.duration.max(1);
        let end = input.frame.saturating_add(duration).min(request.max_frames);
        for f in input.frame..end {
            active_inputs[f as usize].push(input.action.as_str());
        }
    }

    let start_level = request.level;
    let mut events: Vec<GameEvent> = session.events().since(0).cloned().collect();
    let mut cursor = events.last().map(|e| e.seq).unwrap_or(0);
    let mut trace = Vec::new();
    let mut outcome = SimOutcome::Timeout;
    let mut frames_elapsed = 0;

    for frame in 0..request.max_frames {
        let input = InputState::from_actions(active_inputs[frame as usize].iter().copied());
        session.tick(input, request.tick_ms);
        frames_elapsed = frame + 1;

        let fresh: Vec<GameEvent> = session.events().since(cursor).cloned().collect();
        if let Some(last) = fresh.last() {
            cursor = last.seq;
        }
        let died = fresh.iter().any(|e| e.event == SimEvent::PlayerDied);
        let advanced = fresh.iter().any(|e| {
            matches!(
                e.event,
                SimEvent::ProgressSaved { progress: Progress::Level(n) } if n > start_level
            )
        });
        events.extend(fresh);

        let player = session.player();
        let body = player.body;
        if request.record_interval > 0 && frame % request.record_interval == 0 {
            trace.push(TraceFrame {
                frame,
                x: body.pos.x,
                y: body.pos.y,
                vx: body.vel.x,
                vy: body.vel.y,
                grounded: player.grounded,
                health: player.health,
            });
        }

        if died {
            outcome = SimOutcome::Died;
        } else if session.story_completed() {
            outcome = SimOutcome::StoryComplete;
        } else if advanced {
            outcome = SimOutcome::LevelComplete;
        } else {
            continue;
        }
        break;
    }

    Ok(SimulationResult {
        outcome,
        frames_elapsed,
        final_level: session.current_level(),
        trace,
        events,
    })
}

/// JSON in, pretty JSON out.
pub fn run_simulation_json(request_json: &str) -> Result<String, String> {
    let request: SimulationRequest = serde_json::from_str(request_json)
        .map_err(|e| format!("Invalid simulation request: {e}"))?;
    let result = run_simulation(&request)?;
    serde_json::to_string_pretty(&result).map_err(|e| format!("Failed to encode result: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> SimulationRequest {
        serde_json::from_str(json).expect("valid request")
    }

    #[test]
    fn idle_run_times_out_on_the_ground() {
        let result = run_simulation(&request(r#"{"max_frames": 30}"#)).expect("runs");
        assert_eq!(result.outcome, SimOutcome::Timeout);
        assert_eq!(result.frames_elapsed, 30);
        assert_eq!(result.trace.len(), 30);
        let last = result.trace.last().expect("trace");
        assert!(last.grounded);
        assert_eq!(last.y, 32.0);
    }

    #[test]
    fn walking_onto_an_exit_completes_the_level() {
        let result = run_simulation(&request(
            r#"{
                "max_frames": 200,
                "inputs": [{"frame": 0, "action": "right", "duration": 200}],
                "levels": [
                    {"id":0,"title":"A","objective":"","story":"","map":[[9,0,0,0],[2,2,2,7]]},
                    {"id":1,"title":"B","objective":"","story":"","map":[[9,0],[2,2]]}
                ]
            }"#,
        ))
        .expect("runs");
        assert_eq!(result.outcome, SimOutcome::LevelComplete);
        assert_eq!(result.final_level, 1);
        assert!(result.frames_elapsed < 200);
    }

    #[test]
    fn final_exit_completes_the_story() {
        let result = run_simulation(&request(
            r#"{
                "max_frames": 200,
                "inputs": [{"frame": 0, "action": "right", "duration": 200}],
                "levels": [
                    {"id":0,"title":"Only","objective":"","story":"",
                     "map":[[9,0,0,0],[2,2,2,7]],"final_level":false}
                ],
                "tuning": {"projectile_chance": 0.0}
            }"#,
        ))
        .expect("runs");
        assert_eq!(result.outcome, SimOutcome::StoryComplete);
    }

    #[test]
    fn falling_into_the_void_dies() {
        let result = run_simulation(&request(
            r#"{
                "max_frames": 300,
                "levels": [{"id":0,"title":"Pit","objective":"","story":"","map":[[9,0],[0,0]]}],
                "tuning": {"projectile_chance": 0.0}
            }"#,
        ))
        .expect("runs");
        assert_eq!(result.outcome, SimOutcome::Died);
        assert_eq!(result.trace.last().map(|t| t.health), Some(0));
    }

    #[test]
    fn bad_requests_are_rejected() {
        assert!(run_simulation_json("{").is_err());
        let err = run_simulation_json(r#"{"max_frames": 1, "level": 9}"#).expect_err("range");
        assert!(err.contains("out of range"));
    }
}
