#![cfg_attr(target_arch = "wasm32", allow(dead_code))]

mod actor;
mod audio;
mod boss;
mod camera;
mod components;
mod enemy;
mod events;
mod input;
mod level;
mod particles;
mod perf;
mod physics_core;
mod player;
mod progress;
mod render;
mod runtime;
mod schedule;
mod session;
mod simulation;
mod tilemap;
mod ui;

use bevy::prelude::*;
use components::Tuning;
use level::LevelTable;
use progress::ProgressStore;
use session::SimulationSession;

const DEFAULT_SAVE_PATH: &str = "wayhome_progress.json";
const DEFAULT_BACKGROUND: &str = "#041018";

#[derive(serde::Deserialize, Default)]
struct StartupConfig {
    window_title: Option<String>,
    window_width: Option<f32>,
    window_height: Option<f32>,
    /// Hex color, e.g. `#041018`.
    background_color: Option<String>,
    save_path: Option<String>,
    seed: Option<u64>,
    audio: Option<bool>,
    start_muted: Option<bool>,
    tuning: Option<Tuning>,
}

fn load_startup_config() -> StartupConfig {
    let path = std::env::var("WAYHOME_GAME_CONFIG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "game.json".to_string());
    match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<StartupConfig>(&contents) {
            Ok(cfg) => {
                println!("[WayHome] Loaded startup config from {}", path);
                cfg
            }
            Err(e) => {
                eprintln!("[WayHome] Failed to parse {}: {}", path, e);
                StartupConfig::default()
            }
        },
        Err(_) => StartupConfig::default(),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn progress_store(config: &StartupConfig) -> Box<dyn ProgressStore + Send + Sync> {
    let path = std::env::var("WAYHOME_SAVE_PATH")
        .ok()
        .filter(|s| !s.is_empty())
        .or_else(|| config.save_path.clone())
        .unwrap_or_else(|| DEFAULT_SAVE_PATH.to_string());
    println!("[WayHome] Progress file: {}", path);
    Box::new(progress::JsonFileProgressStore::new(path))
}

#[cfg(target_arch = "wasm32")]
fn progress_store(_config: &StartupConfig) -> Box<dyn ProgressStore + Send + Sync> {
    Box::new(progress::MemoryProgressStore::default())
}

/// `--headless <request.json>` (or `-` for stdin): run a scripted session and
/// print the result as JSON.
fn run_headless(args: &[String]) -> Result<String, String> {
    let path = args
        .iter()
        .skip_while(|a| a.as_str() != "--headless")
        .nth(1)
        .ok_or_else(|| "usage: wayhome --headless <request.json | ->".to_string())?;
    let request = if path == "-" {
        let mut buf = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)
            .map_err(|e| format!("Failed to read stdin: {e}"))?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read {path}: {e}"))?
    };
    simulation::run_simulation_json(&request)
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--headless") {
        eprintln!("[WayHome] Starting in HEADLESS mode");
        match run_headless(&args) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("[WayHome] {e}");
                std::process::exit(2);
            }
        }
        return;
    }

    let startup_config = load_startup_config();
    let tuning = startup_config.tuning.clone().unwrap_or_default();
    let mut session = SimulationSession::new(
        LevelTable::embedded_or_builtin(),
        tuning.clone(),
        progress_store(&startup_config),
        startup_config.seed,
    );
    session.boot();

    let window_title = startup_config
        .window_title
        .clone()
        .unwrap_or_else(|| "Lost Worlds - Way Home".to_string());
    let window_width = startup_config.window_width.unwrap_or(960.0);
    let window_height = startup_config.window_height.unwrap_or(540.0);
    let background = startup_config
        .background_color
        .as_deref()
        .and_then(ui::parse_hex_color)
        .or_else(|| ui::parse_hex_color(DEFAULT_BACKGROUND))
        .unwrap_or(Color::BLACK);

    let mut app = App::new();
    app.add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: window_title,
                        resolution: (window_width, window_height).into(),
                        present_mode: bevy::window::PresentMode::AutoVsync,
                        ..default()
                    }),
                    ..default()
                })
                .set(ImagePlugin::default_nearest()),
        )
        .insert_resource(ClearColor(background))
        .insert_resource(ui::NarrativeBoard::new(tuning.narrative_ms))
        .insert_resource(audio::AudioOut::new(
            startup_config.audio.unwrap_or(true),
            startup_config.start_muted.unwrap_or(false),
        ))
        .insert_resource(runtime::SessionResource(session))
        .add_plugins(input::InputPlugin)
        .add_plugins(runtime::RuntimePlugin)
        .add_plugins(audio::AudioPlugin)
        .add_plugins(camera::CameraPlugin)
        .add_plugins(ui::UiPlugin)
        .add_plugins(render::RenderPlugin)
        .add_plugins(perf::PerfPlugin);
    println!("[WayHome] Starting in WINDOWED mode");

    app.run();
}
