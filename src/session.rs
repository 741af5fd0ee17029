use bevy::log::{debug, info, warn};
use bevy::math::Vec2;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::actor::{Actor, ActorContext, ActorEvent, ActorSnapshot};
use crate::audio::AudioCue;
use crate::boss::CoreGuardian;
use crate::camera::FollowCamera;
use crate::components::{Tile, Tuning};
use crate::enemy::Patroller;
use crate::events::{GameEventBus, Narrative, SimEvent};
use crate::input::InputState;
use crate::level::{LevelDef, LevelTable};
use crate::particles::{
    Burst, Particle, ParticleSystem, BOSS_BURST_COLOR, HURT_COLOR,
};
use crate::player::{Player, FALLBACK_SPAWN};
use crate::progress::{Progress, ProgressStore};
use crate::schedule::{DeferredAction, Scheduler};
use crate::tilemap::GridWorld;

/// Everything owned by the active level. Rebuilt wholesale on every load.
struct LevelState {
    index: usize,
    generation: u64,
    world: GridWorld,
    enemies: Vec<Patroller>,
    boss: Option<CoreGuardian>,
    particles: ParticleSystem,
    /// A death restart is queued; further deaths are ignored until it runs.
    restart_pending: bool,
    /// The final exit was reached; completion is not repeated.
    story_completed: bool,
}

/// Read-only view of the whole session, in draw order.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    pub level: usize,
    pub title: String,
    pub generation: u64,
    pub cols: usize,
    pub rows: usize,
    pub tile_size: f32,
    pub tiles: Vec<(i32, i32, Tile)>,
    pub actors: Vec<ActorSnapshot>,
    pub player: Player,
    pub particles: Vec<Particle>,
    pub camera: Vec2,
}

/// The running game: one level, one player, one camera.
pub struct SimulationSession {
    tuning: Tuning,
    levels: LevelTable,
    level: LevelState,
    player: Player,
    camera: FollowCamera,
    scheduler: Scheduler,
    events: GameEventBus,
    store: Box<dyn ProgressStore + Send + Sync>,
    rng: SmallRng,
}

impl SimulationSession {
    /// Builds a session with level 0 loaded. Call [`Self::boot`] to resume
    /// from saved progress instead.
    pub fn new(
        levels: LevelTable,
        tuning: Tuning,
        store: Box<dyn ProgressStore + Send + Sync>,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let camera = FollowCamera::new(
            Vec2::new(tuning.viewport.0, tuning.viewport.1),
            tuning.camera_smoothing,
            tuning.shake_decay,
        );
        let mut session = Self {
            player: Player::new(tuning.restart_health),
            level: LevelState {
                index: 0,
                generation: 0,
                world: GridWorld::default(),
                enemies: Vec::new(),
                boss: None,
                particles: ParticleSystem::new(tuning.particle_gravity),
                restart_pending: false,
                story_completed: false,
            },
            tuning,
            levels,
            camera,
            scheduler: Scheduler::default(),
            events: GameEventBus::default(),
            store,
            rng,
        };
        session.load_level(0);
        session
    }

    /// Resumes saved progress: a stored level index loads that level, a
    /// finished story stays on the first level and says so.
    pub fn boot(&mut self) {
        match self.store.load() {
            Some(Progress::Level(index)) if index < self.levels.len() => {
                info!("[WayHome] Resuming at level {index}");
                self.load_level(index);
            }
            Some(Progress::Completed) => {
                self.load_level(0);
                self.narrate(Narrative::new("Completed", "You already finished the story."));
            }
            Some(Progress::Level(index)) => {
                warn!("[WayHome] Saved level {index} is out of range; starting fresh");
                self.load_level(0);
            }
            None => {
                self.load_level(0);
            }
        }
    }

    /// Replaces the level state with a fresh copy of level `index`. Returns
    /// false and changes nothing when the index is out of range.
    pub fn load_level(&mut self, index: usize) -> bool {
        let Some(def) = self.levels.get(index).cloned() else {
            warn!("[WayHome] Level {index} does not exist");
            return false;
        };

        let generation = self.scheduler.bump_generation();
        let mut world = GridWorld::from_rows(&def.tile_rows(), self.tuning.tile_size);

        let mut spawn = None;
        let mut markers = Vec::new();
        for (col, row, tile) in world.occupied() {
            match tile {
                Tile::SpawnMarker => {
                    if spawn.is_none() {
                        spawn = Some((col, row));
                    }
                    markers.push((col, row));
                }
                Tile::EnemyMarker => markers.push((col, row)),
                _ => {}
            }
        }

        let mut enemies = Vec::new();
        for &(col, row) in &markers {
            if world.get(col, row) == Tile::EnemyMarker {
                enemies.push(Patroller::spawn(col, row, &self.tuning, &mut self.rng));
            }
            world.set_tile(col, row, Tile::Empty);
        }

        let spawn_pos = spawn
            .map(|(col, row)| Player::spawn_position(col, row, world.tile_size()))
            .unwrap_or(FALLBACK_SPAWN);
        self.player.place_at(spawn_pos);

        let world_size = Vec2::new(world.width_px(), world.height_px());
        let boss = def
            .final_level
            .then(|| CoreGuardian::spawn_in(world_size, &self.tuning));

        self.level = LevelState {
            index,
            generation,
            world,
            enemies,
            boss,
            particles: ParticleSystem::new(self.tuning.particle_gravity),
            restart_pending: false,
            story_completed: false,
        };
        self.camera.recenter(self.player.center(), world_size);

        self.events.emit(SimEvent::LevelLoaded { index, generation });
        self.events.cue(AudioCue::AmbientMusicStart);
        self.narrate(Narrative::new(&def.title, &def.story).with_subtext(&def.objective));
        if def.final_level {
            self.events.cue(AudioCue::BossMusicStart);
        }
        info!(
            "[WayHome] Loaded level {index} '{}' ({}x{}, {} enemies{})",
            def.title,
            self.level.world.cols(),
            self.level.world.rows(),
            self.level.enemies.len(),
            if def.final_level { ", boss" } else { "" }
        );
        true
    }

    /// Advances one frame. `dt_ms` is clamped to the configured maximum step.
    pub fn tick(&mut self, input: InputState, dt_ms: f32) {
        let dt_ms = dt_ms.clamp(0.0, self.tuning.max_step_ms);
        self.events.advance_frame();

        self.scheduler.advance(dt_ms);
        while let Some(action) = self.scheduler.pop_due() {
            self.run_deferred(action);
        }

        let outcome = self.player.update(
            input,
            &mut self.level.world,
            &self.tuning,
            dt_ms,
            &mut self.rng,
            &mut self.level.particles,
            &mut self.events,
        );
        if outcome.fell_into_void && !self.level.restart_pending {
            self.player.health = 0;
            self.hurt_player(0);
        }

        let player_body = self.player.body;
        let mut hits = Vec::new();
        {
            let mut ctx = ActorContext {
                world: &self.level.world,
                player: &player_body,
                tuning: &self.tuning,
                dt_ms,
                rng: &mut self.rng,
                particles: &mut self.level.particles,
                events: &mut self.events,
            };
            let actors = self
                .level
                .enemies
                .iter_mut()
                .map(|e| e as &mut dyn Actor)
                .chain(self.level.boss.iter_mut().map(|b| b as &mut dyn Actor));
            for actor in actors {
                hits.extend(actor.tick(&mut ctx));
            }
        }
        for hit in hits {
            match hit {
                ActorEvent::HitPlayer { damage } => self.hurt_player(damage),
            }
        }

        if let Some(boss) = self.level.boss.as_mut() {
            let was_alive = boss.alive;
            boss.try_impact(&mut self.player.body, &self.tuning, &mut self.events);
            if was_alive && !boss.alive {
                self.on_boss_defeated();
            }
        }

        self.check_exit();

        let world_size = Vec2::new(self.level.world.width_px(), self.level.world.height_px());
        self.camera
            .follow(self.player.center(), world_size, &mut self.rng);
        self.level.particles.update();
    }

    /// Applies damage to the player. Reaching zero health queues a reload of
    /// the current level; the reload does not restore health.
    pub fn hurt_player(&mut self, amount: i32) {
        self.player.health = (self.player.health - amount).max(0);
        self.events.emit(SimEvent::PlayerDamaged {
            amount,
            health: self.player.health,
        });
        self.level.particles.burst(
            &Burst::new(self.player.center(), 1, HURT_COLOR),
            &mut self.rng,
        );
        self.events.cue(AudioCue::Hit);
        self.camera.add_shake(self.tuning.hurt_shake);

        if self.player.health <= 0 && !self.level.restart_pending {
            self.level.restart_pending = true;
            self.events.emit(SimEvent::PlayerDied);
            self.narrate(Narrative::new(
                "You fell...",
                "The world claims you. Restart to try again.",
            ));
            self.scheduler
                .schedule(self.tuning.restart_delay_ms, DeferredAction::RestartLevel);
            info!("[WayHome] Player died on level {}", self.level.index);
        }
    }

    /// Fresh run from the first level.
    pub fn restart(&mut self) {
        self.player.health = self.tuning.restart_health;
        self.player.souls = 0;
        self.load_level(0);
    }

    /// Saves the current level index.
    pub fn save_progress(&mut self) -> Result<(), String> {
        self.persist(Progress::Level(self.level.index))
    }

    /// Loads saved progress on request. Returns false when there was nothing
    /// usable to load.
    pub fn load_saved(&mut self) -> bool {
        match self.store.load() {
            Some(Progress::Level(index)) if index < self.levels.len() => self.load_level(index),
            Some(Progress::Completed) => {
                self.narrate(Narrative::new("Completed", "You already finished the story."));
                true
            }
            _ => {
                self.narrate(Narrative::new("No Save", "No saved game found."));
                false
            }
        }
    }

    pub fn toggle_mute(&mut self) {
        self.events.cue(AudioCue::MuteToggle);
    }

    pub fn events(&self) -> &GameEventBus {
        &self.events
    }

    pub fn camera(&self) -> &FollowCamera {
        &self.camera
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    pub fn world(&self) -> &GridWorld {
        &self.level.world
    }

    pub fn world_mut(&mut self) -> &mut GridWorld {
        &mut self.level.world
    }

    pub fn enemies(&self) -> &[Patroller] {
        &self.level.enemies
    }

    pub fn boss(&self) -> Option<&CoreGuardian> {
        self.level.boss.as_ref()
    }

    pub fn boss_mut(&mut self) -> Option<&mut CoreGuardian> {
        self.level.boss.as_mut()
    }

    pub fn particles(&self) -> &ParticleSystem {
        &self.level.particles
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn current_level(&self) -> usize {
        self.level.index
    }

    pub fn level_def(&self) -> Option<&LevelDef> {
        self.levels.get(self.level.index)
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn generation(&self) -> u64 {
        self.level.generation
    }

    pub fn story_completed(&self) -> bool {
        self.level.story_completed
    }

    pub fn saved_progress(&self) -> Option<Progress> {
        self.store.load()
    }

    pub fn is_pending(&self, action: DeferredAction) -> bool {
        self.scheduler.is_pending(action)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let world = &self.level.world;
        let actors = self
            .level
            .enemies
            .iter()
            .map(|e| e as &dyn Actor)
            .chain(self.level.boss.iter().map(|b| b as &dyn Actor))
            .map(|actor| actor.snapshot())
            .collect();
        SessionSnapshot {
            level: self.level.index,
            title: self
                .level_def()
                .map(|d| d.title.clone())
                .unwrap_or_default(),
            generation: self.level.generation,
            cols: world.cols(),
            rows: world.rows(),
            tile_size: world.tile_size(),
            tiles: world.occupied().collect(),
            actors,
            player: self.player.clone(),
            particles: self.level.particles.iter().cloned().collect(),
            camera: self.camera.display_position(),
        }
    }

    fn narrate(&mut self, narrative: Narrative) {
        self.events.emit(SimEvent::Narrative(narrative));
    }

    fn persist(&mut self, progress: Progress) -> Result<(), String> {
        self.store.save(progress)?;
        self.events.emit(SimEvent::ProgressSaved { progress });
        Ok(())
    }

    fn persist_or_warn(&mut self, progress: Progress) {
        if let Err(err) = self.persist(progress) {
            warn!("[WayHome save] {err}");
        }
    }

    fn run_deferred(&mut self, action: DeferredAction) {
        debug!("[WayHome schedule] Running {action:?}");
        match action {
            DeferredAction::PlaceExit { col, row } => {
                self.level.world.set_tile(col, row, Tile::Exit);
                self.events.emit(SimEvent::ExitPlaced { col, row });
                self.narrate(Narrative::new(
                    "Portal Awakened",
                    "A shimmering portal appears. Step through to go home.",
                ));
            }
            DeferredAction::RestartLevel => {
                self.load_level(self.level.index);
            }
        }
    }

    /// Exit cell: the second-to-last column, on its walking surface.
    fn portal_cell(&self) -> (i32, i32) {
        let world = &self.level.world;
        let col = (world.cols() as i32 - 2).max(0);
        let row = world
            .surface_row(col)
            .unwrap_or((world.rows() as i32 - 2).max(0));
        (col, row)
    }

    fn on_boss_defeated(&mut self) {
        let Some(center) = self.level.boss.as_ref().map(CoreGuardian::center) else {
            return;
        };
        let mut burst = Burst::new(center, 120, BOSS_BURST_COLOR);
        burst.scatter = Vec2::splat(40.0);
        burst.size = (2.0, 4.0);
        burst.vel_x = (-4.0, 4.0);
        burst.vel_y = (-6.0, -1.0);
        self.level.particles.burst(&burst, &mut self.rng);

        self.events.cue(AudioCue::Portal);
        self.narrate(Narrative::new(
            "Core Destroyed",
            "A portal opens... Perhaps this leads home.",
        ));
        let (col, row) = self.portal_cell();
        self.scheduler.schedule(
            self.tuning.exit_delay_ms,
            DeferredAction::PlaceExit { col, row },
        );
        self.events.cue(AudioCue::MusicStop);
        self.persist_or_warn(Progress::Completed);
        info!("[WayHome] Core Guardian defeated; exit opens at ({col}, {row})");
    }

    fn check_exit(&mut self) {
        let body = self.player.body;
        if self.level.world.tile_at(body.feet_x(), body.bottom() + 1.0) != Tile::Exit {
            return;
        }
        let next = self.level.index + 1;
        if next < self.levels.len() {
            self.events.cue(AudioCue::Portal);
            self.load_level(next);
            self.persist_or_warn(Progress::Level(next));
        } else if !self.level.story_completed {
            self.level.story_completed = true;
            self.events.cue(AudioCue::Portal);
            self.narrate(Narrative::new(
                "Home...?",
                "You step through the portal. The world blurs. Did you find your way home?",
            ));
            self.persist_or_warn(Progress::Completed);
            info!("[WayHome] Story complete");
        }
    }
}
