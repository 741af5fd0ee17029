use bevy::prelude::*;

const PERF_HISTORY_CAPACITY: usize = 300;
const PERF_HISTORY_MIN_INTERVAL_SECONDS: f64 = 0.2;
/// Ticks slower than this are logged.
const SLOW_TICK_MS: f32 = 8.0;

#[derive(Resource, Clone, serde::Serialize, Default)]
pub struct PerfStats {
    pub fps: f32,
    pub frame_time_ms: f32,
    pub tick_time_ms: f32,
    pub render_time_ms: f32,
    pub sprite_count: usize,
    pub history: PerfHistory,
}

#[derive(Clone, Copy, serde::Serialize)]
pub struct PerfSample {
    pub seq: u64,
    pub at_seconds: f64,
    pub fps: f32,
    pub tick_time_ms: f32,
    pub render_time_ms: f32,
}

#[derive(Clone, serde::Serialize)]
pub struct PerfHistory {
    pub samples: Vec<PerfSample>,
    pub capacity: usize,
    pub dropped_samples: u64,
    #[serde(skip)]
    next_seq: u64,
    #[serde(skip)]
    last_recorded_at_seconds: f64,
}

impl Default for PerfHistory {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            capacity: PERF_HISTORY_CAPACITY,
            dropped_samples: 0,
            next_seq: 1,
            last_recorded_at_seconds: -1.0,
        }
    }
}

impl PerfHistory {
    /// Records at most one sample per 0.2 s and keeps the newest `capacity`.
    fn push(&mut self, at_seconds: f64, fps: f32, tick_time_ms: f32, render_time_ms: f32) {
        if self.last_recorded_at_seconds >= 0.0
            && (at_seconds - self.last_recorded_at_seconds) < PERF_HISTORY_MIN_INTERVAL_SECONDS
        {
            return;
        }
        self.last_recorded_at_seconds = at_seconds;
        self.samples.push(PerfSample {
            seq: self.next_seq,
            at_seconds,
            fps,
            tick_time_ms,
            render_time_ms,
        });
        self.next_seq = self.next_seq.saturating_add(1);
        if self.samples.len() > self.capacity {
            let excess = self.samples.len() - self.capacity;
            self.samples.drain(0..excess);
            self.dropped_samples = self.dropped_samples.saturating_add(excess as u64);
        }
    }
}

/// Per-frame timings written by the tick and render systems.
#[derive(Resource, Default)]
pub struct PerfAccum {
    pub tick_time_ms: f32,
    pub render_time_ms: f32,
    pub sprite_count: usize,
}

pub struct PerfPlugin;

impl Plugin for PerfPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(PerfStats::default())
            .insert_resource(PerfAccum::default())
            .add_systems(Last, update_perf_stats);
    }
}

fn update_perf_stats(time: Res<Time>, mut accum: ResMut<PerfAccum>, mut perf: ResMut<PerfStats>) {
    let dt = time.delta_secs().max(0.000_001);
    perf.frame_time_ms = dt * 1000.0;
    perf.fps = 1.0 / dt;
    perf.tick_time_ms = accum.tick_time_ms;
    perf.render_time_ms = accum.render_time_ms;
    perf.sprite_count = accum.sprite_count;
    if accum.tick_time_ms > SLOW_TICK_MS {
        debug!("[WayHome perf] Slow tick: {:.2} ms", accum.tick_time_ms);
    }
    accum.tick_time_ms = 0.0;
    accum.render_time_ms = 0.0;

    let (fps, tick, render) = (perf.fps, perf.tick_time_ms, perf.render_time_ms);
    perf.history.push(time.elapsed_secs_f64(), fps, tick, render);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perf_plugin_publishes_and_resets_accumulators() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins).add_plugins(PerfPlugin);

        {
            let mut accum = app.world_mut().resource_mut::<PerfAccum>();
            accum.tick_time_ms = 2.5;
            accum.render_time_ms = 0.75;
            accum.sprite_count = 42;
        }

        app.update();

        let perf = app.world().resource::<PerfStats>();
        assert!((perf.tick_time_ms - 2.5).abs() < 0.0001);
        assert!((perf.render_time_ms - 0.75).abs() < 0.0001);
        assert_eq!(perf.sprite_count, 42);
        assert_eq!(perf.history.samples.len(), 1);

        let accum = app.world().resource::<PerfAccum>();
        assert_eq!(accum.tick_time_ms, 0.0);
        assert_eq!(accum.render_time_ms, 0.0);
    }

    #[test]
    fn history_is_rate_limited_and_bounded() {
        let mut history = PerfHistory {
            capacity: 3,
            ..Default::default()
        };
        history.push(0.0, 60.0, 1.0, 1.0);
        history.push(0.1, 60.0, 1.0, 1.0);
        assert_eq!(history.samples.len(), 1);
        for i in 1..=4 {
            history.push(i as f64, 60.0, 1.0, 1.0);
        }
        assert_eq!(history.samples.len(), 3);
        assert_eq!(history.dropped_samples, 2);
        assert_eq!(history.samples.first().map(|s| s.seq), Some(3));
    }
}
