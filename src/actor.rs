use rand::rngs::SmallRng;
use serde::Serialize;

use crate::boss::GuardianSnapshot;
use crate::components::Tuning;
use crate::events::GameEventBus;
use crate::particles::ParticleSystem;
use crate::physics_core::Body;
use crate::tilemap::GridWorld;

/// Shared state an actor may read or feed during its tick.
pub struct ActorContext<'a> {
    pub world: &'a GridWorld,
    pub player: &'a Body,
    pub tuning: &'a Tuning,
    pub dt_ms: f32,
    pub rng: &'a mut SmallRng,
    pub particles: &'a mut ParticleSystem,
    pub events: &'a mut GameEventBus,
}

/// Requests an actor hands back to the session after its tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActorEvent {
    HitPlayer { damage: i32 },
}

/// Read-only view of an actor for drawing and reports.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActorSnapshot {
    Patroller { body: Body, active: bool },
    Guardian(GuardianSnapshot),
}

/// Anything that runs its own behavior once per tick.
pub trait Actor {
    fn tick(&mut self, ctx: &mut ActorContext) -> Vec<ActorEvent>;
    fn snapshot(&self) -> ActorSnapshot;
}
