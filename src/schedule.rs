use bevy::log::debug;

/// Work deferred past the current tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeferredAction {
    /// Put the exit portal at a cell once the boss has fallen.
    PlaceExit { col: i32, row: i32 },
    /// Reload the level that was active when this was scheduled.
    RestartLevel,
}

#[derive(Clone, Debug)]
struct Pending {
    due_ms: f64,
    generation: u64,
    action: DeferredAction,
}

/// Timer queue keyed by level generation.
///
/// Each level load bumps the generation; anything scheduled under an older
/// generation is dropped when it comes due instead of firing.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    now_ms: f64,
    generation: u64,
    pending: Vec<Pending>,
}

impl Scheduler {
    pub fn bump_generation(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    pub fn schedule(&mut self, delay_ms: f32, action: DeferredAction) {
        self.pending.push(Pending {
            due_ms: self.now_ms + f64::from(delay_ms.max(0.0)),
            generation: self.generation,
            action,
        });
    }

    pub fn is_pending(&self, action: DeferredAction) -> bool {
        self.pending
            .iter()
            .any(|p| p.action == action && p.generation == self.generation)
    }

    pub fn advance(&mut self, dt_ms: f32) {
        self.now_ms += f64::from(dt_ms.max(0.0));
    }

    /// Removes and returns the earliest due action of the live generation.
    ///
    /// The generation is checked at the moment each action is taken, so an
    /// action that reloads the level makes everything still queued behind it
    /// stale.
    pub fn pop_due(&mut self) -> Option<DeferredAction> {
        loop {
            let now = self.now_ms;
            let next = self
                .pending
                .iter()
                .enumerate()
                .filter(|(_, p)| p.due_ms <= now)
                .min_by(|(_, a), (_, b)| a.due_ms.total_cmp(&b.due_ms))
                .map(|(i, _)| i)?;
            let due = self.pending.remove(next);
            if due.generation == self.generation {
                return Some(due.action);
            }
            debug!(
                "[WayHome schedule] Dropping stale {:?} from generation {}",
                due.action, due.generation
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(s: &mut Scheduler) -> Vec<DeferredAction> {
        std::iter::from_fn(|| s.pop_due()).collect()
    }

    #[test]
    fn fires_after_delay() {
        let mut s = Scheduler::default();
        s.schedule(600.0, DeferredAction::PlaceExit { col: 10, row: 2 });
        s.advance(599.0);
        assert!(drain(&mut s).is_empty());
        s.advance(1.0);
        assert_eq!(
            drain(&mut s),
            vec![DeferredAction::PlaceExit { col: 10, row: 2 }]
        );
        s.advance(1000.0);
        assert!(drain(&mut s).is_empty());
    }

    #[test]
    fn stale_generation_is_suppressed() {
        let mut s = Scheduler::default();
        s.schedule(600.0, DeferredAction::PlaceExit { col: 10, row: 2 });
        assert!(s.is_pending(DeferredAction::PlaceExit { col: 10, row: 2 }));
        s.bump_generation();
        assert!(!s.is_pending(DeferredAction::PlaceExit { col: 10, row: 2 }));
        s.advance(1000.0);
        assert!(drain(&mut s).is_empty());
    }

    #[test]
    fn due_actions_come_out_in_due_order() {
        let mut s = Scheduler::default();
        s.schedule(900.0, DeferredAction::RestartLevel);
        s.schedule(600.0, DeferredAction::PlaceExit { col: 1, row: 1 });
        s.advance(1000.0);
        assert_eq!(
            drain(&mut s),
            vec![
                DeferredAction::PlaceExit { col: 1, row: 1 },
                DeferredAction::RestartLevel
            ]
        );
    }

    #[test]
    fn reload_between_due_actions_drops_the_rest() {
        let mut s = Scheduler::default();
        s.schedule(900.0, DeferredAction::RestartLevel);
        s.advance(300.0);
        s.schedule(600.0, DeferredAction::PlaceExit { col: 10, row: 2 });
        s.advance(600.0);

        assert_eq!(s.pop_due(), Some(DeferredAction::RestartLevel));
        s.bump_generation();
        assert_eq!(s.pop_due(), None);
        assert!(!s.is_pending(DeferredAction::PlaceExit { col: 10, row: 2 }));
    }

    #[test]
    fn zero_delay_fires_on_next_advance() {
        let mut s = Scheduler::default();
        s.schedule(0.0, DeferredAction::RestartLevel);
        s.advance(0.0);
        assert_eq!(s.pop_due(), Some(DeferredAction::RestartLevel));
    }
}
