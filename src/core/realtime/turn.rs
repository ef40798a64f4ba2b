//! Turn gating for response requests toward the AI backend.
//!
//! The backend serves one response at a time per session; requesting another
//! while one is in flight is a protocol error. [`TurnGate`] serializes turn
//! starts with an atomic check-and-set and reclaims a stale turn after a
//! configurable idle timeout, so a lost terminal event cannot wedge the call.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy)]
enum TurnState {
    Idle,
    InFlight { since: Instant },
}

/// Single-turn gate with optional idle-timeout reclamation.
#[derive(Debug)]
pub struct TurnGate {
    inner: Mutex<TurnState>,
    timeout: Option<Duration>,
}

impl TurnGate {
    /// New gate in the idle state.
    ///
    /// When `timeout` is set, a turn still marked in flight after that long is
    /// treated as abandoned and the next [`try_begin`](Self::try_begin) wins.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(TurnState::Idle),
            timeout,
        }
    }

    /// Attempt to start a turn.
    ///
    /// Returns `true` exactly once per turn: when the gate was idle, or when
    /// the in-flight turn has exceeded the idle timeout. Check and set happen
    /// under one lock, so concurrent callers cannot both win.
    pub fn try_begin(&self) -> bool {
        let mut state = self.inner.lock();
        match *state {
            TurnState::Idle => {
                *state = TurnState::InFlight {
                    since: Instant::now(),
                };
                true
            }
            TurnState::InFlight { since } => {
                let stale = self
                    .timeout
                    .is_some_and(|timeout| since.elapsed() >= timeout);
                if stale {
                    tracing::warn!(
                        elapsed_ms = since.elapsed().as_millis() as u64,
                        "reclaiming stale in-flight turn"
                    );
                    *state = TurnState::InFlight {
                        since: Instant::now(),
                    };
                }
                stale
            }
        }
    }

    /// Mark the current turn complete. Idempotent.
    pub fn release(&self) {
        *self.inner.lock() = TurnState::Idle;
    }

    /// Whether a turn is currently in flight.
    pub fn in_flight(&self) -> bool {
        matches!(*self.inner.lock(), TurnState::InFlight { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_single_turn_per_cycle() {
        let gate = TurnGate::new(None);
        assert!(gate.try_begin());
        assert!(!gate.try_begin());
        assert!(gate.in_flight());

        gate.release();
        assert!(!gate.in_flight());
        assert!(gate.try_begin());
    }

    #[test]
    fn test_release_is_idempotent() {
        let gate = TurnGate::new(None);
        gate.release();
        gate.release();
        assert!(gate.try_begin());
    }

    #[test]
    fn test_no_timeout_never_reclaims() {
        let gate = TurnGate::new(None);
        assert!(gate.try_begin());
        assert!(!gate.try_begin());
        assert!(!gate.try_begin());
    }

    #[test]
    fn test_stale_turn_reclaimed_after_timeout() {
        let gate = TurnGate::new(Some(Duration::from_millis(10)));
        assert!(gate.try_begin());
        assert!(!gate.try_begin());

        std::thread::sleep(Duration::from_millis(20));
        // Timed out turn is abandoned and a new one starts.
        assert!(gate.try_begin());
        // The reclaimed turn is fresh, so the gate holds again.
        assert!(!gate.try_begin());
    }

    #[test]
    fn test_concurrent_begin_grants_exactly_one() {
        let gate = Arc::new(TurnGate::new(None));
        let granted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = gate.clone();
                let granted = granted.clone();
                std::thread::spawn(move || {
                    if gate.try_begin() {
                        granted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(granted.load(Ordering::SeqCst), 1);
    }
}
