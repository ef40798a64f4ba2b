//! Shared application state.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::{BusinessDirectory, ServerConfig};
use crate::delivery::{LeadSink, LogSink, WebhookSink};

/// Error returned when a new call cannot be admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallLimitError {
    /// The configured concurrent call limit has been reached
    LimitReached,
}

/// Shared state for all handlers.
///
/// Holds the loaded configuration, the business directory, the lead delivery
/// sink and the live call counter. Cheap to clone behind an `Arc`.
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Per-business assistant configuration, resolved by dialled number
    pub businesses: BusinessDirectory,
    /// Destination for captured leads
    pub lead_sink: Arc<dyn LeadSink>,
    /// Number of calls currently bridged
    active_calls: AtomicUsize,
}

impl AppState {
    /// Build state from configuration: load the business directory and pick
    /// the lead sink (webhook when configured, log-only otherwise).
    pub fn new(config: ServerConfig) -> Self {
        let businesses = BusinessDirectory::load(&config.clients_dir);

        let lead_sink: Arc<dyn LeadSink> = match &config.lead_webhook_url {
            Some(url) => {
                tracing::info!(url = %url, "delivering leads to webhook");
                Arc::new(WebhookSink::new(url.clone()))
            }
            None => {
                tracing::info!("no lead webhook configured, leads go to the log");
                Arc::new(LogSink)
            }
        };

        Self {
            config,
            businesses,
            lead_sink,
            active_calls: AtomicUsize::new(0),
        }
    }

    /// Try to admit a new call against the concurrent call limit.
    ///
    /// The returned [`CallSlot`] releases the slot when its last clone is
    /// dropped, whatever path the request takes after admission.
    pub fn try_acquire_call(self: &Arc<Self>) -> Result<CallSlot, CallLimitError> {
        let limit = self.config.max_concurrent_calls;
        let mut current = self.active_calls.load(Ordering::Acquire);
        loop {
            if current >= limit {
                return Err(CallLimitError::LimitReached);
            }
            match self.active_calls.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Ok(CallSlot {
                        guard: Arc::new(SlotGuard {
                            state: self.clone(),
                        }),
                    });
                }
                Err(observed) => current = observed,
            }
        }
    }

    fn release_call(&self) {
        let previous = self.active_calls.fetch_sub(1, Ordering::AcqRel);
        if previous == 0 {
            // Unbalanced release; clamp rather than wrap.
            self.active_calls.store(0, Ordering::Release);
            tracing::error!("call slot released without a matching acquire");
        }
    }

    /// Number of calls currently bridged.
    pub fn active_call_count(&self) -> usize {
        self.active_calls.load(Ordering::Acquire)
    }
}

/// One admitted call's slot against the concurrent call limit.
///
/// Clones share the same slot. The slot is given back when the last clone
/// drops, so a call that never reaches the bridge loop (a refused upgrade,
/// a missing API key) still frees its capacity.
#[derive(Clone)]
pub struct CallSlot {
    guard: Arc<SlotGuard>,
}

struct SlotGuard {
    state: Arc<AppState>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.state.release_call();
    }
}

impl std::fmt::Debug for CallSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSlot")
            .field("shared", &(Arc::strong_count(&self.guard) > 1))
            .finish()
    }
}
