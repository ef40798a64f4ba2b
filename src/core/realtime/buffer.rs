//! Pre-handshake staging buffer for caller audio.
//!
//! Audio can start flowing from the telephony side before the realtime
//! backend has finished its handshake. Chunks accumulated during that window
//! are held here and flushed exactly once, in arrival order, the instant the
//! connection opens. After the flush the buffer is permanently drained and
//! every chunk bypasses it.

use std::collections::VecDeque;

#[derive(Debug)]
enum PendingState {
    Buffering(VecDeque<String>),
    Drained,
}

/// FIFO staging area for audio produced while the session is still pending.
#[derive(Debug)]
pub struct PendingAudio {
    state: PendingState,
}

impl Default for PendingAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingAudio {
    /// New, empty, buffering.
    pub fn new() -> Self {
        Self {
            state: PendingState::Buffering(VecDeque::new()),
        }
    }

    /// Stage a chunk, or hand it straight back once the buffer has drained.
    ///
    /// Returns `None` when the chunk was buffered; returns `Some(chunk)` after
    /// the drain, in which case the caller must forward it directly. Chunks
    /// are never dropped or reordered here.
    #[must_use]
    pub fn push(&mut self, chunk: String) -> Option<String> {
        match &mut self.state {
            PendingState::Buffering(queue) => {
                queue.push_back(chunk);
                None
            }
            PendingState::Drained => Some(chunk),
        }
    }

    /// Take every staged chunk in FIFO order and transition permanently to
    /// the drained state.
    ///
    /// A second drain yields nothing and is logged; the buffer is a one-shot
    /// staging area, not a steady-state channel.
    pub fn drain(&mut self) -> Vec<String> {
        match std::mem::replace(&mut self.state, PendingState::Drained) {
            PendingState::Buffering(queue) => queue.into(),
            PendingState::Drained => {
                tracing::warn!("pending audio buffer drained twice; ignoring");
                Vec::new()
            }
        }
    }

    /// Whether the one-shot drain has already happened.
    pub fn is_drained(&self) -> bool {
        matches!(self.state, PendingState::Drained)
    }

    /// Number of chunks currently staged.
    pub fn len(&self) -> usize {
        match &self.state {
            PendingState::Buffering(queue) => queue.len(),
            PendingState::Drained => 0,
        }
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffers_in_fifo_order() {
        let mut buffer = PendingAudio::new();
        assert!(buffer.push("a1".to_string()).is_none());
        assert!(buffer.push("a2".to_string()).is_none());
        assert!(buffer.push("a3".to_string()).is_none());
        assert_eq!(buffer.len(), 3);

        let drained = buffer.drain();
        assert_eq!(drained, vec!["a1", "a2", "a3"]);
        assert!(buffer.is_drained());
    }

    #[test]
    fn test_push_after_drain_bypasses() {
        let mut buffer = PendingAudio::new();
        buffer.push("early".to_string());
        let drained = buffer.drain();
        assert_eq!(drained, vec!["early"]);

        // Once drained, chunks come straight back for direct forwarding.
        assert_eq!(buffer.push("late".to_string()), Some("late".to_string()));
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_second_drain_is_empty_noop() {
        let mut buffer = PendingAudio::new();
        buffer.push("a".to_string());
        assert_eq!(buffer.drain().len(), 1);
        assert!(buffer.drain().is_empty());
        assert!(buffer.is_drained());
    }

    #[test]
    fn test_drain_empty_buffer() {
        let mut buffer = PendingAudio::new();
        assert!(buffer.is_empty());
        assert!(buffer.drain().is_empty());
        assert!(buffer.is_drained());
    }

    #[test]
    fn test_no_loss_no_duplication() {
        let mut buffer = PendingAudio::new();
        for i in 0..100 {
            assert!(buffer.push(format!("chunk-{i}")).is_none());
        }
        let drained = buffer.drain();
        assert_eq!(drained.len(), 100);
        for (i, chunk) in drained.iter().enumerate() {
            assert_eq!(chunk, &format!("chunk-{i}"));
        }
    }
}
