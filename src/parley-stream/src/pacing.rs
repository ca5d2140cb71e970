//! Per-tick reveal of buffered text.

use crate::buffer::PendingBuffer;
use crate::state::StreamStatus;
use crate::ticks::TickSource;

/// What a single pacing step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The scheduler is not running; nothing happened.
    Inactive,
    /// Text was moved out of the buffer and should be appended to content.
    Revealed(String),
    /// Buffer empty but the stream is still open; keep ticking.
    Idle,
    /// Buffer empty and the stream is closed; the scheduler stopped itself.
    Stopped,
}

/// Drains the pending buffer at a fixed number of characters per tick.
///
/// Starting is idempotent. The injected [`TickSource`] is resumed on the
/// first `start` and paused on `stop`, so a timer only runs while there is
/// something to reveal or more text is expected.
pub struct PacingScheduler {
    running: bool,
    ticks: Box<dyn TickSource>,
}

impl PacingScheduler {
    pub fn new(ticks: Box<dyn TickSource>) -> Self {
        Self {
            running: false,
            ticks,
        }
    }

    /// Swaps the tick source, carrying the running state over.
    pub fn replace_ticks(&mut self, ticks: Box<dyn TickSource>) {
        if self.running {
            self.ticks.pause();
        }
        self.ticks = ticks;
        if self.running {
            self.ticks.resume();
        }
    }

    /// Starts ticking. Returns `false` if already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.ticks.resume();
        true
    }

    /// Stops ticking. Returns `false` if already stopped.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        self.ticks.pause();
        true
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Runs one tick against `buffer`.
    ///
    /// Reveals at most `speed` characters, never more than are buffered.
    pub fn step(
        &mut self,
        buffer: &mut PendingBuffer,
        speed: usize,
        status: StreamStatus,
    ) -> TickOutcome {
        if !self.running {
            return TickOutcome::Inactive;
        }

        if !buffer.is_empty() {
            return TickOutcome::Revealed(buffer.take_chars(speed.max(1)));
        }

        if status == StreamStatus::Streaming {
            return TickOutcome::Idle;
        }

        self.stop();
        TickOutcome::Stopped
    }
}

impl std::fmt::Debug for PacingScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacingScheduler")
            .field("running", &self.running)
            .field("ticks_active", &self.ticks.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticks::ManualTicks;

    fn scheduler() -> (PacingScheduler, ManualTicks) {
        let ticks = ManualTicks::new();
        (PacingScheduler::new(Box::new(ticks.clone())), ticks)
    }

    #[test]
    fn test_inactive_until_started() {
        let (mut pacing, _) = scheduler();
        let mut buffer = PendingBuffer::new();
        buffer.push("abc");
        assert_eq!(
            pacing.step(&mut buffer, 2, StreamStatus::Streaming),
            TickOutcome::Inactive
        );
        assert_eq!(buffer.char_len(), 3);
    }

    #[test]
    fn test_start_is_idempotent() {
        let (mut pacing, ticks) = scheduler();
        assert!(pacing.start());
        assert!(!pacing.start());
        assert_eq!(ticks.resumes(), 1);
        assert!(ticks.is_active());
    }

    #[test]
    fn test_reveals_speed_chars_per_step() {
        let (mut pacing, _) = scheduler();
        let mut buffer = PendingBuffer::new();
        buffer.push("Hello");
        pacing.start();

        let status = StreamStatus::Streaming;
        assert_eq!(
            pacing.step(&mut buffer, 2, status),
            TickOutcome::Revealed("He".to_string())
        );
        assert_eq!(
            pacing.step(&mut buffer, 2, status),
            TickOutcome::Revealed("ll".to_string())
        );
        assert_eq!(
            pacing.step(&mut buffer, 2, status),
            TickOutcome::Revealed("o".to_string())
        );
    }

    #[test]
    fn test_idles_while_stream_open() {
        let (mut pacing, ticks) = scheduler();
        let mut buffer = PendingBuffer::new();
        pacing.start();
        assert_eq!(
            pacing.step(&mut buffer, 3, StreamStatus::Streaming),
            TickOutcome::Idle
        );
        assert!(pacing.is_running());
        assert!(ticks.is_active());
    }

    #[test]
    fn test_stops_once_drained_and_closed() {
        let (mut pacing, ticks) = scheduler();
        let mut buffer = PendingBuffer::new();
        pacing.start();
        assert_eq!(
            pacing.step(&mut buffer, 3, StreamStatus::Complete),
            TickOutcome::Stopped
        );
        assert!(!pacing.is_running());
        assert!(!ticks.is_active());
        assert_eq!(ticks.pauses(), 1);
    }

    #[test]
    fn test_replace_ticks_carries_running_state() {
        let (mut pacing, old) = scheduler();
        pacing.start();

        let new = ManualTicks::new();
        pacing.replace_ticks(Box::new(new.clone()));
        assert!(!old.is_active());
        assert!(new.is_active());
    }
}
