//! Tick sources that drive the pacing scheduler.
//!
//! The engine never owns a timer. It tells its [`TickSource`] when reveal
//! ticks are wanted and when they can stop; whoever owns the source calls
//! [`StreamEngine::tick`](crate::StreamEngine::tick) while it is active.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A repeating tick source that can be paused when there is nothing to reveal.
pub trait TickSource: Send {
    /// Start delivering ticks. Called once each time pacing starts.
    fn resume(&mut self);

    /// Stop delivering ticks. Called once each time pacing stops.
    fn pause(&mut self);

    /// Returns `true` while ticks are wanted.
    fn is_active(&self) -> bool;
}

#[derive(Debug, Default)]
struct ManualState {
    active: AtomicBool,
    resumes: AtomicUsize,
    pauses: AtomicUsize,
}

/// Tick source for tests: ticks are delivered by calling `tick()` by hand.
///
/// Clones share state, so a test can keep one clone and hand the other to
/// the engine.
#[derive(Debug, Clone, Default)]
pub struct ManualTicks {
    state: Arc<ManualState>,
}

impl ManualTicks {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the engine asked for ticks to start.
    pub fn resumes(&self) -> usize {
        self.state.resumes.load(Ordering::SeqCst)
    }

    /// How many times the engine asked for ticks to stop.
    pub fn pauses(&self) -> usize {
        self.state.pauses.load(Ordering::SeqCst)
    }
}

impl TickSource for ManualTicks {
    fn resume(&mut self) {
        self.state.active.store(true, Ordering::SeqCst);
        self.state.resumes.fetch_add(1, Ordering::SeqCst);
    }

    fn pause(&mut self) {
        self.state.active.store(false, Ordering::SeqCst);
        self.state.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.state.active.load(Ordering::SeqCst)
    }
}

/// Tick source backed by a shared flag that gates a timer loop.
///
/// [`StreamDriver`](crate::StreamDriver) keeps one clone and only polls its
/// interval while the flag is set.
#[derive(Debug, Clone, Default)]
pub struct IntervalTicks {
    active: Arc<AtomicBool>,
}

impl IntervalTicks {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TickSource for IntervalTicks {
    fn resume(&mut self) {
        self.active.store(true, Ordering::Release);
    }

    fn pause(&mut self) {
        self.active.store(false, Ordering::Release);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}
