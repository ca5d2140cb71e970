//! Stream engine: the lifecycle state machine.
//!
//! [`StreamEngine`] owns the only [`StreamingState`] and [`PendingBuffer`].
//! Transport signals go in through [`StreamEngine::handle`], display ticks
//! through [`StreamEngine::tick`], and every resulting mutation is pushed
//! synchronously to subscribers.
//!
//! # Transitions
//!
//! ```text
//!   idle|complete|error ──sent──▶ waiting ──chunk──▶ streaming ──chunk──▶ streaming
//!   waiting|streaming ──done──▶ complete         (buffer flushed)
//!   any ──cancelled──▶ idle                       (buffer flushed)
//!   any ──error──▶ error
//!   any ──reset()──▶ idle                         (everything cleared)
//! ```
//!
//! Signals that do not fit the current status are dropped with a debug log.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::buffer::PendingBuffer;
use crate::cancel::CancellationController;
use crate::config::EngineConfig;
use crate::estimate::{HeightEstimator, WrapEstimator};
use crate::pacing::{PacingScheduler, TickOutcome};
use crate::signal::StreamSignal;
use crate::state::{StreamStatus, StreamingState, clamp_typing_speed};
use crate::subscribers::{SubscriberRegistry, Subscription};
use crate::ticks::{ManualTicks, TickSource};


/// Paced, cancellable presentation of one stream at a time.
///
/// Construct one per conversation view and reuse it across sessions; call
/// [`reset`](Self::reset) between unrelated conversations and
/// [`dispose`](Self::dispose) when the view goes away.
pub struct StreamEngine {
    state: StreamingState,
    buffer: PendingBuffer,
    pacing: PacingScheduler,
    estimator: Box<dyn HeightEstimator>,
    cancel: CancellationController,
    subscribers: SubscriberRegistry,
    high_water_mark: Option<usize>,
    session_started: Option<Instant>,
    first_chunk_at: Option<Instant>,
    disposed: bool,
}

impl StreamEngine {
    /// Creates an idle engine.
    ///
    /// Uses a [`WrapEstimator`] over `config.typography` and a
    /// [`ManualTicks`] source; swap either with the `with_*` builders.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: StreamingState::new(config.typing_speed),
            buffer: PendingBuffer::new(),
            pacing: PacingScheduler::new(Box::new(ManualTicks::new())),
            estimator: Box::new(WrapEstimator::new(config.typography)),
            cancel: CancellationController::new(),
            subscribers: SubscriberRegistry::new(),
            high_water_mark: config.high_water_mark,
            session_started: None,
            first_chunk_at: None,
            disposed: false,
        }
    }

    /// Replaces the tick source.
    pub fn with_tick_source(mut self, ticks: Box<dyn TickSource>) -> Self {
        self.pacing.replace_ticks(ticks);
        self
    }

    /// Replaces the height estimator.
    pub fn with_estimator(mut self, estimator: Box<dyn HeightEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    // --------------------------------------------------------
    // Inbound signals
    // --------------------------------------------------------

    /// Applies a lifecycle signal from the transport.
    ///
    /// Stale or out-of-order signals are ignored; this never fails.
    pub fn handle(&mut self, signal: StreamSignal) {
        if self.disposed {
            debug!(signal = signal.name(), "Engine disposed; dropping signal");
            return;
        }

        let changed = match signal {
            StreamSignal::Sent => self.on_sent(),
            StreamSignal::Chunk { text } => self.on_chunk(&text),
            StreamSignal::Done => self.on_done(),
            StreamSignal::Cancelled => self.on_cancelled(),
            StreamSignal::Error { message } => self.on_error(message),
            StreamSignal::ConversationBound { id } => self.on_conversation_bound(id),
            StreamSignal::MessageBound { id } => self.on_message_bound(id),
        };

        if changed {
            self.publish();
        }
    }

    fn ignore(&self, signal: &'static str) -> bool {
        debug!(signal, status = %self.state.status, "Ignoring out-of-order signal");
        false
    }

    fn on_sent(&mut self) -> bool {
        if !self.state.status.accepts_send() {
            return self.ignore("sent");
        }

        self.pacing.stop();
        self.buffer.clear();
        self.state = StreamingState {
            status: StreamStatus::Waiting,
            ..StreamingState::new(self.state.typing_speed)
        };
        self.session_started = Some(Instant::now());
        self.first_chunk_at = None;
        info!("Stream session started");
        true
    }

    fn on_chunk(&mut self, text: &str) -> bool {
        if !self.state.status.is_active() {
            return self.ignore("chunk");
        }

        if self.state.status == StreamStatus::Waiting {
            self.state.status = StreamStatus::Streaming;
            self.first_chunk_at = Some(Instant::now());
            debug!(ttfc = ?self.time_to_first_chunk(), "First chunk received");
        }

        self.state.chunks_received = self.state.chunks_received.saturating_add(1);
        self.buffer.push(text);
        self.enforce_high_water_mark();
        self.update_estimate();
        self.state.is_typing = true;
        self.pacing.start();
        true
    }

    fn on_done(&mut self) -> bool {
        if !self.state.status.is_active() {
            return self.ignore("done");
        }

        self.flush_buffer();
        self.pacing.stop();
        self.cancel.release();
        self.state.is_typing = false;
        self.state.status = StreamStatus::Complete;
        info!(
            chars = self.state.content.chars().count(),
            chunks = self.state.chunks_received,
            elapsed = ?self.elapsed(),
            "Stream complete"
        );
        true
    }

    fn on_cancelled(&mut self) -> bool {
        if self.state.status == StreamStatus::Idle && self.buffer.is_empty() {
            self.pacing.stop();
            self.cancel.release();
            return self.ignore("cancelled");
        }

        self.flush_buffer();
        self.pacing.stop();
        self.cancel.release();
        self.state.is_typing = false;
        self.state.error = None;
        self.state.status = StreamStatus::Idle;
        info!(
            chars = self.state.content.chars().count(),
            "Stream cancelled"
        );
        true
    }

    fn on_error(&mut self, message: String) -> bool {
        self.pacing.stop();
        self.cancel.release();
        self.state.is_typing = false;
        warn!(error = %message, status = %self.state.status, "Stream failed");
        self.state.error = Some(message);
        self.state.status = StreamStatus::Error;
        true
    }

    fn on_conversation_bound(&mut self, id: String) -> bool {
        bind_once(&mut self.state.pending_conversation_id, id, "conversation")
    }

    fn on_message_bound(&mut self, id: String) -> bool {
        bind_once(&mut self.state.message_id, id, "message")
    }

    // --------------------------------------------------------
    // Pacing
    // --------------------------------------------------------

    /// Advances the reveal by one display tick.
    pub fn tick(&mut self) -> TickOutcome {
        if self.disposed {
            return TickOutcome::Inactive;
        }

        let outcome = self.pacing.step(
            &mut self.buffer,
            self.state.typing_speed,
            self.state.status,
        );

        match &outcome {
            TickOutcome::Revealed(text) => {
                self.state.content.push_str(text);
                self.state.is_typing = true;
                trace!(
                    revealed = text.chars().count(),
                    pending = self.buffer.char_len(),
                    "Tick"
                );
                self.publish();
            }
            TickOutcome::Stopped => {
                if self.state.is_typing {
                    self.state.is_typing = false;
                    self.publish();
                }
            }
            TickOutcome::Idle | TickOutcome::Inactive => {}
        }

        outcome
    }

    /// Reveals everything buffered right now, skipping the typing effect.
    ///
    /// The session status is unchanged; pacing keeps idling if more text
    /// is expected. Returns `false` if nothing was buffered.
    pub fn reveal_all(&mut self) -> bool {
        if self.disposed || self.buffer.is_empty() {
            return false;
        }
        self.flush_buffer();
        self.publish();
        true
    }

    /// Sets characters per tick, clamped to `[1, 50]`. Takes effect on the
    /// next tick. Returns the effective speed.
    pub fn set_typing_speed(&mut self, speed: usize) -> usize {
        let speed = clamp_typing_speed(speed);
        if speed != self.state.typing_speed && !self.disposed {
            debug!(speed, "Typing speed changed");
            self.state.typing_speed = speed;
            self.publish();
        }
        self.state.typing_speed
    }

    fn flush_buffer(&mut self) {
        if !self.buffer.is_empty() {
            let rest = self.buffer.drain_all();
            self.state.content.push_str(&rest);
        }
    }

    fn enforce_high_water_mark(&mut self) {
        let Some(limit) = self.high_water_mark else {
            return;
        };
        let pending = self.buffer.char_len();
        if pending <= limit {
            return;
        }
        let overflow = self.buffer.take_chars(pending - limit);
        debug!(
            overflow = pending - limit,
            limit, "Pending buffer over high-water mark; revealing overflow"
        );
        self.state.content.push_str(&overflow);
    }

    fn update_estimate(&mut self) {
        let mut candidate = String::with_capacity(self.state.content.len());
        candidate.push_str(&self.state.content);
        self.buffer.write_into(&mut candidate);

        match self.estimator.estimate(&candidate) {
            Ok(height) => {
                self.state.estimated_height = self.state.estimated_height.max(height);
            }
            Err(err) => {
                debug!(error = %err, "Height estimate unavailable; using zero");
            }
        }
    }

    // --------------------------------------------------------
    // Cancellation and lifecycle
    // --------------------------------------------------------

    /// Installs the abort handle for the request that is about to stream.
    pub fn attach_abort_handle(&mut self, token: CancellationToken) {
        if self.cancel.attach(token).is_some() {
            warn!("Abort handle replaced while another request was in flight");
        }
    }

    /// Creates, installs, and returns a fresh abort handle.
    pub fn issue_abort_handle(&mut self) -> CancellationToken {
        if self.cancel.is_armed() {
            warn!("Abort handle replaced while another request was in flight");
        }
        self.cancel.issue()
    }

    /// Cancels the in-flight request and finalizes what already arrived.
    ///
    /// No-op without a live handle, so repeated calls are harmless.
    /// Returns `true` if a request was cancelled.
    pub fn abort(&mut self) -> bool {
        if !self.cancel.abort() {
            return false;
        }
        info!("Aborting in-flight stream");
        self.handle(StreamSignal::Cancelled);
        true
    }

    /// Forces `idle` and clears everything except the typing speed.
    ///
    /// A live request is cancelled without emitting a `cancelled` signal.
    pub fn reset(&mut self) {
        self.pacing.stop();
        self.buffer.clear();
        if self.cancel.abort() {
            debug!("Reset cancelled an in-flight request");
        }
        self.state = StreamingState::new(self.state.typing_speed);
        self.session_started = None;
        self.first_chunk_at = None;
        if !self.disposed {
            self.publish();
        }
    }

    /// Resets, drops every listener, and stops accepting signals.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.reset();
        self.subscribers.clear();
        self.disposed = true;
        debug!("Stream engine disposed");
    }

    // --------------------------------------------------------
    // Subscriptions and accessors
    // --------------------------------------------------------

    /// Registers a listener for every subsequent state change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&StreamingState) + Send + 'static,
    {
        self.subscribers.subscribe(listener)
    }

    fn publish(&self) {
        self.subscribers.notify(&self.state);
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> &StreamingState {
        &self.state
    }

    /// Owned copy of the current state.
    pub fn snapshot(&self) -> StreamingState {
        self.state.clone()
    }

    /// Characters arrived but not yet revealed.
    pub fn pending_chars(&self) -> usize {
        self.buffer.char_len()
    }

    /// Returns `true` while the pacing scheduler wants ticks.
    pub fn is_pacing(&self) -> bool {
        self.pacing.is_running()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Returns `true` if a request can currently be aborted.
    pub fn has_abort_handle(&self) -> bool {
        self.cancel.is_armed()
    }

    /// Delay between `sent` and the first chunk of the current session.
    pub fn time_to_first_chunk(&self) -> Option<Duration> {
        match (self.session_started, self.first_chunk_at) {
            (Some(start), Some(first)) => Some(first.duration_since(start)),
            _ => None,
        }
    }

    /// Time since the current session was sent.
    pub fn elapsed(&self) -> Option<Duration> {
        self.session_started.map(|s| s.elapsed())
    }
}

impl std::fmt::Debug for StreamEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamEngine")
            .field("state", &self.state)
            .field("pending_chars", &self.buffer.char_len())
            .field("pacing", &self.pacing)
            .field("subscribers", &self.subscribers)
            .field("disposed", &self.disposed)
            .finish()
    }
}

/// Sets a correlation id unless one is already known for this session.
fn bind_once(slot: &mut Option<String>, id: String, kind: &'static str) -> bool {
    match slot {
        Some(existing) if *existing == id => false,
        Some(existing) => {
            debug!(kind, current = %existing, ignored = %id, "Correlation id already bound");
            false
        }
        None => {
            debug!(kind, %id, "Correlation id bound");
            *slot = Some(id);
            true
        }
    }
}
