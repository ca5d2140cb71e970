//! Async driver that owns an engine and feeds it commands and ticks.
//!
//! The engine itself is synchronous. The driver gives it a home inside one
//! tokio task: transport adapters and UI code talk to it through a cloneable
//! [`DriverHandle`] (an unbounded, ordered command channel), and a
//! [`tokio::time::Interval`] supplies reveal ticks only while the pacing
//! scheduler wants them.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = EngineConfig::default();
//! let engine = StreamEngine::new(&config);
//! let (driver, handle) = StreamDriver::new(engine, &config);
//!
//! let shutdown = CancellationToken::new();
//! let task = tokio::spawn(driver.run(shutdown.clone()));
//!
//! handle.signal(StreamSignal::Sent);
//! handle.signal(StreamSignal::chunk("Hello"));
//! handle.signal(StreamSignal::Done);
//! drop(handle);
//!
//! let engine = task.await?;
//! ```

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::EngineConfig;
use crate::engine::StreamEngine;
use crate::signal::StreamSignal;
use crate::ticks::{IntervalTicks, TickSource};

/// Commands accepted by a running [`StreamDriver`].
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Forward a transport lifecycle signal.
    Signal(StreamSignal),
    /// Change characters per tick.
    SetTypingSpeed(usize),
    /// Abort the in-flight request.
    Abort,
    /// Force the engine back to idle.
    Reset,
    /// Reveal everything buffered immediately.
    RevealAll,
    /// Install the abort handle for the request about to stream.
    AttachAbortHandle(CancellationToken),
}

/// Cloneable sender half of a driver's command channel.
///
/// Every method returns `false` once the driver has stopped.
#[derive(Debug, Clone)]
pub struct DriverHandle {
    tx: mpsc::UnboundedSender<EngineCommand>,
}

impl DriverHandle {
    pub fn send(&self, command: EngineCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn signal(&self, signal: StreamSignal) -> bool {
        self.send(EngineCommand::Signal(signal))
    }

    pub fn set_typing_speed(&self, speed: usize) -> bool {
        self.send(EngineCommand::SetTypingSpeed(speed))
    }

    pub fn abort(&self) -> bool {
        self.send(EngineCommand::Abort)
    }

    pub fn reset(&self) -> bool {
        self.send(EngineCommand::Reset)
    }

    pub fn reveal_all(&self) -> bool {
        self.send(EngineCommand::RevealAll)
    }

    pub fn attach_abort_handle(&self, token: CancellationToken) -> bool {
        self.send(EngineCommand::AttachAbortHandle(token))
    }

    /// Returns `true` once the driver has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Runs a [`StreamEngine`] on a tokio task.
pub struct StreamDriver {
    engine: StreamEngine,
    rx: mpsc::UnboundedReceiver<EngineCommand>,
    ticks: IntervalTicks,
    tick_interval: Duration,
}

impl StreamDriver {
    /// Wraps `engine`, replacing its tick source with an interval gate.
    pub fn new(engine: StreamEngine, config: &EngineConfig) -> (Self, DriverHandle) {
        let ticks = IntervalTicks::new();
        let engine = engine.with_tick_source(Box::new(ticks.clone()));
        let (tx, rx) = mpsc::unbounded_channel();

        let driver = Self {
            engine,
            rx,
            ticks,
            // tokio::time::interval panics on a zero period.
            tick_interval: config.tick_interval().max(Duration::from_millis(1)),
        };
        (driver, DriverHandle { tx })
    }

    /// Processes commands and ticks until shutdown.
    ///
    /// Stops when `shutdown` fires, or when every [`DriverHandle`] is dropped
    /// and the remaining buffered text has been revealed. A session still
    /// open when the last handle goes away is finalized as cancelled.
    /// Returns the engine.
    pub async fn run(mut self, shutdown: CancellationToken) -> StreamEngine {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut commands_open = true;

        loop {
            if !commands_open && !self.ticks.is_active() {
                debug!("Command channel closed and pacing idle; driver exiting");
                break;
            }

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("Driver shutdown requested");
                    break;
                }

                command = self.rx.recv(), if commands_open => match command {
                    Some(command) => self.apply(command),
                    None => {
                        commands_open = false;
                        if self.engine.state().status.is_active() {
                            debug!("Command channel closed mid-stream; cancelling session");
                            self.engine.handle(StreamSignal::Cancelled);
                        }
                    }
                },

                _ = interval.tick(), if self.ticks.is_active() => {
                    self.engine.tick();
                }
            }
        }

        self.engine
    }

    fn apply(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Signal(signal) => self.engine.handle(signal),
            EngineCommand::SetTypingSpeed(speed) => {
                self.engine.set_typing_speed(speed);
            }
            EngineCommand::Abort => {
                self.engine.abort();
            }
            EngineCommand::Reset => self.engine.reset(),
            EngineCommand::RevealAll => {
                self.engine.reveal_all();
            }
            EngineCommand::AttachAbortHandle(token) => self.engine.attach_abort_handle(token),
        }
    }

    /// The wrapped engine, for inspection before the driver starts.
    pub fn engine(&self) -> &StreamEngine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::state::StreamStatus;

    fn spawn_driver(
        speed: usize,
    ) -> (
        DriverHandle,
        Arc<Mutex<Vec<String>>>,
        tokio::task::JoinHandle<StreamEngine>,
        CancellationToken,
    ) {
        let config = EngineConfig::default().with_typing_speed(speed);
        let engine = StreamEngine::new(&config);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        engine.subscribe(move |state| sink.lock().push(state.content.clone()));

        let (driver, handle) = StreamDriver::new(engine, &config);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(driver.run(shutdown.clone()));
        (handle, seen, task, shutdown)
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_reveals_on_interval() {
        let (handle, seen, task, _shutdown) = spawn_driver(2);

        handle.signal(StreamSignal::Sent);
        handle.signal(StreamSignal::chunk("Hel"));
        handle.signal(StreamSignal::chunk("lo"));
        tokio::time::sleep(Duration::from_millis(200)).await;

        handle.signal(StreamSignal::Done);
        drop(handle);
        let engine = task.await.expect("driver task");

        assert_eq!(engine.state().status, StreamStatus::Complete);
        assert_eq!(engine.state().content, "Hello");
        let seen = seen.lock();
        assert!(seen.contains(&"He".to_string()));
        assert!(seen.contains(&"Hell".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_drains_after_handles_dropped() {
        let (handle, _seen, task, _shutdown) = spawn_driver(1);

        handle.signal(StreamSignal::Sent);
        handle.signal(StreamSignal::chunk("abc"));
        handle.signal(StreamSignal::Cancelled);
        drop(handle);

        let engine = task.await.expect("driver task");
        assert_eq!(engine.state().content, "abc");
        assert_eq!(engine.state().status, StreamStatus::Idle);
        assert!(!engine.is_pacing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_exits_when_handles_dropped_mid_stream() {
        let (handle, _seen, task, _shutdown) = spawn_driver(1);

        handle.signal(StreamSignal::Sent);
        handle.signal(StreamSignal::chunk("abc"));
        drop(handle);

        let engine = tokio::time::timeout(Duration::from_secs(3600), task)
            .await
            .expect("driver should stop once every handle is dropped")
            .expect("driver task");
        assert_eq!(engine.state().status, StreamStatus::Idle);
        assert_eq!(engine.state().content, "abc");
        assert!(!engine.is_pacing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_abort_cancels_transport_token() {
        let (handle, _seen, task, _shutdown) = spawn_driver(1);
        let token = CancellationToken::new();

        handle.attach_abort_handle(token.clone());
        handle.signal(StreamSignal::Sent);
        handle.signal(StreamSignal::chunk("partial"));
        handle.abort();
        drop(handle);

        let engine = task.await.expect("driver task");
        assert!(token.is_cancelled());
        assert_eq!(engine.state().status, StreamStatus::Idle);
        assert_eq!(engine.state().content, "partial");
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_shutdown_returns_engine_mid_stream() {
        let (handle, _seen, task, shutdown) = spawn_driver(1);

        handle.signal(StreamSignal::Sent);
        handle.signal(StreamSignal::chunk("never finished"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();

        let engine = task.await.expect("driver task");
        assert_eq!(engine.state().status, StreamStatus::Streaming);
        assert!(engine.state().content.len() < "never finished".len());
        assert!(handle.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_speed_and_reveal_all_commands() {
        let (handle, _seen, task, _shutdown) = spawn_driver(1);

        handle.set_typing_speed(1000);
        handle.signal(StreamSignal::Sent);
        handle.signal(StreamSignal::chunk("instant"));
        handle.reveal_all();
        handle.reset();
        drop(handle);

        let engine = task.await.expect("driver task");
        assert_eq!(engine.state().typing_speed, 50);
        assert_eq!(engine.state().status, StreamStatus::Idle);
        assert_eq!(engine.state().content, "");
    }
}
