//! # Parley Stream
//!
//! Presentation engine for streamed model responses.
//!
//! The engine sits between an opaque transport that produces text chunks
//! and an opaque renderer that draws them. It turns bursty arrival into a
//! steady, per-tick "typing" reveal, keeps exactly one stream live at a
//! time, and lets the user cancel without losing text that already arrived.
//!
//! ## Components
//!
//! - [`StreamEngine`] - owns the authoritative [`StreamingState`] and the
//!   lifecycle state machine
//! - [`PendingBuffer`] - arrived-but-not-revealed text
//! - [`PacingScheduler`] - drains the buffer once per display tick
//! - [`HeightEstimator`] / [`WrapEstimator`] - layout height prediction
//! - [`CancellationController`] - the single live abort handle
//! - [`SubscriberRegistry`] - synchronous snapshot notifications
//! - [`StreamDriver`] - async loop feeding commands and ticks to an engine
//!
//! ## Architecture
//!
//! ```text
//!   transport ──StreamSignal──▶ StreamEngine ──snapshot──▶ listeners
//!                                  │    ▲
//!                           push   │    │ reveal
//!                                  ▼    │
//!                            PendingBuffer ◀── PacingScheduler ◀── TickSource
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parley_stream::{EngineConfig, StreamEngine, StreamSignal};
//!
//! let config = EngineConfig::default().with_typing_speed(2);
//! let mut engine = StreamEngine::new(&config);
//! let _sub = engine.subscribe(|state| println!("{}", state.content));
//!
//! engine.handle(StreamSignal::Sent);
//! engine.handle(StreamSignal::chunk("Hello"));
//! engine.tick(); // "He"
//! engine.handle(StreamSignal::Done); // "Hello"
//! ```

pub mod buffer;
pub mod cancel;
pub mod config;
pub mod driver;
pub mod engine;
pub mod estimate;
pub mod pacing;
pub mod signal;
pub mod state;
pub mod subscribers;
pub mod ticks;

pub use buffer::PendingBuffer;
pub use cancel::CancellationController;
pub use config::{ConfigError, ConfigResult, EngineConfig};
pub use driver::{DriverHandle, EngineCommand, StreamDriver};
pub use engine::StreamEngine;
pub use estimate::{EstimateError, HeightEstimator, Typography, WrapEstimator};
pub use pacing::{PacingScheduler, TickOutcome};
pub use signal::StreamSignal;
pub use state::{
    DEFAULT_TYPING_SPEED, MAX_TYPING_SPEED, MIN_TYPING_SPEED, StreamStatus, StreamingState,
    clamp_typing_speed,
};
pub use subscribers::{Listener, SubscriberId, SubscriberRegistry, Subscription};
pub use ticks::{IntervalTicks, ManualTicks, TickSource};

/// Parley Stream version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
