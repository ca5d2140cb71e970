//! Stream status and the state snapshot handed to subscribers.
//!
//! [`StreamingState`] is the single authoritative record of what the user
//! should currently see. Only [`StreamEngine`](crate::StreamEngine) mutates
//! it; everyone else gets a borrowed or cloned snapshot.

use serde::{Deserialize, Serialize};

/// Slowest reveal rate: one character per tick.
pub const MIN_TYPING_SPEED: usize = 1;

/// Fastest reveal rate in characters per tick.
pub const MAX_TYPING_SPEED: usize = 50;

/// Characters revealed per tick when nothing else is configured.
pub const DEFAULT_TYPING_SPEED: usize = 3;

/// Clamps a requested typing speed into `[MIN_TYPING_SPEED, MAX_TYPING_SPEED]`.
#[inline]
pub fn clamp_typing_speed(speed: usize) -> usize {
    speed.clamp(MIN_TYPING_SPEED, MAX_TYPING_SPEED)
}

/// Lifecycle status of the current stream session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    /// No session in progress.
    #[default]
    Idle,

    /// A request was sent; no text has arrived yet.
    Waiting,

    /// Chunks are arriving.
    Streaming,

    /// The transport reported a failure. Terminal for the session.
    Error,

    /// The transport finished normally. Terminal for the session.
    Complete,
}

impl StreamStatus {
    /// Returns `true` while a session is open and may still receive chunks.
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Waiting | Self::Streaming)
    }

    /// Returns `true` for `Error` and `Complete`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Error | Self::Complete)
    }

    /// Returns `true` if a new session may start from this status.
    #[inline]
    pub fn accepts_send(self) -> bool {
        matches!(self, Self::Idle | Self::Complete | Self::Error)
    }

    /// Returns the status name as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Waiting => "waiting",
            Self::Streaming => "streaming",
            Self::Error => "error",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StreamStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(Self::Idle),
            "waiting" => Ok(Self::Waiting),
            "streaming" => Ok(Self::Streaming),
            "error" => Ok(Self::Error),
            "complete" | "completed" | "done" => Ok(Self::Complete),
            _ => Err(format!("Unknown stream status: {}", s)),
        }
    }
}

/// Snapshot of everything the presentation layer needs to draw a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingState {
    /// Current lifecycle status.
    pub status: StreamStatus,

    /// Text revealed so far. Only grows within a session.
    pub content: String,

    /// Conversation the in-flight message belongs to, once known.
    pub pending_conversation_id: Option<String>,

    /// Transcript message id, once known.
    pub message_id: Option<String>,

    /// Failure description. Only set in [`StreamStatus::Error`].
    pub error: Option<String>,

    /// Whether the typing affordance should be shown.
    pub is_typing: bool,

    /// Characters revealed per tick.
    pub typing_speed: usize,

    /// Largest layout height predicted so far for this session.
    pub estimated_height: u32,

    /// Chunks accepted in this session.
    pub chunks_received: u32,
}

impl StreamingState {
    /// Creates an idle state with the given (clamped) typing speed.
    pub fn new(typing_speed: usize) -> Self {
        Self {
            status: StreamStatus::Idle,
            content: String::new(),
            pending_conversation_id: None,
            message_id: None,
            error: None,
            is_typing: false,
            typing_speed: clamp_typing_speed(typing_speed),
            estimated_height: 0,
            chunks_received: 0,
        }
    }

    /// Returns the error message if in error state.
    pub fn error_message(&self) -> Option<&str> {
        match self.status {
            StreamStatus::Error => self.error.as_deref(),
            _ => None,
        }
    }
}

impl Default for StreamingState {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_SPEED)
    }
}
