//! Lifecycle signals raised by the transport layer.

use serde::{Deserialize, Serialize};

/// A lifecycle event delivered to [`StreamEngine::handle`](crate::StreamEngine::handle).
///
/// Only the shape of a chunk matters here; framing and decoding belong to
/// the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamSignal {
    /// A request was sent; a new session begins.
    Sent,

    /// An incremental text delta arrived.
    Chunk {
        /// The delta.
        text: String,
    },

    /// The transport finished normally.
    Done,

    /// The request was cancelled.
    Cancelled,

    /// The transport failed.
    Error {
        /// Human-readable failure description, recorded verbatim.
        message: String,
    },

    /// The conversation for the in-flight message became known.
    ConversationBound {
        /// Conversation id.
        id: String,
    },

    /// The transcript message id became known.
    MessageBound {
        /// Message id.
        id: String,
    },
}

impl StreamSignal {
    /// Creates a chunk signal.
    pub fn chunk(text: impl Into<String>) -> Self {
        Self::Chunk { text: text.into() }
    }

    /// Creates an error signal.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Short name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Chunk { .. } => "chunk",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Error { .. } => "error",
            Self::ConversationBound { .. } => "conversation_bound",
            Self::MessageBound { .. } => "message_bound",
        }
    }
}
