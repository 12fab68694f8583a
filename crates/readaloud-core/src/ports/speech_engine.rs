//! Speech engine port: the host platform's synthesis capability.
//!
//! # Design Rules
//!
//! - The engine is consumed, never implemented here. Adapters translate the
//!   platform's callbacks into [`EngineEvent`]s and feed them back to the
//!   panel's input channel.
//! - Every event names the [`RequestId`] it belongs to. The pipeline drops
//!   events for any request that is not the one currently in flight.
//! - Queue semantics of `pause`/`resume`/`cancel` are whatever the platform
//!   does; the pipeline assumes nothing beyond the three state queries.

use serde::{Deserialize, Serialize};

use crate::domain::{UnitId, Voice};

/// Identity of one submitted request. Monotonic per panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// One request submitted to the speech engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtteranceRequest {
    /// Identity used to match lifecycle events.
    pub id: RequestId,

    /// Text to speak.
    pub text: String,

    /// Selected voice, if any voice was available.
    pub voice: Option<Voice>,

    /// Language tag passed alongside the text.
    pub lang: String,

    /// Originating unit (per-unit mode only).
    pub unit_index: Option<UnitId>,
}

/// Boundary granularity reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BoundaryKind {
    Word,
    Sentence,
}

/// Error categories reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineErrorKind {
    /// A newer request or a cancel preempted this one. Expected.
    Interrupted,
    /// The request was cancelled before it started.
    Canceled,
    /// Anything else, with the engine's own error code.
    Other(String),
}

impl EngineErrorKind {
    /// Map a platform error code (e.g. `"interrupted"`) to a kind.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "interrupted" => Self::Interrupted,
            "canceled" => Self::Canceled,
            other => Self::Other(other.to_string()),
        }
    }

    /// Benign interruption signals are recovered silently.
    #[must_use]
    pub const fn is_interruption(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

impl std::fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interrupted => f.write_str("interrupted"),
            Self::Canceled => f.write_str("canceled"),
            Self::Other(code) => f.write_str(code),
        }
    }
}

/// A lifecycle notification from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The request started speaking.
    Start { request: RequestId },

    /// The request finished speaking.
    End { request: RequestId },

    /// The request failed.
    Error {
        request: RequestId,
        kind: EngineErrorKind,
    },

    /// The engine acknowledged a pause while this request was active.
    Pause { request: RequestId },

    /// The engine acknowledged a resume while this request was active.
    Resume { request: RequestId },

    /// The engine reached a boundary inside the request.
    ///
    /// `char_index` counts Unicode scalar values from the start of the
    /// request text.
    Boundary {
        request: RequestId,
        kind: BoundaryKind,
        char_index: usize,
    },

    /// The engine's voice list changed.
    VoicesChanged,
}

impl EngineEvent {
    /// The request the event belongs to, if any.
    #[must_use]
    pub const fn request(&self) -> Option<RequestId> {
        match self {
            Self::Start { request }
            | Self::End { request }
            | Self::Error { request, .. }
            | Self::Pause { request }
            | Self::Resume { request }
            | Self::Boundary { request, .. } => Some(*request),
            Self::VoicesChanged => None,
        }
    }
}

/// The host's speech synthesis engine.
///
/// Calls are fire-and-forget; outcomes arrive later as [`EngineEvent`]s.
pub trait SpeechEngine {
    /// Submit a request. The engine may queue it behind others.
    fn speak(&mut self, request: &UtteranceRequest);

    /// Ask the engine to pause the current request.
    fn pause(&mut self);

    /// Ask the engine to resume after a pause.
    fn resume(&mut self);

    /// Drop the current request and everything queued behind it.
    fn cancel(&mut self);

    /// Whether the engine is speaking (including while paused mid-request).
    fn is_speaking(&self) -> bool;

    /// Whether the engine is paused.
    fn is_paused(&self) -> bool;

    /// Whether requests are queued but not yet started.
    fn is_pending(&self) -> bool;

    /// Voices currently known to the engine. May be empty until the engine
    /// fires [`EngineEvent::VoicesChanged`].
    fn voices(&self) -> Vec<Voice>;
}
