//! Playback state labels.

use serde::{Deserialize, Serialize};

/// Current state of a panel's playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    /// Nothing queued, nothing in flight.
    #[default]
    Idle,

    /// A request is in flight or about to be submitted.
    Playing,

    /// The engine was asked to pause; the in-flight request is retained.
    Paused,
}

impl PlaybackState {
    /// Stable lowercase label for logs and host bindings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }
}

/// Value mirrored to the OS media transport indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaPlaybackState {
    Playing,
    Paused,
}

impl From<PlaybackState> for MediaPlaybackState {
    fn from(state: PlaybackState) -> Self {
        match state {
            PlaybackState::Playing => Self::Playing,
            PlaybackState::Idle | PlaybackState::Paused => Self::Paused,
        }
    }
}

/// Why a session was reset to idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResetReason {
    /// The user pressed stop.
    Stopped,
    /// A different voice was selected.
    VoiceChanged,
    /// The last queued request finished.
    Completed,
    /// The engine failed and nothing was left to advance to.
    EngineFailure,
    /// Playback was requested but there was nothing to speak.
    NothingToSpeak,
}
