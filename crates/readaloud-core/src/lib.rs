//! Core domain types and port definitions for the read-aloud panel.
//!
//! This crate holds everything that is independent of how a panel is driven:
//! the speech unit model, voice classification, playback state labels, the
//! settings block, and the port traits through which the behaviour crate talks
//! to the host page (speech engine, highlight surface, media transport, DOM
//! host).

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    MediaPlaybackState, PlaybackState, ResetReason, SpeechUnit, UnitId, Voice, VoiceCapabilities,
    VoiceFamily,
};
pub use ports::{
    Anchor, BoundaryKind, EngineErrorKind, EngineEvent, HighlightSurface, MediaArtwork,
    MediaMetadata, MediaTransport, NoopMediaTransport, PageLanguageSources, PanelElement,
    PanelHost, RequestId, SpeechEngine, UtteranceRequest, VoiceMenu, mirror_playback_state,
};
pub use settings::{
    DEFAULT_LANGUAGE, DEFAULT_SPEECH_RATE_WPM, ReadAloudSettings, SettingsError,
    validate_settings,
};
