//! Port definitions (trait abstractions) for the host platform.
//!
//! Ports define the interfaces that the playback logic expects from the page
//! it runs in. They contain no implementation details and use only domain
//! types.
//!
//! # Design Rules
//!
//! - No DOM, browser or audio types in any signature
//! - Engine interaction is fire-and-forget; results come back as events
//! - Optional capabilities (media transport) must have a no-op stand-in

pub mod highlight;
pub mod host;
pub mod media;
pub mod speech_engine;

pub use highlight::{Anchor, HighlightSurface};
pub use host::{PageLanguageSources, PanelElement, PanelHost, VoiceMenu};
pub use media::{
    MediaArtwork, MediaMetadata, MediaTransport, NoopMediaTransport, mirror_playback_state,
};
pub use speech_engine::{
    BoundaryKind, EngineErrorKind, EngineEvent, RequestId, SpeechEngine, UtteranceRequest,
};
