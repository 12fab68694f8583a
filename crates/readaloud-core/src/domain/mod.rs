//! Core domain types.
//!
//! These types represent the pure domain model, independent of any
//! rendering or speech technology.
//!
//! # Structure
//!
//! - `unit` - Speakable text segments (`SpeechUnit`)
//! - `voice` - Voice descriptors and capability classification
//! - `playback` - Playback state labels shared by the pipeline and the host

pub mod playback;
pub mod unit;
pub mod voice;

pub use playback::{MediaPlaybackState, PlaybackState, ResetReason};
pub use unit::{SpeechUnit, UnitId};
pub use voice::{Voice, VoiceCapabilities, VoiceFamily};
