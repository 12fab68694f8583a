//! Read-aloud panel behaviour.
//!
//! Turns a panel's markup into speech units, drives a host speech engine
//! through them one request at a time, and keeps a highlight in step with
//! what is being spoken.
//!
//! ```text
//!   page / OS action ─► PanelHandle ─► PanelDriver ─► ReadAloudPanel
//!                                                        │
//!                            Segmenter ◄── PlaybackPipeline ──► SpeechEngine
//!                                              │    ▲              │
//!                              HighlightDriver ◄┘    └── EngineEvent ┘
//! ```
//!
//! Port traits (`SpeechEngine`, `HighlightSurface`, `MediaTransport`,
//! `PanelHost`) live in `readaloud-core`; this crate only depends on them.

#![deny(unused_crate_dependencies)]

// Self dev-dependency enables `test-utils` for integration tests.
#[cfg(test)]
use readaloud_voice as _;

pub mod driver;
pub mod error;
pub mod highlight;
pub mod language;
pub mod markup;
pub mod pipeline;
pub mod segmenter;
// In-memory ports for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod transport;
pub mod utterance;
pub mod voices;

// Re-export key types for convenience
pub use driver::{PanelDriver, PanelHandle, PlaybackEventSink, spawn_event_bridge};
pub use error::{ReadAloudError, SYNTHESIS_UNAVAILABLE_NOTICE};
pub use highlight::{HighlightDriver, unit_duration};
pub use pipeline::{PlayOutcome, PlaybackEvent, PlaybackPipeline, ScheduledTimer, Timer};
pub use segmenter::{Segmentation, Segmenter};
pub use transport::{CommandSource, PanelInput, PanelTimer, ReadAloudPanel, TransportCommand};
pub use utterance::{UtteranceBuilder, UtteranceMode};
pub use voices::{Population, VoiceCatalog};
