//! Read-aloud error types.

use readaloud_core::SettingsError;

/// Blocking notice shown when the host cannot synthesise speech at all.
pub const SYNTHESIS_UNAVAILABLE_NOTICE: &str = "Text-to-speech is not supported on this host.";

/// Errors surfaced to the code that mounts or drives a panel.
///
/// Engine failures during playback are not errors at this level: the
/// pipeline recovers from them and reports them as playback events.
#[derive(Debug, thiserror::Error)]
pub enum ReadAloudError {
    /// Required panel elements are absent; the panel does not activate.
    #[error("Panel '{module_id}' is missing required elements: {}", missing.join(", "))]
    MissingElements {
        module_id: String,
        missing: Vec<String>,
    },

    /// The engine reported no voices after every retry.
    #[error("No voices available")]
    NoVoices,

    /// The host has no speech synthesis capability.
    #[error("Speech synthesis is not available on this host")]
    SynthesisUnavailable,

    /// Settings failed validation.
    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),

    /// Voice index outside the current list.
    #[error("No voice at index {0}")]
    InvalidVoice(usize),

    /// Malformed JSON command or payload.
    #[error("Malformed JSON: {0}")]
    Config(#[from] serde_json::Error),
}
