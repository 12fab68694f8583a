//! Settings domain types and validation.
//!
//! Hosts configure a panel with a JSON object; every field is optional and
//! falls back to the defaults below.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ports::MediaMetadata;

/// Speech rate assumed by the highlight timer, in words per minute.
pub const DEFAULT_SPEECH_RATE_WPM: u32 = 130;

/// Language used when nothing on the page declares one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Per-panel settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadAloudSettings {
    /// Speech rate assumed when timing unit highlights.
    pub speech_rate_wpm: u32,

    /// Shortest time a unit stays highlighted.
    pub min_unit_duration_ms: u64,

    /// Wait between an engine event and the next submission.
    pub settle_delay_ms: u64,

    /// Longest chunk cut from a long block, in words.
    pub max_chunk_words: usize,

    /// Voice list retries before giving up.
    pub voice_poll_attempts: u32,

    /// Spacing between voice list retries.
    pub voice_poll_interval_ms: u64,

    /// Fallback page language.
    pub default_language: String,

    /// Metadata published to the OS media transport.
    pub media_metadata: MediaMetadata,
}

impl Default for ReadAloudSettings {
    fn default() -> Self {
        Self {
            speech_rate_wpm: DEFAULT_SPEECH_RATE_WPM,
            min_unit_duration_ms: 1000,
            settle_delay_ms: 10,
            max_chunk_words: 20,
            voice_poll_attempts: 5,
            voice_poll_interval_ms: 100,
            default_language: DEFAULT_LANGUAGE.to_string(),
            media_metadata: MediaMetadata::default(),
        }
    }
}

impl ReadAloudSettings {
    /// Parse settings from a JSON object and validate them.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        validate_settings(&settings)?;
        tracing::debug!(
            rate = settings.speech_rate_wpm,
            chunk_words = settings.max_chunk_words,
            "Loaded read-aloud settings"
        );
        Ok(settings)
    }

    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    #[must_use]
    pub const fn min_unit_duration(&self) -> Duration {
        Duration::from_millis(self.min_unit_duration_ms)
    }

    #[must_use]
    pub const fn voice_poll_interval(&self) -> Duration {
        Duration::from_millis(self.voice_poll_interval_ms)
    }
}

/// Settings validation error.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Speech rate must be between 40 and 400 words per minute, got {0}")]
    InvalidSpeechRate(u32),

    #[error("Chunk size must be between 1 and 200 words, got {0}")]
    InvalidChunkSize(usize),

    #[error("Voice poll attempts must be at most 50, got {0}")]
    InvalidPollAttempts(u32),

    #[error("Default language cannot be empty")]
    EmptyDefaultLanguage,

    #[error("Malformed settings JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Validate settings values.
pub fn validate_settings(settings: &ReadAloudSettings) -> Result<(), SettingsError> {
    if !(40..=400).contains(&settings.speech_rate_wpm) {
        return Err(SettingsError::InvalidSpeechRate(settings.speech_rate_wpm));
    }

    if !(1..=200).contains(&settings.max_chunk_words) {
        return Err(SettingsError::InvalidChunkSize(settings.max_chunk_words));
    }

    if settings.voice_poll_attempts > 50 {
        return Err(SettingsError::InvalidPollAttempts(
            settings.voice_poll_attempts,
        ));
    }

    if settings.default_language.trim().is_empty() {
        return Err(SettingsError::EmptyDefaultLanguage);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ReadAloudSettings::default();
        assert_eq!(settings.speech_rate_wpm, 130);
        assert_eq!(settings.min_unit_duration(), Duration::from_secs(1));
        assert_eq!(settings.settle_delay(), Duration::from_millis(10));
        assert_eq!(settings.max_chunk_words, 20);
        assert_eq!(settings.voice_poll_attempts, 5);
        assert_eq!(settings.voice_poll_interval(), Duration::from_millis(100));
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = ReadAloudSettings::from_json(r#"{"speechRateWpm": 160}"#).unwrap();
        assert_eq!(settings.speech_rate_wpm, 160);
        assert_eq!(settings.max_chunk_words, 20);
        assert_eq!(settings.media_metadata.title, "Safety Module");
    }

    #[test]
    fn test_validate_rate_out_of_range() {
        let settings = ReadAloudSettings {
            speech_rate_wpm: 5,
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidSpeechRate(5))
        ));
    }

    #[test]
    fn test_validate_chunk_size_zero() {
        let err = ReadAloudSettings::from_json(r#"{"maxChunkWords": 0}"#).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidChunkSize(0)));
    }

    #[test]
    fn test_malformed_json() {
        let err = ReadAloudSettings::from_json("{not json").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn test_empty_language_rejected() {
        let settings = ReadAloudSettings {
            default_language: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::EmptyDefaultLanguage)
        ));
    }
}
