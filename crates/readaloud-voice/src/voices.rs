//! Voice catalog: bounded polling and the default voice choice.
//!
//! Engines often report an empty list until they have loaded their voices.
//! The catalog is offered the engine's list once immediately and then on
//! each retry; after the last retry an empty list degrades to the
//! "No voices available" placeholder and `is_loaded()` stays false.

use std::time::Duration;

use readaloud_core::{Voice, VoiceFamily, VoiceMenu};

use crate::error::ReadAloudError;

/// Result of offering the engine's voice list to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Population {
    /// Voices arrived; one was selected.
    Loaded { count: usize, selected: usize },
    /// Still empty; offer again after `delay` as attempt `attempt`.
    Retry { attempt: u32, delay: Duration },
    /// Still empty after the final retry.
    Unavailable,
    /// A previous offer already loaded the list.
    AlreadyLoaded,
}

/// Voices known to one panel.
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    voices: Vec<Voice>,
    selected: Option<usize>,
    loaded: bool,
    polling: bool,
    max_retries: u32,
    interval: Duration,
}

impl VoiceCatalog {
    #[must_use]
    pub const fn new(max_retries: u32, interval: Duration) -> Self {
        Self {
            voices: Vec::new(),
            selected: None,
            loaded: false,
            polling: false,
            max_retries,
            interval,
        }
    }

    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub const fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn selected(&self) -> Option<&Voice> {
        self.selected.and_then(|i| self.voices.get(i))
    }

    pub const fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// Mark a poll chain as started. Returns `false` if one is already
    /// running or the list is loaded.
    pub fn begin_polling(&mut self) -> bool {
        if self.loaded || self.polling {
            return false;
        }
        self.polling = true;
        true
    }

    /// Offer the engine's current list; `attempt` 0 is the first look.
    pub fn offer(&mut self, available: Vec<Voice>, attempt: u32, page_lang: &str) -> Population {
        if self.loaded {
            return Population::AlreadyLoaded;
        }

        if available.is_empty() {
            if attempt < self.max_retries {
                tracing::debug!(attempt, "No voices yet, retrying");
                return Population::Retry {
                    attempt: attempt + 1,
                    delay: self.interval,
                };
            }
            self.polling = false;
            tracing::warn!(attempts = attempt + 1, "No voices available");
            return Population::Unavailable;
        }

        let selected = default_choice(&available, page_lang);
        let count = available.len();
        self.voices = available;
        self.selected = Some(selected);
        self.loaded = true;
        self.polling = false;

        tracing::info!(
            count,
            selected = %self.voices[selected].name,
            page_lang,
            "Voices loaded"
        );
        Population::Loaded { count, selected }
    }

    /// Select the voice at `index`.
    pub fn select(&mut self, index: usize) -> Result<&Voice, ReadAloudError> {
        if index >= self.voices.len() {
            return Err(ReadAloudError::InvalidVoice(index));
        }
        self.selected = Some(index);
        Ok(&self.voices[index])
    }

    /// Menu state for the host to render.
    pub fn menu(&self) -> VoiceMenu {
        if self.loaded {
            VoiceMenu::Options {
                labels: self.voices.iter().map(Voice::label).collect(),
                selected: self.selected.unwrap_or(0),
            }
        } else if self.polling {
            VoiceMenu::Loading
        } else {
            VoiceMenu::Unavailable
        }
    }
}

/// Default voice for `page_lang`.
///
/// In order: a preferred-vendor voice (Microsoft, Google or Premium) in the
/// page language; any voice in the page language; an English voice when
/// the page is not English; the first voice.
pub fn default_choice(voices: &[Voice], page_lang: &str) -> usize {
    let matches_lang = |v: &Voice, lang: &str| v.primary_language().is_some_and(|l| l == lang);

    voices
        .iter()
        .position(|v| matches_lang(v, page_lang) && VoiceFamily::is_preferred_name(&v.name))
        .or_else(|| voices.iter().position(|v| matches_lang(v, page_lang)))
        .or_else(|| {
            (page_lang != "en")
                .then(|| voices.iter().position(|v| matches_lang(v, "en")))
                .flatten()
        })
        .unwrap_or(0)
}
