//! Utterance builder: speech units → engine requests.
//!
//! # Modes
//!
//! - **Aggregate**: one request carrying every unit joined by spaces. The
//!   engine's word boundaries are mapped back to word anchors with
//!   [`word_index_at`].
//! - **Per-unit**: one request per unit starting at
//!   `max(requested, highest_started + 1)`. The floor keeps a unit whose
//!   start already fired from being spoken twice when the queue is rebuilt.
//!
//! The mode follows the voice's capability flags (see
//! [`readaloud_core::VoiceFamily`]). That classification is a name-based
//! heuristic; with no voice selected the aggregate path is used.

use std::collections::VecDeque;

use readaloud_core::{RequestId, SpeechUnit, UnitId, UtteranceRequest, Voice};
use serde::{Deserialize, Serialize};

/// How units are turned into requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UtteranceMode {
    #[default]
    Aggregate,
    PerUnit,
}

impl UtteranceMode {
    /// Mode for the selected voice.
    pub fn for_voice(voice: Option<&Voice>) -> Self {
        match voice {
            Some(v) if v.is_per_unit_capable() => Self::PerUnit,
            _ => Self::Aggregate,
        }
    }

    pub const fn is_per_unit(self) -> bool {
        matches!(self, Self::PerUnit)
    }
}

/// Language tag used when no voice is selected.
pub fn fallback_lang(page_lang: &str) -> &'static str {
    if page_lang.eq_ignore_ascii_case("es") {
        "es-MX"
    } else {
        "en-US"
    }
}

/// First unit a per-unit queue may start from.
pub fn start_index(requested: UnitId, highest_started: Option<UnitId>) -> UnitId {
    highest_started.map_or(requested, |h| requested.max(h + 1))
}

/// Word index for a character offset into the joined text.
///
/// Counts the whitespace runs before `char_index`, so an offset at the first
/// letter of a word yields that word's index.
pub fn word_index_at(text: &str, char_index: usize) -> usize {
    let mut index = 0;
    let mut in_space = false;
    for c in text.chars().take(char_index) {
        if c.is_whitespace() {
            if !in_space {
                index += 1;
                in_space = true;
            }
        } else {
            in_space = false;
        }
    }
    index
}

/// Issues requests with fresh, increasing identities.
#[derive(Debug, Default)]
pub struct UtteranceBuilder {
    next_id: u64,
}

impl UtteranceBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the request queue for `mode`.
    ///
    /// Returns an empty queue when there is nothing left to speak.
    pub fn build(
        &mut self,
        mode: UtteranceMode,
        units: &[SpeechUnit],
        voice: Option<&Voice>,
        page_lang: &str,
        requested_start: UnitId,
        highest_started: Option<UnitId>,
    ) -> VecDeque<UtteranceRequest> {
        let lang = voice.map_or_else(|| fallback_lang(page_lang).to_string(), |v| v.lang.clone());

        match mode {
            UtteranceMode::Aggregate => {
                if units.is_empty() {
                    return VecDeque::new();
                }
                let request = UtteranceRequest {
                    id: self.issue(),
                    text: SpeechUnit::joined_text(units),
                    voice: voice.cloned(),
                    lang,
                    unit_index: None,
                };
                VecDeque::from([request])
            }
            UtteranceMode::PerUnit => {
                let from = start_index(requested_start, highest_started);
                units
                    .iter()
                    .skip(from)
                    .map(|unit| UtteranceRequest {
                        id: self.issue(),
                        text: unit.text.clone(),
                        voice: voice.cloned(),
                        lang: lang.clone(),
                        unit_index: Some(unit.id),
                    })
                    .collect()
            }
        }
    }

    fn issue(&mut self) -> RequestId {
        self.next_id += 1;
        RequestId(self.next_id)
    }
}
