//! Speakable text segments.

use serde::{Deserialize, Serialize};

/// Position of a [`SpeechUnit`] in spoken order.
pub type UnitId = usize;

/// One speakable segment of panel text.
///
/// A unit is either a whole block (paragraph, list item, heading) or a
/// chunk of at most `maxChunkWords` words cut from a longer block. Units are
/// immutable once produced; the sequence is rebuilt from the original markup
/// whenever playback starts afresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechUnit {
    /// Index in spoken order.
    pub id: UnitId,

    /// Whitespace-normalised text.
    pub text: String,

    /// Number of whitespace-separated words in `text`.
    pub word_count: usize,

    /// Char offset of the unit in the space-joined document text.
    pub char_start: usize,

    /// Char offset one past the unit's last char in the joined text.
    pub char_end: usize,

    /// Whether the unit was cut from a longer block.
    pub is_chunk: bool,
}

impl SpeechUnit {
    /// Join unit texts with single spaces, the way they are spoken in
    /// aggregate mode. `char_start`/`char_end` index into this string.
    #[must_use]
    pub fn joined_text(units: &[Self]) -> String {
        units
            .iter()
            .map(|u| u.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
