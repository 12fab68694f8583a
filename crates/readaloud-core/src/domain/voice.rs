//! Voice descriptors and capability classification.
//!
//! Speech engines report voices as a name plus a BCP-47 language tag and
//! nothing else. Whether a voice reports accurate word boundaries or only
//! per-request start/end is inferred from the vendor name.
//!
//! # Invariant
//!
//! The classification is a best-effort heuristic. A voice that matches no
//! known vendor family takes the word-boundary (aggregate) path, the same
//! as an explicitly word-boundary-capable voice.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// A synthetic voice offered by the speech engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Voice {
    /// Self-reported voice name (e.g. `"Google español de Estados Unidos"`).
    pub name: String,

    /// BCP-47 language tag (e.g. `"es-US"`). May be empty.
    pub lang: String,
}

impl Voice {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }

    /// Lowercase primary language subtag (`"es-MX"` → `"es"`).
    ///
    /// Returns `None` when the voice carries no language tag.
    #[must_use]
    pub fn primary_language(&self) -> Option<String> {
        let primary = self.lang.split('-').next().unwrap_or("").trim();
        if primary.is_empty() {
            None
        } else {
            Some(primary.to_ascii_lowercase())
        }
    }

    /// Label shown in the voice menu: `"{name} ({lang})"`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.lang)
    }

    /// Vendor family inferred from the name.
    #[must_use]
    pub fn family(&self) -> VoiceFamily {
        VoiceFamily::classify(&self.name)
    }

    /// Whether playback should issue one request per unit for this voice.
    #[must_use]
    pub fn is_per_unit_capable(&self) -> bool {
        self.family().capabilities().per_request_boundaries()
    }
}

bitflags! {
    /// What a voice's engine reliably reports during playback.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[repr(transparent)]
    pub struct VoiceCapabilities: u8 {
        /// Accurate intra-request word boundary events.
        const WORD_BOUNDARIES        = 0b0000_0001;

        /// Accurate per-request start/end events, so a queue of short
        /// requests can be tracked unit by unit.
        const PER_REQUEST_BOUNDARIES = 0b0000_0010;
    }
}

impl VoiceCapabilities {
    /// Check if word boundary events can drive highlighting.
    pub const fn word_boundaries(self) -> bool {
        self.contains(Self::WORD_BOUNDARIES)
    }

    /// Check if the one-request-per-unit strategy applies.
    pub const fn per_request_boundaries(self) -> bool {
        self.contains(Self::PER_REQUEST_BOUNDARIES)
    }
}

impl Serialize for VoiceCapabilities {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for VoiceCapabilities {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        Ok(Self::from_bits_truncate(bits))
    }
}

/// Vendor family a voice belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VoiceFamily {
    /// Reports start/end per request, word events are unreliable.
    Google,
    /// Reports word boundaries, queuing of many requests is unreliable.
    Microsoft,
    /// Unknown vendor.
    Other,
}

impl VoiceFamily {
    /// Classify a voice by its self-reported name.
    #[must_use]
    pub fn classify(name: &str) -> Self {
        if name.contains("Google") {
            Self::Google
        } else if name.contains("Microsoft") {
            Self::Microsoft
        } else {
            Self::Other
        }
    }

    /// Capabilities assumed for the family.
    #[must_use]
    pub const fn capabilities(self) -> VoiceCapabilities {
        match self {
            Self::Google => VoiceCapabilities::PER_REQUEST_BOUNDARIES,
            Self::Microsoft | Self::Other => VoiceCapabilities::WORD_BOUNDARIES,
        }
    }

    /// Whether the default-voice choice should prefer this voice name.
    #[must_use]
    pub fn is_preferred_name(name: &str) -> bool {
        ["Microsoft", "Google", "Premium"]
            .iter()
            .any(|vendor| name.contains(vendor))
    }
}
