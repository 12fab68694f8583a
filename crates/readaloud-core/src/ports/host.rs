//! Panel host port: the page around one read-aloud module.
//!
//! A host owns the actual elements (toggle button, content container,
//! transport buttons, voice selector). The panel only asks whether they
//! exist, reads the content markup once, reads page-language hints, and
//! pushes a handful of view updates back.

use serde::{Deserialize, Serialize};

/// Elements a module needs before it can activate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PanelElement {
    ToggleButton,
    CollapsibleContent,
    PlayButton,
    PauseButton,
    StopButton,
    VoiceSelect,
    SpeakableContent,
}

impl PanelElement {
    /// Every element required for activation, in report order.
    pub const REQUIRED: [Self; 7] = [
        Self::SpeakableContent,
        Self::VoiceSelect,
        Self::PlayButton,
        Self::PauseButton,
        Self::StopButton,
        Self::ToggleButton,
        Self::CollapsibleContent,
    ];

    /// Class-name suffix appended to the module id (`"{id}-{suffix}"`).
    #[must_use]
    pub const fn class_suffix(self) -> &'static str {
        match self {
            Self::ToggleButton => "btn",
            Self::CollapsibleContent => "content",
            Self::PlayButton => "play",
            Self::PauseButton => "pause",
            Self::StopButton => "stop",
            Self::VoiceSelect => "voice",
            Self::SpeakableContent => "tts-content",
        }
    }

    /// Class selector for this element inside module `module_id`.
    #[must_use]
    pub fn selector(self, module_id: &str) -> String {
        format!(".{module_id}-{}", self.class_suffix())
    }
}

/// What the voice selector should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum VoiceMenu {
    /// Voices are still being polled.
    Loading,
    /// Polling gave up.
    Unavailable,
    /// Voices are listed; `selected` indexes `labels`.
    Options { labels: Vec<String>, selected: usize },
}

impl VoiceMenu {
    /// Placeholder option text, if the menu has no real options.
    #[must_use]
    pub const fn placeholder(&self) -> Option<&'static str> {
        match self {
            Self::Loading => Some("Loading voices..."),
            Self::Unavailable => Some("No voices available"),
            Self::Options { .. } => None,
        }
    }
}

/// Raw page-language hints, in no particular order. Each field is exactly
/// what the page exposes; normalisation happens in the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageLanguageSources {
    /// `lang` attribute of the document element.
    pub html_lang: Option<String>,
    /// `lang` attribute of the body.
    pub body_lang: Option<String>,
    /// Content of a content-language / language meta tag.
    pub meta_language: Option<String>,
    /// Full page URL.
    pub url: Option<String>,
    /// `lang` of the first visible multilang marker.
    pub visible_multilang: Option<String>,
    /// `lang` of the first element carrying one inside the content.
    pub content_lang: Option<String>,
    /// Value of a language selector / data-lang field.
    pub form_language: Option<String>,
    /// Raw `document.cookie` string.
    pub cookie: Option<String>,
    /// Stored preference values keyed by storage key.
    pub stored: Vec<(String, String)>,
    /// Browser language list, most preferred first.
    pub browser_languages: Vec<String>,
}

/// The page hosting one panel.
pub trait PanelHost {
    /// Whether `element` exists under `selector`.
    fn has_element(&self, element: PanelElement, selector: &str) -> bool;

    /// Inner markup of the speakable content container.
    fn content_markup(&self) -> Option<String>;

    /// Current page-language hints.
    fn language_sources(&self) -> PageLanguageSources;

    /// Show the voice selector state.
    fn render_voice_menu(&mut self, menu: &VoiceMenu);

    /// Expand or collapse the panel.
    fn set_panel_open(&mut self, open: bool);

    /// Blocking notice shown directly to the user.
    fn notify_user(&mut self, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_use_module_prefix() {
        assert_eq!(PanelElement::PlayButton.selector("mod7"), ".mod7-play");
        assert_eq!(
            PanelElement::SpeakableContent.selector("mod7"),
            ".mod7-tts-content"
        );
    }

    #[test]
    fn placeholders() {
        assert_eq!(VoiceMenu::Unavailable.placeholder(), Some("No voices available"));
        assert_eq!(VoiceMenu::Loading.placeholder(), Some("Loading voices..."));
        let menu = VoiceMenu::Options {
            labels: vec!["Alex (en-US)".to_string()],
            selected: 0,
        };
        assert_eq!(menu.placeholder(), None);
    }
}
