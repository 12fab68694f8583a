//! In-memory port implementations for tests.
//!
//! Every double keeps its log behind an `Arc<Mutex<_>>`, so a test can box
//! one clone into the panel and keep another to inspect what happened.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use readaloud_core::{
    Anchor, HighlightSurface, MediaMetadata, MediaPlaybackState, MediaTransport,
    PageLanguageSources, PanelElement, PanelHost, SpeechEngine, UtteranceRequest, Voice, VoiceMenu,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ── Speech engine ──────────────────────────────────────────────────

/// A call made on [`ScriptedEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Speak(UtteranceRequest),
    Pause,
    Resume,
    Cancel,
}

#[derive(Debug, Default)]
struct EngineLog {
    calls: Vec<EngineCall>,
    voices: Vec<Voice>,
    speaking: bool,
    paused: bool,
}

/// Engine that records calls and never fires events on its own.
///
/// Tests deliver `EngineEvent`s by hand, which keeps interleavings explicit.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEngine {
    log: Arc<Mutex<EngineLog>>,
}

impl ScriptedEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_voices(voices: Vec<Voice>) -> Self {
        let engine = Self::default();
        engine.set_voices(voices);
        engine
    }

    /// Replace the reported voice list (e.g. before a voices-changed event).
    pub fn set_voices(&self, voices: Vec<Voice>) {
        lock(&self.log).voices = voices;
    }

    /// Mark the current utterance as finished on the engine side.
    pub fn set_speaking(&self, speaking: bool) {
        lock(&self.log).speaking = speaking;
    }

    #[must_use]
    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.log).calls.clone()
    }

    /// Requests passed to `speak`, in order.
    #[must_use]
    pub fn spoken(&self) -> Vec<UtteranceRequest> {
        lock(&self.log)
            .calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::Speak(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }
}

impl SpeechEngine for ScriptedEngine {
    fn speak(&mut self, request: &UtteranceRequest) {
        let mut log = lock(&self.log);
        log.speaking = true;
        log.calls.push(EngineCall::Speak(request.clone()));
    }

    fn pause(&mut self) {
        let mut log = lock(&self.log);
        log.paused = true;
        log.calls.push(EngineCall::Pause);
    }

    fn resume(&mut self) {
        let mut log = lock(&self.log);
        log.paused = false;
        log.calls.push(EngineCall::Resume);
    }

    fn cancel(&mut self) {
        let mut log = lock(&self.log);
        log.speaking = false;
        log.paused = false;
        log.calls.push(EngineCall::Cancel);
    }

    fn is_speaking(&self) -> bool {
        lock(&self.log).speaking
    }

    fn is_paused(&self) -> bool {
        lock(&self.log).paused
    }

    fn is_pending(&self) -> bool {
        false
    }

    fn voices(&self) -> Vec<Voice> {
        lock(&self.log).voices.clone()
    }
}

// ── Highlight surface ──────────────────────────────────────────────

#[derive(Debug, Default)]
struct SurfaceLog {
    markup: String,
    marks: BTreeSet<Anchor>,
    history: Vec<Anchor>,
}

/// Surface that tracks the applied markup and live marks.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    log: Arc<Mutex<SurfaceLog>>,
}

impl RecordingSurface {
    /// Surface whose container already holds `markup`.
    #[must_use]
    pub fn with_markup(markup: &str) -> Self {
        let surface = Self::default();
        lock(&surface.log).markup = markup.to_string();
        surface
    }

    /// Currently marked anchors, sorted.
    #[must_use]
    pub fn marked(&self) -> Vec<Anchor> {
        lock(&self.log).marks.iter().copied().collect()
    }

    /// Every anchor ever marked, in order.
    #[must_use]
    pub fn history(&self) -> Vec<Anchor> {
        lock(&self.log).history.clone()
    }

    #[must_use]
    pub fn markup(&self) -> String {
        lock(&self.log).markup.clone()
    }
}

impl HighlightSurface for RecordingSurface {
    fn apply_markup(&mut self, markup: &str) {
        let mut log = lock(&self.log);
        log.markup = markup.to_string();
        log.marks.clear();
    }

    fn mark(&mut self, anchor: Anchor) {
        let mut log = lock(&self.log);
        log.marks.insert(anchor);
        log.history.push(anchor);
    }

    fn unmark(&mut self, anchor: Anchor) {
        lock(&self.log).marks.remove(&anchor);
    }

    fn clear_marks(&mut self) {
        lock(&self.log).marks.clear();
    }
}

// ── Media transport ────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MediaLog {
    metadata: Option<MediaMetadata>,
    states: Vec<MediaPlaybackState>,
}

/// Media transport that records what it was told.
#[derive(Debug, Clone, Default)]
pub struct RecordingMedia {
    log: Arc<Mutex<MediaLog>>,
}

impl RecordingMedia {
    #[must_use]
    pub fn metadata(&self) -> Option<MediaMetadata> {
        lock(&self.log).metadata.clone()
    }

    #[must_use]
    pub fn states(&self) -> Vec<MediaPlaybackState> {
        lock(&self.log).states.clone()
    }

    #[must_use]
    pub fn last_state(&self) -> Option<MediaPlaybackState> {
        lock(&self.log).states.last().copied()
    }
}

impl MediaTransport for RecordingMedia {
    fn set_metadata(&mut self, metadata: &MediaMetadata) {
        lock(&self.log).metadata = Some(metadata.clone());
    }

    fn set_playback_state(&mut self, state: MediaPlaybackState) {
        lock(&self.log).states.push(state);
    }
}

// ── Panel host ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct HostLog {
    missing: HashSet<PanelElement>,
    content: Option<String>,
    languages: PageLanguageSources,
    menus: Vec<VoiceMenu>,
    open: Vec<bool>,
    notices: Vec<String>,
}

/// Host page with fixed content and every panel element present unless
/// removed with [`StaticHost::without`].
#[derive(Debug, Clone, Default)]
pub struct StaticHost {
    log: Arc<Mutex<HostLog>>,
}

impl StaticHost {
    #[must_use]
    pub fn new(content: &str) -> Self {
        let host = Self::default();
        lock(&host.log).content = Some(content.to_string());
        host
    }

    /// Drop an element from the page.
    #[must_use]
    pub fn without(self, element: PanelElement) -> Self {
        lock(&self.log).missing.insert(element);
        self
    }

    /// Set the language hints the page exposes.
    #[must_use]
    pub fn with_languages(self, sources: PageLanguageSources) -> Self {
        lock(&self.log).languages = sources;
        self
    }

    /// Voice menus rendered so far.
    #[must_use]
    pub fn menus(&self) -> Vec<VoiceMenu> {
        lock(&self.log).menus.clone()
    }

    #[must_use]
    pub fn last_menu(&self) -> Option<VoiceMenu> {
        lock(&self.log).menus.last().cloned()
    }

    /// Panel open/closed reports, in order.
    #[must_use]
    pub fn open_history(&self) -> Vec<bool> {
        lock(&self.log).open.clone()
    }

    #[must_use]
    pub fn notices(&self) -> Vec<String> {
        lock(&self.log).notices.clone()
    }
}

impl PanelHost for StaticHost {
    fn has_element(&self, element: PanelElement, _selector: &str) -> bool {
        !lock(&self.log).missing.contains(&element)
    }

    fn content_markup(&self) -> Option<String> {
        lock(&self.log).content.clone()
    }

    fn language_sources(&self) -> PageLanguageSources {
        lock(&self.log).languages.clone()
    }

    fn render_voice_menu(&mut self, menu: &VoiceMenu) {
        lock(&self.log).menus.push(menu.clone());
    }

    fn set_panel_open(&mut self, open: bool) {
        lock(&self.log).open.push(open);
    }

    fn notify_user(&mut self, message: &str) {
        lock(&self.log).notices.push(message.to_string());
    }
}
