//! Transport surface: one mounted read-aloud panel.
//!
//! [`ReadAloudPanel`] wires the page controls (toggle, play, pause, stop,
//! voice selector) and the OS media-session actions to the playback
//! pipeline. A play from the media session is the same command as the
//! in-page play button; resuming a paused in-flight request always wins
//! over rebuilding the queue.

use readaloud_core::{
    EngineEvent, HighlightSurface, MediaTransport, PanelElement, PanelHost, ReadAloudSettings,
    SpeechEngine, validate_settings,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{ReadAloudError, SYNTHESIS_UNAVAILABLE_NOTICE};
use crate::language;
use crate::pipeline::{PlayOutcome, PlaybackEvent, PlaybackPipeline, ScheduledTimer, Timer};
use crate::voices::{Population, VoiceCatalog};

// ── Inputs ─────────────────────────────────────────────────────────

/// A user or OS transport command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum TransportCommand {
    Play,
    Pause,
    Stop,
    Toggle,
    SelectVoice { index: usize },
}

impl TransportCommand {
    /// Parse a command posted by a page script, e.g.
    /// `{"command":"selectVoice","index":2}`.
    pub fn from_json(json: &str) -> Result<Self, ReadAloudError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Where a command came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandSource {
    /// In-page control.
    #[default]
    Page,
    /// OS media-session handler.
    MediaSession,
}

/// Deferred panel work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelTimer {
    Playback(Timer),
    VoicePoll { attempt: u32 },
}

/// Everything that can happen to a panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelInput {
    Command {
        command: TransportCommand,
        source: CommandSource,
    },
    Engine(EngineEvent),
    Timer(PanelTimer),
    Unload,
}

// ── Panel ──────────────────────────────────────────────────────────

/// A mounted panel.
pub struct ReadAloudPanel {
    module_id: String,
    host: Box<dyn PanelHost>,
    pipeline: PlaybackPipeline,
    catalog: VoiceCatalog,
    page_lang: String,
    open: bool,
    timers: Vec<ScheduledTimer<PanelTimer>>,
}

impl ReadAloudPanel {
    /// Mount the panel for `module_id`.
    ///
    /// Starts populating the voice menu right away. Fails when settings are
    /// invalid, when a required element is missing
    /// (logged, panel inactive) or when the host has no speech engine (the
    /// user gets a blocking notice).
    pub fn mount(
        module_id: impl Into<String>,
        mut host: Box<dyn PanelHost>,
        engine: Option<Box<dyn SpeechEngine>>,
        surface: Box<dyn HighlightSurface>,
        mut media: Option<Box<dyn MediaTransport>>,
        settings: ReadAloudSettings,
    ) -> Result<(Self, mpsc::UnboundedReceiver<PlaybackEvent>), ReadAloudError> {
        let module_id = module_id.into();
        validate_settings(&settings)?;

        let missing: Vec<String> = PanelElement::REQUIRED
            .iter()
            .map(|e| e.selector(&module_id))
            .zip(PanelElement::REQUIRED)
            .filter(|(selector, element)| !host.has_element(*element, selector))
            .map(|(selector, _)| selector)
            .collect();
        if !missing.is_empty() {
            tracing::error!(module_id = %module_id, ?missing, "Read-aloud panel elements not found");
            return Err(ReadAloudError::MissingElements { module_id, missing });
        }

        let Some(engine) = engine else {
            tracing::error!(module_id = %module_id, "Speech synthesis not available");
            host.notify_user(SYNTHESIS_UNAVAILABLE_NOTICE);
            return Err(ReadAloudError::SynthesisUnavailable);
        };

        let markup = host.content_markup().unwrap_or_default();
        let page_lang = language::resolve(&host.language_sources(), &settings.default_language);

        if let Some(media) = media.as_mut() {
            media.set_metadata(&settings.media_metadata);
        }

        let catalog = VoiceCatalog::new(settings.voice_poll_attempts, settings.voice_poll_interval());
        let (pipeline, events) = PlaybackPipeline::new(markup, engine, surface, media, settings);

        tracing::info!(module_id = %module_id, page_lang = %page_lang, "Read-aloud panel mounted");

        let mut panel = Self {
            module_id,
            host,
            pipeline,
            catalog,
            page_lang,
            open: false,
            timers: Vec::new(),
        };
        panel.ensure_voices();
        Ok((panel, events))
    }

    // ── Accessors ──────────────────────────────────────────────────

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub const fn pipeline(&self) -> &PlaybackPipeline {
        &self.pipeline
    }

    pub const fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }

    pub const fn voices_loaded(&self) -> bool {
        self.catalog.is_loaded()
    }

    pub fn page_language(&self) -> &str {
        &self.page_lang
    }

    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Drain timers scheduled by the panel and its pipeline.
    pub fn take_scheduled(&mut self) -> Vec<ScheduledTimer<PanelTimer>> {
        let mut timers = std::mem::take(&mut self.timers);
        timers.extend(
            self.pipeline
                .take_scheduled()
                .into_iter()
                .map(|t| ScheduledTimer {
                    delay: t.delay,
                    timer: PanelTimer::Playback(t.timer),
                }),
        );
        timers
    }

    // ── Commands ───────────────────────────────────────────────────

    /// Expand or collapse the panel. Opening retries voice loading if an
    /// earlier poll chain gave up.
    pub fn toggle(&mut self) {
        self.open = !self.open;
        self.host.set_panel_open(self.open);
        tracing::debug!(module_id = %self.module_id, open = self.open, "Panel toggled");
        if self.open {
            self.ensure_voices();
        }
    }

    pub fn play(&mut self, source: CommandSource) -> PlayOutcome {
        self.ensure_voices();
        let outcome = self
            .pipeline
            .play(self.catalog.selected(), &self.page_lang);
        tracing::debug!(module_id = %self.module_id, ?source, ?outcome, "Play");
        outcome
    }

    pub fn pause(&mut self, source: CommandSource) -> bool {
        let paused = self.pipeline.pause();
        tracing::debug!(module_id = %self.module_id, ?source, paused, "Pause");
        paused
    }

    pub fn stop(&mut self) {
        self.pipeline.stop();
    }

    /// Select a voice; any running session stops.
    pub fn select_voice(&mut self, index: usize) -> Result<(), ReadAloudError> {
        let voice = self.catalog.select(index)?.clone();
        self.pipeline.change_voice(Some(voice));
        self.host.render_voice_menu(&self.catalog.menu());
        Ok(())
    }

    /// Apply one input. Returns `false` once the panel has been unloaded.
    pub fn dispatch(&mut self, input: PanelInput) -> bool {
        match input {
            PanelInput::Command { command, source } => self.command(command, source),
            PanelInput::Engine(EngineEvent::VoicesChanged) => self.on_voices_changed(),
            PanelInput::Engine(event) => self.pipeline.handle_engine_event(&event),
            PanelInput::Timer(PanelTimer::Playback(timer)) => self.pipeline.fire_timer(timer),
            PanelInput::Timer(PanelTimer::VoicePoll { attempt }) => {
                if self.catalog.is_polling() {
                    self.poll_voices(attempt);
                }
            }
            PanelInput::Unload => {
                self.teardown();
                return false;
            }
        }
        true
    }

    /// Cancel speech and pending work.
    pub fn teardown(&mut self) {
        tracing::info!(module_id = %self.module_id, "Read-aloud panel unloading");
        self.pipeline.teardown();
        self.timers.clear();
    }

    fn command(&mut self, command: TransportCommand, source: CommandSource) {
        match command {
            TransportCommand::Play => {
                self.play(source);
            }
            TransportCommand::Pause => {
                self.pause(source);
            }
            TransportCommand::Stop => self.stop(),
            TransportCommand::Toggle => self.toggle(),
            TransportCommand::SelectVoice { index } => {
                if let Err(e) = self.select_voice(index) {
                    tracing::warn!(module_id = %self.module_id, error = %e, "Voice selection rejected");
                }
            }
        }
    }

    // ── Voices ─────────────────────────────────────────────────────

    fn ensure_voices(&mut self) {
        if self.catalog.begin_polling() {
            self.host.render_voice_menu(&self.catalog.menu());
            self.poll_voices(0);
        }
    }

    fn poll_voices(&mut self, attempt: u32) {
        let voices = self.pipeline.engine_voices();
        let population = self.catalog.offer(voices, attempt, &self.page_lang);
        self.apply_population(population);
    }

    fn on_voices_changed(&mut self) {
        if self.catalog.is_loaded() {
            return;
        }
        let voices = self.pipeline.engine_voices();
        if voices.is_empty() {
            return;
        }
        let population = self.catalog.offer(voices, 0, &self.page_lang);
        self.apply_population(population);
    }

    fn apply_population(&mut self, population: Population) {
        match population {
            Population::Loaded { count, .. } => {
                self.host.render_voice_menu(&self.catalog.menu());
                self.pipeline.emit(PlaybackEvent::VoicesLoaded { count });
            }
            Population::Retry { attempt, delay } => {
                self.timers.push(ScheduledTimer {
                    delay,
                    timer: PanelTimer::VoicePoll { attempt },
                });
            }
            Population::Unavailable => {
                self.host.render_voice_menu(&self.catalog.menu());
                self.pipeline.emit(PlaybackEvent::VoicesUnavailable);
            }
            Population::AlreadyLoaded => {}
        }
    }
}

impl std::fmt::Debug for ReadAloudPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadAloudPanel")
            .field("module_id", &self.module_id)
            .field("open", &self.open)
            .field("page_lang", &self.page_lang)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}
