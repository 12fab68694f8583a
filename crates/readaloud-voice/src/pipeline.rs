//! Playback orchestrator: owns the session and reacts to engine events.
//!
//! The pipeline is a state machine over [`PlaybackState`]:
//!
//! ```text
//!   Idle → Playing ⇄ Paused
//!    ▲        │        │
//!    └────────┴────────┘   stop / voice change / completion / failure
//! ```
//!
//! It never blocks and never sleeps. Deferred work (the settle delay before
//! a submission, highlight steps) goes into an outbox of
//! [`ScheduledTimer`]s that the driver turns into real timers and feeds back
//! through [`PlaybackPipeline::fire_timer`].
//!
//! # Invariants
//!
//! - At most one request is in flight (submitted, no end/error seen yet).
//! - Engine events for any request other than the in-flight one are
//!   ignored, as are timers issued under an older generation.
//! - `cursor` is the unit playback would resume from if paused now.

use std::collections::VecDeque;
use std::time::Duration;

use readaloud_core::{
    Anchor, BoundaryKind, EngineErrorKind, EngineEvent, HighlightSurface, MediaTransport,
    PlaybackState, ReadAloudSettings, RequestId, ResetReason, SpeechEngine, SpeechUnit, UnitId,
    UtteranceRequest, Voice, mirror_playback_state,
};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::highlight::{HighlightDriver, HighlightStep, HighlightTick};
use crate::segmenter::{Segmentation, Segmenter};
use crate::utterance::{self, UtteranceBuilder, UtteranceMode};

// ── Timers ─────────────────────────────────────────────────────────

/// Deferred pipeline work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// Settle delay after a fresh start or a rebuilt queue.
    Start { generation: u64 },

    /// Settle delay between one request ending and the next submission.
    Advance { generation: u64 },

    /// Next highlight step.
    Highlight(HighlightTick),
}

/// A timer to fire after `delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTimer<T = Timer> {
    pub delay: Duration,
    pub timer: T,
}

// ── Events emitted by the pipeline ─────────────────────────────────

/// Events emitted to the host / UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackEvent {
    /// Playback state changed.
    StateChanged { state: PlaybackState },

    /// The engine started speaking a unit.
    UnitStarted { index: UnitId },

    /// Aggregate mode: the engine reached a word.
    WordBoundary { index: usize },

    /// The engine reported a non-benign error; playback moved on.
    EngineError { kind: EngineErrorKind },

    /// The last request finished.
    Completed,

    /// The session went back to idle.
    Reset { reason: ResetReason },

    /// The voice list was populated.
    VoicesLoaded { count: usize },

    /// No voices appeared after every retry.
    VoicesUnavailable,
}

impl PlaybackEvent {
    /// JSON form for hosts that bridge events to a page script.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// What a play command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// A paused in-flight request was resumed in the engine.
    Resumed,
    /// A fresh session was built; the first request goes out after the
    /// settle delay.
    Starting,
    /// Paused with nothing the engine can resume: the queue was rebuilt
    /// past the last started unit.
    Rebuilt,
    /// Already playing.
    AlreadyPlaying,
    /// Nothing speakable in the content.
    NothingToSpeak,
}

// ── Pipeline ───────────────────────────────────────────────────────

/// One panel's playback session.
pub struct PlaybackPipeline {
    state: PlaybackState,

    settings: ReadAloudSettings,

    engine: Box<dyn SpeechEngine>,

    surface: Box<dyn HighlightSurface>,

    /// OS media transport; absent on hosts without one.
    media: Option<Box<dyn MediaTransport>>,

    /// Untouched container markup, restored on every reset.
    original: String,

    segmenter: Segmenter,

    segmentation: Option<Segmentation>,

    builder: UtteranceBuilder,

    mode: UtteranceMode,

    voice: Option<Voice>,

    lang: String,

    /// Pending requests; the front one is in flight once submitted.
    queue: VecDeque<UtteranceRequest>,

    in_flight: Option<RequestId>,

    cursor: UnitId,

    highest_started: Option<UnitId>,

    highlighter: HighlightDriver,

    marked_word: Option<usize>,

    /// Bumped on every reset and rebuild; settle timers compare against it.
    generation: u64,

    timers: Vec<ScheduledTimer>,

    event_tx: mpsc::UnboundedSender<PlaybackEvent>,
}

impl PlaybackPipeline {
    /// Create a pipeline over the container's original markup.
    pub fn new(
        original: impl Into<String>,
        engine: Box<dyn SpeechEngine>,
        surface: Box<dyn HighlightSurface>,
        media: Option<Box<dyn MediaTransport>>,
        settings: ReadAloudSettings,
    ) -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let pipeline = Self {
            state: PlaybackState::Idle,
            segmenter: Segmenter::new(settings.max_chunk_words),
            highlighter: HighlightDriver::new(
                settings.speech_rate_wpm,
                settings.min_unit_duration(),
            ),
            lang: settings.default_language.clone(),
            settings,
            engine,
            surface,
            media,
            original: original.into(),
            segmentation: None,
            builder: UtteranceBuilder::new(),
            mode: UtteranceMode::Aggregate,
            voice: None,
            queue: VecDeque::new(),
            in_flight: None,
            cursor: 0,
            highest_started: None,
            marked_word: None,
            generation: 0,
            timers: Vec::new(),
            event_tx,
        };

        (pipeline, event_rx)
    }

    // ── Accessors ──────────────────────────────────────────────────

    #[must_use]
    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    #[must_use]
    pub const fn cursor(&self) -> UnitId {
        self.cursor
    }

    #[must_use]
    pub const fn highest_started(&self) -> Option<UnitId> {
        self.highest_started
    }

    #[must_use]
    pub const fn in_flight(&self) -> Option<RequestId> {
        self.in_flight
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Requests still queued, front first.
    pub fn queued(&self) -> impl Iterator<Item = &UtteranceRequest> {
        self.queue.iter()
    }

    #[must_use]
    pub const fn mode(&self) -> UtteranceMode {
        self.mode
    }

    /// Units of the current session (empty when idle).
    #[must_use]
    pub fn units(&self) -> &[SpeechUnit] {
        self.segmentation.as_ref().map_or(&[], Segmentation::units)
    }

    #[must_use]
    pub fn original_markup(&self) -> &str {
        &self.original
    }

    /// Voices currently reported by the engine.
    #[must_use]
    pub fn engine_voices(&self) -> Vec<Voice> {
        self.engine.voices()
    }

    /// Drain the timers scheduled since the last call.
    pub fn take_scheduled(&mut self) -> Vec<ScheduledTimer> {
        std::mem::take(&mut self.timers)
    }

    // ── Transport commands ─────────────────────────────────────────

    /// Play or resume.
    ///
    /// `voice` and `page_lang` are only consulted when a fresh session is
    /// built; a paused session keeps the voice it was started with.
    pub fn play(&mut self, voice: Option<&Voice>, page_lang: &str) -> PlayOutcome {
        match self.state {
            PlaybackState::Playing => {
                tracing::debug!("Play ignored, already playing");
                PlayOutcome::AlreadyPlaying
            }
            PlaybackState::Paused if self.in_flight.is_some() && self.engine.is_paused() => {
                self.engine.resume();
                self.set_state(PlaybackState::Playing);
                if self.mode.is_per_unit() {
                    self.start_highlight(self.cursor);
                }
                tracing::info!(cursor = self.cursor, "Resumed playback");
                PlayOutcome::Resumed
            }
            PlaybackState::Paused => self.rebuild(),
            PlaybackState::Idle => self.start_fresh(voice, page_lang),
        }
    }

    /// Pause if playing. Returns whether anything changed.
    pub fn pause(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }

        if self.engine.is_speaking() || self.engine.is_pending() {
            self.engine.pause();
        }
        self.highlighter.cancel(self.surface.as_mut());

        if self.mode.is_per_unit() {
            if let Some(index) = self.in_flight_unit() {
                self.cursor = index;
            }
        }

        self.set_state(PlaybackState::Paused);
        tracing::info!(cursor = self.cursor, "Paused playback");
        true
    }

    /// Stop unconditionally and restore the original markup.
    pub fn stop(&mut self) {
        tracing::info!(state = self.state.label(), "Stopping playback");
        self.engine.cancel();
        self.reset(ResetReason::Stopped);
    }

    /// Switch voice; any running session is stopped.
    pub fn change_voice(&mut self, voice: Option<Voice>) {
        tracing::info!(voice = voice.as_ref().map(|v| v.name.as_str()), "Voice changed");
        self.engine.cancel();
        self.reset(ResetReason::VoiceChanged);
        self.mode = UtteranceMode::for_voice(voice.as_ref());
        self.voice = voice;
    }

    /// Best-effort cancellation on unload.
    pub fn teardown(&mut self) {
        tracing::debug!("Tearing down playback pipeline");
        self.engine.cancel();
        self.reset(ResetReason::Stopped);
        self.timers.clear();
    }

    // ── Inputs ─────────────────────────────────────────────────────

    /// React to a speech engine notification.
    pub fn handle_engine_event(&mut self, event: &EngineEvent) {
        let Some(request) = event.request() else {
            return;
        };
        if self.in_flight != Some(request) {
            tracing::trace!(%request, in_flight = ?self.in_flight, "Ignoring event for stale request");
            return;
        }

        match event {
            EngineEvent::Start { .. } => self.on_start(),
            EngineEvent::End { .. } => {
                if self.state == PlaybackState::Paused {
                    self.on_end_while_paused(request);
                    return;
                }
                self.complete_front(ResetReason::Completed);
            }
            EngineEvent::Error { kind, .. } => self.on_error(request, kind),
            EngineEvent::Pause { .. } => self.on_pause_ack(),
            EngineEvent::Resume { .. } => self.on_resume_ack(),
            EngineEvent::Boundary {
                kind, char_index, ..
            } => {
                if *kind == BoundaryKind::Word {
                    self.on_word_boundary(*char_index);
                }
            }
            EngineEvent::VoicesChanged => {}
        }
    }

    /// Fire a timer previously handed out by [`Self::take_scheduled`].
    pub fn fire_timer(&mut self, timer: Timer) {
        match timer {
            Timer::Start { generation } => {
                if generation != self.generation || self.state != PlaybackState::Playing {
                    tracing::trace!(generation, "Stale start timer");
                    return;
                }
                self.submit_front();
            }
            Timer::Advance { generation } => {
                if generation != self.generation
                    || self.state != PlaybackState::Playing
                    || self.engine.is_paused()
                {
                    tracing::trace!(generation, state = self.state.label(), "Skipping advance");
                    return;
                }
                self.submit_front();
            }
            Timer::Highlight(tick) => {
                let units = self.segmentation.as_ref().map_or(&[][..], Segmentation::units);
                let step = self.highlighter.on_tick(tick, units, self.surface.as_mut());
                self.schedule_highlight(step);
            }
        }
    }

    // ── Transitions ────────────────────────────────────────────────

    fn start_fresh(&mut self, voice: Option<&Voice>, page_lang: &str) -> PlayOutcome {
        self.engine.cancel();
        self.generation += 1;

        self.voice = voice.cloned();
        self.mode = UtteranceMode::for_voice(voice);
        page_lang.clone_into(&mut self.lang);

        let segmentation = self.segmenter.segment(&self.original);
        if segmentation.units().is_empty() {
            tracing::warn!("Nothing to speak in panel content");
            self.emit(PlaybackEvent::Reset {
                reason: ResetReason::NothingToSpeak,
            });
            return PlayOutcome::NothingToSpeak;
        }

        let markup = if self.mode.is_per_unit() {
            segmentation.render_units()
        } else {
            segmentation.render_words()
        };
        self.surface.apply_markup(&markup);

        self.queue = self.builder.build(
            self.mode,
            segmentation.units(),
            self.voice.as_ref(),
            &self.lang,
            self.cursor,
            self.highest_started,
        );
        self.segmentation = Some(segmentation);

        tracing::info!(
            mode = ?self.mode,
            units = self.units().len(),
            requests = self.queue.len(),
            voice = self.voice.as_ref().map(|v| v.name.as_str()),
            "Starting playback"
        );

        self.set_state(PlaybackState::Playing);
        self.schedule(
            self.settings.settle_delay(),
            Timer::Start {
                generation: self.generation,
            },
        );
        PlayOutcome::Starting
    }

    fn rebuild(&mut self) -> PlayOutcome {
        self.generation += 1;
        self.in_flight = None;
        self.engine.cancel();
        if self.engine.is_paused() {
            self.engine.resume();
        }

        let units = self.segmentation.as_ref().map_or(&[][..], Segmentation::units);
        let start = if self.mode.is_per_unit() {
            self.cursor
        } else {
            0
        };
        self.queue = self.builder.build(
            self.mode,
            units,
            self.voice.as_ref(),
            &self.lang,
            start,
            self.highest_started,
        );

        if self.queue.is_empty() {
            self.finish(ResetReason::Completed);
            return PlayOutcome::NothingToSpeak;
        }

        tracing::info!(
            from = ?self.queue.front().and_then(|r| r.unit_index),
            requests = self.queue.len(),
            "Rebuilt queue on resume"
        );

        self.set_state(PlaybackState::Playing);
        self.schedule(
            self.settings.settle_delay(),
            Timer::Start {
                generation: self.generation,
            },
        );
        PlayOutcome::Rebuilt
    }

    fn submit_front(&mut self) {
        if let Some(request) = self.in_flight {
            tracing::warn!(%request, "Submission skipped, a request is already in flight");
            return;
        }

        let Some(request) = self.queue.front() else {
            self.finish(ResetReason::Completed);
            return;
        };

        tracing::debug!(
            request = %request.id,
            unit = ?request.unit_index,
            remaining = self.queue.len(),
            "Submitting utterance"
        );
        self.in_flight = Some(request.id);
        self.engine.speak(request);
    }

    fn on_start(&mut self) {
        let index = self.in_flight_unit().unwrap_or(self.cursor);
        self.cursor = index;
        self.highest_started = Some(self.highest_started.map_or(index, |h| h.max(index)));
        self.emit(PlaybackEvent::UnitStarted { index });

        if self.mode.is_per_unit() && self.state == PlaybackState::Playing {
            self.start_highlight(index);
        }
    }

    fn on_error(&mut self, request: RequestId, kind: &EngineErrorKind) {
        if self.state == PlaybackState::Paused {
            tracing::debug!(%request, %kind, "Error while paused, unit will be retried");
            self.release_for_retry();
            return;
        }

        if kind.is_interruption() {
            tracing::debug!(%request, "Utterance interrupted, advancing");
            self.complete_front(ResetReason::Completed);
        } else {
            tracing::warn!(%request, %kind, "Speech engine error, advancing");
            self.emit(PlaybackEvent::EngineError { kind: kind.clone() });
            self.complete_front(ResetReason::EngineFailure);
        }
    }

    /// The paused request finished anyway: drop it and stay paused, with
    /// the cursor on the next unit.
    fn on_end_while_paused(&mut self, request: RequestId) {
        self.queue.pop_front();
        self.in_flight = None;

        if self.queue.is_empty() {
            tracing::debug!(%request, "Last request ended while paused");
            self.finish(ResetReason::Completed);
            return;
        }

        if let Some(next) = self.queue.front().and_then(|r| r.unit_index) {
            self.cursor = next;
        }
        tracing::debug!(%request, cursor = self.cursor, "Request ended while paused");
    }

    /// The paused request failed: forget it but keep its unit, so the
    /// next play rebuilds the queue starting with that unit again.
    fn release_for_retry(&mut self) {
        if let Some(index) = self.in_flight_unit() {
            self.cursor = index;
            if self.highest_started == Some(index) {
                self.highest_started = index.checked_sub(1);
            }
        }
        self.in_flight = None;
    }

    fn on_pause_ack(&mut self) {
        if self.mode.is_per_unit() {
            if let Some(index) = self.in_flight_unit() {
                self.cursor = index;
            }
            self.highlighter.cancel(self.surface.as_mut());
        }
        if self.state == PlaybackState::Playing {
            self.set_state(PlaybackState::Paused);
        } else {
            mirror_playback_state(self.media.as_deref_mut(), self.state);
        }
    }

    fn on_resume_ack(&mut self) {
        if self.state == PlaybackState::Paused {
            self.set_state(PlaybackState::Playing);
        } else {
            mirror_playback_state(self.media.as_deref_mut(), self.state);
        }
        if self.mode.is_per_unit() {
            if let Some(index) = self.in_flight_unit() {
                self.cursor = index;
            }
            if !self.highlighter.is_running() {
                self.start_highlight(self.cursor);
            }
        }
    }

    fn on_word_boundary(&mut self, char_index: usize) {
        if self.mode.is_per_unit() {
            return;
        }
        let Some(request) = self.queue.front() else {
            return;
        };

        let word = utterance::word_index_at(&request.text, char_index);
        if let Some(unit) = self
            .units()
            .iter()
            .find(|u| char_index >= u.char_start && char_index <= u.char_end)
            .map(|u| u.id)
        {
            self.cursor = unit;
        }

        if let Some(prev) = self.marked_word.replace(word) {
            self.surface.unmark(Anchor::Word(prev));
        }
        self.surface.mark(Anchor::Word(word));
        self.emit(PlaybackEvent::WordBoundary { index: word });
    }

    /// Pop the finished front request and move on.
    fn complete_front(&mut self, reason_if_last: ResetReason) {
        self.queue.pop_front();
        self.in_flight = None;

        if self.queue.is_empty() {
            self.finish(reason_if_last);
            return;
        }

        tracing::debug!(remaining = self.queue.len(), "Advancing queue");
        self.schedule(
            self.settings.settle_delay(),
            Timer::Advance {
                generation: self.generation,
            },
        );
    }

    fn finish(&mut self, reason: ResetReason) {
        if reason == ResetReason::Completed {
            tracing::info!("Playback completed");
            self.emit(PlaybackEvent::Completed);
        } else {
            tracing::error!(?reason, "Playback ended after engine failure");
        }
        self.reset(reason);
    }

    /// Full reset to idle.
    fn reset(&mut self, reason: ResetReason) {
        self.generation += 1;
        self.highlighter.cancel(self.surface.as_mut());
        self.surface.clear_marks();
        self.marked_word = None;

        self.queue.clear();
        self.in_flight = None;
        self.cursor = 0;
        self.highest_started = None;

        if self.segmentation.take().is_some() {
            self.surface.apply_markup(&self.original);
        }

        self.set_state(PlaybackState::Idle);
        self.emit(PlaybackEvent::Reset { reason });
    }

    // ── Helpers ────────────────────────────────────────────────────

    fn in_flight_unit(&self) -> Option<UnitId> {
        self.in_flight?;
        self.queue.front().and_then(|r| r.unit_index)
    }

    fn start_highlight(&mut self, from: UnitId) {
        let units = self.segmentation.as_ref().map_or(&[][..], Segmentation::units);
        let step = self.highlighter.start(units, from, self.surface.as_mut());
        self.schedule_highlight(step);
    }

    fn schedule_highlight(&mut self, step: Option<HighlightStep>) {
        if let Some(step) = step {
            self.schedule(step.delay, Timer::Highlight(step.tick));
        }
    }

    fn schedule(&mut self, delay: Duration, timer: Timer) {
        self.timers.push(ScheduledTimer { delay, timer });
    }

    fn set_state(&mut self, new_state: PlaybackState) {
        if self.state != new_state {
            tracing::debug!(old = ?self.state, new = ?new_state, "Playback state transition");
            self.state = new_state;
            mirror_playback_state(self.media.as_deref_mut(), new_state);
            self.emit(PlaybackEvent::StateChanged { state: new_state });
        }
    }

    /// Emit a playback event (best-effort; a dropped receiver is logged).
    pub(crate) fn emit(&self, event: PlaybackEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::warn!("Playback event receiver dropped");
        }
    }
}

impl std::fmt::Debug for PlaybackPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackPipeline")
            .field("state", &self.state)
            .field("mode", &self.mode)
            .field("cursor", &self.cursor)
            .field("highest_started", &self.highest_started)
            .field("in_flight", &self.in_flight)
            .field("queue_len", &self.queue.len())
            .finish_non_exhaustive()
    }
}
