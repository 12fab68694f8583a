//! Integration tests for the `PlaybackPipeline` state machine.
//!
//! These tests drive the pipeline through its transitions with a scripted
//! speech engine that never fires events on its own: every start, end and
//! error is delivered by hand, and every deferred timer is fired by hand,
//! so each interleaving is explicit.
//!
//! # What is tested
//!
//! - Segmentation idempotence, chunk bound and deduplication as seen by a
//!   running session
//! - At most one request in flight, whatever order timers fire in
//! - Forward-only cursor when a paused queue is rebuilt
//! - Resume of a paused in-flight unit keeps that unit at the queue front
//! - Reset completeness after stop, voice change and completion
//! - Engine error handling (benign interruption, hard failure, while paused)
//! - End or error for a paused request followed by play

use std::time::Duration;

use readaloud_core::{
    Anchor, EngineErrorKind, EngineEvent, PlaybackState, ReadAloudSettings, ResetReason, Voice,
};
use readaloud_voice::{
    PlayOutcome, PlaybackEvent, PlaybackPipeline, Timer, UtteranceMode,
    testing::{EngineCall, RecordingSurface, ScriptedEngine},
};
use tokio::sync::mpsc::UnboundedReceiver;

const LONG: &str = "Always wear a helmet when on site, and check your harness before climbing \
                    any scaffold structure, every single day without exception.";

// ── Helpers ────────────────────────────────────────────────────────

struct Harness {
    pipeline: PlaybackPipeline,
    engine: ScriptedEngine,
    surface: RecordingSurface,
    events: UnboundedReceiver<PlaybackEvent>,
    original: String,
}

fn harness(markup: &str) -> Harness {
    let engine = ScriptedEngine::new();
    let surface = RecordingSurface::with_markup(markup);
    let (pipeline, events) = PlaybackPipeline::new(
        markup,
        Box::new(engine.clone()),
        Box::new(surface.clone()),
        None,
        ReadAloudSettings::default(),
    );
    Harness {
        pipeline,
        engine,
        surface,
        events,
        original: markup.to_string(),
    }
}

fn safety_panel() -> Harness {
    harness(&format!("<p>Safety first.</p>\n<p>{LONG}</p>"))
}

fn per_unit_voice() -> Voice {
    Voice::new("Google US English", "en-US")
}

impl Harness {
    /// Fire every pending settle timer, leaving highlight steps alone.
    fn settle(&mut self) {
        for scheduled in self.pipeline.take_scheduled() {
            if !matches!(scheduled.timer, Timer::Highlight(_)) {
                self.pipeline.fire_timer(scheduled.timer);
            }
        }
    }

    fn start_current(&mut self) {
        let request = self.pipeline.in_flight().expect("a request in flight");
        self.pipeline
            .handle_engine_event(&EngineEvent::Start { request });
    }

    fn end_current(&mut self) {
        let request = self.pipeline.in_flight().expect("a request in flight");
        self.pipeline.handle_engine_event(&EngineEvent::End { request });
    }

    fn spoken_units(&self) -> Vec<Option<usize>> {
        self.engine.spoken().iter().map(|r| r.unit_index).collect()
    }

    /// Drain all pending events from the event receiver and return them.
    fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        while let Ok(e) = self.events.try_recv() {
            events.push(e);
        }
        events
    }
}

/// Collect only the state values from `StateChanged` events.
fn states_from(events: &[PlaybackEvent]) -> Vec<PlaybackState> {
    events
        .iter()
        .filter_map(|e| {
            if let PlaybackEvent::StateChanged { state } = e {
                Some(*state)
            } else {
                None
            }
        })
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────────

#[test]
fn initial_state_is_idle() {
    let h = safety_panel();
    assert_eq!(h.pipeline.state(), PlaybackState::Idle);
    assert_eq!(h.pipeline.cursor(), 0);
    assert_eq!(h.pipeline.queue_len(), 0);
    assert!(h.pipeline.units().is_empty());
}

#[test]
fn safety_panel_chunks_and_durations() {
    let mut h = safety_panel();
    assert_eq!(h.pipeline.play(Some(&per_unit_voice()), "en"), PlayOutcome::Starting);
    assert_eq!(h.pipeline.mode(), UtteranceMode::PerUnit);

    let word_counts: Vec<_> = h.pipeline.units().iter().map(|u| u.word_count).collect();
    assert_eq!(word_counts, [2, 20, 1]);
    assert!(h.pipeline.units()[1..].iter().all(|u| u.is_chunk));

    h.settle();
    let mut delays = Vec::new();
    for _ in 0..3 {
        h.start_current();
        for scheduled in h.pipeline.take_scheduled() {
            if let Timer::Highlight(_) = scheduled.timer {
                delays.push(scheduled.delay);
            }
        }
        h.end_current();
        h.settle();
    }

    assert_eq!(
        delays,
        [
            Duration::from_secs(1),
            Duration::from_secs_f64(20.0 * 60.0 / 130.0),
            Duration::from_secs(1),
        ]
    );
    assert_eq!(h.pipeline.state(), PlaybackState::Idle);
}

#[test]
fn segmentation_is_idempotent_across_sessions() {
    let mut h = safety_panel();
    h.pipeline.play(Some(&per_unit_voice()), "en");
    let first = h.pipeline.units().to_vec();
    h.pipeline.stop();

    h.pipeline.play(Some(&per_unit_voice()), "en");
    assert_eq!(h.pipeline.units(), first.as_slice());
}

#[test]
fn duplicate_blocks_produce_one_unit() {
    let mut h = harness("<h2>Check the rope.</h2><p>Check   the rope.</p><li>Clip in.</li>");
    h.pipeline.play(Some(&per_unit_voice()), "en");
    let texts: Vec<_> = h.pipeline.units().iter().map(|u| u.text.clone()).collect();
    assert_eq!(texts, ["Check the rope.", "Clip in."]);
}

#[test]
fn at_most_one_request_in_flight() {
    let mut h = safety_panel();
    h.pipeline.play(Some(&per_unit_voice()), "en");

    // duplicate settle timers must not double-submit
    let timers = h.pipeline.take_scheduled();
    for t in timers.iter().chain(timers.iter()) {
        h.pipeline.fire_timer(t.timer);
    }
    assert_eq!(h.engine.spoken().len(), 1);

    h.start_current();
    h.end_current();
    let timers = h.pipeline.take_scheduled();
    for t in timers.iter().chain(timers.iter()) {
        if !matches!(t.timer, Timer::Highlight(_)) {
            h.pipeline.fire_timer(t.timer);
        }
    }
    assert_eq!(h.spoken_units(), [Some(0), Some(1)]);
}

#[test]
fn resume_keeps_paused_unit_at_queue_front() {
    let mut h = safety_panel();
    h.pipeline.play(Some(&per_unit_voice()), "en");
    h.settle();
    h.start_current();
    let paused_request = h.pipeline.in_flight();

    assert!(h.pipeline.pause());
    assert_eq!(h.pipeline.state(), PlaybackState::Paused);
    assert_eq!(h.pipeline.cursor(), 0);

    assert_eq!(h.pipeline.play(None, "en"), PlayOutcome::Resumed);
    assert_eq!(h.pipeline.state(), PlaybackState::Playing);
    assert_eq!(h.pipeline.in_flight(), paused_request);
    assert_eq!(h.pipeline.queued().next().and_then(|r| r.unit_index), Some(0));
    assert_eq!(h.engine.calls().last(), Some(&EngineCall::Resume));

    // the paused unit is not re-submitted
    assert_eq!(h.spoken_units(), [Some(0)]);
    h.end_current();
    h.settle();
    assert_eq!(h.spoken_units(), [Some(0), Some(1)]);
}

#[test]
fn rebuilt_queue_starts_past_highest_started_unit() {
    let mut h = safety_panel();
    h.pipeline.play(Some(&per_unit_voice()), "en");
    h.settle();
    h.start_current();
    h.end_current();
    h.settle();
    h.start_current();
    let highest_before_pause = h.pipeline.highest_started().unwrap();
    assert_eq!(highest_before_pause, 1);

    // unit 1 ends while the user hits pause inside the settle window
    h.end_current();
    let pending = h.pipeline.take_scheduled();
    assert!(h.pipeline.pause());
    for t in pending {
        h.pipeline.fire_timer(t.timer);
    }
    assert_eq!(h.pipeline.in_flight(), None);

    assert_eq!(h.pipeline.play(None, "en"), PlayOutcome::Rebuilt);
    h.settle();

    let first_after_resume = h.spoken_units().last().copied().flatten().unwrap();
    assert!(first_after_resume > highest_before_pause);
    assert_eq!(first_after_resume, 2);
}

#[test]
fn unit_ending_while_paused_moves_on_when_played() {
    let mut h = safety_panel();
    h.pipeline.play(Some(&per_unit_voice()), "en");
    h.settle();
    h.start_current();
    assert!(h.pipeline.pause());

    // the engine finishes the unit despite the pause
    h.end_current();
    assert_eq!(h.pipeline.state(), PlaybackState::Paused);
    assert_eq!(h.pipeline.in_flight(), None);

    assert_eq!(h.pipeline.play(None, "en"), PlayOutcome::Rebuilt);
    h.settle();
    assert_eq!(h.pipeline.state(), PlaybackState::Playing);
    assert!(h.pipeline.in_flight().is_some());
    assert_eq!(h.spoken_units(), [Some(0), Some(1)]);

    // and the session still runs to the end
    for _ in 0..2 {
        h.start_current();
        h.end_current();
        h.settle();
    }
    assert_eq!(h.pipeline.state(), PlaybackState::Idle);
    assert_eq!(h.surface.markup(), h.original);
}

#[test]
fn unit_failing_while_paused_is_retried_when_played() {
    let mut h = safety_panel();
    h.pipeline.play(Some(&per_unit_voice()), "en");
    h.settle();
    h.start_current();
    h.end_current();
    h.settle();
    h.start_current();
    assert!(h.pipeline.pause());

    let request = h.pipeline.in_flight().unwrap();
    h.pipeline.handle_engine_event(&EngineEvent::Error {
        request,
        kind: EngineErrorKind::Other("synthesis-failed".into()),
    });
    assert_eq!(h.pipeline.state(), PlaybackState::Paused);
    assert_eq!(h.pipeline.in_flight(), None);
    assert_eq!(h.pipeline.cursor(), 1);

    assert_eq!(h.pipeline.play(None, "en"), PlayOutcome::Rebuilt);
    h.settle();
    assert_eq!(h.pipeline.state(), PlaybackState::Playing);
    assert_eq!(h.spoken_units(), [Some(0), Some(1), Some(1)]);
    assert!(!h.drain_events().iter().any(|e| matches!(e, PlaybackEvent::EngineError { .. })));
}

#[test]
fn last_unit_ending_while_paused_completes() {
    let mut h = harness("<p>Safety first.</p>");
    h.pipeline.play(Some(&per_unit_voice()), "en");
    h.settle();
    h.start_current();
    assert!(h.pipeline.pause());
    h.end_current();

    assert_eq!(h.pipeline.state(), PlaybackState::Idle);
    assert_eq!(h.pipeline.queue_len(), 0);
    assert_eq!(h.surface.markup(), h.original);
    let events = h.drain_events();
    assert!(events.contains(&PlaybackEvent::Completed));
    assert!(events.contains(&PlaybackEvent::Reset {
        reason: ResetReason::Completed
    }));
}

#[test]
fn stop_resets_everything() {
    let mut h = safety_panel();
    h.pipeline.play(Some(&per_unit_voice()), "en");
    h.settle();
    h.start_current();
    assert_eq!(h.surface.marked(), [Anchor::Unit(0)]);
    assert_ne!(h.surface.markup(), h.original);

    h.pipeline.stop();

    assert_eq!(h.pipeline.state(), PlaybackState::Idle);
    assert!(h.surface.marked().is_empty());
    assert_eq!(h.pipeline.queue_len(), 0);
    assert_eq!(h.pipeline.cursor(), 0);
    assert_eq!(h.pipeline.highest_started(), None);
    assert_eq!(h.surface.markup(), h.original);
    assert!(h.drain_events().contains(&PlaybackEvent::Reset {
        reason: ResetReason::Stopped
    }));
}

#[test]
fn stale_highlight_step_after_pause_marks_nothing() {
    let mut h = safety_panel();
    h.pipeline.play(Some(&per_unit_voice()), "en");
    h.settle();
    h.start_current();
    let steps = h.pipeline.take_scheduled();

    h.pipeline.pause();
    for t in steps {
        h.pipeline.fire_timer(t.timer);
    }
    assert!(h.surface.marked().is_empty());
}

#[test]
fn voice_change_resets_and_ignores_late_events() {
    let mut h = safety_panel();
    h.pipeline.play(Some(&per_unit_voice()), "en");
    h.settle();
    let request = h.pipeline.in_flight().unwrap();

    h.pipeline
        .change_voice(Some(Voice::new("Microsoft Aria Online", "en-US")));
    h.pipeline.handle_engine_event(&EngineEvent::Start { request });
    h.pipeline.handle_engine_event(&EngineEvent::End { request });

    assert_eq!(h.pipeline.state(), PlaybackState::Idle);
    assert_eq!(h.pipeline.highest_started(), None);
    assert_eq!(h.surface.markup(), h.original);
    assert!(h.pipeline.take_scheduled().is_empty());
}

#[test]
fn interruption_advances_silently() {
    let mut h = safety_panel();
    h.pipeline.play(Some(&per_unit_voice()), "en");
    h.settle();
    let request = h.pipeline.in_flight().unwrap();
    h.pipeline.handle_engine_event(&EngineEvent::Error {
        request,
        kind: EngineErrorKind::Interrupted,
    });
    h.settle();

    assert_eq!(h.spoken_units(), [Some(0), Some(1)]);
    assert!(
        !h.drain_events()
            .iter()
            .any(|e| matches!(e, PlaybackEvent::EngineError { .. }))
    );
}

#[test]
fn hard_error_on_last_unit_resets_cleanly() {
    let mut h = harness("<p>Only line.</p>");
    h.pipeline.play(Some(&per_unit_voice()), "en");
    h.settle();
    let request = h.pipeline.in_flight().unwrap();
    h.pipeline.handle_engine_event(&EngineEvent::Error {
        request,
        kind: EngineErrorKind::Other("synthesis-failed".into()),
    });

    assert_eq!(h.pipeline.state(), PlaybackState::Idle);
    let events = h.drain_events();
    assert!(events.contains(&PlaybackEvent::EngineError {
        kind: EngineErrorKind::Other("synthesis-failed".into())
    }));
    assert!(events.contains(&PlaybackEvent::Reset {
        reason: ResetReason::EngineFailure
    }));
    assert_eq!(h.surface.markup(), h.original);
}

#[test]
fn state_events_follow_transitions() {
    let mut h = safety_panel();
    h.pipeline.play(Some(&per_unit_voice()), "en");
    h.settle();
    h.start_current();
    h.pipeline.pause();
    h.pipeline.play(None, "en");
    h.pipeline.stop();

    let states = states_from(&h.drain_events());
    assert_eq!(
        states,
        [
            PlaybackState::Playing,
            PlaybackState::Paused,
            PlaybackState::Playing,
            PlaybackState::Idle,
        ]
    );
}

#[test]
fn aggregate_session_completes_and_restores_markup() {
    let mut h = safety_panel();
    h.pipeline
        .play(Some(&Voice::new("Microsoft Aria Online", "en-US")), "en");
    h.settle();
    assert_eq!(h.pipeline.mode(), UtteranceMode::Aggregate);
    assert_eq!(h.spoken_units(), [None]);
    assert!(h.surface.markup().contains("data-tts-word=\"22\""));

    h.start_current();
    h.end_current();

    assert_eq!(h.pipeline.state(), PlaybackState::Idle);
    assert_eq!(h.surface.markup(), h.original);
    assert!(h.drain_events().contains(&PlaybackEvent::Completed));
}
