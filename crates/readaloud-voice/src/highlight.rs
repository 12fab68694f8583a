//! Highlight driver: walks units on a chain of deferred steps.
//!
//! Each step marks one unit and asks for the next step after that unit's
//! estimated speaking time. The driver never sleeps itself: it hands back a
//! [`HighlightStep`] and the caller schedules it. Every step carries the
//! generation it was issued under, so a step that fires after
//! [`HighlightDriver::cancel`] is ignored.

use std::time::Duration;

use readaloud_core::{Anchor, HighlightSurface, SpeechUnit, UnitId};
use serde::{Deserialize, Serialize};

/// Estimated time to speak `word_count` words at `rate_wpm`, never less
/// than `min`.
#[must_use]
pub fn unit_duration(word_count: usize, rate_wpm: u32, min: Duration) -> Duration {
    let rate = f64::from(rate_wpm.max(1));
    #[allow(clippy::cast_precision_loss)]
    let secs = word_count as f64 * 60.0 / rate;
    Duration::from_secs_f64(secs).max(min)
}

/// Pending highlight step: mark `index` when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightTick {
    pub generation: u64,
    pub index: UnitId,
}

/// A step to schedule after `delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightStep {
    pub delay: Duration,
    pub tick: HighlightTick,
}

/// Timed unit highlighter.
#[derive(Debug)]
pub struct HighlightDriver {
    rate_wpm: u32,
    min_duration: Duration,
    generation: u64,
    current: Option<UnitId>,
    running: bool,
}

impl HighlightDriver {
    #[must_use]
    pub const fn new(rate_wpm: u32, min_duration: Duration) -> Self {
        Self {
            rate_wpm,
            min_duration,
            generation: 0,
            current: None,
            running: false,
        }
    }

    /// Whether a step chain is active.
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Unit currently marked, if any.
    pub const fn current(&self) -> Option<UnitId> {
        self.current
    }

    /// Duration assigned to `unit`.
    pub fn duration_of(&self, unit: &SpeechUnit) -> Duration {
        unit_duration(unit.word_count, self.rate_wpm, self.min_duration)
    }

    /// Start (or restart) highlighting at `from`.
    ///
    /// Any running chain is cancelled first. Nothing is marked when `units`
    /// is empty or `from` is out of range.
    pub fn start(
        &mut self,
        units: &[SpeechUnit],
        from: UnitId,
        surface: &mut dyn HighlightSurface,
    ) -> Option<HighlightStep> {
        self.cancel(surface);

        if from >= units.len() {
            tracing::warn!(from, units = units.len(), "Highlight start index out of range");
            return None;
        }

        self.running = true;
        self.mark(units, from, surface)
    }

    /// Fire a previously scheduled step.
    ///
    /// Stale steps (issued before the last cancel/start) do nothing. Past the
    /// last unit all marks are cleared and the chain ends.
    pub fn on_tick(
        &mut self,
        tick: HighlightTick,
        units: &[SpeechUnit],
        surface: &mut dyn HighlightSurface,
    ) -> Option<HighlightStep> {
        if tick.generation != self.generation || !self.running {
            tracing::trace!(tick = ?tick, generation = self.generation, "Ignoring stale highlight step");
            return None;
        }

        if let Some(prev) = self.current.take() {
            surface.unmark(Anchor::Unit(prev));
        }

        if tick.index >= units.len() {
            surface.clear_marks();
            self.running = false;
            tracing::debug!("Highlight chain finished");
            return None;
        }

        self.mark(units, tick.index, surface)
    }

    /// Cancel the chain and clear the unit mark.
    pub fn cancel(&mut self, surface: &mut dyn HighlightSurface) {
        self.generation = self.generation.wrapping_add(1);
        self.running = false;
        if let Some(prev) = self.current.take() {
            surface.unmark(Anchor::Unit(prev));
        }
    }

    fn mark(
        &mut self,
        units: &[SpeechUnit],
        index: UnitId,
        surface: &mut dyn HighlightSurface,
    ) -> Option<HighlightStep> {
        let unit = &units[index];
        surface.mark(Anchor::Unit(index));
        self.current = Some(index);

        let delay = self.duration_of(unit);
        tracing::debug!(unit = index, delay_ms = delay.as_millis(), "Highlighting unit");

        Some(HighlightStep {
            delay,
            tick: HighlightTick {
                generation: self.generation,
                index: index + 1,
            },
        })
    }
}
