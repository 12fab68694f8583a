//! Event loop for one panel.
//!
//! [`PanelDriver`] owns a [`ReadAloudPanel`] and applies inputs one at a
//! time, so no two handlers ever interleave. After each input it drains the
//! panel's scheduled timers and turns each into a `tokio::time::sleep` task
//! that posts the timer back as an input. Timer tasks hold only a weak
//! sender: once every [`PanelHandle`] is dropped the loop ends even if
//! timers are still pending.
//!
//! The driver future is not `Send` (speech engines and surfaces are
//! usually bound to the page thread); run it on a current-thread runtime or
//! a `LocalSet`.

use std::sync::Arc;

use readaloud_core::EngineEvent;
use tokio::sync::mpsc;

use crate::error::ReadAloudError;
use crate::pipeline::PlaybackEvent;
use crate::transport::{CommandSource, PanelInput, ReadAloudPanel, TransportCommand};

/// Owns a panel and its input channel.
#[derive(Debug)]
pub struct PanelDriver {
    panel: ReadAloudPanel,
    input_rx: mpsc::UnboundedReceiver<PanelInput>,
    timer_tx: mpsc::WeakUnboundedSender<PanelInput>,
}

impl PanelDriver {
    /// Wrap `panel`, returning the driver and the first input handle.
    pub fn new(panel: ReadAloudPanel) -> (Self, PanelHandle) {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let driver = Self {
            panel,
            input_rx,
            timer_tx: input_tx.downgrade(),
        };
        (driver, PanelHandle { input_tx })
    }

    /// Run until the panel is unloaded or every handle is dropped.
    ///
    /// Returns the panel so callers can inspect its final state.
    pub async fn run(mut self) -> ReadAloudPanel {
        self.schedule_pending();

        while let Some(input) = self.input_rx.recv().await {
            let keep_running = self.panel.dispatch(input);
            if !keep_running {
                break;
            }
            self.schedule_pending();
        }

        tracing::debug!(module_id = %self.panel.module_id(), "Panel driver stopped");
        self.panel
    }

    fn schedule_pending(&mut self) {
        for scheduled in self.panel.take_scheduled() {
            let tx = self.timer_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(scheduled.delay).await;
                if let Some(tx) = tx.upgrade() {
                    // Receiver gone means the driver already stopped.
                    let _ = tx.send(PanelInput::Timer(scheduled.timer));
                }
            });
        }
    }
}

/// Cloneable input side of a [`PanelDriver`].
///
/// Page controls, media-session handlers and speech engine adapters all
/// post through a handle. Sends fail only after the driver has stopped.
#[derive(Debug, Clone)]
pub struct PanelHandle {
    input_tx: mpsc::UnboundedSender<PanelInput>,
}

impl PanelHandle {
    /// Post a raw input. Returns `false` if the driver has stopped.
    pub fn send(&self, input: PanelInput) -> bool {
        self.input_tx.send(input).is_ok()
    }

    pub fn command(&self, command: TransportCommand, source: CommandSource) -> bool {
        self.send(PanelInput::Command { command, source })
    }

    pub fn play(&self) -> bool {
        self.command(TransportCommand::Play, CommandSource::Page)
    }

    pub fn pause(&self) -> bool {
        self.command(TransportCommand::Pause, CommandSource::Page)
    }

    pub fn stop(&self) -> bool {
        self.command(TransportCommand::Stop, CommandSource::Page)
    }

    pub fn toggle(&self) -> bool {
        self.command(TransportCommand::Toggle, CommandSource::Page)
    }

    pub fn select_voice(&self, index: usize) -> bool {
        self.command(TransportCommand::SelectVoice { index }, CommandSource::Page)
    }

    /// OS media-session play action.
    pub fn media_play(&self) -> bool {
        self.command(TransportCommand::Play, CommandSource::MediaSession)
    }

    /// OS media-session pause action.
    pub fn media_pause(&self) -> bool {
        self.command(TransportCommand::Pause, CommandSource::MediaSession)
    }

    /// Forward a speech engine notification.
    pub fn engine_event(&self, event: EngineEvent) -> bool {
        self.send(PanelInput::Engine(event))
    }

    /// Page is going away: cancel speech and stop the driver.
    pub fn unload(&self) -> bool {
        self.send(PanelInput::Unload)
    }

    /// Post a JSON command from a page script.
    pub fn post_command_json(&self, json: &str) -> Result<bool, ReadAloudError> {
        let command = TransportCommand::from_json(json)?;
        Ok(self.command(command, CommandSource::Page))
    }

    /// Whether the driver has stopped.
    pub fn is_closed(&self) -> bool {
        self.input_tx.is_closed()
    }
}

// ── Event bridge ───────────────────────────────────────────────────

/// Receives playback events outside the panel's thread.
pub trait PlaybackEventSink: Send + Sync {
    fn emit(&self, event: PlaybackEvent);
}

/// Forward every event from `event_rx` to `sink`.
///
/// The spawned task ends when the pipeline's sender is dropped (the panel
/// was dropped): `recv()` returns `None` and the loop exits.
pub fn spawn_event_bridge(
    mut event_rx: mpsc::UnboundedReceiver<PlaybackEvent>,
    sink: Arc<dyn PlaybackEventSink>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            sink.emit(event);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSurface, ScriptedEngine, StaticHost};
    use readaloud_core::ReadAloudSettings;
    use tokio_test::{assert_pending, assert_ready, task};

    fn mount() -> (ReadAloudPanel, mpsc::UnboundedReceiver<PlaybackEvent>) {
        ReadAloudPanel::mount(
            "mod1",
            Box::new(StaticHost::new("<p>Hello.</p>")),
            Some(Box::new(ScriptedEngine::new())),
            Box::new(RecordingSurface::default()),
            None,
            ReadAloudSettings::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn run_waits_for_input_and_stops_on_unload() {
        let (panel, _events) = mount();
        let (driver, handle) = PanelDriver::new(panel);

        let mut run = task::spawn(driver.run());
        assert_pending!(run.poll());

        assert!(handle.unload());
        assert!(run.is_woken());
        let panel = assert_ready!(run.poll());
        assert_eq!(panel.module_id(), "mod1");
        assert!(handle.is_closed());
        assert!(!handle.play());
    }

    #[tokio::test]
    async fn dropping_every_handle_ends_run() {
        let (panel, _events) = mount();
        let (driver, handle) = PanelDriver::new(panel);

        let mut run = task::spawn(driver.run());
        assert_pending!(run.poll());
        drop(handle);
        assert_ready!(run.poll());
    }

    #[tokio::test]
    async fn malformed_json_command_is_rejected() {
        let (panel, _events) = mount();
        let (_driver, handle) = PanelDriver::new(panel);
        assert!(matches!(
            handle.post_command_json("{\"command\":\"rewind\"}"),
            Err(ReadAloudError::Config(_))
        ));
        assert!(handle.post_command_json("{\"command\":\"toggle\"}").unwrap());
    }
}
