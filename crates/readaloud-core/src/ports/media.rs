//! OS media transport port (lock screen / hardware media keys).
//!
//! The transport is optional: hosts without it pass [`NoopMediaTransport`]
//! or nothing at all, and playback behaves identically. Play/pause actions
//! coming *from* the OS are not part of this trait; the host posts them to
//! the panel as transport commands.

use serde::{Deserialize, Serialize};

use crate::domain::{MediaPlaybackState, PlaybackState};

/// One artwork entry published with the session metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaArtwork {
    pub src: String,
    pub sizes: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// Metadata shown by the OS while the panel is speaking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    #[serde(default)]
    pub artwork: Vec<MediaArtwork>,
}

impl Default for MediaMetadata {
    fn default() -> Self {
        let artwork = |size: &str| MediaArtwork {
            src: format!("https://dummyimage.com/{size}"),
            sizes: size.to_string(),
            mime_type: "image/png".to_string(),
        };
        Self {
            title: "Safety Module".to_string(),
            artist: "Training Course".to_string(),
            album: "Moodle Module".to_string(),
            artwork: vec![artwork("96x96"), artwork("128x128")],
        }
    }
}

/// Best-effort mirror of playback state to the OS.
#[cfg_attr(test, mockall::automock)]
pub trait MediaTransport {
    /// Publish session metadata (called once at mount).
    fn set_metadata(&mut self, metadata: &MediaMetadata);

    /// Mirror the playback indicator.
    fn set_playback_state(&mut self, state: MediaPlaybackState);
}

/// Transport for hosts without an OS media session.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMediaTransport;

impl MediaTransport for NoopMediaTransport {
    fn set_metadata(&mut self, _metadata: &MediaMetadata) {}

    fn set_playback_state(&mut self, _state: MediaPlaybackState) {}
}

/// Mirror `state` to `media` when a transport is present.
pub fn mirror_playback_state(media: Option<&mut (dyn MediaTransport + '_)>, state: PlaybackState) {
    if let Some(media) = media {
        media.set_playback_state(state.into());
    }
}
