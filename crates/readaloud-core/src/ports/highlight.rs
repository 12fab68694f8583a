//! Highlight surface port: where speech progress becomes visible.
//!
//! The pipeline never touches a DOM. It hands the surface whole markup
//! strings (segmented or original) and toggles marks on abstract anchors
//! that the segmented markup declares.

use serde::{Deserialize, Serialize};

use crate::domain::UnitId;

/// A highlightable element in the segmented markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Anchor {
    /// A whole unit (block element or chunk wrapper).
    Unit(UnitId),
    /// A single word in aggregate mode, indexed in joined-text order.
    Word(usize),
}

/// Rendering target for the panel's speakable content.
pub trait HighlightSurface {
    /// Replace the container's markup.
    fn apply_markup(&mut self, markup: &str);

    /// Apply the highlight mark to an anchor.
    fn mark(&mut self, anchor: Anchor);

    /// Remove the highlight mark from an anchor.
    fn unmark(&mut self, anchor: Anchor);

    /// Remove every highlight mark.
    fn clear_marks(&mut self);
}
