//! Text segmentation: panel markup → ordered [`SpeechUnit`]s.
//!
//! Blocks are visited in document order. A block is skipped when it holds an
//! image, has no text, looks like a figure caption (`Figura 3`, `Fig 12`),
//! or repeats the exact normalised text of an earlier block. Blocks longer
//! than the chunk limit are cut into chunks that end at the limit or at a
//! word carrying a trailing period, whichever comes first.
//!
//! Segmentation never reads its own output: callers always pass the
//! container's original markup, so running it twice gives the same units.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

use readaloud_core::SpeechUnit;
use regex::Regex;

use crate::markup::{self, Block, UNIT_ATTR, WORD_ATTR};

static FIGURE_CAPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Figura|Fig)\s*\d+").unwrap_or_else(|_| unreachable!("static pattern"))
});

/// Splits panel markup into speech units.
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    max_chunk_words: usize,
}

impl Segmenter {
    #[must_use]
    pub fn new(max_chunk_words: usize) -> Self {
        Self {
            max_chunk_words: max_chunk_words.max(1),
        }
    }

    /// Segment the container's original markup.
    #[must_use]
    pub fn segment(&self, original: &str) -> Segmentation {
        let mut units: Vec<SpeechUnit> = Vec::new();
        let mut placements = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut char_offset = 0usize;

        for block in markup::scan_blocks(original) {
            if block.contains_image(original) {
                continue;
            }

            let text = block.text_content(original);
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            if FIGURE_CAPTION.is_match(trimmed) {
                tracing::debug!(text = trimmed, "Skipping figure caption");
                continue;
            }

            let normalized = markup::normalize_whitespace(trimmed);
            if !seen.insert(normalized.clone()) {
                tracing::debug!(text = %normalized, "Skipping duplicate text");
                continue;
            }

            let words: Vec<&str> = normalized.split(' ').collect();
            let first = units.len();
            let is_chunk = words.len() > self.max_chunk_words;

            let pieces = if is_chunk {
                chunk_words(&words, self.max_chunk_words)
            } else {
                vec![normalized.clone()]
            };

            for piece in pieces {
                let len = piece.chars().count();
                units.push(SpeechUnit {
                    id: units.len(),
                    word_count: piece.split(' ').count(),
                    text: piece,
                    char_start: char_offset,
                    char_end: char_offset + len,
                    is_chunk,
                });
                char_offset += len + 1;
            }

            placements.push(Placement {
                block,
                units: first..units.len(),
                chunked: is_chunk,
            });
        }

        tracing::debug!(units = units.len(), "Segmented panel content");

        Segmentation {
            original: original.to_string(),
            units,
            placements,
        }
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(20)
    }
}

/// Cut `words` into chunks of at most `max` words, closing a chunk early
/// when a word ends a sentence.
fn chunk_words(words: &[&str], max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for (i, word) in words.iter().enumerate() {
        current.push(word);
        let last = i + 1 == words.len();
        if current.len() >= max || last || word.ends_with('.') {
            chunks.push(current.join(" "));
            current.clear();
        }
    }

    chunks
}

/// Where a block's units landed.
#[derive(Debug, Clone)]
struct Placement {
    block: Block,
    units: Range<usize>,
    chunked: bool,
}

/// Result of segmenting one container.
#[derive(Debug, Clone)]
pub struct Segmentation {
    original: String,
    units: Vec<SpeechUnit>,
    placements: Vec<Placement>,
}

impl Segmentation {
    /// Units in spoken order.
    #[must_use]
    pub fn units(&self) -> &[SpeechUnit] {
        &self.units
    }

    /// The untouched markup this segmentation was built from.
    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Total words across all units (= number of word anchors).
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.units.iter().map(|u| u.word_count).sum()
    }

    /// Markup with one anchor per unit.
    ///
    /// Whole-block units get a `data-tts-unit` attribute on the block
    /// itself. Chunked blocks have their content replaced by one wrapper
    /// span per chunk, separated by single-space text, with the block's
    /// leading and trailing whitespace kept.
    #[must_use]
    pub fn render_units(&self) -> String {
        self.render(|out, placement, original| {
            let block = &placement.block;
            if placement.chunked {
                out.push_str(block.open_tag(original));
                let inner = block.inner_markup(original);
                out.push_str(leading_whitespace(inner));
                let spans: Vec<String> = self.units[placement.units.clone()]
                    .iter()
                    .map(|unit| {
                        format!(
                            "<span class=\"chunk\" {UNIT_ATTR}=\"{}\">{}</span>",
                            unit.id,
                            markup::escape_text(&unit.text)
                        )
                    })
                    .collect();
                out.push_str(&spans.join(" "));
                out.push_str(trailing_whitespace(inner));
            } else {
                let id = placement.units.start.to_string();
                out.push_str(&markup::with_attribute(
                    block.open_tag(original),
                    UNIT_ATTR,
                    &id,
                ));
                out.push_str(block.inner_markup(original));
            }
            out.push_str(block.close_tag(original));
        })
    }

    /// Markup with one anchor per word, numbered in joined-text order.
    #[must_use]
    pub fn render_words(&self) -> String {
        let mut word_index = 0usize;
        self.render(|out, placement, original| {
            let block = &placement.block;
            out.push_str(block.open_tag(original));
            let inner = block.inner_markup(original);
            out.push_str(leading_whitespace(inner));
            let mut spans = Vec::new();
            for unit in &self.units[placement.units.clone()] {
                for word in unit.text.split(' ') {
                    spans.push(format!(
                        "<span {WORD_ATTR}=\"{word_index}\">{}</span>",
                        markup::escape_text(word)
                    ));
                    word_index += 1;
                }
            }
            out.push_str(&spans.join(" "));
            out.push_str(trailing_whitespace(inner));
            out.push_str(block.close_tag(original));
        })
    }

    /// Copy the original, letting `emit` rewrite each placed block.
    fn render(&self, mut emit: impl FnMut(&mut String, &Placement, &str)) -> String {
        let original = self.original.as_str();
        let mut out = String::with_capacity(original.len() * 2);
        let mut cursor = 0;

        for placement in &self.placements {
            out.push_str(&original[cursor..placement.block.open.start]);
            emit(&mut out, placement, original);
            cursor = placement.block.close.end;
        }
        out.push_str(&original[cursor..]);
        out
    }
}

fn leading_whitespace(s: &str) -> &str {
    &s[..s.len() - s.trim_start().len()]
}

fn trailing_whitespace(s: &str) -> &str {
    &s[s.trim_end().len()..]
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: &str = "Always wear a helmet when on site, and check your harness before \
                        climbing any scaffold structure, every single day without exception.";

    fn paragraphs(texts: &[&str]) -> String {
        texts.iter().map(|t| format!("<p>{t}</p>")).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn short_and_long_paragraphs() {
        let seg = Segmenter::default().segment(&paragraphs(&["Safety first.", LONG]));
        let units = seg.units();

        assert_eq!(units.len(), 3);
        assert_eq!(units[0].text, "Safety first.");
        assert!(!units[0].is_chunk);
        assert_eq!(units[1].word_count, 20);
        assert!(units[1].is_chunk);
        assert_eq!(units[2].text, "exception.");
        assert_eq!(units[2].word_count, 1);
    }

    #[test]
    fn chunks_close_at_sentence_ends() {
        let text = "One two three four five six seven eight nine ten. \
                    Eleven twelve thirteen fourteen fifteen sixteen seventeen eighteen \
                    nineteen twenty twentyone twentytwo.";
        let seg = Segmenter::default().segment(&paragraphs(&[text]));
        let counts: Vec<_> = seg.units().iter().map(|u| u.word_count).collect();
        assert_eq!(counts, [10, 12]);
        assert!(seg.units().iter().all(|u| u.is_chunk));
    }

    #[test]
    fn chunk_size_never_exceeds_limit() {
        let text = (1..=57).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let seg = Segmenter::new(20).segment(&paragraphs(&[&text]));
        let counts: Vec<_> = seg.units().iter().map(|u| u.word_count).collect();
        assert_eq!(counts, [20, 20, 17]);
    }

    #[test]
    fn duplicates_and_captions_are_skipped() {
        let markup = "<h1>Intro</h1><p>Check  the\nrope.</p><p>Check the rope.</p>\
                      <p>Figura 3: harness</p><p>Fig12 anchor</p><p><img src=\"a.png\"></p><p>   </p>";
        let seg = Segmenter::default().segment(markup);
        let texts: Vec<_> = seg.units().iter().map(|u| u.text.as_str()).collect();
        assert_eq!(texts, ["Intro", "Check the rope."]);
    }

    #[test]
    fn offsets_index_the_joined_text() {
        let seg = Segmenter::default().segment(&paragraphs(&["Safety first.", LONG]));
        let joined = SpeechUnit::joined_text(seg.units());
        for unit in seg.units() {
            let slice: String = joined
                .chars()
                .skip(unit.char_start)
                .take(unit.char_end - unit.char_start)
                .collect();
            assert_eq!(slice, unit.text);
        }
    }

    #[test]
    fn segmentation_is_idempotent() {
        let markup = paragraphs(&["Safety first.", LONG, "Safety first."]);
        let segmenter = Segmenter::default();
        assert_eq!(segmenter.segment(&markup).units(), segmenter.segment(&markup).units());
    }

    #[test]
    fn empty_input_gives_no_units() {
        let seg = Segmenter::default().segment("");
        assert!(seg.units().is_empty());
        assert_eq!(seg.render_units(), "");
    }

    #[test]
    fn unit_rendering_wraps_chunks_and_tags_blocks() {
        let markup = format!("<div><p class=\"lead\">Safety first.</p>\n<p> {LONG} </p></div>");
        let seg = Segmenter::default().segment(&markup);
        let rendered = seg.render_units();

        assert!(rendered.starts_with("<div><p class=\"lead\" data-tts-unit=\"0\">Safety first.</p>\n<p> "));
        assert!(rendered.contains("<span class=\"chunk\" data-tts-unit=\"1\">Always wear"));
        assert!(rendered.contains("</span> <span class=\"chunk\" data-tts-unit=\"2\">exception.</span> </p></div>"));
        assert_eq!(seg.original(), markup);
    }

    #[test]
    fn word_rendering_numbers_words_in_spoken_order() {
        let markup = "<p>Safety first.</p><p>Wear <b>a</b> helmet.</p>";
        let seg = Segmenter::default().segment(markup);
        let rendered = seg.render_words();

        assert_eq!(seg.word_count(), 5);
        assert_eq!(
            rendered,
            "<p><span data-tts-word=\"0\">Safety</span> <span data-tts-word=\"1\">first.</span></p>\
             <p><span data-tts-word=\"2\">Wear</span> <span data-tts-word=\"3\">a</span> \
             <span data-tts-word=\"4\">helmet.</span></p>"
        );
    }

    #[test]
    fn skipped_blocks_are_left_untouched() {
        let markup = "<p><img src=\"a.png\"></p><p>Go.</p>";
        let seg = Segmenter::default().segment(markup);
        assert_eq!(
            seg.render_units(),
            "<p><img src=\"a.png\"></p><p data-tts-unit=\"0\">Go.</p>"
        );
    }
}
