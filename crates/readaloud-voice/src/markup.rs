//! Minimal block scanner over the content container's markup.
//!
//! Only what segmentation needs: find block-level text containers
//! (`p`, `li`, `h1`–`h3`) in document order, read their text content, tell
//! whether they hold an image, and splice anchor attributes/wrappers back
//! into a copy of the markup. The original string is never modified.

use std::ops::Range;

/// Tags treated as speakable text containers.
const BLOCK_TAGS: [&str; 5] = ["p", "li", "h1", "h2", "h3"];

/// Attribute naming the unit an element anchors.
pub const UNIT_ATTR: &str = "data-tts-unit";

/// Attribute naming the word a span anchors (aggregate mode).
pub const WORD_ATTR: &str = "data-tts-word";

/// One block-level element found in the markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Lowercase tag name.
    pub tag: String,

    /// Byte range of the opening tag, `<` through `>`.
    pub open: Range<usize>,

    /// Byte range of the inner markup.
    pub inner: Range<usize>,

    /// Byte range of the closing tag.
    pub close: Range<usize>,
}

impl Block {
    /// Inner markup of the block.
    #[must_use]
    pub fn inner_markup<'a>(&self, markup: &'a str) -> &'a str {
        &markup[self.inner.clone()]
    }

    /// Opening tag text.
    #[must_use]
    pub fn open_tag<'a>(&self, markup: &'a str) -> &'a str {
        &markup[self.open.clone()]
    }

    /// Closing tag text.
    #[must_use]
    pub fn close_tag<'a>(&self, markup: &'a str) -> &'a str {
        &markup[self.close.clone()]
    }

    /// Decoded text content (tags stripped, entities decoded).
    #[must_use]
    pub fn text_content(&self, markup: &str) -> String {
        text_content(self.inner_markup(markup))
    }

    /// Whether the block contains an `<img>` element.
    #[must_use]
    pub fn contains_image(&self, markup: &str) -> bool {
        contains_tag(self.inner_markup(markup), "img")
    }
}

/// Find speakable blocks in document order.
///
/// Blocks do not nest: once a block is found, scanning resumes after its
/// closing tag. A block with no closing tag is ignored.
#[must_use]
pub fn scan_blocks(markup: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = markup[cursor..].find('<') {
        let start = cursor + offset;
        let Some((name, open_end)) = parse_open_tag(markup, start) else {
            cursor = start + 1;
            continue;
        };

        if !BLOCK_TAGS.contains(&name.as_str()) {
            cursor = open_end;
            continue;
        }

        match find_close_tag(markup, open_end, &name) {
            Some(close) => {
                cursor = close.end;
                blocks.push(Block {
                    tag: name,
                    open: start..open_end,
                    inner: open_end..close.start,
                    close,
                });
            }
            None => cursor = open_end,
        }
    }

    blocks
}

/// Strip tags and decode entities.
#[must_use]
pub fn text_content(markup: &str) -> String {
    let mut stripped = String::with_capacity(markup.len());
    let mut in_tag = false;

    for c in markup.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => stripped.push(c),
            _ => {}
        }
    }

    decode_entities(&stripped)
}

/// Escape text for inclusion as element content.
#[must_use]
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Insert `name="value"` into an opening tag, just before its `>`.
#[must_use]
pub fn with_attribute(open_tag: &str, name: &str, value: &str) -> String {
    let body = open_tag.strip_suffix('>').unwrap_or(open_tag);
    let body = body.strip_suffix('/').unwrap_or(body).trim_end();
    format!("{body} {name}=\"{value}\">")
}

/// Whitespace-collapsed, trimmed copy of `text`.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Internal helpers ───────────────────────────────────────────────

/// Parse an opening tag at `start` (which must point at `<`).
///
/// Returns the lowercase tag name and the byte index just past `>`.
fn parse_open_tag(markup: &str, start: usize) -> Option<(String, usize)> {
    let rest = &markup[start + 1..];
    let name_len = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    if name_len == 0 || !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let name = rest[..name_len].to_ascii_lowercase();
    let end = find_tag_end(markup, start + 1 + name_len)?;
    Some((name, end))
}

/// Index just past the `>` closing a tag, honouring quoted attribute values.
fn find_tag_end(markup: &str, from: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in markup[from..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(from + i + 1),
            (None, _) => {}
        }
    }
    None
}

/// Byte range of the closing tag matching `name`, accounting for nested
/// elements with the same name.
fn find_close_tag(markup: &str, from: usize, name: &str) -> Option<Range<usize>> {
    let lower = markup.to_ascii_lowercase();
    let open_pat = format!("<{name}");
    let close_pat = format!("</{name}");
    let mut depth = 0usize;
    let mut cursor = from;

    loop {
        let next_close = lower[cursor..].find(&close_pat).map(|i| cursor + i)?;
        let next_open = lower[cursor..]
            .find(&open_pat)
            .map(|i| cursor + i)
            .filter(|&i| i < next_close && is_tag_boundary(&lower, i + open_pat.len()));

        if let Some(open_at) = next_open {
            depth += 1;
            cursor = open_at + open_pat.len();
            continue;
        }

        let after_name = next_close + close_pat.len();
        if !is_tag_boundary(&lower, after_name) {
            cursor = after_name;
            continue;
        }
        let end = find_tag_end(markup, after_name)?;
        if depth == 0 {
            return Some(next_close..end);
        }
        depth -= 1;
        cursor = end;
    }
}

/// Whether the char at `at` ends a tag name (`>`, `/` or whitespace).
fn is_tag_boundary(markup: &str, at: usize) -> bool {
    markup[at..]
        .chars()
        .next()
        .is_some_and(|c| c == '>' || c == '/' || c.is_whitespace())
}

fn contains_tag(markup: &str, name: &str) -> bool {
    let lower = markup.to_ascii_lowercase();
    let pat = format!("<{name}");
    lower
        .match_indices(&pat)
        .any(|(i, _)| is_tag_boundary(&lower, i + pat.len()))
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&tail[1..semi]).map(|c| (c, semi)));

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_blocks_in_document_order() {
        let markup = "<h2>Title</h2><div><p class=\"a\">One</p><ul><li>Two</li></ul></div>";
        let blocks = scan_blocks(markup);
        let tags: Vec<_> = blocks.iter().map(|b| b.tag.as_str()).collect();
        assert_eq!(tags, ["h2", "p", "li"]);
        assert_eq!(blocks[1].text_content(markup), "One");
        assert_eq!(blocks[1].open_tag(markup), "<p class=\"a\">");
    }

    #[test]
    fn ignores_lookalike_tags() {
        let markup = "<pre>code</pre><param><p>Real</p>";
        let blocks = scan_blocks(markup);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text_content(markup), "Real");
    }

    #[test]
    fn nested_same_tag_closes_at_outer() {
        let markup = "<li>Outer <ul><li>Inner</li></ul> tail</li><p>Next</p>";
        let blocks = scan_blocks(markup);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text_content(markup), "Outer Inner tail");
    }

    #[test]
    fn unclosed_block_is_skipped() {
        let markup = "<p>dangling<h1>Head</h1>";
        let blocks = scan_blocks(markup);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].tag, "h1");
    }

    #[test]
    fn quoted_gt_inside_attribute() {
        let markup = "<p title=\"a > b\">Text</p>";
        let blocks = scan_blocks(markup);
        assert_eq!(blocks[0].text_content(markup), "Text");
    }

    #[test]
    fn detects_images() {
        let markup = "<p><IMG src=\"x.png\"></p><p>plain <i>img</i></p>";
        let blocks = scan_blocks(markup);
        assert!(blocks[0].contains_image(markup));
        assert!(!blocks[1].contains_image(markup));
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(text_content("Fish &amp; chips &lt;3 &#233;t&#xE9;"), "Fish & chips <3 été");
        assert_eq!(text_content("AT&T &bogus; &"), "AT&T &bogus; &");
    }

    #[test]
    fn attribute_insertion() {
        assert_eq!(
            with_attribute("<p class=\"x\">", UNIT_ATTR, "3"),
            "<p class=\"x\" data-tts-unit=\"3\">"
        );
        assert_eq!(with_attribute("<li>", UNIT_ATTR, "0"), "<li data-tts-unit=\"0\">");
    }

    #[test]
    fn escaping_round_trips_through_text_content() {
        let text = "a < b & c";
        assert_eq!(text_content(&escape_text(text)), text);
    }

    #[test]
    fn whitespace_normalisation() {
        assert_eq!(normalize_whitespace("  a \n\t b  "), "a b");
    }
}
