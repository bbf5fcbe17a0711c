//! Lenient HTML fragment parser.
//!
//! Parses the subset of HTML the binding engine meets: elements with
//! quoted, unquoted, or bare attributes, text with character entities,
//! comments, and void elements. Malformed input degrades instead of
//! erroring — stray closing tags are dropped, unclosed elements are
//! closed by their ancestors — matching the leniency a browser applies.

use tracing::debug;

use crate::document::Document;
use crate::node::NodeId;

/// Elements that never have children or closing tags.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub(crate) fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parse `html` into detached node trees in `doc`'s arena.
///
/// Returns the top-level nodes; the caller attaches them (which is what
/// records them in the mutation log).
pub(crate) fn parse_fragment(doc: &Document, html: &str) -> Vec<NodeId> {
    FragmentParser {
        doc,
        source: html.as_bytes(),
        text: html,
        pos: 0,
    }
    .parse()
}

struct FragmentParser<'a> {
    doc: &'a Document,
    source: &'a [u8],
    text: &'a str,
    pos: usize,
}

impl FragmentParser<'_> {
    fn parse(mut self) -> Vec<NodeId> {
        let mut top_level: Vec<NodeId> = Vec::new();
        // Open-element stack: (tag, node).
        let mut stack: Vec<(String, NodeId)> = Vec::new();

        while self.pos < self.source.len() {
            if self.starts_with("<!--") {
                self.skip_comment();
                continue;
            }
            if self.starts_with("</") {
                self.close_tag(&mut stack);
                continue;
            }
            if self.peek() == Some(b'<') && self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic())
            {
                self.open_tag(&mut top_level, &mut stack);
                continue;
            }
            self.text_node(&mut top_level, &mut stack);
        }
        top_level
    }

    // ── Cursor helpers ────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn starts_with(&self, needle: &str) -> bool {
        self.source[self.pos..].starts_with(needle.as_bytes())
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn attach(&self, node: NodeId, top_level: &mut Vec<NodeId>, stack: &[(String, NodeId)]) {
        match stack.last() {
            Some((_, parent)) => self.doc.append_child(*parent, node),
            None => top_level.push(node),
        }
    }

    // ── Productions ───────────────────────────────────────────────────────

    fn skip_comment(&mut self) {
        self.pos += 4; // <!--
        while self.pos < self.source.len() && !self.starts_with("-->") {
            self.pos += 1;
        }
        self.pos = (self.pos + 3).min(self.source.len());
    }

    fn tag_name(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'-')
        {
            self.pos += 1;
        }
        self.text[start..self.pos].to_ascii_lowercase()
    }

    fn open_tag(&mut self, top_level: &mut Vec<NodeId>, stack: &mut Vec<(String, NodeId)>) {
        self.pos += 1; // <
        let tag = self.tag_name();
        let node = self.doc.create_element(&tag);

        // Attributes until `>`, `/>`, or end of input.
        loop {
            self.skip_whitespace();
            match self.peek() {
                None | Some(b'>') => break,
                Some(b'/') => {
                    self.pos += 1;
                }
                _ => {
                    let (name, value) = self.attribute();
                    if !name.is_empty() {
                        self.doc.set_attribute(node, &name, &value);
                    } else {
                        // Not attribute-shaped; skip one byte to make progress.
                        self.pos += 1;
                    }
                }
            }
        }
        let self_closing = self.pos > 0 && self.source.get(self.pos - 1) == Some(&b'/');
        if self.peek() == Some(b'>') {
            self.pos += 1;
        }

        self.attach(node, top_level, stack);
        if !self_closing && !is_void_element(&tag) {
            stack.push((tag, node));
        }
    }

    fn close_tag(&mut self, stack: &mut Vec<(String, NodeId)>) {
        self.pos += 2; // </
        let tag = self.tag_name();
        while self.peek().is_some() && self.peek() != Some(b'>') {
            self.pos += 1;
        }
        if self.peek() == Some(b'>') {
            self.pos += 1;
        }
        // Pop to the matching open element, closing anything unclosed
        // in between. A stray closing tag is dropped.
        match stack.iter().rposition(|(open, _)| *open == tag) {
            Some(index) => stack.truncate(index),
            None => debug!("dropping stray closing tag </{tag}>"),
        }
    }

    fn attribute(&mut self) -> (String, String) {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| !c.is_ascii_whitespace() && !matches!(c, b'=' | b'>' | b'/'))
        {
            self.pos += 1;
        }
        let name = self.text[start..self.pos].to_string();
        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            // Bare attribute: `<div interactive>`.
            return (name, String::new());
        }
        self.pos += 1; // =
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let start = self.pos;
                while self.peek().is_some() && self.peek() != Some(quote) {
                    self.pos += 1;
                }
                let raw = &self.text[start..self.pos];
                if self.peek() == Some(quote) {
                    self.pos += 1;
                }
                raw.to_string()
            }
            _ => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| !c.is_ascii_whitespace() && c != b'>')
                {
                    self.pos += 1;
                }
                self.text[start..self.pos].to_string()
            }
        };
        (name, decode_entities(&value))
    }

    fn text_node(&mut self, top_level: &mut Vec<NodeId>, stack: &mut Vec<(String, NodeId)>) {
        let start = self.pos;
        // A `<` only opens markup before `/`, `!--`, or a letter; a lone
        // `<` (as in `{{ a < b }}`) is text.
        loop {
            match self.peek() {
                None => break,
                Some(b'<') => {
                    let tag_shaped = self.starts_with("</")
                        || self.starts_with("<!--")
                        || self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic());
                    if tag_shaped {
                        break;
                    }
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }
        if self.pos == start {
            // Guarantees progress even if called on a tag-shaped byte.
            self.pos += 1;
        }
        let raw = &self.text[start..self.pos];
        let node = self.doc.create_text(decode_entities(raw));
        self.attach(node, top_level, stack);
    }
}

/// Decode the character entities the serializer emits (plus the numeric
/// apostrophe form).
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
