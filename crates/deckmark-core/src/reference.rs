// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Wiki-style references: `[[target]]`, `[[target|label]]`, `![[target]]`
//! and `![[target|label]]`.
//!
//! The tokenizer is a small state machine over a [`Cursor`]. On failure the
//! cursor is rewound, so the caller can treat the input as plain text.
//! [`expand_references`] rewrites every recognized reference into ordinary
//! Markdown link or image syntax before the document is parsed.

use std::ops::Range;
use std::sync::LazyLock;

use percent_encoding::AsciiSet;
use percent_encoding::CONTROLS;
use percent_encoding::utf8_percent_encode;
use pulldown_cmark::Event;
use pulldown_cmark::Parser;
use pulldown_cmark::Tag;
use regex::Regex;

use crate::markdown::parser_options;

/// Characters percent-encoded in non-absolute reference targets. `%` is left
/// alone so already-encoded targets survive.
const TARGET_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}')
    .add(b'[')
    .add(b']');

static ABSOLUTE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]{1,31}:").expect("absolute url regex"));

/// A recognized reference.
#[derive(Clone, Debug, PartialEq)]
pub struct Reference {
    /// `true` for `![[...]]`.
    pub embed: bool,
    /// The target, with escapes removed.
    pub target: String,
    /// The raw label text after the divider, if a divider was present.
    pub label: Option<String>,
}

/// A character cursor with one-token lookahead and mark/rewind.
pub struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Cursor { text, pos: 0 }
    }

    pub fn at(text: &'a str, pos: usize) -> Self {
        Cursor { text, pos }
    }

    pub fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    pub fn consume(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub fn mark(&self) -> usize {
        self.pos
    }

    pub fn rewind(&mut self, mark: usize) {
        self.pos = mark;
    }

    /// True if the text after the cursor, up to the next line ending, is
    /// blank. Called right after consuming a line ending.
    fn at_blank_line(&self) -> bool {
        let rest = &self.text[self.pos..];
        let line = rest.split('\n').next().unwrap_or("");
        line.trim().is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    /// Nothing consumed yet.
    Start,
    /// After `!`.
    Bang,
    /// After the first `[`.
    Open,
    /// Accumulating the target.
    Target,
    /// After a `\` in the target.
    TargetEscape,
    /// Accumulating the label, after the first `|`.
    Label,
    /// After a `\` in the label.
    LabelEscape,
}

/// Try to read a reference at the cursor. On failure, the cursor is left
/// where it was.
pub fn tokenize(cursor: &mut Cursor<'_>) -> Option<Reference> {
    let mark = cursor.mark();
    let result = scan(cursor);
    if result.is_none() {
        cursor.rewind(mark);
    }
    result
}

fn scan(cursor: &mut Cursor<'_>) -> Option<Reference> {
    let mut state = State::Start;
    let mut embed = false;
    let mut target = String::new();
    let mut label: Option<String> = None;
    loop {
        // End of input always fails.
        let c = cursor.consume()?;
        state = match (state, c) {
            (State::Start, '!') => {
                embed = true;
                State::Bang
            }
            (State::Start | State::Bang, '[') => State::Open,
            (State::Open, '[') => State::Target,
            (State::Start | State::Bang | State::Open, _) => return None,
            (_, '\n') if cursor.at_blank_line() => return None,
            (State::Target, '\\') => State::TargetEscape,
            (State::TargetEscape, c) => {
                target.push(c);
                State::Target
            }
            (State::Target, '|') => {
                label = Some(String::new());
                State::Label
            }
            (State::Target | State::Label, ']') if cursor.peek() == Some(']') => {
                cursor.consume();
                break;
            }
            (State::Target, c) => {
                target.push(c);
                State::Target
            }
            (State::Label, '\\') => {
                label.get_or_insert_with(String::new).push('\\');
                State::LabelEscape
            }
            (State::Label | State::LabelEscape, c) => {
                label.get_or_insert_with(String::new).push(c);
                State::Label
            }
        };
    }
    if target.trim().is_empty() {
        return None;
    }
    Some(Reference {
        embed,
        target,
        label,
    })
}

impl Reference {
    /// The label with `\\` and `\|` escapes removed. An empty label counts as
    /// absent.
    pub fn label(&self) -> Option<String> {
        let raw = self.label.as_deref()?;
        let mut label = String::with_capacity(raw.len());
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(&next) = chars.peek() {
                    if next == '\\' || next == '|' {
                        label.push(next);
                        chars.next();
                        continue;
                    }
                }
            }
            label.push(c);
        }
        if label.is_empty() { None } else { Some(label) }
    }

    /// The text shown for a link: the label, else the URL fragment, else the
    /// last path segment, else the raw target.
    pub fn link_text(&self) -> String {
        if let Some(label) = self.label() {
            return label;
        }
        if let Some((_, fragment)) = self.target.split_once('#') {
            if !fragment.is_empty() {
                return fragment.to_string();
            }
        }
        if let Some(segment) = self.target.rsplit('/').find(|s| !s.is_empty()) {
            return segment.to_string();
        }
        self.target.clone()
    }

    /// The destination URL. Absolute URLs pass through untouched.
    pub fn url(&self) -> String {
        if ABSOLUTE_URL.is_match(&self.target) {
            self.target.clone()
        } else {
            utf8_percent_encode(&self.target, TARGET_ENCODE_SET).to_string()
        }
    }

    /// Render as ordinary Markdown link or image syntax.
    pub fn to_markdown(&self) -> String {
        let url = self.url();
        if self.embed {
            // Alt text takes the label as written, escapes included.
            let alt = self.label.as_deref().unwrap_or_default();
            format!("![{}](<{}>)", escape_markdown(alt), url)
        } else {
            format!("[{}](<{}>)", escape_markdown(&self.link_text()), url)
        }
    }
}

/// Backslash-escape every ASCII punctuation character, so the text is read
/// back literally.
fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_punctuation() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Byte ranges of `markdown` where references must not be recognized: code,
/// math and raw HTML.
fn protected_ranges(markdown: &str) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = Vec::new();
    for (event, range) in Parser::new_ext(markdown, parser_options()).into_offset_iter() {
        let protected = matches!(
            event,
            Event::Start(Tag::CodeBlock(_))
                | Event::Start(Tag::HtmlBlock)
                | Event::Code(_)
                | Event::InlineMath(_)
                | Event::DisplayMath(_)
                | Event::InlineHtml(_)
                | Event::Html(_)
        );
        if protected {
            ranges.push(range);
        }
    }
    ranges.sort_by_key(|r| r.start);
    ranges
}

/// Rewrite every reference in `markdown` into ordinary link/image syntax.
/// Text that does not form a complete reference is copied unchanged.
pub fn expand_references(markdown: &str) -> String {
    if !markdown.contains("[[") {
        return markdown.to_string();
    }
    let protected = protected_ranges(markdown);
    let mut out = String::with_capacity(markdown.len());
    let mut pos = 0;
    let mut next_protected = 0;
    while pos < markdown.len() {
        while next_protected < protected.len() && protected[next_protected].end <= pos {
            next_protected += 1;
        }
        if let Some(range) = protected.get(next_protected) {
            if range.start <= pos {
                out.push_str(&markdown[pos..range.end]);
                pos = range.end;
                continue;
            }
        }
        let mut cursor = Cursor::at(markdown, pos);
        let Some(c) = cursor.peek() else { break };
        if c == '\\' {
            // An escaped character is never the start of a reference.
            cursor.consume();
            cursor.consume();
            out.push_str(&markdown[pos..cursor.mark()]);
            pos = cursor.mark();
            continue;
        }
        if c == '!' || c == '[' {
            if let Some(reference) = tokenize(&mut cursor) {
                let end = cursor.mark();
                let crosses = protected
                    .get(next_protected)
                    .is_some_and(|range| range.start < end);
                if !crosses {
                    out.push_str(&reference.to_markdown());
                    pos = end;
                    continue;
                }
            }
        }
        out.push(c);
        pos += c.len_utf8();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(input: &str) -> Option<Reference> {
        let mut cursor = Cursor::new(input);
        tokenize(&mut cursor)
    }

    #[test]
    fn test_simple_link() {
        let reference = tok("[[note]]").unwrap();
        assert!(!reference.embed);
        assert_eq!(reference.target, "note");
        assert_eq!(reference.label, None);
    }

    #[test]
    fn test_embed_with_label() {
        let reference = tok("![[cat.png|a cat]]").unwrap();
        assert!(reference.embed);
        assert_eq!(reference.target, "cat.png");
        assert_eq!(reference.label(), Some("a cat".to_string()));
    }

    #[test]
    fn test_embed_alt_text_keeps_label_escapes() {
        let reference = tok(r"![[x.png|a\|b]]").unwrap();
        assert_eq!(reference.label(), Some("a|b".to_string()));
        assert_eq!(reference.to_markdown(), r"![a\\\|b](<x.png>)");
    }

    #[test]
    fn test_escaped_divider_in_target() {
        let reference = tok(r"[[a\|b|label]]").unwrap();
        assert_eq!(reference.target, "a|b");
        assert_eq!(reference.label(), Some("label".to_string()));
    }

    #[test]
    fn test_single_bracket_is_content() {
        let reference = tok("[[a]b]]").unwrap();
        assert_eq!(reference.target, "a]b");
    }

    #[test]
    fn test_second_divider_is_label_content() {
        let reference = tok("[[a|b|c]]").unwrap();
        assert_eq!(reference.target, "a");
        assert_eq!(reference.label(), Some("b|c".to_string()));
    }

    #[test]
    fn test_empty_target_fails() {
        let mut cursor = Cursor::new("[[]]");
        assert_eq!(tokenize(&mut cursor), None);
        assert_eq!(cursor.mark(), 0);
    }

    #[test]
    fn test_empty_label_is_absent() {
        let reference = tok("[[a|]]").unwrap();
        assert_eq!(reference.label, Some(String::new()));
        assert_eq!(reference.label(), None);
        assert_eq!(reference.link_text(), "a");
    }

    #[test]
    fn test_failures_leave_cursor_untouched() {
        for input in ["[[open", "[x]]", "![x", "[[a]", "[[a\n\nb]]", "!"] {
            let mut cursor = Cursor::new(input);
            assert_eq!(tokenize(&mut cursor), None, "{input}");
            assert_eq!(cursor.mark(), 0, "{input}");
        }
    }

    #[test]
    fn test_single_line_ending_is_allowed() {
        let reference = tok("[[a\nb]]").unwrap();
        assert_eq!(reference.target, "a\nb");
    }

    #[test]
    fn test_link_text_precedence() {
        assert_eq!(tok("[[a/b#Heading|Label]]").unwrap().link_text(), "Label");
        assert_eq!(tok("[[a/b#Heading]]").unwrap().link_text(), "Heading");
        assert_eq!(tok("[[dir/page]]").unwrap().link_text(), "page");
        assert_eq!(tok("[[page]]").unwrap().link_text(), "page");
        assert_eq!(tok(r"[[x|a\|b\\c]]").unwrap().link_text(), r"a|b\c");
    }

    #[test]
    fn test_url_encoding() {
        assert_eq!(tok("[[my note]]").unwrap().url(), "my%20note");
        assert_eq!(tok("[[café]]").unwrap().url(), "caf%C3%A9");
        assert_eq!(
            tok("[[https://example.com/a b]]").unwrap().url(),
            "https://example.com/a b"
        );
    }

    #[test]
    fn test_expand_link() {
        assert_eq!(
            expand_references("See [[my note]] now."),
            r"See [my note](<my%20note>) now."
        );
    }

    #[test]
    fn test_expand_embed() {
        assert_eq!(
            expand_references("![[img.png|alt]]"),
            "![alt](<img.png>)"
        );
    }

    #[test]
    fn test_expand_skips_code() {
        let input = "`[[code]]` and\n\n```\n[[block]]\n```\n";
        assert_eq!(expand_references(input), input);
    }

    #[test]
    fn test_expand_leaves_broken_syntax() {
        let text = "a [[b\n\nc [[]] d";
        assert_eq!(expand_references(text), text);
    }

    #[test]
    fn test_expand_respects_escapes() {
        assert_eq!(expand_references(r"\[[a]]"), r"\[[a]]");
    }
}
