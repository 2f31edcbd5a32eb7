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

use std::ops::Range;

use serde::Deserialize;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::types::note::NoteId;

/// The key under which the remote identifier is stored.
pub const NOTE_ID_KEY: &str = "noteId";

/// Metadata that can be specified at the top of a document.
#[derive(Debug, Default, PartialEq, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub deck: Option<String>,
    #[serde(default, rename = "noteId")]
    pub note_id: Option<NoteId>,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Tags {
    One(String),
    Many(Vec<String>),
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let tags: Option<Tags> = Option::deserialize(deserializer)?;
    Ok(match tags {
        None => Vec::new(),
        Some(Tags::One(tag)) => tag.split_whitespace().map(str::to_string).collect(),
        Some(Tags::Many(tags)) => tags,
    })
}

/// Byte ranges of a metadata block within a document.
#[derive(Debug, PartialEq)]
struct Span {
    /// The YAML between the delimiters.
    yaml: Range<usize>,
    /// The closing delimiter line, including its line ending.
    closing: Range<usize>,
}

fn is_delimiter(line: &str) -> bool {
    line.trim() == "---"
}

/// Locate the metadata block. A document without a leading `---` has none;
/// an opening `---` without a closing one is an error.
fn locate(text: &str) -> Fallible<Option<Span>> {
    let mut lines = text.split_inclusive('\n');
    match lines.next() {
        Some(first) if is_delimiter(first) => {
            let yaml_start = first.len();
            let mut offset = yaml_start;
            for line in lines {
                if is_delimiter(line) || line.trim_end() == "..." {
                    return Ok(Some(Span {
                        yaml: yaml_start..offset,
                        closing: offset..offset + line.len(),
                    }));
                }
                offset += line.len();
            }
            Err(ErrorReport::parse(
                "Metadata block opening '---' found but no closing '---'.",
            ))
        }
        _ => Ok(None),
    }
}

/// Split a document into its parsed metadata, the raw YAML (if a block is
/// present), and the remaining body.
pub fn extract_frontmatter(text: &str) -> Fallible<(Metadata, Option<&str>, &str)> {
    match locate(text)? {
        None => Ok((Metadata::default(), None, text)),
        Some(span) => {
            let yaml = &text[span.yaml];
            let body = &text[span.closing.end..];
            let metadata = if yaml.trim().is_empty() {
                Metadata::default()
            } else {
                serde_yaml::from_str(yaml)?
            };
            Ok((metadata, Some(yaml), body))
        }
    }
}

/// Write `id` into the document's metadata block, creating the block if
/// needed. Everything else in the document is preserved byte for byte.
pub fn set_note_id(text: &str, id: NoteId) -> Fallible<String> {
    let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };
    let entry = format!("{NOTE_ID_KEY}: {id}");
    match locate(text)? {
        None => Ok(format!("---{newline}{entry}{newline}---{newline}{text}")),
        Some(span) => {
            let mut offset = span.yaml.start;
            for line in text[span.yaml.clone()].split_inclusive('\n') {
                let key = line.split(':').next().unwrap_or("").trim_end();
                if key == NOTE_ID_KEY && line.contains(':') {
                    let ending = &line[line.trim_end_matches(['\r', '\n']).len()..];
                    return Ok(format!(
                        "{}{entry}{ending}{}",
                        &text[..offset],
                        &text[offset + line.len()..]
                    ));
                }
                offset += line.len();
            }
            let at = span.closing.start;
            Ok(format!(
                "{}{entry}{newline}{}",
                &text[..at],
                &text[at..]
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_frontmatter() -> Fallible<()> {
        let (metadata, yaml, body) = extract_frontmatter("Front\n\n---\n\nBack")?;
        assert_eq!(metadata, Metadata::default());
        assert_eq!(yaml, None);
        assert_eq!(body, "Front\n\n---\n\nBack");
        Ok(())
    }

    #[test]
    fn test_full_frontmatter() -> Fallible<()> {
        let text = "---\ndeck: Spanish::Verbs\nnoteId: 42\ntags: [a, b]\nauthor: me\n---\nBody";
        let (metadata, _, body) = extract_frontmatter(text)?;
        assert_eq!(metadata.deck.as_deref(), Some("Spanish::Verbs"));
        assert_eq!(metadata.note_id, Some(NoteId(42)));
        assert_eq!(metadata.tags, vec!["a", "b"]);
        assert_eq!(body, "Body");
        Ok(())
    }

    #[test]
    fn test_tags_as_string() -> Fallible<()> {
        let (metadata, _, _) = extract_frontmatter("---\ntags: one two\n---\n")?;
        assert_eq!(metadata.tags, vec!["one", "two"]);
        Ok(())
    }

    #[test]
    fn test_empty_block() -> Fallible<()> {
        let (metadata, yaml, body) = extract_frontmatter("---\n\n---\nBody")?;
        assert_eq!(metadata, Metadata::default());
        assert_eq!(yaml, Some("\n"));
        assert_eq!(body, "Body");
        Ok(())
    }

    #[test]
    fn test_malformed_block_is_error() {
        let err = extract_frontmatter("---\ndeck: [unclosed\n---\nBody").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ParseFailure);
    }

    #[test]
    fn test_unclosed_block_is_error() {
        assert!(extract_frontmatter("---\ndeck: a\n").is_err());
    }

    #[test]
    fn test_set_note_id_without_block() -> Fallible<()> {
        let text = set_note_id("Front\n\n---\n\nBack\n", NoteId(7))?;
        assert_eq!(text, "---\nnoteId: 7\n---\nFront\n\n---\n\nBack\n");
        Ok(())
    }

    #[test]
    fn test_set_note_id_inserts_key() -> Fallible<()> {
        let text = set_note_id("---\ndeck: A\n---\nBody", NoteId(7))?;
        assert_eq!(text, "---\ndeck: A\nnoteId: 7\n---\nBody");
        Ok(())
    }

    #[test]
    fn test_set_note_id_replaces_key() -> Fallible<()> {
        let text = set_note_id("---\nnoteId: 1\ndeck: A\n---\nBody", NoteId(99))?;
        assert_eq!(text, "---\nnoteId: 99\ndeck: A\n---\nBody");
        let (metadata, _, _) = extract_frontmatter(&text)?;
        assert_eq!(metadata.note_id, Some(NoteId(99)));
        Ok(())
    }

    #[test]
    fn test_set_note_id_keeps_crlf() -> Fallible<()> {
        let text = set_note_id("---\r\nnoteId: 1\r\n---\r\nBody", NoteId(2))?;
        assert_eq!(text, "---\r\nnoteId: 2\r\n---\r\nBody");
        Ok(())
    }
}
