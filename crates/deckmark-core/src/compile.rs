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

use std::path::PathBuf;

use log::debug;

use crate::ast::parse_document;
use crate::classify::classify;
use crate::error::Fallible;
use crate::markdown::nodes_to_html;
use crate::split::BackField;
use crate::split::split_fields;
use crate::types::aliases::DeckName;
use crate::types::note::Identity;
use crate::types::note::Note;
use crate::types::note::normalize_tags;

/// Everything a document needs from outside itself to become a note.
#[derive(Clone, Debug)]
pub struct NoteContext {
    pub namespace: String,
    pub model_prefix: String,
    /// The deck inferred from the document's location, if any.
    pub inferred_deck: Option<DeckName>,
    /// Used when neither the document nor its location name a deck.
    pub default_deck: DeckName,
    pub source_path: Option<PathBuf>,
}

/// Compile one document into a note.
///
/// # Arguments
/// * `text` - The raw document, including its metadata block
/// * `context` - Namespace, model prefix, and deck fallbacks
pub fn compile_note(text: &str, context: &NoteContext) -> Fallible<Note> {
    let document = parse_document(text)?;
    let shape = classify(&document.tree);
    let fields = split_fields(&document.tree, shape)?;

    let front = nodes_to_html(&fields.front);
    let back = match fields.back {
        BackField::Tree(nodes) => nodes_to_html(&nodes),
        BackField::Answer(answer) => answer,
    };

    let metadata = document.metadata;
    let deck = metadata
        .deck
        .filter(|deck| !deck.trim().is_empty())
        .or_else(|| context.inferred_deck.clone().filter(|d| !d.is_empty()))
        .unwrap_or_else(|| context.default_deck.clone());

    debug!(
        "Compiled {} as {shape} in deck {deck}",
        context
            .source_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<text>".to_string())
    );

    Ok(Note {
        id: Identity::from(metadata.note_id),
        model: shape.model_name(&context.model_prefix),
        front,
        back,
        deck,
        tags: normalize_tags(&metadata.tags),
        namespace: context.namespace.clone(),
        cards: None,
        source_path: context.source_path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::note::NoteId;
    use crate::types::shape::CardShape;

    fn context() -> NoteContext {
        NoteContext {
            namespace: "Test".to_string(),
            model_prefix: "Deckmark - ".to_string(),
            inferred_deck: None,
            default_deck: "Default Deck".to_string(),
            source_path: None,
        }
    }

    #[test]
    fn test_compile_basic() -> Fallible<()> {
        let note = compile_note("Front\n\n---\n\nBack", &context())?;
        assert_eq!(note.model, CardShape::Basic.model_name("Deckmark - "));
        assert_eq!(note.front, "<p>Front</p>");
        assert_eq!(note.back, "<p>Back</p>");
        assert_eq!(note.deck, "Default Deck");
        assert_eq!(note.id, Identity::New);
        Ok(())
    }

    #[test]
    fn test_compile_type_answer() -> Fallible<()> {
        let note = compile_note("2 + 2 = *4*", &context())?;
        assert_eq!(note.model, "Deckmark - Basic (type in the answer)");
        assert_eq!(note.front, "<p>2 + 2 =</p>");
        assert_eq!(note.back, "4");
        Ok(())
    }

    #[test]
    fn test_compile_cloze() -> Fallible<()> {
        let note = compile_note("~~Ottawa~~ is the capital of Canada.", &context())?;
        assert_eq!(note.model, "Deckmark - Cloze");
        assert_eq!(note.front, "<p>{{c1::Ottawa}} is the capital of Canada.</p>");
        assert_eq!(note.front, note.back);
        Ok(())
    }

    #[test]
    fn test_metadata_wins_over_inferred_deck() -> Fallible<()> {
        let mut context = context();
        context.inferred_deck = Some("Inferred".to_string());
        let text = "---\ndeck: Explicit\nnoteId: 12\ntags: [b, a, b]\n---\nFront";
        let note = compile_note(text, &context)?;
        assert_eq!(note.deck, "Explicit");
        assert_eq!(note.id, Identity::Remote(NoteId(12)));
        assert_eq!(note.tags, vec!["b", "a"]);
        Ok(())
    }

    #[test]
    fn test_tag_list_entries_are_split_on_whitespace() -> Fallible<()> {
        let note = compile_note("---\ntags: [two words, two]\n---\nFront", &context())?;
        assert_eq!(note.tags, vec!["two", "words"]);
        Ok(())
    }

    #[test]
    fn test_type_answer_skips_trailing_image_emphasis() -> Fallible<()> {
        let note = compile_note("What animal is this? *cat* *![](cat.png)*", &context())?;
        assert_eq!(note.model, "Deckmark - Basic (type in the answer)");
        assert_eq!(note.front, "<p>What animal is this?</p>");
        assert_eq!(note.back, "cat");
        Ok(())
    }

    #[test]
    fn test_inferred_deck_wins_over_default() -> Fallible<()> {
        let mut context = context();
        context.inferred_deck = Some("Inferred".to_string());
        let note = compile_note("Front", &context)?;
        assert_eq!(note.deck, "Inferred");
        Ok(())
    }

    #[test]
    fn test_malformed_metadata_fails() {
        let err = compile_note("---\ntags: [\n---\nFront", &context()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
    }
}
