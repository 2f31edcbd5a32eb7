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


use deckmark_core::error::Fallible;
use deckmark_core::sync::NoteStore;
use deckmark_core::sync::store::fetch_namespace_notes;
use deckmark_core::sync::store::validate_namespace;
use deckmark_core::types::note::Note;

use crate::anki::AnkiConnect;
use crate::collection::collection_root;
use crate::config::Config;
use crate::config::Overrides;

/// One line per note: id, deck, model, and tags.
fn format_note(note: &Note) -> String {
    let id = note
        .id
        .remote_id()
        .map(|id| id.to_string())
        .unwrap_or_default();
    let mut line = format!("{id}\t{}\t{}", note.deck, note.model);
    if !note.tags.is_empty() {
        line.push('\t');
        line.push_str(&note.tags.join(" "));
    }
    line
}

pub async fn remote_notes<S: NoteStore>(store: &mut S, namespace: &str) -> Fallible<Vec<Note>> {
    let namespace = validate_namespace(namespace)?;
    fetch_namespace_notes(store, &namespace).await
}

/// Print every remote note in the namespace.
pub async fn list_notes(directory: Option<String>, overrides: Overrides, json: bool) -> Fallible<()> {
    let root = collection_root(directory)?;
    let config = Config::load(&root)?.with_overrides(overrides);
    let mut store = AnkiConnect::new(&config.anki_url);
    let notes = remote_notes(&mut store, &config.namespace).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
    } else {
        for note in &notes {
            println!("{}", format_note(note));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use deckmark_core::sync::memory::MemoryStore;
    use deckmark_core::sync::store::NoteFields;
    use deckmark_core::sync::store::namespace_tag;

    use super::*;

    #[tokio::test]
    async fn test_remote_notes_are_scoped() -> Fallible<()> {
        let mut store = MemoryStore::new();
        let fields = NoteFields {
            front: "f".to_string(),
            back: "b".to_string(),
        };
        let ours = store.insert_two_card_note(
            "M",
            "Deck",
            fields.clone(),
            vec!["x".to_string(), namespace_tag("Mine")],
        );
        store.insert_two_card_note("M", "Deck", fields, vec![namespace_tag("Theirs")]);
        let notes = remote_notes(&mut store, "Mine").await?;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id.remote_id(), Some(ours));
        assert_eq!(notes[0].namespace, "Mine");
        assert_eq!(format_note(&notes[0]), format!("{ours}\tDeck\tM\tx"));
        Ok(())
    }
}
