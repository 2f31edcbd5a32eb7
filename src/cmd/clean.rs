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

use crate::anki::AnkiConnect;
use crate::cmd::print_report;
use crate::cmd::sync::push_notes;
use crate::collection::collection_root;
use crate::config::Config;
use crate::config::Overrides;

/// Delete every remote note in the namespace and prune the emptied decks.
pub async fn clean_namespace(
    directory: Option<String>,
    overrides: Overrides,
    dry_run: bool,
    json: bool,
) -> Fallible<()> {
    let root = collection_root(directory)?;
    let config = Config::load(&root)?.with_overrides(overrides);
    let mut store = AnkiConnect::new(&config.anki_url);
    let report = push_notes(&mut store, Vec::new(), &config, dry_run).await?;
    print_report(&report, json)
}

#[cfg(test)]
mod tests {
    use deckmark_core::sync::SyncAction;
    use deckmark_core::sync::memory::MemoryStore;
    use deckmark_core::types::note::Identity;
    use deckmark_core::types::note::Note;

    use super::*;

    fn note(deck: &str) -> Note {
        Note {
            id: Identity::New,
            model: "Deckmark - Basic".to_string(),
            front: "f".to_string(),
            back: "b".to_string(),
            deck: deck.to_string(),
            tags: Vec::new(),
            namespace: "Deckmark".to_string(),
            cards: None,
            source_path: None,
        }
    }

    #[tokio::test]
    async fn test_empty_sync_removes_everything() -> Fallible<()> {
        let config = Config::default();
        let mut store = MemoryStore::new();
        push_notes(&mut store, vec![note("A"), note("B::C")], &config, false).await?;
        let report = push_notes(&mut store, Vec::new(), &config, false).await?;
        assert!(report.synced.iter().all(|s| s.action == SyncAction::Deleted));
        assert_eq!(report.synced.len(), 2);
        assert_eq!(report.deleted_decks, vec!["A", "B::C"]);
        assert_eq!(store.note_count(), 0);
        Ok(())
    }
}
