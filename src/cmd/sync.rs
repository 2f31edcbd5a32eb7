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


use std::fs::read_to_string;
use std::fs::write;

use deckmark_core::error::Fallible;
use deckmark_core::frontmatter::set_note_id;
use deckmark_core::sync::NoteStore;
use deckmark_core::sync::SyncOptions;
use deckmark_core::sync::SyncReport;
use deckmark_core::sync::sync_notes;
use deckmark_core::types::note::Note;
use log::info;

use crate::anki::AnkiConnect;
use crate::cmd::check::ensure_compiled;
use crate::cmd::print_report;
use crate::collection::collection_root;
use crate::collection::compile_collection;
use crate::config::Config;
use crate::config::Overrides;

/// Record a freshly created note's identifier in its source document.
fn write_note_id(note: &Note) -> Fallible<()> {
    let (Some(path), Some(id)) = (&note.source_path, note.id.remote_id()) else {
        return Ok(());
    };
    let text = read_to_string(path)?;
    write(path, set_note_id(&text, id)?)?;
    info!("Wrote note id {id} to {}", path.display());
    Ok(())
}

pub fn sync_options(config: &Config, dry_run: bool) -> SyncOptions {
    SyncOptions {
        namespace: config.namespace.clone(),
        model_prefix: config.model_prefix.clone(),
        fallback_deck: config.default_deck.clone(),
        dry_run,
    }
}

/// Reconcile `notes` with the store, writing new identifiers back to disk.
pub async fn push_notes<S: NoteStore>(
    store: &mut S,
    notes: Vec<Note>,
    config: &Config,
    dry_run: bool,
) -> Fallible<SyncReport> {
    sync_notes(store, notes, &sync_options(config, dry_run), write_note_id).await
}

pub async fn sync_collection(
    directory: Option<String>,
    overrides: Overrides,
    dry_run: bool,
    json: bool,
) -> Fallible<()> {
    let root = collection_root(directory)?;
    let config = Config::load(&root)?.with_overrides(overrides);
    let collection = compile_collection(&root, &config)?;
    // A missing document would look like a deleted note.
    ensure_compiled(&collection)?;
    let mut store = AnkiConnect::new(&config.anki_url);
    let report = push_notes(&mut store, collection.notes, &config, dry_run).await?;
    print_report(&report, json)
}
