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

//! One-way reconciliation of a local note set against a remote namespace.
//!
//! A run goes through fixed phases: validate the namespace, fetch the remote
//! notes, delete orphans, match local notes against remote ones, then prune
//! the decks the run emptied. Remote calls are awaited one at a time and the
//! first failure aborts the run; whatever was applied before it stays.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::time::Instant;

use log::debug;
use log::info;
use log::warn;

use crate::error::Fallible;
use crate::model::ModelSpec;
use crate::sync::report::SyncAction;
use crate::sync::report::SyncReport;
use crate::sync::report::SyncedNote;
use crate::sync::store::NoteFields;
use crate::sync::store::NoteQuery;
use crate::sync::store::NoteStore;
use crate::sync::store::fetch_namespace_notes;
use crate::sync::store::remote_tags;
use crate::sync::store::same_namespace;
use crate::sync::store::validate_namespace;
use crate::types::aliases::BUILTIN_DECK;
use crate::types::aliases::DECK_SEPARATOR;
use crate::types::aliases::DeckName;
use crate::types::aliases::is_within_deck;
use crate::types::note::Identity;
use crate::types::note::Note;
use crate::types::note::NoteId;
use crate::types::shape::CardShape;

#[derive(Clone, Debug)]
pub struct SyncOptions {
    pub namespace: String,
    pub model_prefix: String,
    /// Deck for local notes that arrive without one.
    pub fallback_deck: DeckName,
    /// Compute and report everything, but make no mutating remote call.
    pub dry_run: bool,
}

fn fields(note: &Note) -> NoteFields {
    NoteFields {
        front: note.front.clone(),
        back: note.back.clone(),
    }
}

fn depth(deck: &str) -> usize {
    deck.matches(DECK_SEPARATOR).count()
}

/// Per-run state threaded between the phases.
struct Run<'a, S: NoteStore> {
    store: &'a mut S,
    dry_run: bool,
    model_prefix: String,
    models_ready: bool,
    known_decks: Option<BTreeSet<DeckName>>,
    /// Decks that lost a note during this run.
    touched: BTreeSet<DeckName>,
    deleted: BTreeSet<NoteId>,
}

impl<S: NoteStore> Run<'_, S> {
    async fn ensure_models(&mut self) -> Fallible<()> {
        if self.models_ready {
            return Ok(());
        }
        let existing: BTreeSet<String> = self.store.model_names().await?.into_iter().collect();
        for shape in CardShape::ALL {
            let spec = ModelSpec::for_shape(shape, &self.model_prefix);
            if !existing.contains(&spec.name) {
                info!("Creating model {}", spec.name);
                self.store.create_model(&spec).await?;
            }
        }
        self.models_ready = true;
        Ok(())
    }

    async fn ensure_deck(&mut self, deck: &str) -> Fallible<()> {
        if self.known_decks.is_none() {
            let names = self.store.deck_names().await?;
            self.known_decks = Some(names.into_iter().collect());
        }
        if self.known_decks.as_ref().is_some_and(|known| known.contains(deck)) {
            return Ok(());
        }
        info!("Creating deck {deck}");
        self.store.create_deck(deck).await?;
        let parts: Vec<&str> = deck.split(DECK_SEPARATOR).collect();
        if let Some(known) = &mut self.known_decks {
            for end in 1..=parts.len() {
                known.insert(parts[..end].join(DECK_SEPARATOR));
            }
        }
        Ok(())
    }

    /// Create `note` remotely and give it the new identifier.
    async fn create(&mut self, note: &mut Note) -> Fallible<()> {
        note.id = Identity::New;
        note.cards = None;
        if self.dry_run {
            debug!("Would create a {} note in {}", note.model, note.deck);
            return Ok(());
        }
        self.ensure_models().await?;
        self.ensure_deck(&note.deck).await?;
        let id = self
            .store
            .add_note(&note.model, &note.deck, &fields(note), &remote_tags(note))
            .await?;
        info!("Created note {id} in {}", note.deck);
        note.id = Identity::Remote(id);
        Ok(())
    }

    async fn delete(&mut self, ids: &[NoteId]) -> Fallible<()> {
        self.deleted.extend(ids.iter().copied());
        if self.dry_run || ids.is_empty() {
            return Ok(());
        }
        info!("Deleting {} note(s)", ids.len());
        self.store.delete_notes(ids).await
    }

    /// Bring an existing remote note in line with its local version.
    async fn update(&mut self, id: NoteId, note: &Note, remote: &Note) -> Fallible<bool> {
        let mut changed = false;
        if note.content_differs(remote) {
            changed = true;
            if !self.dry_run {
                info!("Updating note {id}");
                self.store
                    .update_note(id, &fields(note), &remote_tags(note))
                    .await?;
            }
        }
        if note.deck != remote.deck {
            changed = true;
            self.touched.insert(remote.deck.clone());
            if !self.dry_run {
                info!("Moving note {id} from {} to {}", remote.deck, note.deck);
                self.ensure_deck(&note.deck).await?;
                let cards = remote.cards.clone().unwrap_or_default();
                self.store.change_deck(&cards, &note.deck).await?;
            }
        }
        Ok(changed)
    }

    /// The touched decks that no longer hold any note, outermost only.
    async fn empty_decks(&mut self, local: &[SyncedNote]) -> Fallible<Vec<DeckName>> {
        let touched: Vec<DeckName> = self
            .touched
            .iter()
            .filter(|deck| !deck.is_empty() && deck.as_str() != BUILTIN_DECK)
            .cloned()
            .collect();
        if touched.is_empty() {
            return Ok(Vec::new());
        }
        let existing: BTreeSet<DeckName> = self.store.deck_names().await?.into_iter().collect();
        let local_ids: BTreeSet<NoteId> =
            local.iter().filter_map(|s| s.note.id.remote_id()).collect();

        let mut candidates: Vec<DeckName> = touched
            .into_iter()
            .filter(|deck| existing.contains(deck))
            .collect();
        candidates.sort_by(|a, b| depth(b).cmp(&depth(a)).then_with(|| a.cmp(b)));

        let mut empty = Vec::new();
        for deck in candidates {
            if local.iter().any(|s| is_within_deck(&s.note.deck, &deck)) {
                continue;
            }
            // Local notes have already been placed; anything else the store
            // reports here survives unless this run deleted it.
            let remaining = self.store.find_notes(&NoteQuery::Deck(deck.clone())).await?;
            if remaining
                .iter()
                .any(|id| !self.deleted.contains(id) && !local_ids.contains(id))
            {
                continue;
            }
            empty.push(deck);
        }
        let mut outermost: Vec<DeckName> = empty
            .iter()
            .filter(|deck| {
                !empty
                    .iter()
                    .any(|other| other != *deck && is_within_deck(deck, other))
            })
            .cloned()
            .collect();
        outermost.sort();
        Ok(outermost)
    }
}

/// Reconcile `local` against the remote notes of `options.namespace`.
///
/// `on_created` runs right after each successful remote creation, with the
/// note already carrying its new identifier. It is never called in dry-run.
pub async fn sync_notes<S, F>(
    store: &mut S,
    local: Vec<Note>,
    options: &SyncOptions,
    mut on_created: F,
) -> Fallible<SyncReport>
where
    S: NoteStore,
    F: FnMut(&Note) -> Fallible<()>,
{
    let start = Instant::now();
    let namespace = validate_namespace(&options.namespace)?;
    let mut run = Run {
        store,
        dry_run: options.dry_run,
        model_prefix: options.model_prefix.clone(),
        models_ready: false,
        known_decks: None,
        touched: BTreeSet::new(),
        deleted: BTreeSet::new(),
    };

    let remote = fetch_namespace_notes(&mut *run.store, &namespace).await?;
    debug!("Fetched {} remote note(s) in {namespace}", remote.len());

    // Orphans.
    let local_ids: BTreeSet<NoteId> = local.iter().filter_map(|n| n.id.remote_id()).collect();
    let mut synced: Vec<SyncedNote> = Vec::new();
    let mut remote_by_id: BTreeMap<NoteId, Note> = BTreeMap::new();
    let mut orphans: Vec<NoteId> = Vec::new();
    for note in remote {
        let Some(id) = note.id.remote_id() else {
            continue;
        };
        if local_ids.contains(&id) {
            remote_by_id.insert(id, note);
        } else {
            orphans.push(id);
            run.touched.insert(note.deck.clone());
            synced.push(SyncedNote {
                action: SyncAction::Deleted,
                note,
            });
        }
    }
    run.delete(&orphans).await?;

    // Matches.
    let mut finals: Vec<SyncedNote> = Vec::with_capacity(local.len());
    for mut note in local {
        if note.deck.trim().is_empty() {
            note.deck = options.fallback_deck.clone();
        }
        // Removing the counterpart makes a repeated local id miss.
        let counterpart = note
            .id
            .remote_id()
            .and_then(|id| remote_by_id.remove(&id).map(|remote| (id, remote)));
        match counterpart {
            Some((id, remote)) if same_namespace(&remote.namespace, &note.namespace) => {
                if remote.model != note.model {
                    warn!(
                        "Note {id} changed from {} to {}; recreating it discards its review history",
                        remote.model, note.model
                    );
                    run.touched.insert(remote.deck.clone());
                    run.delete(&[id]).await?;
                    synced.push(SyncedNote {
                        action: SyncAction::Deleted,
                        note: remote,
                    });
                    run.create(&mut note).await?;
                    if !run.dry_run {
                        on_created(&note)?;
                    }
                    finals.push(SyncedNote {
                        action: SyncAction::Recreated,
                        note,
                    });
                } else {
                    let changed = run.update(id, &note, &remote).await?;
                    note.cards = remote.cards;
                    let action = if changed {
                        SyncAction::Updated
                    } else {
                        SyncAction::Unchanged
                    };
                    debug!("Note {id} is {action}");
                    finals.push(SyncedNote { action, note });
                }
            }
            _ => {
                run.create(&mut note).await?;
                if !run.dry_run {
                    on_created(&note)?;
                }
                finals.push(SyncedNote {
                    action: SyncAction::Created,
                    note,
                });
            }
        }
    }

    // Decks.
    let deleted_decks = run.empty_decks(&finals).await?;
    if !deleted_decks.is_empty() && !run.dry_run {
        info!("Removing deck(s): {}", deleted_decks.join(", "));
        run.store.remove_decks(&deleted_decks).await?;
    }

    synced.extend(finals);
    let report = SyncReport {
        namespace,
        dry_run: options.dry_run,
        duration: start.elapsed(),
        synced,
        deleted_decks,
    };
    info!(
        "Synced {} note(s) in {}ms",
        report.synced.len(),
        report.duration.as_millis()
    );
    Ok(report)
}
