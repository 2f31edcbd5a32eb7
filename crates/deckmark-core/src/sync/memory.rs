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

//! An in-memory [`NoteStore`], for tests and offline experiments.
//!
//! It mirrors the remote store's rules that matter to the reconciler: notes
//! can only be added to existing decks with existing models, creating a deck
//! creates its parents, and removing a deck removes its subdecks and cards.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::model::ModelSpec;
use crate::sync::store::NoteFields;
use crate::sync::store::NoteQuery;
use crate::sync::store::NoteStore;
use crate::sync::store::RemoteNoteInfo;
use crate::types::aliases::BUILTIN_DECK;
use crate::types::aliases::DECK_SEPARATOR;
use crate::types::aliases::DeckName;
use crate::types::aliases::is_within_deck;
use crate::types::aliases::ModelName;
use crate::types::note::CardId;
use crate::types::note::NoteId;

#[derive(Clone, Debug)]
struct StoredNote {
    model: ModelName,
    fields: NoteFields,
    tags: Vec<String>,
    cards: Vec<CardId>,
}

pub struct MemoryStore {
    notes: BTreeMap<NoteId, StoredNote>,
    card_decks: BTreeMap<CardId, DeckName>,
    decks: BTreeSet<DeckName>,
    models: BTreeSet<ModelName>,
    next_id: u64,
    mutations: usize,
    read_only: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut decks = BTreeSet::new();
        decks.insert(BUILTIN_DECK.to_string());
        MemoryStore {
            notes: BTreeMap::new(),
            card_decks: BTreeMap::new(),
            decks,
            models: BTreeSet::new(),
            next_id: 1000,
            mutations: 0,
            read_only: false,
        }
    }

    /// How many mutating calls have succeeded so far.
    pub fn mutation_count(&self) -> usize {
        self.mutations
    }

    /// Make every mutating call fail, as a store that rejects writes would.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn has_deck(&self, deck: &str) -> bool {
        self.decks.contains(deck)
    }

    /// The deck of a note's first card.
    pub fn deck_of(&self, id: NoteId) -> Option<&str> {
        let card = self.notes.get(&id)?.cards.first()?;
        self.card_decks.get(card).map(String::as_str)
    }

    pub fn fields_of(&self, id: NoteId) -> Option<&NoteFields> {
        self.notes.get(&id).map(|note| &note.fields)
    }

    /// Move a single card, bypassing the note-level API.
    pub fn move_card(&mut self, card: CardId, deck: &str) {
        self.insert_deck(deck);
        self.card_decks.insert(card, deck.to_string());
    }

    /// Add a note with two cards, so tests can split them across decks.
    pub fn insert_two_card_note(
        &mut self,
        model: &str,
        deck: &str,
        fields: NoteFields,
        tags: Vec<String>,
    ) -> NoteId {
        self.insert_deck(deck);
        self.models.insert(model.to_string());
        let id = self.fresh_id();
        let cards = vec![CardId(self.next_id), CardId(self.next_id + 1)];
        self.next_id += 2;
        for card in &cards {
            self.card_decks.insert(*card, deck.to_string());
        }
        self.notes.insert(
            NoteId(id),
            StoredNote {
                model: model.to_string(),
                fields,
                tags,
                cards,
            },
        );
        NoteId(id)
    }

    fn fresh_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn insert_deck(&mut self, deck: &str) {
        let parts: Vec<&str> = deck.split(DECK_SEPARATOR).collect();
        for end in 1..=parts.len() {
            self.decks.insert(parts[..end].join(DECK_SEPARATOR));
        }
    }

    fn mutate(&mut self, action: &str) -> Fallible<()> {
        if self.read_only {
            return Err(ErrorReport::remote(format!(
                "{action} rejected: store is read-only."
            )));
        }
        self.mutations += 1;
        Ok(())
    }
}

impl NoteStore for MemoryStore {
    async fn find_notes(&mut self, query: &NoteQuery) -> Fallible<Vec<NoteId>> {
        let ids = self
            .notes
            .iter()
            .filter(|(_, note)| match query {
                NoteQuery::Namespace(tag) => note.tags.contains(tag),
                NoteQuery::Deck(deck) => note.cards.iter().any(|card| {
                    self.card_decks
                        .get(card)
                        .is_some_and(|d| is_within_deck(d, deck))
                }),
            })
            .map(|(id, _)| *id)
            .collect();
        Ok(ids)
    }

    async fn notes_info(&mut self, ids: &[NoteId]) -> Fallible<Vec<Option<RemoteNoteInfo>>> {
        Ok(ids
            .iter()
            .map(|id| {
                self.notes.get(id).map(|note| RemoteNoteInfo {
                    id: *id,
                    model: note.model.clone(),
                    fields: note.fields.clone(),
                    tags: note.tags.clone(),
                    cards: note.cards.clone(),
                })
            })
            .collect())
    }

    async fn add_note(
        &mut self,
        model: &str,
        deck: &str,
        fields: &NoteFields,
        tags: &[String],
    ) -> Fallible<NoteId> {
        if !self.models.contains(model) {
            return Err(ErrorReport::remote(format!("model was not found: {model}")));
        }
        if !self.decks.contains(deck) {
            return Err(ErrorReport::remote(format!("deck was not found: {deck}")));
        }
        self.mutate("addNote")?;
        let id = NoteId(self.fresh_id());
        let card = CardId(self.fresh_id());
        self.card_decks.insert(card, deck.to_string());
        self.notes.insert(
            id,
            StoredNote {
                model: model.to_string(),
                fields: fields.clone(),
                tags: tags.to_vec(),
                cards: vec![card],
            },
        );
        Ok(id)
    }

    async fn update_note(
        &mut self,
        id: NoteId,
        fields: &NoteFields,
        tags: &[String],
    ) -> Fallible<()> {
        if !self.notes.contains_key(&id) {
            return Err(ErrorReport::remote(format!("note was not found: {id}")));
        }
        self.mutate("updateNote")?;
        if let Some(note) = self.notes.get_mut(&id) {
            note.fields = fields.clone();
            note.tags = tags.to_vec();
        }
        Ok(())
    }

    async fn change_deck(&mut self, cards: &[CardId], deck: &str) -> Fallible<()> {
        self.mutate("changeDeck")?;
        self.insert_deck(deck);
        for card in cards {
            self.card_decks.insert(*card, deck.to_string());
        }
        Ok(())
    }

    async fn delete_notes(&mut self, ids: &[NoteId]) -> Fallible<()> {
        self.mutate("deleteNotes")?;
        for id in ids {
            if let Some(note) = self.notes.remove(id) {
                for card in note.cards {
                    self.card_decks.remove(&card);
                }
            }
        }
        Ok(())
    }

    async fn create_deck(&mut self, deck: &str) -> Fallible<()> {
        self.mutate("createDeck")?;
        self.insert_deck(deck);
        Ok(())
    }

    async fn decks_for_cards(
        &mut self,
        cards: &[CardId],
    ) -> Fallible<BTreeMap<DeckName, Vec<CardId>>> {
        let mut decks: BTreeMap<DeckName, Vec<CardId>> = BTreeMap::new();
        for card in cards {
            if let Some(deck) = self.card_decks.get(card) {
                decks.entry(deck.clone()).or_default().push(*card);
            }
        }
        Ok(decks)
    }

    async fn deck_names(&mut self) -> Fallible<Vec<DeckName>> {
        Ok(self.decks.iter().cloned().collect())
    }

    async fn remove_decks(&mut self, decks: &[DeckName]) -> Fallible<()> {
        self.mutate("deleteDecks")?;
        for deck in decks {
            self.decks.retain(|d| !is_within_deck(d, deck));
            let doomed: Vec<NoteId> = self
                .notes
                .iter()
                .filter(|(_, note)| {
                    note.cards.iter().any(|card| {
                        self.card_decks
                            .get(card)
                            .is_some_and(|d| is_within_deck(d, deck))
                    })
                })
                .map(|(id, _)| *id)
                .collect();
            for id in doomed {
                if let Some(note) = self.notes.remove(&id) {
                    for card in note.cards {
                        self.card_decks.remove(&card);
                    }
                }
            }
        }
        Ok(())
    }

    async fn model_names(&mut self) -> Fallible<Vec<ModelName>> {
        Ok(self.models.iter().cloned().collect())
    }

    async fn create_model(&mut self, model: &ModelSpec) -> Fallible<()> {
        self.mutate("createModel")?;
        self.models.insert(model.name.clone());
        Ok(())
    }
}
