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

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::model::ModelSpec;
use crate::types::aliases::DeckName;
use crate::types::aliases::ModelName;
use crate::types::aliases::Namespace;
use crate::types::note::CardId;
use crate::types::note::Identity;
use crate::types::note::Note;
use crate::types::note::NoteId;

/// Every note a run manages carries exactly one tag with this prefix.
pub const NAMESPACE_TAG_PREFIX: &str = "deckmark-namespace::";

/// The two fields every model has.
#[derive(Clone, Debug, PartialEq)]
pub struct NoteFields {
    pub front: String,
    pub back: String,
}

/// Which notes to find.
#[derive(Clone, Debug, PartialEq)]
pub enum NoteQuery {
    /// Notes carrying this namespace tag.
    Namespace(String),
    /// Notes with a card in this deck or any of its subdecks.
    Deck(DeckName),
}

/// A note as the remote store reports it.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteNoteInfo {
    pub id: NoteId,
    pub model: ModelName,
    pub fields: NoteFields,
    /// All tags, including the namespace tag.
    pub tags: Vec<String>,
    pub cards: Vec<CardId>,
}

/// The remote flashcard store.
///
/// Calls are awaited one at a time; implementations need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait NoteStore {
    async fn find_notes(&mut self, query: &NoteQuery) -> Fallible<Vec<NoteId>>;

    /// One entry per requested id, `None` where the store has no such note.
    async fn notes_info(&mut self, ids: &[NoteId]) -> Fallible<Vec<Option<RemoteNoteInfo>>>;

    async fn add_note(
        &mut self,
        model: &str,
        deck: &str,
        fields: &NoteFields,
        tags: &[String],
    ) -> Fallible<NoteId>;

    /// Replace a note's fields and tags.
    async fn update_note(&mut self, id: NoteId, fields: &NoteFields, tags: &[String])
    -> Fallible<()>;

    async fn change_deck(&mut self, cards: &[CardId], deck: &str) -> Fallible<()>;

    async fn delete_notes(&mut self, ids: &[NoteId]) -> Fallible<()>;

    async fn create_deck(&mut self, deck: &str) -> Fallible<()>;

    /// The decks holding the given cards, each with the subset of cards in it.
    async fn decks_for_cards(
        &mut self,
        cards: &[CardId],
    ) -> Fallible<BTreeMap<DeckName, Vec<CardId>>>;

    async fn deck_names(&mut self) -> Fallible<Vec<DeckName>>;

    /// Remove decks along with their subdecks and cards.
    async fn remove_decks(&mut self, decks: &[DeckName]) -> Fallible<()>;

    async fn model_names(&mut self) -> Fallible<Vec<ModelName>>;

    async fn create_model(&mut self, model: &ModelSpec) -> Fallible<()>;
}

/// Check a namespace and return it trimmed.
pub fn validate_namespace(namespace: &str) -> Fallible<Namespace> {
    let trimmed = namespace.trim();
    if trimmed.is_empty() {
        return Err(ErrorReport::validation("Namespace must not be empty."));
    }
    if trimmed.contains('*') || trimmed.contains(':') {
        return Err(ErrorReport::validation(format!(
            "Namespace '{trimmed}' must not contain '*' or ':'."
        )));
    }
    Ok(trimmed.to_string())
}

/// The tag that marks a note as belonging to `namespace`.
pub fn namespace_tag(namespace: &str) -> String {
    let words: Vec<&str> = namespace.split_whitespace().collect();
    format!("{NAMESPACE_TAG_PREFIX}{}", words.join("_"))
}

/// The tags to send for a local note: its own tags plus the namespace tag.
pub fn remote_tags(note: &Note) -> Vec<String> {
    let mut tags = note.tags.clone();
    tags.push(namespace_tag(&note.namespace));
    tags
}

/// Split the namespace tag out of a remote tag list.
fn split_namespace(tags: Vec<String>) -> (Namespace, Vec<String>) {
    let mut namespace = String::new();
    let mut rest = Vec::with_capacity(tags.len());
    for tag in tags {
        match tag.strip_prefix(NAMESPACE_TAG_PREFIX) {
            Some(ns) if namespace.is_empty() => namespace = ns.to_string(),
            _ => rest.push(tag),
        }
    }
    (namespace, rest)
}

/// True if both namespaces map to the same tag.
pub fn same_namespace(a: &str, b: &str) -> bool {
    namespace_tag(a) == namespace_tag(b)
}

/// The single deck holding all of a note's cards.
fn deck_of(
    id: NoteId,
    cards: &[CardId],
    card_decks: &BTreeMap<CardId, DeckName>,
) -> Fallible<DeckName> {
    let decks: BTreeSet<&DeckName> = cards.iter().filter_map(|c| card_decks.get(c)).collect();
    match decks.len() {
        0 if cards.is_empty() => Ok(DeckName::new()),
        1 => Ok(decks.into_iter().next().cloned().unwrap_or_default()),
        0 => Err(ErrorReport::consistency(format!(
            "Cards of note {id} are not in any deck."
        ))),
        _ => Err(ErrorReport::consistency(format!(
            "Cards of note {id} are spread over several decks: {}.",
            decks
                .into_iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// Turn raw remote notes into [`Note`]s, resolving each one's deck.
pub async fn resolve_notes<S: NoteStore>(
    store: &mut S,
    infos: Vec<RemoteNoteInfo>,
) -> Fallible<Vec<Note>> {
    let all_cards: Vec<CardId> = infos.iter().flat_map(|i| i.cards.iter().copied()).collect();
    let mut card_decks: BTreeMap<CardId, DeckName> = BTreeMap::new();
    if !all_cards.is_empty() {
        for (deck, cards) in store.decks_for_cards(&all_cards).await? {
            for card in cards {
                card_decks.insert(card, deck.clone());
            }
        }
    }
    infos
        .into_iter()
        .map(|info| {
            let deck = deck_of(info.id, &info.cards, &card_decks)?;
            let (namespace, tags) = split_namespace(info.tags);
            Ok(Note {
                id: Identity::Remote(info.id),
                model: info.model,
                front: info.fields.front,
                back: info.fields.back,
                deck,
                tags,
                namespace,
                cards: Some(info.cards),
                source_path: None,
            })
        })
        .collect()
}

/// Fetch every remote note in a namespace.
pub async fn fetch_namespace_notes<S: NoteStore>(
    store: &mut S,
    namespace: &str,
) -> Fallible<Vec<Note>> {
    let ids = store
        .find_notes(&NoteQuery::Namespace(namespace_tag(namespace)))
        .await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let infos: Vec<RemoteNoteInfo> = store.notes_info(&ids).await?.into_iter().flatten().collect();
    resolve_notes(store, infos).await
}
