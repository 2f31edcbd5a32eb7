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


//! A [`NoteStore`] backed by a running Anki instance, through the
//! AnkiConnect add-on's JSON-over-HTTP API.

use std::collections::BTreeMap;

use deckmark_core::error::ErrorReport;
use deckmark_core::error::Fallible;
use deckmark_core::model::BACK_FIELD;
use deckmark_core::model::FRONT_FIELD;
use deckmark_core::model::ModelSpec;
use deckmark_core::sync::store::NoteFields;
use deckmark_core::sync::store::NoteQuery;
use deckmark_core::sync::store::NoteStore;
use deckmark_core::sync::store::RemoteNoteInfo;
use deckmark_core::types::aliases::DeckName;
use deckmark_core::types::aliases::ModelName;
use deckmark_core::types::note::CardId;
use deckmark_core::types::note::NoteId;
use log::debug;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::json;

const API_VERSION: u8 = 6;

#[derive(Debug, Serialize)]
struct Request<'a, P: Serialize> {
    action: &'a str,
    version: u8,
    params: P,
}

#[derive(Debug, Deserialize)]
struct Response<T> {
    result: Option<T>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FieldValue {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteInfo {
    note_id: NoteId,
    model_name: ModelName,
    tags: Vec<String>,
    fields: BTreeMap<String, FieldValue>,
    cards: Vec<CardId>,
}

impl NoteInfo {
    fn field(&mut self, name: &str) -> String {
        self.fields
            .remove(name)
            .map(|field| field.value)
            .unwrap_or_default()
    }

    fn into_remote(mut self) -> RemoteNoteInfo {
        let fields = NoteFields {
            front: self.field(FRONT_FIELD),
            back: self.field(BACK_FIELD),
        };
        RemoteNoteInfo {
            id: self.note_id,
            model: self.model_name,
            fields,
            tags: self.tags,
            cards: self.cards,
        }
    }
}

/// AnkiConnect answers `{}` for ids it does not know.
fn decode_note_info(value: Value) -> Fallible<Option<RemoteNoteInfo>> {
    if value.as_object().is_some_and(|o| o.is_empty()) {
        return Ok(None);
    }
    let info: NoteInfo = serde_json::from_value(value)
        .map_err(|e| ErrorReport::remote(format!("notesInfo returned a malformed note: {e}")))?;
    Ok(Some(info.into_remote()))
}

/// Quote a term for Anki's search syntax. `_` and `*` are wildcards there.
fn search_term(key: &str, value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '*' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("\"{key}:{escaped}\"")
}

fn query_string(query: &NoteQuery) -> String {
    match query {
        NoteQuery::Namespace(tag) => search_term("tag", tag),
        NoteQuery::Deck(deck) => search_term("deck", deck),
    }
}

fn fields_json(fields: &NoteFields) -> Value {
    json!({
        FRONT_FIELD: fields.front,
        BACK_FIELD: fields.back,
    })
}

pub struct AnkiConnect {
    url: String,
    client: reqwest::Client,
}

impl AnkiConnect {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn call<P: Serialize, T: DeserializeOwned>(
        &self,
        action: &str,
        params: P,
    ) -> Fallible<Option<T>> {
        debug!("AnkiConnect: {action}");
        let request = Request {
            action,
            version: API_VERSION,
            params,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ErrorReport::remote(format!(
                    "{action} failed: could not reach AnkiConnect at {}: {e}",
                    self.url
                ))
            })?;
        if !response.status().is_success() {
            return Err(ErrorReport::remote(format!(
                "{action} failed: HTTP {}",
                response.status()
            )));
        }
        let body: Response<T> = response
            .json()
            .await
            .map_err(|e| ErrorReport::remote(format!("{action} failed: bad response: {e}")))?;
        match body.error {
            Some(error) => Err(ErrorReport::remote(format!("{action} failed: {error}"))),
            None => Ok(body.result),
        }
    }

    /// Call an action whose result is needed.
    async fn invoke<P: Serialize, T: DeserializeOwned>(&self, action: &str, params: P) -> Fallible<T> {
        self.call(action, params)
            .await?
            .ok_or_else(|| ErrorReport::remote(format!("{action} failed: empty result")))
    }

    /// Call an action for its effect only.
    async fn execute<P: Serialize>(&self, action: &str, params: P) -> Fallible<()> {
        self.call::<P, Value>(action, params).await?;
        Ok(())
    }
}

impl NoteStore for AnkiConnect {
    async fn find_notes(&mut self, query: &NoteQuery) -> Fallible<Vec<NoteId>> {
        self.invoke("findNotes", json!({ "query": query_string(query) }))
            .await
    }

    async fn notes_info(&mut self, ids: &[NoteId]) -> Fallible<Vec<Option<RemoteNoteInfo>>> {
        let values: Vec<Value> = self.invoke("notesInfo", json!({ "notes": ids })).await?;
        values.into_iter().map(decode_note_info).collect()
    }

    async fn add_note(
        &mut self,
        model: &str,
        deck: &str,
        fields: &NoteFields,
        tags: &[String],
    ) -> Fallible<NoteId> {
        let params = json!({
            "note": {
                "deckName": deck,
                "modelName": model,
                "fields": fields_json(fields),
                "tags": tags,
                "options": { "allowDuplicate": true },
            }
        });
        self.invoke("addNote", params).await
    }

    async fn update_note(
        &mut self,
        id: NoteId,
        fields: &NoteFields,
        tags: &[String],
    ) -> Fallible<()> {
        let params = json!({
            "note": {
                "id": id,
                "fields": fields_json(fields),
                "tags": tags,
            }
        });
        self.execute("updateNote", params).await
    }

    async fn change_deck(&mut self, cards: &[CardId], deck: &str) -> Fallible<()> {
        self.execute("changeDeck", json!({ "cards": cards, "deck": deck }))
            .await
    }

    async fn delete_notes(&mut self, ids: &[NoteId]) -> Fallible<()> {
        self.execute("deleteNotes", json!({ "notes": ids })).await
    }

    async fn create_deck(&mut self, deck: &str) -> Fallible<()> {
        self.execute("createDeck", json!({ "deck": deck })).await
    }

    async fn decks_for_cards(
        &mut self,
        cards: &[CardId],
    ) -> Fallible<BTreeMap<DeckName, Vec<CardId>>> {
        self.invoke("getDecks", json!({ "cards": cards })).await
    }

    async fn deck_names(&mut self) -> Fallible<Vec<DeckName>> {
        self.invoke("deckNames", json!({})).await
    }

    async fn remove_decks(&mut self, decks: &[DeckName]) -> Fallible<()> {
        self.execute("deleteDecks", json!({ "decks": decks, "cardsToo": true }))
            .await
    }

    async fn model_names(&mut self) -> Fallible<Vec<ModelName>> {
        self.invoke("modelNames", json!({})).await
    }

    async fn create_model(&mut self, model: &ModelSpec) -> Fallible<()> {
        let templates: Vec<Value> = model
            .templates
            .iter()
            .map(|t| json!({ "Name": t.name, "Front": t.front, "Back": t.back }))
            .collect();
        let params = json!({
            "modelName": model.name,
            "inOrderFields": model.fields,
            "css": model.css,
            "isCloze": model.is_cloze,
            "cardTemplates": templates,
        });
        self.execute("createModel", params).await
    }
}

#[cfg(test)]
mod tests {
    use deckmark_core::error::ErrorKind;
    use deckmark_core::sync::store::namespace_tag;

    use super::*;

    #[test]
    fn test_request_envelope() -> Fallible<()> {
        let request = Request {
            action: "deckNames",
            version: API_VERSION,
            params: json!({}),
        };
        assert_eq!(
            serde_json::to_value(&request)?,
            json!({ "action": "deckNames", "version": 6, "params": {} })
        );
        Ok(())
    }

    #[test]
    fn test_decode_note_info() -> Fallible<()> {
        let value = json!({
            "noteId": 1502298033753u64,
            "modelName": "Deckmark - Basic",
            "tags": ["a", "deckmark-namespace::Test"],
            "fields": {
                "Front": { "value": "<p>front</p>", "order": 0 },
                "Back": { "value": "<p>back</p>", "order": 1 }
            },
            "cards": [1498938915662u64]
        });
        let Some(info) = decode_note_info(value)? else {
            panic!("expected a note");
        };
        assert_eq!(info.id, NoteId(1502298033753));
        assert_eq!(info.fields.front, "<p>front</p>");
        assert_eq!(info.fields.back, "<p>back</p>");
        assert_eq!(info.cards, vec![CardId(1498938915662)]);
        Ok(())
    }

    #[test]
    fn test_unknown_note_decodes_as_none() -> Fallible<()> {
        assert_eq!(decode_note_info(json!({}))?, None);
        Ok(())
    }

    #[test]
    fn test_malformed_note_is_an_error() {
        let err = decode_note_info(json!({ "noteId": "x" })).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteOperationFailure);
    }

    #[test]
    fn test_query_escapes_wildcards() {
        let query = NoteQuery::Namespace(namespace_tag("My Notes"));
        assert_eq!(
            query_string(&query),
            r#""tag:deckmark-namespace::My\_Notes""#
        );
        let query = NoteQuery::Deck("Lang::Spanish*".to_string());
        assert_eq!(query_string(&query), r#""deck:Lang::Spanish\*""#);
    }

    #[test]
    fn test_error_response() -> Result<(), serde_json::Error> {
        let response: Response<Value> =
            serde_json::from_value(json!({ "result": null, "error": "deck was not found" }))?;
        assert_eq!(response.error.as_deref(), Some("deck was not found"));
        assert!(response.result.is_none());
        Ok(())
    }
}
