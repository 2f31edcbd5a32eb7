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


use std::collections::BTreeSet;
use std::fmt::Display;
use std::fmt::Formatter;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::types::aliases::DeckName;
use crate::types::aliases::ModelName;
use crate::types::aliases::Namespace;

/// A note identifier assigned by the remote store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub u64);

impl Display for NoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A card identifier assigned by the remote store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u64);

/// Whether a note has been committed to the remote store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(into = "Option<NoteId>")]
pub enum Identity {
    /// Never created remotely, or the prior identifier was discarded.
    #[default]
    New,
    /// Created remotely under this identifier.
    Remote(NoteId),
}

impl Identity {
    pub fn remote_id(self) -> Option<NoteId> {
        match self {
            Identity::New => None,
            Identity::Remote(id) => Some(id),
        }
    }
}

impl From<Option<NoteId>> for Identity {
    fn from(value: Option<NoteId>) -> Self {
        match value {
            Some(id) => Identity::Remote(id),
            None => Identity::New,
        }
    }
}

impl From<Identity> for Option<NoteId> {
    fn from(value: Identity) -> Self {
        value.remote_id()
    }
}

/// The unit synchronized with the remote store.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Note {
    pub id: Identity,
    pub model: ModelName,
    pub front: String,
    pub back: String,
    pub deck: DeckName,
    pub tags: Vec<String>,
    pub namespace: Namespace,
    /// Card identifiers, only ever populated from remote data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<CardId>>,
    /// The file this note was compiled from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
}

impl Note {
    /// True if both notes carry the same tags, ignoring order and repeats.
    pub fn same_tags(&self, other: &Note) -> bool {
        let ours: BTreeSet<&str> = self.tags.iter().map(String::as_str).collect();
        let theirs: BTreeSet<&str> = other.tags.iter().map(String::as_str).collect();
        ours == theirs
    }

    /// True if the fields or tags differ, i.e. an `update_note` call is due.
    pub fn content_differs(&self, other: &Note) -> bool {
        self.front != other.front || self.back != other.back || !self.same_tags(other)
    }
}

/// Split tags on whitespace, since a remote tag cannot contain any, then drop
/// repeats, keeping first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = BTreeSet::new();
    let mut result = Vec::new();
    for entry in tags {
        for tag in entry.as_ref().split_whitespace() {
            if seen.insert(tag.to_string()) {
                result.push(tag.to_string());
            }
        }
    }
    result
}
