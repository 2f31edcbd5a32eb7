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

use std::fmt::Display;
use std::fmt::Formatter;
use std::time::Duration;

use serde::Serialize;
use serde::Serializer;

use crate::types::aliases::DeckName;
use crate::types::aliases::Namespace;
use crate::types::note::Note;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Created,
    Updated,
    Deleted,
    Recreated,
    Unchanged,
}

impl SyncAction {
    pub const ALL: [SyncAction; 5] = [
        SyncAction::Created,
        SyncAction::Updated,
        SyncAction::Deleted,
        SyncAction::Recreated,
        SyncAction::Unchanged,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SyncAction::Created => "created",
            SyncAction::Updated => "updated",
            SyncAction::Deleted => "deleted",
            SyncAction::Recreated => "recreated",
            SyncAction::Unchanged => "unchanged",
        }
    }
}

impl Display for SyncAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A note together with what happened to it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SyncedNote {
    pub action: SyncAction,
    pub note: Note,
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// The outcome of one reconciler run.
#[derive(Clone, Debug, Serialize)]
pub struct SyncReport {
    pub namespace: Namespace,
    pub dry_run: bool,
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
    pub synced: Vec<SyncedNote>,
    pub deleted_decks: Vec<DeckName>,
}

impl SyncReport {
    /// Number of notes per action, in [`SyncAction::ALL`] order.
    pub fn counts(&self) -> Vec<(SyncAction, usize)> {
        SyncAction::ALL
            .iter()
            .map(|action| (*action, self.count(*action)))
            .collect()
    }

    pub fn count(&self, action: SyncAction) -> usize {
        self.synced.iter().filter(|s| s.action == action).count()
    }

    /// True if the run changed, or would change, anything.
    pub fn has_changes(&self) -> bool {
        !self.deleted_decks.is_empty()
            || self.synced.iter().any(|s| s.action != SyncAction::Unchanged)
    }
}

impl Display for SyncReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for synced in &self.synced {
            if synced.action == SyncAction::Unchanged {
                continue;
            }
            let origin = match &synced.note.source_path {
                Some(path) => path.display().to_string(),
                None => format!("[{}]", synced.note.deck),
            };
            writeln!(f, "{:>9}  {origin}", synced.action.as_str())?;
        }
        let counts: Vec<String> = self
            .counts()
            .into_iter()
            .map(|(action, n)| format!("{n} {action}"))
            .collect();
        writeln!(f, "Namespace {}: {}.", self.namespace, counts.join(", "))?;
        if !self.has_changes() {
            writeln!(f, "Everything is up to date.")?;
        }
        for deck in &self.deleted_decks {
            writeln!(f, "Removed deck: {deck}")?;
        }
        write!(f, "Finished in {}ms.", self.duration.as_millis())?;
        if self.dry_run {
            write!(f, " (dry run, nothing was changed)")?;
        }
        Ok(())
    }
}
