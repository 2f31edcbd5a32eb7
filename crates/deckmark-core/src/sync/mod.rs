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


//! Pushing compiled notes to a remote flashcard store.

pub mod memory;
pub mod reconcile;
pub mod report;
pub mod store;

pub use reconcile::SyncOptions;
pub use reconcile::sync_notes;
pub use report::SyncAction;
pub use report::SyncReport;
pub use report::SyncedNote;
pub use store::NoteStore;
