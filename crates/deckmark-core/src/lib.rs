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


//! deckmark-core: compile Markdown notes into flashcards and push them to a
//! remote store.
//!
//! The pipeline runs in this order:
//! - `reference` rewrites wiki-style references into plain Markdown links
//! - `ast` parses the document and its metadata block into a tree
//! - `classify` decides the card shape
//! - `split` cuts the tree into front and back fields
//! - `compile` renders the fields and assembles the [`Note`]
//!
//! `deck` infers deck names from file paths and `sync` reconciles a batch of
//! notes with a [`NoteStore`].

pub mod ast;
pub mod classify;
pub mod compile;
pub mod deck;
pub mod error;
pub mod frontmatter;
pub mod markdown;
pub mod model;
pub mod reference;
pub mod split;
pub mod sync;
pub mod types;

// Re-exports for convenience
pub use compile::{NoteContext, compile_note};
pub use deck::{DeckMode, infer_deck_names};
pub use error::{ErrorKind, ErrorReport, Fallible};
pub use sync::{NoteStore, SyncAction, SyncOptions, SyncReport, sync_notes};
pub use types::note::{Identity, Note, NoteId};
pub use types::shape::CardShape;
