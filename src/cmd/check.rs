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


use deckmark_core::error::ErrorReport;
use deckmark_core::error::Fallible;

use crate::collection::Collection;
use crate::collection::collection_root;
use crate::collection::compile_collection;
use crate::config::Config;

/// Turn a collection with failures into one error that lists them all.
pub fn ensure_compiled(collection: &Collection) -> Fallible<()> {
    let Some(first) = collection.failures.first() else {
        return Ok(());
    };
    let lines: Vec<String> = collection
        .failures
        .iter()
        .map(|f| format!("  {}: {}", f.path.display(), f.error.message()))
        .collect();
    Err(ErrorReport::new(
        first.error.kind(),
        format!(
            "{} document(s) failed to compile:\n{}",
            collection.failures.len(),
            lines.join("\n")
        ),
    ))
}

/// Compile every document in the collection without contacting Anki.
pub fn check_collection(directory: Option<String>) -> Fallible<()> {
    let root = collection_root(directory)?;
    let config = Config::load(&root)?;
    let collection = compile_collection(&root, &config)?;
    ensure_compiled(&collection)?;
    println!("{} note(s) compiled.", collection.notes.len());
    Ok(())
}
