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


use std::env::current_dir;
use std::fs::read_to_string;
use std::path::Path;
use std::path::PathBuf;

use deckmark_core::compile::NoteContext;
use deckmark_core::compile::compile_note;
use deckmark_core::deck::DeckMode;
use deckmark_core::deck::infer_deck_names;
use deckmark_core::error::ErrorKind;
use deckmark_core::error::ErrorReport;
use deckmark_core::error::Fallible;
use deckmark_core::types::note::Note;
use log::debug;
use log::warn;
use walkdir::DirEntry;
use walkdir::WalkDir;

use crate::config::Config;

/// A document that could not be compiled.
#[derive(Debug)]
pub struct Failure {
    pub path: PathBuf,
    pub error: ErrorReport,
}

/// The result of compiling every document in a collection.
#[derive(Debug, Default)]
pub struct Collection {
    pub notes: Vec<Note>,
    pub failures: Vec<Failure>,
}

/// Resolve the collection directory. By default, the current working
/// directory is used.
pub fn collection_root(directory: Option<String>) -> Fallible<PathBuf> {
    let directory = match directory {
        Some(dir) => PathBuf::from(dir),
        None => current_dir()?,
    };
    if !directory.is_dir() {
        return Err(ErrorReport::new(
            ErrorKind::Configuration,
            format!("Not a directory: {}", directory.display()),
        ));
    }
    Ok(directory.canonicalize()?)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Every Markdown file under `root`, skipping hidden directories, sorted.
pub fn find_documents(root: &Path) -> Fallible<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_entry(|e| !is_hidden(e)) {
        let entry = entry.map_err(|e| ErrorReport::new(ErrorKind::Io, e.to_string()))?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
            paths.push(path.to_path_buf());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Compile every document under `root`. A document that fails is recorded
/// and does not stop the others.
pub fn compile_collection(root: &Path, config: &Config) -> Fallible<Collection> {
    let paths = find_documents(root)?;
    if config.deck_mode != DeckMode::Common {
        warn!(
            "Deck mode {} is best-effort: directories sharing a name are treated as one deck",
            config.deck_mode
        );
    }
    let decks = infer_deck_names(&paths, config.deck_mode);
    let mut collection = Collection::default();
    for (path, deck) in paths.into_iter().zip(decks) {
        let text = read_to_string(&path)?;
        let context = NoteContext {
            namespace: config.namespace.clone(),
            model_prefix: config.model_prefix.clone(),
            inferred_deck: Some(deck),
            default_deck: config.default_deck.clone(),
            source_path: Some(path.clone()),
        };
        match compile_note(&text, &context) {
            Ok(note) => collection.notes.push(note),
            Err(error) => {
                debug!("Failed to compile {}: {error}", path.display());
                collection.failures.push(Failure { path, error });
            }
        }
    }
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use std::fs::create_dir_all;
    use std::fs::write;

    use deckmark_core::types::note::Identity;
    use deckmark_core::types::note::NoteId;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_find_documents_skips_hidden_and_other_files() -> Fallible<()> {
        let dir = tempdir()?;
        let root = dir.path();
        create_dir_all(root.join("b"))?;
        create_dir_all(root.join(".obsidian"))?;
        write(root.join("b/two.md"), "two")?;
        write(root.join("a.md"), "one")?;
        write(root.join("notes.txt"), "skip")?;
        write(root.join(".obsidian/hidden.md"), "skip")?;
        let paths = find_documents(root)?;
        assert_eq!(paths, vec![root.join("a.md"), root.join("b/two.md")]);
        Ok(())
    }

    #[test]
    fn test_compile_collection() -> Fallible<()> {
        let dir = tempdir()?;
        let root = dir.path().canonicalize()?;
        create_dir_all(root.join("spanish/verbs"))?;
        write(root.join("spanish/hola.md"), "hola\n\n---\n\nhello")?;
        write(
            root.join("spanish/verbs/ser.md"),
            "---\nnoteId: 7\ntags: verb\n---\nser\n\n---\n\nto be",
        )?;
        write(root.join("spanish/broken.md"), "---\ntags: [\n---\nx")?;
        let collection = compile_collection(&root, &Config::default())?;

        assert_eq!(collection.failures.len(), 1);
        assert!(collection.failures[0].path.ends_with("broken.md"));
        assert_eq!(collection.failures[0].error.kind(), ErrorKind::ParseFailure);

        assert_eq!(collection.notes.len(), 2);
        let hola = &collection.notes[0];
        assert_eq!(hola.deck, "spanish");
        assert_eq!(hola.namespace, "Deckmark");
        let ser = &collection.notes[1];
        assert_eq!(ser.deck, "spanish::verbs");
        assert_eq!(ser.id, Identity::Remote(NoteId(7)));
        assert_eq!(ser.tags, vec!["verb"]);
        Ok(())
    }

    #[test]
    fn test_collection_root_rejects_files() -> Fallible<()> {
        let dir = tempdir()?;
        let file = dir.path().join("a.md");
        write(&file, "x")?;
        let err = collection_root(Some(file.display().to_string())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        Ok(())
    }
}
