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


use clap::Parser;
use deckmark_core::deck::DeckMode;
use deckmark_core::error::Fallible;

use crate::cmd::check::check_collection;
use crate::cmd::clean::clean_namespace;
use crate::cmd::list::list_notes;
use crate::cmd::sync::sync_collection;
use crate::config::Overrides;

#[derive(Parser)]
#[command(version, about, long_about = None)]
enum Command {
    /// Compile a collection and push its notes to Anki.
    Sync {
        /// Path to the collection directory. By default, the current working directory is used.
        directory: Option<String>,
        /// Only touch remote notes in this namespace.
        #[arg(long)]
        namespace: Option<String>,
        /// Report what would change without changing anything.
        #[arg(long)]
        dry_run: bool,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
        /// AnkiConnect endpoint. Default is http://127.0.0.1:8765.
        #[arg(long)]
        anki_url: Option<String>,
        /// How to derive deck names from directories: common, walk-stop or walk-jump.
        #[arg(long)]
        deck_mode: Option<DeckMode>,
        /// Deck for notes that name none and sit in no subdirectory.
        #[arg(long)]
        default_deck: Option<String>,
    },
    /// Compile every document and report failures, without contacting Anki.
    Check {
        /// Path to the collection directory. By default, the current working directory is used.
        directory: Option<String>,
    },
    /// List the remote notes of a namespace.
    List {
        /// Path to the collection directory, read for its configuration.
        directory: Option<String>,
        #[arg(long)]
        namespace: Option<String>,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        anki_url: Option<String>,
    },
    /// Delete every remote note of a namespace.
    Clean {
        /// Path to the collection directory, read for its configuration.
        directory: Option<String>,
        #[arg(long)]
        namespace: Option<String>,
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        anki_url: Option<String>,
    },
}

pub async fn entrypoint() -> Fallible<()> {
    let cli: Command = Command::parse();
    match cli {
        Command::Sync {
            directory,
            namespace,
            dry_run,
            json,
            anki_url,
            deck_mode,
            default_deck,
        } => {
            let overrides = Overrides {
                namespace,
                default_deck,
                anki_url,
                deck_mode,
            };
            sync_collection(directory, overrides, dry_run, json).await
        }
        Command::Check { directory } => check_collection(directory),
        Command::List {
            directory,
            namespace,
            json,
            anki_url,
        } => {
            let overrides = Overrides {
                namespace,
                anki_url,
                ..Overrides::default()
            };
            list_notes(directory, overrides, json).await
        }
        Command::Clean {
            directory,
            namespace,
            dry_run,
            json,
            anki_url,
        } => {
            let overrides = Overrides {
                namespace,
                anki_url,
                ..Overrides::default()
            };
            clean_namespace(directory, overrides, dry_run, json).await
        }
    }
}
