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


use std::fs::read_to_string;
use std::path::Path;

use deckmark_core::deck::DeckMode;
use deckmark_core::error::ErrorKind;
use deckmark_core::error::ErrorReport;
use deckmark_core::error::Fallible;
use log::debug;
use serde::Deserialize;

/// Name of the optional configuration file at the collection root.
pub const CONFIG_FILE: &str = "deckmark.toml";

pub const DEFAULT_NAMESPACE: &str = "Deckmark";
pub const DEFAULT_DECK: &str = "Deckmark";
pub const DEFAULT_MODEL_PREFIX: &str = "Deckmark - ";
pub const DEFAULT_ANKI_URL: &str = "http://127.0.0.1:8765";

/// The contents of `deckmark.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    namespace: Option<String>,
    default_deck: Option<String>,
    model_prefix: Option<String>,
    anki_url: Option<String>,
    deck_mode: Option<DeckMode>,
}

/// Values given on the command line. They win over the file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub namespace: Option<String>,
    pub default_deck: Option<String>,
    pub anki_url: Option<String>,
    pub deck_mode: Option<DeckMode>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub namespace: String,
    pub default_deck: String,
    pub model_prefix: String,
    pub anki_url: String,
    pub deck_mode: DeckMode,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_deck: DEFAULT_DECK.to_string(),
            model_prefix: DEFAULT_MODEL_PREFIX.to_string(),
            anki_url: DEFAULT_ANKI_URL.to_string(),
            deck_mode: DeckMode::default(),
        }
    }
}

impl Config {
    /// Load the configuration for the collection at `root`, falling back to
    /// the defaults when there is no configuration file.
    pub fn load(root: &Path) -> Fallible<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Config::default());
        }
        debug!("Reading configuration from {}", path.display());
        let text = read_to_string(&path)?;
        Self::parse(&text).map_err(|e| e.context(path.display()))
    }

    fn parse(text: &str) -> Fallible<Self> {
        let file: ConfigFile = toml::from_str(text).map_err(|e| {
            ErrorReport::new(ErrorKind::Configuration, format!("invalid configuration: {e}"))
        })?;
        let defaults = Config::default();
        Ok(Config {
            namespace: file.namespace.unwrap_or(defaults.namespace),
            default_deck: file.default_deck.unwrap_or(defaults.default_deck),
            model_prefix: file.model_prefix.unwrap_or(defaults.model_prefix),
            anki_url: file.anki_url.unwrap_or(defaults.anki_url),
            deck_mode: file.deck_mode.unwrap_or(defaults.deck_mode),
        })
    }

    pub fn with_overrides(self, overrides: Overrides) -> Self {
        Config {
            namespace: overrides.namespace.unwrap_or(self.namespace),
            default_deck: overrides.default_deck.unwrap_or(self.default_deck),
            model_prefix: self.model_prefix,
            anki_url: overrides.anki_url.unwrap_or(self.anki_url),
            deck_mode: overrides.deck_mode.unwrap_or(self.deck_mode),
        }
    }
}
