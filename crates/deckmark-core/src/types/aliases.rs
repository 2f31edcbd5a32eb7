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


/// A `::`-delimited hierarchical deck label, e.g. `Spanish::Verbs`.
pub type DeckName = String;

/// The label that scopes a run to a subset of remote notes.
pub type Namespace = String;

/// The name of a remote note model, e.g. `Deckmark - Basic`.
pub type ModelName = String;

/// The separator between levels of a deck hierarchy.
pub const DECK_SEPARATOR: &str = "::";

/// The deck every remote collection starts with. Never pruned.
pub const BUILTIN_DECK: &str = "Default";

/// True if `deck` is `parent` or one of its subdecks.
pub fn is_within_deck(deck: &str, parent: &str) -> bool {
    deck == parent
        || deck
            .strip_prefix(parent)
            .is_some_and(|rest| rest.starts_with(DECK_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_within_deck() {
        assert!(is_within_deck("A", "A"));
        assert!(is_within_deck("A::B", "A"));
        assert!(!is_within_deck("AB", "A"));
        assert!(!is_within_deck("A", "A::B"));
    }
}
