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

use serde::Deserialize;
use serde::Serialize;

use crate::types::aliases::ModelName;

/// The four card shapes a document can compile to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardShape {
    Basic,
    BasicReversed,
    BasicTypeAnswer,
    Cloze,
}

impl CardShape {
    pub const ALL: [CardShape; 4] = [
        CardShape::Basic,
        CardShape::BasicReversed,
        CardShape::BasicTypeAnswer,
        CardShape::Cloze,
    ];

    /// The fixed display string appended to the model prefix.
    pub fn label(self) -> &'static str {
        match self {
            CardShape::Basic => "Basic",
            CardShape::BasicReversed => "Basic (and reversed card)",
            CardShape::BasicTypeAnswer => "Basic (type in the answer)",
            CardShape::Cloze => "Cloze",
        }
    }

    pub fn model_name(self, prefix: &str) -> ModelName {
        format!("{prefix}{}", self.label())
    }

    /// Recover the shape from a model name, given the prefix it was built
    /// with.
    pub fn from_model_name(prefix: &str, name: &str) -> Option<CardShape> {
        let label = name.strip_prefix(prefix)?;
        CardShape::ALL.into_iter().find(|shape| shape.label() == label)
    }
}

impl Display for CardShape {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_name() {
        assert_eq!(
            CardShape::BasicTypeAnswer.model_name("Deckmark - "),
            "Deckmark - Basic (type in the answer)"
        );
    }

    #[test]
    fn test_from_model_name() {
        for shape in CardShape::ALL {
            let name = shape.model_name("X ");
            assert_eq!(CardShape::from_model_name("X ", &name), Some(shape));
        }
        assert_eq!(CardShape::from_model_name("X ", "Y Basic"), None);
    }
}
