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

use serde::Serialize;

use crate::types::aliases::ModelName;
use crate::types::shape::CardShape;

pub const FRONT_FIELD: &str = "Front";
pub const BACK_FIELD: &str = "Back";

const CSS: &str = ".card {
  font-family: sans-serif;
  font-size: 20px;
  text-align: left;
  color: black;
  background-color: white;
}
.cloze {
  font-weight: bold;
  color: blue;
}";

/// One card template of a note model.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CardTemplate {
    pub name: String,
    pub front: String,
    pub back: String,
}

/// Everything the remote store needs to create a note model.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelSpec {
    pub name: ModelName,
    pub is_cloze: bool,
    pub fields: Vec<String>,
    pub templates: Vec<CardTemplate>,
    pub css: String,
}

fn template(name: &str, front: &str, back: &str) -> CardTemplate {
    CardTemplate {
        name: name.to_string(),
        front: front.to_string(),
        back: back.to_string(),
    }
}

impl ModelSpec {
    pub fn for_shape(shape: CardShape, prefix: &str) -> Self {
        let forward = template(
            "Card 1",
            "{{Front}}",
            "{{FrontSide}}\n\n<hr id=answer>\n\n{{Back}}",
        );
        let templates = match shape {
            CardShape::Basic => vec![forward],
            CardShape::BasicReversed => vec![
                forward,
                template(
                    "Card 2",
                    "{{Back}}",
                    "{{FrontSide}}\n\n<hr id=answer>\n\n{{Front}}",
                ),
            ],
            CardShape::BasicTypeAnswer => vec![template(
                "Card 1",
                "{{Front}}\n\n{{type:Back}}",
                "{{Front}}\n\n<hr id=answer>\n\n{{type:Back}}",
            )],
            CardShape::Cloze => vec![template("Cloze", "{{cloze:Front}}", "{{cloze:Front}}")],
        };
        ModelSpec {
            name: shape.model_name(prefix),
            is_cloze: shape == CardShape::Cloze,
            fields: vec![FRONT_FIELD.to_string(), BACK_FIELD.to_string()],
            templates,
            css: CSS.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversed_has_two_templates() {
        let spec = ModelSpec::for_shape(CardShape::BasicReversed, "P ");
        assert_eq!(spec.name, "P Basic (and reversed card)");
        assert_eq!(spec.templates.len(), 2);
        assert!(!spec.is_cloze);
    }

    #[test]
    fn test_cloze_model() {
        let spec = ModelSpec::for_shape(CardShape::Cloze, "P ");
        assert!(spec.is_cloze);
        assert!(spec.templates[0].front.contains("{{cloze:Front}}"));
    }
}
