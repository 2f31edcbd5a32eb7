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

//! Decide which card shape a document represents.
//!
//! Precedence, first match wins:
//!
//! 1. A deletion before the first separator (or with no separator): cloze.
//! 2. No separator, and the last visible text sits inside an emphasis while
//!    some other visible text exists: type-in-the-answer.
//! 3. A doubled separator: reversed. Anything else: basic.

use crate::ast::Node;
use crate::ast::SyntaxTree;
use crate::types::shape::CardShape;

/// Where the card separators sit among the top-level nodes.
#[derive(Debug, PartialEq)]
pub enum SeparatorLayout {
    /// No separator.
    None,
    /// A single separator at this index.
    Single(usize),
    /// Two separators with no visible text between them.
    Double(usize, usize),
}

pub fn separator_layout(nodes: &[Node]) -> SeparatorLayout {
    let Some(first) = nodes.iter().position(|n| *n == Node::Separator) else {
        return SeparatorLayout::None;
    };
    for (offset, node) in nodes[first + 1..].iter().enumerate() {
        if *node == Node::Separator {
            return SeparatorLayout::Double(first, first + 1 + offset);
        }
        if contains_visible_text(node) {
            break;
        }
    }
    SeparatorLayout::Single(first)
}

fn contains_visible_text(node: &Node) -> bool {
    node.is_visible_text() || node.children().iter().any(contains_visible_text)
}

fn contains_deletion(node: &Node) -> bool {
    matches!(node, Node::Delete(_)) || node.children().iter().any(contains_deletion)
}

/// State gathered by the depth-first scan of visible text.
#[derive(Clone, Debug, Default)]
struct TextScan {
    /// Visible text leaves seen so far.
    visible: usize,
    /// Path to the innermost emphasis around the last visible leaf, if it
    /// was inside one. `None` until a visible leaf is seen.
    last: Option<Option<Vec<usize>>>,
    /// How many consecutive visible leaves ended inside that emphasis.
    run: usize,
}

impl TextScan {
    fn visit(&mut self, nodes: &[Node], path: &mut Vec<usize>, emphasis: Option<&[usize]>) {
        for (index, node) in nodes.iter().enumerate() {
            path.push(index);
            match node {
                Node::Emphasis(children) => {
                    let own = path.clone();
                    self.visit(children, path, Some(own.as_slice()));
                }
                node if node.is_visible_text() => self.leaf(emphasis),
                node => self.visit(node.children(), path, emphasis),
            }
            path.pop();
        }
    }

    fn leaf(&mut self, emphasis: Option<&[usize]>) {
        let continues = emphasis.is_some()
            && matches!(&self.last, Some(last) if last.as_deref() == emphasis);
        self.run = if continues { self.run + 1 } else { 1 };
        self.visible += 1;
        self.last = Some(emphasis.map(<[usize]>::to_vec));
    }
}

/// The child-index path to the emphasis holding the answer, if the document
/// ends in an emphasized answer preceded by a prompt.
pub fn answer_path(nodes: &[Node]) -> Option<Vec<usize>> {
    let mut scan = TextScan::default();
    scan.visit(nodes, &mut Vec::new(), None);
    match scan.last {
        Some(Some(path)) if scan.visible > scan.run => Some(path),
        _ => None,
    }
}

/// Classify a tree. Always yields a shape.
pub fn classify(tree: &SyntaxTree) -> CardShape {
    let nodes = tree.content();
    let layout = separator_layout(nodes);
    let before_separator = match layout {
        SeparatorLayout::None => nodes,
        SeparatorLayout::Single(first) | SeparatorLayout::Double(first, _) => &nodes[..first],
    };
    if before_separator.iter().any(contains_deletion) {
        return CardShape::Cloze;
    }
    match layout {
        SeparatorLayout::None if answer_path(nodes).is_some() => CardShape::BasicTypeAnswer,
        SeparatorLayout::Double(..) => CardShape::BasicReversed,
        _ => CardShape::Basic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build_tree;

    fn shape(markdown: &str) -> CardShape {
        classify(&build_tree(markdown))
    }

    #[test]
    fn test_plain_text_is_basic() {
        assert_eq!(shape("Just a fact."), CardShape::Basic);
        assert_eq!(shape(""), CardShape::Basic);
    }

    #[test]
    fn test_single_separator_is_basic() {
        assert_eq!(shape("Front\n\n---\n\nBack"), CardShape::Basic);
    }

    #[test]
    fn test_double_separator_is_reversed() {
        assert_eq!(shape("Front\n\n---\n\n---\n\nBack"), CardShape::BasicReversed);
    }

    #[test]
    fn test_separators_split_by_text_are_basic() {
        assert_eq!(shape("A\n\n---\n\nB\n\n---\n\nC"), CardShape::Basic);
    }

    #[test]
    fn test_separators_split_by_invisible_node_are_reversed() {
        assert_eq!(
            shape("A\n\n---\n\n<!-- extra -->\n\n---\n\nC"),
            CardShape::BasicReversed
        );
    }

    #[test]
    fn test_deletion_before_separator_is_cloze() {
        assert_eq!(shape("The ~~sun~~ is a star."), CardShape::Cloze);
        assert_eq!(shape("A ~~b~~\n\n---\n\n---\n\nC"), CardShape::Cloze);
        assert_eq!(shape("A ~~b~~ *c*"), CardShape::Cloze);
    }

    #[test]
    fn test_deletion_after_separator_is_not_cloze() {
        assert_eq!(shape("A\n\n---\n\n~~B~~"), CardShape::Basic);
    }

    #[test]
    fn test_trailing_emphasis_is_type_answer() {
        assert_eq!(shape("What is 2 + 2?\n\n*4*"), CardShape::BasicTypeAnswer);
        assert_eq!(shape("Capital of France? *Paris* "), CardShape::BasicTypeAnswer);
    }

    #[test]
    fn test_lone_emphasis_is_basic() {
        assert_eq!(shape("*alone*"), CardShape::Basic);
    }

    #[test]
    fn test_earlier_emphasis_counts_as_prompt() {
        assert_eq!(shape("*several* *words*"), CardShape::BasicTypeAnswer);
    }

    #[test]
    fn test_emphasis_not_last_is_basic() {
        assert_eq!(shape("Some *emphasis* here."), CardShape::Basic);
    }

    #[test]
    fn test_emphasis_with_separator_is_not_type_answer() {
        assert_eq!(shape("Q\n\n---\n\n*A*"), CardShape::Basic);
    }

    #[test]
    fn test_answer_path_skips_emphasis_without_text() {
        let tree = build_tree("What animal is this? *cat* *![](cat.png)*");
        assert_eq!(classify(&tree), CardShape::BasicTypeAnswer);
        assert_eq!(answer_path(tree.content()), Some(vec![0, 1]));
    }

    #[test]
    fn test_metadata_is_ignored() -> crate::error::Fallible<()> {
        let doc = crate::ast::parse_document("---\ndeck: A\n---\nQuestion *answer*")?;
        assert_eq!(classify(&doc.tree), CardShape::BasicTypeAnswer);
        Ok(())
    }
}
