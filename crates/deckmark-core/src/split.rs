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

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::Node;
use crate::ast::SyntaxTree;
use crate::classify::SeparatorLayout;
use crate::classify::answer_path;
use crate::classify::separator_layout;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::types::shape::CardShape;

/// An explicit cloze number at the start of a deletion: `3 `, `3)`, `3.`,
/// `3|`, `(3)`, or bare `3` when more content follows in another node.
static CLOZE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\((\d+)\)|(\d+)(?:[).|]|\s|$))").expect("cloze marker regex")
});

/// The back of a card.
#[derive(Clone, Debug, PartialEq)]
pub enum BackField {
    Tree(Vec<Node>),
    /// The expected answer of a type-in-the-answer card.
    Answer(String),
}

/// A document carved into its two fields.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitFields {
    pub front: Vec<Node>,
    pub back: BackField,
}

/// Split a tree into front and back according to its shape.
pub fn split_fields(tree: &SyntaxTree, shape: CardShape) -> Fallible<SplitFields> {
    let nodes = tree.content();
    match shape {
        CardShape::Cloze => {
            let transformed = cloze_transform(nodes);
            Ok(SplitFields {
                front: transformed.clone(),
                back: BackField::Tree(transformed),
            })
        }
        CardShape::BasicTypeAnswer => split_type_answer(nodes),
        CardShape::Basic | CardShape::BasicReversed => Ok(split_on_separator(nodes)),
    }
}

fn split_on_separator(nodes: &[Node]) -> SplitFields {
    let (front, back) = match separator_layout(nodes) {
        SeparatorLayout::None => (nodes, &[][..]),
        SeparatorLayout::Single(first) => (&nodes[..first], &nodes[first + 1..]),
        // Whatever sits between the two separators is dropped.
        SeparatorLayout::Double(first, second) => (&nodes[..first], &nodes[second + 1..]),
    };
    SplitFields {
        front: front.to_vec(),
        back: BackField::Tree(back.to_vec()),
    }
}

fn split_type_answer(nodes: &[Node]) -> Fallible<SplitFields> {
    let path = answer_path(nodes).ok_or_else(|| {
        ErrorReport::invariant("Type-in-the-answer card has no emphasized answer.")
    })?;
    let emphasis = node_at(nodes, &path).ok_or_else(|| {
        ErrorReport::invariant("Type-in-the-answer path does not resolve to a node.")
    })?;
    let answer = emphasis.plain_text().trim().to_string();
    if answer.is_empty() {
        return Err(ErrorReport::invariant(
            "Type-in-the-answer card has an empty answer.",
        ));
    }
    Ok(SplitFields {
        front: truncate_before(nodes, &path),
        back: BackField::Answer(answer),
    })
}

fn node_at<'a>(nodes: &'a [Node], path: &[usize]) -> Option<&'a Node> {
    let (&first, rest) = path.split_first()?;
    let node = nodes.get(first)?;
    if rest.is_empty() {
        Some(node)
    } else {
        node_at(node.children(), rest)
    }
}

/// Everything strictly before the node at `path`. Ancestors are kept with
/// their earlier children; ancestors left empty are dropped.
fn truncate_before(nodes: &[Node], path: &[usize]) -> Vec<Node> {
    let Some((&index, rest)) = path.split_first() else {
        return nodes.to_vec();
    };
    let mut kept: Vec<Node> = nodes[..index].to_vec();
    if rest.is_empty() {
        if let Some(Node::Text(text)) = kept.last_mut() {
            let trimmed = text.trim_end().len();
            text.truncate(trimmed);
            if text.is_empty() {
                kept.pop();
            }
        }
    } else if let Some(node) = nodes.get(index) {
        let children = truncate_before(node.children(), rest);
        if !children.is_empty() {
            kept.push(node.with_children(children));
        }
    }
    kept
}

/// Rewrite every deletion into `{{cN::content}}` or `{{cN::content::hint}}`
/// markup. Numbering starts at 1 and follows document order; an explicit
/// marker sets the number and the next unmarked deletion continues from it.
pub fn cloze_transform(nodes: &[Node]) -> Vec<Node> {
    let mut counter = 1;
    transform_nodes(nodes, &mut counter)
}

fn transform_nodes(nodes: &[Node], counter: &mut u32) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Delete(children) => out.extend(cloze_deletion(children.clone(), counter)),
            node if node.children().is_empty() => out.push(node.clone()),
            node => out.push(node.with_children(transform_nodes(node.children(), counter))),
        }
    }
    merge_text(out)
}

/// Parse an explicit cloze number off the front of `text`, returning the
/// number and the remaining text.
fn parse_marker(text: &str) -> Option<(u32, &str)> {
    let captures = CLOZE_MARKER.captures(text)?;
    let digits = captures.get(1).or_else(|| captures.get(2))?;
    let number: u32 = digits.as_str().parse().ok()?;
    if number == 0 {
        return None;
    }
    let end = captures.get(0)?.end();
    Some((number, &text[end..]))
}

fn cloze_deletion(mut children: Vec<Node>, counter: &mut u32) -> Vec<Node> {
    let mut explicit = None;
    let only_child = children.len() == 1;
    if let Some(Node::Text(first)) = children.first_mut() {
        let parsed = parse_marker(first).map(|(number, rest)| (number, rest.to_string()));
        if let Some((number, rest)) = parsed {
            // A deletion that is nothing but a number is content, not a marker.
            if !(only_child && rest.trim().is_empty()) {
                explicit = Some(number);
                *first = rest;
            }
        }
    }
    if matches!(children.first(), Some(Node::Text(text)) if text.is_empty()) {
        children.remove(0);
    }

    let index = match explicit {
        Some(number) => {
            *counter = number.saturating_add(1);
            number
        }
        None => {
            let number = *counter;
            *counter = counter.saturating_add(1);
            number
        }
    };

    let hint = if children.len() > 1 && matches!(children.last(), Some(Node::Emphasis(_))) {
        children
            .pop()
            .map(|emphasis| emphasis.plain_text().trim().to_string())
    } else {
        None
    };

    trim_outer_text(&mut children);

    let mut out = vec![Node::Text(format!("{{{{c{index}::"))];
    out.extend(children);
    match hint {
        Some(hint) => out.push(Node::Text(format!("::{hint}}}}}"))),
        None => out.push(Node::Text("}}".to_string())),
    }
    out
}

/// Trim leading whitespace from the first text node and trailing whitespace
/// from the last one. Interior nodes are untouched.
fn trim_outer_text(children: &mut Vec<Node>) {
    if let Some(Node::Text(text)) = children.first_mut() {
        *text = text.trim_start().to_string();
    }
    if let Some(Node::Text(text)) = children.last_mut() {
        *text = text.trim_end().to_string();
    }
    children.retain(|node| !matches!(node, Node::Text(text) if text.is_empty()));
}

fn merge_text(nodes: Vec<Node>) -> Vec<Node> {
    let mut merged: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let (Node::Text(next), Some(Node::Text(prev))) = (&node, merged.last_mut()) {
            prev.push_str(next);
            continue;
        }
        merged.push(node);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build_tree;
    use crate::classify::classify;
    use crate::markdown::nodes_to_html;

    fn split(markdown: &str) -> Fallible<(CardShape, String, BackField)> {
        let tree = build_tree(markdown);
        let shape = classify(&tree);
        let fields = split_fields(&tree, shape)?;
        Ok((shape, nodes_to_html(&fields.front), fields.back))
    }

    fn back_html(back: &BackField) -> String {
        match back {
            BackField::Tree(nodes) => nodes_to_html(nodes),
            BackField::Answer(answer) => answer.clone(),
        }
    }

    fn cloze(markdown: &str) -> String {
        nodes_to_html(&cloze_transform(build_tree(markdown).content()))
    }

    #[test]
    fn test_basic_without_separator_has_empty_back() -> Fallible<()> {
        let (shape, front, back) = split("Just a fact.")?;
        assert_eq!(shape, CardShape::Basic);
        assert_eq!(front, "<p>Just a fact.</p>");
        assert_eq!(back, BackField::Tree(vec![]));
        Ok(())
    }

    #[test]
    fn test_basic_split() -> Fallible<()> {
        let (shape, front, back) = split("Front\n\n---\n\nBack")?;
        assert_eq!(shape, CardShape::Basic);
        assert_eq!(front, "<p>Front</p>");
        assert_eq!(back_html(&back), "<p>Back</p>");
        Ok(())
    }

    #[test]
    fn test_basic_keeps_later_separators_in_back() -> Fallible<()> {
        let (_, _, back) = split("A\n\n---\n\nB\n\n---\n\nC")?;
        assert_eq!(back_html(&back), "<p>B</p>\n<hr />\n<p>C</p>");
        Ok(())
    }

    #[test]
    fn test_reversed_drops_extra_zone() -> Fallible<()> {
        let (shape, front, back) = split("Front\n\n---\n\n<!-- extra -->\n\n---\n\nBack")?;
        assert_eq!(shape, CardShape::BasicReversed);
        assert_eq!(front, "<p>Front</p>");
        let back = back_html(&back);
        assert_eq!(back, "<p>Back</p>");
        assert!(!front.contains("extra") && !back.contains("extra"));
        Ok(())
    }

    #[test]
    fn test_type_answer_split() -> Fallible<()> {
        let (shape, front, back) = split("What is the capital of *France*? *Paris*")?;
        assert_eq!(shape, CardShape::BasicTypeAnswer);
        assert_eq!(front, "<p>What is the capital of <em>France</em>?</p>");
        assert_eq!(back, BackField::Answer("Paris".to_string()));
        Ok(())
    }

    #[test]
    fn test_type_answer_in_own_paragraph() -> Fallible<()> {
        let (_, front, back) = split("Question?\n\n*Answer*")?;
        assert_eq!(front, "<p>Question?</p>");
        assert_eq!(back, BackField::Answer("Answer".to_string()));
        Ok(())
    }

    #[test]
    fn test_type_answer_ignores_trailing_image_emphasis() -> Fallible<()> {
        let (shape, front, back) = split("What animal is this? *cat* *![](cat.png)*")?;
        assert_eq!(shape, CardShape::BasicTypeAnswer);
        assert_eq!(front, "<p>What animal is this?</p>");
        assert_eq!(back, BackField::Answer("cat".to_string()));
        Ok(())
    }

    #[test]
    fn test_type_answer_without_emphasis_is_invariant_violation() {
        let tree = build_tree("No emphasis here.");
        let err = split_fields(&tree, CardShape::BasicTypeAnswer).unwrap_err();
        assert_eq!(
            err.kind(),
            crate::error::ErrorKind::ClassificationInvariantViolation
        );
    }

    #[test]
    fn test_cloze_sequential_numbering() {
        assert_eq!(
            cloze("~~Paris~~ is in ~~France~~."),
            "<p>{{c1::Paris}} is in {{c2::France}}.</p>"
        );
    }

    #[test]
    fn test_cloze_explicit_marker_resets_counter() {
        assert_eq!(
            cloze("~~(5) a~~ and ~~b~~"),
            "<p>{{c5::a}} and {{c6::b}}</p>"
        );
    }

    #[test]
    fn test_cloze_largest_marker_saturates() {
        assert_eq!(
            cloze("~~(4294967295) a~~ ~~b~~"),
            "<p>{{c4294967295::a}} {{c4294967295::b}}</p>"
        );
    }

    #[test]
    fn test_cloze_marker_forms() {
        assert_eq!(cloze("~~2) a~~"), "<p>{{c2::a}}</p>");
        assert_eq!(cloze("~~3. a~~"), "<p>{{c3::a}}</p>");
        assert_eq!(cloze("~~4|a~~"), "<p>{{c4::a}}</p>");
        assert_eq!(cloze("~~7 a~~"), "<p>{{c7::a}}</p>");
    }

    #[test]
    fn test_cloze_number_alone_is_content() {
        assert_eq!(cloze("Year ~~1066~~"), "<p>Year {{c1::1066}}</p>");
    }

    #[test]
    fn test_cloze_hint() {
        assert_eq!(
            cloze("~~Paris *city*~~"),
            "<p>{{c1::Paris::city}}</p>"
        );
    }

    #[test]
    fn test_cloze_single_emphasis_is_content() {
        assert_eq!(cloze("~~*Paris*~~"), "<p>{{c1::<em>Paris</em>}}</p>");
    }

    #[test]
    fn test_cloze_trims_only_outer_text() {
        assert_eq!(
            cloze("~~(2)  a **b** c~~"),
            "<p>{{c2::a <strong>b</strong> c}}</p>"
        );
    }

    #[test]
    fn test_cloze_front_and_back_match() -> Fallible<()> {
        let tree = build_tree("~~a~~ b");
        let fields = split_fields(&tree, CardShape::Cloze)?;
        assert_eq!(fields.back, BackField::Tree(fields.front.clone()));
        Ok(())
    }
}
