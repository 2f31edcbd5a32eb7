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

use pulldown_cmark::Event;
use pulldown_cmark::LinkType;
use pulldown_cmark::Parser;
use pulldown_cmark::Tag;

use crate::error::Fallible;
use crate::frontmatter::Metadata;
use crate::frontmatter::extract_frontmatter;
use crate::markdown::parser_options;
use crate::reference::expand_references;

/// A node in a document's syntax tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// The raw YAML of the metadata block.
    Metadata(String),
    Text(String),
    Emphasis(Vec<Node>),
    /// `~~deleted~~` text, the candidate for a cloze deletion.
    Delete(Vec<Node>),
    /// A thematic break (`---`).
    Separator,
    Link {
        link_type: LinkType,
        url: String,
        title: String,
        children: Vec<Node>,
    },
    Image {
        link_type: LinkType,
        url: String,
        title: String,
        children: Vec<Node>,
    },
    Paragraph(Vec<Node>),
    /// Any other container: headings, lists, block quotes, tables, strong
    /// text, code blocks.
    Container {
        tag: Tag<'static>,
        children: Vec<Node>,
    },
    /// Any other leaf event: inline code, math, HTML, line breaks.
    Leaf(Event<'static>),
}

impl Node {
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Emphasis(children)
            | Node::Delete(children)
            | Node::Paragraph(children)
            | Node::Link { children, .. }
            | Node::Image { children, .. }
            | Node::Container { children, .. } => children,
            Node::Metadata(_) | Node::Text(_) | Node::Separator | Node::Leaf(_) => &[],
        }
    }

    /// A copy of this node with its children replaced. Leaves are returned
    /// unchanged.
    pub fn with_children(&self, children: Vec<Node>) -> Node {
        match self {
            Node::Emphasis(_) => Node::Emphasis(children),
            Node::Delete(_) => Node::Delete(children),
            Node::Paragraph(_) => Node::Paragraph(children),
            Node::Link {
                link_type,
                url,
                title,
                ..
            } => Node::Link {
                link_type: *link_type,
                url: url.clone(),
                title: title.clone(),
                children,
            },
            Node::Image {
                link_type,
                url,
                title,
                ..
            } => Node::Image {
                link_type: *link_type,
                url: url.clone(),
                title: title.clone(),
                children,
            },
            Node::Container { tag, .. } => Node::Container {
                tag: tag.clone(),
                children,
            },
            leaf => leaf.clone(),
        }
    }

    /// The text of this node a reader would see, without markup.
    pub fn plain_text(&self) -> String {
        let mut text = String::new();
        self.push_plain_text(&mut text);
        text
    }

    fn push_plain_text(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(text),
            Node::Leaf(Event::Code(code))
            | Node::Leaf(Event::InlineMath(code))
            | Node::Leaf(Event::DisplayMath(code)) => out.push_str(code),
            Node::Leaf(Event::SoftBreak) | Node::Leaf(Event::HardBreak) => out.push(' '),
            node => {
                for child in node.children() {
                    child.push_plain_text(out);
                }
            }
        }
    }

    /// True for leaves carrying non-whitespace text.
    pub fn is_visible_text(&self) -> bool {
        match self {
            Node::Text(text) => !text.trim().is_empty(),
            Node::Leaf(Event::Code(code))
            | Node::Leaf(Event::InlineMath(code))
            | Node::Leaf(Event::DisplayMath(code)) => !code.trim().is_empty(),
            _ => false,
        }
    }
}

/// The syntax tree of one document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyntaxTree {
    pub children: Vec<Node>,
}

impl SyntaxTree {
    /// The top-level nodes, without the metadata block.
    pub fn content(&self) -> &[Node] {
        match self.children.first() {
            Some(Node::Metadata(_)) => &self.children[1..],
            _ => &self.children,
        }
    }
}

/// A parsed document: its metadata and its tree.
#[derive(Debug)]
pub struct ParsedDocument {
    pub metadata: Metadata,
    pub tree: SyntaxTree,
}

/// Parse a document. A malformed metadata block is an error; a missing one
/// yields empty metadata.
pub fn parse_document(text: &str) -> Fallible<ParsedDocument> {
    let (metadata, yaml, body) = extract_frontmatter(text)?;
    let mut tree = build_tree(body);
    if let Some(yaml) = yaml {
        tree.children.insert(0, Node::Metadata(yaml.to_string()));
    }
    Ok(ParsedDocument { metadata, tree })
}

/// Build a tree from Markdown without a metadata block.
pub fn build_tree(markdown: &str) -> SyntaxTree {
    let expanded = expand_references(markdown);
    let mut builder = TreeBuilder::default();
    for event in Parser::new_ext(&expanded, parser_options()) {
        builder.push(event.into_static());
    }
    SyntaxTree {
        children: builder.finish(),
    }
}

#[derive(Default)]
struct TreeBuilder {
    /// Open containers, innermost last, each with the children read so far.
    stack: Vec<(Tag<'static>, Vec<Node>)>,
    root: Vec<Node>,
}

impl TreeBuilder {
    fn siblings(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some((_, children)) => children,
            None => &mut self.root,
        }
    }

    fn append(&mut self, node: Node) {
        let siblings = self.siblings();
        // The parser splits text at escapes and entities; join the pieces.
        if let (Node::Text(new), Some(Node::Text(prev))) = (&node, siblings.last_mut()) {
            prev.push_str(new);
            return;
        }
        siblings.push(node);
    }

    fn push(&mut self, event: Event<'static>) {
        match event {
            Event::Start(tag) => self.stack.push((tag, Vec::new())),
            Event::End(_) => {
                if let Some((tag, children)) = self.stack.pop() {
                    self.append(close(tag, children));
                }
            }
            Event::Text(text) => self.append(Node::Text(text.to_string())),
            Event::Rule => self.append(Node::Separator),
            other => self.append(Node::Leaf(other)),
        }
    }

    fn finish(mut self) -> Vec<Node> {
        // The parser always balances its events, but close anything left open
        // rather than drop it.
        while let Some((tag, children)) = self.stack.pop() {
            self.append(close(tag, children));
        }
        self.root
    }
}

fn close(tag: Tag<'static>, children: Vec<Node>) -> Node {
    match tag {
        Tag::Emphasis => Node::Emphasis(children),
        Tag::Strikethrough => Node::Delete(children),
        Tag::Paragraph => Node::Paragraph(children),
        Tag::Link {
            link_type,
            dest_url,
            title,
            ..
        } => Node::Link {
            link_type,
            url: dest_url.to_string(),
            title: title.to_string(),
            children,
        },
        Tag::Image {
            link_type,
            dest_url,
            title,
            ..
        } => Node::Image {
            link_type,
            url: dest_url.to_string(),
            title: title.to_string(),
            children,
        },
        tag => Node::Container { tag, children },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    #[test]
    fn test_paragraph_with_emphasis() {
        let tree = build_tree("Hello *world*.");
        assert_eq!(
            tree.children,
            vec![Node::Paragraph(vec![
                text("Hello "),
                Node::Emphasis(vec![text("world")]),
                text("."),
            ])]
        );
    }

    #[test]
    fn test_separator_and_deletion() {
        let tree = build_tree("A ~~b~~\n\n---\n\nC");
        assert_eq!(
            tree.children,
            vec![
                Node::Paragraph(vec![text("A "), Node::Delete(vec![text("b")])]),
                Node::Separator,
                Node::Paragraph(vec![text("C")]),
            ]
        );
    }

    #[test]
    fn test_escapes_are_merged_into_one_text_node() {
        let tree = build_tree(r"a \* b");
        assert_eq!(tree.children, vec![Node::Paragraph(vec![text("a * b")])]);
    }

    #[test]
    fn test_wiki_link_becomes_link_node() {
        let tree = build_tree("See [[dir/My Page#Part]].");
        let Node::Paragraph(children) = &tree.children[0] else {
            panic!("expected a paragraph");
        };
        assert_eq!(children[0], text("See "));
        match &children[1] {
            Node::Link { url, children, .. } => {
                assert_eq!(url, "dir/My%20Page#Part");
                assert_eq!(children, &vec![text("Part")]);
            }
            other => panic!("expected a link, got {other:?}"),
        }
    }

    #[test]
    fn test_wiki_embed_becomes_image_node() {
        let tree = build_tree("![[song.mp3|Theme]]");
        let Node::Paragraph(children) = &tree.children[0] else {
            panic!("expected a paragraph");
        };
        match &children[0] {
            Node::Image { url, children, .. } => {
                assert_eq!(url, "song.mp3");
                assert_eq!(children, &vec![text("Theme")]);
            }
            other => panic!("expected an image, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_document_keeps_metadata_node() -> Fallible<()> {
        let doc = parse_document("---\ndeck: A\n---\nBody")?;
        assert_eq!(doc.metadata.deck.as_deref(), Some("A"));
        assert_eq!(doc.tree.children[0], Node::Metadata("deck: A\n".to_string()));
        assert_eq!(doc.tree.content(), &[Node::Paragraph(vec![text("Body")])]);
        Ok(())
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let input = "Q *a* ~~b~~ [[c]]\n\n---\n\n---\n\nBack";
        assert_eq!(build_tree(input), build_tree(input));
    }

    #[test]
    fn test_plain_text() {
        let tree = build_tree("a *b* `c`");
        assert_eq!(tree.children[0].plain_text(), "a b c");
    }
}
