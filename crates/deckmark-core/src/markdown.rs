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

use pulldown_cmark::CowStr;
use pulldown_cmark::Event;
use pulldown_cmark::Options;
use pulldown_cmark::Tag;
use pulldown_cmark::TagEnd;
use pulldown_cmark::html::push_html;

use crate::ast::Node;

/// The Markdown extensions every document is parsed with.
pub fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_MATH);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);
    options
}

/// Render a sequence of nodes to HTML. The metadata block is never rendered.
pub fn nodes_to_html(nodes: &[Node]) -> String {
    let mut events: Vec<Event<'static>> = Vec::new();
    for node in nodes {
        push_events(node, &mut events);
    }
    let mut html_output: String = String::new();
    push_html(&mut html_output, events.into_iter());
    html_output.trim_end().to_string()
}

fn push_children(children: &[Node], events: &mut Vec<Event<'static>>) {
    for child in children {
        push_events(child, events);
    }
}

fn push_events(node: &Node, events: &mut Vec<Event<'static>>) {
    match node {
        Node::Metadata(_) => {}
        Node::Text(text) => events.push(Event::Text(CowStr::from(text.clone()))),
        Node::Separator => events.push(Event::Rule),
        Node::Leaf(event) => events.push(event.clone()),
        Node::Emphasis(children) => {
            events.push(Event::Start(Tag::Emphasis));
            push_children(children, events);
            events.push(Event::End(TagEnd::Emphasis));
        }
        Node::Delete(children) => {
            events.push(Event::Start(Tag::Strikethrough));
            push_children(children, events);
            events.push(Event::End(TagEnd::Strikethrough));
        }
        Node::Paragraph(children) => {
            events.push(Event::Start(Tag::Paragraph));
            push_children(children, events);
            events.push(Event::End(TagEnd::Paragraph));
        }
        Node::Link {
            link_type,
            url,
            title,
            children,
        } => {
            events.push(Event::Start(Tag::Link {
                link_type: *link_type,
                dest_url: CowStr::from(url.clone()),
                title: CowStr::from(title.clone()),
                id: CowStr::Borrowed(""),
            }));
            push_children(children, events);
            events.push(Event::End(TagEnd::Link));
        }
        Node::Image {
            link_type,
            url,
            title,
            children,
        } => {
            events.push(Event::Start(Tag::Image {
                link_type: *link_type,
                dest_url: CowStr::from(url.clone()),
                title: CowStr::from(title.clone()),
                id: CowStr::Borrowed(""),
            }));
            push_children(children, events);
            events.push(Event::End(TagEnd::Image));
        }
        Node::Container { tag, children } => {
            events.push(Event::Start(tag.clone()));
            push_children(children, events);
            events.push(Event::End(tag.to_end()));
        }
    }
}
