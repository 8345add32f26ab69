//! # Template Parser
//!
//! Builds the template AST from the event stream produced by
//! [`crate::tokenizer`], using an explicit stack of open elements.
//!
//! The parser is tolerant by design: authored rule templates are trusted but
//! not always well-formed. An element still open at end of input is closed
//! implicitly; a closing tag with no matching open element is dropped. The
//! parser performs no semantic validation of tag names: unknown tags are
//! preserved as opaque elements and re-emitted verbatim by the interpreter,
//! which keeps the parser decoupled from the tag vocabulary.
//!
//! Attribute values are sub-parsed into their own node sequences so handlers
//! can evaluate nested tags inside attributes on demand; an attribute value
//! that fails to sub-parse is kept as plain text.

use thiserror::Error;

use crate::ast::{Attribute, Element, Node};
use crate::tokenizer::{MarkupEvent, RawAttribute, Tokenizer};

/// Error type for template parsing.
///
/// Only constructs that are started but never terminated are errors; every
/// other irregularity is absorbed by the implicit-close tolerance.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unterminated tag at position {position}")]
    UnterminatedTag { position: usize },
    #[error("unterminated comment at position {position}")]
    UnterminatedComment { position: usize },
    #[error("unterminated literal data block at position {position}")]
    UnterminatedData { position: usize },
}

/// Parses template markup into a node sequence.
#[tracing::instrument(level = "debug", skip(markup))]
pub fn parse(markup: &str) -> Result<Vec<Node>, ParseError> {
    let events = Tokenizer::new().tokenize(markup)?;

    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<Element> = Vec::new();

    for event in events {
        match event {
            MarkupEvent::Text(text) => push_node(&mut stack, &mut root, Node::Text(text)),
            MarkupEvent::Comment(content) => {
                push_node(&mut stack, &mut root, Node::Comment(content))
            }
            MarkupEvent::Data(content) => push_node(&mut stack, &mut root, Node::Data(content)),
            MarkupEvent::SelfClose { name, attrs } => {
                let element = Element {
                    name,
                    attrs: build_attributes(attrs),
                    children: Vec::new(),
                    self_closing: true,
                };
                push_node(&mut stack, &mut root, Node::Element(element));
            }
            MarkupEvent::Open { name, attrs } => {
                stack.push(Element {
                    name,
                    attrs: build_attributes(attrs),
                    children: Vec::new(),
                    self_closing: false,
                });
            }
            MarkupEvent::Close { name } => {
                if !has_open(&stack, &name) {
                    // Stray close with no matching open element.
                    continue;
                }
                // Anything opened above the matching element closes
                // implicitly with it.
                while let Some(element) = stack.pop() {
                    let matched = element.name.eq_ignore_ascii_case(&name);
                    push_node(&mut stack, &mut root, Node::Element(element));
                    if matched {
                        break;
                    }
                }
            }
        }
    }

    // End of document closes whatever is still open.
    while let Some(element) = stack.pop() {
        push_node(&mut stack, &mut root, Node::Element(element));
    }

    Ok(root)
}

fn push_node(stack: &mut [Element], root: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => root.push(node),
    }
}

fn has_open(stack: &[Element], name: &str) -> bool {
    stack
        .iter()
        .any(|element| element.name.eq_ignore_ascii_case(name))
}

fn build_attributes(raw_attrs: Vec<RawAttribute>) -> Vec<Attribute> {
    raw_attrs
        .into_iter()
        .map(|attr| {
            let value = match parse(&attr.raw) {
                Ok(nodes) => nodes,
                Err(_) => vec![Node::Text(attr.raw.clone())],
            };
            Attribute {
                name: attr.name,
                raw: attr.raw,
                value,
            }
        })
        .collect()
}
