//! # Template Markup Tokenizer
//!
//! Single-pass lexical analysis of response-template markup, transforming raw
//! text into a stream of [`MarkupEvent`]s for the tree builder in
//! [`crate::parser`].
//!
//! The tokenizer recognizes:
//!
//! * `<!-- ... -->` comments
//! * `<![CDATA[ ... ]]>` literal-data blocks
//! * `</name>` closing tags
//! * `<name attr="value" ...>` opening tags and `<name .../>` self-closing
//!   tags, with single- or double-quoted attribute values
//! * plain text runs (a `<` that opens none of the above is ordinary text)
//!
//! Authored templates are trusted but not always well-formed, so malformed
//! tag syntax degrades to text rather than failing; the only hard errors are
//! constructs that are started but never terminated before end of input.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_till1, take_until, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, recognize},
    error::{VerboseError, context},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
};

use crate::parser::ParseError;

pub type ParserResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// One lexical event in a template.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupEvent {
    Text(String),
    Comment(String),
    Data(String),
    Open { name: String, attrs: Vec<RawAttribute> },
    SelfClose { name: String, attrs: Vec<RawAttribute> },
    Close { name: String },
}

/// An attribute as scanned, before its value is sub-parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAttribute {
    pub name: String,
    pub raw: String,
}

#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    current_position: usize,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    #[tracing::instrument(level = "debug", skip(self, input))]
    pub fn tokenize(&mut self, input: &str) -> Result<Vec<MarkupEvent>, ParseError> {
        let mut events = Vec::new();
        let mut remaining = input;

        while !remaining.is_empty() {
            let result = alt((
                parse_comment,
                parse_data,
                parse_close,
                parse_open,
                parse_text,
            ))(remaining);

            match result {
                Ok((new_remaining, event)) => {
                    let consumed = remaining.len() - new_remaining.len();
                    self.current_position += consumed;
                    events.push(event);
                    remaining = new_remaining;
                }
                Err(_) => {
                    if let Some(error) = self.classify_failure(remaining) {
                        tracing::debug!("tokenize failed: {}", error);
                        return Err(error);
                    }
                    // A lone `<` that opens nothing is literal text.
                    events.push(MarkupEvent::Text("<".to_string()));
                    self.current_position += 1;
                    remaining = &remaining[1..];
                }
            }
        }

        Ok(coalesce_text(events))
    }

    /// Distinguishes unterminated constructs (hard errors) from a literal
    /// `<` in text.
    fn classify_failure(&self, remaining: &str) -> Option<ParseError> {
        let position = self.current_position;
        if remaining.starts_with("<!--") {
            return Some(ParseError::UnterminatedComment { position });
        }
        if remaining.starts_with("<![CDATA[") {
            return Some(ParseError::UnterminatedData { position });
        }
        let tag_like = remaining.starts_with("</")
            || remaining[1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic());
        if tag_like && !remaining.contains('>') {
            return Some(ParseError::UnterminatedTag { position });
        }
        None
    }
}

/// Merges adjacent text events produced by literal `<` recovery.
fn coalesce_text(events: Vec<MarkupEvent>) -> Vec<MarkupEvent> {
    let mut out: Vec<MarkupEvent> = Vec::with_capacity(events.len());
    for event in events {
        match (out.last_mut(), event) {
            (Some(MarkupEvent::Text(prev)), MarkupEvent::Text(next)) => prev.push_str(&next),
            (_, event) => out.push(event),
        }
    }
    out
}

fn parse_comment(input: &str) -> ParserResult<MarkupEvent> {
    context(
        "comment",
        map(
            delimited(tag("<!--"), take_until("-->"), tag("-->")),
            |content: &str| MarkupEvent::Comment(content.to_string()),
        ),
    )(input)
}

fn parse_data(input: &str) -> ParserResult<MarkupEvent> {
    context(
        "data",
        map(
            delimited(tag("<![CDATA["), take_until("]]>"), tag("]]>")),
            |content: &str| MarkupEvent::Data(content.to_string()),
        ),
    )(input)
}

fn parse_close(input: &str) -> ParserResult<MarkupEvent> {
    context(
        "close",
        map(
            delimited(
                tag("</"),
                preceded(multispace0, parse_name),
                preceded(multispace0, char('>')),
            ),
            |name| MarkupEvent::Close {
                name: name.to_string(),
            },
        ),
    )(input)
}

fn parse_open(input: &str) -> ParserResult<MarkupEvent> {
    context(
        "open",
        map(
            tuple((
                char('<'),
                parse_name,
                many0(preceded(multispace1, parse_attribute)),
                multispace0,
                alt((tag("/>"), tag(">"))),
            )),
            |(_, name, attrs, _, terminator)| {
                if terminator == "/>" {
                    MarkupEvent::SelfClose {
                        name: name.to_string(),
                        attrs,
                    }
                } else {
                    MarkupEvent::Open {
                        name: name.to_string(),
                        attrs,
                    }
                }
            },
        ),
    )(input)
}

fn parse_attribute(input: &str) -> ParserResult<RawAttribute> {
    context(
        "attribute",
        map(
            tuple((
                parse_name,
                preceded(multispace0, char('=')),
                preceded(multispace0, parse_quoted),
            )),
            |(name, _, raw)| RawAttribute {
                name: name.to_string(),
                raw: raw.to_string(),
            },
        ),
    )(input)
}

fn parse_quoted(input: &str) -> ParserResult<&str> {
    alt((
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
    ))(input)
}

fn parse_name(input: &str) -> ParserResult<&str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
    ))(input)
}

fn parse_text(input: &str) -> ParserResult<MarkupEvent> {
    context(
        "text",
        map(take_till1(|c| c == '<'), |text: &str| {
            MarkupEvent::Text(text.to_string())
        }),
    )(input)
}
