//! # Pattern Matcher
//!
//! Selects the single best-matching category for a normalized input plus its
//! conversational context. Categories are indexed in a trie keyed by
//! normalized pattern prefix; each category is stored under the combined path
//!
//! ```text
//! input-pattern  <that>  that-pattern  <topic>  topic-pattern
//! ```
//!
//! so the prior-response and topic context patterns are matched conjunctively
//! with the input pattern. Absent context patterns default to `*`, which
//! matches the empty context.
//!
//! At every trie node the walk tries edges in specificity order: exact
//! literal, then set-membership, then `_`, then `*` (greedy, longest capture
//! first). The first complete match found is therefore the most specific
//! one. Categories sharing an identical path tie-break by declaration order:
//! the first-loaded category wins. Wildcards never consume the segment
//! boundary markers. No match is a normal outcome, not an error.

use std::collections::HashMap;

use crate::pattern::{Pattern, PatternToken};

/// Resolves set-membership wildcards against the named sets of the knowledge
/// base at match time, so learned additions take effect immediately.
pub trait SetResolver {
    fn members(&self, name: &str) -> Vec<String>;
}

/// One token of the combined input path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathToken {
    /// An input word, original casing preserved for captures.
    Word(String),
    /// Boundary before the prior-response context segment.
    That,
    /// Boundary before the topic context segment.
    Topic,
}

/// Builds the combined path for an input and its context.
pub fn input_path(input: &[String], that: &[String], topic: &[String]) -> Vec<PathToken> {
    let mut path = Vec::with_capacity(input.len() + that.len() + topic.len() + 2);
    path.extend(input.iter().cloned().map(PathToken::Word));
    path.push(PathToken::That);
    path.extend(that.iter().cloned().map(PathToken::Word));
    path.push(PathToken::Topic);
    path.extend(topic.iter().cloned().map(PathToken::Word));
    path
}

/// Wildcard captures for one match, one lane per pattern segment, recorded in
/// left-to-right pattern order. Indices are 1-based.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Captures {
    pub input: Vec<String>,
    pub that: Vec<String>,
    pub topic: Vec<String>,
}

impl Captures {
    /// Captures with only the input lane populated; used by callers that
    /// re-enter evaluation without a fresh match.
    pub fn from_input(input: Vec<String>) -> Self {
        Self {
            input,
            ..Default::default()
        }
    }

    pub fn input_capture(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.input.get(i))
            .map(String::as_str)
    }

    pub fn that_capture(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.that.get(i))
            .map(String::as_str)
    }

    pub fn topic_capture(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.topic.get(i))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Lane {
    Input,
    That,
    Topic,
}

#[derive(Debug, Default)]
struct TrieNode {
    words: HashMap<String, TrieNode>,
    sets: Vec<(String, TrieNode)>,
    single: Option<Box<TrieNode>>,
    any: Option<Box<TrieNode>>,
    that: Option<Box<TrieNode>>,
    topic: Option<Box<TrieNode>>,
    /// Category indices in load order; the first entry wins ties.
    terminal: Vec<usize>,
}

/// The category index: a trie over combined pattern paths.
#[derive(Debug, Default)]
pub struct PatternTrie {
    root: TrieNode,
}

impl PatternTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        index: usize,
        pattern: &Pattern,
        that: Option<&Pattern>,
        topic: Option<&Pattern>,
    ) {
        let mut node = &mut self.root;
        node = descend_pattern(node, &pattern.tokens);
        node = node.that.get_or_insert_with(Default::default);
        node = descend_pattern(node, context_tokens(that));
        node = node.topic.get_or_insert_with(Default::default);
        node = descend_pattern(node, context_tokens(topic));
        node.terminal.push(index);
    }

    /// Walks the trie against a combined path, returning the matched category
    /// index and its captures.
    #[tracing::instrument(level = "debug", skip(self, path, sets))]
    pub fn matches(&self, path: &[PathToken], sets: &dyn SetResolver) -> Option<(usize, Captures)> {
        let mut recorded: Vec<(Lane, String)> = Vec::new();
        let index = walk(&self.root, path, 0, Lane::Input, sets, &mut recorded)?;

        let mut captures = Captures::default();
        for (lane, text) in recorded {
            match lane {
                Lane::Input => captures.input.push(text),
                Lane::That => captures.that.push(text),
                Lane::Topic => captures.topic.push(text),
            }
        }
        Some((index, captures))
    }
}

const DEFAULT_CONTEXT: &[PatternToken] = &[PatternToken::Any];

fn context_tokens(pattern: Option<&Pattern>) -> &[PatternToken] {
    match pattern {
        Some(p) if !p.is_empty() => &p.tokens,
        _ => DEFAULT_CONTEXT,
    }
}

fn descend_pattern<'a>(mut node: &'a mut TrieNode, tokens: &[PatternToken]) -> &'a mut TrieNode {
    for token in tokens {
        node = match token {
            PatternToken::Word(word) => node.words.entry(word.clone()).or_default(),
            PatternToken::Set(name) => {
                let at = match node.sets.iter().position(|(n, _)| n == name) {
                    Some(at) => at,
                    None => {
                        node.sets.push((name.clone(), TrieNode::default()));
                        node.sets.len() - 1
                    }
                };
                &mut node.sets[at].1
            }
            PatternToken::Single => node.single.get_or_insert_with(Default::default),
            PatternToken::Any => node.any.get_or_insert_with(Default::default),
        };
    }
    node
}

fn walk(
    node: &TrieNode,
    path: &[PathToken],
    pos: usize,
    lane: Lane,
    sets: &dyn SetResolver,
    recorded: &mut Vec<(Lane, String)>,
) -> Option<usize> {
    if pos == path.len() {
        if let Some(&index) = node.terminal.first() {
            return Some(index);
        }
        // A trailing `*` still matches the empty remainder.
        if let Some(child) = &node.any {
            recorded.push((lane, String::new()));
            if let Some(found) = walk(child, path, pos, lane, sets, recorded) {
                return Some(found);
            }
            recorded.pop();
        }
        return None;
    }

    match &path[pos] {
        PathToken::That => {
            // The exact segment end outranks a `*` matching zero words here.
            if let Some(child) = &node.that {
                if let Some(found) = walk(child, path, pos + 1, Lane::That, sets, recorded) {
                    return Some(found);
                }
            }
            try_any(node, path, pos, lane, sets, recorded, 0)
        }
        PathToken::Topic => {
            if let Some(child) = &node.topic {
                if let Some(found) = walk(child, path, pos + 1, Lane::Topic, sets, recorded) {
                    return Some(found);
                }
            }
            try_any(node, path, pos, lane, sets, recorded, 0)
        }
        PathToken::Word(word) => {
            // 1. Exact literal.
            if let Some(child) = node.words.get(&word.to_uppercase()) {
                if let Some(found) = walk(child, path, pos + 1, lane, sets, recorded) {
                    return Some(found);
                }
            }
            // 2. Set membership, declaration order, longest member first.
            for (set_name, child) in &node.sets {
                if let Some(found) =
                    try_set(child, set_name, path, pos, lane, sets, recorded)
                {
                    return Some(found);
                }
            }
            // 3. Exactly one word.
            if let Some(child) = &node.single {
                recorded.push((lane, word.clone()));
                if let Some(found) = walk(child, path, pos + 1, lane, sets, recorded) {
                    return Some(found);
                }
                recorded.pop();
            }
            // 4. Zero or more words, greedy.
            let max = run_of_words(path, pos);
            try_any(node, path, pos, lane, sets, recorded, max)
        }
    }
}

fn try_any(
    node: &TrieNode,
    path: &[PathToken],
    pos: usize,
    lane: Lane,
    sets: &dyn SetResolver,
    recorded: &mut Vec<(Lane, String)>,
    max: usize,
) -> Option<usize> {
    let child = node.any.as_ref()?;
    for take in (0..=max).rev() {
        let captured = join_words(&path[pos..pos + take]);
        recorded.push((lane, captured));
        if let Some(found) = walk(child, path, pos + take, lane, sets, recorded) {
            return Some(found);
        }
        recorded.pop();
    }
    None
}

fn try_set(
    child: &TrieNode,
    set_name: &str,
    path: &[PathToken],
    pos: usize,
    lane: Lane,
    sets: &dyn SetResolver,
    recorded: &mut Vec<(Lane, String)>,
) -> Option<usize> {
    let mut members: Vec<Vec<String>> = sets
        .members(set_name)
        .iter()
        .map(|member| {
            member
                .split_whitespace()
                .map(|w| w.to_uppercase())
                .collect()
        })
        .filter(|words: &Vec<String>| !words.is_empty())
        .collect();
    // Longest member first; ties keep insertion order (sort is stable).
    members.sort_by_key(|words| std::cmp::Reverse(words.len()));

    let available = run_of_words(path, pos);
    for member in members {
        if member.len() > available {
            continue;
        }
        let matches_here = member.iter().enumerate().all(|(i, expected)| {
            matches!(&path[pos + i], PathToken::Word(w) if w.to_uppercase() == *expected)
        });
        if !matches_here {
            continue;
        }
        recorded.push((lane, join_words(&path[pos..pos + member.len()])));
        if let Some(found) = walk(child, path, pos + member.len(), lane, sets, recorded) {
            return Some(found);
        }
        recorded.pop();
    }
    None
}

/// Number of consecutive word tokens starting at `pos`; wildcards may not
/// cross a segment boundary.
fn run_of_words(path: &[PathToken], pos: usize) -> usize {
    path[pos..]
        .iter()
        .take_while(|t| matches!(t, PathToken::Word(_)))
        .count()
}

fn join_words(tokens: &[PathToken]) -> String {
    tokens
        .iter()
        .filter_map(|t| match t {
            PathToken::Word(w) => Some(w.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}
