//! Pure text transforms over evaluated content. All side-effect free; a
//! transform over empty content is empty.

use crate::ast::Element;
use crate::preprocessor::{swap_gender, swap_person, swap_person2};

use super::context::EvalContext;
use super::evaluator::Evaluator;

pub(crate) fn eval_uppercase(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    ev.eval_children(el, ctx).to_uppercase()
}

pub(crate) fn eval_lowercase(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    ev.eval_children(el, ctx).to_lowercase()
}

/// Title-cases every word.
pub(crate) fn eval_formal(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    ev.eval_children(el, ctx)
        .split_whitespace()
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Capitalizes the first character, leaving the rest untouched.
pub(crate) fn eval_sentence(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let content = ev.eval_children(el, ctx);
    let mut chars = content.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Reverses word order; `explode` provides the character-level view.
pub(crate) fn eval_reverse(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let content = ev.eval_children(el, ctx);
    let mut words: Vec<&str> = content.split_whitespace().collect();
    words.reverse();
    words.join(" ")
}

pub(crate) fn eval_acronym(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    ev.eval_children(el, ctx)
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Character slice via `start`/`end` attributes, clamped to the content.
pub(crate) fn eval_substring(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let content = ev.eval_children(el, ctx);
    let chars: Vec<char> = content.chars().collect();
    let start = ev
        .eval_attr(el, "start", ctx)
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0)
        .min(chars.len());
    let end = ev
        .eval_attr(el, "end", ctx)
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(chars.len())
        .min(chars.len());
    if start >= end {
        return String::new();
    }
    chars[start..end].iter().collect()
}

pub(crate) fn eval_replace(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let content = ev.eval_children(el, ctx);
    let Some(search) = ev.eval_attr(el, "search", ctx).filter(|s| !s.is_empty()) else {
        return content;
    };
    let with = ev.eval_attr(el, "with", ctx).unwrap_or_default();
    content.replace(&search, &with)
}

pub(crate) fn eval_length(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    ev.eval_children(el, ctx).chars().count().to_string()
}

/// Splits on `sep` (whitespace when absent) and rejoins with single spaces.
pub(crate) fn eval_split(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let content = ev.eval_children(el, ctx);
    let pieces: Vec<String> = match ev.eval_attr(el, "sep", ctx).filter(|s| !s.is_empty()) {
        Some(sep) => content
            .split(sep.as_str())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
        None => content.split_whitespace().map(str::to_string).collect(),
    };
    pieces.join(" ")
}

/// Joins whitespace-separated words with `sep`.
pub(crate) fn eval_join(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let content = ev.eval_children(el, ctx);
    let sep = ev.eval_attr(el, "sep", ctx).unwrap_or_else(|| " ".to_string());
    content.split_whitespace().collect::<Vec<_>>().join(&sep)
}

/// Drops repeated words, keeping first occurrences.
pub(crate) fn eval_dedup(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let content = ev.eval_children(el, ctx);
    let mut seen = Vec::new();
    for word in content.split_whitespace() {
        if !seen.iter().any(|kept: &&str| *kept == word) {
            seen.push(word);
        }
    }
    seen.join(" ")
}

/// Prefixes every line with `count` spaces (default 2).
pub(crate) fn eval_indent(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let content = ev.eval_children(el, ctx);
    let count = ev
        .eval_attr(el, "count", ctx)
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(2);
    let pad = " ".repeat(count);
    content
        .lines()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Separates every character with a space, dropping existing whitespace.
pub(crate) fn eval_explode(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    ev.eval_children(el, ctx)
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn eval_first(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    ev.eval_children(el, ctx)
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn eval_rest(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    ev.eval_children(el, ctx)
        .split_whitespace()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn eval_trim(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    ev.eval_children(el, ctx).trim().to_string()
}

pub(crate) fn eval_person(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    swap_person(&ev.eval_children(el, ctx))
}

pub(crate) fn eval_person2(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    swap_person2(&ev.eval_children(el, ctx))
}

pub(crate) fn eval_gender(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    swap_gender(&ev.eval_children(el, ctx))
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            first.to_uppercase().collect::<String>() + chars.as_str().to_lowercase().as_str()
        }
        None => String::new(),
    }
}
