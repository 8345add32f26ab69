//! Collection-operation tags: generic CRUD over the knowledge base's named
//! collections. One tag per collection kind (`map`, `list`, `array`,
//! `uniq`) with an `operation` attribute selecting the behavior:
//! `add`, `insert`, `remove`, `clear`, `size`, `contains`, `get`, `set`.
//!
//! Maps address entries by `key`; lists and arrays by 0-based `index`.
//! Every operation is idempotent under repeated identical application
//! except list/array `insert` without an index, which appends. Mutating
//! operations return the empty string; `size` a number; `contains`
//! `true`/`false`; lookups on missing targets are empty, never an error.

use std::str::FromStr;

use crate::ast::Element;
use crate::knowledge::KnowledgeBase;

use super::context::EvalContext;
use super::evaluator::Evaluator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CollectionOp {
    Add,
    Insert,
    Remove,
    Clear,
    Size,
    Contains,
    Get,
    Set,
}

fn operation(
    ev: &Evaluator,
    el: &Element,
    ctx: &mut EvalContext,
    default: CollectionOp,
) -> CollectionOp {
    ev.eval_attr(el, "operation", ctx)
        .and_then(|text| CollectionOp::from_str(&text).ok())
        .unwrap_or(default)
}

pub(crate) fn eval_map(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let Some(name) = ev.eval_attr(el, "name", ctx) else {
        return String::new();
    };
    let op = operation(ev, el, ctx, CollectionOp::Get);
    let key = ev.eval_attr(el, "key", ctx).unwrap_or_default();
    let content = ev.eval_children(el, ctx).trim().to_string();
    let kb = &ctx.kb;

    match op {
        CollectionOp::Get => kb.map_get(&name, &key).unwrap_or_default(),
        CollectionOp::Set | CollectionOp::Add | CollectionOp::Insert => {
            kb.map_set(&name, &key, &content);
            String::new()
        }
        CollectionOp::Remove => {
            kb.map_remove(&name, &key);
            String::new()
        }
        CollectionOp::Clear => {
            kb.map_clear(&name);
            String::new()
        }
        CollectionOp::Size => kb.map_len(&name).to_string(),
        CollectionOp::Contains => kb.map_contains(&name, &key).to_string(),
    }
}

pub(crate) fn eval_list(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    sequence(ev, el, ctx, false)
}

pub(crate) fn eval_array(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    sequence(ev, el, ctx, true)
}

fn sequence(ev: &Evaluator, el: &Element, ctx: &mut EvalContext, array: bool) -> String {
    let Some(name) = ev.eval_attr(el, "name", ctx) else {
        return String::new();
    };
    let op = operation(ev, el, ctx, CollectionOp::Get);
    let index = ev
        .eval_attr(el, "index", ctx)
        .and_then(|text| text.parse::<usize>().ok());
    let content = ev.eval_children(el, ctx).trim().to_string();
    let seq = Seq {
        kb: ctx.kb.as_ref(),
        name: &name,
        array,
    };

    match op {
        // `add` appends only when absent, keeping it idempotent.
        CollectionOp::Add => {
            if !seq.contains(&content) {
                seq.push(&content);
            }
            String::new()
        }
        // `insert` with an index places unless the slot already holds the
        // value; without an index it is the one plain append.
        CollectionOp::Insert => {
            match index {
                Some(at) => {
                    if seq.get(at).as_deref() != Some(content.as_str()) {
                        seq.insert(at, &content);
                    }
                }
                None => seq.push(&content),
            }
            String::new()
        }
        CollectionOp::Remove => {
            seq.remove_value(&content);
            String::new()
        }
        CollectionOp::Clear => {
            seq.clear();
            String::new()
        }
        CollectionOp::Size => seq.len().to_string(),
        CollectionOp::Contains => seq.contains(&content).to_string(),
        CollectionOp::Get => index.and_then(|at| seq.get(at)).unwrap_or_default(),
        CollectionOp::Set => {
            if let Some(at) = index {
                seq.set(at, &content);
            }
            String::new()
        }
    }
}

/// Thin selector over the list/array namespaces of the knowledge base.
struct Seq<'a> {
    kb: &'a KnowledgeBase,
    name: &'a str,
    array: bool,
}

impl Seq<'_> {
    fn push(&self, value: &str) {
        if self.array {
            self.kb.array_push(self.name, value)
        } else {
            self.kb.list_push(self.name, value)
        }
    }

    fn insert(&self, at: usize, value: &str) {
        if self.array {
            self.kb.array_insert(self.name, at, value)
        } else {
            self.kb.list_insert(self.name, at, value)
        }
    }

    fn remove_value(&self, value: &str) {
        if self.array {
            self.kb.array_remove_value(self.name, value)
        } else {
            self.kb.list_remove_value(self.name, value)
        }
    }

    fn get(&self, at: usize) -> Option<String> {
        if self.array {
            self.kb.array_get(self.name, at)
        } else {
            self.kb.list_get(self.name, at)
        }
    }

    fn set(&self, at: usize, value: &str) {
        if self.array {
            self.kb.array_set(self.name, at, value)
        } else {
            self.kb.list_set(self.name, at, value)
        }
    }

    fn contains(&self, value: &str) -> bool {
        if self.array {
            self.kb.array_contains(self.name, value)
        } else {
            self.kb.list_contains(self.name, value)
        }
    }

    fn len(&self) -> usize {
        if self.array {
            self.kb.array_len(self.name)
        } else {
            self.kb.list_len(self.name)
        }
    }

    fn clear(&self) {
        if self.array {
            self.kb.array_clear(self.name)
        } else {
            self.kb.list_clear(self.name)
        }
    }
}

pub(crate) fn eval_uniq(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let Some(name) = ev.eval_attr(el, "name", ctx) else {
        return String::new();
    };
    let op = operation(ev, el, ctx, CollectionOp::Contains);
    let index = ev
        .eval_attr(el, "index", ctx)
        .and_then(|text| text.parse::<usize>().ok());
    let content = ev.eval_children(el, ctx).trim().to_string();
    let kb = &ctx.kb;

    match op {
        CollectionOp::Add | CollectionOp::Insert | CollectionOp::Set => {
            kb.set_add(&name, &content);
            String::new()
        }
        CollectionOp::Remove => {
            kb.set_remove_value(&name, &content);
            String::new()
        }
        CollectionOp::Clear => {
            kb.set_clear(&name);
            String::new()
        }
        CollectionOp::Size => kb.set_len(&name).to_string(),
        CollectionOp::Contains => kb.set_contains(&name, &content).to_string(),
        CollectionOp::Get => index.and_then(|at| kb.set_get(&name, at)).unwrap_or_default(),
    }
}
