//! Learning tags: parse a nested rule-definition fragment into new
//! categories and insert them into the knowledge base. `learn` mutates the
//! in-memory base only; `learnf` additionally hands the category to the
//! [`crate::bridge::CategoryStore`] collaborator, whose failures are logged
//! and never abort the in-memory outcome.
//!
//! Learn-time resolution walks the fragment before the category is built:
//! `eval` subtrees evaluate immediately; wildcard references resolve
//! immediately when the current captures hold the addressed index and stay
//! literal otherwise (distinguishing "teach me a fact" flows, where the
//! wildcard is the fact, from flows with nothing captured); history
//! references always stay literal for runtime resolution.

use std::str::FromStr;

use crate::ast::{Element, Node};
use crate::knowledge::Category;

use super::context::EvalContext;
use super::evaluator::{Evaluator, TagKind};

pub(crate) fn eval_learn(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    learn(ev, el, ctx, false)
}

pub(crate) fn eval_learnf(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    learn(ev, el, ctx, true)
}

fn learn(ev: &Evaluator, el: &Element, ctx: &mut EvalContext, persist: bool) -> String {
    for node in &el.children {
        let Node::Element(category_el) = node else {
            continue;
        };
        if !category_el.name.eq_ignore_ascii_case("category") {
            continue;
        }
        learn_category(ev, category_el, ctx, persist);
    }
    String::new()
}

fn learn_category(ev: &Evaluator, el: &Element, ctx: &mut EvalContext, persist: bool) {
    let Some(pattern_el) = child_element(el, "pattern") else {
        tracing::debug!("learn fragment without a pattern, skipped");
        return;
    };
    let Some(template_el) = child_element(el, "template") else {
        tracing::debug!("learn fragment without a template, skipped");
        return;
    };

    let pattern = resolve_fragment(ev, &pattern_el.children, ctx);
    let that = child_element(el, "that").map(|e| resolve_fragment(ev, &e.children, ctx));
    let topic = child_element(el, "topic").map(|e| resolve_fragment(ev, &e.children, ctx));
    let template = resolve_fragment(ev, &template_el.children, ctx);

    let category = Category::with_context(&pattern, that.as_deref(), topic.as_deref(), &template);
    let stored = ctx.kb.add_category(category);
    tracing::debug!(pattern = stored.pattern().raw(), "learned category");

    if persist {
        if let Some(store) = &ev.store {
            if let Err(error) = store.persist(&stored) {
                tracing::warn!(
                    pattern = stored.pattern().raw(),
                    %error,
                    "failed to persist learned category"
                );
            }
        }
    }
}

fn child_element<'a>(el: &'a Element, name: &str) -> Option<&'a Element> {
    el.children.iter().find_map(|node| match node {
        Node::Element(child) if child.name.eq_ignore_ascii_case(name) => Some(child),
        _ => None,
    })
}

/// Learn-time resolution of a rule fragment back to markup text.
fn resolve_fragment(ev: &Evaluator, nodes: &[Node], ctx: &mut EvalContext) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Comment(_) => {}
            Node::Data(_) => out.push_str(&node.to_string()),
            Node::Element(el) => resolve_element(ev, el, ctx, &mut out),
        }
    }
    out.trim().to_string()
}

fn resolve_element(ev: &Evaluator, el: &Element, ctx: &mut EvalContext, out: &mut String) {
    if el.name.eq_ignore_ascii_case("eval") {
        out.push_str(&ev.eval_children(el, ctx));
        return;
    }
    match TagKind::from_str(&el.name) {
        Ok(TagKind::Star) => resolve_capture(ev, el, ctx, out, |ctx, at| {
            ctx.captures.input_capture(at).map(str::to_string)
        }),
        Ok(TagKind::Thatstar) => resolve_capture(ev, el, ctx, out, |ctx, at| {
            ctx.captures.that_capture(at).map(str::to_string)
        }),
        Ok(TagKind::Topicstar) => resolve_capture(ev, el, ctx, out, |ctx, at| {
            ctx.captures.topic_capture(at).map(str::to_string)
        }),
        // History references stay literal for runtime resolution.
        Ok(TagKind::That) | Ok(TagKind::Request) | Ok(TagKind::Response) | Ok(TagKind::Input) => {
            out.push_str(&el.to_string())
        }
        // Everything else stays literal, though wildcard references nested
        // inside still resolve.
        _ => {
            if el.self_closing {
                out.push_str(&el.to_string());
            } else {
                out.push_str(&el.open_markup());
                out.push_str(&resolve_fragment(ev, &el.children, ctx));
                out.push_str(&format!("</{}>", el.name));
            }
        }
    }
}

fn resolve_capture(
    ev: &Evaluator,
    el: &Element,
    ctx: &mut EvalContext,
    out: &mut String,
    capture: impl Fn(&EvalContext, usize) -> Option<String>,
) {
    let at = ev.attr_index(el, "index", ctx, 1);
    match capture(ctx, at) {
        Some(text) => out.push_str(&text),
        None => out.push_str(&el.to_string()),
    }
}
