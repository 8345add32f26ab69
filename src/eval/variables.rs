//! Variable tags.
//!
//! `var`-addressed reads and writes stay in the template-local scope;
//! `name`-addressed reads walk the full chain (locals, session predicates,
//! topic-scoped variables, knowledge-base globals, bot properties) and fall
//! back to the tag's literal default content when nothing is found. `set`
//! always returns the empty string; an optional `scope` attribute routes the
//! write (`local`, `session`, `topic`, `global`), and setting `topic`
//! switches the active topic.

use crate::ast::Element;

use super::context::EvalContext;
use super::evaluator::Evaluator;

pub(crate) fn eval_get(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    if let Some(var_name) = ev.eval_attr(el, "var", ctx) {
        if let Some(value) = ctx.locals.get(&var_name) {
            return value.clone();
        }
        return ev.eval_children(el, ctx);
    }
    if let Some(name) = ev.eval_attr(el, "name", ctx) {
        if let Some(value) = ctx.lookup(&name) {
            return value;
        }
        return ev.eval_children(el, ctx);
    }
    String::new()
}

pub(crate) fn eval_set(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let value = ev.eval_children(el, ctx).trim().to_string();

    if let Some(var_name) = ev.eval_attr(el, "var", ctx) {
        ctx.locals.insert(var_name, value);
        return String::new();
    }
    let Some(name) = ev.eval_attr(el, "name", ctx) else {
        return String::new();
    };
    match ev
        .eval_attr(el, "scope", ctx)
        .map(|scope| scope.to_lowercase())
        .as_deref()
    {
        Some("local") => {
            ctx.locals.insert(name, value);
        }
        Some("global") => ctx.kb.set_global(&name, &value),
        Some("topic") => ctx.set_topic_var(&name, &value),
        _ => ctx.set_session_var(&name, &value),
    }
    String::new()
}

pub(crate) fn eval_bot(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    ev.eval_attr(el, "name", ctx)
        .and_then(|name| ctx.kb.property(&name))
        .unwrap_or_default()
}
