//! System lookups: formatted current date, knowledge-base size, and the
//! program identity.

use chrono::Local;
use chrono::format::{Item, StrftimeItems};

use crate::ast::Element;

use super::context::EvalContext;
use super::evaluator::Evaluator;

const DEFAULT_DATE_FORMAT: &str = "%B %d, %Y";

/// Formats the current local date. A `format` attribute supplies a strftime
/// string; an invalid format falls back to the default instead of failing.
pub(crate) fn eval_date(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let format = ev
        .eval_attr(el, "format", ctx)
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());
    let items: Vec<Item> = StrftimeItems::new(&format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        tracing::debug!(%format, "invalid date format, using default");
        return Local::now().format(DEFAULT_DATE_FORMAT).to_string();
    }
    Local::now().format_with_items(items.into_iter()).to_string()
}

pub(crate) fn eval_size(_ev: &Evaluator, _el: &Element, ctx: &mut EvalContext) -> String {
    ctx.kb.category_count().to_string()
}

pub(crate) fn eval_version(_ev: &Evaluator, _el: &Element, _ctx: &mut EvalContext) -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn eval_program(_ev: &Evaluator, _el: &Element, ctx: &mut EvalContext) -> String {
    let name = ctx
        .kb
        .property("name")
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
    format!("{} {}", name, env!("CARGO_PKG_VERSION"))
}
