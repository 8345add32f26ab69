//! Control tags: uniform random choice, conditionals and silent evaluation.
//!
//! These handlers receive raw child nodes rather than pre-evaluated content,
//! because they must control which children run: `random` evaluates only the
//! chosen item, so side effects in unchosen branches never fire, and
//! `condition` evaluates only the first matching item.

use rand::Rng;

use crate::ast::{Element, Node};

use super::context::EvalContext;
use super::evaluator::Evaluator;

fn list_items(el: &Element) -> Vec<&Element> {
    el.children
        .iter()
        .filter_map(|node| match node {
            Node::Element(item) if item.name.eq_ignore_ascii_case("li") => Some(item),
            _ => None,
        })
        .collect()
}

pub(crate) fn eval_random(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let items = list_items(el);
    if items.is_empty() {
        return String::new();
    }
    let choice = rand::thread_rng().gen_range(0..items.len());
    ev.eval_children(items[choice], ctx)
}

/// Evaluates children for their side effects and emits nothing.
pub(crate) fn eval_think(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let _ = ev.eval_children(el, ctx);
    String::new()
}

/// Conditional in three forms: a single predicate+value test, a predicate
/// with value-keyed list items plus one default item, and a bare predicate
/// truth test. Items are tried top to bottom, first match wins; an unset
/// predicate and a value with no matching item both take the default item.
pub(crate) fn eval_condition(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let items = list_items(el);
    if !items.is_empty() {
        for item in &items {
            let Some(wanted) = ev.eval_attr(item, "value", ctx) else {
                continue;
            };
            let predicate = item_predicate(ev, item, el, ctx);
            if value_matches(predicate.as_deref(), &wanted) {
                return ev.eval_children(item, ctx);
            }
        }
        if let Some(default_item) = items.iter().find(|item| item.attr("value").is_none()) {
            return ev.eval_children(default_item, ctx);
        }
        return String::new();
    }

    let predicate = predicate_of(ev, el, ctx);
    match ev.eval_attr(el, "value", ctx) {
        Some(wanted) => {
            if value_matches(predicate.as_deref(), &wanted) {
                ev.eval_children(el, ctx)
            } else {
                String::new()
            }
        }
        // Bare truth test: any non-empty predicate value.
        None => {
            if predicate.is_some_and(|p| !p.trim().is_empty()) {
                ev.eval_children(el, ctx)
            } else {
                String::new()
            }
        }
    }
}

fn predicate_of(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> Option<String> {
    if let Some(var_name) = ev.eval_attr(el, "var", ctx) {
        return ctx.locals.get(&var_name).cloned();
    }
    let name = ev.eval_attr(el, "name", ctx)?;
    ctx.lookup(&name)
}

/// An item may carry its own predicate attributes; otherwise the enclosing
/// condition's apply.
fn item_predicate(
    ev: &Evaluator,
    item: &Element,
    condition: &Element,
    ctx: &mut EvalContext,
) -> Option<String> {
    if item.attr("name").is_some() || item.attr("var").is_some() {
        predicate_of(ev, item, ctx)
    } else {
        predicate_of(ev, condition, ctx)
    }
}

fn value_matches(predicate: Option<&str>, wanted: &str) -> bool {
    match predicate {
        // `*` matches any set predicate.
        Some(p) if wanted == "*" => !p.trim().is_empty(),
        Some(p) => p.trim().eq_ignore_ascii_case(wanted.trim()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use crate::eval::evaluator::tests::eval;
    use crate::knowledge::KnowledgeBase;
    use crate::session::Session;

    use super::super::context::EvalContext;

    fn context() -> EvalContext {
        EvalContext::new(Arc::new(KnowledgeBase::new()))
            .with_session(Arc::new(Session::with_id("s1")))
    }

    #[test]
    fn test_random_covers_all_items_and_leaks_no_markup() {
        let mut ctx = context();
        let template = "<random><li>a</li><li>b</li><li>c</li></random>";
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let out = eval(template, &mut ctx);
            assert!(["a", "b", "c"].contains(&out.as_str()), "leaked: {:?}", out);
            seen.insert(out);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_random_evaluates_chosen_item_children() {
        let mut ctx = context();
        let out = eval(
            "<random><li><uppercase>only</uppercase></li></random>",
            &mut ctx,
        );
        assert_eq!(out, "ONLY");
    }

    #[test]
    fn test_think_is_silent_but_effective() {
        let mut ctx = context();
        assert_eq!(
            eval(r#"<think><set name="x">hi</set></think><get name="x"/>"#, &mut ctx),
            "hi"
        );
    }

    #[test]
    fn test_condition_single_test() {
        let mut ctx = context();
        eval(r#"<set name="mood">happy</set>"#, &mut ctx);
        assert_eq!(
            eval(r#"<condition name="mood" value="happy">grin</condition>"#, &mut ctx),
            "grin"
        );
        assert_eq!(
            eval(r#"<condition name="mood" value="sad">frown</condition>"#, &mut ctx),
            ""
        );
    }

    #[test]
    fn test_condition_list_selects_by_value() {
        let mut ctx = context();
        let template = r#"<condition name="weather"><li value="sunny">shades</li><li value="rainy">umbrella</li><li>whatever</li></condition>"#;

        eval(r#"<set name="weather">rainy</set>"#, &mut ctx);
        assert_eq!(eval(template, &mut ctx), "umbrella");

        // No matching item takes the default.
        eval(r#"<set name="weather">cloudy</set>"#, &mut ctx);
        assert_eq!(eval(template, &mut ctx), "whatever");
    }

    #[test]
    fn test_condition_unset_predicate_takes_default() {
        let mut ctx = context();
        let template = r#"<condition name="nothing"><li value="x">a</li><li>fallback</li></condition>"#;
        assert_eq!(eval(template, &mut ctx), "fallback");
    }

    #[test]
    fn test_condition_star_matches_any_set_value() {
        let mut ctx = context();
        let template = r#"<condition name="mood"><li value="*">set</li><li>unset</li></condition>"#;
        assert_eq!(eval(template, &mut ctx), "unset");
        eval(r#"<set name="mood">odd</set>"#, &mut ctx);
        assert_eq!(eval(template, &mut ctx), "set");
    }

    #[test]
    fn test_condition_truth_test() {
        let mut ctx = context();
        assert_eq!(eval(r#"<condition name="flag">yes</condition>"#, &mut ctx), "");
        eval(r#"<set name="flag">1</set>"#, &mut ctx);
        assert_eq!(eval(r#"<condition name="flag">yes</condition>"#, &mut ctx), "yes");
    }

    #[test]
    fn test_condition_items_with_own_predicates() {
        let mut ctx = context();
        eval(r#"<set name="b">2</set>"#, &mut ctx);
        let template = r#"<condition><li name="a" value="1">first</li><li name="b" value="2">second</li><li>none</li></condition>"#;
        assert_eq!(eval(template, &mut ctx), "second");
    }

    #[test]
    fn test_condition_matches_case_insensitively() {
        let mut ctx = context();
        eval(r#"<set name="mood">Happy</set>"#, &mut ctx);
        assert_eq!(
            eval(r#"<condition name="mood" value="happy">grin</condition>"#, &mut ctx),
            "grin"
        );
    }
}
