//! Read-only reference tags: wildcard captures by index, history lookups by
//! recency, the active topic, the current input and the session identity.
//!
//! All lookups are tolerant: a missing index, empty history or absent
//! session yields the empty string, never an error.

use crate::ast::Element;

use super::context::EvalContext;
use super::evaluator::Evaluator;

pub(crate) fn eval_star(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let index = ev.attr_index(el, "index", ctx, 1);
    ctx.captures
        .input_capture(index)
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn eval_thatstar(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let index = ev.attr_index(el, "index", ctx, 1);
    ctx.captures
        .that_capture(index)
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn eval_topicstar(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let index = ev.attr_index(el, "index", ctx, 1);
    ctx.captures
        .topic_capture(index)
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn eval_that(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let index = ev.attr_index(el, "index", ctx, 1);
    ctx.session
        .as_ref()
        .and_then(|session| session.that(index))
        .unwrap_or_default()
}

pub(crate) fn eval_request(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let index = ev.attr_index(el, "index", ctx, 1);
    ctx.session
        .as_ref()
        .and_then(|session| session.request(index))
        .unwrap_or_default()
}

pub(crate) fn eval_response(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let index = ev.attr_index(el, "index", ctx, 1);
    ctx.session
        .as_ref()
        .and_then(|session| session.response(index))
        .unwrap_or_default()
}

pub(crate) fn eval_input(_ev: &Evaluator, _el: &Element, ctx: &mut EvalContext) -> String {
    ctx.input.clone()
}

pub(crate) fn eval_topic(_ev: &Evaluator, _el: &Element, ctx: &mut EvalContext) -> String {
    ctx.topic()
}

pub(crate) fn eval_id(_ev: &Evaluator, _el: &Element, ctx: &mut EvalContext) -> String {
    ctx.session
        .as_ref()
        .map(|session| session.id().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use crate::eval::evaluator::tests::eval;
    use crate::knowledge::KnowledgeBase;
    use crate::matcher::Captures;
    use crate::session::Session;

    use super::super::context::EvalContext;

    fn context() -> EvalContext {
        let session = Session::with_id("session-7");
        session.push_request("how are you");
        session.push_request("tell me more");
        session.push_response("I am well.");
        session.push_that("I am well");
        EvalContext::new(Arc::new(KnowledgeBase::new()))
            .with_session(Arc::new(session))
            .with_captures(Captures {
                input: vec!["Bob".to_string(), "Smith".to_string()],
                that: vec!["tea".to_string()],
                topic: vec!["rain".to_string()],
            })
            .with_input("tell me more")
    }

    #[test]
    fn test_star_defaults_to_first_capture() {
        let mut ctx = context();
        assert_eq!(eval("<star/>", &mut ctx), "Bob");
        assert_eq!(eval("<star index=\"2\"/>", &mut ctx), "Smith");
        assert_eq!(eval("<star index=\"9\"/>", &mut ctx), "");
    }

    #[test]
    fn test_context_capture_lanes() {
        let mut ctx = context();
        assert_eq!(eval("<thatstar/>", &mut ctx), "tea");
        assert_eq!(eval("<topicstar/>", &mut ctx), "rain");
    }

    #[test]
    fn test_history_lookups_are_recency_indexed() {
        let mut ctx = context();
        assert_eq!(eval("<request/>", &mut ctx), "tell me more");
        assert_eq!(eval("<request index=\"2\"/>", &mut ctx), "how are you");
        assert_eq!(eval("<response/>", &mut ctx), "I am well.");
        assert_eq!(eval("<that/>", &mut ctx), "I am well");
        // Beyond the history length: empty, never out-of-bounds.
        assert_eq!(eval("<request index=\"3\"/>", &mut ctx), "");
    }

    #[test]
    fn test_input_and_id() {
        let mut ctx = context();
        assert_eq!(eval("<input/>", &mut ctx), "tell me more");
        assert_eq!(eval("<id/>", &mut ctx), "session-7");
    }

    #[test]
    fn test_without_session_everything_is_empty() {
        let mut ctx = EvalContext::new(Arc::new(KnowledgeBase::new()));
        assert_eq!(eval("<that/><request/><response/><id/>", &mut ctx), "");
    }

    #[test]
    fn test_malformed_index_uses_default() {
        let mut ctx = context();
        assert_eq!(eval("<star index=\"soon\"/>", &mut ctx), "Bob");
    }
}
