//! The outbound-request tag. The evaluated body is handed to the
//! [`crate::bridge::ServiceBridge`] collaborator together with an ancillary
//! parameter map (evaluated non-reserved attributes plus the session
//! variables named in the configuration) and the configured timeout.
//!
//! Failures never escape: a bridge error, a timeout or an absent bridge all
//! fall back to the evaluated `default` attribute, then the configured
//! fallback text, then the evaluated content itself. No knowledge-base lock
//! is held here; the bridge call is the only blocking point in the core.

use std::collections::HashMap;

use crate::ast::Element;

use super::context::EvalContext;
use super::evaluator::Evaluator;

pub(crate) fn eval_sraix(ev: &Evaluator, el: &Element, ctx: &mut EvalContext) -> String {
    let service = ev.eval_attr(el, "service", ctx).unwrap_or_default();
    let content = ev.eval_children(el, ctx).trim().to_string();

    let mut params = HashMap::new();
    let attr_names: Vec<String> = el.attrs.iter().map(|attr| attr.name.clone()).collect();
    for attr_name in attr_names {
        let key = attr_name.to_lowercase();
        if key == "service" || key == "default" {
            continue;
        }
        if let Some(value) = ev.eval_attr(el, &attr_name, ctx) {
            params.insert(key, value);
        }
    }
    if let Some(session) = &ctx.session {
        for name in &ev.config.service_params {
            if let Some(value) = session.var(name) {
                params.insert(name.clone(), value);
            }
        }
    }

    let Some(bridge) = &ev.bridge else {
        tracing::debug!(%service, "no service bridge configured");
        return fall_back(ev, el, ctx, content);
    };
    match bridge.call(&service, &content, &params, ev.config.bridge_timeout) {
        Ok(text) => text,
        Err(error) => {
            tracing::warn!(%service, %error, "service bridge call failed");
            fall_back(ev, el, ctx, content)
        }
    }
}

fn fall_back(ev: &Evaluator, el: &Element, ctx: &mut EvalContext, content: String) -> String {
    if let Some(default) = ev.eval_attr(el, "default", ctx) {
        return default;
    }
    if let Some(fallback) = &ev.config.bridge_fallback {
        return fallback.clone();
    }
    content
}
