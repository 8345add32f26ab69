//! # Tree-Walking Interpreter
//!
//! Walks a parsed template and produces the response text. Dispatch is by
//! tag name through the closed [`TagKind`] enumeration; a name outside the
//! vocabulary falls through to the literal-preservation default, which
//! re-emits the tag around its evaluated children so rule files written for
//! a newer vocabulary keep round-tripping.
//!
//! The general rule is depth-first: children evaluate to strings which are
//! concatenated before the parent tag's own behavior runs. Four tags manage
//! their own children instead: `random` and `condition` choose *which*
//! children run, and the two learning tags consume their children as a rule
//! fragment, not as output. Handlers return plain strings: a tag that cannot
//! produce a meaningful result yields the empty string or its literal input,
//! never an error, so no single tag can abort the surrounding evaluation.

use std::str::FromStr;
use std::sync::Arc;

use crate::ast::{Element, Node};
use crate::bridge::{CategoryStore, ServiceBridge};
use crate::config::EngineConfig;
use crate::preprocessor::Normalizer;

use super::context::EvalContext;
use super::{
    collections, control, learning, reference, service, system, transform, variables,
};

/// The closed tag vocabulary.
///
/// `strum` gives the lowercase name mapping; dispatch is case-insensitive.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TagKind {
    // References into captures, history and the current turn.
    Star,
    Thatstar,
    Topicstar,
    That,
    Request,
    Response,
    Input,
    Topic,
    Id,
    // Variables.
    Get,
    Set,
    Bot,
    // Control.
    Random,
    Condition,
    Think,
    // Recursive reduction and the service bridge.
    Srai,
    Sr,
    Sraix,
    // Learning.
    Learn,
    Learnf,
    // Named collections.
    Map,
    List,
    Array,
    Uniq,
    // Pure text transforms.
    Uppercase,
    Lowercase,
    Formal,
    Sentence,
    Reverse,
    Acronym,
    Substring,
    Replace,
    Length,
    Split,
    Join,
    Dedup,
    Indent,
    Explode,
    First,
    Rest,
    Trim,
    Person,
    Person2,
    Gender,
    // System lookups.
    Date,
    Size,
    Version,
    Program,
}

pub struct Evaluator {
    pub(crate) config: Arc<EngineConfig>,
    pub(crate) normalizer: Arc<Normalizer>,
    pub(crate) bridge: Option<Arc<dyn ServiceBridge>>,
    pub(crate) store: Option<Arc<dyn CategoryStore>>,
}

impl Evaluator {
    pub fn new(config: Arc<EngineConfig>, normalizer: Arc<Normalizer>) -> Self {
        Self {
            config,
            normalizer,
            bridge: None,
            store: None,
        }
    }

    /// Evaluates a template and applies the whitespace policy to the result.
    #[tracing::instrument(level = "debug", skip(self, nodes, ctx))]
    pub fn evaluate(&self, nodes: &[Node], ctx: &mut EvalContext) -> String {
        finalize(self.eval_nodes(nodes, ctx))
    }

    pub(crate) fn eval_nodes(&self, nodes: &[Node], ctx: &mut EvalContext) -> String {
        let mut out = String::new();
        for node in nodes {
            out.push_str(&self.eval_node(node, ctx));
        }
        out
    }

    fn eval_node(&self, node: &Node, ctx: &mut EvalContext) -> String {
        match node {
            Node::Text(text) => text.clone(),
            Node::Comment(_) => String::new(),
            Node::Data(content) => content.clone(),
            Node::Element(element) => self.eval_element(element, ctx),
        }
    }

    pub(crate) fn eval_element(&self, el: &Element, ctx: &mut EvalContext) -> String {
        match TagKind::from_str(&el.name) {
            Ok(kind) => self.dispatch(kind, el, ctx),
            Err(_) => self.eval_unknown(el, ctx),
        }
    }

    fn dispatch(&self, kind: TagKind, el: &Element, ctx: &mut EvalContext) -> String {
        match kind {
            TagKind::Star => reference::eval_star(self, el, ctx),
            TagKind::Thatstar => reference::eval_thatstar(self, el, ctx),
            TagKind::Topicstar => reference::eval_topicstar(self, el, ctx),
            TagKind::That => reference::eval_that(self, el, ctx),
            TagKind::Request => reference::eval_request(self, el, ctx),
            TagKind::Response => reference::eval_response(self, el, ctx),
            TagKind::Input => reference::eval_input(self, el, ctx),
            TagKind::Topic => reference::eval_topic(self, el, ctx),
            TagKind::Id => reference::eval_id(self, el, ctx),
            TagKind::Get => variables::eval_get(self, el, ctx),
            TagKind::Set => variables::eval_set(self, el, ctx),
            TagKind::Bot => variables::eval_bot(self, el, ctx),
            TagKind::Random => control::eval_random(self, el, ctx),
            TagKind::Condition => control::eval_condition(self, el, ctx),
            TagKind::Think => control::eval_think(self, el, ctx),
            TagKind::Srai => self.eval_srai(el, ctx),
            TagKind::Sr => self.eval_sr(el, ctx),
            TagKind::Sraix => service::eval_sraix(self, el, ctx),
            TagKind::Learn => learning::eval_learn(self, el, ctx),
            TagKind::Learnf => learning::eval_learnf(self, el, ctx),
            TagKind::Map => collections::eval_map(self, el, ctx),
            TagKind::List => collections::eval_list(self, el, ctx),
            TagKind::Array => collections::eval_array(self, el, ctx),
            TagKind::Uniq => collections::eval_uniq(self, el, ctx),
            TagKind::Uppercase => transform::eval_uppercase(self, el, ctx),
            TagKind::Lowercase => transform::eval_lowercase(self, el, ctx),
            TagKind::Formal => transform::eval_formal(self, el, ctx),
            TagKind::Sentence => transform::eval_sentence(self, el, ctx),
            TagKind::Reverse => transform::eval_reverse(self, el, ctx),
            TagKind::Acronym => transform::eval_acronym(self, el, ctx),
            TagKind::Substring => transform::eval_substring(self, el, ctx),
            TagKind::Replace => transform::eval_replace(self, el, ctx),
            TagKind::Length => transform::eval_length(self, el, ctx),
            TagKind::Split => transform::eval_split(self, el, ctx),
            TagKind::Join => transform::eval_join(self, el, ctx),
            TagKind::Dedup => transform::eval_dedup(self, el, ctx),
            TagKind::Indent => transform::eval_indent(self, el, ctx),
            TagKind::Explode => transform::eval_explode(self, el, ctx),
            TagKind::First => transform::eval_first(self, el, ctx),
            TagKind::Rest => transform::eval_rest(self, el, ctx),
            TagKind::Trim => transform::eval_trim(self, el, ctx),
            TagKind::Person => transform::eval_person(self, el, ctx),
            TagKind::Person2 => transform::eval_person2(self, el, ctx),
            TagKind::Gender => transform::eval_gender(self, el, ctx),
            TagKind::Date => system::eval_date(self, el, ctx),
            TagKind::Size => system::eval_size(self, el, ctx),
            TagKind::Version => system::eval_version(self, el, ctx),
            TagKind::Program => system::eval_program(self, el, ctx),
        }
    }

    /// Literal preservation: the tag is re-emitted around its evaluated
    /// children, keeping forward compatibility with newer vocabularies.
    fn eval_unknown(&self, el: &Element, ctx: &mut EvalContext) -> String {
        if el.self_closing {
            return el.to_string();
        }
        let inner = self.eval_children(el, ctx);
        format!("{}{}</{}>", el.open_markup(), inner, el.name)
    }

    /// Depth-first evaluation of a tag's children.
    pub(crate) fn eval_children(&self, el: &Element, ctx: &mut EvalContext) -> String {
        self.eval_nodes(&el.children, ctx)
    }

    /// Evaluates an attribute's sub-tree on demand; `None` when the
    /// attribute is absent.
    pub(crate) fn eval_attr(&self, el: &Element, name: &str, ctx: &mut EvalContext) -> Option<String> {
        let attr = el.attr(name)?;
        Some(self.eval_nodes(&attr.value, ctx).trim().to_string())
    }

    /// A 1-based index attribute; malformed or absent values use the
    /// default rather than failing.
    pub(crate) fn attr_index(
        &self,
        el: &Element,
        name: &str,
        ctx: &mut EvalContext,
        default: usize,
    ) -> usize {
        self.eval_attr(el, name, ctx)
            .and_then(|text| text.parse().ok())
            .unwrap_or(default)
    }

    fn eval_srai(&self, el: &Element, ctx: &mut EvalContext) -> String {
        let content = self.eval_children(el, ctx);
        self.reduce(&content, ctx)
    }

    /// `sr` is shorthand for reducing the first wildcard capture.
    fn eval_sr(&self, _el: &Element, ctx: &mut EvalContext) -> String {
        let capture = ctx.captures.input_capture(1).unwrap_or_default().to_string();
        self.reduce(&capture, ctx)
    }

    /// Recursive reduction: re-submits `text` as a brand-new input to the
    /// matcher and evaluates the winning template in place.
    ///
    /// The depth ceiling and the no-match case both degrade to returning the
    /// text itself, so reduction chains always terminate with a string.
    /// Captures and input are swapped for the nested evaluation and restored
    /// on return; locals and the session remain shared.
    #[tracing::instrument(level = "debug", skip(self, ctx))]
    pub fn reduce(&self, text: &str, ctx: &mut EvalContext) -> String {
        let text = text.trim();
        if ctx.depth >= self.config.recursion_limit {
            tracing::debug!(depth = ctx.depth, "recursion ceiling reached");
            return text.to_string();
        }

        let input = self.normalizer.tokenize(text);
        let that = ctx
            .session
            .as_ref()
            .and_then(|session| session.that(1))
            .map(|that| self.normalizer.tokenize(&that))
            .unwrap_or_default();
        let topic = self.normalizer.tokenize(&ctx.topic());

        let Some(matched) = ctx.kb.find_match(&input, &that, &topic) else {
            return text.to_string();
        };
        let nodes = match matched.category.nodes() {
            Ok(nodes) => nodes,
            Err(error) => {
                tracing::warn!(
                    pattern = matched.category.pattern().raw(),
                    %error,
                    "template of reduced match failed to parse"
                );
                return text.to_string();
            }
        };

        let saved_captures = std::mem::replace(&mut ctx.captures, matched.captures.clone());
        let saved_input = std::mem::replace(&mut ctx.input, input.join(" "));
        ctx.depth += 1;
        let result = self.eval_nodes(nodes, ctx);
        ctx.depth -= 1;
        ctx.input = saved_input;
        ctx.captures = saved_captures;

        finalize(result)
    }
}

/// Whitespace policy for evaluation results: trailing whitespace is always
/// trimmed; leading whitespace only when the very first character is a line
/// break, which distinguishes deliberate indentation output from
/// template-authoring formatting.
pub(crate) fn finalize(text: String) -> String {
    let leading_break = matches!(text.chars().next(), Some('\n') | Some('\r'));
    let trimmed = if leading_break {
        text.trim()
    } else {
        text.trim_end()
    };
    trimmed.to_string()
}
