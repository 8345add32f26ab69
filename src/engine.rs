//! # Engine
//!
//! The façade wiring the pipeline together: input text → preprocessor →
//! pattern matcher → template parser → tree-walking interpreter → response.
//!
//! [`Engine::process_input`] is the single top-level entry point combining
//! match, evaluation and the history update for one conversational turn.
//! [`Engine::process_template`] exposes evaluation alone for callers that
//! already hold a matched rule: the learning path, the shorthand reduction
//! tag, and test harnesses.
//!
//! The only error surfaced to callers is a matched template that fails to
//! parse, reported together with the matched pattern so the caller can log
//! it and select a fallback response. No match is not an error: the
//! configured default response is produced instead.

use std::sync::Arc;

use thiserror::Error;

use crate::bridge::{CategoryStore, ServiceBridge};
use crate::config::EngineConfig;
use crate::eval::{EvalContext, Evaluator};
use crate::knowledge::KnowledgeBase;
use crate::matcher::Captures;
use crate::parser::{self, ParseError};
use crate::preprocessor::Normalizer;
use crate::session::Session;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The matched category's template is malformed beyond the parser's
    /// implicit-close tolerance.
    #[error("template of matched pattern {pattern:?} failed to parse: {source}")]
    Template {
        pattern: String,
        #[source]
        source: ParseError,
    },
}

pub struct Engine {
    kb: Arc<KnowledgeBase>,
    config: Arc<EngineConfig>,
    normalizer: Arc<Normalizer>,
    evaluator: Evaluator,
}

/// Builder for an [`Engine`]; the knowledge base is the only required part.
#[derive(Default)]
pub struct EngineBuilder {
    kb: Option<Arc<KnowledgeBase>>,
    config: EngineConfig,
    bridge: Option<Arc<dyn ServiceBridge>>,
    store: Option<Arc<dyn CategoryStore>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn knowledge_base(mut self, kb: Arc<KnowledgeBase>) -> Self {
        self.kb = Some(kb);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bridge(mut self, bridge: Arc<dyn ServiceBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn store(mut self, store: Arc<dyn CategoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Engine {
        let kb = self.kb.unwrap_or_default();
        let config = Arc::new(self.config);
        let normalizer = Arc::new(Normalizer::new());
        let mut evaluator = Evaluator::new(config.clone(), normalizer.clone());
        evaluator.bridge = self.bridge;
        evaluator.store = self.store;
        Engine {
            kb,
            config,
            normalizer,
            evaluator,
        }
    }
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// An engine over an existing knowledge base with default configuration
    /// and no collaborators.
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self::builder().knowledge_base(kb).build()
    }

    pub fn knowledge_base(&self) -> Arc<KnowledgeBase> {
        self.kb.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A session sized to the configured history bound.
    pub fn new_session(&self, id: impl Into<String>) -> Arc<Session> {
        Arc::new(Session::with_capacity(id, self.config.history_limit))
    }

    /// One conversational turn: normalize, match, evaluate, update history.
    ///
    /// Histories are appended after evaluation completes, so reference tags
    /// inside the template still see the previous turn. A turn that fails
    /// (template parse error) appends nothing and leaves the session as it
    /// was.
    #[tracing::instrument(level = "debug", skip(self, session))]
    pub fn process_input(
        &self,
        input: &str,
        session: &Arc<Session>,
    ) -> Result<String, EngineError> {
        let input_tokens = self.normalizer.tokenize(input);
        let that_tokens = session
            .that(1)
            .map(|that| self.normalizer.tokenize(&that))
            .unwrap_or_default();
        let topic_tokens = self.normalizer.tokenize(&session.topic());

        let response = match self.kb.find_match(&input_tokens, &that_tokens, &topic_tokens) {
            None => {
                tracing::debug!("no qualifying category");
                self.config.default_response.clone()
            }
            Some(matched) => {
                let nodes = matched.category.nodes().map_err(|source| {
                    EngineError::Template {
                        pattern: matched.category.pattern().raw().to_string(),
                        source,
                    }
                })?;
                let mut ctx = EvalContext::new(self.kb.clone())
                    .with_session(session.clone())
                    .with_captures(matched.captures.clone())
                    .with_input(input_tokens.join(" "));
                self.evaluator.evaluate(nodes, &mut ctx)
            }
        };

        session.push_request(input.trim());
        session.push_response(&response);
        session.push_that(&self.normalizer.last_sentence(&response).unwrap_or_default());
        Ok(response)
    }

    /// Evaluates markup directly against the given captures and optional
    /// session; malformed markup yields the empty string.
    #[tracing::instrument(level = "debug", skip(self, captures, session))]
    pub fn process_template(
        &self,
        markup: &str,
        captures: &Captures,
        session: Option<Arc<Session>>,
    ) -> String {
        let nodes = match parser::parse(markup) {
            Ok(nodes) => nodes,
            Err(error) => {
                tracing::warn!(%error, "template markup failed to parse");
                return String::new();
            }
        };
        let mut ctx = EvalContext::new(self.kb.clone()).with_captures(captures.clone());
        if let Some(session) = session {
            ctx = ctx.with_session(session);
        }
        self.evaluator.evaluate(&nodes, &mut ctx)
    }
}
