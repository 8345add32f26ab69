//! Runtime evaluation context.
//!
//! The transient bundle of scope and state threaded through one template
//! evaluation: the knowledge-base handle, an optional conversation session,
//! template-local variables, the wildcard captures of the match that selected
//! the template, the current normalized input, and the recursion depth.
//!
//! A context is constructed fresh for each top-level evaluation. Recursive
//! re-entry does not build a new context: the reduction tag swaps captures
//! and bumps the depth in place, then restores both on return, so locals and
//! the session are naturally shared with nested evaluations but never leak
//! across sibling top-level turns.

use std::collections::HashMap;
use std::sync::Arc;

use crate::knowledge::KnowledgeBase;
use crate::matcher::Captures;
use crate::session::Session;

#[derive(Clone)]
pub struct EvalContext {
    pub kb: Arc<KnowledgeBase>,
    pub session: Option<Arc<Session>>,
    /// Template-local variables (`var`-addressed); not persisted beyond this
    /// evaluation and its nested recursive calls.
    pub locals: HashMap<String, String>,
    pub captures: Captures,
    /// The current normalized input, exposed by the `input` tag.
    pub input: String,
    pub depth: usize,
}

impl EvalContext {
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self {
            kb,
            session: None,
            locals: HashMap::new(),
            captures: Captures::default(),
            input: String::new(),
            depth: 0,
        }
    }

    pub fn with_session(mut self, session: Arc<Session>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_captures(mut self, captures: Captures) -> Self {
        self.captures = captures;
        self
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    /// The active topic, empty when no session is attached.
    pub fn topic(&self) -> String {
        self.session
            .as_ref()
            .map(|session| session.topic())
            .unwrap_or_default()
    }

    /// Ordered lookup chain for `name`-addressed variables: template-local
    /// scope, session predicates, topic-scoped variables of the active
    /// topic, knowledge-base globals, bot properties.
    pub fn lookup(&self, name: &str) -> Option<String> {
        if let Some(value) = self.locals.get(name) {
            return Some(value.clone());
        }
        if let Some(session) = &self.session {
            if name == "topic" {
                let topic = session.topic();
                if !topic.is_empty() {
                    return Some(topic);
                }
            }
            if let Some(value) = session.var(name) {
                return Some(value);
            }
            let topic = session.topic();
            if !topic.is_empty() {
                if let Some(value) = session.topic_var(&topic, name) {
                    return Some(value);
                }
            }
        }
        if let Some(value) = self.kb.global(name) {
            return Some(value);
        }
        self.kb.property(name)
    }

    /// Stores a session-scoped predicate; without a session the value lands
    /// in the local scope so templates stay evaluable standalone. Setting
    /// `topic` switches the active topic.
    pub fn set_session_var(&mut self, name: &str, value: &str) {
        match &self.session {
            Some(session) if name == "topic" => session.set_topic(value),
            Some(session) => session.set_var(name, value),
            None => {
                self.locals.insert(name.to_string(), value.to_string());
            }
        }
    }

    /// Stores a variable under the active topic's scope; with no session or
    /// no active topic this degrades to the session/local store.
    pub fn set_topic_var(&mut self, name: &str, value: &str) {
        let topic = self.topic();
        match &self.session {
            Some(session) if !topic.is_empty() => session.set_topic_var(&topic, name, value),
            _ => self.set_session_var(name, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn context_with_session() -> EvalContext {
        EvalContext::new(Arc::new(KnowledgeBase::new()))
            .with_session(Arc::new(Session::with_id("s1")))
    }

    #[test]
    fn test_lookup_prefers_locals() {
        let mut ctx = context_with_session();
        ctx.set_session_var("color", "red");
        ctx.locals.insert("color".to_string(), "green".to_string());
        assert_eq!(ctx.lookup("color"), Some("green".to_string()));
    }

    #[test]
    fn test_lookup_falls_through_to_globals_and_properties() {
        let ctx = context_with_session();
        ctx.kb.set_property("color", "white");
        assert_eq!(ctx.lookup("color"), Some("white".to_string()));
        ctx.kb.set_global("color", "blue");
        assert_eq!(ctx.lookup("color"), Some("blue".to_string()));
    }

    #[test]
    fn test_topic_scoped_variables_follow_active_topic() {
        let mut ctx = context_with_session();
        ctx.set_session_var("topic", "weather");
        ctx.set_topic_var("mood", "gloomy");
        assert_eq!(ctx.lookup("mood"), Some("gloomy".to_string()));

        ctx.set_session_var("topic", "cooking");
        assert_eq!(ctx.lookup("mood"), None);
    }

    #[test]
    fn test_set_without_session_lands_in_locals() {
        let mut ctx = EvalContext::new(Arc::new(KnowledgeBase::new()));
        ctx.set_session_var("name", "Bob");
        assert_eq!(ctx.locals.get("name"), Some(&"Bob".to_string()));
        assert_eq!(ctx.lookup("name"), Some("Bob".to_string()));
    }

    #[test]
    fn test_topic_name_reads_active_topic() {
        let mut ctx = context_with_session();
        ctx.set_session_var("topic", "weather");
        assert_eq!(ctx.lookup("topic"), Some("weather".to_string()));
    }
}
