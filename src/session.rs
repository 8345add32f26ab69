//! # Conversation Session
//!
//! Durable per-conversation state: the predicate variables set by template
//! execution, topic-scoped variables, the active topic, and three bounded
//! histories (requests, responses, and "that", the prior bot utterance used
//! as matching context). Histories are append-only and addressed by 1-based
//! recency index: index 1 is the most recent entry.
//!
//! A session is created on first contact with a conversation identity and is
//! shared as `Arc<Session>`; the interior locks make reads and writes safe,
//! but serializing concurrent turns on the *same* session remains the
//! caller's responsibility; the interpreter takes no per-session lock across
//! a turn.

use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

/// Default bound for each history when none is configured.
pub const DEFAULT_HISTORY_LIMIT: usize = 32;

#[derive(Debug)]
pub struct Session {
    id: String,
    vars: RwLock<HashMap<String, String>>,
    topic_vars: RwLock<HashMap<String, HashMap<String, String>>>,
    topic: RwLock<String>,
    requests: RwLock<VecDeque<String>>,
    responses: RwLock<VecDeque<String>>,
    that: RwLock<VecDeque<String>>,
    capacity: usize,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self::with_capacity(id, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_capacity(id: impl Into<String>, capacity: usize) -> Self {
        Self {
            id: id.into(),
            vars: RwLock::default(),
            topic_vars: RwLock::default(),
            topic: RwLock::default(),
            requests: RwLock::default(),
            responses: RwLock::default(),
            that: RwLock::default(),
            capacity: capacity.max(1),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    // --- predicate variables ---

    pub fn var(&self, name: &str) -> Option<String> {
        read(&self.vars).get(name).cloned()
    }

    pub fn set_var(&self, name: &str, value: &str) {
        write(&self.vars).insert(name.to_string(), value.to_string());
    }

    /// A variable scoped to one topic, visible in the lookup chain only while
    /// that topic is active.
    pub fn topic_var(&self, topic: &str, name: &str) -> Option<String> {
        read(&self.topic_vars)
            .get(topic)
            .and_then(|vars| vars.get(name).cloned())
    }

    pub fn set_topic_var(&self, topic: &str, name: &str, value: &str) {
        write(&self.topic_vars)
            .entry(topic.to_string())
            .or_default()
            .insert(name.to_string(), value.to_string());
    }

    // --- topic ---

    pub fn topic(&self) -> String {
        read(&self.topic).clone()
    }

    pub fn set_topic(&self, topic: &str) {
        *write(&self.topic) = topic.to_string();
    }

    // --- histories ---

    pub fn push_request(&self, text: &str) {
        push_bounded(&self.requests, text, self.capacity);
    }

    pub fn request(&self, index: usize) -> Option<String> {
        recall(&self.requests, index)
    }

    pub fn push_response(&self, text: &str) {
        push_bounded(&self.responses, text, self.capacity);
    }

    pub fn response(&self, index: usize) -> Option<String> {
        recall(&self.responses, index)
    }

    pub fn push_that(&self, text: &str) {
        push_bounded(&self.that, text, self.capacity);
    }

    pub fn that(&self, index: usize) -> Option<String> {
        recall(&self.that, index)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn push_bounded(history: &RwLock<VecDeque<String>>, text: &str, capacity: usize) {
    let mut history = write(history);
    history.push_back(text.to_string());
    while history.len() > capacity {
        history.pop_front();
    }
}

/// 1-based recency lookup: index 1 is the most recent entry. Out of range is
/// `None`, never a failure.
fn recall(history: &RwLock<VecDeque<String>>, index: usize) -> Option<String> {
    let history = read(history);
    history
        .len()
        .checked_sub(index)
        .and_then(|at| history.get(at))
        .cloned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_history_recency_indexing() {
        let session = Session::with_id("s1");
        session.push_request("first");
        session.push_request("second");
        session.push_request("third");

        assert_eq!(session.request(1), Some("third".to_string()));
        assert_eq!(session.request(2), Some("second".to_string()));
        assert_eq!(session.request(3), Some("first".to_string()));
        assert_eq!(session.request(4), None);
        assert_eq!(session.request(0), None);
    }

    #[test]
    fn test_history_is_bounded() {
        let session = Session::with_capacity("s1", 2);
        session.push_response("a");
        session.push_response("b");
        session.push_response("c");

        assert_eq!(session.response(1), Some("c".to_string()));
        assert_eq!(session.response(2), Some("b".to_string()));
        assert_eq!(session.response(3), None);
    }

    #[test]
    fn test_vars_and_topic() {
        let session = Session::with_id("s1");
        assert_eq!(session.var("name"), None);
        session.set_var("name", "Bob");
        assert_eq!(session.var("name"), Some("Bob".to_string()));

        assert_eq!(session.topic(), "");
        session.set_topic("weather");
        assert_eq!(session.topic(), "weather");
    }

    #[test]
    fn test_topic_vars_are_scoped() {
        let session = Session::with_id("s1");
        session.set_topic_var("weather", "mood", "gloomy");
        assert_eq!(
            session.topic_var("weather", "mood"),
            Some("gloomy".to_string())
        );
        assert_eq!(session.topic_var("cooking", "mood"), None);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(Session::new().id(), Session::new().id());
    }
}
