//! # Knowledge Base
//!
//! Owns the category list and its pattern-trie index, the named mutable
//! collections (maps, lists, arrays, insertion-ordered unique sets), the
//! read-mostly bot properties and the mutable bot-wide globals.
//!
//! The category list and index sit behind a reader/writer lock: many
//! conversations match concurrently under read guards while learning takes
//! the write guard, so a learning mutation never tears an in-flight match.
//! Collections, properties and globals are concurrent maps mutated directly
//! by the collection-operation tags. The knowledge base is always passed by
//! handle through the runtime context, never held as a process-wide
//! singleton, so multiple bases are testable in isolation.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::DashMap;

use crate::ast::Node;
use crate::matcher::{Captures, PatternTrie, SetResolver, input_path};
use crate::parser::{self, ParseError};
use crate::pattern::Pattern;

/// One pattern-to-template rule.
///
/// Immutable once constructed; the knowledge base owns categories behind
/// `Arc` and the matcher and interpreter only borrow. The template is parsed
/// on first evaluation and the outcome, tree or error, is cached, so a
/// malformed template fails identically every turn.
#[derive(Debug)]
pub struct Category {
    pattern: Pattern,
    that: Option<Pattern>,
    topic: Option<Pattern>,
    template: String,
    nodes: OnceLock<Result<Vec<Node>, ParseError>>,
}

impl Category {
    pub fn new(pattern: &str, template: &str) -> Self {
        Self::with_context(pattern, None, None, template)
    }

    pub fn with_context(
        pattern: &str,
        that: Option<&str>,
        topic: Option<&str>,
        template: &str,
    ) -> Self {
        Self {
            pattern: Pattern::parse(pattern),
            that: that.map(Pattern::parse),
            topic: topic.map(Pattern::parse),
            template: template.to_string(),
            nodes: OnceLock::new(),
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn that(&self) -> Option<&Pattern> {
        self.that.as_ref()
    }

    pub fn topic(&self) -> Option<&Pattern> {
        self.topic.as_ref()
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// The parsed template, parsing and caching on first use.
    pub fn nodes(&self) -> Result<&[Node], ParseError> {
        match self.nodes.get_or_init(|| parser::parse(&self.template)) {
            Ok(nodes) => Ok(nodes),
            Err(error) => Err(error.clone()),
        }
    }
}

/// A successful match: the winning category and its wildcard captures.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub category: Arc<Category>,
    pub captures: Captures,
}

#[derive(Debug, Default)]
pub struct KnowledgeBase {
    categories: RwLock<Vec<Arc<Category>>>,
    index: RwLock<PatternTrie>,
    maps: DashMap<String, HashMap<String, String>>,
    lists: DashMap<String, Vec<String>>,
    arrays: DashMap<String, Vec<String>>,
    sets: DashMap<String, Vec<String>>,
    properties: DashMap<String, String>,
    globals: DashMap<String, String>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    // --- categories ---

    pub fn add_category(&self, category: Category) -> Arc<Category> {
        let category = Arc::new(category);
        // Lock order is index before categories throughout, matching
        // `find_match`.
        let mut index = write(&self.index);
        let mut categories = write(&self.categories);
        let at = categories.len();
        categories.push(category.clone());
        index.insert(at, category.pattern(), category.that(), category.topic());
        category
    }

    /// Removes categories whose pattern (and context patterns) equal the
    /// given ones exactly. Returns whether anything was removed.
    pub fn remove_category(
        &self,
        pattern: &str,
        that: Option<&str>,
        topic: Option<&str>,
    ) -> bool {
        let pattern = Pattern::parse(pattern).canonical();
        let that = that.map(|t| Pattern::parse(t).canonical());
        let topic = topic.map(|t| Pattern::parse(t).canonical());

        let mut index = write(&self.index);
        let mut categories = write(&self.categories);
        let before = categories.len();
        categories.retain(|category| {
            category.pattern().canonical() != pattern
                || category.that().map(|t| t.canonical()) != that
                || category.topic().map(|t| t.canonical()) != topic
        });
        if categories.len() == before {
            return false;
        }

        *index = PatternTrie::new();
        for (at, category) in categories.iter().enumerate() {
            index.insert(at, category.pattern(), category.that(), category.topic());
        }
        true
    }

    /// Exact-pattern lookup, used by the loader and learning paths.
    pub fn find_category(&self, pattern: &str) -> Option<Arc<Category>> {
        let wanted = Pattern::parse(pattern).canonical();
        read(&self.categories)
            .iter()
            .find(|category| category.pattern().canonical() == wanted)
            .cloned()
    }

    pub fn category_count(&self) -> usize {
        read(&self.categories).len()
    }

    /// Selects the best-matching category for a normalized input and its
    /// conversational context. `None` is a normal outcome.
    #[tracing::instrument(level = "debug", skip(self, input, that, topic))]
    pub fn find_match(
        &self,
        input: &[String],
        that: &[String],
        topic: &[String],
    ) -> Option<MatchResult> {
        let path = input_path(input, that, topic);
        let index = read(&self.index);
        let (at, captures) = index.matches(&path, self)?;
        let category = read(&self.categories).get(at)?.clone();
        Some(MatchResult { category, captures })
    }

    // --- maps ---

    pub fn map_set(&self, map: &str, key: &str, value: &str) {
        self.maps
            .entry(map.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    pub fn map_get(&self, map: &str, key: &str) -> Option<String> {
        self.maps.get(map).and_then(|m| m.get(key).cloned())
    }

    pub fn map_remove(&self, map: &str, key: &str) {
        if let Some(mut m) = self.maps.get_mut(map) {
            m.remove(key);
        }
    }

    pub fn map_contains(&self, map: &str, key: &str) -> bool {
        self.maps.get(map).is_some_and(|m| m.contains_key(key))
    }

    pub fn map_clear(&self, map: &str) {
        if let Some(mut m) = self.maps.get_mut(map) {
            m.clear();
        }
    }

    pub fn map_len(&self, map: &str) -> usize {
        self.maps.get(map).map(|m| m.len()).unwrap_or(0)
    }

    // --- lists and arrays (shared sequence semantics, separate namespaces) ---

    pub fn list_push(&self, name: &str, value: &str) {
        seq_push(&self.lists, name, value);
    }

    pub fn list_insert(&self, name: &str, at: usize, value: &str) {
        seq_insert(&self.lists, name, at, value);
    }

    pub fn list_remove_value(&self, name: &str, value: &str) {
        seq_remove_value(&self.lists, name, value);
    }

    pub fn list_get(&self, name: &str, at: usize) -> Option<String> {
        self.lists.get(name).and_then(|v| v.get(at).cloned())
    }

    pub fn list_set(&self, name: &str, at: usize, value: &str) {
        seq_set(&self.lists, name, at, value);
    }

    pub fn list_contains(&self, name: &str, value: &str) -> bool {
        self.lists
            .get(name)
            .is_some_and(|v| v.iter().any(|item| item == value))
    }

    pub fn list_len(&self, name: &str) -> usize {
        self.lists.get(name).map(|v| v.len()).unwrap_or(0)
    }

    pub fn list_clear(&self, name: &str) {
        if let Some(mut v) = self.lists.get_mut(name) {
            v.clear();
        }
    }

    pub fn array_push(&self, name: &str, value: &str) {
        seq_push(&self.arrays, name, value);
    }

    pub fn array_insert(&self, name: &str, at: usize, value: &str) {
        seq_insert(&self.arrays, name, at, value);
    }

    pub fn array_remove_value(&self, name: &str, value: &str) {
        seq_remove_value(&self.arrays, name, value);
    }

    pub fn array_get(&self, name: &str, at: usize) -> Option<String> {
        self.arrays.get(name).and_then(|v| v.get(at).cloned())
    }

    pub fn array_set(&self, name: &str, at: usize, value: &str) {
        seq_set(&self.arrays, name, at, value);
    }

    pub fn array_contains(&self, name: &str, value: &str) -> bool {
        self.arrays
            .get(name)
            .is_some_and(|v| v.iter().any(|item| item == value))
    }

    pub fn array_len(&self, name: &str) -> usize {
        self.arrays.get(name).map(|v| v.len()).unwrap_or(0)
    }

    pub fn array_clear(&self, name: &str) {
        if let Some(mut v) = self.arrays.get_mut(name) {
            v.clear();
        }
    }

    // --- unique sets (insertion-ordered) ---

    /// Adds a member if absent; returns whether the set changed.
    pub fn set_add(&self, name: &str, value: &str) -> bool {
        let mut set = self.sets.entry(name.to_string()).or_default();
        if set.iter().any(|item| item == value) {
            false
        } else {
            set.push(value.to_string());
            true
        }
    }

    pub fn set_remove_value(&self, name: &str, value: &str) {
        if let Some(mut set) = self.sets.get_mut(name) {
            set.retain(|item| item != value);
        }
    }

    pub fn set_contains(&self, name: &str, value: &str) -> bool {
        self.sets
            .get(name)
            .is_some_and(|v| v.iter().any(|item| item == value))
    }

    pub fn set_get(&self, name: &str, at: usize) -> Option<String> {
        self.sets.get(name).and_then(|v| v.get(at).cloned())
    }

    pub fn set_len(&self, name: &str) -> usize {
        self.sets.get(name).map(|v| v.len()).unwrap_or(0)
    }

    pub fn set_clear(&self, name: &str) {
        if let Some(mut v) = self.sets.get_mut(name) {
            v.clear();
        }
    }

    pub fn set_members(&self, name: &str) -> Vec<String> {
        self.sets.get(name).map(|v| v.clone()).unwrap_or_default()
    }

    // --- properties and globals ---

    pub fn property(&self, name: &str) -> Option<String> {
        self.properties.get(name).map(|v| v.clone())
    }

    pub fn set_property(&self, name: &str, value: &str) {
        self.properties.insert(name.to_string(), value.to_string());
    }

    pub fn global(&self, name: &str) -> Option<String> {
        self.globals.get(name).map(|v| v.clone())
    }

    pub fn set_global(&self, name: &str, value: &str) {
        self.globals.insert(name.to_string(), value.to_string());
    }
}

/// The set-membership pattern wildcard consults the named unique sets, so
/// learned additions widen what a pattern matches immediately.
impl SetResolver for KnowledgeBase {
    fn members(&self, name: &str) -> Vec<String> {
        self.set_members(name)
    }
}

fn seq_push(map: &DashMap<String, Vec<String>>, name: &str, value: &str) {
    map.entry(name.to_string()).or_default().push(value.to_string());
}

fn seq_insert(map: &DashMap<String, Vec<String>>, name: &str, at: usize, value: &str) {
    let mut seq = map.entry(name.to_string()).or_default();
    let at = at.min(seq.len());
    seq.insert(at, value.to_string());
}

fn seq_remove_value(map: &DashMap<String, Vec<String>>, name: &str, value: &str) {
    if let Some(mut seq) = map.get_mut(name) {
        seq.retain(|item| item != value);
    }
}

fn seq_set(map: &DashMap<String, Vec<String>>, name: &str, at: usize, value: &str) {
    let mut seq = map.entry(name.to_string()).or_default();
    if at < seq.len() {
        seq[at] = value.to_string();
    } else {
        seq.push(value.to_string());
    }
}
