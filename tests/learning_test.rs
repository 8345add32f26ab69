//! Learning-path integration: in-memory rule acquisition, persistence
//! forwarding, and unlearning through the knowledge-base API.

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;

use parley::bridge::{CategoryStore, PersistError};
use parley::{Category, Engine, KnowledgeBase};

const TEACH_CATEGORY: (&str, &str) = (
    "REMEMBER THAT MY * IS *",
    "<learn><category><pattern>WHAT IS MY <star/></pattern><template>Your <star/> is <star index=\"2\"/>.</template></category></learn>Noted.",
);

#[test]
fn test_learned_category_answers_next_turn() {
    let kb = Arc::new(KnowledgeBase::new());
    kb.add_category(Category::new(TEACH_CATEGORY.0, TEACH_CATEGORY.1));
    let engine = Engine::new(kb.clone());
    let session = engine.new_session("u1");

    assert_eq!(
        engine.process_input("remember that my dog is Rex", &session).unwrap(),
        "Noted."
    );
    assert_eq!(kb.category_count(), 2);
    // The wildcard resolved at learn time: the new pattern names the dog.
    assert_eq!(
        engine.process_input("what is my dog", &session).unwrap(),
        "Your dog is Rex."
    );
    // And it holds for other sessions against the same knowledge base.
    let other = engine.new_session("u2");
    assert_eq!(
        engine.process_input("what is my dog", &other).unwrap(),
        "Your dog is Rex."
    );
}

#[test]
fn test_deferred_history_reference_resolves_at_use_time() {
    let kb = Arc::new(KnowledgeBase::new());
    kb.add_category(Category::new(
        "SAVE YOUR WORDS",
        "<learn><category><pattern>WHAT DID YOU SAY</pattern><template>I said: <that index=\"2\"/></template></category></learn>Saved.",
    ));
    kb.add_category(Category::new("HELLO", "Good day to you."));
    let engine = Engine::new(kb.clone());
    let session = engine.new_session("u1");

    engine.process_input("hello", &session).unwrap();
    engine.process_input("save your words", &session).unwrap();
    // The learned template kept <that index="2"/> literal; at use time it
    // resolves against the live history.
    assert_eq!(
        engine.process_input("what did you say", &session).unwrap(),
        "I said: Good day to you"
    );
}

#[derive(Default)]
struct RecordingStore {
    persisted: Mutex<Vec<String>>,
}

impl CategoryStore for RecordingStore {
    fn persist(&self, category: &Category) -> Result<(), PersistError> {
        self.persisted
            .lock()
            .unwrap()
            .push(category.pattern().raw().to_string());
        Ok(())
    }

    fn remove(&self, _category: &Category) -> Result<(), PersistError> {
        Ok(())
    }
}

struct FailingStore;

impl CategoryStore for FailingStore {
    fn persist(&self, _category: &Category) -> Result<(), PersistError> {
        Err(PersistError::Store("disk full".to_string()))
    }

    fn remove(&self, _category: &Category) -> Result<(), PersistError> {
        Err(PersistError::Store("disk full".to_string()))
    }
}

#[test]
fn test_learnf_forwards_to_store() {
    let kb = Arc::new(KnowledgeBase::new());
    kb.add_category(Category::new(
        "TEACH *",
        "<learnf><category><pattern><star/></pattern><template>Understood.</template></category></learnf>Learned.",
    ));
    let store = Arc::new(RecordingStore::default());
    let engine = Engine::builder()
        .knowledge_base(kb.clone())
        .store(store.clone())
        .build();
    let session = engine.new_session("u1");

    engine.process_input("teach greetings", &session).unwrap();
    assert_eq!(*store.persisted.lock().unwrap(), vec!["greetings".to_string()]);
    assert_eq!(
        engine.process_input("greetings", &session).unwrap(),
        "Understood."
    );
}

#[test]
fn test_learnf_store_failure_still_learns() {
    let kb = Arc::new(KnowledgeBase::new());
    kb.add_category(Category::new(
        "TEACH *",
        "<learnf><category><pattern><star/></pattern><template>Understood.</template></category></learnf>Learned.",
    ));
    let engine = Engine::builder()
        .knowledge_base(kb.clone())
        .store(Arc::new(FailingStore))
        .build();
    let session = engine.new_session("u1");

    // The store failure is swallowed; the turn and the learning succeed.
    assert_eq!(
        engine.process_input("teach greetings", &session).unwrap(),
        "Learned."
    );
    assert_eq!(
        engine.process_input("greetings", &session).unwrap(),
        "Understood."
    );
}

#[test]
fn test_unlearn_removes_by_exact_pattern() {
    let kb = Arc::new(KnowledgeBase::new());
    kb.add_category(Category::new(TEACH_CATEGORY.0, TEACH_CATEGORY.1));
    let engine = Engine::new(kb.clone());
    let session = engine.new_session("u1");

    engine.process_input("remember that my dog is Rex", &session).unwrap();
    assert!(kb.remove_category("WHAT IS MY DOG", None, None));
    assert_eq!(engine.process_input("what is my dog", &session).unwrap(), "");
    // The teaching category itself is untouched.
    assert_eq!(kb.category_count(), 1);
}
