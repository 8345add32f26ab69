//! End-to-end tests for the engine pipeline: preprocessing, matching,
//! template evaluation and history maintenance over multi-turn
//! conversations.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use parley::bridge::{BridgeError, ServiceBridge};
use parley::{Captures, Category, Engine, EngineConfig, KnowledgeBase};

fn engine(categories: &[(&str, &str)]) -> Engine {
    let kb = Arc::new(KnowledgeBase::new());
    for (pattern, template) in categories {
        kb.add_category(Category::new(pattern, template));
    }
    Engine::new(kb)
}

#[test]
fn test_greeting_with_capture() {
    let engine = engine(&[("MY NAME IS *", "Nice to meet you, <star/>.")]);
    let session = engine.new_session("u1");
    assert_eq!(
        engine.process_input("my name is Bob", &session).unwrap(),
        "Nice to meet you, Bob."
    );
}

#[test]
fn test_positional_captures_left_to_right() {
    let engine = engine(&[("* LIKES *", "<star index=\"2\"/> is liked by <star/>.")]);
    let session = engine.new_session("u1");
    assert_eq!(
        engine.process_input("Ann likes Bob", &session).unwrap(),
        "Bob is liked by Ann."
    );
}

#[test]
fn test_substitution_before_matching() {
    let engine = engine(&[("I AM *", "Why are you <star/>?")]);
    let session = engine.new_session("u1");
    // "I'm" normalizes to "i am" before the matcher runs.
    assert_eq!(
        engine.process_input("I'm tired!", &session).unwrap(),
        "Why are you tired?"
    );
}

#[test]
fn test_srai_synonym_resolution() {
    let engine = engine(&[
        ("HOWDY", "<srai>HELLO</srai>"),
        ("HIYA", "<srai>HELLO</srai>"),
        ("HELLO", "Hi there."),
    ]);
    let session = engine.new_session("u1");
    assert_eq!(engine.process_input("howdy", &session).unwrap(), "Hi there.");
    assert_eq!(engine.process_input("hiya", &session).unwrap(), "Hi there.");
}

#[test]
fn test_sr_shorthand_reduces_first_capture() {
    let engine = engine(&[
        ("PLEASE *", "<sr/>"),
        ("HELP", "What do you need?"),
    ]);
    let session = engine.new_session("u1");
    assert_eq!(
        engine.process_input("please help", &session).unwrap(),
        "What do you need?"
    );
}

#[test]
fn test_recursion_ceiling_truncates() {
    let kb = Arc::new(KnowledgeBase::new());
    kb.add_category(Category::new("LOOP", "<srai>LOOP</srai>"));
    let engine = Engine::builder()
        .knowledge_base(kb)
        .config(EngineConfig {
            recursion_limit: 4,
            ..Default::default()
        })
        .build();
    let session = engine.new_session("u1");
    // Terminates with a string rather than erroring or spinning.
    assert_eq!(engine.process_input("loop", &session).unwrap(), "LOOP");
}

#[test]
fn test_random_produces_every_item() {
    let engine = engine(&[(
        "PICK",
        "<random><li>one</li><li>two</li><li>three</li></random>",
    )]);
    let session = engine.new_session("u1");
    let mut seen = HashSet::new();
    for _ in 0..200 {
        let out = engine.process_input("pick", &session).unwrap();
        assert!(["one", "two", "three"].contains(&out.as_str()));
        seen.insert(out);
    }
    assert_eq!(seen.len(), 3);
}

#[test]
fn test_predicates_persist_across_turns() {
    let engine = engine(&[
        ("I FEEL *", "<think><set name=\"mood\"><star/></set></think>Noted."),
        (
            "HOW AM I",
            "<condition name=\"mood\"><li value=\"happy\">Cheerful.</li><li>You feel <get name=\"mood\"/>.</li></condition>",
        ),
    ]);
    let session = engine.new_session("u1");
    engine.process_input("i feel happy", &session).unwrap();
    assert_eq!(engine.process_input("how am i", &session).unwrap(), "Cheerful.");
    engine.process_input("i feel gloomy", &session).unwrap();
    assert_eq!(
        engine.process_input("how am i", &session).unwrap(),
        "You feel gloomy."
    );
}

#[test]
fn test_topic_narrows_matching() {
    let kb = Arc::new(KnowledgeBase::new());
    kb.add_category(Category::new(
        "LET US TALK ABOUT *",
        "<think><set name=\"topic\"><star/></set></think>OK, <star/> it is.",
    ));
    kb.add_category(Category::new("GO ON", "On what?"));
    kb.add_category(Category::with_context(
        "GO ON",
        None,
        Some("WEATHER"),
        "It may rain later.",
    ));
    let engine = Engine::new(kb);
    let session = engine.new_session("u1");

    assert_eq!(engine.process_input("go on", &session).unwrap(), "On what?");
    // The contraction normalizes into the pattern's wording.
    assert_eq!(
        engine.process_input("let's talk about weather", &session).unwrap(),
        "OK, weather it is."
    );
    assert_eq!(
        engine.process_input("go on", &session).unwrap(),
        "It may rain later."
    );
}

#[test]
fn test_that_context_follow_up() {
    let kb = Arc::new(KnowledgeBase::new());
    kb.add_category(Category::new("DO I NEED A COAT", "Do you feel cold?"));
    kb.add_category(Category::with_context(
        "YES",
        Some("DO YOU FEEL COLD"),
        None,
        "Then wear one.",
    ));
    kb.add_category(Category::new("YES", "Glad you agree."));
    let engine = Engine::new(kb);
    let session = engine.new_session("u1");

    assert_eq!(engine.process_input("yes", &session).unwrap(), "Glad you agree.");
    engine.process_input("do I need a coat", &session).unwrap();
    assert_eq!(engine.process_input("yes", &session).unwrap(), "Then wear one.");
}

#[test]
fn test_set_membership_wildcard() {
    let kb = Arc::new(KnowledgeBase::new());
    kb.set_add("colors", "red");
    kb.set_add("colors", "blue");
    kb.add_category(Category::new(
        "I LIKE <set>colors</set>",
        "<star/> is a fine color.",
    ));
    let engine = Engine::new(kb);
    let session = engine.new_session("u1");

    assert_eq!(
        engine.process_input("i like blue", &session).unwrap(),
        "blue is a fine color."
    );
    assert_eq!(engine.process_input("i like jazz", &session).unwrap(), "");
}

#[test]
fn test_unknown_tag_round_trips_through_engine() {
    let engine = engine(&[("TRY", "<foo>bar</foo>")]);
    let session = engine.new_session("u1");
    assert_eq!(
        engine.process_input("try", &session).unwrap(),
        "<foo>bar</foo>"
    );
}

#[test]
fn test_leading_newline_trims_template_formatting() {
    let engine = engine(&[("A", "\n  indented by authoring  "), ("B", "  deliberate")]);
    let session = engine.new_session("u1");
    assert_eq!(
        engine.process_input("a", &session).unwrap(),
        "indented by authoring"
    );
    // Leading spaces without a line break survive; the trailing ones go.
    assert_eq!(engine.process_input("b", &session).unwrap(), "  deliberate");
}

#[test]
fn test_process_template_with_session() {
    let engine = engine(&[]);
    let session = engine.new_session("u1");
    session.set_var("color", "teal");
    assert_eq!(
        engine.process_template("<get name=\"color\"/>", &Captures::default(), Some(session)),
        "teal"
    );
}

struct CannedBridge;

impl ServiceBridge for CannedBridge {
    fn call(
        &self,
        service: &str,
        content: &str,
        _params: &HashMap<String, String>,
        _timeout: Duration,
    ) -> Result<String, BridgeError> {
        match service {
            "weather" => Ok(format!("Sunny in {}", content)),
            _ => Err(BridgeError::UnknownService(service.to_string())),
        }
    }
}

#[test]
fn test_sraix_through_engine() {
    let kb = Arc::new(KnowledgeBase::new());
    kb.add_category(Category::new(
        "WEATHER IN *",
        "<sraix service=\"weather\"><star/></sraix>",
    ));
    kb.add_category(Category::new(
        "STOCKS IN *",
        "<sraix service=\"stocks\" default=\"Markets are closed.\"><star/></sraix>",
    ));
    let engine = Engine::builder()
        .knowledge_base(kb)
        .bridge(Arc::new(CannedBridge))
        .build();
    let session = engine.new_session("u1");

    assert_eq!(
        engine.process_input("weather in Boston", &session).unwrap(),
        "Sunny in Boston"
    );
    // The unknown service fails and the tag's default answers instead.
    assert_eq!(
        engine.process_input("stocks in Boston", &session).unwrap(),
        "Markets are closed."
    );
}

#[test]
fn test_collection_state_is_engine_wide() {
    let engine = engine(&[
        ("ADD * TO MY LIST", "<list name=\"todo\" operation=\"insert\"><star/></list>Added."),
        ("HOW LONG IS MY LIST", "<list name=\"todo\" operation=\"size\"/> items."),
    ]);
    let a = engine.new_session("a");
    let b = engine.new_session("b");
    engine.process_input("add milk to my list", &a).unwrap();
    engine.process_input("add eggs to my list", &b).unwrap();
    // Collections live on the knowledge base, shared across sessions.
    assert_eq!(
        engine.process_input("how long is my list", &a).unwrap(),
        "2 items."
    );
}
