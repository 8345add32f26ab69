//! # Input Preprocessor
//!
//! Normalizes raw user text before matching: contraction substitutions,
//! punctuation stripping, and whitespace collapsing. Word casing is
//! preserved so wildcard captures keep the user's original casing; pattern
//! words are uppercased instead and comparison is case-insensitive.
//!
//! Also hosts sentence splitting (the "that" history stores the final
//! sentence of each response) and the pronoun-perspective tables used by the
//! `person`, `person2` and `gender` transform tags.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

/// A trait for preprocessing text input.
pub trait Preprocessor {
    /// Process the input and return the processed result.
    fn process(&self, input: &str) -> String;
}

const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("i'm", "i am"),
    ("i'd", "i would"),
    ("i'll", "i will"),
    ("i've", "i have"),
    ("you're", "you are"),
    ("you'd", "you would"),
    ("you'll", "you will"),
    ("you've", "you have"),
    ("he's", "he is"),
    ("she's", "she is"),
    ("it's", "it is"),
    ("that's", "that is"),
    ("there's", "there is"),
    ("what's", "what is"),
    ("who's", "who is"),
    ("let's", "let us"),
    ("don't", "do not"),
    ("doesn't", "does not"),
    ("didn't", "did not"),
    ("can't", "can not"),
    ("cannot", "can not"),
    ("won't", "will not"),
    ("isn't", "is not"),
    ("aren't", "are not"),
    ("wasn't", "was not"),
    ("weren't", "were not"),
    ("haven't", "have not"),
    ("hasn't", "has not"),
    ("couldn't", "could not"),
    ("shouldn't", "should not"),
    ("wouldn't", "would not"),
    ("gonna", "going to"),
    ("wanna", "want to"),
];

/// String normalizer applied to every utterance before matching.
pub struct Normalizer {
    substitutions: Vec<(Regex, &'static str)>,
    re_strip: Regex,
    re_punctuation: Regex,
    re_whitespace: Regex,
}

impl Normalizer {
    pub fn new() -> Self {
        let substitutions = SUBSTITUTIONS
            .iter()
            .map(|(from, to)| {
                let re = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(from)))
                    .expect("substitution pattern is static and valid");
                (re, *to)
            })
            .collect();
        Self {
            substitutions,
            re_strip: Regex::new(r#"['"`]"#).expect("static regex"),
            re_punctuation: Regex::new(r"[.,;:!?()\[\]{}<>/\\-]+").expect("static regex"),
            re_whitespace: Regex::new(r"\s+").expect("static regex"),
        }
    }

    /// Substitutions, punctuation strip, whitespace collapse. Case is left
    /// untouched.
    pub fn normalize(&self, input: &str) -> String {
        let mut text = input.to_string();
        for (re, replacement) in &self.substitutions {
            text = re.replace_all(&text, *replacement).to_string();
        }
        let text = self.re_strip.replace_all(&text, "");
        let text = self.re_punctuation.replace_all(&text, " ");
        self.re_whitespace.replace_all(&text, " ").trim().to_string()
    }

    /// Normalized word sequence for the matcher.
    pub fn tokenize(&self, input: &str) -> Vec<String> {
        self.normalize(input)
            .split_whitespace()
            .map(|w| w.to_string())
            .collect()
    }

    /// Splits text into sentences, dropping empty fragments.
    pub fn sentences(&self, text: &str) -> Vec<String> {
        text.split(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// The final sentence, used as the "that" matching context.
    pub fn last_sentence(&self, text: &str) -> Option<String> {
        self.sentences(text).pop()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor for Normalizer {
    fn process(&self, input: &str) -> String {
        self.normalize(input)
    }
}

lazy_static! {
    static ref PERSON: HashMap<&'static str, &'static str> = HashMap::from([
        ("i", "you"),
        ("me", "you"),
        ("my", "your"),
        ("mine", "yours"),
        ("myself", "yourself"),
        ("am", "are"),
        ("you", "me"),
        ("your", "my"),
        ("yours", "mine"),
        ("yourself", "myself"),
    ]);
    static ref PERSON2: HashMap<&'static str, &'static str> = HashMap::from([
        ("i", "they"),
        ("me", "them"),
        ("my", "their"),
        ("mine", "theirs"),
        ("myself", "themselves"),
        ("we", "they"),
        ("us", "them"),
        ("our", "their"),
        ("ours", "theirs"),
    ]);
    static ref GENDER: HashMap<&'static str, &'static str> = HashMap::from([
        ("he", "she"),
        ("she", "he"),
        ("him", "her"),
        ("her", "him"),
        ("his", "her"),
        ("hers", "his"),
        ("himself", "herself"),
        ("herself", "himself"),
    ]);
}

/// First-person ↔ second-person perspective swap, word-wise.
pub fn swap_person(text: &str) -> String {
    swap_words(text, &PERSON)
}

/// First-person → third-person perspective swap, word-wise.
pub fn swap_person2(text: &str) -> String {
    swap_words(text, &PERSON2)
}

/// Gendered-pronoun swap, word-wise.
pub fn swap_gender(text: &str) -> String {
    swap_words(text, &GENDER)
}

fn swap_words(text: &str, table: &HashMap<&'static str, &'static str>) -> String {
    text.split_whitespace()
        .map(|word| {
            table
                .get(word.to_lowercase().as_str())
                .map(|swapped| swapped.to_string())
                .unwrap_or_else(|| word.to_string())
        })
        .collect::<Vec<_>>()
        .join(" ")
}
