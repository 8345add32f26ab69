//! # PARLEY: Conversational-Pattern Interpreter
//!
//! Parley matches normalized user utterances against a knowledge base of
//! markup-defined rules ("categories") and evaluates the matched rule's
//! response template, a small tree-structured scripting language with
//! variables, conditionals, randomization, recursion and side effects on
//! conversational state.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Input Text → Preprocessor → Pattern Matcher → Template Parser → Evaluator → Response
//! ```
//!
//! ### Stage 1: Preprocessing
//!
//! The [`preprocessor`] module normalizes raw input (substitutions,
//! punctuation stripping, whitespace collapsing) while preserving word
//! casing for wildcard captures.
//!
//! ### Stage 2: Matching
//!
//! The [`matcher`] module selects the single best-matching category from
//! the [`knowledge`] base, walking a trie over combined input/context paths
//! with wildcard backtracking and specificity-ordered precedence.
//!
//! ### Stage 3: Parsing
//!
//! The [`tokenizer`] and [`parser`] modules turn the matched rule's template
//! markup into an immutable AST ([`ast`]), tolerant of the imperfect nesting
//! found in authored rule files.
//!
//! ### Stage 4: Evaluation
//!
//! The [`eval`] module walks the AST, dispatching each tag to its handler.
//! Handlers read and mutate the per-evaluation context and the per-session
//! state ([`session`]), and may re-enter the matcher for recursive
//! reduction, bounded by an explicit depth ceiling.
//!
//! ## External Collaborators
//!
//! File loading, the CLI, outbound service calls and durable persistence of
//! learned rules live outside the core; the [`bridge`] module defines the
//! trait contracts they plug into, and [`engine`] exposes the two top-level
//! entry points ([`engine::Engine::process_input`] and
//! [`engine::Engine::process_template`]).

pub mod ast;
pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod knowledge;
pub mod matcher;
pub mod parser;
pub mod pattern;
pub mod preprocessor;
pub mod session;
pub mod tokenizer;

// Re-exports
pub use config::EngineConfig;
pub use engine::{Engine, EngineBuilder, EngineError};
pub use error::*;
pub use eval::{EvalContext, Evaluator, TagKind};
pub use knowledge::{Category, KnowledgeBase, MatchResult};
pub use matcher::Captures;
pub use session::Session;
