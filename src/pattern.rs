//! # Pattern Model
//!
//! Category patterns are token sequences matched against normalized input.
//! Four token kinds exist, from most to least specific:
//!
//! * a literal word (stored uppercase, compared case-insensitively),
//! * `<set>name</set>`: one member of the named knowledge-base set
//!   (members may span several words; the longest member wins),
//! * `_`: exactly one word,
//! * `*`: zero or more words, matched greedily.
//!
//! The lexer never fails: pattern text is authored alongside templates and a
//! surprising token is simply a literal word.

use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternToken {
    /// Literal word, held uppercase.
    Word(String),
    /// Set-membership wildcard naming a knowledge-base set.
    Set(String),
    /// `_`: exactly one word.
    Single,
    /// `*`: zero or more words, greedy.
    Any,
}

impl fmt::Display for PatternToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternToken::Word(word) => write!(f, "{}", word),
            PatternToken::Set(name) => write!(f, "<set>{}</set>", name),
            PatternToken::Single => write!(f, "_"),
            PatternToken::Any => write!(f, "*"),
        }
    }
}

/// A tokenized pattern plus the source text it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub tokens: Vec<PatternToken>,
    raw: String,
}

impl Pattern {
    /// Tokenizes pattern text. Words are uppercased; `*`, `_` and
    /// `<set>name</set>` become wildcard tokens.
    pub fn parse(text: &str) -> Self {
        let raw = text.trim().to_string();
        let mut tokens = Vec::new();
        let mut rest = raw.as_str();

        while !rest.is_empty() {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            if let Some((name, remainder)) = take_set_wildcard(rest) {
                tokens.push(PatternToken::Set(name));
                rest = remainder;
                continue;
            }
            let end = rest
                .find(char::is_whitespace)
                .unwrap_or(rest.len());
            let word = &rest[..end];
            tokens.push(match word {
                "*" => PatternToken::Any,
                "_" => PatternToken::Single,
                _ => PatternToken::Word(word.to_uppercase()),
            });
            rest = &rest[end..];
        }

        Self { tokens, raw }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Canonical text form, used for exact-pattern equality in the
    /// knowledge base (`MY  name is *` and `MY NAME IS *` are one pattern).
    pub fn canonical(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Recognizes a leading `<set>name</set>`, case-insensitively.
fn take_set_wildcard(rest: &str) -> Option<(String, &str)> {
    const OPEN: &str = "<set>";
    const CLOSE: &str = "</set>";
    let head = rest.get(..OPEN.len())?;
    if !head.eq_ignore_ascii_case(OPEN) {
        return None;
    }
    let body = &rest[OPEN.len()..];
    let close_at = body.to_ascii_lowercase().find(CLOSE)?;
    let name = body[..close_at].trim().to_lowercase();
    let remainder = &body[close_at + CLOSE.len()..];
    Some((name, remainder))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_words_are_uppercased() {
        let pattern = Pattern::parse("my name is Bob");
        assert_eq!(
            pattern.tokens,
            vec![
                PatternToken::Word("MY".to_string()),
                PatternToken::Word("NAME".to_string()),
                PatternToken::Word("IS".to_string()),
                PatternToken::Word("BOB".to_string()),
            ]
        );
    }

    #[test]
    fn test_wildcard_tokens() {
        let pattern = Pattern::parse("MY NAME IS *");
        assert_eq!(pattern.tokens.len(), 4);
        assert_eq!(pattern.tokens[3], PatternToken::Any);

        let pattern = Pattern::parse("_ IS HERE");
        assert_eq!(pattern.tokens[0], PatternToken::Single);
    }

    #[test]
    fn test_set_wildcard() {
        let pattern = Pattern::parse("I LIKE <set>colors</set> THINGS");
        assert_eq!(
            pattern.tokens,
            vec![
                PatternToken::Word("I".to_string()),
                PatternToken::Word("LIKE".to_string()),
                PatternToken::Set("colors".to_string()),
                PatternToken::Word("THINGS".to_string()),
            ]
        );
    }

    #[test]
    fn test_set_wildcard_case_insensitive() {
        let pattern = Pattern::parse("<SET>Colors</SET>");
        assert_eq!(pattern.tokens, vec![PatternToken::Set("colors".to_string())]);
    }

    #[test]
    fn test_canonical_collapses_whitespace() {
        let a = Pattern::parse("MY   name is   *");
        let b = Pattern::parse("my name IS *");
        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(a.canonical(), "MY NAME IS *");
    }
}
