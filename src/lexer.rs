//! Splitting of raw bang-command argument strings into tokens.
//!
//! Two modes are supported: [`SplitMode::Shell`] follows POSIX shell word rules
//! (quotes group words and are stripped, `#` is ordinary text), while
//! [`SplitMode::Naive`] splits once on the first run of whitespace.

use std::fmt;

/// How a [`Tokenizer`] finds token boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitMode {
    /// Quote-aware splitting, like a POSIX shell without comments.
    #[default]
    Shell,
    /// Split on the first whitespace run only; no quote handling.
    Naive,
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitMode::Shell => f.write_str("shell"),
            SplitMode::Naive => f.write_str("naive"),
        }
    }
}

/// Errors that can occur while splitting in shell mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenizeError {
    /// A closing quote (single or double) was not found.
    #[error("no closing quotation for {0}")]
    UnterminatedQuote(char),
    /// The input ended right after a backslash.
    #[error("no escaped character after trailing backslash")]
    DanglingEscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
    Escape(EscapeFrom),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EscapeFrom {
    Word,
    DoubleQuote,
}

/// A pull-based tokenizer over an argument string.
///
/// Tokens are produced one at a time by [`Tokenizer::next_token`]. Running out of
/// input yields `Ok(None)`, which is distinct from `Ok(Some(""))` produced by an
/// explicit `""` in shell mode.
///
/// Example
/// ```
/// use bang_commands::lexer::{SplitMode, Tokenizer};
/// let mut t = Tokenizer::new("foo bar baz", SplitMode::Shell);
/// assert_eq!(t.next_token().unwrap().as_deref(), Some("foo"));
/// assert_eq!(t.remaining(), "bar baz");
/// ```
#[derive(Debug, Clone)]
pub struct Tokenizer {
    mode: SplitMode,
    input: Vec<char>,
    pos: usize,
}

impl Tokenizer {
    /// Creates a tokenizer over `input`.
    pub fn new(input: impl AsRef<str>, mode: SplitMode) -> Self {
        Tokenizer {
            mode,
            input: input.as_ref().chars().collect(),
            pos: 0,
        }
    }

    /// Returns every character not consumed yet, as one string.
    ///
    /// The tokenizer is re-seeded with exactly the returned text, so a later
    /// `set_remaining` with the same string leaves it where it was.
    pub fn remaining(&mut self) -> String {
        let rest: String = self.input[self.pos..].iter().collect();
        self.set_remaining(&rest);
        rest
    }

    /// Replaces the unconsumed input with `rest`.
    pub fn set_remaining(&mut self, rest: &str) {
        self.input = rest.chars().collect();
        self.pos = 0;
    }

    /// Produces the next token, or `Ok(None)` once the input is exhausted.
    pub fn next_token(&mut self) -> Result<Option<String>, TokenizeError> {
        match self.mode {
            SplitMode::Shell => self.next_shell_token(),
            SplitMode::Naive => Ok(self.next_naive_token()),
        }
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn next_naive_token(&mut self) -> Option<String> {
        while self.input.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
        if self.pos >= self.input.len() {
            return None;
        }

        let start = self.pos;
        while self.input.get(self.pos).is_some_and(|c| !c.is_whitespace()) {
            self.pos += 1;
        }
        let token: String = self.input[start..self.pos].iter().collect();

        // Drop the whole separating run, like a single `split(maxsplit=1)`.
        while self.input.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
        Some(token)
    }

    /// Runs the shell-word state machine until one token is complete.
    ///
    /// The whitespace character that ends a token is consumed with it, so
    /// [`Tokenizer::remaining`] starts right after the delimiter.
    fn next_shell_token(&mut self) -> Result<Option<String>, TokenizeError> {
        let mut state = LexingState::Start;
        let mut buffer = String::new();

        while let Some(ch) = self.read_char() {
            state = match state {
                LexingState::Start => match ch {
                    c if c.is_whitespace() => LexingState::Start,
                    '\'' => LexingState::ReadingSingleQuote,
                    '"' => LexingState::ReadingDoubleQuote,
                    '\\' => LexingState::Escape(EscapeFrom::Word),
                    c => {
                        buffer.push(c);
                        LexingState::ReadingWord
                    }
                },
                LexingState::ReadingWord => match ch {
                    c if c.is_whitespace() => return Ok(Some(buffer)),
                    '\'' => LexingState::ReadingSingleQuote,
                    '"' => LexingState::ReadingDoubleQuote,
                    '\\' => LexingState::Escape(EscapeFrom::Word),
                    c => {
                        buffer.push(c);
                        LexingState::ReadingWord
                    }
                },
                LexingState::ReadingSingleQuote => match ch {
                    '\'' => LexingState::ReadingWord,
                    c => {
                        buffer.push(c);
                        LexingState::ReadingSingleQuote
                    }
                },
                LexingState::ReadingDoubleQuote => match ch {
                    '"' => LexingState::ReadingWord,
                    '\\' => LexingState::Escape(EscapeFrom::DoubleQuote),
                    c => {
                        buffer.push(c);
                        LexingState::ReadingDoubleQuote
                    }
                },
                LexingState::Escape(EscapeFrom::Word) => {
                    buffer.push(ch);
                    LexingState::ReadingWord
                }
                LexingState::Escape(EscapeFrom::DoubleQuote) => {
                    // Inside double quotes only `"` and `\` are escapable.
                    if ch != '"' && ch != '\\' {
                        buffer.push('\\');
                    }
                    buffer.push(ch);
                    LexingState::ReadingDoubleQuote
                }
            };
        }

        match state {
            LexingState::Start => Ok(None),
            LexingState::ReadingWord => Ok(Some(buffer)),
            LexingState::ReadingSingleQuote => Err(TokenizeError::UnterminatedQuote('\'')),
            LexingState::ReadingDoubleQuote => Err(TokenizeError::UnterminatedQuote('"')),
            LexingState::Escape(EscapeFrom::Word) => Err(TokenizeError::DanglingEscape),
            LexingState::Escape(EscapeFrom::DoubleQuote) => {
                Err(TokenizeError::UnterminatedQuote('"'))
            }
        }
    }
}

impl Iterator for Tokenizer {
    type Item = Result<String, TokenizeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

/// Splits the whole of `input` into tokens.
pub fn split(input: &str, mode: SplitMode) -> Result<Vec<String>, TokenizeError> {
    Tokenizer::new(input, mode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(s: &str) -> Vec<String> {
        split(s, SplitMode::Shell).unwrap()
    }

    #[test]
    fn test_shell_plain_words() {
        assert_eq!(shell("a b c"), vec!["a", "b", "c"]);
        assert_eq!(shell("  a \t b  "), vec!["a", "b"]);
    }

    #[test]
    fn test_shell_quotes_group_and_strip() {
        assert_eq!(shell(r#"a "b c" d"#), vec!["a", "b c", "d"]);
        assert_eq!(shell("'x y' z"), vec!["x y", "z"]);
        assert_eq!(shell(r#"pre"mid dle"post"#), vec!["premid dlepost"]);
    }

    #[test]
    fn test_shell_empty_quotes_are_a_token() {
        assert_eq!(shell(r#"a "" b"#), vec!["a", "", "b"]);
        assert_eq!(shell("''"), vec![""]);
    }

    #[test]
    fn test_shell_hash_is_not_a_comment() {
        assert_eq!(shell("#tag x#y"), vec!["#tag", "x#y"]);
    }

    #[test]
    fn test_shell_escapes() {
        assert_eq!(shell(r"a\ b c"), vec!["a b", "c"]);
        assert_eq!(shell(r#""say \"hi\"""#), vec![r#"say "hi""#]);
        assert_eq!(shell(r#""a\nb""#), vec![r"a\nb"]);
        assert_eq!(shell(r"'no\escape'"), vec![r"no\escape"]);
    }

    #[test]
    fn test_shell_errors() {
        assert_eq!(
            split(r#"a "b c"#, SplitMode::Shell),
            Err(TokenizeError::UnterminatedQuote('"'))
        );
        assert_eq!(
            split("'open", SplitMode::Shell),
            Err(TokenizeError::UnterminatedQuote('\''))
        );
        assert_eq!(split(r"a\", SplitMode::Shell), Err(TokenizeError::DanglingEscape));
    }

    #[test]
    fn test_exhausted_is_none_not_empty() {
        let mut t = Tokenizer::new("one", SplitMode::Shell);
        assert_eq!(t.next_token(), Ok(Some("one".to_string())));
        assert_eq!(t.next_token(), Ok(None));
        assert_eq!(t.next_token(), Ok(None));
    }

    #[test]
    fn test_remaining_after_token() {
        let mut t = Tokenizer::new("foo bar baz", SplitMode::Shell);
        assert_eq!(t.next_token().unwrap().as_deref(), Some("foo"));
        assert_eq!(t.remaining(), "bar baz");
        // Reading the remainder does not move the cursor.
        assert_eq!(t.remaining(), "bar baz");
        assert_eq!(t.next_token().unwrap().as_deref(), Some("bar"));
    }

    #[test]
    fn test_set_remaining_reseeds() {
        let mut t = Tokenizer::new("a b", SplitMode::Shell);
        let rest = t.remaining();
        t.set_remaining(&rest);
        assert_eq!(t.next_token().unwrap().as_deref(), Some("a"));

        t.set_remaining("'x y' z");
        assert_eq!(t.next_token().unwrap().as_deref(), Some("x y"));
        assert_eq!(t.remaining(), "z");
    }

    #[test]
    fn test_naive_mode() {
        let mut t = Tokenizer::new("  first   second \"third fourth\"", SplitMode::Naive);
        assert_eq!(t.next_token().unwrap().as_deref(), Some("first"));
        assert_eq!(t.remaining(), "second \"third fourth\"");
        assert_eq!(t.next_token().unwrap().as_deref(), Some("second"));
        assert_eq!(t.next_token().unwrap().as_deref(), Some("\"third"));
        assert_eq!(t.next_token().unwrap().as_deref(), Some("fourth\""));
        assert_eq!(t.next_token(), Ok(None));
        assert_eq!(t.remaining(), "");
    }

    #[test]
    fn test_naive_single_word_empties() {
        let mut t = Tokenizer::new("alone", SplitMode::Naive);
        assert_eq!(t.next_token().unwrap().as_deref(), Some("alone"));
        assert_eq!(t.remaining(), "");
        assert_eq!(t.next_token(), Ok(None));
    }
}
