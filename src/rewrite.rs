//! Textual rewrite of bang-commands into dispatcher calls.
//!
//! `(!greet world)` becomes `(__bang__(__locals__, greet, "world"))`. The
//! character that ended the command (`)`, `+`, `-`) is written back after the
//! call, and a command ending at end of line leaves the line break untouched,
//! so the surrounding host syntax stays valid.

use crate::config::Config;
use regex::{Captures, Regex, RegexBuilder};
use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

/// `!name`, optional arguments on the same line, optional horizontal
/// whitespace, then `)`, `+`, `-` or end of line. Trailing whitespace excludes
/// line breaks so a match can never swallow one.
const BANG_PATTERN: &str =
    r"!(?P<name>\w+)(?:[^\S\r\n]+(?P<args>[^\r\n]*?))?[^\S\r\n]*(?P<end>[)+\-]|$)";

fn bang_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        RegexBuilder::new(BANG_PATTERN)
            .multi_line(true)
            .crlf(true)
            .build()
            .unwrap_or_else(|e| panic!("bang pattern must compile: {}", e))
    })
}

/// What ended a command occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    CloseParen,
    Plus,
    Minus,
    EndOfLine,
}

impl Terminator {
    fn from_match(s: &str) -> Self {
        match s {
            ")" => Terminator::CloseParen,
            "+" => Terminator::Plus,
            "-" => Terminator::Minus,
            _ => Terminator::EndOfLine,
        }
    }

    /// The text written back after the call; empty for end of line.
    pub fn as_str(self) -> &'static str {
        match self {
            Terminator::CloseParen => ")",
            Terminator::Plus => "+",
            Terminator::Minus => "-",
            Terminator::EndOfLine => "",
        }
    }
}

/// One `!name args` found in source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence<'a> {
    pub name: &'a str,
    /// Argument text with surrounding whitespace removed; empty when absent.
    pub raw_args: &'a str,
    pub terminator: Terminator,
    /// Byte offset of the `!` in the source.
    pub offset: usize,
}

impl fmt::Display for Occurrence<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "!{} {:?} @{}", self.name, self.raw_args, self.offset)
    }
}

fn occurrence<'a>(caps: &Captures<'a>) -> Occurrence<'a> {
    let whole = caps.get(0).map_or(0, |m| m.start());
    Occurrence {
        name: caps.name("name").map_or("", |m| m.as_str()),
        raw_args: caps.name("args").map_or("", |m| m.as_str().trim()),
        terminator: Terminator::from_match(caps.name("end").map_or("", |m| m.as_str())),
        offset: whole,
    }
}

/// Quotes `s` as a host string literal. `\` and `"` are backslash-escaped and
/// `!` is written as `\x21`, so the literal never contains a bang-command.
fn quote_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' | '"' => {
                out.push('\\');
                out.push(ch);
            }
            '!' => out.push_str("\\x21"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// Rewrites bang-commands into calls to the configured dispatch function.
#[derive(Debug, Clone)]
pub struct Rewriter {
    dispatch_fn: String,
    bindings_name: String,
}

impl Default for Rewriter {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Rewriter {
    pub fn new(config: &Config) -> Self {
        Self {
            dispatch_fn: config.dispatch_fn.clone(),
            bindings_name: config.bindings_name.clone(),
        }
    }

    /// Lists every occurrence in `source`, in order.
    pub fn occurrences<'a>(&self, source: &'a str) -> Vec<Occurrence<'a>> {
        bang_regex()
            .captures_iter(source)
            .map(|caps| occurrence(&caps))
            .collect()
    }

    /// Replaces each occurrence with a dispatcher call.
    ///
    /// Never fails; text without occurrences is returned borrowed.
    pub fn rewrite<'a>(&self, source: &'a str) -> Cow<'a, str> {
        bang_regex().replace_all(source, |caps: &Captures<'_>| {
            let occ = occurrence(caps);
            tracing::debug!(
                name = occ.name,
                args = occ.raw_args,
                offset = occ.offset,
                "rewriting bang-command"
            );
            format!(
                "{}({}, {}, {}){}",
                self.dispatch_fn,
                self.bindings_name,
                occ.name,
                quote_literal(occ.raw_args),
                occ.terminator.as_str()
            )
        })
    }
}

/// Rewrites `source` with the default dispatch names.
pub fn rewrite(source: &str) -> Cow<'_, str> {
    Rewriter::default().rewrite(source)
}
