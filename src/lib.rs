//! Bang-commands for embedded scripts.
//!
//! Script text may contain commands written as `!name arg1 arg2 ...`. Before the
//! text is compiled, the [`rewrite`] stage turns every such command into a call
//! `__bang__(__locals__, name, "arg1 arg2 ...")`; when that call runs, the
//! [`dispatch`] stage splits the argument string with shell-like rules,
//! evaluates each piece against the caller's variables (falling back to the
//! literal text for unknown names) and invokes the command.
//!
//! The public modules [`lexer`], [`rewrite`], [`hook`] and [`dispatch`] form
//! the core; [`command`] and [`env`] define what a host must supply. The
//! [`Interpreter`] is a small host built on [`expr`] that ties everything
//! together and powers the `bang` binary.

mod builtin;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod env;
pub mod expr;
pub mod hook;
mod interpreter;
pub mod lexer;
pub mod rewrite;
pub mod value;

pub use builtin::default_commands;
pub use config::Config;

/// Just a convenient re-export of the script host.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
