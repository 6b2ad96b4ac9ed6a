use crate::lexer::SplitMode;

/// Settings shared by the rewriter, the dispatcher and the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// How argument strings are split into tokens.
    pub mode: SplitMode,
    /// Name of the function rewritten commands call.
    pub dispatch_fn: String,
    /// Identifier that stands for the bindings visible at the call site.
    pub bindings_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: SplitMode::Shell,
            dispatch_fn: "__bang__".to_string(),
            bindings_name: "__locals__".to_string(),
        }
    }
}
