//! The preprocessing stage a host runs before handing source to its parser.
//!
//! Hosts hold a [`CompileHook`] and call [`CompileHook::compile`] (or
//! [`CompileHook::preprocess`]) explicitly; nothing is patched globally. The
//! hook is immutable while compiling, so one instance can be shared between
//! threads once built.

use crate::rewrite::Rewriter;
use std::borrow::Cow;
use std::sync::Arc;

/// A source-to-source transform applied before compilation.
pub trait Preprocessor: Send + Sync {
    fn preprocess<'a>(&self, source: &'a str) -> Cow<'a, str>;
}

impl Preprocessor for Rewriter {
    fn preprocess<'a>(&self, source: &'a str) -> Cow<'a, str> {
        self.rewrite(source)
    }
}

/// Leaves source untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Preprocessor for Passthrough {
    fn preprocess<'a>(&self, source: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(source)
    }
}

/// Holder of the currently installed preprocessing stage.
#[derive(Clone)]
pub struct CompileHook {
    stage: Arc<dyn Preprocessor>,
}

impl Default for CompileHook {
    /// A hook running the bang-command [`Rewriter`] with default names.
    fn default() -> Self {
        Self::new(Rewriter::default())
    }
}

impl CompileHook {
    pub fn new(stage: impl Preprocessor + 'static) -> Self {
        Self {
            stage: Arc::new(stage),
        }
    }

    /// Replaces the installed stage. Installing twice does not stack.
    pub fn install(&mut self, stage: impl Preprocessor + 'static) {
        self.stage = Arc::new(stage);
    }

    pub fn preprocess<'a>(&self, source: &'a str) -> Cow<'a, str> {
        self.stage.preprocess(source)
    }

    /// Runs the stage on `source`, then `parser` on the result.
    pub fn compile<T, E>(
        &self,
        source: &str,
        parser: impl FnOnce(&str) -> Result<T, E>,
    ) -> Result<T, E> {
        let processed = self.preprocess(source);
        parser(&processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    struct Upper;

    impl Preprocessor for Upper {
        fn preprocess<'a>(&self, source: &'a str) -> Cow<'a, str> {
            Cow::Owned(source.to_uppercase())
        }
    }

    #[test]
    fn test_compile_sees_rewritten_source() {
        let hook = CompileHook::default();
        let seen: Result<String, ()> = hook.compile("!ping", |src| Ok(src.to_string()));
        assert_eq!(seen.unwrap(), r#"__bang__(__locals__, ping, "")"#);
    }

    #[test]
    fn test_install_replaces_instead_of_stacking() {
        let mut hook = CompileHook::new(Upper);
        hook.install(Passthrough);
        hook.install(Passthrough);
        assert_eq!(hook.preprocess("!ping"), "!ping");
        hook.install(Upper);
        assert_eq!(hook.preprocess("abc"), "ABC");
    }

    #[test]
    fn test_parser_errors_pass_through() {
        let hook = CompileHook::new(Passthrough);
        let res: Result<(), String> = hook.compile("x", |_| Err("bad".to_string()));
        assert_eq!(res, Err("bad".to_string()));
    }

    #[test]
    fn test_shared_between_threads() {
        let hook = CompileHook::default();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let hook = hook.clone();
                thread::spawn(move || hook.preprocess(&format!("!n{}", i)).into_owned())
            })
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(
                h.join().unwrap(),
                format!(r#"__bang__(__locals__, n{}, "")"#, i)
            );
        }
    }
}
