//! Runtime resolution of a bang-command's raw argument string.
//!
//! Every parameter but the last takes one token; the last parameter takes the
//! whole unconsumed remainder, kept as literal text unless it is a single
//! token. Each token is evaluated against the caller's bindings, and a token
//! that names nothing known is passed on as the literal text instead. Omitted trailing parameters fall back to their
//! defaults.

use crate::command::{Callable, Param};
use crate::config::Config;
use crate::env::Bindings;
use crate::expr::{EvalError, Evaluator, ExprEvaluator};
use crate::lexer::{SplitMode, TokenizeError, Tokenizer};
use crate::value::Value;

/// Errors that abort a dispatch.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A required parameter got no token and declares no default.
    #[error("missing argument {0}")]
    MissingArgument(String),
    /// A direct call passed more values than the target declares.
    #[error("takes {expected} arguments but {got} were given")]
    TooManyArguments { expected: usize, got: usize },
    #[error("cannot split arguments: {0}")]
    Tokenize(#[from] TokenizeError),
    /// Evaluation failed for a reason other than an unknown name.
    #[error("cannot evaluate argument {token:?}")]
    Evaluation {
        token: String,
        #[source]
        source: EvalError,
    },
    /// The target itself returned an error.
    #[error("command {name} failed")]
    Call {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Tokenizes, resolves and invokes bang-commands.
///
/// Example
/// ```
/// use bang_commands::command::{FnCommand, Param};
/// use bang_commands::dispatch::Dispatcher;
/// use bang_commands::env::Bindings;
/// use bang_commands::value::Value;
///
/// let add = FnCommand::new(
///     "add",
///     vec![Param::required("x"), Param::optional("y", 5)],
///     |args| Ok(Value::Int(args[0].as_int().unwrap() + args[1].as_int().unwrap())),
/// );
/// let dispatcher: Dispatcher = Dispatcher::default();
/// let result = dispatcher.dispatch(&Bindings::new(), &add, "10").unwrap();
/// assert_eq!(result, Value::Int(15));
/// ```
#[derive(Debug, Clone)]
pub struct Dispatcher<E = ExprEvaluator> {
    mode: SplitMode,
    evaluator: E,
}

impl Dispatcher<ExprEvaluator> {
    pub fn new(config: &Config) -> Self {
        Self::with_evaluator(config.mode, ExprEvaluator)
    }
}

impl Default for Dispatcher<ExprEvaluator> {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl<E: Evaluator> Dispatcher<E> {
    pub fn with_evaluator(mode: SplitMode, evaluator: E) -> Self {
        Self { mode, evaluator }
    }

    /// Resolves `raw_args` against `target`'s parameters and calls it.
    pub fn dispatch(
        &self,
        bindings: &Bindings,
        target: &dyn Callable,
        raw_args: &str,
    ) -> Result<Value, DispatchError> {
        let args = self.resolve(bindings, target.params(), raw_args)?;
        tracing::debug!(command = target.name(), argc = args.len(), "invoking");
        target.call(args).map_err(|source| DispatchError::Call {
            name: target.name().to_string(),
            source,
        })
    }

    /// Builds the positional argument list, one value per parameter.
    pub fn resolve(
        &self,
        bindings: &Bindings,
        params: &[Param],
        raw_args: &str,
    ) -> Result<Vec<Value>, DispatchError> {
        let mut tokens = Tokenizer::new(raw_args, self.mode);
        let mut out = Vec::with_capacity(params.len());

        for (i, param) in params.iter().enumerate() {
            let supplied = if i + 1 == params.len() {
                let rest = tokens.remaining();
                match rest.trim() {
                    "" => None,
                    rest => Some(self.resolve_rest(bindings, rest)?),
                }
            } else {
                match tokens.next_token()? {
                    Some(token) => Some(self.resolve_token(bindings, token)?),
                    None => None,
                }
            };

            let value = match supplied {
                Some(value) => value,
                None => match &param.default {
                    Some(default) => default.clone(),
                    None => return Err(DispatchError::MissingArgument(param.name.clone())),
                },
            };
            tracing::debug!(param = %param.name, value = %value, "resolved argument");
            out.push(value);
        }

        Ok(out)
    }

    /// A remainder holding exactly one token resolves like any other token.
    /// Anything longer, or anything that does not split, is literal text.
    fn resolve_rest(&self, bindings: &Bindings, rest: &str) -> Result<Value, DispatchError> {
        let mut pieces = Tokenizer::new(rest, self.mode);
        let single = match pieces.next_token() {
            Ok(Some(token)) => match pieces.next_token() {
                Ok(None) => Some(token),
                _ => None,
            },
            _ => None,
        };
        match single {
            Some(token) => self.resolve_token(bindings, token),
            None => {
                tracing::trace!(%rest, "remainder is not a single token, using literal text");
                Ok(Value::Str(rest.to_string()))
            }
        }
    }

    fn resolve_token(&self, bindings: &Bindings, token: String) -> Result<Value, DispatchError> {
        // An explicit `""` is an argument in its own right, with nothing to evaluate.
        if token.is_empty() {
            return Ok(Value::Str(token));
        }
        match self.evaluator.evaluate(&token, bindings) {
            Ok(value) => Ok(value),
            Err(EvalError::NameNotFound(name)) => {
                tracing::trace!(%name, token = %token, "unknown name, using literal text");
                Ok(Value::Str(token))
            }
            Err(source) => Err(DispatchError::Evaluation { token, source }),
        }
    }
}

/// Binds already evaluated positional `args` to `params`, filling
/// omitted trailing parameters from their defaults.
pub fn bind_positional(
    params: &[Param],
    args: Vec<Value>,
) -> Result<Vec<Value>, DispatchError> {
    if args.len() > params.len() {
        return Err(DispatchError::TooManyArguments {
            expected: params.len(),
            got: args.len(),
        });
    }
    let mut args = args.into_iter();
    params
        .iter()
        .map(|param| match (args.next(), &param.default) {
            (Some(value), _) => Ok(value),
            (None, Some(default)) => Ok(default.clone()),
            (None, None) => Err(DispatchError::MissingArgument(param.name.clone())),
        })
        .collect()
}
