use crate::command::{Callable, CommandTable, Param};
use crate::expr;
use crate::value::Value;
use anyhow::{Context, Result};
use std::marker::PhantomData;

/// Commands known to the interpreter at compile time.
///
/// Each one declares its parameter list once; [`Builtin`] adapts it to the
/// object-safe [`Callable`] trait so it can live in a [`CommandTable`].
pub(crate) trait BuiltinCommand {
    /// Canonical name of the command, e.g. "echo" or "greet".
    fn name() -> &'static str;

    /// Declared parameters, in order. The last one receives the remainder.
    fn params() -> Vec<Param>;

    /// Runs the command with exactly one value per declared parameter.
    fn execute(args: Vec<Value>) -> Result<Value>;
}

/// Wraps a [`BuiltinCommand`] type as a [`Callable`].
pub(crate) struct Builtin<T> {
    params: Vec<Param>,
    _phantom: PhantomData<T>,
}

impl<T: BuiltinCommand> Default for Builtin<T> {
    fn default() -> Self {
        Self {
            params: T::params(),
            _phantom: PhantomData,
        }
    }
}

impl<T: BuiltinCommand> Callable for Builtin<T> {
    fn name(&self) -> &str {
        T::name()
    }

    fn params(&self) -> &[Param] {
        &self.params
    }

    fn call(&self, args: Vec<Value>) -> Result<Value> {
        T::execute(args)
    }
}

/// The default command set:
/// `echo`, `greet`, `add`, `upper`, `repeat`, `len`.
pub fn default_commands() -> CommandTable {
    let mut table = CommandTable::new();
    table.register(Builtin::<Echo>::default());
    table.register(Builtin::<Greet>::default());
    table.register(Builtin::<Add>::default());
    table.register(Builtin::<Upper>::default());
    table.register(Builtin::<Repeat>::default());
    table.register(Builtin::<Len>::default());
    table
}

fn take_args<const N: usize>(name: &str, args: Vec<Value>) -> Result<[Value; N]> {
    let got = args.len();
    args.try_into()
        .map_err(|_| anyhow::anyhow!("{}: expected {} arguments, got {}", name, N, got))
}

/// Returns its text unchanged, formatted as a string.
pub struct Echo;

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn params() -> Vec<Param> {
        vec![Param::optional("text", "")]
    }

    fn execute(args: Vec<Value>) -> Result<Value> {
        let [text]: [Value; 1] = take_args(Self::name(), args)?;
        Ok(Value::Str(text.to_string()))
    }
}

pub struct Greet;

impl BuiltinCommand for Greet {
    fn name() -> &'static str {
        "greet"
    }

    fn params() -> Vec<Param> {
        vec![Param::required("name")]
    }

    fn execute(args: Vec<Value>) -> Result<Value> {
        let [name]: [Value; 1] = take_args(Self::name(), args)?;
        Ok(Value::Str(format!("Hello, {}!", name)))
    }
}

/// Numeric addition, or concatenation for two strings.
pub struct Add;

impl BuiltinCommand for Add {
    fn name() -> &'static str {
        "add"
    }

    fn params() -> Vec<Param> {
        vec![Param::required("x"), Param::optional("y", 0)]
    }

    fn execute(args: Vec<Value>) -> Result<Value> {
        let [x, y]: [Value; 2] = take_args(Self::name(), args)?;
        expr::add(x, y).context("add")
    }
}

pub struct Upper;

impl BuiltinCommand for Upper {
    fn name() -> &'static str {
        "upper"
    }

    fn params() -> Vec<Param> {
        vec![Param::required("text")]
    }

    fn execute(args: Vec<Value>) -> Result<Value> {
        let [text]: [Value; 1] = take_args(Self::name(), args)?;
        Ok(Value::Str(text.to_string().to_uppercase()))
    }
}

/// Repeats `text` `times` times, separated by spaces.
pub struct Repeat;

impl BuiltinCommand for Repeat {
    fn name() -> &'static str {
        "repeat"
    }

    fn params() -> Vec<Param> {
        vec![Param::required("text"), Param::optional("times", 2)]
    }

    fn execute(args: Vec<Value>) -> Result<Value> {
        let [text, times]: [Value; 2] = take_args(Self::name(), args)?;
        let times = times
            .as_int()
            .and_then(|n| usize::try_from(n).ok())
            .with_context(|| format!("repeat: times must be a non-negative int, got {}", times))?;
        let text = text.to_string();
        expr::repeat_str(&text, times, " ")
            .map(Value::Str)
            .with_context(|| format!("repeat: result longer than {} bytes", expr::MAX_STR_LEN))
    }
}

/// Number of characters in the textual form of a value.
pub struct Len;

impl BuiltinCommand for Len {
    fn name() -> &'static str {
        "len"
    }

    fn params() -> Vec<Param> {
        vec![Param::required("value")]
    }

    fn execute(args: Vec<Value>) -> Result<Value> {
        let [value]: [Value; 1] = take_args(Self::name(), args)?;
        let n = match &value {
            Value::Str(s) => s.chars().count(),
            Value::Bindings(b) => b.len(),
            other => anyhow::bail!("len: object of type '{}' has no len()", other.type_name()),
        };
        Ok(Value::Int(i64::try_from(n).context("len: too large")?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Registry;

    fn call(name: &str, args: Vec<Value>) -> Result<Value> {
        let table = default_commands();
        let cmd = table
            .callable(name)
            .with_context(|| format!("{} not registered", name))?;
        cmd.call(args)
    }

    #[test]
    fn test_default_commands_registered() {
        let table = default_commands();
        assert_eq!(
            table.names(),
            vec!["add", "echo", "greet", "len", "repeat", "upper"]
        );
    }

    #[test]
    fn test_params_match_declarations() {
        let table = default_commands();
        let add = table.callable("add").unwrap();
        assert_eq!(add.params()[0], Param::required("x"));
        assert_eq!(add.params()[1], Param::optional("y", 0));
    }

    #[test]
    fn test_echo_and_greet() -> Result<()> {
        assert_eq!(call("echo", vec![Value::Int(3)])?, Value::from("3"));
        assert_eq!(call("greet", vec![Value::from("world")])?, Value::from("Hello, world!"));
        Ok(())
    }

    #[test]
    fn test_add() -> Result<()> {
        assert_eq!(call("add", vec![Value::Int(2), Value::Int(3)])?, Value::Int(5));
        assert_eq!(call("add", vec![Value::Int(2), Value::Float(0.5)])?, Value::Float(2.5));
        assert_eq!(call("add", vec![Value::from("a"), Value::from("b")])?, Value::from("ab"));
        assert!(call("add", vec![Value::from("a"), Value::Int(1)]).is_err());
        Ok(())
    }

    #[test]
    fn test_repeat_and_upper() -> Result<()> {
        assert_eq!(
            call("repeat", vec![Value::from("ha"), Value::Int(3)])?,
            Value::from("ha ha ha")
        );
        assert!(call("repeat", vec![Value::from("ha"), Value::from("x")]).is_err());
        assert!(call("repeat", vec![Value::from("ha"), Value::Int(i64::MAX)]).is_err());
        assert_eq!(call("upper", vec![Value::from("shout")])?, Value::from("SHOUT"));
        Ok(())
    }

    #[test]
    fn test_len() -> Result<()> {
        assert_eq!(call("len", vec![Value::from("héllo")])?, Value::Int(5));
        assert!(call("len", vec![Value::Int(5)]).is_err());
        Ok(())
    }

    #[test]
    fn test_wrong_arity_is_an_error() {
        let err = call("greet", vec![]).unwrap_err();
        assert_eq!(err.to_string(), "greet: expected 1 arguments, got 0");
    }
}
