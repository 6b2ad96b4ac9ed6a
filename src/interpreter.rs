use crate::builtin;
use crate::command::{CommandTable, Registry};
use crate::config::Config;
use crate::dispatch::{self, Dispatcher};
use crate::env::Bindings;
use crate::expr::{self, EvalError, ProgramScope, Scope};
use crate::hook::{CompileHook, Preprocessor};
use crate::rewrite::Rewriter;
use crate::value::Value;
use anyhow::Context;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result};

/// A minimal script host that understands bang-commands.
///
/// Source handed to [`Interpreter::run`] first goes through the installed
/// [`CompileHook`], then is executed statement by statement. Rewritten
/// commands reach the [`Dispatcher`] with a snapshot of the variables
/// assigned so far.
///
/// Example
/// ```
/// use bang_commands::Interpreter;
/// use bang_commands::value::Value;
/// let mut sh = Interpreter::default();
/// let value = sh.run("who = 'there'\n(!greet who)").unwrap();
/// assert_eq!(value, Value::from("Hello, there!"));
/// ```
pub struct Interpreter {
    config: Config,
    bindings: Bindings,
    commands: CommandTable,
    hook: CompileHook,
    dispatcher: Dispatcher,
}

impl Interpreter {
    /// Create an interpreter with a custom command set.
    pub fn new(config: Config, commands: CommandTable) -> Self {
        Self {
            hook: CompileHook::new(Rewriter::new(&config)),
            dispatcher: Dispatcher::new(&config),
            bindings: Bindings::new(),
            commands,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut Bindings {
        &mut self.bindings
    }

    pub fn commands_mut(&mut self) -> &mut CommandTable {
        &mut self.commands
    }

    /// Replaces the preprocessing stage run before every [`Interpreter::run`].
    pub fn set_preprocessor(&mut self, stage: impl Preprocessor + 'static) {
        self.hook.install(stage);
    }

    /// Preprocesses and executes `source`, returning the value of its last
    /// expression statement.
    pub fn run(&mut self, source: &str) -> anyhow::Result<Value> {
        let hook = self.hook.clone();
        hook.compile(source, |code| {
            tracing::trace!(%code, "compiled source");
            expr::exec_program(code, self)
        })
        .context("script failed")
    }

    /// Interactive loop: every line is run through [`Interpreter::run`].
    pub fn repl(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;

        loop {
            match rl.readline("!> ") {
                Ok(line) => {
                    rl.add_history_entry(line.as_str())?;
                    match self.run(&line) {
                        Ok(Value::None) => {}
                        Ok(value) => println!("{}", value),
                        Err(err) => {
                            tracing::warn!(error = %format!("{:#}", err), "line failed");
                            println!("error: {:#}", err);
                        }
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    /// Handles `__bang__(bindings, command, "args")`.
    fn call_dispatch(&self, args: Vec<Value>) -> std::result::Result<Value, EvalError> {
        let [bindings, target, raw]: [Value; 3] = args.try_into().map_err(|args: Vec<Value>| {
            EvalError::Type(format!(
                "{}() takes 3 arguments but {} were given",
                self.config.dispatch_fn,
                args.len()
            ))
        })?;

        let (Value::Bindings(bindings), Value::Command(name), Value::Str(raw)) =
            (bindings, target, raw)
        else {
            return Err(EvalError::Type(format!(
                "{}() expects (bindings, command, str)",
                self.config.dispatch_fn
            )));
        };

        let command = self
            .commands
            .callable(&name)
            .ok_or_else(|| EvalError::NameNotFound(name.clone()))?;
        self.dispatcher
            .dispatch(&bindings, command, &raw)
            .map_err(|e| EvalError::Call(e.into()))
    }
}

impl Scope for Interpreter {
    fn lookup(&self, name: &str) -> Option<Value> {
        if name == self.config.bindings_name {
            return Some(Value::Bindings(self.bindings.clone()));
        }
        if let Some(value) = self.bindings.get_var(name) {
            return Some(value.clone());
        }
        if name == self.config.dispatch_fn || self.commands.contains(name) {
            return Some(Value::Command(name.to_string()));
        }
        None
    }

    fn call(&self, callee: Value, args: Vec<Value>) -> std::result::Result<Value, EvalError> {
        let Value::Command(name) = callee else {
            return Err(EvalError::NotCallable(callee.to_string()));
        };
        if name == self.config.dispatch_fn {
            return self.call_dispatch(args);
        }

        let command = self
            .commands
            .callable(&name)
            .ok_or_else(|| EvalError::NameNotFound(name.clone()))?;
        let args = dispatch::bind_positional(command.params(), args)
            .with_context(|| format!("{}()", name))
            .map_err(EvalError::Call)?;
        command
            .call(args)
            .map_err(|e| EvalError::Call(e.context(format!("{}()", name))))
    }
}

impl ProgramScope for Interpreter {
    fn assign(&mut self, name: &str, value: Value) {
        self.bindings.set_var(name, value);
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default configuration and the built-in
    /// commands: `echo`, `greet`, `add`, `upper`, `repeat`, `len`.
    fn default() -> Self {
        Self::new(Config::default(), builtin::default_commands())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{FnCommand, Param};
    use crate::hook::Passthrough;
    use crate::lexer::SplitMode;

    fn run(src: &str) -> anyhow::Result<Value> {
        Interpreter::default().run(src)
    }

    #[test]
    fn test_greet_inside_parens() -> anyhow::Result<()> {
        assert_eq!(run("(!greet world)")?, Value::from("Hello, world!"));
        Ok(())
    }

    #[test]
    fn test_statement_form() -> anyhow::Result<()> {
        assert_eq!(run("!echo hello   big world")?, Value::from("hello   big world"));
        assert_eq!(run("!echo")?, Value::from(""));
        Ok(())
    }

    #[test]
    fn test_arithmetic_around_commands() -> anyhow::Result<()> {
        assert_eq!(run("(!add 2 3) * 10")?, Value::Int(50));
        assert_eq!(run("1 + !add 2 3 + 4")?, Value::Int(10));
        assert_eq!(run("x = 10\n20 - !add x 5 - 1")?, Value::Int(4));
        Ok(())
    }

    #[test]
    fn test_commands_see_assigned_variables() -> anyhow::Result<()> {
        let mut sh = Interpreter::default();
        sh.run("name = 'Ada'\nn = 3")?;
        assert_eq!(sh.run("!greet name")?, Value::from("Hello, Ada!"));
        assert_eq!(sh.run("!repeat name n")?, Value::from("Ada Ada Ada"));
        // `who` is unbound, so the token is passed as text.
        assert_eq!(sh.run("!greet who")?, Value::from("Hello, who!"));
        Ok(())
    }

    #[test]
    fn test_result_can_be_assigned() -> anyhow::Result<()> {
        let mut sh = Interpreter::default();
        sh.run("loud = (!upper quiet)\nsize = !len loud")?;
        assert_eq!(sh.bindings().get_var("loud"), Some(&Value::from("QUIET")));
        assert_eq!(sh.bindings().get_var("size"), Some(&Value::Int(5)));
        Ok(())
    }

    #[test]
    fn test_quoted_arguments_survive_the_rewrite() -> anyhow::Result<()> {
        assert_eq!(run(r#"!upper "two words""#)?, Value::from("TWO WORDS"));
        assert_eq!(run(r#"!add "a b" "c""#)?, Value::from("a bc"));
        Ok(())
    }

    #[test]
    fn test_bang_inside_arguments_reaches_command_intact() -> anyhow::Result<()> {
        assert_eq!(run("!echo hi !there all")?, Value::from("hi !there all"));
        assert_eq!(run("(!upper wow!) + '?'")?, Value::from("WOW!?"));
        Ok(())
    }

    #[test]
    fn test_missing_argument_is_reported() {
        let err = run("!greet").unwrap_err();
        assert_eq!(format!("{:#}", err), "script failed: missing argument name");
    }

    #[test]
    fn test_unknown_command_fails() {
        let err = run("!nosuch thing").unwrap_err();
        assert!(format!("{:#}", err).contains("name 'nosuch' is not defined"));
    }

    #[test]
    fn test_direct_calls_use_defaults() -> anyhow::Result<()> {
        assert_eq!(run("add(1)")?, Value::Int(1));
        assert_eq!(run("add(1, 2)")?, Value::Int(3));
        assert!(run("add(1, 2, 3)").is_err());
        assert!(run("greet()").is_err());
        Ok(())
    }

    #[test]
    fn test_locals_snapshot() -> anyhow::Result<()> {
        let mut sh = Interpreter::default();
        sh.run("a = 1; b = 2")?;
        assert_eq!(sh.run("len(__locals__)")?, Value::Int(2));
        Ok(())
    }

    #[test]
    fn test_custom_command_and_names() -> anyhow::Result<()> {
        let config = Config {
            mode: SplitMode::Naive,
            dispatch_fn: "call_cmd".into(),
            bindings_name: "scope".into(),
        };
        let mut commands = CommandTable::new();
        commands.register(FnCommand::new(
            "pair",
            vec![Param::required("a"), Param::required("b")],
            |args| Ok(Value::Str(format!("{}+{}", args[0], args[1]))),
        ));
        let mut sh = Interpreter::new(config, commands);
        // Naive splitting keeps the quote characters as ordinary text.
        assert_eq!(sh.run(r#"!pair a"b c" d"#)?, Value::from(r#"a"b+c" d"#));
        Ok(())
    }

    #[test]
    fn test_preprocessor_can_be_replaced() {
        let mut sh = Interpreter::default();
        sh.set_preprocessor(Passthrough);
        assert!(sh.run("!echo hi").is_err());
    }
}
