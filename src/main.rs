use anyhow::{Context, Result};
use argh::FromArgs;
use bang_commands::lexer::SplitMode;
use bang_commands::rewrite::Rewriter;
use bang_commands::value::Value;
use bang_commands::{Config, Interpreter, default_commands};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Rewrite and run scripts containing `!name args` commands.
struct Cli {
    #[argh(switch)]
    /// split command arguments on whitespace only, ignoring quotes
    naive: bool,

    #[argh(option)]
    /// name of the function rewritten commands call (default: __bang__)
    dispatch_fn: Option<String>,

    #[argh(option)]
    /// identifier standing for the caller's variables (default: __locals__)
    bindings_name: Option<String>,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Rewrite(RewriteCmd),
    Run(RunCmd),
    Repl(ReplCmd),
}

#[derive(FromArgs)]
/// Print a script with every bang-command rewritten into a call.
#[argh(subcommand, name = "rewrite")]
struct RewriteCmd {
    #[argh(positional)]
    /// script to rewrite
    path: PathBuf,
}

#[derive(FromArgs)]
/// Run a script and print the value of its last expression.
#[argh(subcommand, name = "run")]
struct RunCmd {
    #[argh(positional)]
    /// script to run
    path: PathBuf,
}

#[derive(FromArgs)]
/// Start an interactive session.
#[argh(subcommand, name = "repl")]
struct ReplCmd {}

impl Cli {
    fn config(&self) -> Config {
        let defaults = Config::default();
        Config {
            mode: if self.naive {
                SplitMode::Naive
            } else {
                SplitMode::Shell
            },
            dispatch_fn: self.dispatch_fn.clone().unwrap_or(defaults.dispatch_fn),
            bindings_name: self.bindings_name.clone().unwrap_or(defaults.bindings_name),
        }
    }
}

fn read_script(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("can't read {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli: Cli = argh::from_env();
    let config = cli.config();
    tracing::debug!(mode = %config.mode, dispatch_fn = %config.dispatch_fn, "starting");

    match cli.command {
        Command::Rewrite(cmd) => {
            let source = read_script(&cmd.path)?;
            print!("{}", Rewriter::new(&config).rewrite(&source));
        }
        Command::Run(cmd) => {
            let source = read_script(&cmd.path)?;
            let mut sh = Interpreter::new(config, default_commands());
            let value = sh
                .run(&source)
                .with_context(|| format!("while running {}", cmd.path.display()))?;
            if value != Value::None {
                println!("{}", value);
            }
        }
        Command::Repl(_) => {
            Interpreter::new(config, default_commands()).repl()?;
        }
    }

    Ok(())
}
