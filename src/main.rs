use clap::{Parser, Subcommand};
use forthic::runtime::{
    built_ins::register_base_words,
    error::ErrorKind,
    interpreter::{forthic_interpreter::ForthicInterpreter, Interpreter, InterpreterStack},
};
use std::{
    fs::read_to_string,
    io::{stdin, stdout, Write},
    path::PathBuf,
    process::ExitCode,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "forthic")]
#[command(about = "Run Forthic programs", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive read-eval-print loop.
    Repl,

    /// Run a Forthic source file.
    Run {
        /// Path to the source file.
        path: PathBuf,
    },

    /// Evaluate an inline Forthic source fragment.
    Eval {
        /// The source text to run.
        source: String,
    },
}

/// Build an interpreter with the standard word sets installed.
fn new_interpreter() -> ForthicInterpreter {
    let mut interpreter = ForthicInterpreter::new();
    register_base_words(&mut interpreter);
    interpreter
}

/// Is the error the clean halt raised by the debug words?
fn is_intentional_stop(error: &forthic::runtime::error::ScriptError) -> bool {
    matches!(error.kind(), ErrorKind::IntentionalStop)
}

/// The interactive read-eval-print loop.  Each line is run against the same interpreter, so
/// definitions and stack state accumulate across inputs.
fn repl() -> ExitCode {
    let mut interpreter = new_interpreter();
    let mut line = String::new();

    loop {
        print!("> ");

        if stdout().flush().is_err() {
            return ExitCode::FAILURE;
        }

        line.clear();

        match stdin().read_line(&mut line) {
            Ok(0) | Err(_) => return ExitCode::SUCCESS,
            Ok(_) => {}
        }

        match interpreter.run_with_name("<repl>", &line) {
            Ok(()) => println!("ok"),

            Err(error) if is_intentional_stop(&error) => return ExitCode::SUCCESS,

            Err(error) => eprintln!("Error: {}", error),
        }
    }
}

/// Run a source file to completion.
fn run_file(path: &PathBuf) -> ExitCode {
    let source = match read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("Error: could not read {}: {}", path.display(), error);
            return ExitCode::FAILURE;
        }
    };

    let mut interpreter = new_interpreter();

    run_to_exit_code(
        &mut interpreter,
        &path.display().to_string(),
        &source,
    )
}

/// Evaluate an inline fragment and print what is left on the stack.
fn eval_inline(source: &str) -> ExitCode {
    let mut interpreter = new_interpreter();
    let code = run_to_exit_code(&mut interpreter, "<eval>", source);

    for value in interpreter.stack() {
        println!("{}", value);
    }

    code
}

/// Run source text, mapping an intentional stop to a clean exit.
fn run_to_exit_code(
    interpreter: &mut ForthicInterpreter,
    source_name: &str,
    source: &str,
) -> ExitCode {
    match interpreter.run_with_name(source_name, source) {
        Ok(()) => ExitCode::SUCCESS,

        Err(error) if is_intentional_stop(&error) => ExitCode::SUCCESS,

        Err(error) => {
            eprintln!("Error: {}", error);
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Repl => repl(),

        Command::Run { path } => {
            info!(path = %path.display(), "running file");
            run_file(&path)
        }

        Command::Eval { source } => eval_inline(&source),
    }
}
