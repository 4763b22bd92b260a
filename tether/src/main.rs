use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, MietteHandlerOpts, Result};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use tether_interpreter::{Interpreter, InterpreterOptions, format_value};
use tracing_subscriber::EnvFilter;

mod repl;
mod sexpr;

use repl::{ReplConfig, ReplError, ReplSession, detached, evaluate_program};

#[derive(Parser)]
#[command(
    name = "tether",
    version,
    about = "Evaluate Tether code through the host bridge",
    long_about = "Tether is an embedded R-flavoured interpreter. Every evaluation goes through the bridge, \
                  which turns interpreter errors, interrupts and restarts into ordinary host errors.",
    before_help = format!("Tether v{}\n", env!("CARGO_PKG_VERSION"))
)]
struct Cli {
    /// Log bridge and interpreter decisions (overrides TETHER_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate expressions and print their values
    Eval {
        /// Expressions to evaluate, or files with --file
        #[arg(required = true, value_name = "EXPR")]
        inputs: Vec<String>,

        /// Treat each input as a path to a source file ('-' reads stdin)
        #[arg(short, long)]
        file: bool,

        /// Nested evaluation depth allowed before an error is signalled
        #[arg(long, default_value_t = InterpreterOptions::default().max_eval_depth)]
        max_depth: usize,
    },

    /// Parse source files and display their AST
    Parse {
        /// Source files to parse (use '-' to read from stdin)
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Show detailed span information in output
        #[arg(short, long)]
        spans: bool,
    },

    /// Start an interactive session (the default)
    Repl {
        /// Do not read or write the history file
        #[arg(long)]
        no_history: bool,
    },
}

fn main() {
    setup_miette_handler();

    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match cli.command {
        Some(Commands::Eval {
            inputs,
            file,
            max_depth,
        }) => handle_eval_command(inputs, file, max_depth),
        Some(Commands::Parse { files, spans }) => handle_parse_command(files, spans),
        Some(Commands::Repl { no_history }) => handle_repl_command(no_history, cli.verbose),
        None => handle_repl_command(false, cli.verbose),
    }
}

/// Install the tracing subscriber, filtered by `TETHER_LOG`
fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("TETHER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Configure miette error reporting with syntax highlighting
fn setup_miette_handler() {
    use miette::highlighters::SyntectHighlighter;
    use syntect::highlighting::ThemeSet;

    let syntax_set = syntect::parsing::SyntaxSet::load_defaults_newlines();
    let theme_set = ThemeSet::load_defaults();

    let theme = &theme_set.themes["base16-ocean.dark"];
    let highlighter = SyntectHighlighter::new(syntax_set, theme.clone(), true);

    miette::set_hook(Box::new(move |_| {
        Box::new(
            MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .color(true)
                .tab_width(4)
                .with_cause_chain()
                .with_syntax_highlighting(highlighter.clone())
                .build(),
        )
    }))
    .ok();
}

fn read_source(path: &str) -> Result<(String, String)> {
    if path == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).into_diagnostic()?;
        Ok((buffer, "<stdin>".to_string()))
    } else {
        let source = fs::read_to_string(path)
            .map_err(|e| miette::miette!("Cannot read {}: {}", path, e))?;
        Ok((source, path.to_string()))
    }
}

fn handle_eval_command(inputs: Vec<String>, file: bool, max_depth: usize) {
    let interp = Interpreter::new(InterpreterOptions {
        max_eval_depth: max_depth,
        ..InterpreterOptions::default()
    });

    for input in inputs {
        let source = if file {
            match read_source(&input) {
                Ok((source, _)) => source,
                Err(e) => {
                    eprintln!("{:?}", e);
                    process::exit(1);
                }
            }
        } else {
            input
        };

        let result = evaluate_program(&interp, &source);
        for text in interp.take_output() {
            println!("{}", text);
        }

        match result {
            Ok(Some(value)) => println!("{}", format_value(&interp, value)),
            Ok(None) => {}
            Err(ReplError::Parse { source }) => {
                eprintln!("{:?}", miette::Report::new(source));
                process::exit(1);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
    }
}

fn handle_parse_command(files: Vec<PathBuf>, spans: bool) {
    let mut success = true;
    let multiple_files = files.len() > 1;

    for file_path in files {
        let display_name = if file_path.to_str() == Some("-") {
            "<stdin>".to_string()
        } else {
            file_path.display().to_string()
        };

        match parse_single_file(&file_path, spans) {
            Ok(()) => {
                if multiple_files {
                    println!("✅ {}", display_name);
                }
            }
            Err(e) => {
                eprintln!("{:?}", e);
                success = false;
            }
        }
    }

    if !success {
        process::exit(1);
    }
}

fn parse_single_file(file_path: &PathBuf, spans: bool) -> Result<()> {
    let path = file_path.to_string_lossy();
    if path != "-" && !file_path.exists() {
        return Err(miette::miette!("File not found: {}", file_path.display()));
    }

    let (source, source_name) = read_source(&path)?;
    let ast = tether_parser::parse_program(&source).map_err(|error| {
        miette::Report::new(error).wrap_err(format!("Parsing {} failed", source_name))
    })?;

    if spans {
        println!("{:#?}", ast);
    } else {
        println!("{}", sexpr::format_program_as_sexpr(&ast));
    }
    Ok(())
}

fn handle_repl_command(no_history: bool, verbose: bool) {
    let config = ReplConfig {
        verbose_errors: verbose,
        persist_history: !no_history,
        ..ReplConfig::default()
    };

    let outcome = ReplSession::with_config(config).and_then(|mut session| session.run());
    if let Err(e) = outcome {
        eprintln!("{:?}", miette::Report::new(detached(&e)));
        process::exit(1);
    }
}
