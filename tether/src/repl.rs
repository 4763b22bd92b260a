//! Interactive session for the Tether interpreter.
//!
//! Input is parsed into an expression vector and every expression goes
//! through the bridge, so errors and interrupts come back as `BridgeError`s
//! instead of unwinding through the loop. Lines starting with `:` are session
//! commands. Unfinished expressions continue on the next line; rustyline
//! provides editing and history.

use miette::Diagnostic;
use rustyline::{DefaultEditor, error::ReadlineError};
use tether_bridge::{BridgeError, evaluate, toplevel};
use tether_interpreter::{Interpreter, InterpreterOptions, ParseStatus, Sexp, Shield, format_value};
use tether_parser::{ParseError, parse_program};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Diagnostic)]
pub enum ReplError {
    #[error("Parse error: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("{source}")]
    Evaluation {
        #[from]
        source: BridgeError,
    },

    #[error("Line editor failed: {source}")]
    Readline {
        #[from]
        source: ReadlineError,
    },

    #[error("Unknown command {name}")]
    #[diagnostic(code(tether::repl::command), help("Type :help to list the commands"))]
    UnknownCommand { name: String },

    #[error("Internal REPL error: {message}")]
    #[diagnostic(code(tether::repl::internal))]
    Internal { message: String },
}

/// Parse `source` and evaluate each of its expressions in the global scope.
///
/// Returns the value of the last expression, or `None` for empty input.
/// Evaluation stops at the first failing expression.
pub fn evaluate_program(interp: &Interpreter, source: &str) -> Result<Option<Sexp>, ReplError> {
    let (status, exprs) = interp.parse_vector(source);
    if status != ParseStatus::Ok {
        return Err(match interp.last_parse_error() {
            Some(source) => ReplError::Parse { source },
            None => ReplError::Internal {
                message: format!("parser reported {:?} without a diagnostic", status),
            },
        });
    }
    let _exprs = Shield::new(interp, exprs);

    let mut last = None;
    for index in 0..interp.length(exprs) {
        let expr = interp.vector_elt(exprs, index);
        let value = toplevel(interp, |interp| evaluate(interp, expr, interp.global_env()))?;
        last = Some(value);
    }
    Ok(last)
}

/// Copy a diagnostic's message, code and help into a sendable report.
///
/// Bridge errors hold interpreter handles and cannot be wrapped in a
/// `miette::Report` directly.
pub fn detached(diagnostic: &dyn Diagnostic) -> miette::MietteDiagnostic {
    let mut report = miette::MietteDiagnostic::new(diagnostic.to_string());
    if let Some(code) = diagnostic.code() {
        report = report.with_code(code.to_string());
    }
    if let Some(help) = diagnostic.help() {
        report = report.with_help(help.to_string());
    }
    report
}

/// True unless the parser ran out of input in the middle of an expression
pub fn is_input_complete(input: &str) -> bool {
    parse_program(input).map_or_else(|error| !error.is_incomplete(), |_| true)
}

#[derive(Debug, Clone)]
pub struct ReplConfig {
    /// Render evaluation errors as full diagnostics
    pub verbose_errors: bool,
    pub prompt: String,
    /// Prompt shown while an expression is unfinished
    pub continuation_prompt: String,
    /// Load history on start and write it back on exit
    pub persist_history: bool,
    pub history_file: Option<String>,
    /// Options for the session's interpreter
    pub interpreter: InterpreterOptions,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            verbose_errors: false,
            prompt: "tether> ".to_string(),
            continuation_prompt: "... ".to_string(),
            persist_history: true,
            history_file: Some(".tether_history".to_string()),
            interpreter: InterpreterOptions::default(),
        }
    }
}

/// Counters reported by `:stats`
#[derive(Debug, Clone, Default)]
pub struct ReplStats {
    pub lines_evaluated: usize,
    pub errors: usize,
    pub commands: usize,
    /// Objects freed by `:gc`
    pub objects_collected: usize,
}

/// What a line of input produced
#[derive(Debug)]
pub enum ReplResult {
    Value {
        /// The formatted value of the last expression
        value: String,
        /// Text written by `print` during evaluation
        output: Vec<String>,
    },
    Command {
        message: String,
    },
    Empty,
    Exit,
}

/// Session commands, written with a leading `:`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplCommand {
    Help,
    Collect,
    Stats,
    Interrupt,
    Quit,
}

impl ReplCommand {
    fn parse(name: &str) -> Option<Self> {
        match name {
            ":help" | ":h" | ":?" => Some(Self::Help),
            ":gc" => Some(Self::Collect),
            ":stats" => Some(Self::Stats),
            ":interrupt" => Some(Self::Interrupt),
            ":quit" | ":q" | ":exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

const HELP: &str = r#"Commands:
  :help, :h, :?       Show this message
  :gc                 Run the collector and report what it freed
  :stats              Session counters and heap statistics
  :interrupt          Cancel the next evaluation
  :quit, :q, :exit    Leave the session

Try:
  1 + 1
  x <- c(1, 2, 3)
  f <- function(a, b = 2) a * b
  tryCatch(stop("boom"), error = function(e) conditionMessage(e))

An unfinished expression continues on the next line:
  f <- function(x) {
    x + 1
  }

Ctrl+C discards the current input, Ctrl+D leaves the session."#;

/// An interactive session owning one interpreter
pub struct ReplSession {
    editor: DefaultEditor,
    interp: Interpreter,
    config: ReplConfig,
    stats: ReplStats,
}

impl ReplSession {
    pub fn with_config(config: ReplConfig) -> Result<Self, ReplError> {
        let mut editor = DefaultEditor::new()?;
        if let (true, Some(path)) = (config.persist_history, &config.history_file) {
            // No history file yet on a first run
            if editor.load_history(path).is_err() {
                debug!(path = %path, "no history loaded");
            }
        }

        Ok(Self {
            editor,
            interp: Interpreter::new(config.interpreter.clone()),
            config,
            stats: ReplStats::default(),
        })
    }

    /// Read, evaluate and print until `:quit` or end of input
    pub fn run(&mut self) -> Result<(), ReplError> {
        println!("Tether v{}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for commands, :quit to leave");
        println!();

        loop {
            let Some(input) = self.read_input()? else {
                break;
            };
            match self.evaluate_line(&input) {
                Ok(ReplResult::Exit) => break,
                Ok(result) => self.show(result),
                Err(error) => {
                    self.stats.errors += 1;
                    self.report(error, &input);
                }
            }
        }

        if let (true, Some(path)) = (self.config.persist_history, &self.config.history_file) {
            self.editor.save_history(path)?;
        }
        Ok(())
    }

    /// Collect lines until they form complete input; `None` at end of input
    fn read_input(&mut self) -> Result<Option<String>, ReplError> {
        let mut lines: Vec<String> = Vec::new();

        loop {
            let prompt = match lines.is_empty() {
                true => self.config.prompt.as_str(),
                false => self.config.continuation_prompt.as_str(),
            };

            let line = match self.editor.readline(prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    return Ok(Some(String::new()));
                }
                Err(ReadlineError::Eof) if lines.is_empty() => return Ok(None),
                // End of input inside an expression submits what we have
                Err(ReadlineError::Eof) => break,
                Err(source) => return Err(ReplError::Readline { source }),
            };

            if lines.is_empty() && line.trim().is_empty() {
                return Ok(Some(String::new()));
            }
            lines.push(line);
            if is_input_complete(&lines.join("\n")) {
                break;
            }
        }

        let input = lines.join("\n");
        self.editor.add_history_entry(input.as_str())?;
        Ok(Some(input))
    }

    /// Evaluate one piece of input: a command, or source code
    pub fn evaluate_line(&mut self, line: &str) -> Result<ReplResult, ReplError> {
        let input = line.trim();
        if input.is_empty() || input.starts_with('#') {
            return Ok(ReplResult::Empty);
        }
        if input.starts_with(':') {
            return self.run_command(input);
        }

        let value = evaluate_program(&self.interp, input)?;
        self.stats.lines_evaluated += 1;

        Ok(match value {
            Some(value) => ReplResult::Value {
                value: format_value(&self.interp, value),
                output: self.interp.take_output(),
            },
            None => ReplResult::Empty,
        })
    }

    fn run_command(&mut self, input: &str) -> Result<ReplResult, ReplError> {
        self.stats.commands += 1;

        let name = input.split_whitespace().next().unwrap_or(input);
        let command = ReplCommand::parse(name).ok_or_else(|| ReplError::UnknownCommand {
            name: name.to_string(),
        })?;

        let message = match command {
            ReplCommand::Quit => return Ok(ReplResult::Exit),
            ReplCommand::Help => HELP.to_string(),
            ReplCommand::Collect => {
                let freed = self.interp.collect();
                self.stats.objects_collected += freed;
                debug!(freed, "collection requested from the REPL");
                format!(
                    "Collected {} objects, {} live",
                    freed,
                    self.interp.stats().live_objects
                )
            }
            ReplCommand::Stats => self.stats_summary(),
            ReplCommand::Interrupt => {
                self.interp.request_interrupt();
                "Interrupt requested; the next evaluation will be cancelled".to_string()
            }
        };
        Ok(ReplResult::Command { message })
    }

    fn show(&self, result: ReplResult) {
        match result {
            ReplResult::Value { value, output } => {
                output.iter().for_each(|text| println!("{text}"));
                println!("{value}");
            }
            ReplResult::Command { message } => println!("{message}"),
            ReplResult::Empty | ReplResult::Exit => {}
        }
    }

    fn report(&self, error: ReplError, input: &str) {
        // Output printed before the failure
        for text in self.interp.take_output() {
            println!("{text}");
        }

        match error {
            // Parse errors carry their own source code
            ReplError::Parse { source } => eprintln!("{:?}", miette::Report::new(source)),
            ReplError::Evaluation { source } if self.config.verbose_errors => {
                eprintln!("{:?}", miette::Report::new(detached(&source)))
            }
            ReplError::Evaluation { source } => eprintln!("Error: {source}"),
            other => {
                let named_source = miette::NamedSource::new("<repl>", input.to_string());
                let report = miette::Report::new(detached(&other)).with_source_code(named_source);
                eprintln!("{report:?}");
            }
        }
    }

    fn stats_summary(&self) -> String {
        let heap = self.interp.stats();
        [
            "Session:".to_string(),
            format!("  Lines evaluated: {}", self.stats.lines_evaluated),
            format!("  Errors: {}", self.stats.errors),
            format!("  Commands: {}", self.stats.commands),
            format!("  Objects collected: {}", self.stats.objects_collected),
            "Heap:".to_string(),
            format!("  Live objects: {}", heap.live_objects),
            format!("  Allocations: {}", heap.allocations),
            format!("  Preserved objects: {}", heap.preserved_objects),
            format!("  Protect stack height: {}", heap.protect_height),
            format!("  Collections: {}", heap.collections),
        ]
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session() -> ReplSession {
        ReplSession::with_config(ReplConfig {
            persist_history: false,
            history_file: None,
            ..ReplConfig::default()
        })
        .expect("session")
    }

    fn value(session: &mut ReplSession, input: &str) -> String {
        match session.evaluate_line(input) {
            Ok(ReplResult::Value { value, .. }) => value,
            other => panic!("{input:?} gave {other:?}"),
        }
    }

    fn message(session: &mut ReplSession, input: &str) -> String {
        match session.evaluate_line(input) {
            Ok(ReplResult::Command { message }) => message,
            other => panic!("{input:?} gave {other:?}"),
        }
    }

    #[test]
    fn test_new_session_counters() {
        let session = session();
        assert_eq!(session.stats.lines_evaluated, 0);
        assert_eq!(session.stats.errors, 0);
        assert_eq!(session.stats.commands, 0);
    }

    #[test]
    fn test_arithmetic() {
        let mut session = session();
        assert_eq!(value(&mut session, "1 + 1"), "[1] 2");
        assert_eq!(session.stats.lines_evaluated, 1);
    }

    #[test]
    fn test_bindings_persist_between_lines() {
        let mut session = session();
        value(&mut session, "x <- 20");
        assert_eq!(value(&mut session, "x * 2 + 2"), "[1] 42");
    }

    #[test]
    fn test_several_expressions_on_one_line() {
        let mut session = session();
        assert_eq!(
            value(&mut session, "a <- 'tether'; paste(a, 'repl')"),
            "[1] \"tether repl\""
        );
    }

    #[test]
    fn test_print_output_is_captured() {
        let mut session = session();
        match session.evaluate_line("print(1); 2") {
            Ok(ReplResult::Value { value, output }) => {
                assert_eq!(value, "[1] 2");
                assert_eq!(output, vec!["[1] 1".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_blank_lines_and_comments() {
        let mut session = session();
        for input in ["", "   ", "# a comment"] {
            assert!(matches!(session.evaluate_line(input), Ok(ReplResult::Empty)));
        }
    }

    #[test]
    fn test_error_leaves_session_usable() {
        let mut session = session();

        match session.evaluate_line("stop('boom')") {
            Err(ReplError::Evaluation {
                source: BridgeError::Eval { message },
            }) => assert_eq!(message, "boom"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(value(&mut session, "1"), "[1] 1");
    }

    #[test]
    fn test_parse_error() {
        let mut session = session();
        assert!(matches!(
            session.evaluate_line("1 )"),
            Err(ReplError::Parse { .. })
        ));
    }

    #[test]
    fn test_interrupt_cancels_next_evaluation_only() {
        let mut session = session();

        message(&mut session, ":interrupt");
        assert!(session.interp.interrupt_pending());

        match session.evaluate_line("1 + 1") {
            Err(ReplError::Evaluation {
                source: BridgeError::Interrupted,
            }) => {}
            other => panic!("expected an interrupted evaluation, got {:?}", other),
        }
        assert!(!session.interp.interrupt_pending());
        assert_eq!(value(&mut session, "1 + 1"), "[1] 2");
    }

    #[test]
    fn test_help() {
        let mut session = session();
        let help = message(&mut session, ":help");
        for command in [":gc", ":stats", ":interrupt", ":quit"] {
            assert!(help.contains(command), "help lacks {command}");
        }
        assert_eq!(message(&mut session, ":?"), help);
        assert_eq!(session.stats.commands, 2);
    }

    #[test]
    fn test_gc_frees_temporaries() {
        let mut session = session();
        value(&mut session, "paste('temporary', 'value')");

        assert!(message(&mut session, ":gc").starts_with("Collected"));
        assert!(session.stats.objects_collected > 0);
        // Global bindings survive
        value(&mut session, "kept <- 1");
        message(&mut session, ":gc");
        assert_eq!(value(&mut session, "kept"), "[1] 1");
    }

    #[test]
    fn test_quit_aliases() {
        let mut session = session();
        for input in [":quit", ":q", ":exit"] {
            assert!(matches!(session.evaluate_line(input), Ok(ReplResult::Exit)));
        }
    }

    #[test]
    fn test_unknown_command() {
        let mut session = session();
        match session.evaluate_line(":frobnicate now") {
            Err(ReplError::UnknownCommand { name }) => assert_eq!(name, ":frobnicate"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_stats_after_mixed_input() {
        let mut session = session();
        let _ = session.evaluate_line("42");
        let _ = session.evaluate_line(":help");
        let _ = session.evaluate_line("stop('x')");

        let stats = message(&mut session, ":stats");
        assert!(stats.contains("Lines evaluated: 1"));
        assert!(stats.contains("Commands: 2"));
        assert!(stats.contains("Protect stack height: 0"));
    }

    #[test]
    fn test_input_completeness() {
        assert!(is_input_complete("42"));
        assert!(is_input_complete("x <- c(1, 2, 3)"));
        assert!(is_input_complete("\"string with (parens\""));
        assert!(is_input_complete("function(x) {\n  x + 1\n}"));

        assert!(!is_input_complete("f("));
        assert!(!is_input_complete("f(1,"));
        assert!(!is_input_complete("function(x) {"));
        assert!(!is_input_complete("1 +"));

        // A mistake before the end is reported, not continued
        assert!(is_input_complete("1 ) +"));
    }

    #[test]
    fn test_config_defaults() {
        let config = ReplConfig::default();
        assert!(!config.verbose_errors);
        assert_eq!(config.prompt, "tether> ");
        assert_eq!(config.history_file.as_deref(), Some(".tether_history"));
        assert_eq!(config.interpreter, InterpreterOptions::default());
    }
}
