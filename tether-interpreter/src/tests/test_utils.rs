//! Shared helpers for interpreter tests

use tracing_subscriber::EnvFilter;

use crate::{Interpreter, InterpreterError, Sexp, evaluate_from_string, format_value};

/// Route `tracing` output to the test harness; filter with `TETHER_LOG`.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TETHER_LOG").unwrap_or_else(|_| EnvFilter::new("off")),
        )
        .with_test_writer()
        .try_init();
}

/// Evaluate `source` at top level, panicking on failure
pub fn eval_ok(interp: &Interpreter, source: &str) -> Sexp {
    evaluate_from_string(interp, source)
        .unwrap_or_else(|e| panic!("evaluation of {:?} failed: {:?}", source, e))
}

/// Evaluate `source` and format the result as the REPL prints it
pub fn eval_display(interp: &Interpreter, source: &str) -> String {
    let value = eval_ok(interp, source);
    format_value(interp, value)
}

/// Evaluate `source`, expecting a top-level abort, and return its message
pub fn eval_abort(interp: &Interpreter, source: &str) -> String {
    match evaluate_from_string(interp, source) {
        Err(InterpreterError::Aborted { message }) => message,
        other => panic!("expected {:?} to abort, got {:?}", source, other),
    }
}
