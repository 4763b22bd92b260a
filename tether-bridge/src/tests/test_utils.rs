//! Shared helpers for bridge tests

use tether_interpreter::{Interpreter, Sexp, format_value};
use tracing_subscriber::EnvFilter;

/// Route `tracing` output to the test harness; filter with `TETHER_LOG`.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TETHER_LOG").unwrap_or_else(|_| EnvFilter::new("off")),
        )
        .with_test_writer()
        .try_init();
}

pub fn display(interp: &Interpreter, value: Sexp) -> String {
    format_value(interp, value)
}

/// Register `cancel()`, which requests an interrupt and returns `NULL`
pub fn define_cancel(interp: &Interpreter) {
    interp.define_native("cancel", |interp, _| {
        interp.request_interrupt();
        Sexp::NULL
    });
}
