//! Interpreter configuration.

/// Options fixed at interpreter construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterOptions {
    /// Nested `eval` calls allowed before evaluation signals an error
    pub max_eval_depth: usize,
    /// Poll the pending-interrupt flag at every evaluation step
    pub check_interrupts: bool,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            max_eval_depth: 1000,
            check_interrupts: true,
        }
    }
}
