//! Scoped protection of interpreter values.

use crate::interpreter::Interpreter;
use crate::sexp::Sexp;

/// Keeps one value on the protect stack for the lifetime of the guard.
///
/// Dropping the guard (including while unwinding) removes exactly that entry.
pub struct Shield<'a> {
    interp: &'a Interpreter,
    sexp: Sexp,
}

impl<'a> Shield<'a> {
    pub fn new(interp: &'a Interpreter, sexp: Sexp) -> Self {
        interp.protect(sexp);
        Self { interp, sexp }
    }

    pub fn get(&self) -> Sexp {
        self.sexp
    }
}

impl Drop for Shield<'_> {
    fn drop(&mut self) {
        self.interp.unprotect_ptr(self.sexp);
    }
}

/// Protects any number of values, all released together on drop.
pub struct Shelter<'a> {
    interp: &'a Interpreter,
    protected: Vec<Sexp>,
}

impl<'a> Shelter<'a> {
    pub fn new(interp: &'a Interpreter) -> Self {
        Self {
            interp,
            protected: Vec::new(),
        }
    }

    pub fn protect(&mut self, sexp: Sexp) -> Sexp {
        self.interp.protect(sexp);
        self.protected.push(sexp);
        sexp
    }

    pub fn len(&self) -> usize {
        self.protected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protected.is_empty()
    }
}

impl Drop for Shelter<'_> {
    fn drop(&mut self) {
        for sexp in self.protected.drain(..).rev() {
            self.interp.unprotect_ptr(sexp);
        }
    }
}
