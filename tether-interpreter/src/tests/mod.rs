//! Tests for the Tether interpreter
//!
//! Grouped by topic: evaluation, conditions and non-local exits, the
//! protection/collection machinery, and parsing/printing.

pub mod test_utils;

pub mod test_display;
pub mod test_parse_vector;
pub mod test_protection;
pub mod test_unwind_protect;
