//! Tests for the bridge

pub mod test_utils;

pub mod test_parse;
pub mod test_unwind;
