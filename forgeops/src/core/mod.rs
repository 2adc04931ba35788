//! Deterministic, pure logic for outline handling.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod outline;
pub mod path;
pub mod types;
