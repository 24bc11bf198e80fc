//! Deterministic, pure logic shared by the planning loop.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod action;
pub mod context;
pub mod header;
pub mod normalize;
pub mod plan;
pub mod types;
pub mod verdict;
