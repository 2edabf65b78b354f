//! Mock filesystem implementations for testing.
//!
//! This module provides `MockFs` and pre-built scenarios for exercising
//! the collectors without a live Linux `/proc` tree.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
