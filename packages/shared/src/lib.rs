//! Shared utilities for Kaiwa binaries and tests.

pub mod logger;
pub mod time;
