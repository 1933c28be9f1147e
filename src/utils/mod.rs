//! The `utils` module provides the pieces shared by every other module of
//! `sockprobe`: the error types returned across module boundaries and the
//! tracing setup used by the binary and by tests.

pub mod error;
pub mod logging;

#[cfg(test)]
mod tests;
