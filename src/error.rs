//! Error type shared by the parsing and counting entry points.

use thiserror::Error;

/// Errors produced by the library.
///
/// Odd-parity partitions and odd `n` are not errors: they simply count zero.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FeynmanError {
    /// A bracket-notation blue vector could not be parsed.
    #[error("invalid partition {input:?}: {reason}")]
    InvalidPartition {
        /// The offending input text.
        input: String,
        /// What was wrong with it.
        reason: String,
    },
    /// The requested size cannot be handled by the engine.
    #[error("unsupported size n={n}: {reason}")]
    InvalidSize {
        /// Requested size.
        n: usize,
        /// Why it was rejected.
        reason: &'static str,
    },
}

impl FeynmanError {
    pub(crate) fn partition(input: &str, reason: impl Into<String>) -> Self {
        FeynmanError::InvalidPartition {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
