//! Closed error taxonomy for the aggregation core.
//!
//! Every fallible public operation returns `Result<T, Error>`. Callers that
//! need to distinguish an expected outcome (a submission failing the SNIP
//! check) from an operational incident (a crypto or allocation failure)
//! should match on the variant rather than the message.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Errors produced by the field, client, and server APIs.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller-supplied data violates a documented precondition.
    #[error("bad input: {0}")]
    BadInput(String),

    /// `Config` parameters are inconsistent, or two configs being merged disagree.
    #[error("bad config: {0}")]
    BadConfig(String),

    /// Key import, ECDH, or AEAD tag verification failed.
    #[error("crypto failure: {0}")]
    CryptoFailure(String),

    /// The SNIP check did not hold; the submission is malformed or malicious.
    #[error("verification failed")]
    VerifyFailed,

    /// An internal invariant was violated (arithmetic domain error, PRG exhaustion).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
