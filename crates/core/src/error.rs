/// Domain-level errors shared across the gateway crates.
///
/// Transport-specific mapping (HTTP status codes, error envelopes) lives in
/// the api crate; this enum only distinguishes the failure classes the
/// pipeline cares about.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The request failed input validation before any external call.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The client exceeded its request allowance for the current window.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// A dependency is unavailable (circuit open or hard failure).
    #[error("Dependency unavailable: {0}")]
    Unavailable(String),

    /// A dependency did not answer within its deadline.
    #[error("Dependency timed out: {0}")]
    Timeout(String),

    /// Anything unexpected.
    #[error("Internal error: {0}")]
    Internal(String),
}
