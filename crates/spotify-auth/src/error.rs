//! Error types for token exchange operations

/// Errors from the client-credentials exchange.
///
/// `TokenEndpoint` keeps the upstream status and raw body so the relay can
/// pass both through for diagnostics; `MalformedResponse` covers the 2xx
/// case where the grant is unusable (no access token in the body).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token endpoint returned {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    #[error("malformed token response: {0}")]
    MalformedResponse(String),
}

/// Result alias for token operations.
pub type Result<T> = std::result::Result<T, Error>;
