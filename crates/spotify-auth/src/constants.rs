//! Spotify accounts service constants
//!
//! Endpoint configuration for the client-credentials grant. These values are
//! not secrets — the actual credentials (client id/secret) come from the
//! environment at startup.

/// Token endpoint for the client-credentials grant
pub const TOKEN_ENDPOINT: &str = "https://accounts.spotify.com/api/token";

/// Grant type sent in the token request form body
pub const GRANT_TYPE: &str = "client_credentials";
