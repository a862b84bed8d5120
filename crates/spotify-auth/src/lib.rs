//! Spotify client-credentials authentication library
//!
//! Performs the one-shot OAuth client-credentials exchange against the
//! Spotify accounts service. This crate is a standalone library with no
//! dependency on the relay binary — it can be tested and used independently.
//!
//! Flow:
//! 1. Relay startup validates that a client id/secret pair is present
//! 2. A handler calls `token::request_token()` with the pair
//! 3. The granted token is returned to the caller as-is — never cached,
//!    never refreshed (the client-credentials grant has no refresh token)

pub mod constants;
pub mod error;
pub mod token;

pub use constants::*;
pub use error::{Error, Result};
pub use token::{TokenGrant, request_token};
