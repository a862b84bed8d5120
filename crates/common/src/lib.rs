//! Common types for the Spotify link relay

mod secret;
mod error;

pub use secret::Secret;
pub use error::{Error, Result};
