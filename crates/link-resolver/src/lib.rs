//! Bounded manual redirect resolution for Spotify links
//!
//! Turns short/deep links into canonical `open.spotify.com` web URLs by
//! chasing redirects by hand: transport-level `Location` headers first, then
//! HTML fallback cues (meta-refresh, canonical-link scraping), with a hard
//! hop cap so every resolution terminates.
//!
//! Layout:
//! - `state` — the pure decision machine: an immutable `ResolveState` plus a
//!   `step(state, response) -> Transition` function with no I/O in it
//! - `html` — best-effort regex heuristics for redirect cues in HTML bodies
//! - `resolve` — the async driver that owns the client, timeouts, and the
//!   overall deadline, and executes whatever `step` decides
//!
//! The split keeps the branching logic testable without a network; only the
//! driver ever touches a socket.

pub mod error;
pub mod html;
pub mod resolve;
pub mod state;

pub use error::{Error, Result};
pub use resolve::{MAX_REDIRECTS, Resolution, Resolver};
pub use state::{HopResponse, ResolveState, Transition, normalize_deep_link, step};
