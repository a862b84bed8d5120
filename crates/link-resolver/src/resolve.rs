//! Resolution driver
//!
//! Owns all I/O for a resolution: issues manual-redirect fetches, distills
//! each response into a `HopResponse`, and executes whatever the pure `step`
//! function decides. Hops are strictly sequential — a hop's body is fully
//! read before the next fetch is issued.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::state::{self, HopResponse, ResolveState, Transition};

/// Hard cap on followed redirects. Reaching it is a best-effort exit, not an
/// error: the caller gets whatever URL the chain had reached.
pub const MAX_REDIRECTS: u32 = 10;

/// Desktop-browser User-Agent for outbound hops. Shortener interstitials
/// serve app-store pages to unrecognized agents.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const ACCEPT: &str = "text/html,*/*";

/// Outcome of a finished resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Final best-known URL
    pub url: String,
    /// Redirects followed to get there
    pub hops: u32,
    /// Set when the hop budget or the wall-clock deadline ran out before a
    /// natural terminal response
    pub partial: bool,
}

/// Redirect-chasing resolver. Cheap to clone; clones share the inner client.
#[derive(Clone)]
pub struct Resolver {
    client: reqwest::Client,
    hop_timeout: Duration,
    deadline: Duration,
}

impl Resolver {
    /// Build a resolver with its own client. Transport-level redirect
    /// following is disabled — the loop decides every hop itself.
    pub fn new(hop_timeout: Duration, deadline: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            hop_timeout,
            deadline,
        })
    }

    /// Resolve an input URL to its canonical form.
    ///
    /// Exit policy is uniform best-effort: budget exhaustion, a hop timeout,
    /// and deadline expiry all return the best-known URL with `partial` set.
    /// Only empty input and non-timeout transport failures are errors.
    pub async fn resolve(&self, input: &str) -> Result<Resolution> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::EmptyInput);
        }

        let started = Instant::now();
        let mut current = ResolveState::new(state::normalize_deep_link(input));

        while current.hops < MAX_REDIRECTS {
            let remaining = self
                .deadline
                .checked_sub(started.elapsed())
                .filter(|d| !d.is_zero());
            let Some(remaining) = remaining else {
                warn!(url = %current.url, hops = current.hops, "resolution deadline exhausted");
                return Ok(partial(current));
            };

            let response = match self
                .fetch_hop(&current.url, self.hop_timeout.min(remaining))
                .await
            {
                Ok(response) => response,
                Err(FetchError::Timeout(message)) => {
                    warn!(url = %current.url, hops = current.hops, error = %message, "hop timed out");
                    return Ok(partial(current));
                }
                Err(FetchError::Transport(message)) => {
                    return Err(Error::Transport(message));
                }
            };

            match state::step(&current, &response) {
                Transition::Follow(next) => {
                    debug!(from = %current.url, to = %next.url, hops = next.hops, "following redirect");
                    current = next;
                }
                Transition::Terminal(url) => {
                    return Ok(Resolution {
                        url,
                        hops: current.hops,
                        partial: false,
                    });
                }
            }
        }

        warn!(url = %current.url, "redirect budget exhausted");
        Ok(partial(current))
    }

    /// One manual-redirect GET. The body is always read to completion so the
    /// next hop never races the previous connection; it is only kept for
    /// HTML responses, where the fallback cues live.
    async fn fetch_hop(
        &self,
        url: &str,
        timeout: Duration,
    ) -> std::result::Result<HopResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .timeout(timeout)
            .send()
            .await
            .map_err(FetchError::classify)?;

        let status = response.status().as_u16();
        let location = header_string(&response, reqwest::header::LOCATION);
        let content_type = header_string(&response, reqwest::header::CONTENT_TYPE);

        let text = response.text().await.map_err(FetchError::classify)?;
        let body = content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("text/html"))
            .then_some(text);

        Ok(HopResponse {
            status,
            location,
            content_type,
            body,
        })
    }
}

fn partial(state: ResolveState) -> Resolution {
    Resolution {
        url: state.url,
        hops: state.hops,
        partial: true,
    }
}

fn header_string(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

enum FetchError {
    Timeout(String),
    Transport(String),
}

impl FetchError {
    fn classify(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}
