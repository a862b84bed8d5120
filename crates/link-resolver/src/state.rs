//! Pure redirect-decision state machine
//!
//! Receives one distilled hop response, returns the next transition. The
//! caller (`resolve`) executes the I/O implied by each transition. Nothing
//! in this module touches the network, so every branch is testable with
//! hand-built responses.

use url::Url;

use crate::html;

/// Immutable per-resolution state, replaced (not mutated) on every follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveState {
    /// Best-known URL; always syntactically valid after each rewrite
    pub url: String,
    /// Redirects followed so far; monotonically non-decreasing
    pub hops: u32,
}

impl ResolveState {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            hops: 0,
        }
    }

    fn follow(&self, url: String) -> Transition {
        Transition::Follow(Self {
            url,
            hops: self.hops + 1,
        })
    }
}

/// Distilled view of one outbound fetch, built by the driver.
///
/// `body` is only populated for HTML responses; the fallback cues are not
/// searched for anywhere else.
#[derive(Debug, Clone, Default)]
pub struct HopResponse {
    pub status: u16,
    pub location: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<String>,
}

impl HopResponse {
    fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("text/html"))
    }
}

/// Decision for the next loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Fetch again at the new state's URL
    Follow(ResolveState),
    /// Resolution finished; the contained URL is the answer
    Terminal(String),
}

/// Decide what one hop response means for the resolution.
///
/// Branch order matches the chain's trust order: a transport redirect wins
/// outright, then the HTML cues (meta-refresh before canonical-link), and
/// anything else terminates at the current URL. The canonical-link branch is
/// a one-shot terminal rewrite — the target is the answer, not a further
/// fetch, and no hop is spent on it.
pub fn step(state: &ResolveState, response: &HopResponse) -> Transition {
    if (300..400).contains(&response.status) {
        if let Some(location) = response.location.as_deref() {
            return match join_target(&state.url, location) {
                Some(next) => state.follow(next),
                None => Transition::Terminal(state.url.clone()),
            };
        }
    }

    if response.is_html() {
        if let Some(body) = response.body.as_deref() {
            if let Some(target) = html::extract_meta_refresh(body) {
                return match join_target(&state.url, &target) {
                    Some(next) => state.follow(next),
                    None => Transition::Terminal(state.url.clone()),
                };
            }
            if let Some(target) = html::extract_canonical_link(body) {
                return Transition::Terminal(target);
            }
        }
    }

    Transition::Terminal(state.url.clone())
}

/// Join a redirect target against the current URL.
///
/// Absolute targets pass through, relative ones resolve against the base.
/// Redirect targets are upstream-controlled; one that does not yield a valid
/// URL returns `None` and the caller stops at the base instead of fetching
/// garbage.
fn join_target(base: &str, target: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    base.join(target).ok().map(String::from)
}

/// Deep-link redirector hosts (`*.spotify.app.link`) get `$web_only=true`
/// appended so the chain skips the app-store interstitial. Idempotent;
/// applied exactly once, before the loop.
pub fn normalize_deep_link(input: &str) -> String {
    let Ok(parsed) = Url::parse(input) else {
        return input.to_owned();
    };
    let is_redirector = parsed
        .host_str()
        .is_some_and(|h| h == "spotify.app.link" || h.ends_with(".spotify.app.link"));
    if !is_redirector {
        return input.to_owned();
    }
    if parsed.query_pairs().any(|(key, _)| key == "$web_only") {
        return input.to_owned();
    }
    match parsed.query() {
        Some(_) => format!("{input}&$web_only=true"),
        None => format!("{input}?$web_only=true"),
    }
}
