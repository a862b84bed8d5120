//! Client-credentials token exchange
//!
//! Single interaction with the Spotify accounts service: POST the grant type
//! with an HTTP Basic credential pair, get back a short-lived access token.
//! There is no retry and no refresh — the grant is re-requested from scratch
//! whenever a caller needs a token.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// A granted access token.
///
/// `expires_in` is a delta in seconds from the response time. The relay
/// returns it to its caller verbatim — nothing here converts it to an
/// absolute timestamp because nothing here stores the grant.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    /// Seconds until the access token expires (delta, not absolute)
    pub expires_in: u64,
}

/// Raw wire shape of the token endpoint response.
///
/// `access_token` stays optional so a 2xx body without one can be told apart
/// from a transport-level parse failure.
#[derive(Debug, Deserialize)]
struct TokenEndpointBody {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

/// Exchange a client id/secret pair for an access token.
///
/// Builds the `Authorization: Basic base64(id:secret)` header explicitly and
/// POSTs `grant_type=client_credentials` as a form body. Exactly one attempt;
/// the caller decides what an error means for its own response.
pub async fn request_token(
    client: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<TokenGrant> {
    let basic = BASE64.encode(format!("{client_id}:{client_secret}"));

    let response = client
        .post(token_url)
        .header(reqwest::header::AUTHORIZATION, format!("Basic {basic}"))
        .form(&[("grant_type", crate::constants::GRANT_TYPE)])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Http(format!("failed to read token response: {e}")))?;

    if !status.is_success() {
        return Err(Error::TokenEndpoint {
            status: status.as_u16(),
            body,
        });
    }

    let parsed: TokenEndpointBody =
        serde_json::from_str(&body).map_err(|e| Error::Http(format!("invalid token JSON: {e}")))?;

    match parsed.access_token {
        Some(token) if !token.is_empty() => {
            debug!(expires_in = parsed.expires_in, "token granted");
            Ok(TokenGrant {
                access_token: token,
                expires_in: parsed.expires_in.unwrap_or(3600),
            })
        }
        _ => Err(Error::MalformedResponse(body)),
    }
}
