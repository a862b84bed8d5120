//! HTML redirect-cue extraction
//!
//! Best-effort regex heuristics, not an HTML parse. Shortener fallback pages
//! are machine-generated and well-formed enough for this to hold in practice.
//! Both cues live behind these two functions so a stricter parser could
//! replace them without touching the resolution loop.

use std::sync::LazyLock;

use regex::Regex;

/// `<meta http-equiv="refresh" content="0;url=...">`, case-insensitive,
/// tolerating single/double/no quotes around the attribute values.
static META_REFRESH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<meta[^>]*http-equiv\s*=\s*["']?refresh["']?[^>]*content\s*=\s*(?:"([^"]*)"|'([^']*)')"#,
    )
    .unwrap()
});

/// The `url=` target inside a refresh directive's content value.
static REFRESH_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)url\s*=\s*["']?([^"'\s>]+)"#).unwrap());

/// First literal absolute URL on the canonical web domain.
static CANONICAL_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https://open\.spotify\.com/[^\s"'<>\\]+"#).unwrap());

/// Extract the target of a meta-refresh directive, if one is present.
pub fn extract_meta_refresh(html: &str) -> Option<String> {
    let captures = META_REFRESH.captures(html)?;
    let content = captures.get(1).or_else(|| captures.get(2))?.as_str();
    let target = REFRESH_TARGET.captures(content)?.get(1)?.as_str();
    Some(target.to_owned())
}

/// Extract the first literal `open.spotify.com` URL in the document.
pub fn extract_canonical_link(html: &str) -> Option<String> {
    CANONICAL_LINK.find(html).map(|m| m.as_str().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_refresh_double_quoted() {
        let html = r#"<html><head>
            <meta http-equiv="refresh" content="0;url=https://open.spotify.com/track/XYZ">
        </head></html>"#;
        assert_eq!(
            extract_meta_refresh(html).as_deref(),
            Some("https://open.spotify.com/track/XYZ")
        );
    }

    #[test]
    fn meta_refresh_single_quoted_with_delay_and_space() {
        let html = "<meta http-equiv='refresh' content='5; url=https://example.com/next'>";
        assert_eq!(
            extract_meta_refresh(html).as_deref(),
            Some("https://example.com/next")
        );
    }

    #[test]
    fn meta_refresh_case_insensitive() {
        let html = r#"<META HTTP-EQUIV="Refresh" CONTENT="0;URL=https://example.com/up">"#;
        assert_eq!(
            extract_meta_refresh(html).as_deref(),
            Some("https://example.com/up")
        );
    }

    #[test]
    fn meta_refresh_quoted_target_inside_content() {
        let html = r#"<meta http-equiv="refresh" content="0;url='https://example.com/q'">"#;
        assert_eq!(
            extract_meta_refresh(html).as_deref(),
            Some("https://example.com/q")
        );
    }

    #[test]
    fn meta_refresh_absent() {
        assert!(extract_meta_refresh("<html><body>no cues here</body></html>").is_none());
        // A refresh directive without a url= target is not a cue.
        let html = r#"<meta http-equiv="refresh" content="30">"#;
        assert!(extract_meta_refresh(html).is_none());
    }

    #[test]
    fn canonical_link_first_match_wins() {
        let html = r#"<body>
            <a href="https://open.spotify.com/album/ABC">open</a>
            <a href="https://open.spotify.com/track/DEF">other</a>
        </body>"#;
        assert_eq!(
            extract_canonical_link(html).as_deref(),
            Some("https://open.spotify.com/album/ABC")
        );
    }

    #[test]
    fn canonical_link_stops_at_quote() {
        let html = r#"var target = "https://open.spotify.com/track/XYZ?si=123";"#;
        assert_eq!(
            extract_canonical_link(html).as_deref(),
            Some("https://open.spotify.com/track/XYZ?si=123")
        );
    }

    #[test]
    fn canonical_link_ignores_other_domains() {
        let html = r#"<a href="https://example.com/album/ABC">nope</a>
                      <a href="https://open.spotify.example.com/x">also nope</a>"#;
        assert!(extract_canonical_link(html).is_none());
    }

    #[test]
    fn canonical_link_bare_literal_in_text() {
        let html = "Open this in your browser: https://open.spotify.com/album/ABC and enjoy";
        assert_eq!(
            extract_canonical_link(html).as_deref(),
            Some("https://open.spotify.com/album/ABC")
        );
    }
}
