//! Configuration types and loading
//!
//! Precedence: env vars > config file > defaults. The TOML file is optional
//! tuning; the Spotify credentials come only from the environment
//! (SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET), never from the TOML, and
//! their absence is a fatal startup error.

use common::{Error, Secret};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Default config file looked up next to the process when no explicit path
/// is given.
const DEFAULT_CONFIG_FILE: &str = "spotify-link-relay.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub spotify: SpotifyConfig,
    pub resolver: ResolverConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".parse().expect("static default addr"),
            max_connections: 1024,
        }
    }
}

/// Spotify accounts service settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub token_url: String,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            token_url: spotify_auth::TOKEN_ENDPOINT.to_owned(),
        }
    }
}

/// Link resolution timing settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Timeout for a single outbound hop
    pub hop_timeout_secs: u64,
    /// Wall-clock budget for a whole resolution, across all hops
    pub deadline_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            hop_timeout_secs: 10,
            deadline_secs: 30,
        }
    }
}

/// The credential pair the relay exchanges for tokens.
///
/// Lives outside `Config` so the rest of the service can rely on both values
/// being present once startup succeeds.
pub struct Credentials {
    pub client_id: Secret<String>,
    pub client_secret: Secret<String>,
}

impl Credentials {
    /// Fail-fast startup check: both variables must be set and non-blank.
    pub fn from_env() -> common::Result<Self> {
        let client_id = Secret::from_env("SPOTIFY_CLIENT_ID")
            .ok_or(Error::MissingSecret("SPOTIFY_CLIENT_ID"))?;
        let client_secret = Secret::from_env("SPOTIFY_CLIENT_SECRET")
            .ok_or(Error::MissingSecret("SPOTIFY_CLIENT_SECRET"))?;
        Ok(Self {
            client_id,
            client_secret,
        })
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment
    /// variables via `apply_env`.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Defaults plus environment overlay, for when no config file exists.
    pub fn from_defaults() -> common::Result<Self> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay environment variables. `PORT` rewrites the listen port only,
    /// keeping whatever bind address the file chose.
    fn apply_env(&mut self) -> common::Result<()> {
        if let Ok(port) = std::env::var("PORT") {
            let port: u16 = port
                .parse()
                .map_err(|_| Error::Config(format!("PORT must be a port number, got: {port}")))?;
            self.server.listen_addr.set_port(port);
        }
        Ok(())
    }

    /// Reject configurations that cannot work before anything binds.
    pub fn validate(&self) -> common::Result<()> {
        if !self.spotify.token_url.starts_with("http://")
            && !self.spotify.token_url.starts_with("https://")
        {
            return Err(Error::Config(format!(
                "token_url must start with http:// or https://, got: {}",
                self.spotify.token_url
            )));
        }

        if self.resolver.hop_timeout_secs == 0 {
            return Err(Error::Config(
                "hop_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.resolver.deadline_secs < self.resolver.hop_timeout_secs {
            return Err(Error::Config(
                "deadline_secs must be at least hop_timeout_secs".into(),
            ));
        }

        if self.server.max_connections == 0 {
            return Err(Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Resolve the config file path: CLI arg, then CONFIG_PATH env var, then
    /// the default file if it exists. `None` means run on defaults.
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(PathBuf::from(p));
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return Some(PathBuf::from(p));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.exists().then_some(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn valid_toml() -> &'static str {
        r#"
[server]
listen_addr = "127.0.0.1:8080"
max_connections = 256

[spotify]
token_url = "https://accounts.spotify.com/api/token"

[resolver]
hop_timeout_secs = 5
deadline_secs = 20
"#
    }

    #[test]
    fn load_valid_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("PORT") };
        let dir = std::env::temp_dir().join("relay-test-valid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, valid_toml()).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert_eq!(config.server.max_connections, 256);
        assert_eq!(config.resolver.hop_timeout_secs, 5);
        assert_eq!(config.resolver.deadline_secs, 20);
        assert!(config.validate().is_ok());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn defaults_are_valid() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("PORT") };
        let config = Config::from_defaults().unwrap();
        assert_eq!(config.server.listen_addr.port(), 3000);
        assert_eq!(config.spotify.token_url, spotify_auth::TOKEN_ENDPOINT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn port_env_overrides_listen_port_only() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("PORT", "4321") };
        let dir = std::env::temp_dir().join("relay-test-port");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, valid_toml()).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.listen_addr.port(), 4321);
        assert!(config.server.listen_addr.ip().is_loopback());
        unsafe { remove_env("PORT") };

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn non_numeric_port_is_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("PORT", "not-a-port") };
        let result = Config::from_defaults();
        assert!(result.is_err());
        unsafe { remove_env("PORT") };
    }

    #[test]
    fn load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn load_invalid_toml() {
        let dir = std::env::temp_dir().join("relay-test-invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(&path, "not valid {{{{ toml").unwrap();

        assert!(Config::load(&path).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn zero_hop_timeout_rejected() {
        let mut config = Config::default();
        config.resolver.hop_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn deadline_below_hop_timeout_rejected() {
        let mut config = Config::default();
        config.resolver.hop_timeout_secs = 10;
        config.resolver.deadline_secs = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_connections_rejected() {
        let mut config = Config::default();
        config.server.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn schemeless_token_url_rejected() {
        let mut config = Config::default();
        config.spotify.token_url = "accounts.spotify.com/api/token".into();
        let err = config.validate().unwrap_err();
        assert!(
            err.to_string().contains("token_url must start with http"),
            "error message should explain the issue, got: {err}"
        );
    }

    #[test]
    fn resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/should-lose.toml") };
        let path = Config::resolve_path(Some("/cli/wins.toml"));
        assert_eq!(path, Some(PathBuf::from("/cli/wins.toml")));
        unsafe { remove_env("CONFIG_PATH") };
    }

    #[test]
    fn resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        assert_eq!(
            Config::resolve_path(None),
            Some(PathBuf::from("/env/path.toml"))
        );
        unsafe { remove_env("CONFIG_PATH") };
    }

    #[test]
    fn resolve_path_without_default_file_is_none() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        // The default file does not exist in the test working directory.
        assert_eq!(Config::resolve_path(None), None);
    }

    #[test]
    fn credentials_require_both_env_vars() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("SPOTIFY_CLIENT_ID") };
        unsafe { remove_env("SPOTIFY_CLIENT_SECRET") };
        assert!(Credentials::from_env().is_err());

        unsafe { set_env("SPOTIFY_CLIENT_ID", "id-123") };
        assert!(
            Credentials::from_env().is_err(),
            "client id alone is not enough"
        );

        unsafe { set_env("SPOTIFY_CLIENT_SECRET", "secret-456") };
        let credentials = Credentials::from_env().unwrap();
        assert_eq!(credentials.client_id.expose(), "id-123");
        assert_eq!(credentials.client_secret.expose(), "secret-456");

        unsafe { remove_env("SPOTIFY_CLIENT_ID") };
        unsafe { remove_env("SPOTIFY_CLIENT_SECRET") };
    }

    #[test]
    fn blank_secret_counts_as_missing() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("SPOTIFY_CLIENT_ID", "   ") };
        unsafe { set_env("SPOTIFY_CLIENT_SECRET", "secret") };
        assert!(Credentials::from_env().is_err());
        unsafe { remove_env("SPOTIFY_CLIENT_ID") };
        unsafe { remove_env("SPOTIFY_CLIENT_SECRET") };
    }
}
