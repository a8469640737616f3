//! Configuration loading for Cyrano.
//!
//! Raw TOML deserialization structs (with `Option` fields) stay private to
//! this crate. [`CyranoConfig`] resolves them into the settings types the
//! rest of the workspace consumes, filling in defaults at the parse boundary.
//!
//! ```toml
//! [server]
//! root = "http://cyrano.cjcornell.com/REST/index.php"
//! timeout_seconds = 30
//!
//! [session]
//! access_token = "${CYRANO_ACCESS_TOKEN}"
//! user_id = "1001"
//!
//! [player]
//! audio = true
//! terse = false
//! graphical = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

use cyrano_types::SessionContext;

/// Script server used when the config does not name one.
pub const DEFAULT_SERVER_ROOT: &str = "http://cyrano.cjcornell.com/REST/index.php";
/// Whole-request timeout used when the config does not set one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "CYRANO_CONFIG";

// Default value function for serde (bool::default() is false, so only true needs a fn)
const fn default_true() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    server: Option<RawServerConfig>,
    session: Option<RawSessionConfig>,
    player: Option<RawPlayerConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct RawServerConfig {
    root: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Default, Deserialize)]
struct RawSessionConfig {
    access_token: Option<String>,
    user_id: Option<String>,
}

// Manual Debug impl to prevent leaking the access token in logs.
impl std::fmt::Debug for RawSessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = if self.access_token.is_some() {
            "[REDACTED]"
        } else {
            "None"
        };
        f.debug_struct("RawSessionConfig")
            .field("access_token", &token)
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct RawPlayerConfig {
    /// Voice instructions at all. Default: true.
    #[serde(default = "default_true")]
    audio: bool,
    /// Hide instruction descriptions. Default: false.
    #[serde(default)]
    terse: bool,
    /// Show instruction images. Default: true.
    #[serde(default = "default_true")]
    graphical: bool,
}

impl Default for RawPlayerConfig {
    fn default() -> Self {
        Self {
            audio: true,
            terse: false,
            graphical: true,
        }
    }
}

/// Where and how to reach the script server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub root: String,
    pub timeout: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            root: DEFAULT_SERVER_ROOT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Local player preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSettings {
    /// Global audio toggle; when off no instruction is voiced.
    pub audio_enabled: bool,
    pub terse: bool,
    pub graphical: bool,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        let raw = RawPlayerConfig::default();
        Self {
            audio_enabled: raw.audio,
            terse: raw.terse,
            graphical: raw.graphical,
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyranoConfig {
    pub server: ServerSettings,
    pub session: SessionContext,
    pub player: PlayerSettings,
}

impl Default for CyranoConfig {
    fn default() -> Self {
        Self::resolve(RawConfig::default())
    }
}

impl CyranoConfig {
    /// Load from the default location. `Ok(None)` when no file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let path = match config_path() {
            Some(path) => path,
            None => return Ok(None),
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    /// Load from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };
        Self::parse(&content).map_err(|source| {
            tracing::warn!("Failed to parse config at {:?}: {}", path, source);
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Parse TOML text.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<RawConfig>(content).map(Self::resolve)
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    fn resolve(raw: RawConfig) -> Self {
        let server_raw = raw.server.unwrap_or_default();
        let root = server_raw
            .root
            .map(|root| expand_env_vars(&root))
            .map(|root| root.trim_end_matches('/').to_string())
            .filter(|root| !root.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER_ROOT.to_string());
        let timeout = Duration::from_secs(
            server_raw
                .timeout_seconds
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        );

        let session_raw = raw.session.unwrap_or_default();
        let session = SessionContext::new(
            session_raw
                .access_token
                .map(|t| expand_env_vars(&t))
                .unwrap_or_default(),
            session_raw
                .user_id
                .map(|u| expand_env_vars(&u))
                .unwrap_or_default(),
        );

        let player_raw = raw.player.unwrap_or_default();
        Self {
            server: ServerSettings { root, timeout },
            session,
            player: PlayerSettings {
                audio_enabled: player_raw.audio,
                terse: player_raw.terse,
                graphical: player_raw.graphical,
            },
        }
    }
}

/// Replace `${VAR}` references with environment values (missing ⇒ empty).
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(end_rel) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + end_rel];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + end_rel + 1..];
    }

    out.push_str(rest);
    out
}

/// `$CYRANO_CONFIG`, else `~/.cyrano/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(explicit) = env::var_os(CONFIG_PATH_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(explicit));
    }
    dirs::home_dir().map(|home| home.join(".cyrano").join("config.toml"))
}
