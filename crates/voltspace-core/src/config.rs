//! Service configuration
//!
//! Resolved once at startup and injected into each component. Resolution
//! order, later layers win:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config <path>`, else `~/.local/share/voltspace/config.toml`
//!    when it exists)
//! 3. `.env` in the working directory, then the process environment
//!
//! A missing credential never fails startup. The affected collaborator is
//! resolved as [`Provider::Unconfigured`] and each endpoint decides how to
//! degrade.
//!
//! ```toml
//! [server]
//! port = 8000
//! public_url = "http://127.0.0.1:8000"
//!
//! [openai]
//! api_key = "sk-..."
//! model = "gpt-4o-mini"
//!
//! [meshy]
//! api_key = "msy-..."
//! poll_interval_secs = 3
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MESHY_BASE_URL: &str = "https://api.meshy.ai";
pub const DEFAULT_PUBLIC_URL: &str = "http://127.0.0.1:8000";

/// Origins allowed by default (the local PHP front end)
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost",
    "http://localhost:80",
    "http://127.0.0.1",
    "http://127.0.0.1:80",
];

/// A collaborator that may or may not have its credential configured
#[derive(Debug, Clone)]
pub enum Provider<T> {
    Configured(T),
    /// The named setting was absent or empty
    Unconfigured { missing: &'static str },
}

impl<T> Provider<T> {
    pub fn is_configured(&self) -> bool {
        matches!(self, Provider::Configured(_))
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Provider::Configured(v) => Some(v),
            Provider::Unconfigured { .. } => None,
        }
    }

    /// Borrow the configured value or fail naming the missing setting
    pub fn require(&self) -> Result<&T> {
        match self {
            Provider::Configured(v) => Ok(v),
            Provider::Unconfigured { missing } => Err(Error::NotConfigured(missing)),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Provider<U> {
        match self {
            Provider::Configured(v) => Provider::Configured(f(v)),
            Provider::Unconfigured { missing } => Provider::Unconfigured { missing },
        }
    }
}

/// HTTP server and local storage settings
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Absolute base URL under which `/static` is reachable by callers
    pub public_url: String,
    /// Served at `/static`; generated assets land in `models/` below it
    pub static_dir: PathBuf,
    /// Where uploaded images are kept
    pub upload_dir: PathBuf,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            static_dir: PathBuf::from("static"),
            upload_dir: PathBuf::from("uploads"),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Text-generation collaborator settings (OpenAI-compatible API)
#[derive(Clone)]
pub struct TextGenConfig {
    pub api_key: String,
    pub base_url: String,
    /// Model for the assistant
    pub model: String,
    /// Model for augmented insights
    pub insights_model: String,
    pub timeout: Duration,
}

impl fmt::Debug for TextGenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextGenConfig")
            .field("api_key", &mask(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("insights_model", &self.insights_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Image-to-3D collaborator settings (Meshy-compatible API)
#[derive(Clone)]
pub struct MeshConfig {
    pub api_key: String,
    pub base_url: String,
    pub poll_interval: Duration,
    /// Overall bound on the synchronous polling loop
    pub deadline: Duration,
}

impl fmt::Debug for MeshConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshConfig")
            .field("api_key", &mask(&self.api_key))
            .field("base_url", &self.base_url)
            .field("poll_interval", &self.poll_interval)
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerSettings,
    pub text_generation: Provider<TextGenConfig>,
    pub mesh: Provider<MeshConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self::resolve(RawConfig::default(), |_| None)
    }
}

impl Config {
    /// Load from file (if any), `.env` and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env");
        }

        let raw = match path {
            Some(path) => read_config_file(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => read_config_file(&path)?,
                None => RawConfig::default(),
            },
        };

        Ok(Self::resolve(raw, |key| std::env::var(key).ok()))
    }

    /// Merge a parsed file with an environment lookup
    pub fn resolve(raw: RawConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let env = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = ServerSettings::default();

        let raw_server = raw.server.unwrap_or_default();
        let server = ServerSettings {
            host: raw_server.host.unwrap_or(defaults.host),
            port: raw_server.port.unwrap_or(defaults.port),
            public_url: env("VOLTSPACE_PUBLIC_URL")
                .or(raw_server.public_url)
                .unwrap_or(defaults.public_url)
                .trim_end_matches('/')
                .to_string(),
            static_dir: env("VOLTSPACE_STATIC_DIR")
                .map(PathBuf::from)
                .or(raw_server.static_dir)
                .unwrap_or(defaults.static_dir),
            upload_dir: env("VOLTSPACE_UPLOAD_DIR")
                .map(PathBuf::from)
                .or(raw_server.upload_dir)
                .unwrap_or(defaults.upload_dir),
            allowed_origins: raw_server
                .allowed_origins
                .unwrap_or(defaults.allowed_origins),
        };

        let raw_openai = raw.openai.unwrap_or_default();
        let text_generation = match env("OPENAI_API_KEY").or(non_empty(raw_openai.api_key)) {
            Some(api_key) => {
                let model = env("OPENAI_MODEL")
                    .or(raw_openai.model)
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
                Provider::Configured(TextGenConfig {
                    api_key,
                    base_url: env("OPENAI_BASE_URL")
                        .or(raw_openai.base_url)
                        .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                    insights_model: env("OPENAI_INSIGHTS_MODEL")
                        .or(raw_openai.insights_model)
                        .unwrap_or_else(|| model.clone()),
                    model,
                    timeout: Duration::from_secs(raw_openai.timeout_secs.unwrap_or(30)),
                })
            }
            None => Provider::Unconfigured {
                missing: "OPENAI_API_KEY",
            },
        };

        let raw_meshy = raw.meshy.unwrap_or_default();
        let mesh = match env("MESHY_API_KEY").or(non_empty(raw_meshy.api_key)) {
            Some(api_key) => Provider::Configured(MeshConfig {
                api_key,
                base_url: env("MESHY_BASE_URL")
                    .or(raw_meshy.base_url)
                    .unwrap_or_else(|| DEFAULT_MESHY_BASE_URL.to_string()),
                poll_interval: Duration::from_secs(raw_meshy.poll_interval_secs.unwrap_or(3)),
                deadline: Duration::from_secs(raw_meshy.deadline_secs.unwrap_or(420)),
            }),
            None => Provider::Unconfigured {
                missing: "MESHY_API_KEY",
            },
        };

        Self {
            server,
            text_generation,
            mesh,
        }
    }
}

/// Default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("voltspace").join("config.toml"))
}

fn read_config_file(path: &Path) -> Result<RawConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    parse_config(&content)
}

/// Parse config from TOML content
pub fn parse_config(content: &str) -> Result<RawConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Default, Deserialize)]
pub struct RawConfig {
    server: Option<RawServer>,
    openai: Option<RawOpenAi>,
    meshy: Option<RawMeshy>,
}

#[derive(Debug, Default, Deserialize)]
struct RawServer {
    host: Option<String>,
    port: Option<u16>,
    public_url: Option<String>,
    static_dir: Option<PathBuf>,
    upload_dir: Option<PathBuf>,
    allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOpenAi {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    insights_model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMeshy {
    api_key: Option<String>,
    base_url: Option<String>,
    poll_interval_secs: Option<u64>,
    deadline_secs: Option<u64>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Show only the last four characters of a credential
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
