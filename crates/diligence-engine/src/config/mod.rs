use std::env;
use std::fmt;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::scoring::ScoringConfig;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub services: ServicesConfig,
    pub retrieval: RetrievalConfig,
    pub scoring: ScoringConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let embedding_url = optional_var("APP_EMBEDDING_URL");
        let rerank_url = optional_var("APP_RERANK_URL");
        let reranker = match optional_var("APP_RERANKER") {
            Some(value) => RerankerMode::parse(&value).ok_or(ConfigError::InvalidValue {
                key: "APP_RERANKER",
                value,
            })?,
            None if rerank_url.is_some() => RerankerMode::Http,
            None => RerankerMode::Disabled,
        };
        if reranker == RerankerMode::Http && rerank_url.is_none() {
            return Err(ConfigError::MissingValue {
                key: "APP_RERANK_URL",
            });
        }

        let services = ServicesConfig {
            embedding_url,
            embedding_model: optional_var("APP_EMBEDDING_MODEL"),
            embedding_dimensions: positive_var("APP_EMBEDDING_DIMENSIONS", 256)?,
            rerank_url,
            rerank_model: optional_var("APP_RERANK_MODEL"),
            reranker,
            timeout_ms: positive_var("APP_SERVICE_TIMEOUT_MS", 5000)?,
            concurrency: positive_var("APP_SERVICE_CONCURRENCY", 8)?,
        };

        let retrieval = RetrievalConfig {
            chunk_max_chars: positive_var("APP_CHUNK_MAX_CHARS", 1000)?,
            top_k: positive_var("APP_RETRIEVAL_TOP_K", 20)?,
            citations_per_claim: positive_var("APP_CITATIONS_PER_CLAIM", 3)?,
        };

        let scoring = match optional_var("APP_SCORING_CONFIG") {
            Some(path) => load_scoring_config(Path::new(&path))?,
            None => ScoringConfig::default(),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            services,
            retrieval,
            scoring,
        })
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn positive_var<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    match optional_var(key) {
        None => Ok(default),
        Some(value) => match value.parse::<T>() {
            Ok(parsed) if parsed > T::default() => Ok(parsed),
            _ => Err(ConfigError::InvalidValue { key, value }),
        },
    }
}

/// Reads and validates a JSON scoring configuration; omitted fields keep their defaults.
pub fn load_scoring_config(path: &Path) -> Result<ScoringConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::ScoringFile {
        path: path.to_path_buf(),
        reason: source.to_string(),
    })?;
    let config: ScoringConfig =
        serde_json::from_str(&raw).map_err(|source| ConfigError::ScoringFile {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;
    config.validate().map_err(|reason| ConfigError::ScoringFile {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(config)
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Which reranker backs citation matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerankerMode {
    Http,
    Overlap,
    Disabled,
}

impl RerankerMode {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "http" | "remote" => Some(Self::Http),
            "overlap" | "local" => Some(Self::Overlap),
            "none" | "disabled" | "off" => Some(Self::Disabled),
            _ => None,
        }
    }
}

/// Embedding and reranking endpoints plus the limits applied to every call.
#[derive(Debug, Clone)]
pub struct ServicesConfig {
    pub embedding_url: Option<String>,
    pub embedding_model: Option<String>,
    pub embedding_dimensions: usize,
    pub rerank_url: Option<String>,
    pub rerank_model: Option<String>,
    pub reranker: RerankerMode,
    pub timeout_ms: u64,
    pub concurrency: usize,
}

impl ServicesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            embedding_url: None,
            embedding_model: None,
            embedding_dimensions: 256,
            rerank_url: None,
            rerank_model: None,
            reranker: RerankerMode::Disabled,
            timeout_ms: 5000,
            concurrency: 8,
        }
    }
}

/// Segmentation and citation retrieval limits.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub chunk_max_chars: usize,
    pub top_k: usize,
    pub citations_per_claim: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_max_chars: 1000,
            top_k: 20,
            citations_per_claim: 3,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { key: &'static str, value: String },
    MissingValue { key: &'static str },
    ScoringFile { path: PathBuf, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "{key} has invalid value '{value}'")
            }
            ConfigError::MissingValue { key } => write!(f, "{key} must be set"),
            ConfigError::ScoringFile { path, reason } => {
                write!(f, "scoring config {} rejected: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidValue { .. }
            | ConfigError::MissingValue { .. }
            | ConfigError::ScoringFile { .. } => None,
        }
    }
}
