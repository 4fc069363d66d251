//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::{
    patterns::{CachePatterns, DEFAULT_CACHE_PATTERNS},
    worker::{CACHE_NAME, CRITICAL_ASSETS, FONT_HOST, STATIC_CACHE_NAME, WorkerConfig},
};

mod cli;

pub use cli::{CliArgs, Command, InspectArgs, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "satam-edge";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8088;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub upstream: UpstreamSettings,
    pub worker: WorkerSettings,
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
    /// Origin controlled pages are served under; origin-form requests resolve against it.
    pub public_origin: Url,
}

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    /// Portal backend. Required by `serve`, unused by `inspect`.
    pub base_url: Option<Url>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub font_host: String,
    pub critical_assets: Vec<String>,
    pub dynamic_cache: String,
    pub static_cache: String,
    pub patterns: CachePatterns,
    pub skip_waiting_on_install: bool,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

impl Settings {
    /// Worker configuration for a new generation.
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            origin: self.server.public_origin.clone(),
            dynamic_cache: self.worker.dynamic_cache.clone(),
            static_cache: self.worker.static_cache.clone(),
            critical_assets: self.worker.critical_assets.clone(),
            patterns: self.worker.patterns.clone(),
            font_host: self.worker.font_host.clone(),
            skip_waiting_on_install: self.worker.skip_waiting_on_install,
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix("SATAM_EDGE")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("worker.critical_assets")
            .with_list_parse_key("worker.cache_patterns"),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Inspect(_)) => {}
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    upstream: RawUpstreamSettings,
    worker: RawWorkerSettings,
    cache: RawCacheSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(origin) = overrides.public_origin.as_ref() {
            self.server.public_origin = Some(origin.clone());
        }
        if let Some(url) = overrides.upstream_url.as_ref() {
            self.upstream.base_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.upstream_timeout_seconds {
            self.upstream.timeout_seconds = Some(seconds);
        }
        if let Some(path) = overrides.cache_snapshot_path.as_ref() {
            self.cache.snapshot_path = Some(path.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            upstream,
            worker,
            cache,
            logging,
        } = raw;

        let server = build_server_settings(server)?;
        let upstream = build_upstream_settings(upstream)?;
        let worker = build_worker_settings(worker)?;
        let cache = build_cache_settings(cache);
        let logging = build_logging_settings(logging)?;

        Ok(Self {
            server,
            upstream,
            worker,
            cache,
            logging,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }
    let graceful_shutdown = Duration::from_secs(graceful_secs);

    let public_origin = match non_blank(server.public_origin) {
        Some(value) => parse_origin(&value)
            .map_err(|reason| LoadError::invalid("server.public_origin", reason))?,
        None => parse_origin(&format!("http://{addr}"))
            .map_err(|reason| LoadError::invalid("server.public_origin", reason))?,
    };

    Ok(ServerSettings {
        addr,
        graceful_shutdown,
        public_origin,
    })
}

fn build_upstream_settings(upstream: RawUpstreamSettings) -> Result<UpstreamSettings, LoadError> {
    let base_url = non_blank(upstream.base_url)
        .map(|value| parse_http_url(&value))
        .transpose()
        .map_err(|reason| LoadError::invalid("upstream.base_url", reason))?;

    let timeout_secs = upstream
        .timeout_seconds
        .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "upstream.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(UpstreamSettings {
        base_url,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_worker_settings(worker: RawWorkerSettings) -> Result<WorkerSettings, LoadError> {
    let font_host = non_blank(worker.font_host).unwrap_or_else(|| FONT_HOST.to_string());
    let dynamic_cache = non_blank(worker.dynamic_cache).unwrap_or_else(|| CACHE_NAME.to_string());
    let static_cache =
        non_blank(worker.static_cache).unwrap_or_else(|| STATIC_CACHE_NAME.to_string());
    if dynamic_cache == static_cache {
        return Err(LoadError::invalid(
            "worker.static_cache",
            "must differ from worker.dynamic_cache",
        ));
    }

    let critical_assets = worker
        .critical_assets
        .unwrap_or_else(|| CRITICAL_ASSETS.iter().map(|s| s.to_string()).collect());
    if let Some(asset) = critical_assets.iter().find(|asset| !asset.starts_with('/')) {
        return Err(LoadError::invalid(
            "worker.critical_assets",
            format!("`{asset}` must be an absolute path"),
        ));
    }

    let patterns = match worker.cache_patterns {
        Some(sources) => CachePatterns::new(&sources)
            .map_err(|err| LoadError::invalid("worker.cache_patterns", err.to_string()))?,
        None => CachePatterns::new(DEFAULT_CACHE_PATTERNS)
            .map_err(|err| LoadError::invalid("worker.cache_patterns", err.to_string()))?,
    };

    Ok(WorkerSettings {
        font_host,
        critical_assets,
        dynamic_cache,
        static_cache,
        patterns,
        skip_waiting_on_install: worker.skip_waiting_on_install.unwrap_or(true),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> CacheSettings {
    CacheSettings {
        snapshot_path: cache
            .snapshot_path
            .filter(|path| !path.as_os_str().is_empty()),
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
    public_origin: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawUpstreamSettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawWorkerSettings {
    font_host: Option<String>,
    critical_assets: Option<Vec<String>>,
    dynamic_cache: Option<String>,
    static_cache: Option<String>,
    cache_patterns: Option<Vec<String>>,
    skip_waiting_on_install: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_http_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value).map_err(|err| format!("invalid url `{value}`: {err}"))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(format!("`{value}` must be an http(s) url with a host"));
    }
    Ok(url)
}

/// Parse an http(s) url and keep only its origin.
fn parse_origin(value: &str) -> Result<Url, String> {
    let url = parse_http_url(value)?;
    let origin = url.origin().ascii_serialization();
    Url::parse(&origin).map_err(|err| format!("invalid origin `{origin}`: {err}"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
