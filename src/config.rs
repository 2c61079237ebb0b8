use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Deserializer};

const DEFAULTS: &str = include_str!("../config/default.toml");

/// Process-wide settings, built once at startup and shared read-only
/// through [`crate::state::AppState`].
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    pub app_name: String,
    pub debug: bool,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub database_url: String,
    #[serde(default)]
    pub redis_url: String,
    #[serde(default, deserialize_with = "comma_separated")]
    pub allowed_origins: Vec<String>,
    pub log_level: String,
    pub log_dir: String,
    pub bind_host: String,
    pub bind_port: u16,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("app_name", &self.app_name)
            .field("debug", &self.debug)
            .field("secret_key", &"<redacted>")
            .field("database_url", &self.database_url)
            .field("redis_url", &self.redis_url)
            .field("allowed_origins", &self.allowed_origins)
            .field("log_level", &self.log_level)
            .field("log_dir", &self.log_dir)
            .field("bind_host", &self.bind_host)
            .field("bind_port", &self.bind_port)
            .finish()
    }
}

impl AppConfig {
    /// Maps `LOG_LEVEL` onto a tracing filter directive. Unknown levels fall
    /// back to `info`.
    pub fn log_directive(&self) -> &'static str {
        match self.log_level.as_str() {
            "TRACE" => "trace",
            "DEBUG" => "debug",
            "INFO" => "info",
            "WARN" | "WARNING" => "warn",
            "ERROR" | "CRITICAL" | "FATAL" => "error",
            _ => "info",
        }
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.bind_host, self.bind_port).parse().map_err(|e| {
            anyhow::anyhow!("invalid listen addr {}:{} - {}", self.bind_host, self.bind_port, e)
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

// ALLOWED_ORIGINS arrives as "a,b,c" from the environment and as an array from TOML.
fn comma_separated<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match StringOrList::deserialize(deserializer)? {
        StringOrList::One(s) => s.split(',').map(str::to_string).collect::<Vec<_>>(),
        StringOrList::Many(items) => items,
    };
    Ok(raw.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
}

/// Loads settings from the process environment.
///
/// Precedence (lowest first): embedded defaults, `kitsu.toml` in the working
/// directory, the file named by `KITSU_CONFIG`, environment variables.
pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();
    build(None)
}

/// Same as [`load`] but reads variables from `env` instead of the process
/// environment and skips the optional config files.
pub fn load_from(env: HashMap<String, String>) -> anyhow::Result<AppConfig> {
    build(Some(env))
}

fn build(env: Option<HashMap<String, String>>) -> anyhow::Result<AppConfig> {
    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml));

    let environment = match env {
        Some(vars) => ::config::Environment::default().source(Some(vars.into_iter().collect())),
        None => {
            builder = builder.add_source(::config::File::with_name("kitsu").required(false));
            if let Ok(custom_path) = std::env::var("KITSU_CONFIG") {
                builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
            }
            ::config::Environment::default()
        }
    };
    // Environment variables last to have highest precedence
    builder = builder.add_source(environment);

    let cfg = builder.build()?;
    let mut app_cfg: AppConfig = cfg.try_deserialize()?;
    app_cfg.log_level = app_cfg.log_level.trim().to_uppercase();
    validate(&app_cfg)?;
    Ok(app_cfg)
}

fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    if cfg.secret_key.trim().is_empty() {
        return Err(anyhow::anyhow!("SECRET_KEY must be set to a non-empty value"));
    }

    let db_url = cfg.database_url.trim();
    if db_url.is_empty() {
        return Err(anyhow::anyhow!("DATABASE_URL must be set"));
    }
    if !db_url.starts_with("sqlite:") {
        return Err(anyhow::anyhow!("DATABASE_URL must use the sqlite: scheme, got {}", redact_url(db_url)));
    }

    let redis_url = cfg.redis_url.trim();
    if redis_url.is_empty() {
        return Err(anyhow::anyhow!("REDIS_URL must be set"));
    }
    if !redis_url.starts_with("redis://") && !redis_url.starts_with("rediss://") {
        return Err(anyhow::anyhow!("REDIS_URL must use the redis:// or rediss:// scheme"));
    }

    for origin in &cfg.allowed_origins {
        let valid = origin == "*" || origin.starts_with("http://") || origin.starts_with("https://");
        if !valid {
            return Err(anyhow::anyhow!("ALLOWED_ORIGINS entry is not an http(s) origin: {}", origin));
        }
    }

    if cfg.bind_port == 0 {
        return Err(anyhow::anyhow!("invalid BIND_PORT: {}", cfg.bind_port));
    }
    // Warn for privileged ports on Unix-like systems
    #[cfg(unix)]
    if cfg.bind_port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.bind_port);
    }

    Ok(())
}

// Keeps credentials embedded in a URL out of error messages.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

/// Creates the parent directory of an on-disk SQLite database. In-memory
/// URLs are left alone.
pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    let Some(rest) = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:")) else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return Ok(());
    }
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
