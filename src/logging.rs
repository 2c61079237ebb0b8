use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;

/// Keeps the non-blocking writers alive. Dropping it flushes and stops them,
/// so hold it until the process exits.
pub struct LogGuards {
    _stdout: WorkerGuard,
    _file: WorkerGuard,
}

/// Builds the filter: `RUST_LOG` wins, otherwise the level from `LOG_LEVEL`.
pub fn env_filter(cfg: &AppConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http={}", cfg.log_directive(), cfg.log_directive())))
}

/// Installs the global subscriber: stdout plus a daily rotated file under
/// `cfg.log_dir`.
pub fn init(cfg: &AppConfig) -> anyhow::Result<LogGuards> {
    std::fs::create_dir_all(&cfg.log_dir)?;
    let (stdout_nb, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let file_appender = tracing_appender::rolling::daily(&cfg.log_dir, format!("{}.log", cfg.app_name));
    let (file_nb, file_guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter(cfg))
        .with(tracing_subscriber::fmt::layer().with_writer(stdout_nb))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_nb))
        .try_init()?;

    Ok(LogGuards { _stdout: stdout_guard, _file: file_guard })
}
