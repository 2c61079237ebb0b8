use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configuration first: LOG_LEVEL decides the log filter
    let cfg = kitsu::config::load()?;
    // Guards must stay alive so the non-blocking writers flush
    let _log_guards = kitsu::logging::init(&cfg)?;
    info!("Starting {} (log level {})", cfg.app_name, cfg.log_level);

    kitsu::server::run(cfg).await
}
