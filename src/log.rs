use camino::Utf8Path;
use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber writing to stderr, filtered by `RUST_LOG`
/// (defaulting to `info`). A dedicated log file is opened in addition so
/// that a session running as a background service still leaves a trail.
pub fn init(log_file: &Utf8Path) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file = std::fs::OpenOptions::new().create(true).append(true).open(log_file)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(move || file.try_clone().expect("log file handle"))
        .with_ansi(false)
        .init();

    Ok(())
}
