use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser as _;
use rdp_mitm::config::{Cli, Conf};
use rdp_mitm::listener::MitmListener;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let conf = Conf::load(&cli.config).context("loading configuration")?;

    rdp_mitm::log::init(&conf.log_file).context("initializing logging")?;
    rdp_mitm::tls::install_default_crypto_provider();

    let conf = Arc::new(conf);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    rt.block_on(run(conf))
}

async fn run(conf: Arc<Conf>) -> anyhow::Result<()> {
    let listener = MitmListener::bind(Arc::clone(&conf)).await.context("bind listener")?;

    tokio::select! {
        result = listener.run() => result,
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
