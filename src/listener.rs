use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, instrument};

use crate::config::Conf;
use crate::session::Session;

/// Accepts RDP clients on the configured listener URL and spawns one
/// `Session` task per connection: a peer failure is logged and never
/// brings down the listener.
pub struct MitmListener {
    listener: TcpListener,
    conf: Arc<Conf>,
}

impl MitmListener {
    pub async fn bind(conf: Arc<Conf>) -> anyhow::Result<Self> {
        let addr = conf
            .listener_url
            .strip_prefix("tcp://")
            .unwrap_or(&conf.listener_url);

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind listener on {addr}"))?;

        info!(addr, "Listener started");

        Ok(Self { listener, conf })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    #[instrument("listener", skip(self))]
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let conf = Arc::clone(&self.conf);

                    tokio::spawn(async move {
                        if let Err(e) = handle_peer(stream, peer_addr, conf).await {
                            error!(client = %peer_addr, error = format!("{e:#}"), "Session failure");
                        }
                    });
                }
                Err(e) => error!(error = format!("{e:#}"), "Listener failure"),
            }
        }
    }
}

#[instrument("session", skip_all, fields(client = %peer_addr))]
async fn handle_peer(stream: TcpStream, peer_addr: SocketAddr, conf: Arc<Conf>) -> anyhow::Result<()> {
    stream.set_nodelay(true).context("set_nodelay")?;

    let session = Session::new(conf, peer_addr).await.context("session setup")?;
    session.run(stream).await.context("session run")
}
