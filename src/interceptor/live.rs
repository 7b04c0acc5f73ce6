use std::net::SocketAddr;

use tokio::io::AsyncWriteExt as _;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::warn;

use super::{RecordedEvent, Recorder};

/// Optional live-player socket sink. Connection failure is logged and
/// non-fatal: callers should simply not add this sink to the
/// `FanoutRecorder` when `connect` returns `None`.
pub struct LiveRecorder {
    tx: mpsc::UnboundedSender<RecordedEvent>,
}

impl LiveRecorder {
    pub async fn connect(addr: SocketAddr) -> Option<Self> {
        let stream = match TcpStream::connect(addr).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(%addr, error = %e, "could not connect to live player");
                return None;
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(writer_task(stream, rx));

        Some(Self { tx })
    }
}

impl Recorder for LiveRecorder {
    fn record(&self, event: RecordedEvent) {
        let _ = self.tx.send(event);
    }
}

async fn writer_task(mut stream: TcpStream, mut rx: mpsc::UnboundedReceiver<RecordedEvent>) {
    while let Some(event) = rx.recv().await {
        if let Err(e) = stream.write_all(&event.payload).await {
            warn!(error = %e, "live player socket write failed, dropping sink");
            return;
        }
    }
}
