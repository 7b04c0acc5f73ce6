use std::io::Write as _;

use camino::{Utf8Path, Utf8PathBuf};
use rand::Rng as _;
use time::OffsetDateTime;
use tokio::sync::mpsc;

use super::{RecordedEvent, Recorder};

/// Builds the replay file name `out/rdp_replay_<YYYYMMDD_HH_MMSS>_<rand0_1000>.rdpy`.
pub fn replay_file_path(out_dir: &Utf8Path, now: OffsetDateTime) -> anyhow::Result<Utf8PathBuf> {
    let format = time::format_description::parse("[year][month][day]_[hour]_[minute][second]")?;
    let stamp = now.format(&format)?;
    let rand: u32 = rand::thread_rng().gen_range(0..1000);
    Ok(out_dir.join(format!("rdp_replay_{stamp}_{rand}.rdpy")))
}

/// Writes recorded events to a file, one length-prefixed frame per event.
/// A background task owns the file handle so `record()` never blocks on IO.
pub struct FileRecorder {
    tx: mpsc::UnboundedSender<RecordedEvent>,
}

impl FileRecorder {
    pub fn create(path: &Utf8Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(writer_task(file, rx));

        Ok(Self { tx })
    }
}

impl Recorder for FileRecorder {
    fn record(&self, event: RecordedEvent) {
        // The receiver only goes away on teardown; a failed send here means
        // the writer task already exited and there is nothing left to do.
        let _ = self.tx.send(event);
    }
}

async fn writer_task(mut file: std::fs::File, mut rx: mpsc::UnboundedReceiver<RecordedEvent>) {
    while let Some(event) = rx.recv().await {
        if let Err(e) = write_frame(&mut file, &event) {
            tracing::warn!(error = %e, "failed to write recorder frame");
        }
    }
}

fn write_frame(file: &mut std::fs::File, event: &RecordedEvent) -> std::io::Result<()> {
    let side = match event.side {
        super::RecordedSide::Client => 0u8,
        super::RecordedSide::Server => 1u8,
    };
    let kind = match event.kind {
        super::RecordedKind::ClientInfo => 0u8,
        super::RecordedKind::SlowPath => 1u8,
        super::RecordedKind::FastPathOutput => 2u8,
        super::RecordedKind::FastPathInput => 3u8,
        super::RecordedKind::ConnectionClose => 4u8,
    };

    file.write_all(&[side, kind])?;
    file.write_all(&(event.timestamp.unix_timestamp() as u64).to_le_bytes())?;
    file.write_all(&(event.payload.len() as u32).to_le_bytes())?;
    file.write_all(&event.payload)?;
    file.flush()
}
