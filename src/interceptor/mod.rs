//! Recording of observed PDUs, typed by direction and message kind.
//!
//! The wire format of the original `.rdpy` replay file is an external
//! collaborator contract; what this engine must honor is the *interface*:
//! direction-typed PDU emission to a file and, optionally, a live socket.

pub mod file;
pub mod live;

use bytes::Bytes;
use time::OffsetDateTime;

/// Which side of the session produced a recorded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedSide {
    Client,
    Server,
}

/// Message kind, mirroring `RDPPlayerMessageType` from the source system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedKind {
    ClientInfo,
    SlowPath,
    FastPathOutput,
    FastPathInput,
    ConnectionClose,
}

#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub side: RecordedSide,
    pub kind: RecordedKind,
    pub timestamp: OffsetDateTime,
    pub payload: Bytes,
}

/// A sink that observed PDUs are pushed into. Implementations must not
/// block the session's event loop; `record` only enqueues.
pub trait Recorder: Send + Sync {
    fn record(&self, event: RecordedEvent);
}

/// Fans out to every configured sink. Individual sink failures are logged
/// and do not affect the others: a live recording sink going down must
/// never interrupt the session it's observing.
pub struct FanoutRecorder {
    sinks: Vec<Box<dyn Recorder>>,
}

impl FanoutRecorder {
    pub fn new(sinks: Vec<Box<dyn Recorder>>) -> Self {
        Self { sinks }
    }
}

impl Recorder for FanoutRecorder {
    fn record(&self, event: RecordedEvent) {
        for sink in &self.sinks {
            sink.record(event.clone());
        }
    }
}
