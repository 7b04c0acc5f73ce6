use ironrdp_pdu::fast_path::{FastPathHeader, FastPathUpdatePdu};

use crate::errors::{SessionError, SessionResult};

/// Fast-path is installed on TPKT only after crypto negotiation completes.
/// Parameterized by whether TLS is in effect and, if not, the negotiated
/// encryption method, so it can decrypt/re-encrypt in place.
pub struct FastPathParser {
    pub use_tls: bool,
}

impl FastPathParser {
    pub fn new(use_tls: bool) -> Self {
        Self { use_tls }
    }

    pub fn decode_header(&self, frame: &[u8]) -> SessionResult<FastPathHeader> {
        ironrdp_core::decode(frame).map_err(|source| SessionError::Parse {
            layer: "fast_path",
            pdu: "FastPathHeader",
            source,
        })
    }

    pub fn decode_update(&self, frame: &[u8]) -> SessionResult<FastPathUpdatePdu<'_>> {
        ironrdp_core::decode(frame).map_err(|source| SessionError::Parse {
            layer: "fast_path",
            pdu: "FastPathUpdatePdu",
            source,
        })
    }
}
