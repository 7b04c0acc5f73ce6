use thiserror::Error;

/// Error kinds surfaced by the session state machine.
///
/// Every variant here corresponds to one of the error kinds a session can
/// raise while driving the layer stack or the negotiation FSM; `main`/
/// `listener` code wraps these in `anyhow::Context` at the process boundary.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("malformed {pdu} at the {layer} layer")]
    Parse {
        layer: &'static str,
        pdu: &'static str,
        #[source]
        source: ironrdp_core::DecodeError,
    },

    #[error("failed to encode {pdu} at the {layer} layer")]
    Encode {
        layer: &'static str,
        pdu: &'static str,
        #[source]
        source: ironrdp_core::EncodeError,
    },

    #[error("unsupported TPKT framing, first byte = 0x{header:02x}")]
    UnsupportedFraming { header: u8 },

    #[error("negotiation failed, server returned non-zero MCS result {result}")]
    NegotiationFailure { result: u8 },

    #[error("crypto interception failure: {0}")]
    CryptoFailure(String),

    #[error("peer disconnected: {0}")]
    Disconnect(&'static str),

    #[error("failed to connect to outbound target")]
    OutboundConnectFailure(#[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;
