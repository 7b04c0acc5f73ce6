use ironrdp_pdu::rdp::RdpPdu;

use crate::errors::{SessionError, SessionResult};

pub fn decode(payload: &[u8]) -> SessionResult<RdpPdu> {
    ironrdp_core::decode(payload).map_err(|source| SessionError::Parse {
        layer: "rdp_data",
        pdu: "RdpPdu",
        source,
    })
}

pub fn encode(pdu: &RdpPdu) -> SessionResult<Vec<u8>> {
    ironrdp_core::encode_vec(pdu).map_err(|source| SessionError::Encode {
        layer: "rdp_data",
        pdu: "RdpPdu",
        source,
    })
}

/// `PDUTYPE2_INPUT` subtype handler: observational only — forwarding of
/// the PDU continues unconditionally regardless of what this handler
/// does.
pub fn log_input_pdu(pdu: &RdpPdu) {
    if let RdpPdu::Input(input) = pdu {
        for event in &input.events {
            tracing::debug!(?event, "input event");
        }
    }
}
