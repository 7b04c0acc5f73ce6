use ironrdp_pdu::nego;

use crate::errors::{SessionError, SessionResult};

/// The source value the MITM always advertises in its X.224 Connection
/// Confirm, regardless of what the real server sent.
pub const CONFIRM_SOURCE: u16 = 0x1234;

pub fn decode_request(frame: &[u8]) -> SessionResult<nego::ConnectionRequest> {
    ironrdp_core::decode(frame).map_err(|source| SessionError::Parse {
        layer: "x224",
        pdu: "ConnectionRequest",
        source,
    })
}

pub fn decode_confirm(frame: &[u8]) -> SessionResult<nego::ConnectionConfirm> {
    ironrdp_core::decode(frame).map_err(|source| SessionError::Parse {
        layer: "x224",
        pdu: "ConnectionConfirm",
        source,
    })
}

/// Byte offset of the TPDU header's SRC-REF field in the TPKT+TPDU record
/// `ironrdp_core::encode_vec` produces for a non-Data TPDU: a 4-byte TPKT
/// header, then LI, code, and a 2-byte DST-REF ahead of it.
const SRC_REF_OFFSET: usize = 8;

/// Builds the confirm written back to the client: advertises `protocol`
/// (SSL iff the original request advertised TLS, else none) with the
/// MITM's fixed source identifier.
///
/// `ironrdp-pdu`'s TPDU header writer hardcodes DST-REF/SRC-REF to zero for
/// every non-Data TPDU, so `CONFIRM_SOURCE` is patched into the encoded
/// bytes afterward rather than threaded through `ConnectionConfirm`, which
/// has no field for it.
pub fn encode_confirm(protocol: nego::SecurityProtocol) -> SessionResult<Vec<u8>> {
    let confirm = nego::ConnectionConfirm::Response {
        flags: nego::ResponseFlags::empty(),
        protocol,
    };
    let mut encoded = ironrdp_core::encode_vec(&confirm).map_err(|source| SessionError::Encode {
        layer: "x224",
        pdu: "ConnectionConfirm",
        source,
    })?;

    encoded[SRC_REF_OFFSET..SRC_REF_OFFSET + 2].copy_from_slice(&CONFIRM_SOURCE.to_be_bytes());

    Ok(encoded)
}

pub fn encode_request(request: &nego::ConnectionRequest) -> SessionResult<Vec<u8>> {
    ironrdp_core::encode_vec(request).map_err(|source| SessionError::Encode {
        layer: "x224",
        pdu: "ConnectionRequest",
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_confirm_advertises_the_fixed_source() {
        let encoded = encode_confirm(nego::SecurityProtocol::SSL).unwrap();
        let src_ref = u16::from_be_bytes([encoded[SRC_REF_OFFSET], encoded[SRC_REF_OFFSET + 1]]);
        assert_eq!(src_ref, CONFIRM_SOURCE);
    }

    #[test]
    fn encode_confirm_still_decodes_as_a_connection_confirm() {
        let encoded = encode_confirm(nego::SecurityProtocol::empty()).unwrap();
        let confirm = decode_confirm(&encoded).unwrap();
        assert!(matches!(confirm, nego::ConnectionConfirm::Response { .. }));
    }
}
