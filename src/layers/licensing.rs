use ironrdp_pdu::rdp::headers::{BasicSecurityHeader, BasicSecurityHeaderFlags};
use ironrdp_pdu::rdp::server_license::{
    LicenseErrorCode, LicenseHeader, LicensingErrorMessage, LicensingStateTransition, PreambleFlags, PreambleType,
    PreambleVersion,
};

use crate::errors::{SessionError, SessionResult};

/// Builds the canned licensing response the engine always sends back: this
/// MITM never actually negotiates licensing with the client, it only needs
/// the client to proceed straight to the Client Info PDU.
pub fn no_license_required_pdu() -> (LicenseHeader, LicensingErrorMessage) {
    let message = LicensingErrorMessage {
        error_code: LicenseErrorCode::StatusValidClient,
        state_transition: LicensingStateTransition::NoTransition,
        error_info: Vec::new(),
    };

    let header = LicenseHeader {
        security_header: BasicSecurityHeader {
            flags: BasicSecurityHeaderFlags::LICENSE_PKT,
        },
        preamble_message_type: PreambleType::ErrorAlert,
        preamble_flags: PreambleFlags::empty(),
        preamble_version: PreambleVersion::V3,
        preamble_message_size: ironrdp_core::size(&message) as u16,
    };

    (header, message)
}

pub fn encode(header: &LicenseHeader, message: &LicensingErrorMessage) -> SessionResult<Vec<u8>> {
    let mut encoded = ironrdp_core::encode_vec(header).map_err(|source| SessionError::Encode {
        layer: "licensing",
        pdu: "LicenseHeader",
        source,
    })?;
    encoded.extend(ironrdp_core::encode_vec(message).map_err(|source| SessionError::Encode {
        layer: "licensing",
        pdu: "LicensingErrorMessage",
        source,
    })?);
    Ok(encoded)
}
