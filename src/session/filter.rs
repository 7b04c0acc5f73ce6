//! Field-level transforms applied in-flight to GCC/negotiation PDUs: a
//! trait implemented per PDU type, driven by a small config struct, so
//! each mutation site stays a one-line call instead of bespoke inline
//! field surgery.

use ironrdp_pdu::gcc::{ClientGccBlocks, ClientSecurityData, EncryptionMethod};
use ironrdp_pdu::nego;

pub trait Filter {
    fn filter(&mut self, config: &FilterConfig);
}

pub struct FilterConfig {
    /// The protocol the MITM actually advertises to the real client; it is
    /// never the original `requestedProtocols` when CredSSP/NLA/RDSTLS bits
    /// were present, since only TLS and Standard Security are implemented.
    pub server_response_protocol: nego::SecurityProtocol,
}

impl FilterConfig {
    pub fn new(server_response_protocol: nego::SecurityProtocol) -> Self {
        Self { server_response_protocol }
    }
}

/// Clears `ENCRYPTION_FIPS` from both `encryptionMethods` and
/// `extEncryptionMethods` before the Connect-Initial is forwarded to the
/// real server — FIPS encryption is never implemented here.
impl Filter for ClientGccBlocks {
    fn filter(&mut self, _config: &FilterConfig) {
        clear_fips(&mut self.security);
    }
}

fn clear_fips(security: &mut ClientSecurityData) {
    security.encryption_methods -= EncryptionMethod::FIPS;
    security.ext_encryption_methods &= !(EncryptionMethod::FIPS.bits());
}

/// Masks `requestedProtocols` down to SSL-only (or `None` if the client
/// didn't offer TLS at all) before replaying the negotiation request to
/// the real server, while leaving every other field — cookie, flags,
/// correlation — byte-identical to what the client sent.
pub fn mask_requested_protocols(original: nego::SecurityProtocol) -> nego::SecurityProtocol {
    if original.is_empty() {
        nego::SecurityProtocol::empty()
    } else {
        original & nego::SecurityProtocol::SSL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_request_without_ssl_masks_down_to_empty() {
        let masked = mask_requested_protocols(nego::SecurityProtocol::HYBRID);
        assert!(masked.is_empty());
    }

    #[test]
    fn empty_request_stays_empty() {
        let masked = mask_requested_protocols(nego::SecurityProtocol::empty());
        assert!(masked.is_empty());
    }

    #[test]
    fn ssl_bit_survives_the_mask() {
        let masked = mask_requested_protocols(nego::SecurityProtocol::SSL);
        assert_eq!(masked, nego::SecurityProtocol::SSL);
    }

    #[test]
    fn hybrid_request_is_masked_down_to_ssl_only() {
        // a client offering CredSSP/NLA alongside TLS should still only see
        // SSL survive, since NLA is never implemented here
        let offered = nego::SecurityProtocol::SSL | nego::SecurityProtocol::HYBRID;
        let masked = mask_requested_protocols(offered);
        assert_eq!(masked, nego::SecurityProtocol::SSL);
    }

    #[test]
    fn fips_is_cleared_from_both_encryption_method_fields() {
        let mut security = ClientSecurityData {
            encryption_methods: EncryptionMethod::BIT_128 | EncryptionMethod::FIPS,
            ext_encryption_methods: EncryptionMethod::FIPS.bits(),
        };
        clear_fips(&mut security);

        assert!(!security.encryption_methods.contains(EncryptionMethod::FIPS));
        assert!(security.encryption_methods.contains(EncryptionMethod::BIT_128));
        assert_eq!(security.ext_encryption_methods & EncryptionMethod::FIPS.bits(), 0);
    }
}
