use crate::errors::SessionResult;
use crate::session::crypto::Rc4CrypterProxy;

/// The RDP Standard Security header is present on every PDU below this
/// layer until TLS takes over, and briefly reappears for the first
/// licensing PDU even under TLS, since licensing is negotiated below TLS's
/// encryption boundary in the RDP state machine.
pub struct TlsSecurityLayer {
    pub security_header_expected: bool,
}

impl TlsSecurityLayer {
    pub fn new() -> Self {
        Self {
            security_header_expected: false,
        }
    }

    pub fn send(&self, payload: &[u8]) -> Vec<u8> {
        payload.to_vec()
    }

    pub fn recv(&self, payload: &[u8]) -> Vec<u8> {
        payload.to_vec()
    }
}

/// RC4 Standard Security: encrypts/decrypts with the keys derived by
/// `SecuritySettings` once both randoms are known.
pub struct NonTlsSecurityLayer {
    pub security_header_expected: bool,
    crypter: Rc4CrypterProxy,
}

impl NonTlsSecurityLayer {
    pub fn new(crypter: Rc4CrypterProxy) -> Self {
        Self {
            security_header_expected: true,
            crypter,
        }
    }

    pub fn send(&self, payload: &[u8]) -> SessionResult<Vec<u8>> {
        self.crypter.encrypt(payload)
    }

    pub fn recv(&self, payload: &[u8]) -> SessionResult<Vec<u8>> {
        self.crypter.decrypt(payload)
    }
}

/// Sum type over the two security-layer variants, sharing one downward
/// `send`/`recv` contract.
pub enum SecurityLayer {
    Tls(TlsSecurityLayer),
    NonTls(NonTlsSecurityLayer),
}

impl SecurityLayer {
    pub fn security_header_expected(&self) -> bool {
        match self {
            Self::Tls(l) => l.security_header_expected,
            Self::NonTls(l) => l.security_header_expected,
        }
    }

    pub fn set_security_header_expected(&mut self, value: bool) {
        match self {
            Self::Tls(l) => l.security_header_expected = value,
            Self::NonTls(l) => l.security_header_expected = value,
        }
    }

    pub fn send(&self, payload: &[u8]) -> SessionResult<Vec<u8>> {
        match self {
            Self::Tls(l) => Ok(l.send(payload)),
            Self::NonTls(l) => l.send(payload),
        }
    }

    pub fn recv(&self, payload: &[u8]) -> SessionResult<Vec<u8>> {
        match self {
            Self::Tls(l) => Ok(l.recv(payload)),
            Self::NonTls(l) => l.recv(payload),
        }
    }
}
