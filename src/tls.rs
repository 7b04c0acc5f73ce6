use std::sync::Arc;

use anyhow::Context as _;
use camino::Utf8Path;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};

/// Installs the process-wide default crypto provider. Idempotent: a second
/// install attempt (e.g. in tests) is not an error.
pub fn install_default_crypto_provider() {
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        tracing::debug!("default crypto provider is already installed");
    }
}

/// Builds a server-role TLS acceptor from a PEM certificate chain and
/// private key on disk. This is the certificate the MITM presents to the
/// client; it need not chain to anything the real server trusts, only to
/// something the client is configured to accept.
pub fn build_server_acceptor(cert_path: &Utf8Path, key_path: &Utf8Path) -> anyhow::Result<tokio_rustls::TlsAcceptor> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;

    let server_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("failed to build server TLS config")?;

    Ok(tokio_rustls::TlsAcceptor::from(Arc::new(server_config)))
}

fn load_certs(path: &Utf8Path) -> anyhow::Result<Vec<CertificateDer<'static>>> {
    let mut reader = std::io::BufReader::new(std::fs::File::open(path).with_context(|| format!("opening {path}"))?);
    rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("parsing certificate chain at {path}"))
}

fn load_private_key(path: &Utf8Path) -> anyhow::Result<PrivateKeyDer<'static>> {
    let mut reader = std::io::BufReader::new(std::fs::File::open(path).with_context(|| format!("opening {path}"))?);
    rustls_pemfile::private_key(&mut reader)
        .with_context(|| format!("parsing private key at {path}"))?
        .context("no private key found")
}
