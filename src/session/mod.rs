//! The per-connection state machine: owns both halves of the relay, drives
//! the connection sequence to completion, then forwards PDUs until either
//! side disconnects.
//!
//! Grounded on `server.py`'s `MITMServer` (the single class driving
//! `onConnectionRequest` through `onChannelJoinRequest`) and the
//! one-task-per-connection shape in `listener.rs`: one `tokio::spawn` owns
//! one `Session`, and everything inside it runs on that one task.

pub mod channel;
pub mod client_half;
pub mod crypto;
pub mod filter;
pub mod negotiation;

use std::sync::Arc;
use std::net::SocketAddr;

use bytes::Bytes;
use ironrdp_pdu::rdp::server_license::cert::{CertificateType, RsaPublicKey};
use ironrdp_pdu::rdp::server_license::ServerCertificate;
use ironrdp_pdu::{gcc, mcs, nego};
use time::OffsetDateTime;
use tokio::io::AsyncWriteExt as _;
use tokio::net::TcpStream;
use tracing::{debug, info, instrument, warn};

use crate::config::Conf;
use crate::errors::{SessionError, SessionResult};
use crate::interceptor::file::{replay_file_path, FileRecorder};
use crate::interceptor::live::LiveRecorder;
use crate::interceptor::{FanoutRecorder, RecordedEvent, RecordedKind, RecordedSide, Recorder};
use crate::layers::mcs::USER_CHANNEL_ID;
use crate::layers::security::{NonTlsSecurityLayer, SecurityLayer, TlsSecurityLayer};
use crate::layers::tcp::{ClosedFlag, TcpLayer};
use crate::layers::{licensing, mcs as mcs_layer, rdp_data, tpkt, x224};
use crate::tls;
use channel::ChannelTable;
use client_half::ClientHalf;
use crypto::{encrypt_client_random_for_server, MitmRsaKey, Rc4CrypterProxy, SecuritySettings};
use filter::{Filter as _, FilterConfig};
use negotiation::{Negotiation, NegotiationState};

pub struct Session {
    conf: Arc<Conf>,
    peer_addr: SocketAddr,
    recorder: Arc<dyn Recorder>,
    mitm_key: MitmRsaKey,
    negotiation: Negotiation,
    channels: ChannelTable,
    closed: ClosedFlag,
}

impl Session {
    pub async fn new(conf: Arc<Conf>, peer_addr: SocketAddr) -> anyhow::Result<Self> {
        let recorder = build_recorder(&conf).await?;
        let mitm_key = MitmRsaKey::generate().map_err(anyhow::Error::from)?;

        Ok(Self {
            conf,
            peer_addr,
            recorder: Arc::new(recorder),
            mitm_key,
            negotiation: Negotiation::new(nego::SecurityProtocol::empty()),
            channels: ChannelTable::new(),
            closed: ClosedFlag::default(),
        })
    }

    #[instrument("rdp", skip_all, fields(peer = %self.peer_addr))]
    pub async fn run(mut self, stream: TcpStream) -> anyhow::Result<()> {
        let result = self.drive(stream).await;

        match &result {
            Ok(()) => {
                self.disconnect("session ended");
                info!("session ended");
            }
            Err(e) => {
                self.disconnect("session ended with error");
                warn!(error = %e, "session ended with error");
            }
        }

        result.map_err(anyhow::Error::from)
    }

    async fn drive(&mut self, stream: TcpStream) -> SessionResult<()> {
        let mut client = TcpLayer::plain(stream);

        // --- X.224 Connection Request / Confirm -----------------------
        let request = tpkt::read_tpkt_record(&mut client).await.and_then(|f| x224::decode_request(&f))?;
        self.negotiation.client_requested_protocol = request.protocol;
        self.negotiation.state.advance(NegotiationState::X224RequestReceived)?;

        self.negotiation.state.advance(NegotiationState::OutboundConnecting)?;
        let mut server = ClientHalf::connect(&self.conf.target_host, self.conf.target_port).await?;

        let masked_protocol = filter::mask_requested_protocols(request.protocol);
        server.send_connection_request(masked_protocol).await?;
        let server_confirm = server.recv_connection_confirm().await?;

        let protocol = match server_confirm {
            nego::ConnectionConfirm::Response { protocol, .. } => protocol,
            nego::ConnectionConfirm::Failure { code } => {
                return Err(SessionError::NegotiationFailure { result: u32::from(code) as u8 })
            }
        };
        self.negotiation.server_confirmed_protocol = Some(protocol);
        self.negotiation.tls_in_use = protocol.contains(nego::SecurityProtocol::SSL);
        self.negotiation.state.advance(NegotiationState::X224Confirmed)?;

        let confirm_bytes = x224::encode_confirm(protocol)?;
        tpkt::write_tpkt_record(&mut client, &confirm_bytes).await?;

        let mut client = if self.negotiation.tls_in_use {
            let acceptor = tls::build_server_acceptor(&self.conf.certificate_file_name, &self.conf.private_key_file_name)
                .map_err(|e| SessionError::CryptoFailure(e.to_string()))?;
            client.start_tls(&acceptor).await.map_err(SessionError::Io)?
        } else {
            client
        };

        let mut server = if self.negotiation.tls_in_use {
            let connector = outbound_tls_connector();
            let server_name = rustls_pki_types::ServerName::try_from(self.conf.target_host.clone())
                .map_err(|e| SessionError::CryptoFailure(e.to_string()))?;
            server.start_tls(&connector, server_name).await?
        } else {
            server
        };

        // --- MCS Connect Initial / Response -----------------------------
        self.negotiation.state.advance(NegotiationState::McsConnectInitialForwarded)?;
        let connect_initial: mcs::ConnectInitial =
            read_slow_path(&mut client).await.and_then(|f| decode_mcs_pdu(&f))?;
        let expected_channel_count = connect_initial.channel_names().map(|c| c.len()).unwrap_or(0);

        let mut gcc_blocks = connect_initial.conference_create_request.gcc_blocks().clone();
        let filter_config = FilterConfig::new(protocol);
        gcc_blocks.filter(&filter_config);
        server.send_connect_initial(gcc_blocks).await?;

        self.negotiation.state.advance(NegotiationState::AwaitingServerData)?;
        let connect_response = server.recv_connect_response().await?;
        server.send_erect_domain_request().await?;

        let (connect_response, mut security_settings, server_rsa_public_key) = self.rewrite_server_data(connect_response)?;
        self.negotiation.state.advance(NegotiationState::ServerDataRewritten)?;

        let response_bytes = ironrdp_core::encode_vec(&connect_response).map_err(|source| SessionError::Encode {
            layer: "mcs",
            pdu: "ConnectResponse",
            source,
        })?;
        tpkt::write_slow_path(&mut client, &response_bytes).await?;

        let io_channel_id = connect_response.global_channel_id();
        self.channels.set_io_channel(io_channel_id);

        // --- Domain / user attach ---------------------------------------
        read_slow_path(&mut client).await?; // ErectDomainRequest, nothing to act on

        expect_mcs(&mut client, |msg| matches!(msg, mcs::McsMessage::AttachUserRequest(_))).await?;
        write_mcs(
            &mut client,
            &mcs::McsMessage::AttachUserConfirm(mcs::AttachUserConfirm {
                result: 0,
                initiator_id: USER_CHANNEL_ID,
            }),
        )
        .await?;

        server.send_attach_user_request().await?;
        let server_attach_confirm = server.recv_attach_user_confirm().await?;
        self.negotiation.state.advance(NegotiationState::UserAttached)?;

        // --- Channel joins -----------------------------------------------
        // Only the I/O channel and the fixed user channel are ever joined;
        // every other requested channel is refused locally and never
        // reaches the real server.
        for _ in 0..=expected_channel_count {
            let request = read_channel_join_request(&mut client).await?;

            if request.channel_id == self.channels.user_channel_id() {
                write_mcs(
                    &mut client,
                    &mcs::McsMessage::ChannelJoinConfirm(mcs::ChannelJoinConfirm {
                        result: channel::RT_SUCCESSFUL,
                        initiator_id: request.initiator_id,
                        requested_channel_id: request.channel_id,
                        channel_id: request.channel_id,
                    }),
                )
                .await?;
                continue;
            }

            if request.channel_id == io_channel_id {
                server
                    .send_channel_join_request(server_attach_confirm.initiator_id, request.channel_id)
                    .await?;
                let server_confirm = server.recv_channel_join_confirm().await?;
                self.channels.set_io_channel(server_confirm.channel_id);

                write_mcs(
                    &mut client,
                    &mcs::McsMessage::ChannelJoinConfirm(mcs::ChannelJoinConfirm {
                        result: server_confirm.result,
                        initiator_id: request.initiator_id,
                        requested_channel_id: request.channel_id,
                        channel_id: server_confirm.channel_id,
                    }),
                )
                .await?;
                continue;
            }

            write_mcs(
                &mut client,
                &mcs::McsMessage::ChannelJoinConfirm(mcs::ChannelJoinConfirm {
                    result: channel::RT_USER_REJECTED,
                    initiator_id: request.initiator_id,
                    requested_channel_id: request.channel_id,
                    channel_id: request.channel_id,
                }),
            )
            .await?;
        }
        self.negotiation.state.advance(NegotiationState::ChannelsJoined)?;

        // --- Security exchange (non-TLS only) ---------------------------
        let mut client_security = SecurityLayer::Tls(TlsSecurityLayer::new());
        let mut server_security = SecurityLayer::Tls(TlsSecurityLayer::new());

        if !self.negotiation.tls_in_use {
            let encrypted_random = read_security_exchange(&mut client, io_channel_id).await?;
            let client_random = self.mitm_key.decrypt_client_random(&encrypted_random)?;

            let server_public_key = server_rsa_public_key
                .as_ref()
                .ok_or_else(|| SessionError::CryptoFailure("real server sent no RSA public key under Standard Security".into()))?;
            let encrypted_for_server = encrypt_client_random_for_server(&client_random, server_public_key)?;
            server
                .send_security_exchange(io_channel_id, server_attach_confirm.initiator_id, &encrypted_for_server)
                .await?;

            let keys = security_settings
                .set_client_random(client_random)
                .expect("server random was captured while rewriting server data");

            client_security = SecurityLayer::NonTls(NonTlsSecurityLayer::new(Rc4CrypterProxy::new(&keys)));
            server_security = SecurityLayer::NonTls(NonTlsSecurityLayer::new(Rc4CrypterProxy::new(&keys)));
        }
        self.negotiation.state.advance(NegotiationState::SecurityExchanged)?;

        // --- Client Info --------------------------------------------------
        let client_info_frame = read_slow_path(&mut client).await?;
        self.recorder.record(RecordedEvent {
            side: RecordedSide::Client,
            kind: RecordedKind::ClientInfo,
            timestamp: now(),
            payload: Bytes::copy_from_slice(&client_info_frame),
        });
        forward_send_data(&mut server, io_channel_id, server_attach_confirm.initiator_id, &client_info_frame).await?;
        self.negotiation.state.advance(NegotiationState::ClientInfoForwarded)?;

        // --- Licensing: always short-circuit with "no license required" --
        let (license_header, license_message) = licensing::no_license_required_pdu();
        let license_bytes = licensing::encode(&license_header, &license_message)?;
        tpkt::write_slow_path(&mut client, &license_bytes).await?;
        self.negotiation.state.advance(NegotiationState::Licensed)?;

        self.negotiation.state.advance(NegotiationState::Steady)?;

        self.relay_steady_state(
            &mut client,
            &mut server,
            io_channel_id,
            server_attach_confirm.initiator_id,
            &client_security,
            &server_security,
        )
        .await
    }

    /// Replaces the server's RSA public key with the MITM's and clamps FIPS
    /// down to 128-bit/High, mirroring `server.py`'s `onConnectResponse`.
    /// Returns the rewritten response, `SecuritySettings` primed with
    /// whatever server random the GCC security data carried, and the real
    /// server's original RSA public key (needed to complete the outbound
    /// half's own Security Exchange under Standard Security).
    fn rewrite_server_data(
        &self,
        mut connect_response: mcs::ConnectResponse,
    ) -> SessionResult<(mcs::ConnectResponse, SecuritySettings, Option<RsaPublicKey>)> {
        let user_id = connect_response.conference_create_response.user_id();
        let mut gcc_blocks = connect_response.conference_create_response.clone().into_gcc_blocks();

        let bits_40 = !gcc_blocks.security.encryption_method.contains(gcc::EncryptionMethod::BIT_128)
            && !gcc_blocks.security.encryption_method.contains(gcc::EncryptionMethod::FIPS);

        if gcc_blocks.security.encryption_method.contains(gcc::EncryptionMethod::FIPS) {
            gcc_blocks.security.encryption_method = gcc::EncryptionMethod::BIT_128;
        }
        if gcc_blocks.security.encryption_level == gcc::EncryptionLevel::Fips {
            gcc_blocks.security.encryption_level = gcc::EncryptionLevel::High;
        }

        let mut settings = SecuritySettings::new(bits_40);
        if let Some(server_random) = gcc_blocks.security.server_random {
            settings.server_security_received(server_random.to_vec());
        }

        let mut server_rsa_public_key = None;

        if !gcc_blocks.security.server_cert.is_empty() {
            let server_cert: ServerCertificate =
                ironrdp_core::decode(&gcc_blocks.security.server_cert).map_err(|source| SessionError::Parse {
                    layer: "security",
                    pdu: "ServerCertificate",
                    source,
                })?;

            if let CertificateType::Proprietary(cert) = server_cert.certificate {
                server_rsa_public_key = Some(cert.public_key.clone());

                let substituted = ServerCertificate {
                    issued_permanently: server_cert.issued_permanently,
                    certificate: CertificateType::Proprietary(self.mitm_key.substitute_certificate(cert)),
                };
                gcc_blocks.security.server_cert =
                    ironrdp_core::encode_vec(&substituted).map_err(|source| SessionError::Encode {
                        layer: "security",
                        pdu: "ServerCertificate",
                        source,
                    })?;
            }
        }

        connect_response.conference_create_response =
            gcc::ConferenceCreateResponse::new(user_id, gcc_blocks).map_err(|source| SessionError::Parse {
                layer: "security",
                pdu: "ConferenceCreateResponse",
                source,
            })?;

        Ok((connect_response, settings, server_rsa_public_key))
    }

    /// Steady-state bidirectional relay: every slow-path PDU on the I/O
    /// channel arrives wrapped in an MCS Send-Data PDU, whose `user_data` is
    /// the RC4-protected payload; everything else is forwarded byte-for-byte.
    /// Mirrors `server.py`'s paired slow-path/fast-path observers.
    async fn relay_steady_state(
        &mut self,
        client: &mut TcpLayer,
        server: &mut ClientHalf,
        io_channel_id: u16,
        server_initiator_id: u16,
        client_security: &SecurityLayer,
        server_security: &SecurityLayer,
    ) -> SessionResult<()> {
        let result = self
            .relay_loop(client, server, io_channel_id, server_initiator_id, client_security, server_security)
            .await;

        // Client-side close first, then server-side, matching the order the
        // client observed the connection being used.
        let _ = client.shutdown().await;
        let _ = server.transport_mut().shutdown().await;

        result
    }

    async fn relay_loop(
        &mut self,
        client: &mut TcpLayer,
        server: &mut ClientHalf,
        io_channel_id: u16,
        server_initiator_id: u16,
        client_security: &SecurityLayer,
        server_security: &SecurityLayer,
    ) -> SessionResult<()> {
        loop {
            tokio::select! {
                frame = tpkt::read_frame(client) => {
                    match frame? {
                        tpkt::Frame::SlowPath(payload) => {
                            let mcs::McsMessage::SendDataRequest(request) = mcs_layer::decode(&payload)? else {
                                return Err(SessionError::NegotiationFailure { result: 0xFB });
                            };
                            let decrypted = client_security.recv(&request.user_data)?;
                            if let Ok(pdu) = rdp_data::decode(&decrypted) {
                                rdp_data::log_input_pdu(&pdu);
                            }
                            self.recorder.record(RecordedEvent {
                                side: RecordedSide::Client,
                                kind: RecordedKind::SlowPath,
                                timestamp: now(),
                                payload: Bytes::copy_from_slice(&decrypted),
                            });
                            let re_encrypted = server_security.send(&decrypted)?;
                            forward_send_data(server, io_channel_id, server_initiator_id, &re_encrypted).await?;
                        }
                        tpkt::Frame::FastPath(payload) => {
                            self.recorder.record(RecordedEvent {
                                side: RecordedSide::Client,
                                kind: RecordedKind::FastPathInput,
                                timestamp: now(),
                                payload: Bytes::copy_from_slice(&payload),
                            });
                            tpkt::write_fast_path(server.transport_mut(), &payload).await?;
                        }
                    }
                }
                frame = server.read_frame() => {
                    match frame? {
                        tpkt::Frame::SlowPath(payload) => {
                            let (initiator_id, user_data) = match mcs_layer::decode(&payload)? {
                                mcs::McsMessage::SendDataIndication(indication) => {
                                    (indication.initiator_id, indication.user_data.into_owned())
                                }
                                mcs::McsMessage::SendDataRequest(request) => {
                                    (request.initiator_id, request.user_data.into_owned())
                                }
                                _ => return Err(SessionError::NegotiationFailure { result: 0xFA }),
                            };
                            let decrypted = server_security.recv(&user_data)?;
                            self.recorder.record(RecordedEvent {
                                side: RecordedSide::Server,
                                kind: RecordedKind::SlowPath,
                                timestamp: now(),
                                payload: Bytes::copy_from_slice(&decrypted),
                            });
                            let re_encrypted = client_security.send(&decrypted)?;
                            write_send_data_indication(client, io_channel_id, initiator_id, &re_encrypted).await?;
                        }
                        tpkt::Frame::FastPath(payload) => {
                            self.recorder.record(RecordedEvent {
                                side: RecordedSide::Server,
                                kind: RecordedKind::FastPathOutput,
                                timestamp: now(),
                                payload: Bytes::copy_from_slice(&payload),
                            });
                            tpkt::write_fast_path(client, &payload).await?;
                        }
                    }
                }
            }
        }
    }

    /// Records the connection-close marker exactly once. `self.closed`
    /// guards this so a second call (e.g. once from the relay's error exit
    /// and once from `run`'s own teardown) is a no-op, not a duplicate
    /// marker in the replay file.
    #[instrument("disconnect", skip(self))]
    pub fn disconnect(&self, reason: &'static str) {
        if !self.closed.close() {
            debug!(client = %self.peer_addr, reason, "session already torn down, ignoring");
            return;
        }

        debug!(client = %self.peer_addr, reason, "tearing down session");
        self.recorder.record(RecordedEvent {
            side: RecordedSide::Client,
            kind: RecordedKind::ConnectionClose,
            timestamp: now(),
            payload: Bytes::new(),
        });
    }
}

async fn read_slow_path<S: tokio::io::AsyncRead + Unpin>(stream: &mut S) -> SessionResult<Vec<u8>> {
    match tpkt::read_frame(stream).await? {
        tpkt::Frame::SlowPath(frame) => Ok(frame),
        tpkt::Frame::FastPath(_) => Err(SessionError::UnsupportedFraming { header: 0 }),
    }
}

fn decode_mcs_pdu<T>(frame: &[u8]) -> SessionResult<T>
where
    T: for<'de> ironrdp_core::Decode<'de>,
{
    ironrdp_core::decode(frame).map_err(|source| SessionError::Parse {
        layer: "mcs",
        pdu: std::any::type_name::<T>(),
        source,
    })
}

async fn expect_mcs<S>(stream: &mut S, matches: impl Fn(&mcs::McsMessage<'_>) -> bool) -> SessionResult<()>
where
    S: tokio::io::AsyncRead + Unpin,
{
    let frame = read_slow_path(stream).await?;
    let message = mcs_layer::decode(&frame)?;
    if matches(&message) {
        Ok(())
    } else {
        Err(SessionError::NegotiationFailure { result: 0xFD })
    }
}

async fn read_channel_join_request<S>(stream: &mut S) -> SessionResult<mcs::ChannelJoinRequest>
where
    S: tokio::io::AsyncRead + Unpin,
{
    let frame = read_slow_path(stream).await?;
    match mcs_layer::decode(&frame)? {
        mcs::McsMessage::ChannelJoinRequest(request) => Ok(request),
        _ => Err(SessionError::NegotiationFailure { result: 0xFD }),
    }
}

async fn write_mcs<S: tokio::io::AsyncWrite + Unpin>(stream: &mut S, message: &mcs::McsMessage<'_>) -> SessionResult<()> {
    let encoded = mcs_layer::encode(message)?;
    tpkt::write_slow_path(stream, &encoded).await
}

async fn forward_send_data(server: &mut ClientHalf, channel_id: u16, initiator_id: u16, payload: &[u8]) -> SessionResult<()> {
    let message = mcs::McsMessage::SendDataRequest(mcs::SendDataRequest {
        initiator_id,
        channel_id,
        user_data: std::borrow::Cow::Borrowed(payload),
    });
    let encoded = mcs_layer::encode(&message)?;
    server.send_raw_slow_path(&encoded).await
}

async fn write_send_data_indication<S: tokio::io::AsyncWrite + Unpin>(
    stream: &mut S,
    channel_id: u16,
    initiator_id: u16,
    payload: &[u8],
) -> SessionResult<()> {
    let message = mcs::McsMessage::SendDataIndication(mcs::SendDataIndication {
        initiator_id,
        channel_id,
        user_data: std::borrow::Cow::Borrowed(payload),
    });
    write_mcs(stream, &message).await
}

async fn read_security_exchange<S: tokio::io::AsyncRead + Unpin>(stream: &mut S, io_channel_id: u16) -> SessionResult<Vec<u8>> {
    let frame = read_slow_path(stream).await?;
    match mcs_layer::decode(&frame)? {
        mcs::McsMessage::SendDataRequest(request) if request.channel_id == io_channel_id => {
            Ok(request.user_data.into_owned())
        }
        _ => Err(SessionError::NegotiationFailure { result: 0xFC }),
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Outbound TLS never authenticates the real server's certificate: the
/// engine already knows which host it is dialing from configuration, and
/// validating that identity is outside the observed-traffic goal this
/// engine serves.
fn outbound_tls_connector() -> tokio_rustls::TlsConnector {
    let verifier = Arc::new(NoServerVerification);
    let config = rustls::ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();
    tokio_rustls::TlsConnector::from(Arc::new(config))
}

#[derive(Debug)]
struct NoServerVerification;

impl rustls::client::danger::ServerCertVerifier for NoServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls_pki_types::CertificateDer<'_>,
        _intermediates: &[rustls_pki_types::CertificateDer<'_>],
        _server_name: &rustls_pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls_pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls_pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls_pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ED25519,
        ]
    }
}

async fn build_recorder(conf: &Conf) -> anyhow::Result<FanoutRecorder> {
    let mut sinks: Vec<Box<dyn Recorder>> = Vec::new();

    let replay_path = replay_file_path(&conf.out_dir, now())?;
    sinks.push(Box::new(FileRecorder::create(&replay_path)?));

    if let Some(addr) = conf.record_addr {
        if let Some(live) = LiveRecorder::connect(addr).await {
            sinks.push(Box::new(live));
        }
    }

    Ok(FanoutRecorder::new(sinks))
}
