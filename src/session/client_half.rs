//! The outbound half of the relay: a real RDP client the engine drives
//! against the real server, replaying the negotiation the real client
//! just performed against us. Grounded on `server.py`'s `MITMClient`/
//! `buildProtocol`/`connectClient` — the source's analogue is a second
//! Twisted protocol instance; ours is a second `TcpLayer` plus the same
//! layer helpers used for the client-facing half.
//!
//! The transport concrete type is a plain owned `TcpLayer`, the same type
//! the client-facing half uses, so the relay loop in `session::mod` can
//! treat both halves uniformly.

use ironrdp_pdu::{gcc, mcs, nego};
use tokio::net::TcpStream;

use crate::errors::{SessionError, SessionResult};
use crate::layers::tcp::OutboundTransport;
use crate::layers::{mcs as mcs_layer, tpkt, x224};

/// A real RDP connection opened to the target server on the client's
/// behalf. Every method here mirrors one step of the client-facing
/// negotiation; `session::mod` drives both halves in lockstep.
pub struct ClientHalf {
    transport: OutboundTransport,
}

impl ClientHalf {
    pub async fn connect(target_host: &str, target_port: u16) -> SessionResult<Self> {
        let stream = TcpStream::connect((target_host, target_port))
            .await
            .map_err(SessionError::OutboundConnectFailure)?;
        stream.set_nodelay(true)?;

        Ok(Self {
            transport: OutboundTransport::plain(stream),
        })
    }

    pub async fn start_tls(
        self,
        connector: &tokio_rustls::TlsConnector,
        server_name: rustls_pki_types::ServerName<'static>,
    ) -> SessionResult<Self> {
        let OutboundTransport::Plain(stream) = self.transport else {
            panic!("start_tls called twice on the client half");
        };
        let tls_stream = connector.connect(server_name, stream).await.map_err(SessionError::Io)?;
        Ok(Self {
            transport: OutboundTransport::Tls(Box::new(tls_stream)),
        })
    }

    pub async fn send_connection_request(&mut self, protocol: nego::SecurityProtocol) -> SessionResult<()> {
        let request = nego::ConnectionRequest {
            nego_data: None,
            flags: nego::RequestFlags::empty(),
            protocol,
        };
        let encoded = x224::encode_request(&request)?;
        tpkt::write_tpkt_record(&mut self.transport, &encoded).await
    }

    pub async fn recv_connection_confirm(&mut self) -> SessionResult<nego::ConnectionConfirm> {
        let record = tpkt::read_tpkt_record(&mut self.transport).await?;
        x224::decode_confirm(&record)
    }

    pub async fn send_connect_initial(&mut self, gcc_blocks: gcc::ClientGccBlocks) -> SessionResult<()> {
        let connect_initial = mcs::ConnectInitial::with_gcc_blocks(gcc_blocks);
        tpkt::write_slow_path(&mut self.transport, &ironrdp_core::encode_vec(&connect_initial).map_err(|source| {
            SessionError::Encode {
                layer: "mcs",
                pdu: "ConnectInitial",
                source,
            }
        })?)
        .await
    }

    pub async fn recv_connect_response(&mut self) -> SessionResult<mcs::ConnectResponse> {
        let frame = read_slow_path_body(&mut self.transport).await?;
        ironrdp_core::decode(&frame).map_err(|source| SessionError::Parse {
            layer: "mcs",
            pdu: "ConnectResponse",
            source,
        })
    }

    /// Sent only after `recv_connect_response` succeeds: T.125 requires
    /// Erect-Domain-Request to follow Connect-Response, never precede it.
    pub async fn send_erect_domain_request(&mut self) -> SessionResult<()> {
        let message = mcs::McsMessage::ErectDomainRequest(mcs::ErectDomainPdu {
            sub_height: 0,
            sub_interval: 0,
        });
        tpkt::write_slow_path(&mut self.transport, &mcs_layer::encode(&message)?).await
    }

    pub async fn send_attach_user_request(&mut self) -> SessionResult<()> {
        let encoded = mcs_layer::encode(&mcs::McsMessage::AttachUserRequest(mcs::AttachUserRequest))?;
        tpkt::write_slow_path(&mut self.transport, &encoded).await
    }

    pub async fn recv_attach_user_confirm(&mut self) -> SessionResult<mcs::AttachUserConfirm> {
        let frame = read_slow_path_body(&mut self.transport).await?;
        match mcs_layer::decode(&frame)? {
            mcs::McsMessage::AttachUserConfirm(confirm) => Ok(confirm),
            _ => Err(SessionError::NegotiationFailure { result: 0xFF }),
        }
    }

    pub async fn send_channel_join_request(&mut self, initiator_id: u16, channel_id: u16) -> SessionResult<()> {
        let encoded = mcs_layer::encode(&mcs::McsMessage::ChannelJoinRequest(mcs::ChannelJoinRequest {
            initiator_id,
            channel_id,
        }))?;
        tpkt::write_slow_path(&mut self.transport, &encoded).await
    }

    pub async fn recv_channel_join_confirm(&mut self) -> SessionResult<mcs::ChannelJoinConfirm> {
        let frame = read_slow_path_body(&mut self.transport).await?;
        match mcs_layer::decode(&frame)? {
            mcs::McsMessage::ChannelJoinConfirm(confirm) => Ok(confirm),
            _ => Err(SessionError::NegotiationFailure { result: 0xFF }),
        }
    }

    pub async fn send_raw_slow_path(&mut self, payload: &[u8]) -> SessionResult<()> {
        tpkt::write_slow_path(&mut self.transport, payload).await
    }

    /// Sends the MITM's own RSA-encrypted client random to the real server
    /// so it can derive the same RC4 session keys the client-facing half
    /// uses, completing Standard Security on the outbound half.
    pub async fn send_security_exchange(&mut self, channel_id: u16, initiator_id: u16, encrypted_client_random: &[u8]) -> SessionResult<()> {
        let message = mcs::McsMessage::SendDataRequest(mcs::SendDataRequest {
            initiator_id,
            channel_id,
            user_data: std::borrow::Cow::Borrowed(encrypted_client_random),
        });
        let encoded = mcs_layer::encode(&message)?;
        self.send_raw_slow_path(&encoded).await
    }

    pub async fn read_frame(&mut self) -> SessionResult<tpkt::Frame> {
        tpkt::read_frame(&mut self.transport).await
    }

    pub fn is_tls(&self) -> bool {
        self.transport.is_tls()
    }

    pub fn transport_mut(&mut self) -> &mut OutboundTransport {
        &mut self.transport
    }
}

async fn read_slow_path_body(transport: &mut OutboundTransport) -> SessionResult<Vec<u8>> {
    match tpkt::read_frame(transport).await? {
        tpkt::Frame::SlowPath(frame) => Ok(frame),
        tpkt::Frame::FastPath(_) => Err(SessionError::NegotiationFailure { result: 0xFE }),
    }
}
