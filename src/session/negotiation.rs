//! The server-side connection-sequence state machine.
//!
//! One-shot transitions, same shape as `server.py`'s `onConnectionRequest` /
//! `onConnectionConfirm` / `onConnectInitial` / `onConnectResponse` /
//! `onAttachUserRequest` / `onChannelJoinRequest` chain, but made explicit as
//! a state enum rather than a sequence of independent event handlers, so a
//! PDU arriving out of order is a state-mismatch error instead of silently
//! mutating the wrong field.

use ironrdp_pdu::nego;

use crate::errors::{SessionError, SessionResult};

/// Negotiation progress, advanced by exactly one step per successful PDU
/// exchange. Each transition is a one-way door: there is no path back to an
/// earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    X224RequestReceived,
    OutboundConnecting,
    X224Confirmed,
    McsConnectInitialForwarded,
    AwaitingServerData,
    ServerDataRewritten,
    UserAttached,
    ChannelsJoined,
    SecurityExchanged,
    ClientInfoForwarded,
    Licensed,
    Steady,
}

impl NegotiationState {
    /// Advances to `next`, rejecting any transition that skips or repeats a
    /// step; every path through the connection sequence is linear.
    pub fn advance(&mut self, next: NegotiationState) -> SessionResult<()> {
        let allowed = matches!(
            (*self, next),
            (Self::Idle, Self::X224RequestReceived)
                | (Self::X224RequestReceived, Self::OutboundConnecting)
                | (Self::OutboundConnecting, Self::X224Confirmed)
                | (Self::X224Confirmed, Self::McsConnectInitialForwarded)
                | (Self::McsConnectInitialForwarded, Self::AwaitingServerData)
                | (Self::AwaitingServerData, Self::ServerDataRewritten)
                | (Self::ServerDataRewritten, Self::UserAttached)
                | (Self::UserAttached, Self::ChannelsJoined)
                | (Self::ChannelsJoined, Self::SecurityExchanged)
                | (Self::SecurityExchanged, Self::ClientInfoForwarded)
                | (Self::ClientInfoForwarded, Self::Licensed)
                | (Self::Licensed, Self::Steady)
        );

        if allowed {
            *self = next;
            Ok(())
        } else {
            Err(SessionError::NegotiationFailure { result: *self as u8 })
        }
    }
}

/// Everything captured about the negotiation so the relay logic can refer
/// back to the client's original offer without re-reading the wire.
pub struct Negotiation {
    pub state: NegotiationState,
    /// The exact `SecurityProtocol` bits the client originally requested,
    /// restored on the response forwarded to the real server's Connect
    /// Initial path (`server.py`'s `clientRequestedProtocols`), even though
    /// the MITM only ever advertises SSL to the client itself.
    pub client_requested_protocol: nego::SecurityProtocol,
    /// What the real server agreed to in its X.224 confirm.
    pub server_confirmed_protocol: Option<nego::SecurityProtocol>,
    pub tls_in_use: bool,
}

impl Negotiation {
    pub fn new(client_requested_protocol: nego::SecurityProtocol) -> Self {
        Self {
            state: NegotiationState::Idle,
            client_requested_protocol,
            server_confirmed_protocol: None,
            tls_in_use: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_sequence_advances_linearly() {
        let mut state = NegotiationState::Idle;
        let sequence = [
            NegotiationState::X224RequestReceived,
            NegotiationState::OutboundConnecting,
            NegotiationState::X224Confirmed,
            NegotiationState::McsConnectInitialForwarded,
            NegotiationState::AwaitingServerData,
            NegotiationState::ServerDataRewritten,
            NegotiationState::UserAttached,
            NegotiationState::ChannelsJoined,
            NegotiationState::SecurityExchanged,
            NegotiationState::ClientInfoForwarded,
            NegotiationState::Licensed,
            NegotiationState::Steady,
        ];

        for next in sequence {
            state.advance(next).expect("every step in the documented sequence is legal");
            assert_eq!(state, next);
        }
    }

    #[test]
    fn skipping_a_step_is_rejected() {
        let mut state = NegotiationState::Idle;
        let err = state
            .advance(NegotiationState::OutboundConnecting)
            .expect_err("Idle cannot jump straight to OutboundConnecting");
        assert!(matches!(err, SessionError::NegotiationFailure { .. }));
        // the rejected transition must not have mutated state
        assert_eq!(state, NegotiationState::Idle);
    }

    #[test]
    fn repeating_a_step_is_rejected() {
        let mut state = NegotiationState::Idle;
        state.advance(NegotiationState::X224RequestReceived).unwrap();
        let err = state.advance(NegotiationState::X224RequestReceived).unwrap_err();
        assert!(matches!(err, SessionError::NegotiationFailure { .. }));
    }

    #[test]
    fn there_is_no_path_back_to_an_earlier_state() {
        let mut state = NegotiationState::Steady;
        assert!(state.advance(NegotiationState::Idle).is_err());
        assert_eq!(state, NegotiationState::Steady);
    }

    #[test]
    fn new_negotiation_starts_idle_with_no_server_protocol_yet() {
        let negotiation = Negotiation::new(nego::SecurityProtocol::SSL);
        assert_eq!(negotiation.state, NegotiationState::Idle);
        assert_eq!(negotiation.client_requested_protocol, nego::SecurityProtocol::SSL);
        assert!(negotiation.server_confirmed_protocol.is_none());
        assert!(!negotiation.tls_in_use);
    }
}
