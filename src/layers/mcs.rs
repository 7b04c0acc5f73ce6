use ironrdp_pdu::mcs;

use crate::errors::{SessionError, SessionResult};

pub const USER_CHANNEL_ID: u16 = 1004;

pub fn decode(payload: &[u8]) -> SessionResult<mcs::McsMessage<'_>> {
    ironrdp_core::decode(payload).map_err(|source| SessionError::Parse {
        layer: "mcs",
        pdu: "McsMessage",
        source,
    })
}

pub fn encode(message: &mcs::McsMessage<'_>) -> SessionResult<Vec<u8>> {
    ironrdp_core::encode_vec(message).map_err(|source| SessionError::Encode {
        layer: "mcs",
        pdu: "McsMessage",
        source,
    })
}

/// Routes decoded MCS PDUs to the handlers the server-side negotiation FSM
/// cares about; anything else at this layer is a protocol error, matching
/// the source's `MCSServerRouter` contract.
pub enum RoutedEvent<'a> {
    ConnectInitial(mcs::ConnectInitial),
    DisconnectProviderUltimatum(mcs::DisconnectUltimatum),
    AttachUserRequest,
    ChannelJoinRequest { initiator: u16, channel_id: u16 },
    SendDataRequest { channel_id: u16, user_id: u16, data: &'a [u8] },
    SendDataIndication { channel_id: u16, user_id: u16, data: &'a [u8] },
}
