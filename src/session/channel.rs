//! Channel bookkeeping for the MCS relay, grounded on `server.py`'s
//! `buildChannel`/`onChannelJoinRequest`: only the I/O channel (delegated to
//! the real server) and the fixed user channel (confirmed locally) are ever
//! joined; every other requested channel is refused with `RT_USER_REJECTED`
//! and never reaches the real server.

use std::collections::HashMap;

use crate::layers::mcs::USER_CHANNEL_ID;

/// T.125 `Result` values used when confirming a `Channel-Join Request`.
pub const RT_SUCCESSFUL: u8 = 0;
pub const RT_USER_REJECTED: u8 = 1;

/// The single kind of channel this engine ever registers: the global I/O
/// channel, through which slow-path/fast-path RDP data is parsed, observed,
/// and relayed. Every other channel is refused at join time and never
/// tracked here.
#[derive(Debug, Clone, Copy)]
pub enum ChannelKind {
    Io,
}

#[derive(Default)]
pub struct ChannelTable {
    channels: HashMap<u16, ChannelKind>,
    io_channel_id: Option<u16>,
}

impl ChannelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `channel_id` is the server's global (I/O) channel, as
    /// learned from the GCC Server Network Data's `ioChannel` field.
    pub fn set_io_channel(&mut self, channel_id: u16) {
        self.io_channel_id = Some(channel_id);
        self.channels.insert(channel_id, ChannelKind::Io);
    }

    pub fn kind_of(&self, channel_id: u16) -> Option<ChannelKind> {
        self.channels.get(&channel_id).copied()
    }

    pub fn is_io_channel(&self, channel_id: u16) -> bool {
        self.io_channel_id == Some(channel_id)
    }

    /// The fixed user channel both halves of the relay attach as, separate
    /// from any data channel the client later joins.
    pub fn user_channel_id(&self) -> u16 {
        USER_CHANNEL_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_channel_has_no_kind() {
        let table = ChannelTable::new();
        assert!(table.kind_of(1003).is_none());
        assert!(!table.is_io_channel(1003));
    }

    #[test]
    fn io_channel_is_recorded_and_recognized() {
        let mut table = ChannelTable::new();
        table.set_io_channel(1003);

        assert!(matches!(table.kind_of(1003), Some(ChannelKind::Io)));
        assert!(table.is_io_channel(1003));
        assert!(!table.is_io_channel(1005));
    }

    #[test]
    fn user_channel_id_matches_the_mcs_constant() {
        let table = ChannelTable::new();
        assert_eq!(table.user_channel_id(), USER_CHANNEL_ID);
    }
}
