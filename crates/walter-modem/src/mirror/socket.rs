//! Socket mirror table (spec §3, §4.5): fixed array indexed 1..=6.

use heapless::String;

use crate::config::MAX_SOCKETS;
use crate::types::SocketId;

const HOST_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Free,
    Reserved,
    Created,
    Configured,
    Opened,
    Listening,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketProto {
    Tcp,
    Udp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptAnyRemote {
    Disabled,
    RemoteRxOnly,
    RemoteRxAndTx,
}

#[derive(Debug, Clone)]
pub struct SocketEntry {
    pub state: SocketState,
    pub pdp_context_id: u8,
    pub mtu: u16,
    pub exchange_timeout_s: u16,
    pub conn_timeout_s: u16,
    pub send_delay_ms: u16,
    pub protocol: SocketProto,
    pub accept_any_remote: AcceptAnyRemote,
    pub remote_host: String<HOST_LEN>,
    pub remote_port: u16,
    pub local_port: u16,
}

impl SocketEntry {
    const fn free() -> Self {
        Self {
            state: SocketState::Free,
            pdp_context_id: 1,
            mtu: 300,
            exchange_timeout_s: 90,
            conn_timeout_s: 60,
            send_delay_ms: 5000,
            protocol: SocketProto::Udp,
            accept_any_remote: AcceptAnyRemote::Disabled,
            remote_host: String::new(),
            remote_port: 0,
            local_port: 0,
        }
    }
}

pub struct SocketTable {
    entries: [SocketEntry; MAX_SOCKETS],
}

impl SocketTable {
    pub fn new() -> Self {
        Self {
            entries: core::array::from_fn(|_| SocketEntry::free()),
        }
    }

    pub fn get(&self, id: SocketId) -> &SocketEntry {
        &self.entries[id.index()]
    }

    pub fn get_mut(&mut self, id: SocketId) -> &mut SocketEntry {
        &mut self.entries[id.index()]
    }

    pub fn lease_free(&mut self) -> Option<SocketId> {
        let index = self
            .entries
            .iter()
            .position(|e| e.state == SocketState::Free)?;
        self.entries[index].state = SocketState::Reserved;
        SocketId::try_from((index + 1) as u8).ok()
    }

    /// Release a socket back to `Free` (spec P4: `+SQNSH: <id>` URC).
    pub fn free(&mut self, id: SocketId) {
        self.entries[id.index()] = SocketEntry::free();
    }

    pub fn reset(&mut self) {
        self.entries = core::array::from_fn(|_| SocketEntry::free());
    }
}

impl Default for SocketTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freeing_a_socket_resets_its_entry() {
        let mut table = SocketTable::new();
        let id = table.lease_free().unwrap();
        table.get_mut(id).remote_port = 1234;
        table.free(id);
        assert_eq!(table.get(id).state, SocketState::Free);
        assert_eq!(table.get(id).remote_port, 0);
    }

    #[test]
    fn lease_free_exhausts_after_max_sockets() {
        let mut table = SocketTable::new();
        for _ in 0..MAX_SOCKETS {
            assert!(table.lease_free().is_some());
        }
        assert!(table.lease_free().is_none());
    }
}
