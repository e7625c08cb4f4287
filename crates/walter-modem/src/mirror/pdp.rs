//! PDP context mirror table (spec §3, §4.5): fixed array indexed 1..=8.

use heapless::String;

use crate::config::MAX_PDP_CONTEXTS;
use crate::types::PdpContextId;

const APN_LEN: usize = 64;
const CRED_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdpState {
    Free,
    Reserved,
    Inactive,
    Active,
    Attached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdpType {
    Ip,
    Ipv6,
    Ipv4v6,
    NonIp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdpAuthProtocol {
    None,
    Pap,
    Chap,
}

#[derive(Debug, Clone)]
pub struct PdpEntry {
    pub state: PdpState,
    pub apn: String<APN_LEN>,
    pub pdp_type: PdpType,
    pub header_compression: bool,
    pub data_compression: bool,
    pub auth_protocol: PdpAuthProtocol,
    pub auth_user: String<CRED_LEN>,
    pub auth_pass: String<CRED_LEN>,
}

impl PdpEntry {
    const fn free() -> Self {
        Self {
            state: PdpState::Free,
            apn: String::new(),
            pdp_type: PdpType::Ip,
            header_compression: false,
            data_compression: false,
            auth_protocol: PdpAuthProtocol::None,
            auth_user: String::new(),
            auth_pass: String::new(),
        }
    }
}

pub struct PdpTable {
    entries: [PdpEntry; MAX_PDP_CONTEXTS],
}

impl PdpTable {
    pub fn new() -> Self {
        Self {
            entries: core::array::from_fn(|_| PdpEntry::free()),
        }
    }

    pub fn get(&self, id: PdpContextId) -> &PdpEntry {
        &self.entries[id.index()]
    }

    pub fn get_mut(&mut self, id: PdpContextId) -> &mut PdpEntry {
        &mut self.entries[id.index()]
    }

    /// Scan for a `Free` entry and mark it `Reserved`, returning its id.
    pub fn lease_free(&mut self) -> Option<PdpContextId> {
        let index = self
            .entries
            .iter()
            .position(|e| e.state == PdpState::Free)?;
        self.entries[index].state = PdpState::Reserved;
        PdpContextId::try_from((index + 1) as u8).ok()
    }

    pub fn reset(&mut self) {
        self.entries = core::array::from_fn(|_| PdpEntry::free());
    }
}

impl Default for PdpTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_free_marks_reserved_and_skips_taken_entries() {
        let mut table = PdpTable::new();
        let first = table.lease_free().unwrap();
        assert_eq!(first.value(), 1);
        assert_eq!(table.get(first).state, PdpState::Reserved);

        let second = table.lease_free().unwrap();
        assert_eq!(second.value(), 2);
    }

    #[test]
    fn reset_clears_all_entries_to_free() {
        let mut table = PdpTable::new();
        table.lease_free().unwrap();
        table.reset();
        for i in 1..=MAX_PDP_CONTEXTS as u8 {
            let id = PdpContextId::try_from(i).unwrap();
            assert_eq!(table.get(id).state, PdpState::Free);
        }
    }
}
