//! CoAP context mirror table (spec §3, §4.5): fixed array indexed 0..=2.

use heapless::Deque;

use crate::config::MAX_COAP_CONTEXTS;
use crate::types::CoapContextId;

const RING_QUEUE_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoapCloseCause {
    None,
    LocalClose,
    RemoteClose,
    Reset,
}

#[derive(Debug, Clone, Copy)]
pub struct CoapRing {
    pub message_id: u16,
    pub length: usize,
}

#[derive(Debug, Clone)]
pub struct CoapEntry {
    pub configured: bool,
    pub connected: bool,
    pub close_cause: CoapCloseCause,
    pub rings: Deque<CoapRing, RING_QUEUE_CAPACITY>,
}

impl CoapEntry {
    fn idle() -> Self {
        Self {
            configured: false,
            connected: false,
            close_cause: CoapCloseCause::None,
            rings: Deque::new(),
        }
    }
}

pub struct CoapTable {
    entries: [CoapEntry; MAX_COAP_CONTEXTS],
}

impl CoapTable {
    pub fn new() -> Self {
        Self {
            entries: core::array::from_fn(|_| CoapEntry::idle()),
        }
    }

    pub fn get(&self, id: CoapContextId) -> &CoapEntry {
        &self.entries[id.index()]
    }

    pub fn get_mut(&mut self, id: CoapContextId) -> &mut CoapEntry {
        &mut self.entries[id.index()]
    }

    pub fn reset(&mut self) {
        self.entries = core::array::from_fn(|_| CoapEntry::idle());
    }
}

impl Default for CoapTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_queue_accepts_up_to_capacity() {
        let mut table = CoapTable::new();
        let id = CoapContextId::try_from(0).unwrap();
        for i in 0..RING_QUEUE_CAPACITY {
            table
                .get_mut(id)
                .rings
                .push_back(CoapRing {
                    message_id: i as u16,
                    length: 4,
                })
                .unwrap();
        }
        assert_eq!(table.get(id).rings.len(), RING_QUEUE_CAPACITY);
    }
}
