//! HTTP context mirror table (spec §3, §4.5): fixed array indexed 0..=2,
//! plus the single "current profile" register the parser consults when
//! arming raw-mode body framing (spec §4.2).

use heapless::String;

use crate::config::MAX_HTTP_PROFILES;
use crate::types::HttpProfileId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpCtxState {
    Idle,
    ExpectRing,
    GotRing,
}

#[derive(Debug, Clone)]
pub struct HttpEntry {
    pub connected: bool,
    pub state: HttpCtxState,
    pub http_status: u16,
    pub content_type: String<32>,
    pub content_length: usize,
}

impl HttpEntry {
    const fn idle() -> Self {
        Self {
            connected: false,
            state: HttpCtxState::Idle,
            http_status: 0,
            content_type: String::new(),
            content_length: 0,
        }
    }
}

pub struct HttpTable {
    entries: [HttpEntry; MAX_HTTP_PROFILES],
    /// Mirrors `self._http_current_profile` in the original: identifies
    /// which profile a `<<<` body belongs to. `None` until a command sets it
    /// (e.g. `AT+SQNHTTPRCV`).
    pub current_profile: Option<HttpProfileId>,
}

impl HttpTable {
    pub fn new() -> Self {
        Self {
            entries: core::array::from_fn(|_| HttpEntry::idle()),
            current_profile: None,
        }
    }

    pub fn get(&self, id: HttpProfileId) -> &HttpEntry {
        &self.entries[id.index()]
    }

    pub fn get_mut(&mut self, id: HttpProfileId) -> &mut HttpEntry {
        &mut self.entries[id.index()]
    }

    /// The entry the parser should consult when arming `<<<` raw-mode
    /// framing: `Some` only when `current_profile` points at a context that
    /// is actually `GotRing`.
    pub fn armed_raw_context(&self) -> Option<&HttpEntry> {
        let id = self.current_profile?;
        let entry = self.get(id);
        (entry.state == HttpCtxState::GotRing).then_some(entry)
    }

    pub fn reset(&mut self) {
        self.entries = core::array::from_fn(|_| HttpEntry::idle());
        self.current_profile = None;
    }
}

impl Default for HttpTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn armed_raw_context_requires_got_ring() {
        let mut table = HttpTable::new();
        let id = HttpProfileId::try_from(0).unwrap();
        table.current_profile = Some(id);
        assert!(table.armed_raw_context().is_none());

        table.get_mut(id).state = HttpCtxState::GotRing;
        table.get_mut(id).content_length = 5;
        let armed = table.armed_raw_context().unwrap();
        assert_eq!(armed.content_length, 5);
    }

    #[test]
    fn no_current_profile_means_not_armed() {
        let table = HttpTable::new();
        assert!(table.armed_raw_context().is_none());
    }
}
