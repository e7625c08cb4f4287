//! GNSS fix waiter table (spec §3, §4.5).
//!
//! Ground: `structs.py::ModemGnssFixWaiter` pairs an `asyncio.Event` with a
//! slot for the parsed fix; `core.py`'s `+LPGNSSFIXREADY` handler walks the
//! waiter list, fills in the fix, and signals every entry before clearing the
//! list. Signals replace the asyncio `Event`, and `heapless::Vec` replaces
//! the original's plain Python list.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use heapless::Vec;

use crate::config::MAX_GNSS_WAITERS;
use crate::response::GnssFix;

/// One outstanding `wait_for_gnss_fix` caller.
pub struct GnssFixWaiter {
    signal: Signal<CriticalSectionRawMutex, GnssFix>,
}

impl GnssFixWaiter {
    pub fn new() -> Self {
        Self {
            signal: Signal::new(),
        }
    }

    pub async fn wait(&self) -> GnssFix {
        self.signal.wait().await
    }
}

impl Default for GnssFixWaiter {
    fn default() -> Self {
        Self::new()
    }
}

pub struct GnssWaiterTable {
    waiters: Vec<GnssFixWaiter, MAX_GNSS_WAITERS>,
}

impl GnssWaiterTable {
    pub fn new() -> Self {
        Self { waiters: Vec::new() }
    }

    /// Register a new waiter for the next fix. Returns its index so the
    /// caller can later drop it by index if it gives up waiting, or `None`
    /// if the table is full (spec §7: resource exhaustion is reported
    /// immediately).
    pub fn register(&mut self) -> Option<usize> {
        self.waiters.push(GnssFixWaiter::new()).ok()?;
        Some(self.waiters.len() - 1)
    }

    pub fn get(&self, index: usize) -> &GnssFixWaiter {
        &self.waiters[index]
    }

    /// Fan the fix out to every registered waiter, then clear the table
    /// (ground: `core.py`'s `+LPGNSSFIXREADY` handler signals every waiter in
    /// `_gnss_fix_waiters` and then empties the list).
    pub fn deliver_and_clear(&mut self, fix: &GnssFix) {
        for waiter in self.waiters.iter() {
            waiter.signal.signal(fix.clone());
        }
        self.waiters.clear();
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    pub fn reset(&mut self) {
        self.waiters.clear();
    }
}

impl Default for GnssWaiterTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_exhausts_at_capacity() {
        let mut table = GnssWaiterTable::new();
        for _ in 0..MAX_GNSS_WAITERS {
            assert!(table.register().is_some());
        }
        assert!(table.register().is_none());
    }

    #[test]
    fn deliver_and_clear_empties_the_table() {
        let mut table = GnssWaiterTable::new();
        table.register().unwrap();
        table.register().unwrap();
        assert_eq!(table.len(), 2);
        let fix = GnssFix::default();
        table.deliver_and_clear(&fix);
        assert!(table.is_empty());
    }
}
