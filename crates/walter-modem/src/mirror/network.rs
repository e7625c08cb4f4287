//! Network/operational state mirror (spec §3, §4.5).
//!
//! Ground: `core.py` tracks `_op_state` and `_reg_state` as plain instance
//! attributes updated from `+CFUN`/`+CEREG` handlers; here they are grouped
//! into one small struct rather than scattered fields, reusing the
//! `OpState`/`RegState` enums already defined for the response payload so the
//! mirror and the reported response always speak the same vocabulary.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use core::cell::RefCell;

use crate::response::{OpState, RegState, SimState};

#[derive(Debug, Clone, Copy)]
pub struct NetworkState {
    pub op_state: OpState,
    pub reg_state: RegState,
    pub sim_state: SimState,
}

impl NetworkState {
    pub fn new() -> Self {
        Self {
            op_state: OpState::Minimum,
            reg_state: RegState::NotSearching,
            sim_state: SimState::Ready,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for NetworkState {
    fn default() -> Self {
        Self::new()
    }
}

/// Cross-task read-only view of [`NetworkState`] (spec §4.5: "User tasks
/// read mirror state through synchronous accessors ... which return a value
/// snapshot"). The dispatcher task is the sole writer; any task holding a
/// reference can call [`get`](Self::get) to read the last value the
/// dispatcher published, without touching the `Mirror` the dispatcher owns.
pub struct NetworkStateView {
    inner: Mutex<CriticalSectionRawMutex, RefCell<NetworkState>>,
}

impl NetworkStateView {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(NetworkState {
                op_state: OpState::Minimum,
                reg_state: RegState::NotSearching,
                sim_state: SimState::Ready,
            })),
        }
    }

    pub fn set(&self, state: NetworkState) {
        self.inner.lock(|cell| *cell.borrow_mut() = state);
    }

    pub fn get(&self) -> NetworkState {
        self.inner.lock(|cell| *cell.borrow())
    }
}

impl Default for NetworkStateView {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_restores_defaults() {
        let mut net = NetworkState::new();
        net.op_state = OpState::Full;
        net.reg_state = RegState::Home;
        net.reset();
        assert_eq!(net.op_state, OpState::Minimum);
        assert_eq!(net.reg_state, RegState::NotSearching);
    }

    #[test]
    fn view_publishes_the_last_set_snapshot() {
        let view = NetworkStateView::new();
        assert_eq!(view.get().reg_state, RegState::NotSearching);

        let mut state = NetworkState::new();
        state.reg_state = RegState::Roaming;
        view.set(state);
        assert_eq!(view.get().reg_state, RegState::Roaming);
    }
}
