//! Command descriptor and single-outstanding-command state machine.
//!
//! Ground: the teacher splits an immutable wire descriptor (`SdoCommand`)
//! from mutable connection progress tracked in `SdoClientConnection`
//! (`sdo/client_manager.rs`); the same split is made here between `Command`
//! (immutable once enqueued) and `CmdProgress` (mutated in place by the
//! dispatcher). Field semantics are ported from `structs.py::ModemCmd`.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Instant;
use heapless::Vec;

use crate::config::CMD_BUFFER_CAPACITY;
use crate::error::ModemResult;
use crate::response::ModemResponse;

/// How a command's bytes are transmitted and what it waits for.
///
/// Ground: `ModemCmdType` (`TX`, `TX_WAIT`, `WAIT`, `DATA_TX_WAIT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Transmit and complete immediately as `Ok` (no response awaited).
    SendOnly,
    /// Transmit, then wait for a response matching the expected prefix.
    SendAndWait,
    /// Transmit nothing; wait for the expected prefix (e.g. `+SYSSTART`
    /// after a hardware reset).
    WaitOnly,
    /// Transmit the command, wait for a prompt frame, write the payload,
    /// then wait for the expected terminal prefix.
    SendWithFollowUpData,
}

/// Progress state of the current command (spec data model §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdState {
    New,
    Pending,
    RetryAfterError,
    Complete,
}

/// Up to two alternative prefixes a response may arrive under before a
/// command is considered answered (spec §3: "a set of prefixes").
#[derive(Debug, Clone, Copy)]
pub struct ExpectedPrefixes {
    pub primary: &'static [u8],
    pub secondary: Option<&'static [u8]>,
}

impl ExpectedPrefixes {
    pub const fn single(prefix: &'static [u8]) -> Self {
        Self {
            primary: prefix,
            secondary: None,
        }
    }

    pub fn matches(&self, frame: &[u8]) -> bool {
        frame.starts_with(self.primary)
            || self.secondary.is_some_and(|p| frame.starts_with(p))
    }
}

/// One user-submitted command, immutable descriptor plus mutable progress.
///
/// Completion is not carried as a borrowed reference on the command itself
/// (that would infect every queue and channel type with a lifetime tied to
/// the shortest-lived in-flight command). Instead `run_cmd` leases a slot
/// from the static [`CompletionSlots`] pool, the same "scan for Free, mark
/// Reserved" leasing idiom used for the PDP/socket/HTTP/CoAP mirror tables
/// (spec §4.5), and the command only carries that slot's index.
pub struct Command {
    pub at_cmd: Vec<u8, CMD_BUFFER_CAPACITY>,
    pub kind: CommandKind,
    pub expected: ExpectedPrefixes,
    pub payload: Option<Vec<u8, CMD_BUFFER_CAPACITY>>,
    pub max_attempts: u8,
    pub completion_slot: usize,

    pub state: CmdState,
    pub attempt: u8,
    pub attempt_start: Instant,
    /// Set while a `SendWithFollowUpData` command has transmitted its AT
    /// line and is waiting for the modem's prompt frame before the payload
    /// can be written (spec §4.3, `Send-with-follow-up-data`).
    pub awaiting_prompt: bool,
}

impl Command {
    pub fn new(
        at_cmd: Vec<u8, CMD_BUFFER_CAPACITY>,
        kind: CommandKind,
        expected: ExpectedPrefixes,
        max_attempts: u8,
        completion_slot: usize,
    ) -> Self {
        Self {
            at_cmd,
            kind,
            expected,
            payload: None,
            max_attempts,
            completion_slot,
            state: CmdState::New,
            attempt: 0,
            attempt_start: Instant::MIN,
            awaiting_prompt: false,
        }
    }

    pub fn with_payload(mut self, payload: Vec<u8, CMD_BUFFER_CAPACITY>) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// One-shot notifier a caller awaits to learn a command's final outcome.
///
/// Ground: `structs.py::ModemCmd.event` (an `asyncio.Event`) paired with
/// `cmd.rsp`; here the payload travels with the signal itself since there is
/// no shared mutable response object guarded by a lock.
pub type CompletionSignal = Signal<CriticalSectionRawMutex, (ModemResult, ModemResponse)>;

/// Static pool of completion signals `run_cmd` callers lease by index.
///
/// The "taken" bitmap is guarded by the same `CriticalSectionRawMutex` the
/// signals themselves use, so the pool is `Sync` and can live in a single
/// `static` shared by every task without `unsafe`.
pub struct CompletionSlots<const N: usize> {
    signals: [CompletionSignal; N],
    taken: embassy_sync::blocking_mutex::Mutex<CriticalSectionRawMutex, core::cell::RefCell<[bool; N]>>,
}

impl<const N: usize> CompletionSlots<N> {
    pub const fn new() -> Self {
        Self {
            signals: [const { Signal::new() }; N],
            taken: embassy_sync::blocking_mutex::Mutex::new(core::cell::RefCell::new([false; N])),
        }
    }

    /// Lease the first free slot, marking it taken. Returns `None` if every
    /// slot is currently in use (spec §7: resource exhaustion errors are
    /// returned immediately, without retry).
    pub fn lease(&self) -> Option<usize> {
        self.taken.lock(|cell| {
            let mut taken = cell.borrow_mut();
            let index = taken.iter().position(|t| !t)?;
            taken[index] = true;
            Some(index)
        })
    }

    pub fn release(&self, index: usize) {
        self.taken.lock(|cell| cell.borrow_mut()[index] = false);
        self.signals[index].reset();
    }

    pub fn signal(&self, index: usize, result: ModemResult, response: ModemResponse) {
        self.signals[index].signal((result, response));
    }

    pub async fn wait(&self, index: usize) -> (ModemResult, ModemResponse) {
        self.signals[index].wait().await
    }
}

impl<const N: usize> Default for CompletionSlots<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_prefixes_matches_either_alternative() {
        let prefixes = ExpectedPrefixes {
            primary: b"OK",
            secondary: Some(b"+CME ERROR"),
        };
        assert!(prefixes.matches(b"OK"));
        assert!(prefixes.matches(b"+CME ERROR: 16"));
        assert!(!prefixes.matches(b"+CEREG: 5"));
    }

    #[test]
    fn single_prefix_helper_has_no_secondary() {
        let prefixes = ExpectedPrefixes::single(b"OK");
        assert!(prefixes.matches(b"OK"));
        assert!(!prefixes.matches(b"ERROR"));
    }

    #[test]
    fn completion_slots_exhaust_and_recover() {
        let slots: CompletionSlots<2> = CompletionSlots::new();
        let a = slots.lease().unwrap();
        let b = slots.lease().unwrap();
        assert!(slots.lease().is_none());

        slots.release(a);
        let c = slots.lease().unwrap();
        assert_eq!(a, c);

        slots.release(b);
        slots.release(c);
    }
}
