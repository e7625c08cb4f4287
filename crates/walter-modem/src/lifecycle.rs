//! Collaborator-facing command submission and lifecycle operations (spec
//! §6): `run_cmd`, `begin`, `reset`, `soft_reset`, `check_comm`, `sleep`.
//!
//! Ground: `run_cmd` ports `core.py::_run_cmd`'s enqueue-then-await-event
//! shape onto [`CompletionSlots`] instead of a per-call heap allocation;
//! `begin`/`reset`/`soft_reset`/`check_comm` port
//! `mixins/common.py::ModemCommon` almost line for line (reset-pin pulse
//! widths, the `+SYSSTART` wait-only command, the baseline `AT+CMEE=1` /
//! `AT+CEREG=1` configuration pair); `sleep` ports
//! `mixins/sleep.py::ModemSleep.sleep`'s retained-memory preparation step.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_time::{Duration, Timer};
use heapless::Vec;

use crate::command::{Command, CommandKind, CompletionSlots, ExpectedPrefixes};
use crate::config::{CMD_BUFFER_CAPACITY, DEFAULT_CMD_ATTEMPTS, RESET_PULSE, SOFT_RESET_PULSE};
use crate::error::WalterError;
use crate::hal::{ResetPin, RetainedMemory};
use crate::log::my_warn;
use crate::queue::{TaskQueue, TaskQueueItem};
use crate::response::ModemResponse;
use crate::sleep::{decode_retained, encode_retained, RetainedSubscription};

/// Everything a user task needs to submit commands onto the wire and await
/// their completion (spec §6 collaborator-facing interface point (a)).
/// Cheap to copy (two references); every task that wants to submit commands
/// holds one.
#[derive(Clone, Copy)]
pub struct CommandHandle<'a, const SLOTS: usize> {
    tasks: &'a TaskQueue,
    slots: &'a CompletionSlots<SLOTS>,
}

impl<'a, const SLOTS: usize> CommandHandle<'a, SLOTS> {
    pub const fn new(tasks: &'a TaskQueue, slots: &'a CompletionSlots<SLOTS>) -> Self {
        Self { tasks, slots }
    }

    /// `run_cmd(response_slot, at_command, expected_response, kind,
    /// payload?, ...) -> bool` (spec §6 (a)). The response slot is the
    /// return value itself rather than an out-parameter, since Rust can
    /// return owned values without the caller pre-allocating storage; the
    /// returned `bool` is `is_success()` on the returned [`ModemResponse`],
    /// matching the original's "`Ok`, or `NoData` carrying an HTTP
    /// response" success rule.
    pub async fn run_cmd(
        &self,
        at_cmd: &[u8],
        expected: ExpectedPrefixes,
        kind: CommandKind,
        payload: Option<&[u8]>,
        max_attempts: u8,
    ) -> Result<(bool, ModemResponse), WalterError> {
        let slot = self.slots.lease().ok_or(WalterError::NoFreeResource)?;

        let mut at_cmd_buf: Vec<u8, CMD_BUFFER_CAPACITY> = Vec::new();
        if at_cmd_buf.extend_from_slice(at_cmd).is_err() {
            self.slots.release(slot);
            return Err(WalterError::BufferFull);
        }

        let mut command = Command::new(at_cmd_buf, kind, expected, max_attempts, slot);
        if let Some(payload) = payload {
            let mut payload_buf: Vec<u8, CMD_BUFFER_CAPACITY> = Vec::new();
            if payload_buf.extend_from_slice(payload).is_err() {
                self.slots.release(slot);
                return Err(WalterError::BufferFull);
            }
            command = command.with_payload(payload_buf);
        }

        self.tasks.send(TaskQueueItem::NewCommand(command)).await;

        let (result, mut response) = self.slots.wait(slot).await;
        self.slots.release(slot);
        response.result = result;
        Ok((response.is_success(), response))
    }

    /// Convenience wrapper for the common case of a single expected prefix
    /// and the driver-wide default attempt count.
    pub async fn run(
        &self,
        at_cmd: &[u8],
        expected_prefix: &'static [u8],
    ) -> Result<(bool, ModemResponse), WalterError> {
        self.run_cmd(
            at_cmd,
            ExpectedPrefixes::single(expected_prefix),
            CommandKind::SendAndWait,
            None,
            DEFAULT_CMD_ATTEMPTS,
        )
        .await
    }
}

/// Tracks whether [`begin`] has already completed once, so a second call is
/// a no-op (spec L1, ground: `self._begun` in `core.py`/`common.py`).
static BEGUN: AtomicBool = AtomicBool::new(false);

/// Pulse the reset pin low for `width`, then release it high and hold
/// (spec §4.1/§6, common to both [`begin`]'s hardware reset and [`reset`]).
async fn pulse_reset_pin(reset_pin: &mut impl ResetPin, width: Duration) {
    reset_pin.set_low();
    Timer::after(width).await;
    reset_pin.set_high();
}

/// Zero every mirror table (spec §4.6, L2: "reset followed by reading any
/// mirror table yields the zero-initialised table"). Routed through the
/// dispatcher via [`TaskQueueItem::ResetMirror`] since mirror state is only
/// ever touched from inside the dispatcher task (spec §4.5).
async fn reset_mirror<const SLOTS: usize>(handle: &CommandHandle<'_, SLOTS>) -> Result<(), WalterError> {
    let slot = handle.slots.lease().ok_or(WalterError::NoFreeResource)?;
    handle.tasks.send(TaskQueueItem::ResetMirror(slot)).await;
    handle.slots.wait(slot).await;
    handle.slots.release(slot);
    Ok(())
}

/// Await the modem's boot URC after a reset pulse (spec §4.1, §4.6).
async fn await_sysstart<const SLOTS: usize>(handle: &CommandHandle<'_, SLOTS>) -> Result<(), WalterError> {
    let (ok, _) = handle
        .run_cmd(
            b"",
            ExpectedPrefixes::single(b"+SYSSTART"),
            CommandKind::WaitOnly,
            None,
            1,
        )
        .await?;
    if ok {
        Ok(())
    } else {
        Err(WalterError::NotReady)
    }
}

/// Hardware-reset the modem and wait for it to come back up (spec §4.6,
/// ground: `ModemCommon.reset`). Unlike [`begin`], this does not reapply
/// the baseline configuration commands; callers that need the driver fully
/// reconfigured after a reset should call [`begin`] instead.
pub async fn reset<const SLOTS: usize>(
    handle: &CommandHandle<'_, SLOTS>,
    reset_pin: &mut impl ResetPin,
) -> Result<(), WalterError> {
    pulse_reset_pin(reset_pin, SOFT_RESET_PULSE).await;
    reset_mirror(handle).await?;
    await_sysstart(handle).await
}

/// Send the soft-reset AT command and wait for the modem to come back up
/// (spec §4.6, ground: `ModemCommon.soft_reset`).
pub async fn soft_reset<const SLOTS: usize>(handle: &CommandHandle<'_, SLOTS>) -> Result<(), WalterError> {
    let (ok, _) = handle.run(b"AT^RESET", b"+SYSSTART").await?;
    if !ok {
        return Err(WalterError::NotReady);
    }
    reset_mirror(handle).await
}

/// `AT` / `OK` round trip used to verify the UART link is alive (spec §4.6,
/// ground: `ModemCommon.check_comm`).
pub async fn check_comm<const SLOTS: usize>(handle: &CommandHandle<'_, SLOTS>) -> Result<bool, WalterError> {
    let (ok, _) = handle.run(b"AT", b"OK").await?;
    Ok(ok)
}

/// Initialise the driver: hardware-reset the modem, wait for `+SYSSTART`,
/// then apply the baseline configuration (numeric CME errors, CEREG
/// reporting enabled) (spec §4.6, ground: `ModemCore.begin`). Idempotent:
/// a second call is a no-op and returns `Ok(())` immediately (spec L1).
///
/// The reader+dispatcher task itself is not spawned here -- spec §9 leaves
/// the reader/dispatcher-as-one-or-two-tasks choice to the mapping, and this
/// crate merges them into `Dispatcher::run` (see dispatcher.rs); the board
/// crate is responsible for spawning that future before calling `begin`.
pub async fn begin<const SLOTS: usize>(
    handle: &CommandHandle<'_, SLOTS>,
    reset_pin: &mut impl ResetPin,
) -> Result<(), WalterError> {
    if BEGUN.load(Ordering::Acquire) {
        return Ok(());
    }

    pulse_reset_pin(reset_pin, RESET_PULSE).await;
    await_sysstart(handle).await?;

    handle.run(b"AT+CMEE=1", b"OK").await?;
    handle.run(b"AT+CEREG=1", b"OK").await?;

    BEGUN.store(true, Ordering::Release);
    Ok(())
}

/// Prepare the retained-memory record and (for a real deep sleep) hand off
/// to the board's own MCU sleep entry point (spec §6 "Persisted state
/// across deep sleep", §9 design note). The actual `esp_deep_sleep`/
/// `lightsleep` MCU call is a board-bring-up concern (spec §1: external
/// collaborator) and is not issued here; this function's contract ends at
/// persisting the blob `retained` will hold across the sleep cycle.
///
/// `light_sleep` skips persistence entirely, matching the original's
/// `sleep()`: light sleep keeps the UART/RTS pin held and never touches
/// retained memory.
pub async fn prepare_sleep(
    retained: &mut impl RetainedMemory,
    light_sleep: bool,
    persist_mqtt_subs: bool,
    subscriptions: &[(&str, u8)],
) -> Result<(), WalterError> {
    if light_sleep {
        return Ok(());
    }

    let blob = if persist_mqtt_subs {
        encode_retained(subscriptions)?
    } else {
        encode_retained(&[])?
    };
    retained.store(&blob)
}

/// Read back the retained-memory record left by [`prepare_sleep`] and
/// resubscribe to every persisted topic (spec §6, ground:
/// `mixins/mqtt.py::__mqtt_deep_sleep_wake`, which replays
/// `AT+SQNSMQTTSUBSCRIBE` for each recovered `(topic, qos)` pair).
pub async fn wake_restore_subscriptions<const SLOTS: usize>(
    handle: &CommandHandle<'_, SLOTS>,
    retained: &mut impl RetainedMemory,
) -> Result<Vec<RetainedSubscription, { crate::config::MQTT_MAX_SUBSCRIPTIONS }>, WalterError> {
    let mut buf = [0u8; crate::config::RETAINED_BLOB_CAPACITY];
    let n = retained.load(&mut buf)?;
    let subs = decode_retained(&buf[..n])?;

    for sub in subs.iter() {
        let mut at_cmd: Vec<u8, CMD_BUFFER_CAPACITY> = Vec::new();
        let _ = at_cmd.extend_from_slice(b"AT+SQNSMQTTSUBSCRIBE=0,\"");
        let _ = at_cmd.extend_from_slice(sub.topic.as_bytes());
        let _ = at_cmd.extend_from_slice(b"\",");
        let mut qos_digit = [0u8; 3];
        let qos_str = format_u8(sub.qos, &mut qos_digit);
        let _ = at_cmd.extend_from_slice(qos_str.as_bytes());

        // A single failed resubscription does not abort the replay of the
        // remaining ones -- ground: the original iterates its whole
        // `mqtt_subscriptions` list unconditionally.
        let (ok, _response) = handle
            .run_cmd(
                &at_cmd,
                ExpectedPrefixes::single(b"+SQNSMQTTONSUBSCRIBE:0"),
                CommandKind::SendAndWait,
                None,
                DEFAULT_CMD_ATTEMPTS,
            )
            .await?;
        if !ok {
            my_warn!("lifecycle", "resubscribe to {} failed on wake", sub.topic.as_str());
        }
    }

    Ok(subs)
}

/// Minimal decimal formatter for the single-digit QoS values (`0`, `1`,
/// `2`) this driver ever needs to embed in an AT command; avoids pulling in
/// `core::fmt::Write` plumbing for a one-digit number.
fn format_u8(value: u8, buf: &mut [u8; 3]) -> &str {
    let s = if value < 10 {
        buf[0] = b'0' + value;
        &buf[..1]
    } else if value < 100 {
        buf[0] = b'0' + value / 10;
        buf[1] = b'0' + value % 10;
        &buf[..2]
    } else {
        buf[0] = b'0' + value / 100;
        buf[1] = b'0' + (value / 10) % 10;
        buf[2] = b'0' + value % 10;
        &buf[..3]
    };
    core::str::from_utf8(s).unwrap_or("0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_u8_formats_qos_values() {
        let mut buf = [0u8; 3];
        assert_eq!(format_u8(0, &mut buf), "0");
        assert_eq!(format_u8(1, &mut buf), "1");
        assert_eq!(format_u8(2, &mut buf), "2");
    }
}
