//! Driver-wide tuning constants.
//!
//! Grouped into a `DriverConfig` rather than hardcoded so a board crate can
//! override pin assignments without touching the engine, the same
//! separation the teacher draws between protocol constants (`types.rs`)
//! and a HAL-supplied `NetworkInterface`.

use embassy_time::Duration;

/// Default number of attempts before a command gives up (spec §5).
pub const DEFAULT_CMD_ATTEMPTS: u8 = 3;

/// Fixed per-attempt command deadline (spec §5, open question (ii): not
/// exposed as a per-command override in the core).
pub const CMD_TIMEOUT: Duration = Duration::from_secs(5);

/// UART parameters (spec §6).
pub const UART_BAUD: u32 = 115_200;

/// Reset pin pulse width for a hardware reset (spec §4.1: "asserting low for
/// >= 10 ms then releasing high hardware-resets the modem").
pub const RESET_PULSE: Duration = Duration::from_millis(10);

/// Reset pin pulse width used by `reset()` (spec §4.6: "pulses the reset pin
/// low for 0.3 s").
pub const SOFT_RESET_PULSE: Duration = Duration::from_millis(300);

pub const MAX_PDP_CONTEXTS: usize = 8;
pub const MAX_SOCKETS: usize = 6;
pub const MAX_HTTP_PROFILES: usize = 3;
pub const MAX_COAP_CONTEXTS: usize = 3;
pub const MAX_GNSS_WAITERS: usize = 4;
pub const MQTT_INBOX_CAPACITY: usize = 16;
pub const MQTT_MAX_SUBSCRIPTIONS: usize = 8;
pub const MQTT_TOPIC_LEN: usize = 128;

/// Size of the retained-memory record persisted across deep sleep (spec §6,
/// §9): a flag byte plus up to [`MQTT_MAX_SUBSCRIPTIONS`] length-prefixed
/// `(topic, qos)` entries.
pub const RETAINED_BLOB_CAPACITY: usize = 1 + MQTT_MAX_SUBSCRIPTIONS * (4 + MQTT_TOPIC_LEN + 1);

/// Maximum size of a single framed response line, including the HTTP raw
/// payload case. Sized generously above the largest `+SQNHTTPRCV` body the
/// modem is configured to return.
pub const LINE_BUFFER_CAPACITY: usize = 1536;

/// Maximum AT command length (without terminator).
pub const CMD_BUFFER_CAPACITY: usize = 256;

/// Command queue depth (commands waiting for their turn on the wire).
pub const COMMAND_QUEUE_DEPTH: usize = 8;

/// Number of completion slots a `run_cmd` caller can lease concurrently
/// (one per in-flight or queued command, spec §3's one-shot completion
/// notifier, modelled as a small static pool rather than a per-call
/// allocation).
pub const COMMAND_SLOT_COUNT: usize = 8;

/// Task queue depth (interleaved new-commands and parsed-frames, spec §4.3).
pub const TASK_QUEUE_DEPTH: usize = 8;

/// Maximum number of externally-registered application response handlers.
pub const APP_HANDLER_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    pub cmd_attempts: u8,
    pub cmd_timeout: Duration,
    pub uart_baud: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            cmd_attempts: DEFAULT_CMD_ATTEMPTS,
            cmd_timeout: CMD_TIMEOUT,
            uart_baud: UART_BAUD,
        }
    }
}
