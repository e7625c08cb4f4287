//! Hardware abstraction the engine is built against.
//!
//! Board crates implement these traits; the engine never names a concrete
//! MCU, bus, or executor. The shapes mirror `embedded-io-async`'s
//! `Read`/`Write` and `embedded-hal`'s `OutputPin` closely enough that a
//! board crate can usually forward straight to them.

use crate::error::WalterError;

/// The read half of the host-to-modem UART, owned exclusively by the reader
/// task (spec §5: the reader suspends only on UART read-available).
pub trait UartReader {
    /// Suspend until at least one byte has arrived, then read whatever is
    /// available into `buf` (up to `buf.len()`), returning the number
    /// written. Mirrors `embedded-io-async::Read::read`: this must not
    /// return `Ok(0)` just because nothing is queued yet, or the
    /// dispatcher's reader arm spins without ever yielding to the executor.
    async fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, WalterError>;
}

/// The write half of the host-to-modem UART, owned exclusively by the
/// dispatcher task (spec §5: the UART is owned exclusively by the dispatcher
/// task for writes).
pub trait UartWriter {
    /// Write the full contents of `data`, blocking until every byte has been
    /// accepted by the transport.
    async fn write_all(&mut self, data: &[u8]) -> Result<(), WalterError>;
}

/// Convenience supertrait for board HALs that hand over a single object
/// implementing both halves; `begin` still splits it into a reader and a
/// writer moved into their respective tasks, the same way a board crate would
/// split a hardware UART peripheral into RX/TX halves before handing them
/// out.
pub trait UartPort: UartReader + UartWriter {}

impl<T: UartReader + UartWriter> UartPort for T {}

/// The modem's hardware reset line.
pub trait ResetPin {
    fn set_low(&mut self);
    fn set_high(&mut self);
}

/// Non-volatile storage that survives a deep sleep cycle.
///
/// Backed by RTC memory, a battery-backed SRAM region, or a flash page,
/// depending on the board. The engine only ever stores one record at a time
/// and always overwrites it wholesale (spec §9 design note).
pub trait RetainedMemory {
    /// Copy up to `buf.len()` bytes of the retained record into `buf`,
    /// returning the number of bytes actually stored. Returns `0` if nothing
    /// has been stored yet (cold boot).
    fn load(&mut self, buf: &mut [u8]) -> Result<usize, WalterError>;

    /// Overwrite the retained record with `data`.
    fn store(&mut self, data: &[u8]) -> Result<(), WalterError>;
}
