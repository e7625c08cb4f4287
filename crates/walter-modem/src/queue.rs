//! Task queue and command queue (spec §4.3).
//!
//! The task queue is the single channel through which the reader task
//! (producing `ParsedFrame` items) and user tasks (producing `NewCommand`
//! items) hand work to the dispatcher task, preserving wire arrival order
//! (spec invariant I2). Ground: `FactbirdHQ/ublox-cellular-rs` uses
//! `embassy_sync::channel::Channel` for the same bounded MPSC shape; the
//! command queue (commands waiting for their turn once one is already
//! current) is a plain FIFO, ground: teacher's `SdoClientManager`'s
//! internal pending-request queue.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Deque;

use crate::command::Command;
use crate::config::{COMMAND_QUEUE_DEPTH, TASK_QUEUE_DEPTH};
use crate::parser::Frame;

/// An item moving through the task queue, in the order things actually
/// happened (spec §4.3: "NewCommand(cmd)" and "ParsedFrame(bytes)").
pub enum TaskQueueItem {
    NewCommand(Command),
    ParsedFrame(Frame),
    /// Zero every mirror table and signal the given completion slot once
    /// done. Mirror state is only ever touched from inside the dispatcher
    /// task (spec §4.5), so `reset`/`soft_reset`/`begin` cannot zero it
    /// directly -- they route through this item instead, the same way a
    /// `NewCommand` routes a wire command through the dispatcher.
    ResetMirror(usize),
}

pub type TaskQueue = Channel<CriticalSectionRawMutex, TaskQueueItem, TASK_QUEUE_DEPTH>;

/// FIFO of commands that arrived while another command was already current.
pub type CommandQueue = Deque<Command, COMMAND_QUEUE_DEPTH>;
