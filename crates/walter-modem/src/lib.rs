#![cfg_attr(not(feature = "std"), no_std)]
#![allow(async_fn_in_trait)]

//! Platform-agnostic driver core for the Sequans Monarch 2 modem: an AT
//! command/response engine, a single-outstanding-command queue, and a
//! library-owned mirror of modem-side state (PDP contexts, sockets, HTTP
//! profiles, CoAP contexts, MQTT, GNSS, network registration).
//!
//! A board crate provides the [`hal`] trait implementations (UART halves,
//! the reset pin, retained memory) and spawns [`dispatcher::Dispatcher::run`]
//! as a task; every other task submits commands through a
//! [`lifecycle::CommandHandle`] and reads mirror state back through the
//! table types in [`mirror`] or a [`mirror::NetworkStateView`].

// --- Foundation modules ---
pub mod config;
pub mod error;
pub mod hal;
pub mod log;
pub mod types;

// --- Wire framing and command state machine ---
pub mod command;
pub mod parser;
pub mod queue;
pub mod response;

// --- Dispatcher and response handlers ---
pub mod dispatcher;
pub mod handlers;

// --- Library-owned mirror state ---
pub mod mirror;

// --- Lifecycle and deep-sleep persistence ---
pub mod lifecycle;
pub mod sleep;

// --- Top-level exports ---
pub use command::{Command, CommandKind, CompletionSlots, ExpectedPrefixes};
pub use dispatcher::Dispatcher;
pub use error::{CmeError, ModemResult, WalterError};
pub use hal::{ResetPin, RetainedMemory, UartPort, UartReader, UartWriter};
pub use lifecycle::{begin, check_comm, prepare_sleep, reset, soft_reset, wake_restore_subscriptions, CommandHandle};
pub use mirror::{Mirror, NetworkState, NetworkStateView};
pub use response::ModemResponse;
pub use types::{CoapContextId, HttpProfileId, PdpContextId, SocketId};
