//! Portable error and result-code types for the driver core.
//!
//! `WalterError` covers failures that never reach the modem (buffer
//! capacity, out-of-range IDs, API misuse). `ModemResult` is the per-command
//! outcome code every `run_cmd` call resolves to (spec data model §3); it is
//! a distinct type because a command can fail "successfully" from the
//! engine's point of view (e.g. `Timeout`) without anything in
//! `WalterError` being raised.

use core::fmt;

/// Numeric CME ("Mobile Equipment") error catalogue.
///
/// Ported field-for-field from the device's `+CME ERROR: <n>` namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmeError {
    EquipmentFailure = 0,
    NoConnection = 1,
    PhoneAdapterLinkReserved = 2,
    OperationNotAllowed = 3,
    OperationNotSupported = 4,
    PhSimPinRequired = 5,
    PhFsimPinRequired = 6,
    PhFsimPukRequired = 7,
    SimNotInserted = 10,
    SimPinRequired = 11,
    SimPukRequired = 12,
    SimFailure = 13,
    SimBusy = 14,
    SimWrong = 15,
    IncorrectPassword = 16,
    SimPin2Required = 17,
    SimPuk2Required = 18,
    MemoryFull = 20,
    InvalidIndex = 21,
    NotFound = 22,
    MemoryFailure = 23,
    TextStringTooLong = 24,
    InvalidCharsInTextString = 25,
    DialStringTooLong = 26,
    InvalidCharsInDialString = 27,
    NoNetworkService = 30,
    NetworkTimeout = 31,
    NetworkNotAllowedEmergencyCallsOnly = 32,
    NetworkPersonalizationPinRequired = 40,
    NetworkPersonalizationPukRequired = 41,
    NetworkSubsetPersonalizationPinRequired = 42,
    NetworkSubsetPersonalizationPukRequired = 43,
    ServiceProviderPersonalizationPinRequired = 44,
    ServiceProviderPersonalizationPukRequired = 45,
    CorporatePersonalizationPinRequired = 46,
    CorporatePersonalizationPukRequired = 47,
    HiddenKeyRequired = 48,
    EapMethodNotSupported = 49,
    IncorrectParameters = 50,
    SystemFailure = 60,
    UnknownError = 100,
    UpgradeFailedGeneralError = 528,
    UpgradeFailedCorruptedImage = 529,
    UpgradeFailedInvalidSignature = 530,
    UpgradeFailedNetworkError = 531,
    UpgradeFailedAlreadyInProgress = 532,
    UpgradeCancelFailedNoUpgradeInProgress = 533,
    HwConfigFailedGeneralError = 540,
    HwConfigFailedInvalidFunction = 541,
    HwConfigFailedInvalidFunctionParam = 542,
    HwConfigFailedPinsAlreadyAssigned = 543,
    WrongState = 551,
    /// A numeric code the catalogue above doesn't name. Kept verbatim so
    /// callers can still inspect the raw modem value.
    Other(u16),
}

impl CmeError {
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => Self::EquipmentFailure,
            1 => Self::NoConnection,
            2 => Self::PhoneAdapterLinkReserved,
            3 => Self::OperationNotAllowed,
            4 => Self::OperationNotSupported,
            5 => Self::PhSimPinRequired,
            6 => Self::PhFsimPinRequired,
            7 => Self::PhFsimPukRequired,
            10 => Self::SimNotInserted,
            11 => Self::SimPinRequired,
            12 => Self::SimPukRequired,
            13 => Self::SimFailure,
            14 => Self::SimBusy,
            15 => Self::SimWrong,
            16 => Self::IncorrectPassword,
            17 => Self::SimPin2Required,
            18 => Self::SimPuk2Required,
            20 => Self::MemoryFull,
            21 => Self::InvalidIndex,
            22 => Self::NotFound,
            23 => Self::MemoryFailure,
            24 => Self::TextStringTooLong,
            25 => Self::InvalidCharsInTextString,
            26 => Self::DialStringTooLong,
            27 => Self::InvalidCharsInDialString,
            30 => Self::NoNetworkService,
            31 => Self::NetworkTimeout,
            32 => Self::NetworkNotAllowedEmergencyCallsOnly,
            40 => Self::NetworkPersonalizationPinRequired,
            41 => Self::NetworkPersonalizationPukRequired,
            42 => Self::NetworkSubsetPersonalizationPinRequired,
            43 => Self::NetworkSubsetPersonalizationPukRequired,
            44 => Self::ServiceProviderPersonalizationPinRequired,
            45 => Self::ServiceProviderPersonalizationPukRequired,
            46 => Self::CorporatePersonalizationPinRequired,
            47 => Self::CorporatePersonalizationPukRequired,
            48 => Self::HiddenKeyRequired,
            49 => Self::EapMethodNotSupported,
            50 => Self::IncorrectParameters,
            60 => Self::SystemFailure,
            100 => Self::UnknownError,
            528 => Self::UpgradeFailedGeneralError,
            529 => Self::UpgradeFailedCorruptedImage,
            530 => Self::UpgradeFailedInvalidSignature,
            531 => Self::UpgradeFailedNetworkError,
            532 => Self::UpgradeFailedAlreadyInProgress,
            533 => Self::UpgradeCancelFailedNoUpgradeInProgress,
            540 => Self::HwConfigFailedGeneralError,
            541 => Self::HwConfigFailedInvalidFunction,
            542 => Self::HwConfigFailedInvalidFunctionParam,
            543 => Self::HwConfigFailedPinsAlreadyAssigned,
            551 => Self::WrongState,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::EquipmentFailure => 0,
            Self::NoConnection => 1,
            Self::PhoneAdapterLinkReserved => 2,
            Self::OperationNotAllowed => 3,
            Self::OperationNotSupported => 4,
            Self::PhSimPinRequired => 5,
            Self::PhFsimPinRequired => 6,
            Self::PhFsimPukRequired => 7,
            Self::SimNotInserted => 10,
            Self::SimPinRequired => 11,
            Self::SimPukRequired => 12,
            Self::SimFailure => 13,
            Self::SimBusy => 14,
            Self::SimWrong => 15,
            Self::IncorrectPassword => 16,
            Self::SimPin2Required => 17,
            Self::SimPuk2Required => 18,
            Self::MemoryFull => 20,
            Self::InvalidIndex => 21,
            Self::NotFound => 22,
            Self::MemoryFailure => 23,
            Self::TextStringTooLong => 24,
            Self::InvalidCharsInTextString => 25,
            Self::DialStringTooLong => 26,
            Self::InvalidCharsInDialString => 27,
            Self::NoNetworkService => 30,
            Self::NetworkTimeout => 31,
            Self::NetworkNotAllowedEmergencyCallsOnly => 32,
            Self::NetworkPersonalizationPinRequired => 40,
            Self::NetworkPersonalizationPukRequired => 41,
            Self::NetworkSubsetPersonalizationPinRequired => 42,
            Self::NetworkSubsetPersonalizationPukRequired => 43,
            Self::ServiceProviderPersonalizationPinRequired => 44,
            Self::ServiceProviderPersonalizationPukRequired => 45,
            Self::CorporatePersonalizationPinRequired => 46,
            Self::CorporatePersonalizationPukRequired => 47,
            Self::HiddenKeyRequired => 48,
            Self::EapMethodNotSupported => 49,
            Self::IncorrectParameters => 50,
            Self::SystemFailure => 60,
            Self::UnknownError => 100,
            Self::UpgradeFailedGeneralError => 528,
            Self::UpgradeFailedCorruptedImage => 529,
            Self::UpgradeFailedInvalidSignature => 530,
            Self::UpgradeFailedNetworkError => 531,
            Self::UpgradeFailedAlreadyInProgress => 532,
            Self::UpgradeCancelFailedNoUpgradeInProgress => 533,
            Self::HwConfigFailedGeneralError => 540,
            Self::HwConfigFailedInvalidFunction => 541,
            Self::HwConfigFailedInvalidFunctionParam => 542,
            Self::HwConfigFailedPinsAlreadyAssigned => 543,
            Self::WrongState => 551,
            Self::Other(v) => *v,
        }
    }
}

/// The per-command result code (spec data model §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemResult {
    Ok,
    Error,
    Timeout,
    NoMemory,
    NoSuchPdpContext,
    NoFreeSocket,
    NoSuchSocket,
    NoSuchProfile,
    NotExpectingRing,
    AwaitingRing,
    Busy,
    NoData,
}

/// Errors raised by the engine itself, never by the modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalterError {
    /// A fixed-capacity buffer (line buffer, command queue, handler table)
    /// is full.
    BufferFull,
    /// A PDP context, socket, HTTP profile or CoAP context index is outside
    /// its declared range (spec boundary behaviour B4).
    InvalidPdpContext(u8),
    InvalidSocket(u8),
    InvalidHttpProfile(u8),
    InvalidCoapContext(u8),
    /// No free slot was available when leasing a resource.
    NoFreeResource,
    /// A ring was polled when none was expected, or while one was already
    /// pending (spec §7, protocol misuse).
    NotExpectingRing,
    AwaitingRing,
    /// The driver was asked to act before `begin()` completed.
    NotReady,
    /// The underlying UART reported an error.
    Io,
    /// The retained-memory blob is malformed or declares a length that
    /// exceeds the remaining bytes (spec §9 design note).
    InvalidRetainedState,
}

impl fmt::Display for WalterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferFull => write!(f, "fixed-capacity buffer is full"),
            Self::InvalidPdpContext(id) => write!(f, "PDP context id {id} out of range"),
            Self::InvalidSocket(id) => write!(f, "socket id {id} out of range"),
            Self::InvalidHttpProfile(id) => write!(f, "HTTP profile id {id} out of range"),
            Self::InvalidCoapContext(id) => write!(f, "CoAP context id {id} out of range"),
            Self::NoFreeResource => write!(f, "no free slot available"),
            Self::NotExpectingRing => write!(f, "ring received while none was expected"),
            Self::AwaitingRing => write!(f, "ring already pending for this context"),
            Self::NotReady => write!(f, "driver is not initialised"),
            Self::Io => write!(f, "UART I/O error"),
            Self::InvalidRetainedState => write!(f, "retained-memory blob is malformed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for WalterError {}
