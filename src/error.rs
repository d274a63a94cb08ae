//! Unified error types for the MushPi controller.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! monitoring cycle's error handling uniform. Variants that cross the cycle
//! boundary are `Copy` so they can be threaded through status bookkeeping
//! without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read or returned out-of-range data.
    Sensor(SensorError),
    /// A relay command failed at the GPIO backend.
    Relay(RelayError),
    /// A protocol payload failed validation.
    Protocol(ProtocolError),
    /// Persistent settings could not be loaded or saved.
    Store(StoreError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Relay(e) => write!(f, "relay: {e}"),
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The sensor bus read failed or timed out.
    ReadFailed,
    /// Reading is outside the physically plausible range.
    OutOfRange,
    /// No sensor backend is attached (external driver absent).
    NotAttached,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed => write!(f, "read failed"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::NotAttached => write!(f, "no sensor backend attached"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Relay errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayError {
    /// GPIO line write failed.
    GpioWriteFailed,
    /// The relay line was never initialised.
    NotInitialised,
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::NotInitialised => write!(f, "relay line not initialised"),
        }
    }
}

impl From<RelayError> for Error {
    fn from(e: RelayError) -> Self {
        Self::Relay(e)
    }
}

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

/// Validation failures for characteristic payloads. A rejected payload never
/// mutates controller state; the device stays in its prior valid state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload length does not match the characteristic's fixed layout.
    BadLength { expected: usize, got: usize },
    /// A reserved bit or reserved field is non-zero.
    ReservedBits,
    /// An enum-coded field carries an unknown discriminant.
    UnknownEnum { field: &'static str, value: u8 },
    /// A field combination is semantically invalid (e.g. zero-length cycle).
    BadValue(&'static str),
    /// The write was throttled or the command queue is saturated.
    Busy,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadLength { expected, got } => {
                write!(f, "bad length: expected {expected} bytes, got {got}")
            }
            Self::ReservedBits => write!(f, "reserved bits set"),
            Self::UnknownEnum { field, value } => {
                write!(f, "unknown {field} value {value}")
            }
            Self::BadValue(msg) => write!(f, "invalid value: {msg}"),
            Self::Busy => write!(f, "write throttled"),
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

// ---------------------------------------------------------------------------
// Settings-store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// No persisted settings exist (first boot).
    NotFound,
    /// Stored blob failed integrity / deserialization check.
    Corrupted,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "settings not found"),
            Self::Corrupted => write!(f, "settings corrupted"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Controller-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
