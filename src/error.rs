//! The error taxonomy shared by every layer above the raw SPI interface.

use thiserror::Error;

use motor::MotorMode;
use registers::Register;

/// The union of everything that can go wrong while driving the board. `E` is the transport error
/// type of the `ExpanderInterface` in use.
///
/// All variants are synchronous and surfaced directly to the caller; none is retried internally.
/// `NoDeviceDetected` is fatal for the board instance, the rest are recoverable at the caller's
/// discretion.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error<E> {
    /// The caller supplied a logical value outside the range of the addressed field, e.g. a bit
    /// value that is neither 0 nor 1.
    #[error("value {value} out of range 0..={max}")]
    Domain { value: u8, max: u8 },

    /// A motor was commanded directly from `Forward` to `Reverse` or vice versa. The motor must
    /// pass through `Brake` or `Coast` first; no pins were written.
    #[error("direct {from:?} -> {to:?} transition not allowed; pass through Brake or Coast first")]
    ForbiddenTransition { from: MotorMode, to: MotorMode },

    /// The shared motor activation window has not elapsed since the last accepted command, on any
    /// motor. Retrying is the caller's decision; the remaining wait is reported in milliseconds.
    #[error("motor command window not yet elapsed ({remaining_ms}ms remaining)")]
    TooSoon { remaining_ms: u64 },

    /// The IOCON configuration byte did not read back as written during the probe. No board is
    /// present at the addressed chip select, or the wiring is faulty.
    #[error("no board detected (wrote {expected:#04x} to IOCON, read back {found:#04x})")]
    NoDeviceDetected { expected: u8, found: u8 },

    /// A view was requested over register bits that another exclusive view already owns.
    #[error("bits {mask:#010b} of {register:?} are already claimed by another view")]
    Claimed { register: Register, mask: u8 },

    /// The underlying register transport failed.
    #[error("register transport fault: {0:?}")]
    Transport(E),
}
