//! Crate error type.

use core::fmt;

use embedded_hal::{
    digital,
    i2c,
};

use crate::registry::ControllerIndex;

pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced by the backlight and power drivers.
///
/// None of these leave the caller with a panic; on `Transport` the hardware
/// may be part-way through a sequence and re-issuing the call resynchronises
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The controller index is not one the registry knows about.
    InvalidDeviceHandle(ControllerIndex),
    /// A GPIO or bus operation failed (after retries, for the bus).
    Transport(TransportFault),
    /// Requested brightness level is outside the IC's ladder.
    OutOfRangeLevel(u8),
    /// Another caller is part-way through a sequence on this controller.
    Busy(ControllerIndex),
}

/// The last underlying failure of a transport operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportFault {
    Gpio { kind: digital::ErrorKind },
    I2c { register: u8, kind: i2c::ErrorKind },
}

impl Error {
    pub(crate) fn gpio<E: digital::Error>(err: E) -> Self {
        Self::Transport(TransportFault::Gpio { kind: err.kind() })
    }

    pub(crate) fn i2c<E: i2c::Error>(register: u8, err: E) -> Self {
        Self::Transport(TransportFault::I2c {
            register,
            kind: err.kind(),
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDeviceHandle(index) => write!(f, "invalid controller {}", index.get()),
            Self::Transport(TransportFault::Gpio { kind }) => write!(f, "gpio error: {kind}"),
            Self::Transport(TransportFault::I2c { register, kind }) => {
                write!(f, "i2c write to register {register:#04x} failed: {kind}")
            }
            Self::OutOfRangeLevel(level) => write!(f, "brightness level {level} out of range"),
            Self::Busy(index) => write!(f, "controller {} busy", index.get()),
        }
    }
}
