use embedded_hal::i2c::ErrorKind;
use thiserror::Error;

/// Errors raised while talking to the gesture/face module.
#[derive(Debug, Error)]
pub enum Error {
    #[error("i2c bus error: {0:?}")]
    I2c(ErrorKind),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("no response from device")]
    Timeout,
    #[error("crc mismatch: expected {expected:#06x}, got {actual:#06x}")]
    Crc { expected: u16, actual: u16 },
    #[error("malformed frame: {0}")]
    Frame(&'static str),
    #[error("device exception {code:#04x} for function {function:#04x}")]
    Exception { function: u8, code: u8 },
    #[error("{name} out of range: {value} (expected {min}..={max})")]
    OutOfRange {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
    #[error("unknown gesture code {0}")]
    UnknownGesture(u16),
    #[error("register {reg:#04x} reads back {actual} after writing {expected}")]
    WriteMismatch { reg: u8, expected: u16, actual: u16 },
}

/// Convenience result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn out_of_range(name: &'static str, value: u32, min: u32, max: u32) -> Self {
        Error::OutOfRange {
            name,
            value,
            min,
            max,
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Timeout | Error::Crc { .. } | Error::Frame(_) | Error::I2c(_)
        )
    }
}
