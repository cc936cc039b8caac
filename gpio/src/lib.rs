pub mod gpiod;
pub mod lcd;
pub mod mock;
pub mod raw;

use std::fmt::Debug;
use std::thread::sleep;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("pin {0} is not configured as an output")]
    NotOutput(usize),
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

/// The narrow view of a GPIO controller that the display drivers need: claiming pins as outputs,
/// driving them, and waiting between transitions.
///
/// Pins are addressed by their line index on the controller (BCM numbering on a Raspberry Pi).
/// `true` is a high level, `false` is low.
pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO pins available.
    fn count(&self) -> GpioResult<usize>;

    /// Claims the pin at the given index and sets its function to output, driving it to `value`.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the index is out of range for this controller.
    /// - `GpioError::AlreadyInUse` if the pin has already been claimed.
    fn configure_output(&mut self, index: usize, value: bool) -> GpioResult<()>;

    /// Writes the state of a pin previously claimed with [GpioDriver::configure_output].
    ///
    /// # Errors
    /// - `GpioError::NotOutput` if the pin was never configured as an output.
    fn write(&mut self, index: usize, value: bool) -> GpioResult<()>;

    /// Blocks the calling thread for the given amount of microseconds.
    fn sleep_micros(&mut self, micros: u64) {
        sleep(Duration::from_micros(micros));
    }
}
