//! GpiodDriver implementation for driving GPIO lines through the Linux GPIO character device.
use crate::{GpioDriver, GpioError, GpioResult};
use log::debug;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::path::Path;

/// GpiodDriver is a GPIO driver that uses the gpiod library to manage GPIO lines.
///
/// Each configured output holds its own line request, released when the driver is dropped.
pub struct GpiodDriver {
    chip: gpiod::Chip,
    outputs: HashMap<usize, gpiod::Lines<gpiod::Output>>,
}

impl GpiodDriver {
    pub fn new(chip: gpiod::Chip) -> Self {
        Self {
            chip,
            outputs: HashMap::new(),
        }
    }

    /// Opens the chip at the given path, e.g. `/dev/gpiochip0`.
    pub fn open(path: impl AsRef<Path>) -> GpioResult<Self> {
        let chip = gpiod::Chip::new(path)?;
        debug!("Opened {} ({} lines)", chip.name(), chip.num_lines());
        Ok(Self::new(chip))
    }
}

impl Debug for GpiodDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpiodDriver({})", self.chip.name())
    }
}

impl GpioDriver for GpiodDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.chip.num_lines() as usize)
    }

    fn configure_output(&mut self, index: usize, value: bool) -> GpioResult<()> {
        if index >= self.count()? {
            return Err(GpioError::InvalidArgument);
        }

        if self.outputs.contains_key(&index) {
            return Err(GpioError::AlreadyInUse);
        }

        let line = self.chip.request_lines(
            gpiod::Options::output([index as u32])
                .values([value])
                .consumer(env!("CARGO_PKG_NAME")),
        )?;
        self.outputs.insert(index, line);

        Ok(())
    }

    fn write(&mut self, index: usize, value: bool) -> GpioResult<()> {
        let line = self.outputs.get(&index).ok_or(GpioError::NotOutput(index))?;
        line.set_values([value])?;
        Ok(())
    }
}
