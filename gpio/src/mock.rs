//! In-memory GPIO driver that records every pin operation instead of touching hardware.
//!
//! Used by the test suites and by the `mock` backend of the CLI to see what would be sent to a
//! display without one attached.
use crate::{GpioDriver, GpioError, GpioResult};
use bitvec::vec::BitVec;
use log::trace;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A single operation performed on a [MockGpioDriver].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MockGpioEvent {
    Configure { index: usize, value: bool },
    Write { index: usize, value: bool },
    Sleep { micros: u64 },
}

/// A byte reassembled from the nibbles latched by a 4-bit HD44780 bus.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LatchedByte {
    /// State of the register select line when the high nibble was latched.
    pub rs: bool,
    pub value: u8,
}

impl LatchedByte {
    pub fn command(value: u8) -> Self {
        LatchedByte { rs: false, value }
    }

    pub fn data(value: u8) -> Self {
        LatchedByte { rs: true, value }
    }
}

/// Shared handle to the events recorded by a [MockGpioDriver].
///
/// Stays readable while the driver itself is mutably borrowed by a display driver.
#[derive(Clone, Debug, Default)]
pub struct MockGpioLog(Rc<RefCell<Vec<MockGpioEvent>>>);

impl MockGpioLog {
    fn push(&self, event: MockGpioEvent) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<MockGpioEvent> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Gets the durations of all recorded sleeps, in order.
    pub fn sleeps(&self) -> Vec<u64> {
        self.0
            .borrow()
            .iter()
            .filter_map(|event| match event {
                MockGpioEvent::Sleep { micros } => Some(*micros),
                _ => None,
            })
            .collect()
    }

    /// Replays the recorded writes the way an HD44780 in 4-bit mode would see them.
    ///
    /// A nibble is latched on every falling edge of `pin_e`, with data pin `i` carrying bit `i`.
    /// Consecutive nibbles are paired high first. A trailing unpaired nibble is dropped.
    pub fn latched_bytes(
        &self,
        pin_rs: usize,
        pin_e: usize,
        data_pins: [usize; 4],
    ) -> Vec<LatchedByte> {
        let mut levels: HashMap<usize, bool> = HashMap::new();
        let mut pending: Option<(bool, u8)> = None;
        let mut bytes = Vec::new();

        for event in self.0.borrow().iter() {
            let (index, value) = match *event {
                MockGpioEvent::Configure { index, value } | MockGpioEvent::Write { index, value } => {
                    (index, value)
                }
                MockGpioEvent::Sleep { .. } => continue,
            };

            let previous = levels.insert(index, value).unwrap_or(false);
            if index != pin_e || !previous || value {
                continue;
            }

            let nibble = data_pins
                .iter()
                .enumerate()
                .filter(|&(_, pin)| levels.get(pin).copied().unwrap_or(false))
                .fold(0u8, |nibble, (bit, _)| nibble | 1 << bit);
            let rs = levels.get(&pin_rs).copied().unwrap_or(false);

            match pending.take() {
                None => pending = Some((rs, nibble)),
                Some((rs, high)) => bytes.push(LatchedByte {
                    rs,
                    value: high << 4 | nibble,
                }),
            }
        }

        bytes
    }
}

/// GPIO driver with `pin_count` virtual pins that only records what is done to them.
#[derive(Debug)]
pub struct MockGpioDriver {
    pin_count: usize,
    outputs: BitVec,
    log: MockGpioLog,
}

impl MockGpioDriver {
    /// Pin count of the 40-pin Raspberry Pi header (GPIO0 to GPIO27).
    pub const HEADER_PIN_COUNT: usize = 28;

    pub fn new(pin_count: usize) -> Self {
        MockGpioDriver {
            pin_count,
            outputs: BitVec::repeat(false, pin_count),
            log: MockGpioLog::default(),
        }
    }

    pub fn log(&self) -> MockGpioLog {
        self.log.clone()
    }
}

impl Default for MockGpioDriver {
    fn default() -> Self {
        Self::new(Self::HEADER_PIN_COUNT)
    }
}

impl GpioDriver for MockGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.pin_count)
    }

    fn configure_output(&mut self, index: usize, value: bool) -> GpioResult<()> {
        if index >= self.pin_count {
            return Err(GpioError::InvalidArgument);
        }

        if self.outputs[index] {
            return Err(GpioError::AlreadyInUse);
        }

        self.outputs.set(index, true);
        self.log.push(MockGpioEvent::Configure { index, value });
        Ok(())
    }

    fn write(&mut self, index: usize, value: bool) -> GpioResult<()> {
        if !self.outputs.get(index).is_some_and(|output| *output) {
            return Err(GpioError::NotOutput(index));
        }

        trace!("GPIO{} <- {}", index, value);
        self.log.push(MockGpioEvent::Write { index, value });
        Ok(())
    }

    fn sleep_micros(&mut self, micros: u64) {
        self.log.push(MockGpioEvent::Sleep { micros });
    }
}
