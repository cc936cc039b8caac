mod gpio;

use crate::GpioError;
use crate::lcd::hd44780::commands::{
    BLINK_ON, CLEAR_DISPLAY, CURSOR_ON, DISPLAY_CONTROL, DISPLAY_ON, RETURN_HOME, ROW_OFFSETS,
    SET_DDRAM_ADDR,
};
use log::{debug, trace};
use std::fmt::Debug;
use thiserror::Error;
pub use gpio::*;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum HD44780Error {
    #[error("pin {0} is assigned to more than one LCD line")]
    DuplicatePin(usize),
    #[error("column count must be positive")]
    InvalidColumns,
    #[error("row count must be between 1 and 4, got {0}")]
    InvalidRows(u8),
    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),
}

pub type HD44780Result<T> = Result<T, HD44780Error>;

/// Wiring and geometry of a display. Every field is required.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HD44780Config {
    /// Register select (RS) line.
    pub register_select_pin: usize,
    /// Enable (E) line.
    pub enable_pin: usize,
    /// Data lines DB4, DB5, DB6, DB7, in that order.
    pub data_pins: [usize; 4],
    /// Visible columns, at least 1.
    pub columns: usize,
    /// Physical rows, 1 to 4.
    pub rows: u8,
}

impl HD44780Config {
    /// Checks the configuration without touching any pin.
    pub fn validate(&self) -> HD44780Result<()> {
        if self.columns == 0 {
            return Err(HD44780Error::InvalidColumns);
        }

        if !(1..=ROW_OFFSETS.len() as u8).contains(&self.rows) {
            return Err(HD44780Error::InvalidRows(self.rows));
        }

        let pins = self.pins();
        for (i, pin) in pins.iter().enumerate() {
            if pins[..i].contains(pin) {
                return Err(HD44780Error::DuplicatePin(*pin));
            }
        }

        Ok(())
    }

    /// All pins in the order they are configured: RS, E, then DB4 to DB7.
    pub fn pins(&self) -> [usize; 6] {
        let [d4, d5, d6, d7] = self.data_pins;
        [self.register_select_pin, self.enable_pin, d4, d5, d6, d7]
    }
}

/// Operations on an HD44780 display in write-only 4-bit mode.
///
/// Implementations provide the bus-level [HD44780Driver::send_command] and
/// [HD44780Driver::send_data]; everything else is composed from those.
///
/// The driver is deliberately lenient in the same way the hardware is: rows past the last one are
/// clamped, columns past the panel width land in invisible DDRAM, and characters are sent as the
/// low byte of their code point, showing whatever glyph the character ROM has there.
pub trait HD44780Driver: Debug {
    /// Configured number of columns.
    fn columns(&self) -> usize;

    /// Configured number of rows.
    fn rows(&self) -> u8;

    /// Sends an instruction with RS low.
    fn send_command(&mut self, command: u8) -> HD44780Result<()>;

    /// Sends a byte to DDRAM with RS high.
    fn send_data(&mut self, data: u8) -> HD44780Result<()>;

    /// Clears the display and sets the cursor to (0, 0).
    ///
    /// The controller needs up to ~1.5 ms to execute this, longer than the usual spacing between
    /// writes. Callers with slow panels should wait before the next instruction.
    fn clear(&mut self) -> HD44780Result<()> {
        self.send_command(CLEAR_DISPLAY)
    }

    /// Sets the cursor to (0, 0) without clearing.
    fn home(&mut self) -> HD44780Result<()> {
        self.send_command(RETURN_HOME)
    }

    /// Sets the display on/off, cursor on/off, and blinking on/off.
    fn set_display(
        &mut self,
        display_on: bool,
        cursor_on: bool,
        blink_on: bool,
    ) -> HD44780Result<()> {
        let mut command = DISPLAY_CONTROL;
        if display_on {
            command |= DISPLAY_ON;
        }
        if cursor_on {
            command |= CURSOR_ON;
        }
        if blink_on {
            command |= BLINK_ON;
        }
        self.send_command(command)
    }

    /// Moves the cursor to the given column and row.
    ///
    /// A row past the last configured one is reduced to the last row. The column is not checked.
    fn set_cursor(&mut self, col: usize, row: usize) -> HD44780Result<()> {
        let last_row = usize::from(self.rows()).clamp(1, ROW_OFFSETS.len()) - 1;
        if row > last_row {
            debug!("Row {} out of range, using row {}", row, last_row);
        }
        let row = row.min(last_row);

        let address = col.wrapping_add(usize::from(ROW_OFFSETS[row]));
        trace!("Cursor ({}, {}) -> DDRAM {:#04x}", col, row, address);
        // The instruction carries the low byte of the address
        self.send_command(SET_DDRAM_ADDR | address as u8)
    }

    /// Writes `text` starting at the current cursor position.
    ///
    /// Each `'\n'` moves to the start of the next row, counting rows from 0 within this call.
    /// Newlines past the last row keep landing on the last row.
    fn print(&mut self, text: &str) -> HD44780Result<()> {
        let mut row = 0;
        for c in text.chars() {
            if c == '\n' {
                row += 1;
                self.set_cursor(0, row)?;
            } else {
                if u32::from(c) > 0xFF {
                    debug!("Character {:?} sent as {:#04x}", c, c as u8);
                }
                self.send_data(c as u8)?;
            }
        }
        Ok(())
    }
}
