//! HD44780 LCD module.
//!
//! Drives HD44780-compatible character LCD controllers in 4-bit mode, with the data bus on four
//! GPIO lines (DB4 to DB7) plus the RS and E control lines. The R/W line is expected to be tied to
//! GND, so the controller is never read from and every instruction is spaced by fixed delays
//! instead of busy-flag polling.
//!
//! See [driver::HD44780Driver] for the operations and [driver::GpioHD44780Driver] for the
//! bus-level protocol.

pub mod commands;
pub mod driver;
