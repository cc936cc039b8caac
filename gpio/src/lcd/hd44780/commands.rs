//! HD44780 instruction set.
//!
//! Instructions are built by OR-ing an opcode with the flags of its group, e.g.
//! `DISPLAY_CONTROL | DISPLAY_ON | CURSOR_OFF | BLINK_OFF`. The `*_OFF`, `*_LEFT`, etc. flags are
//! zero and only exist so that the composed instruction reads like the datasheet table.

// Opcodes
pub const CLEAR_DISPLAY: u8 = 0x01;
pub const RETURN_HOME: u8 = 0x02;
pub const ENTRY_MODE_SET: u8 = 0x04;
pub const DISPLAY_CONTROL: u8 = 0x08;
pub const CURSOR_SHIFT: u8 = 0x10;
pub const FUNCTION_SET: u8 = 0x20;
pub const SET_CGRAM_ADDR: u8 = 0x40;
pub const SET_DDRAM_ADDR: u8 = 0x80;

// Entry mode set
pub const ENTRY_RIGHT: u8 = 0x00;
pub const ENTRY_LEFT: u8 = 0x02;
pub const ENTRY_SHIFT_INCREMENT: u8 = 0x01;
pub const ENTRY_SHIFT_DECREMENT: u8 = 0x00;

// Display control
pub const DISPLAY_ON: u8 = 0x04;
pub const DISPLAY_OFF: u8 = 0x00;
pub const CURSOR_ON: u8 = 0x02;
pub const CURSOR_OFF: u8 = 0x00;
pub const BLINK_ON: u8 = 0x01;
pub const BLINK_OFF: u8 = 0x00;

// Cursor or display shift
pub const DISPLAY_MOVE: u8 = 0x08;
pub const CURSOR_MOVE: u8 = 0x00;
pub const MOVE_RIGHT: u8 = 0x04;
pub const MOVE_LEFT: u8 = 0x00;

// Function set
pub const EIGHT_BIT_MODE: u8 = 0x10;
pub const FOUR_BIT_MODE: u8 = 0x00;
pub const TWO_LINE: u8 = 0x08;
pub const ONE_LINE: u8 = 0x00;
pub const FIVE_BY_TEN_DOTS: u8 = 0x04;
pub const FIVE_BY_EIGHT_DOTS: u8 = 0x00;

/// DDRAM address of the first column of each row.
///
/// Rows 2 and 3 continue rows 0 and 1 in memory, which is why a 20x4 panel maps them to `0x14`
/// and `0x54`.
pub const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composed_init_instructions() {
        assert_eq!(DISPLAY_CONTROL | DISPLAY_ON | CURSOR_OFF | BLINK_OFF, 0x0C);
        assert_eq!(FUNCTION_SET | FOUR_BIT_MODE | TWO_LINE | FIVE_BY_EIGHT_DOTS, 0x28);
        assert_eq!(ENTRY_MODE_SET | ENTRY_LEFT | ENTRY_SHIFT_DECREMENT, 0x06);
    }
}
