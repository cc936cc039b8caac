use crate::GpioDriver;
use crate::lcd::hd44780::commands::{
    BLINK_OFF, CURSOR_OFF, DISPLAY_CONTROL, DISPLAY_ON, ENTRY_LEFT, ENTRY_MODE_SET,
    ENTRY_SHIFT_DECREMENT, FIVE_BY_EIGHT_DOTS, FOUR_BIT_MODE, FUNCTION_SET, TWO_LINE,
};
use crate::lcd::hd44780::driver::{HD44780Config, HD44780Driver, HD44780Result};
use log::{debug, trace};

/// GpioHD44780Driver for HD44780 LCD controllers wired in 4-bit mode to GPIO pins.
///
/// Every byte is preceded by a fixed settle delay of [GpioHD44780Driver::SETTLE_DELAY_US], which
/// covers the execution time of all instructions except clear and home. The driver borrows the
/// GPIO controller for its whole lifetime, so all access to the bus goes through it.
#[derive(Debug)]
pub struct GpioHD44780Driver<'a> {
    gpio: &'a mut dyn GpioDriver,
    pin_rs: usize,
    pin_e: usize,
    data_pins: [usize; 4],
    columns: usize,
    rows: u8,
}

impl<'a> GpioHD44780Driver<'a> {
    /// Delay before every byte, in microseconds.
    pub const SETTLE_DELAY_US: u64 = 50;
    /// Hold time of each enable pulse phase, in microseconds.
    pub const PULSE_HOLD_US: u64 = 1;

    /// Extra delays between the nibbles of the two wake-up writes. The first one has to exceed
    /// the 4.1 ms the controller needs after power-on.
    const WAKE_UP_DELAYS_US: [(u8, u64); 2] = [(0x33, 4100), (0x32, 100)];

    /// Creates the driver and initializes the display into 4-bit mode.
    ///
    /// On success the display is on, cleared, with the cursor hidden at (0, 0), writing left to
    /// right.
    ///
    /// # Errors
    /// - Configuration errors, before any pin is touched.
    /// - GPIO errors while claiming the pins, before any instruction is sent.
    pub fn new(gpio: &'a mut dyn GpioDriver, config: HD44780Config) -> HD44780Result<Self> {
        config.validate()?;

        let mut driver = GpioHD44780Driver {
            gpio,
            pin_rs: config.register_select_pin,
            pin_e: config.enable_pin,
            data_pins: config.data_pins,
            columns: config.columns,
            rows: config.rows,
        };

        for pin in config.pins() {
            driver.gpio.configure_output(pin, false)?;
        }
        debug!("Pins configured: {:?}", config);

        driver.init()?;
        Ok(driver)
    }

    fn init(&mut self) -> HD44780Result<()> {
        // Synchronize and switch to 4-bit mode
        for (value, delay) in Self::WAKE_UP_DELAYS_US {
            self.send(value, false, Self::SETTLE_DELAY_US, Some(delay))?;
        }

        self.send_command(DISPLAY_CONTROL | DISPLAY_ON | CURSOR_OFF | BLINK_OFF)?;
        self.send_command(FUNCTION_SET | FOUR_BIT_MODE | TWO_LINE | FIVE_BY_EIGHT_DOTS)?;
        self.send_command(ENTRY_MODE_SET | ENTRY_LEFT | ENTRY_SHIFT_DECREMENT)?;
        self.clear()?;

        debug!("{}x{} display initialized", self.columns, self.rows);
        Ok(())
    }

    fn pulse_e(&mut self) -> HD44780Result<()> {
        // Start from low to get a clean rising edge
        self.gpio.write(self.pin_e, false)?;
        self.gpio.sleep_micros(Self::PULSE_HOLD_US);
        self.gpio.write(self.pin_e, true)?;
        self.gpio.sleep_micros(Self::PULSE_HOLD_US);
        // Controller latches on the falling edge
        self.gpio.write(self.pin_e, false)?;
        self.gpio.sleep_micros(Self::PULSE_HOLD_US);
        Ok(())
    }

    /// Drives data pin `i` with bit `i` of the nibble.
    fn write_nibble(&mut self, nibble: u8) -> HD44780Result<()> {
        for (bit, &pin) in self.data_pins.iter().enumerate() {
            self.gpio.write(pin, nibble & (1 << bit) != 0)?;
        }
        Ok(())
    }

    fn send(
        &mut self,
        data: u8,
        rs: bool,
        settle_us: u64,
        init_delay_us: Option<u64>,
    ) -> HD44780Result<()> {
        trace!("Sending data: {:08b}, RS: {}", data, rs);

        self.gpio.sleep_micros(settle_us);
        self.gpio.write(self.pin_rs, rs)?;

        let high_nibble = (data >> 4) & 0x0F;
        let low_nibble = data & 0x0F;

        trace!("Writing HN: {:04b}", high_nibble);
        self.write_nibble(high_nibble)?;
        self.pulse_e()?;

        if let Some(delay) = init_delay_us {
            self.gpio.sleep_micros(delay);
        }

        trace!("Writing LN: {:04b}", low_nibble);
        self.write_nibble(low_nibble)?;
        self.pulse_e()?;

        Ok(())
    }
}

impl HD44780Driver for GpioHD44780Driver<'_> {
    fn columns(&self) -> usize {
        self.columns
    }

    fn rows(&self) -> u8 {
        self.rows
    }

    fn send_command(&mut self, command: u8) -> HD44780Result<()> {
        self.send(command, false, Self::SETTLE_DELAY_US, None)
    }

    fn send_data(&mut self, data: u8) -> HD44780Result<()> {
        self.send(data, true, Self::SETTLE_DELAY_US, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GpioError;
    use crate::lcd::hd44780::driver::HD44780Error;
    use crate::mock::{LatchedByte, MockGpioDriver, MockGpioEvent, MockGpioLog};

    const RS: usize = 25;
    const E: usize = 24;
    const DATA: [usize; 4] = [23, 17, 21, 22];

    fn config(rows: u8) -> HD44780Config {
        HD44780Config {
            register_select_pin: RS,
            enable_pin: E,
            data_pins: DATA,
            columns: 20,
            rows,
        }
    }

    fn latched(log: &MockGpioLog) -> Vec<LatchedByte> {
        log.latched_bytes(RS, E, DATA)
    }

    /// Runs `f` on a freshly initialized display and returns the bytes it sent.
    fn sent_by(
        rows: u8,
        f: impl FnOnce(&mut GpioHD44780Driver) -> HD44780Result<()>,
    ) -> Vec<LatchedByte> {
        let mut gpio = MockGpioDriver::default();
        let log = gpio.log();
        let mut lcd = GpioHD44780Driver::new(&mut gpio, config(rows)).unwrap();
        log.clear();
        f(&mut lcd).unwrap();
        latched(&log)
    }

    fn pulse() -> Vec<MockGpioEvent> {
        vec![
            MockGpioEvent::Write { index: E, value: false },
            MockGpioEvent::Sleep { micros: 1 },
            MockGpioEvent::Write { index: E, value: true },
            MockGpioEvent::Sleep { micros: 1 },
            MockGpioEvent::Write { index: E, value: false },
            MockGpioEvent::Sleep { micros: 1 },
        ]
    }

    fn nibble(bits: [bool; 4]) -> Vec<MockGpioEvent> {
        DATA.iter()
            .zip(bits)
            .map(|(&index, value)| MockGpioEvent::Write { index, value })
            .collect()
    }

    #[test]
    fn init_configures_pins_low_then_sends_wake_up_and_setup() {
        let mut gpio = MockGpioDriver::default();
        let log = gpio.log();
        let lcd = GpioHD44780Driver::new(&mut gpio, config(2)).unwrap();
        assert_eq!(lcd.columns(), 20);
        assert_eq!(lcd.rows(), 2);

        let events = log.events();
        let configured: Vec<_> = [RS, E]
            .into_iter()
            .chain(DATA)
            .map(|index| MockGpioEvent::Configure { index, value: false })
            .collect();
        assert_eq!(events[..6], configured[..]);
        assert!(!events[6..].iter().any(|e| matches!(e, MockGpioEvent::Configure { .. })));

        assert_eq!(
            latched(&log),
            vec![
                LatchedByte::command(0x33),
                LatchedByte::command(0x32),
                LatchedByte::command(0x0C),
                LatchedByte::command(0x28),
                LatchedByte::command(0x06),
                LatchedByte::command(0x01),
            ]
        );
    }

    #[test]
    fn init_delays() {
        let mut gpio = MockGpioDriver::default();
        let log = gpio.log();
        GpioHD44780Driver::new(&mut gpio, config(2)).unwrap();

        let byte = |extra: Option<u64>| {
            let mut sleeps = vec![50, 1, 1, 1];
            sleeps.extend(extra);
            sleeps.extend([1, 1, 1]);
            sleeps
        };
        let mut expected = byte(Some(4100));
        expected.extend(byte(Some(100)));
        for _ in 0..4 {
            expected.extend(byte(None));
        }

        assert_eq!(log.sleeps(), expected);
    }

    #[test]
    fn byte_is_sent_high_nibble_first() {
        let mut gpio = MockGpioDriver::default();
        let log = gpio.log();
        let mut lcd = GpioHD44780Driver::new(&mut gpio, config(2)).unwrap();
        log.clear();

        // 0xA5 = 1010 0101
        lcd.send_data(0xA5).unwrap();

        let mut expected = vec![
            MockGpioEvent::Sleep { micros: 50 },
            MockGpioEvent::Write { index: RS, value: true },
        ];
        expected.extend(nibble([false, true, false, true]));
        expected.extend(pulse());
        expected.extend(nibble([true, false, true, false]));
        expected.extend(pulse());

        assert_eq!(log.events(), expected);
    }

    #[test]
    fn invalid_config_touches_no_pins() {
        let cases = [
            (
                HD44780Config { columns: 0, ..config(2) },
                HD44780Error::InvalidColumns,
            ),
            (config(0), HD44780Error::InvalidRows(0)),
            (config(5), HD44780Error::InvalidRows(5)),
            (
                HD44780Config { enable_pin: RS, ..config(2) },
                HD44780Error::DuplicatePin(RS),
            ),
            (
                HD44780Config { data_pins: [23, 17, 23, 22], ..config(2) },
                HD44780Error::DuplicatePin(23),
            ),
        ];

        for (config, error) in cases {
            let mut gpio = MockGpioDriver::default();
            let log = gpio.log();
            assert_eq!(GpioHD44780Driver::new(&mut gpio, config).unwrap_err(), error);
            assert!(log.is_empty());
        }
    }

    #[test]
    fn pin_setup_failure_sends_nothing() {
        let mut gpio = MockGpioDriver::default();
        let log = gpio.log();
        let config = HD44780Config { data_pins: [23, 17, 21, 40], ..config(2) };

        assert_eq!(
            GpioHD44780Driver::new(&mut gpio, config).unwrap_err(),
            HD44780Error::Gpio(GpioError::InvalidArgument)
        );
        assert!(log.events().iter().all(|e| matches!(e, MockGpioEvent::Configure { .. })));
    }

    #[test]
    fn clear_sends_one_instruction() {
        assert_eq!(sent_by(2, |lcd| lcd.clear()), vec![LatchedByte::command(0x01)]);
    }

    #[test]
    fn home_and_display_control() {
        assert_eq!(
            sent_by(2, |lcd| {
                lcd.home()?;
                lcd.set_display(true, true, true)?;
                lcd.set_display(false, false, false)
            }),
            vec![
                LatchedByte::command(0x02),
                LatchedByte::command(0x0F),
                LatchedByte::command(0x08),
            ]
        );
    }

    #[test]
    fn set_cursor_uses_row_offsets() {
        assert_eq!(
            sent_by(4, |lcd| {
                for row in 0..4 {
                    lcd.set_cursor(3, row)?;
                }
                Ok(())
            }),
            vec![
                LatchedByte::command(0x83),
                LatchedByte::command(0xC3),
                LatchedByte::command(0x97),
                LatchedByte::command(0xD7),
            ]
        );
    }

    #[test]
    fn set_cursor_clamps_row() {
        let clamped = sent_by(2, |lcd| lcd.set_cursor(5, 3));
        assert_eq!(clamped, sent_by(2, |lcd| lcd.set_cursor(5, 1)));
        assert_eq!(clamped, vec![LatchedByte::command(0xC5)]);

        assert_eq!(sent_by(1, |lcd| lcd.set_cursor(2, 1)), vec![LatchedByte::command(0x82)]);
    }

    #[test]
    fn set_cursor_does_not_check_columns() {
        // Past the 20 visible columns, into DDRAM the panel doesn't show
        assert_eq!(sent_by(2, |lcd| lcd.set_cursor(40, 0)), vec![LatchedByte::command(0xA8)]);
    }

    #[test]
    fn set_cursor_wraps_huge_column() {
        let expected = 0x80 | (usize::MAX as u8).wrapping_add(0x40);
        assert_eq!(
            sent_by(2, |lcd| lcd.set_cursor(usize::MAX, 1)),
            vec![LatchedByte::command(expected)]
        );
    }

    #[test]
    fn print_moves_to_next_row_on_newline() {
        let expected = sent_by(2, |lcd| {
            lcd.send_data(b'A')?;
            lcd.send_data(b'B')?;
            lcd.set_cursor(0, 1)?;
            lcd.send_data(b'C')?;
            lcd.send_data(b'D')
        });

        assert_eq!(sent_by(2, |lcd| lcd.print("AB\nCD")), expected);
        assert_eq!(
            expected,
            vec![
                LatchedByte::data(b'A'),
                LatchedByte::data(b'B'),
                LatchedByte::command(0xC0),
                LatchedByte::data(b'C'),
                LatchedByte::data(b'D'),
            ]
        );
    }

    #[test]
    fn print_extra_newlines_land_on_last_row() {
        // The third segment asks for row 2, which a 2-row display clamps to row 1
        assert_eq!(
            sent_by(2, |lcd| lcd.print("A\nB\nC")),
            vec![
                LatchedByte::data(b'A'),
                LatchedByte::command(0xC0),
                LatchedByte::data(b'B'),
                LatchedByte::command(0xC0),
                LatchedByte::data(b'C'),
            ]
        );

        assert_eq!(
            sent_by(4, |lcd| lcd.print("A\nB\nC")),
            vec![
                LatchedByte::data(b'A'),
                LatchedByte::command(0xC0),
                LatchedByte::data(b'B'),
                LatchedByte::command(0x94),
                LatchedByte::data(b'C'),
            ]
        );
    }

    #[test]
    fn print_row_counter_restarts_each_call() {
        assert_eq!(
            sent_by(4, |lcd| {
                lcd.print("\n")?;
                lcd.print("\n")
            }),
            vec![LatchedByte::command(0xC0), LatchedByte::command(0xC0)]
        );
    }

    #[test]
    fn print_sends_low_byte_of_code_point() {
        assert_eq!(
            sent_by(2, |lcd| lcd.print("é€")),
            vec![LatchedByte::data(0xE9), LatchedByte::data(0xAC)]
        );
    }
}
