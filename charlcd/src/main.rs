mod config;

use crate::config::{parse_pin_bus, Config};
use charlcd_gpio::GpioDriver;
use charlcd_gpio::gpiod::GpiodDriver;
use charlcd_gpio::lcd::hd44780::driver::{GpioHD44780Driver, HD44780Config, HD44780Driver};
use charlcd_gpio::mock::MockGpioDriver;
use charlcd_gpio::raw::RawGpioDriver;
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use log::{debug, info};
use std::io::Read;
use std::path::PathBuf;
use sysinfo::System;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Backend {
    /// Registers mapped through /dev/gpiomem
    Gpiomem,
    /// Registers mapped through /dev/mem (needs root)
    Mem,
    /// Linux GPIO character device
    Gpiod,
    /// No hardware, log what would be sent
    Mock,
}

#[derive(Parser, Debug)]
#[command(name = "charlcd")]
#[command(about = "Print text on an HD44780 character LCD wired to GPIO in 4-bit mode")]
#[command(version)]
struct Cli {
    /// Text to print, joined with spaces. `\n` starts the next row. Read from stdin if omitted.
    text: Vec<String>,

    /// JSON file with the display wiring
    #[arg(long, env = "CHARLCD_CONFIG_FILE", default_value = "charlcd.json")]
    config: PathBuf,

    /// Register select (RS) pin
    #[arg(long, env = "CHARLCD_PIN_RS")]
    pin_rs: Option<usize>,

    /// Enable (E) pin
    #[arg(long, env = "CHARLCD_PIN_E")]
    pin_e: Option<usize>,

    /// Data pins DB4 to DB7, e.g. "23,17,21,22"
    #[arg(long, env = "CHARLCD_PINS_DATA")]
    pins_data: Option<String>,

    #[arg(long, env = "CHARLCD_COLUMNS")]
    columns: Option<usize>,

    #[arg(long, env = "CHARLCD_ROWS")]
    rows: Option<u8>,

    #[arg(long, value_enum, env = "CHARLCD_BACKEND", default_value_t = Backend::Gpiomem)]
    backend: Backend,

    /// GPIO chip used by the gpiod backend
    #[arg(long, env = "CHARLCD_GPIOD_CHIP", default_value = "/dev/gpiochip0")]
    chip: PathBuf,

    /// Column to start printing at
    #[arg(long)]
    col: Option<usize>,

    /// Row to start printing at
    #[arg(long)]
    row: Option<usize>,
}

impl Cli {
    fn lcd_config(&self) -> eyre::Result<HD44780Config> {
        let overrides = Config {
            pin_rs: self.pin_rs,
            pin_e: self.pin_e,
            pins_data: self.pins_data.as_deref().map(parse_pin_bus).transpose()?,
            columns: self.columns,
            rows: self.rows,
        };

        let file = Config::try_load(&self.config)?;
        if file.is_some() {
            info!("Config loaded from {}.", self.config.display());
        }

        file.unwrap_or_default().merge(overrides).into_lcd_config()
    }

    fn text(&self) -> eyre::Result<String> {
        if self.text.is_empty() {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            return Ok(text.trim_end_matches(['\r', '\n']).to_string());
        }

        Ok(self.text.join(" ").replace("\\n", "\n"))
    }

    fn cursor(&self) -> Option<(usize, usize)> {
        match (self.col, self.row) {
            (None, None) => None,
            (col, row) => Some((col.unwrap_or(0), row.unwrap_or(0))),
        }
    }
}

fn print(
    gpio: &mut dyn GpioDriver,
    config: HD44780Config,
    cursor: Option<(usize, usize)>,
    text: &str,
) -> eyre::Result<()> {
    debug!("Initializing LCD driver...");
    let mut lcd = GpioHD44780Driver::new(gpio, config)?;
    debug!("{:?} initialized.", lcd);

    if let Some((col, row)) = cursor {
        lcd.set_cursor(col, row)?;
    }

    lcd.print(text)?;
    Ok(())
}

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    let cli = Cli::parse();

    const UNKNOWN_STR: &str = "???";

    info!(
        "charlcd {} on {}",
        env!("CARGO_PKG_VERSION"),
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    debug!(
        "System ver {} kernel ver {}, architecture {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::cpu_arch(),
    );

    let config = cli.lcd_config()?;
    let text = cli.text()?;
    let cursor = cli.cursor();

    info!(
        "LCD @ RS: {}, E: {}, Data: {:?}, {}x{}",
        config.register_select_pin, config.enable_pin, config.data_pins, config.columns, config.rows
    );

    match cli.backend {
        Backend::Gpiomem => print(&mut RawGpioDriver::new_gpiomem()?, config, cursor, &text)?,
        Backend::Mem => print(&mut RawGpioDriver::new_mem()?, config, cursor, &text)?,
        Backend::Gpiod => print(&mut GpiodDriver::open(&cli.chip)?, config, cursor, &text)?,
        Backend::Mock => {
            let mut gpio = MockGpioDriver::default();
            let log = gpio.log();
            print(&mut gpio, config, cursor, &text)?;

            let bytes =
                log.latched_bytes(config.register_select_pin, config.enable_pin, config.data_pins);
            for byte in bytes {
                if byte.rs {
                    info!("DATA {:#04x} {:?}", byte.value, byte.value as char);
                } else {
                    info!("CMD  {:#04x}", byte.value);
                }
            }
        }
    }

    info!("Done.");
    Ok(())
}
