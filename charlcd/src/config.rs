use charlcd_gpio::lcd::hd44780::driver::HD44780Config;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Display wiring as read from the JSON config file or the command line.
///
/// Every field is optional here so that sources can be layered; [Config::into_lcd_config] checks
/// that the merged result is complete.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub pin_rs: Option<usize>,
    pub pin_e: Option<usize>,
    pub pins_data: Option<[usize; 4]>,
    pub columns: Option<usize>,
    pub rows: Option<u8>,
}

impl Config {
    /// Loads the config file if it exists. A file that exists but can't be parsed is an error.
    pub fn try_load(path: &Path) -> eyre::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_json::from_reader(reader)
            .map_err(|err| eyre::eyre!("Invalid config file {}: {}", path.display(), err))?;
        Ok(Some(config))
    }

    /// Takes every field set in `overrides`, keeping the rest from `self`.
    pub fn merge(self, overrides: Config) -> Config {
        Config {
            pin_rs: overrides.pin_rs.or(self.pin_rs),
            pin_e: overrides.pin_e.or(self.pin_e),
            pins_data: overrides.pins_data.or(self.pins_data),
            columns: overrides.columns.or(self.columns),
            rows: overrides.rows.or(self.rows),
        }
    }

    pub fn into_lcd_config(self) -> eyre::Result<HD44780Config> {
        fn required<T>(value: Option<T>, name: &str, env: &str) -> eyre::Result<T> {
            value.ok_or_else(|| {
                eyre::eyre!("Missing {} (set {} or `{}` in the config file)", name, env, name)
            })
        }

        Ok(HD44780Config {
            register_select_pin: required(self.pin_rs, "pin_rs", "CHARLCD_PIN_RS")?,
            enable_pin: required(self.pin_e, "pin_e", "CHARLCD_PIN_E")?,
            data_pins: required(self.pins_data, "pins_data", "CHARLCD_PINS_DATA")?,
            columns: required(self.columns, "columns", "CHARLCD_COLUMNS")?,
            rows: required(self.rows, "rows", "CHARLCD_ROWS")?,
        })
    }
}

/// Parses a list of exactly 4 pin numbers separated by commas, spaces or semicolons.
pub fn parse_pin_bus(pin_str: &str) -> eyre::Result<[usize; 4]> {
    pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| eyre::eyre!("Invalid number of data pins, expected 4"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pin_bus_with_any_separator() {
        assert_eq!(parse_pin_bus("23,17,21,22").unwrap(), [23, 17, 21, 22]);
        assert_eq!(parse_pin_bus(" 23; 17 21 ,22 ").unwrap(), [23, 17, 21, 22]);
    }

    #[test]
    fn rejects_wrong_pin_count() {
        assert!(parse_pin_bus("23,17,21").is_err());
        assert!(parse_pin_bus("23,17,21,22,5").is_err());
        assert!(parse_pin_bus("23,17,x,22").is_err());
    }

    #[test]
    fn overrides_win_over_file() {
        let file = Config {
            pin_rs: Some(25),
            pin_e: Some(24),
            pins_data: Some([23, 17, 21, 22]),
            columns: Some(16),
            rows: Some(2),
        };
        let overrides = Config {
            rows: Some(4),
            columns: Some(20),
            ..Config::default()
        };

        let lcd = file.merge(overrides).into_lcd_config().unwrap();
        assert_eq!(
            lcd,
            HD44780Config {
                register_select_pin: 25,
                enable_pin: 24,
                data_pins: [23, 17, 21, 22],
                columns: 20,
                rows: 4,
            }
        );
    }

    #[test]
    fn missing_field_is_reported() {
        let config = Config {
            pin_rs: Some(25),
            pins_data: Some([23, 17, 21, 22]),
            columns: Some(16),
            rows: Some(2),
            ..Config::default()
        };

        let err = config.into_lcd_config().unwrap_err();
        assert!(err.to_string().contains("CHARLCD_PIN_E"));
    }

    #[test]
    fn reads_partial_json() {
        let json = r#"{ "pins_data": [23, 17, 21, 22], "rows": 2 }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(
            config,
            Config {
                pins_data: Some([23, 17, 21, 22]),
                rows: Some(2),
                ..Config::default()
            }
        );
    }

    #[test]
    fn missing_file_is_not_an_error() {
        assert_eq!(Config::try_load(Path::new("does-not-exist.json")).unwrap(), None);
    }
}
