//! INI file configuration adapter.

use configparser::ini::Ini;
use std::path::Path;

use crate::domain::error::EngineError;
use crate::ports::config_port::ConfigPort;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let mut config = Ini::new();
        config.load(&path).map_err(|reason| EngineError::ConfigParse {
            file: path.as_ref().display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, EngineError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| EngineError::ConfigParse {
                file: "<inline>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn from_string_parses_sections() {
        let content = r#"
[backtest]
initial_capital = 100000.0
symbols = AAPL,MSFT

[strategy]
ema_fast = 12
score_threshold = 6.5
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "symbols"),
            Some("AAPL,MSFT".to_string())
        );
        assert_eq!(adapter.get_int("strategy", "ema_fast", 0), 12);
        assert_eq!(adapter.get_double("strategy", "score_threshold", 0.0), 6.5);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let adapter = FileConfigAdapter::from_string("[strategy]\n").unwrap();
        assert_eq!(adapter.get_string("strategy", "missing"), None);
        assert_eq!(adapter.get_int("strategy", "missing", 42), 42);
        assert_eq!(adapter.get_double("strategy", "missing", 9.5), 9.5);
        assert!(adapter.get_bool("strategy", "missing", true));
    }

    #[test]
    fn non_numeric_values_fall_back_to_defaults() {
        let adapter =
            FileConfigAdapter::from_string("[strategy]\nema_fast = abc\natr_multiplier = x\n")
                .unwrap();
        assert_eq!(adapter.get_int("strategy", "ema_fast", 7), 7);
        assert_eq!(adapter.get_double("strategy", "atr_multiplier", 2.0), 2.0);
    }

    #[test]
    fn bool_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[strategy]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\n",
        )
        .unwrap();
        assert!(adapter.get_bool("strategy", "a", false));
        assert!(adapter.get_bool("strategy", "b", false));
        assert!(adapter.get_bool("strategy", "c", false));
        assert!(!adapter.get_bool("strategy", "d", true));
        assert!(!adapter.get_bool("strategy", "e", true));
        assert!(!adapter.get_bool("strategy", "f", true));
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[backtest]\ninitial_capital = 50000\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_double("backtest", "initial_capital", 0.0), 50000.0);
    }

    #[test]
    fn from_file_missing_path_is_config_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/quantfolio.ini").unwrap_err();
        assert!(matches!(
            err,
            EngineError::ConfigParse { ref file, .. } if file == "/nonexistent/quantfolio.ini"
        ));
    }
}
