//! INI-backed `ConfigPort`.
//!
//! Lookups ignore case in section and key names. A blank value counts as
//! absent, and a value that fails to parse falls back to the caller's
//! default with a warning.

use std::path::Path;
use std::str::FromStr;

use configparser::ini::Ini;

use crate::domain::error::BacktestError;
use crate::ports::config_port::ConfigPort;

#[derive(Debug)]
pub struct FileConfigAdapter {
    ini: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BacktestError> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        ini.load(path).map_err(|reason| BacktestError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { ini })
    }

    pub fn from_string(content: &str) -> Result<Self, BacktestError> {
        let mut ini = Ini::new();
        ini.read(content.to_owned())
            .map_err(|reason| BacktestError::ConfigParse {
                file: "<inline>".to_owned(),
                reason,
            })?;
        Ok(Self { ini })
    }

    fn value(&self, section: &str, key: &str) -> Option<String> {
        self.ini
            .get(section, key)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    }

    fn parsed<T: FromStr>(&self, section: &str, key: &str, default: T) -> T {
        let Some(raw) = self.value(section, key) else {
            return default;
        };
        raw.parse().unwrap_or_else(|_| {
            tracing::warn!(section, key, value = %raw, "unparsable config value, using default");
            default
        })
    }
}

fn truthy(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.value(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.parsed(section, key, default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.parsed(section, key, default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.value(section, key) {
            Some(raw) => truthy(&raw).unwrap_or_else(|| {
                tracing::warn!(section, key, value = %raw, "not a boolean, using default");
                default
            }),
            None => default,
        }
    }

    fn has_section(&self, section: &str) -> bool {
        self.ini
            .sections()
            .iter()
            .any(|s| s.eq_ignore_ascii_case(section))
    }
}
