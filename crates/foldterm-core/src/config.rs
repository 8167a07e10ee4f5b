//! Terminal configuration.
//!
//! [`TerminalConfig`] carries the initial geometry and mode defaults. Values
//! can be overridden from the environment:
//!
//! | Variable                | Field                   |
//! |-------------------------|-------------------------|
//! | `FOLDTERM_WIDTH`        | `width`                 |
//! | `FOLDTERM_HEIGHT`       | `height`                |
//! | `FOLDTERM_MIN_WIDTH`    | `minimum_width`         |
//! | `FOLDTERM_DECODE_CACHE` | `decode_cache_capacity` |

use std::fmt;

use crate::decoder::DEFAULT_CACHE_CAPACITY;

pub const ENV_WIDTH: &str = "FOLDTERM_WIDTH";
pub const ENV_HEIGHT: &str = "FOLDTERM_HEIGHT";
pub const ENV_MIN_WIDTH: &str = "FOLDTERM_MIN_WIDTH";
pub const ENV_DECODE_CACHE: &str = "FOLDTERM_DECODE_CACHE";

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set but is not a non-negative integer.
    InvalidNumber { key: String, value: String },
    /// Width or height was zero.
    ZeroDimension { key: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNumber { key, value } => {
                write!(f, "{key}: expected a non-negative integer, got {value:?}")
            }
            Self::ZeroDimension { key } => write!(f, "{key}: must be greater than zero"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Initial terminal geometry and modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalConfig {
    /// Columns.
    pub width: usize,
    /// Rows.
    pub height: usize,
    /// Lines never fold narrower than this.
    pub minimum_width: Option<usize>,
    /// Entries per decoder cache. Zero is treated as one.
    pub decode_cache_capacity: usize,
    /// Overwrite (true) or insert (false) when writing inside a line.
    pub replace_mode: bool,
    pub auto_wrap: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
            minimum_width: None,
            decode_cache_capacity: DEFAULT_CACHE_CAPACITY,
            replace_mode: true,
            auto_wrap: true,
        }
    }
}

impl TerminalConfig {
    /// Builder: set the size.
    #[must_use]
    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Builder: set the minimum fold width.
    #[must_use]
    pub fn with_minimum_width(mut self, minimum_width: usize) -> Self {
        self.minimum_width = Some(minimum_width);
        self
    }

    /// Builder: set the decoder cache capacity.
    #[must_use]
    pub fn with_decode_cache_capacity(mut self, capacity: usize) -> Self {
        self.decode_cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_replace_mode(mut self, replace_mode: bool) -> Self {
        self.replace_mode = replace_mode;
        self
    }

    #[must_use]
    pub fn with_auto_wrap(mut self, auto_wrap: bool) -> Self {
        self.auto_wrap = auto_wrap;
        self
    }

    /// Width lines are folded at for a terminal `width` columns wide.
    #[must_use]
    pub fn fold_width(&self, width: usize) -> usize {
        width.max(self.minimum_width.unwrap_or(0))
    }

    /// Defaults overridden from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env(|key| std::env::var(key).ok())
    }

    /// Override fields from `lookup`, which maps a variable name to its value.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(width) = read_number(&lookup, ENV_WIDTH)? {
            self.width = non_zero(ENV_WIDTH, width)?;
        }
        if let Some(height) = read_number(&lookup, ENV_HEIGHT)? {
            self.height = non_zero(ENV_HEIGHT, height)?;
        }
        if let Some(minimum) = read_number(&lookup, ENV_MIN_WIDTH)? {
            self.minimum_width = Some(minimum);
        }
        if let Some(capacity) = read_number(&lookup, ENV_DECODE_CACHE)? {
            self.decode_cache_capacity = capacity.max(1);
        }
        Ok(self)
    }
}

fn read_number<F>(lookup: &F, key: &str) -> Result<Option<usize>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    value
        .trim()
        .parse::<usize>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidNumber {
            key: key.to_owned(),
            value,
        })
}

fn non_zero(key: &str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        Err(ConfigError::ZeroDimension {
            key: key.to_owned(),
        })
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = TerminalConfig::default();
        assert_eq!((config.width, config.height), (80, 24));
        assert_eq!(config.decode_cache_capacity, 1024);
        assert!(config.replace_mode);
        assert!(config.auto_wrap);
        assert_eq!(config.minimum_width, None);
    }

    #[test]
    fn env_overrides() {
        let config = TerminalConfig::default()
            .apply_env(env(&[
                (ENV_WIDTH, "132"),
                (ENV_HEIGHT, " 50 "),
                (ENV_MIN_WIDTH, "100"),
                (ENV_DECODE_CACHE, "0"),
            ]))
            .unwrap();
        assert_eq!((config.width, config.height), (132, 50));
        assert_eq!(config.minimum_width, Some(100));
        assert_eq!(config.decode_cache_capacity, 1);
    }

    #[test]
    fn empty_env_keeps_defaults() {
        let config = TerminalConfig::default().apply_env(env(&[])).unwrap();
        assert_eq!(config, TerminalConfig::default());
    }

    #[test]
    fn invalid_number_is_reported() {
        let err = TerminalConfig::default()
            .apply_env(env(&[(ENV_HEIGHT, "tall")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                key: ENV_HEIGHT.to_owned(),
                value: "tall".to_owned()
            }
        );
        assert!(err.to_string().contains("FOLDTERM_HEIGHT"));
    }

    #[test]
    fn zero_width_is_rejected() {
        let err = TerminalConfig::default()
            .apply_env(env(&[(ENV_WIDTH, "0")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::ZeroDimension {
                key: ENV_WIDTH.to_owned()
            }
        );
    }

    #[test]
    fn fold_width_respects_minimum() {
        let config = TerminalConfig::default().with_minimum_width(100);
        assert_eq!(config.fold_width(80), 100);
        assert_eq!(config.fold_width(120), 120);
        assert_eq!(TerminalConfig::default().fold_width(40), 40);
    }
}
