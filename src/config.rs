// src/config.rs
//! Flat `key = value` configuration.
//!
//! Lines are trimmed; blank lines and lines starting with `#` are skipped;
//! anything without an `=` is ignored. Values are stored as strings and
//! converted on access with a deliberately lenient policy: a missing key
//! yields the caller's default, while a present-but-unparsable number yields
//! zero. This is an ordinary value threaded through at startup, not a
//! process-wide singleton.

use std::path::Path;

use anyhow::{Context, Result};
use hashbrown::HashMap;

#[derive(Clone, Debug, Default)]
pub struct Config {
    values: HashMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::new();
        config.merge_file(path)?;
        Ok(config)
    }

    /// Overlay a file's pairs on top of whatever is already set.
    pub fn merge_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("open config file {:?}", path))?;
        self.merge_str(&text);
        Ok(())
    }

    /// Parse `key = value` lines into this config, overwriting duplicates.
    pub fn merge_str(&mut self, text: &str) {
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            self.values
                .insert(key.trim().to_owned(), value.trim().to_owned());
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_owned(), value.to_owned());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_u64(&self, key: &str, default: u64) -> u64 {
        match self.get(key) {
            None => default,
            Some(raw) => raw.parse().unwrap_or(0),
        }
    }

    pub fn get_usize(&self, key: &str, default: usize) -> usize {
        match self.get(key) {
            None => default,
            Some(raw) => raw.parse().unwrap_or(0),
        }
    }

    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        match self.get(key) {
            None => default,
            Some(raw) => raw.parse().unwrap_or(0.0),
        }
    }

    /// Comma-separated list; entries are trimmed, empties dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keys_comments_and_blanks() {
        let mut config = Config::new();
        config.merge_str(
            "# header comment\n\
             market_data.buffer_size = 65536\n\
             \n\
             symbols = AAPL, MSFT ,GOOG\n\
             not a pair\n\
             strategy.stat_arb.z_score_threshold = 2.5\n",
        );

        assert_eq!(config.get_u64("market_data.buffer_size", 0), 65536);
        assert_eq!(config.get_list("symbols"), vec!["AAPL", "MSFT", "GOOG"]);
        assert_eq!(config.get_f64("strategy.stat_arb.z_score_threshold", 0.0), 2.5);
        assert!(!config.has("not a pair"));
    }

    #[test]
    fn missing_key_yields_default_bad_value_yields_zero() {
        let mut config = Config::new();
        config.set("window", "not-a-number");

        assert_eq!(config.get_u64("window", 100), 0);
        assert_eq!(config.get_u64("absent", 100), 100);
        assert_eq!(config.get_f64("window", 1.5), 0.0);
        assert_eq!(config.get_f64("absent", 1.5), 1.5);
    }

    #[test]
    fn later_values_win() {
        let mut config = Config::new();
        config.merge_str("a = 1\na = 2\n");
        assert_eq!(config.get_u64("a", 0), 2);
    }

    #[test]
    fn empty_list_for_missing_key() {
        let config = Config::new();
        assert!(config.get_list("symbols").is_empty());
    }
}
