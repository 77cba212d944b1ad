//! Environment configuration.

use std::path::PathBuf;
use std::str::FromStr;

use vocab_core::ImportOptions;

use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub import: ImportOptions,
    /// Extra attempts for an answer whose write hit a transient store failure.
    pub answer_retries: u32,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("vocab.db"),
            import: ImportOptions::default(),
            answer_retries: 2,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let database_path = lookup("VOCAB_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let import = ImportOptions {
            batch_size: parse_var(&lookup, "VOCAB_IMPORT_BATCH_SIZE", defaults.import.batch_size)?,
            max_field_length: parse_var(
                &lookup,
                "VOCAB_MAX_FIELD_LENGTH",
                defaults.import.max_field_length,
            )?,
            max_file_size: parse_var(&lookup, "VOCAB_MAX_FILE_SIZE", defaults.import.max_file_size)?,
        };
        if import.batch_size == 0 {
            return Err(AppError::Config(
                "VOCAB_IMPORT_BATCH_SIZE must be at least 1".to_string(),
            ));
        }

        let answer_retries = parse_var(&lookup, "VOCAB_ANSWER_RETRIES", defaults.answer_retries)?;
        let log_level = lookup("RUST_LOG").unwrap_or(defaults.log_level);

        Ok(Self {
            database_path,
            import,
            answer_retries,
            log_level,
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} has invalid value '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database_path, PathBuf::from("vocab.db"));
        assert_eq!(config.import, ImportOptions::default());
        assert_eq!(config.answer_retries, 2);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn overrides_from_environment() {
        let config = Config::from_lookup(lookup(&[
            ("VOCAB_DATABASE_PATH", "/tmp/words.db"),
            ("VOCAB_IMPORT_BATCH_SIZE", "250"),
            ("VOCAB_MAX_FIELD_LENGTH", " 20 "),
            ("VOCAB_MAX_FILE_SIZE", "1024"),
            ("RUST_LOG", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/words.db"));
        assert_eq!(config.import.batch_size, 250);
        assert_eq!(config.import.max_field_length, 20);
        assert_eq!(config.import.max_file_size, 1024);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn invalid_number_is_config_error() {
        let err = Config::from_lookup(lookup(&[("VOCAB_MAX_FILE_SIZE", "ten")])).unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("VOCAB_MAX_FILE_SIZE")));
    }

    #[test]
    fn zero_batch_size_rejected() {
        let err = Config::from_lookup(lookup(&[("VOCAB_IMPORT_BATCH_SIZE", "0")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
