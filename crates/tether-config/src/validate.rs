//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Length of a blake3 digest in hex.
const BLAKE3_HEX_LEN: usize = 64;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_native(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_native(config: &Config) -> ConfigResult<()> {
    let native = &config.native;

    if let Some(hash) = &native.hash {
        let well_formed = hash.len() == BLAKE3_HEX_LEN
            && hash
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if !well_formed {
            return Err(ConfigError::ValidationError {
                field: "native.hash".to_owned(),
                message: format!(
                    "expected {BLAKE3_HEX_LEN} lowercase hex characters (blake3), got '{hash}'"
                ),
            });
        }
    }

    if native.require_hash && native.hash.is_none() {
        return Err(ConfigError::ValidationError {
            field: "native.require_hash".to_owned(),
            message: "require_hash is set but native.hash is missing".to_owned(),
        });
    }

    if let Some(path) = &native.path
        && path.as_os_str().is_empty()
    {
        return Err(ConfigError::ValidationError {
            field: "native.path".to_owned(),
            message: "path must not be empty".to_owned(),
        });
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !matches!(
        l.level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unsupported level '{}'; expected one of: trace, debug, info, warn, error",
                l.level
            ),
        });
    }

    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        });
    }

    match (l.target.as_str(), &l.directory) {
        ("stderr" | "stdout", _) => {},
        ("file", Some(dir)) if !dir.as_os_str().is_empty() => {},
        ("file", _) => {
            return Err(ConfigError::ValidationError {
                field: "logging.directory".to_owned(),
                message: "required when logging.target is 'file'".to_owned(),
            });
        },
        (other, _) => {
            return Err(ConfigError::ValidationError {
                field: "logging.target".to_owned(),
                message: format!(
                    "unsupported target '{other}'; expected one of: stderr, stdout, file"
                ),
            });
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn short_hash_is_rejected() {
        let mut config = Config::default();
        config.native.hash = Some("abc123".to_owned());
        let err = validate(&config).unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { ref field, .. } if field == "native.hash")
        );
    }

    #[test]
    fn uppercase_hash_is_rejected() {
        let mut config = Config::default();
        config.native.hash = Some("A".repeat(64));
        assert!(validate(&config).is_err());
    }

    #[test]
    fn well_formed_hash_passes() {
        let mut config = Config::default();
        config.native.hash = Some("0f".repeat(32));
        config.native.require_hash = true;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn require_hash_without_hash_fails() {
        let mut config = Config::default();
        config.native.require_hash = true;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("native.require_hash"));
    }

    #[test]
    fn unknown_log_format_fails() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn file_target_needs_a_directory() {
        let mut config = Config::default();
        config.logging.target = "file".to_owned();
        let err = validate(&config).unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError { ref field, .. } if field == "logging.directory")
        );

        config.logging.directory = Some("/var/log/tether".into());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn unknown_log_target_fails() {
        let mut config = Config::default();
        config.logging.target = "syslog".to_owned();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("logging.target"), "{err}");
    }
}
