//! CLI command implementations.

pub(crate) mod greeting;
pub(crate) mod hello;
pub(crate) mod inspect;

use std::path::PathBuf;

use anyhow::Result;
use tether_binding::DylibSource;
use tether_config::{ConfigResult, NativeSection};
use tracing::warn;

/// The `[native]` section to use for this invocation.
///
/// A configuration that fails to load is fatal unless `--library` names the
/// module directly, in which case no pin or search settings apply.
pub(crate) fn native_section(
    config: ConfigResult<NativeSection>,
    library: Option<&PathBuf>,
) -> Result<NativeSection> {
    match (config, library) {
        (Ok(section), _) => Ok(section),
        (Err(e), Some(path)) => {
            warn!(
                error = %e,
                library = %path.display(),
                "configuration failed to load, using --library without a hash pin"
            );
            Ok(NativeSection::default())
        },
        (Err(e), None) => Err(e.into()),
    }
}

/// The library source for this invocation.
///
/// `--library` replaces the configured path and search directories; the
/// configured hash pin still applies.
pub(crate) fn native_source(section: &NativeSection, library: Option<PathBuf>) -> DylibSource {
    match library {
        Some(path) => {
            let source = DylibSource::at(path).with_require_hash(section.require_hash);
            match &section.hash {
                Some(hash) => source.with_hash(hash.clone()),
                None => source,
            }
        },
        None => DylibSource::from_config(section),
    }
}

#[cfg(test)]
mod tests {
    use tether_config::ConfigError;

    use super::*;

    fn broken_config() -> ConfigResult<NativeSection> {
        Err(ConfigError::ValidationError {
            field: "native.hash".to_owned(),
            message: "must be 64 lowercase hex characters".to_owned(),
        })
    }

    #[test]
    fn library_flag_survives_a_broken_config() {
        let flag = PathBuf::from("/flag.so");
        let section = native_section(broken_config(), Some(&flag)).unwrap();
        assert_eq!(section, NativeSection::default());
        assert_eq!(
            native_source(&section, Some(flag)),
            DylibSource::at("/flag.so")
        );
    }

    #[test]
    fn broken_config_without_library_flag_is_fatal() {
        let err = native_section(broken_config(), None).unwrap_err();
        assert!(err.to_string().contains("native.hash"), "{err}");
    }

    #[test]
    fn loaded_config_is_used_as_is() {
        let section = NativeSection {
            require_hash: true,
            hash: Some("ab".repeat(32)),
            ..NativeSection::default()
        };
        let flag = PathBuf::from("/flag.so");
        assert_eq!(
            native_section(Ok(section.clone()), Some(&flag)).unwrap(),
            section
        );
    }

    #[test]
    fn library_flag_overrides_location_but_keeps_pin() {
        let section = NativeSection {
            path: Some(PathBuf::from("/configured.so")),
            hash: Some("ab".repeat(32)),
            ..NativeSection::default()
        };
        let source = native_source(&section, Some(PathBuf::from("/flag.so")));
        assert_eq!(
            source,
            DylibSource::at("/flag.so").with_hash("ab".repeat(32))
        );
    }

    #[test]
    fn no_flag_uses_configuration() {
        let section = NativeSection {
            path: Some(PathBuf::from("/configured.so")),
            ..NativeSection::default()
        };
        assert_eq!(
            native_source(&section, None),
            DylibSource::from_config(&section)
        );
    }
}
