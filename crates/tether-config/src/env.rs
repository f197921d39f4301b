//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they only apply to fields that no
//! config file set.

use std::collections::HashMap;
use std::ffi::OsString;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources, set_nested};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// All supported `TETHER_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "TETHER_NATIVE_PATH",
        field_path: "native.path",
    },
    EnvMapping {
        var_name: "TETHER_NATIVE_HASH",
        field_path: "native.hash",
    },
    EnvMapping {
        var_name: "TETHER_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "TETHER_LOG_FORMAT",
        field_path: "logging.format",
    },
    EnvMapping {
        var_name: "TETHER_LOG_DIR",
        field_path: "logging.directory",
    },
];

/// Prefix shared by every variable this crate reads.
const ENV_PREFIX: &str = "TETHER_";

/// Snapshot the process environment, keeping only `TETHER_*` variables.
///
/// Entries that are not valid UTF-8 are skipped, whatever their name.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    tether_vars(std::env::vars_os())
}

fn tether_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> HashMap<String, String> {
    vars.into_iter()
        .filter_map(|(key, value)| {
            let key = key.into_string().ok()?;
            if !key.starts_with(ENV_PREFIX) {
                return None;
            }
            match value.into_string() {
                Ok(value) => Some((key, value)),
                Err(_) => {
                    debug!(var = %key, "env var ignored, value is not UTF-8");
                    None
                },
            }
        })
        .collect()
}

/// Apply environment variable fallbacks to fields that were **not** set by
/// any config file layer.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let Some(value) = env_vars.get(mapping.var_name) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }

        let set_by_file = matches!(
            sources.get(mapping.field_path),
            Some(ConfigLayer::User | ConfigLayer::Workspace)
        );
        if set_by_file {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "env var ignored, field set by config file"
            );
            continue;
        }

        set_nested(merged, mapping.field_path, toml::Value::String(value.clone()));
        sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
        count = count.saturating_add(1);
    }

    count
}
