//! Deep merge of TOML values.
//!
//! The merge operates on raw [`toml::Value`] trees rather than deserialized
//! structs, so a key missing from an overlay never clobbers the base layer.

use std::collections::HashMap;

use tracing::warn;

/// Which configuration layer a value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults (`defaults.toml`).
    Defaults,
    /// User-level configuration (`~/.tether/config.toml`).
    User,
    /// Workspace-level configuration (`{workspace}/.tether/config.toml`).
    Workspace,
    /// Environment variable fallback.
    Environment,
}

impl std::fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::User => write!(f, "user (~/.tether/config.toml)"),
            Self::Workspace => write!(f, "workspace (.tether/config.toml)"),
            Self::Environment => write!(f, "environment variable"),
        }
    }
}

/// Tracks which layer set each field's value.
pub type FieldSources = HashMap<String, ConfigLayer>;

/// Deep-merge `overlay` into `base`, recording which layer set each leaf
/// field.
///
/// - Tables merge recursively per-field.
/// - Scalars and arrays from the overlay **replace** the base value.
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = join_path(prefix, key);

                if let Some(base_val) = base_table.get_mut(key) {
                    if overlay_val.is_table() {
                        deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                    } else {
                        *base_val = overlay_val.clone();
                        sources.insert(path, layer.clone());
                    }
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                    record_leaves(overlay_val, &path, layer, sources);
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            sources.insert(prefix.to_owned(), layer.clone());
        },
    }
}

/// Walk a value tree and record all leaf paths with their source layer.
pub fn record_leaves(
    val: &toml::Value,
    prefix: &str,
    layer: &ConfigLayer,
    sources: &mut FieldSources,
) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            record_leaves(child, &join_path(prefix, key), layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer.clone());
    }
}

/// Set a value at a dotted path, creating intermediate tables as needed.
pub fn set_nested(val: &mut toml::Value, path: &str, new_val: toml::Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut current = val;
    for segment in segments {
        let Some(table) = current.as_table_mut() else {
            warn!("set_nested: '{segment}' is not inside a table; skipping");
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), new_val);
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> toml::Value {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn scalars_replace_and_siblings_survive() {
        let mut base = parse(
            r#"
            [logging]
            level = "info"
            format = "compact"
        "#,
        );
        let overlay = parse(
            r#"
            [logging]
            level = "debug"
        "#,
        );
        let mut sources = FieldSources::new();
        deep_merge_tracking(&mut base, &overlay, "", &ConfigLayer::User, &mut sources);

        let logging = base["logging"].as_table().unwrap();
        assert_eq!(logging["level"].as_str().unwrap(), "debug");
        assert_eq!(logging["format"].as_str().unwrap(), "compact");
        assert_eq!(sources.get("logging.level"), Some(&ConfigLayer::User));
        assert_eq!(sources.get("logging.format"), None);
    }

    #[test]
    fn new_tables_record_every_leaf() {
        let mut base = parse("[logging]\nlevel = \"info\"");
        let overlay = parse(
            r#"
            [native]
            path = "/opt/lib/libtether_native.so"
            require_hash = true
        "#,
        );
        let mut sources = FieldSources::new();
        deep_merge_tracking(
            &mut base,
            &overlay,
            "",
            &ConfigLayer::Workspace,
            &mut sources,
        );

        assert_eq!(
            base["native"]["path"].as_str().unwrap(),
            "/opt/lib/libtether_native.so"
        );
        assert_eq!(sources.get("native.path"), Some(&ConfigLayer::Workspace));
        assert_eq!(
            sources.get("native.require_hash"),
            Some(&ConfigLayer::Workspace)
        );
    }

    #[test]
    fn arrays_are_replaced_not_appended() {
        let mut base = parse("[native]\nsearch_dirs = [\"/a\", \"/b\"]");
        let overlay = parse("[native]\nsearch_dirs = [\"/c\"]");
        let mut sources = FieldSources::new();
        deep_merge_tracking(&mut base, &overlay, "", &ConfigLayer::User, &mut sources);

        let dirs = base["native"]["search_dirs"].as_array().unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].as_str().unwrap(), "/c");
    }

    #[test]
    fn set_nested_creates_missing_tables() {
        let mut base = parse("");
        set_nested(
            &mut base,
            "native.hash",
            toml::Value::String("ab".to_owned()),
        );
        assert_eq!(base["native"]["hash"].as_str().unwrap(), "ab");
    }
}
