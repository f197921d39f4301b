//! Host-facing wrapper functions.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::binding::Binding;
use crate::error::BindingResult;
use crate::loader::LoadState;
use crate::manifest::ModuleManifest;
use crate::module::DylibModule;
use crate::source::ConfiguredSource;

/// Text returned by [`greeting`].
pub const GREETING_MESSAGE: &str = "hello";

/// Result of [`greeting`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Greeting {
    /// The greeting text.
    pub message: String,
}

/// A fixed greeting, computed entirely on the host.
///
/// Never touches the native module.
#[must_use]
pub fn greeting() -> Greeting {
    Greeting {
        message: GREETING_MESSAGE.to_owned(),
    }
}

static NATIVE: LazyLock<Binding<ConfiguredSource>> =
    LazyLock::new(|| Binding::new(ConfiguredSource::from_current_dir()));

/// The process-wide binding, configured from `.tether/config.toml` and
/// `TETHER_*` environment variables.
#[must_use]
pub fn native() -> &'static Binding<ConfiguredSource> {
    &NATIVE
}

/// Call the native `hello` operation on the process-wide module.
///
/// The first call loads the module.
///
/// # Errors
///
/// See [`Binding::hello`].
pub fn hello() -> BindingResult<String> {
    NATIVE.hello()
}

/// The process-wide module's manifest.
///
/// # Errors
///
/// See [`Binding::manifest`].
pub fn manifest() -> BindingResult<ModuleManifest> {
    NATIVE.manifest()
}

/// The process-wide module's load state. Never triggers a load.
pub fn state() -> LoadState<'static, DylibModule> {
    NATIVE.state()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_is_fixed() {
        assert_eq!(greeting(), greeting());
        assert_eq!(greeting().message, "hello");
    }

    #[test]
    fn greeting_serializes_as_message_object() {
        let json = serde_json::to_value(greeting()).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "hello" }));
    }

    #[test]
    fn greeting_does_not_load() {
        let _ = greeting();
        assert!(matches!(state(), LoadState::Unloaded));
    }
}
