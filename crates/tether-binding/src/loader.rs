//! One-shot, process-wide module loading.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::OnceLock;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::declare::{DECLARED_OPERATIONS, NativeExports, verify};
use crate::error::{BindingError, BindingResult, LoadError};
use crate::source::ModuleSource;

/// Where a [`ModuleCell`] stands.
///
/// `Loaded` and `Failed` are terminal: once either is observed, every later
/// observation returns the same state.
#[derive(Debug)]
pub enum LoadState<'a, M> {
    /// No load has been attempted yet.
    Unloaded,
    /// The module is open and verified.
    Loaded(&'a M),
    /// The single load attempt failed.
    Failed(&'a BindingError),
}

impl<M> LoadState<'_, M> {
    /// Short name for logs and CLI output.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loaded(_) => "loaded",
            Self::Failed(_) => "failed",
        }
    }
}

/// Holds the result of the one load attempt for a source.
///
/// Concurrent first callers block on the same attempt; the outcome, success
/// or failure, is never replaced.
pub(crate) struct ModuleCell<S: ModuleSource> {
    source: S,
    slot: OnceLock<BindingResult<S::Module>>,
}

impl<S: ModuleSource> ModuleCell<S> {
    pub(crate) const fn new(source: S) -> Self {
        Self {
            source,
            slot: OnceLock::new(),
        }
    }

    pub(crate) fn source(&self) -> &S {
        &self.source
    }

    pub(crate) fn get_or_load(&self) -> Result<&S::Module, &BindingError> {
        self.slot.get_or_init(|| self.load_once()).as_ref()
    }

    pub(crate) fn state(&self) -> LoadState<'_, S::Module> {
        match self.slot.get() {
            None => LoadState::Unloaded,
            Some(Ok(module)) => LoadState::Loaded(module),
            Some(Err(error)) => LoadState::Failed(error),
        }
    }

    fn load_once(&self) -> BindingResult<S::Module> {
        let source = self.source.describe();
        let started = Instant::now();
        debug!(%source, "loading native module");

        // A panicking source still settles the cell.
        let result = catch_unwind(AssertUnwindSafe(|| self.source.open()))
            .unwrap_or_else(|payload| Err(LoadError::Panicked(panic_message(&*payload))))
            .map_err(BindingError::from)
            .and_then(|module| {
                verify(module.manifest(), DECLARED_OPERATIONS)?;
                Ok(module)
            });

        let elapsed_ms = started.elapsed().as_millis();
        match &result {
            Ok(module) => {
                let manifest = module.manifest();
                for op in &manifest.operations {
                    if !DECLARED_OPERATIONS.iter().any(|sig| sig.name == op.name) {
                        debug!(operation = %op.name, "native module exports an undeclared operation");
                    }
                }
                info!(
                    %source,
                    module = %manifest.name,
                    version = %manifest.version,
                    elapsed_ms,
                    "native module loaded"
                );
            },
            Err(error) => warn!(%source, %error, elapsed_ms, "native module failed to load"),
        }
        result
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}
