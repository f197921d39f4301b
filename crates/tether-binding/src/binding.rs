use crate::declare::NativeExports;
use crate::error::{BindingError, BindingResult};
use crate::loader::{LoadState, ModuleCell};
use crate::manifest::ModuleManifest;
use crate::source::ModuleSource;

/// Lazily loaded handle to a native module.
///
/// The module is opened on first use and verified against the host's
/// declarations. Whatever that first attempt produced is returned to every
/// caller for the life of the value.
///
/// Most programs use the process-wide instance behind [`crate::hello`];
/// constructing a `Binding` directly is for tests and for hosts that manage
/// more than one library.
pub struct Binding<S: ModuleSource> {
    cell: ModuleCell<S>,
}

impl<S: ModuleSource> Binding<S> {
    /// Wrap `source` without loading anything.
    #[must_use]
    pub const fn new(source: S) -> Self {
        Self {
            cell: ModuleCell::new(source),
        }
    }

    /// The source this binding loads from.
    #[must_use]
    pub fn source(&self) -> &S {
        self.cell.source()
    }

    /// The loaded module, opening it on first call.
    ///
    /// # Errors
    ///
    /// Returns the cached [`BindingError::Load`] or [`BindingError::Contract`]
    /// from the single load attempt.
    pub fn load(&self) -> BindingResult<&S::Module> {
        self.cell.get_or_load().map_err(BindingError::clone)
    }

    /// Call the native `hello` operation.
    ///
    /// # Errors
    ///
    /// Returns a load error if the module is unavailable, or
    /// [`BindingError::Call`] if the call itself fails.
    pub fn hello(&self) -> BindingResult<String> {
        Ok(self.load()?.hello()?)
    }

    /// An owned copy of the loaded module's manifest.
    ///
    /// # Errors
    ///
    /// Returns a load error if the module is unavailable.
    pub fn manifest(&self) -> BindingResult<ModuleManifest> {
        Ok(self.load()?.manifest().clone())
    }

    /// Current load state. Never triggers a load.
    #[must_use]
    pub fn state(&self) -> LoadState<'_, S::Module> {
        self.cell.state()
    }
}

impl<S: ModuleSource + std::fmt::Debug> std::fmt::Debug for Binding<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("source", self.source())
            .field("state", &self.state().label())
            .finish()
    }
}
