//! The loaded dynamic library.

use std::io::Write;
use std::path::{Path, PathBuf};

use libloading::Library;
use tempfile::TempPath;
use tether_abi::{
    ABI_VERSION, BUFFER_FREE_SYMBOL, BufferFFI, BufferFreeFn, HELLO_SYMBOL, HelloFn, INIT_SYMBOL,
    InitFn, MANIFEST_SYMBOL, ManifestFn, STATUS_CALL_ERROR, STATUS_INVALID_ARGUMENT, STATUS_OK,
    STATUS_PANIC,
};
use tracing::debug;

use crate::declare::{HELLO, NativeExports};
use crate::error::{CallError, CallFailure, LoadError};
use crate::manifest::ModuleManifest;

/// A native module opened through the platform dynamic loader.
///
/// The library stays mapped for as long as this value lives. The resolved
/// function pointers are only valid while `_library` is alive. Fields drop in
/// declaration order, so the library is unmapped before a staged copy is
/// deleted.
pub struct DylibModule {
    path: PathBuf,
    manifest: ModuleManifest,
    hello: HelloFn,
    buffer_free: BufferFreeFn,
    _library: Library,
    staged: Option<TempPath>,
}

impl std::fmt::Debug for DylibModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DylibModule")
            .field("path", &self.path)
            .field("staged", &self.staged.as_deref())
            .field("manifest", &self.manifest)
            .finish_non_exhaustive()
    }
}

/// The four required exports, resolved but not yet called.
#[derive(Clone, Copy)]
struct Exports {
    manifest: ManifestFn,
    init: InitFn,
    hello: HelloFn,
    buffer_free: BufferFreeFn,
}

impl Exports {
    fn resolve(library: &Library, path: &Path) -> Result<Self, LoadError> {
        Ok(Self {
            manifest: resolve(library, path, MANIFEST_SYMBOL)?,
            init: resolve(library, path, INIT_SYMBOL)?,
            hello: resolve(library, path, HELLO_SYMBOL)?,
            buffer_free: resolve(library, path, BUFFER_FREE_SYMBOL)?,
        })
    }

    /// Read the manifest, check the ABI revision and run the module's init.
    fn handshake(&self, path: &Path) -> Result<ModuleManifest, LoadError> {
        // SAFETY: `manifest` has the declared ABI signature and returns a
        // pointer to static data inside the still-mapped library.
        let manifest = unsafe { ModuleManifest::from_raw((self.manifest)()) }.map_err(|reason| {
            LoadError::Manifest {
                path: path.to_path_buf(),
                reason,
            }
        })?;

        if manifest.abi_version != ABI_VERSION {
            return Err(LoadError::AbiVersion {
                path: path.to_path_buf(),
                expected: ABI_VERSION,
                found: manifest.abi_version,
            });
        }

        let mut error = BufferFFI::empty();
        // SAFETY: `init` has the declared ABI signature; `error` is a valid
        // write target.
        let status = unsafe { (self.init)(ABI_VERSION, &raw mut error) };
        // SAFETY: `error` was written by this module (or left empty).
        let message = unsafe { take_text(self.buffer_free, error) };
        if status != STATUS_OK {
            return Err(LoadError::Init {
                path: path.to_path_buf(),
                status,
                message,
            });
        }
        Ok(manifest)
    }
}

impl DylibModule {
    /// Open the library at `path`, read its manifest and initialize it.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the file cannot be opened, a required symbol
    /// is missing, the manifest is malformed, the ABI revision differs, or the
    /// module's init export fails.
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        Self::load(path, path, None)
    }

    /// Load `bytes`, already verified as the contents of `path`.
    ///
    /// The bytes are written to a private staged copy and that copy is what
    /// the dynamic loader maps, so later changes to `path` cannot affect the
    /// loaded code. The copy is placed next to `path` when that directory is
    /// writable, otherwise in the system temp directory, and is deleted when
    /// the module is dropped.
    ///
    /// # Errors
    ///
    /// [`LoadError::Stage`] if no copy can be written, otherwise as
    /// [`DylibModule::open`].
    pub fn open_verified(path: &Path, bytes: &[u8]) -> Result<Self, LoadError> {
        let staged = stage(path, bytes)?;
        debug!(path = %path.display(), staged = %staged.display(), "loading staged copy");
        let load_path = staged.to_path_buf();
        Self::load(&load_path, path, Some(staged))
    }

    fn load(load_path: &Path, path: &Path, staged: Option<TempPath>) -> Result<Self, LoadError> {
        // SAFETY: loading a library runs its initializers. The path was chosen
        // by the host configuration and is trusted to be a Tether module.
        let library = unsafe { Library::new(load_path) }.map_err(|e| LoadError::open(path, e))?;
        let exports = Exports::resolve(&library, path)?;
        let manifest = exports.handshake(path)?;

        debug!(
            path = %path.display(),
            module = %manifest.name,
            version = %manifest.version,
            operations = manifest.operations.len(),
            "native module initialized"
        );

        Ok(Self {
            path: path.to_path_buf(),
            manifest,
            hello: exports.hello,
            buffer_free: exports.buffer_free,
            _library: library,
            staged,
        })
    }

    /// Path the library was resolved to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File the dynamic loader actually mapped: the staged copy for a
    /// hash-pinned load, otherwise [`DylibModule::path`].
    #[must_use]
    pub fn loaded_from(&self) -> &Path {
        self.staged.as_deref().unwrap_or(&self.path)
    }

    fn call(&self, operation: &'static str, f: HelloFn) -> Result<Vec<u8>, CallError> {
        call_raw(self.buffer_free, f).map_err(|failure| CallError::new(operation, failure))
    }
}

impl NativeExports for DylibModule {
    fn manifest(&self) -> &ModuleManifest {
        &self.manifest
    }

    fn hello(&self) -> Result<String, CallError> {
        let bytes = self.call(HELLO.name, self.hello)?;
        String::from_utf8(bytes).map_err(|e| {
            CallError::new(HELLO.name, CallFailure::MalformedOutput(e.to_string()))
        })
    }
}

/// Invoke an output-only export and translate its status code.
fn call_raw(free: BufferFreeFn, f: HelloFn) -> Result<Vec<u8>, CallFailure> {
    let mut out = BufferFFI::empty();
    // SAFETY: `f` was resolved from a library the caller keeps mapped; `out`
    // is a valid write target.
    let status = unsafe { f(&raw mut out) };
    // SAFETY: `out` was written by the same module as `free` (or left empty).
    let bytes = unsafe { take_bytes(free, out) };
    match status {
        STATUS_OK => Ok(bytes),
        STATUS_CALL_ERROR => Err(CallFailure::Reported(lossy(&bytes))),
        STATUS_PANIC => Err(CallFailure::Panicked(lossy(&bytes))),
        STATUS_INVALID_ARGUMENT => Err(CallFailure::InvalidArgument),
        status => Err(CallFailure::UnknownStatus {
            status,
            message: lossy(&bytes),
        }),
    }
}

fn resolve<T: Copy>(library: &Library, path: &Path, symbol: &'static str) -> Result<T, LoadError> {
    // SAFETY: `T` is the function pointer type `tether_abi` declares for `symbol`.
    let sym = unsafe { library.get::<T>(symbol.as_bytes()) }.map_err(|e| {
        LoadError::MissingSymbol {
            path: path.to_path_buf(),
            symbol,
            message: e.to_string(),
        }
    })?;
    Ok(*sym)
}

/// Write `bytes` to a fresh private file that keeps `path`'s extension.
fn stage(path: &Path, bytes: &[u8]) -> Result<TempPath, LoadError> {
    let suffix = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let mut builder = tempfile::Builder::new();
    builder.prefix(".tether-staged-").suffix(&suffix);

    let beside = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf);
    let mut last_error = None;
    for dir in beside.into_iter().chain([std::env::temp_dir()]) {
        let staged = builder.tempfile_in(&dir).and_then(|mut file| {
            file.write_all(bytes)?;
            file.as_file().sync_all()?;
            Ok(file.into_temp_path())
        });
        match staged {
            Ok(staged) => return Ok(staged),
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "cannot stage native module here");
                last_error = Some(e);
            },
        }
    }
    Err(LoadError::Stage {
        path: path.to_path_buf(),
        message: last_error.map_or_else(|| "no staging directory".to_owned(), |e| e.to_string()),
    })
}

/// Copy the bytes out of a module-owned buffer and hand it back for freeing.
///
/// # Safety
///
/// `buffer` must be empty or have been produced by the module `free` belongs to.
unsafe fn take_bytes(free: BufferFreeFn, buffer: BufferFFI) -> Vec<u8> {
    if buffer.ptr.is_null() {
        return Vec::new();
    }
    // SAFETY: live allocation per the caller contract.
    let bytes = unsafe { buffer.as_bytes() }.to_vec();
    // SAFETY: returned to the allocating module exactly once.
    unsafe { free(buffer) };
    bytes
}

/// # Safety
///
/// Same as [`take_bytes`].
unsafe fn take_text(free: BufferFreeFn, buffer: BufferFFI) -> String {
    // SAFETY: forwarded caller contract.
    lossy(&unsafe { take_bytes(free, buffer) })
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
