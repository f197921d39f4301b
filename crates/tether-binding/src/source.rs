//! Where native modules come from.

use std::path::{Path, PathBuf};

use tether_abi::LIBRARY_NAME;
use tether_config::{Config, NativeSection};
use tracing::{debug, warn};

use crate::declare::NativeExports;
use crate::error::LoadError;
use crate::module::DylibModule;

/// Produces a native module on demand.
///
/// [`crate::Binding`] calls [`ModuleSource::open`] at most once per process;
/// tests substitute a source that counts how often it is asked.
pub trait ModuleSource: Send + Sync + 'static {
    /// The module type this source yields.
    type Module: NativeExports;

    /// Human-readable description for logs.
    fn describe(&self) -> String;

    /// Locate, open and initialize the module.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] describing the first step that failed.
    fn open(&self) -> Result<Self::Module, LoadError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Exact(PathBuf),
    Search(Vec<PathBuf>),
}

/// Opens the shared library from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DylibSource {
    location: Location,
    hash: Option<String>,
    require_hash: bool,
}

impl DylibSource {
    /// Open exactly this file.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::Exact(path.into()),
            hash: None,
            require_hash: false,
        }
    }

    /// Look for the platform library file name in each directory, in order.
    #[must_use]
    pub fn search(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            location: Location::Search(dirs.into_iter().collect()),
            hash: None,
            require_hash: false,
        }
    }

    /// Pin the blake3 digest the file must have.
    #[must_use]
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// Refuse to open a file when no digest is pinned.
    #[must_use]
    pub fn with_require_hash(mut self, require: bool) -> Self {
        self.require_hash = require;
        self
    }

    /// Build from the `[native]` configuration section.
    ///
    /// An explicit `path` wins; otherwise `search_dirs` are tried first,
    /// followed by [`default_search_dirs`].
    #[must_use]
    pub fn from_config(section: &NativeSection) -> Self {
        let base = match &section.path {
            Some(path) => Self::at(path.clone()),
            None => Self::search(
                section
                    .search_dirs
                    .iter()
                    .cloned()
                    .chain(default_search_dirs()),
            ),
        };
        Self {
            hash: section.hash.clone(),
            require_hash: section.require_hash,
            ..base
        }
    }

    /// The file that would be opened.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotFound`] listing every candidate path.
    pub fn resolve(&self) -> Result<PathBuf, LoadError> {
        let candidates = match &self.location {
            Location::Exact(path) => vec![path.clone()],
            Location::Search(dirs) => {
                let file_name = library_file_name();
                dirs.iter().map(|dir| dir.join(&file_name)).collect()
            },
        };
        for candidate in &candidates {
            if candidate.is_file() {
                return Ok(candidate.clone());
            }
            debug!(path = %candidate.display(), "native module candidate not present");
        }
        Err(LoadError::NotFound {
            searched: candidates,
        })
    }
}

impl ModuleSource for DylibSource {
    type Module = DylibModule;

    fn describe(&self) -> String {
        match &self.location {
            Location::Exact(path) => path.display().to_string(),
            Location::Search(dirs) => format!(
                "{} in {} directories",
                library_file_name().display(),
                dirs.len()
            ),
        }
    }

    fn open(&self) -> Result<DylibModule, LoadError> {
        let path = self.resolve()?;
        match verify_hash(&path, self.hash.as_deref(), self.require_hash)? {
            Some(verified) => DylibModule::open_verified(&path, &verified),
            None => DylibModule::open(&path),
        }
    }
}

/// Check `path` against a pinned blake3 digest.
///
/// The digest may carry a `blake3:` prefix. With no digest pinned the check
/// passes unless `require` is set, and yields `None`. A pinned check yields
/// the bytes that were hashed; only those bytes may be loaded.
///
/// # Errors
///
/// Returns [`LoadError::HashRequired`], [`LoadError::Read`] or
/// [`LoadError::HashMismatch`].
pub fn verify_hash(
    path: &Path,
    expected: Option<&str>,
    require: bool,
) -> Result<Option<Vec<u8>>, LoadError> {
    let Some(expected) = expected else {
        if require {
            return Err(LoadError::HashRequired {
                path: path.to_path_buf(),
            });
        }
        warn!(path = %path.display(), "loading native module without a pinned hash");
        return Ok(None);
    };
    let expected = expected.strip_prefix("blake3:").unwrap_or(expected);

    let bytes = std::fs::read(path).map_err(|e| LoadError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let actual = blake3::hash(&bytes).to_hex().to_string();

    if actual.eq_ignore_ascii_case(expected) {
        debug!(path = %path.display(), hash = %actual, "native module hash verified");
        Ok(Some(bytes))
    } else {
        Err(LoadError::HashMismatch {
            path: path.to_path_buf(),
            expected: expected.to_owned(),
            actual,
        })
    }
}

/// Platform file name of the native library (`libtether_native.so`, ...).
#[must_use]
pub fn library_file_name() -> PathBuf {
    PathBuf::from(libloading::library_filename(LIBRARY_NAME))
}

/// The running executable's directory and its parent.
///
/// Cargo places test binaries in `target/<profile>/deps` and the cdylib in
/// `target/<profile>`, so the parent covers `cargo test`.
#[must_use]
pub fn default_search_dirs() -> Vec<PathBuf> {
    let Ok(exe) = std::env::current_exe() else {
        return Vec::new();
    };
    exe.ancestors().skip(1).take(2).map(Path::to_path_buf).collect()
}

/// Resolves the library from layered configuration on first open.
///
/// This is the source behind the process-wide [`crate::hello`].
#[derive(Debug, Clone, Default)]
pub struct ConfiguredSource {
    workspace_root: Option<PathBuf>,
}

impl ConfiguredSource {
    /// Read workspace configuration from `root/.tether/config.toml`.
    #[must_use]
    pub fn new(workspace_root: Option<PathBuf>) -> Self {
        Self { workspace_root }
    }

    /// Use the current directory as the workspace root.
    #[must_use]
    pub fn from_current_dir() -> Self {
        Self::new(std::env::current_dir().ok())
    }
}

impl ModuleSource for ConfiguredSource {
    type Module = DylibModule;

    fn describe(&self) -> String {
        match &self.workspace_root {
            Some(root) => format!("configuration under {}", root.display()),
            None => "user configuration".to_owned(),
        }
    }

    fn open(&self) -> Result<DylibModule, LoadError> {
        let resolved = Config::load(self.workspace_root.as_deref())
            .map_err(|e| LoadError::Config(e.to_string()))?;
        DylibSource::from_config(&resolved.config.native).open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_path_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.so");
        let err = DylibSource::at(&path).resolve().unwrap_err();
        assert_eq!(
            err,
            LoadError::NotFound {
                searched: vec![path]
            }
        );
    }

    #[test]
    fn search_lists_every_candidate() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let source = DylibSource::search([a.path().to_path_buf(), b.path().to_path_buf()]);
        let LoadError::NotFound { searched } = source.resolve().unwrap_err() else {
            panic!("expected NotFound");
        };
        assert_eq!(
            searched,
            vec![
                a.path().join(library_file_name()),
                b.path().join(library_file_name()),
            ]
        );
    }

    #[test]
    fn search_takes_first_hit() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let hit = b.path().join(library_file_name());
        std::fs::write(&hit, b"x").unwrap();
        let source = DylibSource::search([a.path().to_path_buf(), b.path().to_path_buf()]);
        assert_eq!(source.resolve().unwrap(), hit);
    }

    #[test]
    fn from_config_prefers_explicit_path() {
        let section = NativeSection {
            path: Some(PathBuf::from("/opt/tether/lib.so")),
            search_dirs: vec![PathBuf::from("/ignored")],
            hash: Some("ab".repeat(32)),
            require_hash: true,
        };
        let source = DylibSource::from_config(&section);
        assert_eq!(
            source,
            DylibSource::at("/opt/tether/lib.so")
                .with_hash("ab".repeat(32))
                .with_require_hash(true)
        );
    }

    #[test]
    fn from_config_searches_configured_dirs_first() {
        let section = NativeSection {
            search_dirs: vec![PathBuf::from("/first")],
            ..NativeSection::default()
        };
        let source = DylibSource::from_config(&section);
        let Location::Search(dirs) = source.location else {
            panic!("expected a search");
        };
        assert_eq!(dirs.first(), Some(&PathBuf::from("/first")));
        assert_eq!(&dirs[1..], default_search_dirs().as_slice());
    }

    #[test]
    fn hash_match_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.so");
        std::fs::write(&path, b"module bytes").unwrap();
        let digest = blake3::hash(b"module bytes").to_hex().to_string();

        assert_eq!(
            verify_hash(&path, Some(&digest), true).unwrap().as_deref(),
            Some(&b"module bytes"[..])
        );
        assert!(verify_hash(&path, Some(&format!("blake3:{digest}")), false).is_ok());
    }

    #[test]
    fn hash_mismatch_reports_both_digests() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.so");
        std::fs::write(&path, b"tampered").unwrap();
        let expected = "00".repeat(32);

        let err = verify_hash(&path, Some(&expected), false).unwrap_err();
        let LoadError::HashMismatch {
            expected: e,
            actual,
            ..
        } = err
        else {
            panic!("expected HashMismatch, got {err:?}");
        };
        assert_eq!(e, expected);
        assert_eq!(actual, blake3::hash(b"tampered").to_hex().to_string());
    }

    #[test]
    fn missing_hash_respects_require_flag() {
        let path = Path::new("/does/not/matter.so");
        assert_eq!(verify_hash(path, None, false), Ok(None));
        assert_eq!(
            verify_hash(path, None, true),
            Err(LoadError::HashRequired {
                path: path.to_path_buf()
            })
        );
    }

    #[test]
    fn hash_check_surfaces_read_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.so");
        let err = verify_hash(&path, Some(&"00".repeat(32)), false).unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }), "{err:?}");
    }

    #[test]
    fn open_garbage_passes_hash_then_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(library_file_name());
        std::fs::write(&path, b"garbage").unwrap();
        let digest = blake3::hash(b"garbage").to_hex().to_string();

        let err = DylibSource::at(&path).with_hash(digest).open().unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }), "{err:?}");
    }

    #[test]
    fn configured_source_reports_bad_config() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join(".tether");
        std::fs::create_dir_all(&cfg).unwrap();
        std::fs::write(cfg.join("config.toml"), "[native]\nhash = \"short\"\n").unwrap();

        let err = ConfiguredSource::new(Some(dir.path().to_path_buf()))
            .open()
            .unwrap_err();
        assert!(matches!(err, LoadError::Config(_)), "{err:?}");
    }
}
