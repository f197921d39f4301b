//! Binding error types.
//!
//! Every error here is `Clone`: a failed load is cached for the life of the
//! process and handed to every later caller.

use std::path::{Path, PathBuf};

use tether_abi::TypeTag;
use thiserror::Error;

/// The native module could not be found, opened, or initialized.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    /// No candidate path held the library.
    #[error("native module not found; searched: {}", display_paths(.searched))]
    NotFound {
        /// Every candidate path, in order.
        searched: Vec<PathBuf>,
    },

    /// The dynamic loader rejected the file (missing, wrong platform, corrupt).
    #[error("failed to open native module {path}: {message}")]
    Open {
        /// Library path.
        path: PathBuf,
        /// Loader diagnostic.
        message: String,
    },

    /// A required export is absent.
    #[error("native module {path} does not export `{symbol}`: {message}")]
    MissingSymbol {
        /// Library path.
        path: PathBuf,
        /// The symbol that failed to resolve.
        symbol: &'static str,
        /// Loader diagnostic.
        message: String,
    },

    /// The module's manifest could not be decoded.
    #[error("native module {path} has an unreadable manifest: {reason}")]
    Manifest {
        /// Library path.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// The module was built against another ABI revision.
    #[error(
        "native module {path} has ABI version {found}, host implements ABI version {expected}"
    )]
    AbiVersion {
        /// Library path.
        path: PathBuf,
        /// Revision the host implements.
        expected: u32,
        /// Revision the module reports.
        found: u32,
    },

    /// The module's init export reported failure.
    #[error("native module {path} failed to initialize (status {status}): {message}")]
    Init {
        /// Library path.
        path: PathBuf,
        /// Raw status code.
        status: i32,
        /// Message written by the module.
        message: String,
    },

    /// The library file could not be read for hashing.
    #[error("failed to read native module {path}: {message}")]
    Read {
        /// Library path.
        path: PathBuf,
        /// I/O diagnostic.
        message: String,
    },

    /// The library file does not have the pinned blake3 digest.
    #[error("hash mismatch for {path}: expected {expected}, got {actual}")]
    HashMismatch {
        /// Library path.
        path: PathBuf,
        /// Configured digest.
        expected: String,
        /// Digest of the file on disk.
        actual: String,
    },

    /// A digest is required but none was configured.
    #[error("native module {path} has no pinned hash but one is required")]
    HashRequired {
        /// Library path.
        path: PathBuf,
    },

    /// The verified bytes could not be staged for loading.
    #[error("failed to stage native module {path}: {message}")]
    Stage {
        /// Library path.
        path: PathBuf,
        /// I/O diagnostic.
        message: String,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// Locating or opening the module panicked.
    #[error("native module load panicked: {0}")]
    Panicked(String),
}

impl LoadError {
    pub(crate) fn open(path: &Path, message: impl ToString) -> Self {
        Self::Open {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "<no candidates>".to_owned();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// How a native call went wrong.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallFailure {
    /// The operation reported an error message.
    #[error("{0}")]
    Reported(String),
    /// The operation panicked inside the module.
    #[error("panicked: {0}")]
    Panicked(String),
    /// The module rejected an argument pointer.
    #[error("invalid argument")]
    InvalidArgument,
    /// The module returned a status code outside the ABI.
    #[error("unknown status code {status}: {message}")]
    UnknownStatus {
        /// Raw status code.
        status: i32,
        /// Whatever the module wrote to the buffer.
        message: String,
    },
    /// The output did not match the declared return type.
    #[error("malformed output: {0}")]
    MalformedOutput(String),
}

/// A native operation failed during execution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("native operation `{operation}` failed: {failure}")]
pub struct CallError {
    /// Declared operation name.
    pub operation: &'static str,
    /// What happened.
    pub failure: CallFailure,
}

impl CallError {
    /// Build a call error for `operation`.
    #[must_use]
    pub fn new(operation: &'static str, failure: CallFailure) -> Self {
        Self { operation, failure }
    }
}

/// Why a declaration disagrees with the module's manifest.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MismatchReason {
    /// The manifest does not list the operation.
    #[error("operation is not exported")]
    Missing,
    /// Parameter lists differ.
    #[error("parameters differ: declared ({declared}), exported ({exported})")]
    Params {
        /// Declared parameter list.
        declared: String,
        /// Exported parameter list.
        exported: String,
    },
    /// Return types differ.
    #[error("return type differs: declared {declared}, exported {exported}")]
    Return {
        /// Declared return type.
        declared: TypeTag,
        /// Exported return type.
        exported: TypeTag,
    },
    /// One side says the operation can fail, the other says it cannot.
    #[error("fallibility differs: declared {declared}, exported {exported}")]
    Fallibility {
        /// Declared fallibility.
        declared: bool,
        /// Exported fallibility.
        exported: bool,
    },
}

/// A host declaration is not honored by the loaded module.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("declared operation `{operation}` does not match the native module: {reason}")]
pub struct ContractMismatch {
    /// Declared operation name.
    pub operation: &'static str,
    /// The first disagreement found.
    pub reason: MismatchReason,
}

/// Coarse classification of a [`BindingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`LoadError`].
    Load,
    /// See [`ContractMismatch`].
    ContractMismatch,
    /// See [`CallError`].
    Call,
}

/// Any failure surfaced by the binding layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BindingError {
    /// The module could not be loaded. Permanent for the process.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// The module loaded but failed signature verification. Permanent for the process.
    #[error(transparent)]
    Contract(#[from] ContractMismatch),
    /// A single native call failed.
    #[error(transparent)]
    Call(#[from] CallError),
}

impl BindingError {
    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Load(_) => ErrorKind::Load,
            Self::Contract(_) => ErrorKind::ContractMismatch,
            Self::Call(_) => ErrorKind::Call,
        }
    }
}

/// Result type for binding operations.
pub type BindingResult<T> = Result<T, BindingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_lists_candidates() {
        let err = LoadError::NotFound {
            searched: vec![PathBuf::from("/a/lib.so"), PathBuf::from("/b/lib.so")],
        };
        assert_eq!(
            err.to_string(),
            "native module not found; searched: /a/lib.so, /b/lib.so"
        );
    }

    #[test]
    fn abi_mismatch_names_the_library() {
        let err = LoadError::AbiVersion {
            path: PathBuf::from("/opt/libtether_native.so"),
            expected: 1,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "native module /opt/libtether_native.so has ABI version 2, host implements ABI version 1"
        );
    }

    #[test]
    fn call_error_names_operation_and_cause() {
        let err = CallError::new("hello", CallFailure::Reported("disk on fire".into()));
        assert_eq!(
            err.to_string(),
            "native operation `hello` failed: disk on fire"
        );
    }

    #[test]
    fn contract_mismatch_names_operation() {
        let err = ContractMismatch {
            operation: "hello",
            reason: MismatchReason::Return {
                declared: TypeTag::Text,
                exported: TypeTag::Bytes,
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("`hello`"), "{msg}");
        assert!(msg.contains("declared text, exported bytes"), "{msg}");
    }

    #[test]
    fn kinds_are_distinguishable() {
        let load: BindingError = LoadError::Config("bad".into()).into();
        let call: BindingError = CallError::new("hello", CallFailure::InvalidArgument).into();
        let contract: BindingError = ContractMismatch {
            operation: "hello",
            reason: MismatchReason::Missing,
        }
        .into();
        assert_eq!(load.kind(), ErrorKind::Load);
        assert_eq!(call.kind(), ErrorKind::Call);
        assert_eq!(contract.kind(), ErrorKind::ContractMismatch);
    }
}
