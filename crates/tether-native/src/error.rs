use thiserror::Error;

/// Failures the native module reports across the boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NativeError {
    /// The host was built against a different ABI revision.
    #[error("host ABI version {host} is not supported by module ABI version {module}")]
    AbiMismatch {
        /// Revision passed in by the host.
        host: u32,
        /// Revision this module implements.
        module: u32,
    },
}

/// Result type for native operations.
pub type NativeResult<T> = Result<T, NativeError>;
