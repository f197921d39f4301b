//! Raw C ABI for the Tether native module.
//!
//! This crate defines the lowest-level contract between the compiled native
//! module (`tether-native`) and the host binding (`tether-binding`). Nothing
//! here is safe to call directly: every type is `#[repr(C)]`, every function
//! pointer is `unsafe extern "C"`, and every byte buffer must be released by
//! the module that allocated it.
//!
//! All ergonomic typing (strings, structured results, error enums) is handled
//! entirely by the binding layer.

#![allow(unsafe_code)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod buffer;
mod manifest;

pub use buffer::BufferFFI;
pub use manifest::{ManifestFFI, OperationFFI, TypeTag};

/// ABI revision implemented by this crate.
///
/// Bumped whenever a symbol signature, a `#[repr(C)]` layout or the meaning of
/// a status code changes. The host passes its revision to
/// [`INIT_SYMBOL`] and the module refuses to initialize on mismatch.
pub const ABI_VERSION: u32 = 1;

/// Base name of the native library, without platform prefix or extension.
pub const LIBRARY_NAME: &str = "tether_native";

// ---------------------------------------------------------------------------
// Status codes
// ---------------------------------------------------------------------------

/// The call completed and the output buffer holds its result.
pub const STATUS_OK: i32 = 0;
/// The operation failed; the output buffer holds a UTF-8 message.
pub const STATUS_CALL_ERROR: i32 = -1;
/// The operation panicked; the output buffer holds the panic payload if it was a string.
pub const STATUS_PANIC: i32 = -2;
/// A pointer argument was null or otherwise unusable.
pub const STATUS_INVALID_ARGUMENT: i32 = -3;

// ---------------------------------------------------------------------------
// Exported symbols
// ---------------------------------------------------------------------------

/// `tether_module_manifest`: returns a pointer to a static [`ManifestFFI`].
pub const MANIFEST_SYMBOL: &str = "tether_module_manifest";
/// `tether_module_init`: one-time initialization, called before any operation.
pub const INIT_SYMBOL: &str = "tether_module_init";
/// `tether_hello`: the placeholder operation.
pub const HELLO_SYMBOL: &str = "tether_hello";
/// `tether_buffer_free`: releases a buffer allocated by the module.
pub const BUFFER_FREE_SYMBOL: &str = "tether_buffer_free";

/// Signature of [`MANIFEST_SYMBOL`].
///
/// The returned pointer references data with `'static` lifetime inside the
/// module and must never be freed by the caller.
pub type ManifestFn = unsafe extern "C" fn() -> *const ManifestFFI;

/// Signature of [`INIT_SYMBOL`].
///
/// Returns [`STATUS_OK`] on success. On failure `error` receives a UTF-8
/// message that the caller releases through [`BufferFreeFn`].
pub type InitFn = unsafe extern "C" fn(host_abi_version: u32, error: *mut BufferFFI) -> i32;

/// Signature of [`HELLO_SYMBOL`].
///
/// On [`STATUS_OK`] `out` receives UTF-8 text; on any other status it
/// receives a UTF-8 message. Either way the caller owns the buffer.
pub type HelloFn = unsafe extern "C" fn(out: *mut BufferFFI) -> i32;

/// Signature of [`BUFFER_FREE_SYMBOL`].
pub type BufferFreeFn = unsafe extern "C" fn(buffer: BufferFFI);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_are_stable() {
        assert_eq!(STATUS_OK, 0);
        assert_eq!(STATUS_CALL_ERROR, -1);
        assert_eq!(STATUS_PANIC, -2);
        assert_eq!(STATUS_INVALID_ARGUMENT, -3);
    }

    #[test]
    fn symbol_names_share_prefix() {
        for symbol in [MANIFEST_SYMBOL, INIT_SYMBOL, HELLO_SYMBOL, BUFFER_FREE_SYMBOL] {
            assert!(symbol.starts_with("tether_"), "{symbol}");
            assert!(!symbol.contains('\0'));
        }
    }
}
