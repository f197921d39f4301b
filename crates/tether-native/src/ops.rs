//! Operation bodies, free of any FFI concerns.

use std::sync::atomic::{AtomicUsize, Ordering};

use tether_abi::ABI_VERSION;

use crate::error::{NativeError, NativeResult};

/// Text returned by [`hello`].
pub const HELLO_TEXT: &str = "hello df";

static INIT_CALLS: AtomicUsize = AtomicUsize::new(0);

/// Validate the host's ABI revision.
///
/// # Errors
///
/// Returns [`NativeError::AbiMismatch`] when `host_abi_version` differs from
/// the revision this module was compiled against.
pub fn init(host_abi_version: u32) -> NativeResult<()> {
    INIT_CALLS.fetch_add(1, Ordering::Relaxed);
    if host_abi_version != ABI_VERSION {
        return Err(NativeError::AbiMismatch {
            host: host_abi_version,
            module: ABI_VERSION,
        });
    }
    Ok(())
}

/// Number of times [`init`] has run in this process.
#[must_use]
pub fn init_calls() -> usize {
    INIT_CALLS.load(Ordering::Relaxed)
}

/// The placeholder operation.
#[must_use]
pub fn hello() -> String {
    HELLO_TEXT.to_owned()
}
