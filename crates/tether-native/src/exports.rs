//! The exported C surface.
//!
//! Symbol names and signatures must match `tether_abi`; the manifest below
//! must describe exactly what is exported here.

use std::ffi::c_char;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tether_abi::{
    ABI_VERSION, BufferFFI, ManifestFFI, OperationFFI, STATUS_CALL_ERROR, STATUS_INVALID_ARGUMENT,
    STATUS_OK, STATUS_PANIC, TypeTag,
};

use crate::ops;

const MODULE_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

static OPERATIONS: [OperationFFI; 1] = [OperationFFI {
    name: c"hello".as_ptr(),
    params: std::ptr::null(),
    param_count: 0,
    ret: TypeTag::Text.as_raw(),
    fallible: false,
}];

static MANIFEST: ManifestFFI = ManifestFFI {
    abi_version: ABI_VERSION,
    name: c"tether-native".as_ptr(),
    version: MODULE_VERSION.as_ptr().cast::<c_char>(),
    operations: OPERATIONS.as_ptr(),
    operation_count: OPERATIONS.len(),
};

/// Run `body`, write its bytes into `out` and translate the outcome into a
/// status code. Panics are caught here.
///
/// # Safety
///
/// `out` must be null or valid for a single write of a [`BufferFFI`].
unsafe fn guarded<F>(out: *mut BufferFFI, body: F) -> i32
where
    F: FnOnce() -> Result<Vec<u8>, String>,
{
    if out.is_null() {
        return STATUS_INVALID_ARGUMENT;
    }

    let (status, bytes) = match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(bytes)) => (STATUS_OK, bytes),
        Ok(Err(message)) => (STATUS_CALL_ERROR, message.into_bytes()),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "native operation panicked".to_owned());
            (STATUS_PANIC, message.into_bytes())
        },
    };

    // SAFETY: `out` is non-null and valid for writes per the caller contract.
    unsafe { out.write(BufferFFI::from_vec(bytes)) };
    status
}

/// Static description of this module's exports.
#[unsafe(no_mangle)]
pub extern "C" fn tether_module_manifest() -> *const ManifestFFI {
    &raw const MANIFEST
}

/// One-time initialization.
///
/// # Safety
///
/// `error` must be null or valid for a single write of a [`BufferFFI`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_module_init(host_abi_version: u32, error: *mut BufferFFI) -> i32 {
    // SAFETY: forwarded caller contract.
    unsafe {
        guarded(error, || {
            ops::init(host_abi_version)
                .map(|()| Vec::new())
                .map_err(|e| e.to_string())
        })
    }
}

/// The placeholder operation: returns UTF-8 text in `out`.
///
/// # Safety
///
/// `out` must be null or valid for a single write of a [`BufferFFI`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_hello(out: *mut BufferFFI) -> i32 {
    // SAFETY: forwarded caller contract.
    unsafe { guarded(out, || Ok(ops::hello().into_bytes())) }
}

/// Release a buffer previously handed out by this module.
///
/// # Safety
///
/// `buffer` must come from this module and must not be freed twice.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tether_buffer_free(buffer: BufferFFI) {
    // SAFETY: forwarded caller contract; the allocation came from this module.
    drop(unsafe { buffer.into_vec() });
}
