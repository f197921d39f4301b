//! Owned copy of the module's self-description.

use std::ffi::{CStr, c_char};

use tether_abi::{ABI_VERSION, ManifestFFI, OperationFFI, TypeTag};

/// Upper bound on exported operations; anything larger is treated as corruption.
const MAX_OPERATIONS: usize = 1024;

/// Upper bound on parameters per operation.
const MAX_PARAMS: usize = 64;

/// What the native module says it exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleManifest {
    /// ABI revision the module was built against.
    pub abi_version: u32,
    /// Module name.
    pub name: String,
    /// Module version.
    pub version: String,
    /// Exported operations in manifest order.
    pub operations: Vec<OperationDescriptor>,
}

/// One exported operation's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    /// Operation name.
    pub name: String,
    /// Parameter types in order.
    pub params: Vec<TypeTag>,
    /// Return type.
    pub ret: TypeTag,
    /// Whether the operation can report a call failure.
    pub fallible: bool,
}

impl ModuleManifest {
    /// A manifest at the host's ABI revision.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        operations: Vec<OperationDescriptor>,
    ) -> Self {
        Self {
            abi_version: ABI_VERSION,
            name: name.into(),
            version: version.into(),
            operations,
        }
    }

    /// Look up an operation by name.
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// Copy a raw manifest into owned memory.
    ///
    /// # Errors
    ///
    /// Returns a description of the first malformed field.
    ///
    /// # Safety
    ///
    /// `raw` must be null or point at a [`ManifestFFI`] whose pointers are
    /// valid for the lifetime of the loaded library.
    pub unsafe fn from_raw(raw: *const ManifestFFI) -> Result<Self, String> {
        // SAFETY: null or valid per the caller contract.
        let Some(raw) = (unsafe { raw.as_ref() }) else {
            return Err("manifest pointer is null".to_owned());
        };

        // SAFETY: the caller guarantees the string pointers are valid.
        let name = unsafe { read_cstr(raw.name, "module name") }?;
        let version = unsafe { read_cstr(raw.version, "module version") }?;

        if raw.operation_count > MAX_OPERATIONS {
            return Err(format!(
                "operation count {} exceeds the limit of {MAX_OPERATIONS}",
                raw.operation_count
            ));
        }
        let ops: &[OperationFFI] = if raw.operation_count == 0 {
            &[]
        } else if raw.operations.is_null() {
            return Err("operation table is null".to_owned());
        } else {
            // SAFETY: non-null, bounded count, valid per the caller contract.
            unsafe { std::slice::from_raw_parts(raw.operations, raw.operation_count) }
        };

        let operations = ops
            .iter()
            // SAFETY: each entry lives in the same static table.
            .map(|op| unsafe { OperationDescriptor::from_raw(op) })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            abi_version: raw.abi_version,
            name,
            version,
            operations,
        })
    }
}

impl OperationDescriptor {
    /// # Safety
    ///
    /// `raw`'s pointers must be valid (see [`ModuleManifest::from_raw`]).
    unsafe fn from_raw(raw: &OperationFFI) -> Result<Self, String> {
        // SAFETY: forwarded caller contract.
        let name = unsafe { read_cstr(raw.name, "operation name") }?;

        if raw.param_count > MAX_PARAMS {
            return Err(format!(
                "operation `{name}` declares {} parameters, limit is {MAX_PARAMS}",
                raw.param_count
            ));
        }
        let raw_params: &[u32] = if raw.param_count == 0 {
            &[]
        } else if raw.params.is_null() {
            return Err(format!("operation `{name}` has a null parameter table"));
        } else {
            // SAFETY: non-null, bounded count, valid per the caller contract.
            unsafe { std::slice::from_raw_parts(raw.params, raw.param_count) }
        };

        let decode = |tag: u32| {
            TypeTag::from_raw(tag)
                .ok_or_else(|| format!("operation `{name}` uses unknown type tag {tag}"))
        };
        let params = raw_params
            .iter()
            .map(|&tag| decode(tag))
            .collect::<Result<Vec<_>, _>>()?;
        let ret = decode(raw.ret)?;

        Ok(Self {
            name,
            params,
            ret,
            fallible: raw.fallible,
        })
    }
}

/// # Safety
///
/// `ptr` must be null or point at a NUL-terminated string.
unsafe fn read_cstr(ptr: *const c_char, what: &str) -> Result<String, String> {
    if ptr.is_null() {
        return Err(format!("{what} is null"));
    }
    // SAFETY: non-null and NUL-terminated per the caller contract.
    let s = unsafe { CStr::from_ptr(ptr) };
    s.to_str()
        .map(str::to_owned)
        .map_err(|e| format!("{what} is not UTF-8: {e}"))
}
