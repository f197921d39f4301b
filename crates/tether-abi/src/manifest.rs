//! Self-description of the module's exported surface.
//!
//! The module publishes one static [`ManifestFFI`]. The host reads it once at
//! load time and compares each entry with its own declarations before any
//! operation is called.

use std::ffi::c_char;
use std::fmt;

/// Value kinds that can appear in an operation signature.
///
/// Travels across the boundary as its `u32` discriminant; use
/// [`TypeTag::from_raw`] on the receiving side since the peer may be newer.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// No value.
    Unit = 0,
    /// Boolean.
    Bool = 1,
    /// Signed 64-bit integer.
    Int = 2,
    /// 64-bit float.
    Float = 3,
    /// UTF-8 text, returned in a buffer.
    Text = 4,
    /// Opaque bytes, returned in a buffer.
    Bytes = 5,
}

impl TypeTag {
    /// The wire discriminant.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self as u32
    }

    /// Decode a wire discriminant, `None` if unknown.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Unit),
            1 => Some(Self::Bool),
            2 => Some(Self::Int),
            3 => Some(Self::Float),
            4 => Some(Self::Text),
            5 => Some(Self::Bytes),
            _ => None,
        }
    }

    /// Lowercase name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Bytes => "bytes",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One exported operation.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OperationFFI {
    /// NUL-terminated operation name.
    pub name: *const c_char,
    /// Parameter type tags, `param_count` entries (may be null when zero).
    pub params: *const u32,
    /// Number of parameters.
    pub param_count: usize,
    /// Return type tag.
    pub ret: u32,
    /// Whether the operation can report a call failure.
    pub fallible: bool,
}

// SAFETY: manifests are built from `'static` immutable data in the module and
// never written after the module is loaded.
unsafe impl Sync for OperationFFI {}

/// The module manifest returned by `tether_module_manifest`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ManifestFFI {
    /// ABI revision the module was built against.
    pub abi_version: u32,
    /// NUL-terminated module name.
    pub name: *const c_char,
    /// NUL-terminated module version.
    pub version: *const c_char,
    /// Exported operations, `operation_count` entries.
    pub operations: *const OperationFFI,
    /// Number of exported operations.
    pub operation_count: usize,
}

// SAFETY: see `OperationFFI`.
unsafe impl Sync for ManifestFFI {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_raw() {
        for tag in [
            TypeTag::Unit,
            TypeTag::Bool,
            TypeTag::Int,
            TypeTag::Float,
            TypeTag::Text,
            TypeTag::Bytes,
        ] {
            assert_eq!(TypeTag::from_raw(tag.as_raw()), Some(tag));
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_eq!(TypeTag::from_raw(42), None);
    }

    #[test]
    fn display_uses_lowercase_name() {
        assert_eq!(TypeTag::Text.to_string(), "text");
    }
}
