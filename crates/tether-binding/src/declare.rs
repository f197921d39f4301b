//! Host-side declarations of what the native module must export.
//!
//! Each operation is declared twice: once as a Rust method on
//! [`NativeExports`], which the compiler checks at every call site, and once
//! as a [`Signature`] row in [`DECLARED_OPERATIONS`], which is checked against
//! the module's manifest when the library is loaded. The two must agree; the
//! unit tests below pin that.

use tether_abi::TypeTag;

use crate::error::{CallError, ContractMismatch, MismatchReason};
use crate::manifest::{ModuleManifest, OperationDescriptor};

/// A declared operation signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// Operation name as it appears in the manifest.
    pub name: &'static str,
    /// Parameter types in order.
    pub params: &'static [TypeTag],
    /// Return type.
    pub ret: TypeTag,
    /// Whether the operation can report a call failure.
    pub fallible: bool,
}

/// `hello() -> text`.
pub const HELLO: Signature = Signature {
    name: "hello",
    params: &[],
    ret: TypeTag::Text,
    fallible: false,
};

/// Every operation the host expects from the native module.
pub const DECLARED_OPERATIONS: &[Signature] = &[HELLO];

/// Typed surface of a loaded native module.
///
/// Implemented by the real dynamic-library handle and by test doubles.
pub trait NativeExports: Send + Sync + 'static {
    /// The module's self-description, as decoded at load time.
    fn manifest(&self) -> &ModuleManifest;

    /// Call the `hello` export.
    ///
    /// # Errors
    ///
    /// Returns [`CallError`] if the native call fails or panics.
    fn hello(&self) -> Result<String, CallError>;
}

/// Check every declaration against the manifest.
///
/// Operations the module exports but the host never declared are ignored.
///
/// # Errors
///
/// Returns the first declaration the manifest does not honor.
pub fn verify(manifest: &ModuleManifest, declared: &[Signature]) -> Result<(), ContractMismatch> {
    for sig in declared {
        let exported = manifest.operation(sig.name).ok_or(ContractMismatch {
            operation: sig.name,
            reason: MismatchReason::Missing,
        })?;
        if let Some(reason) = sig.mismatch(exported) {
            return Err(ContractMismatch {
                operation: sig.name,
                reason,
            });
        }
    }
    Ok(())
}

impl Signature {
    fn mismatch(&self, exported: &OperationDescriptor) -> Option<MismatchReason> {
        if self.params != exported.params.as_slice() {
            return Some(MismatchReason::Params {
                declared: join_tags(self.params),
                exported: join_tags(&exported.params),
            });
        }
        if self.ret != exported.ret {
            return Some(MismatchReason::Return {
                declared: self.ret,
                exported: exported.ret,
            });
        }
        if self.fallible != exported.fallible {
            return Some(MismatchReason::Fallibility {
                declared: self.fallible,
                exported: exported.fallible,
            });
        }
        None
    }
}

impl From<&Signature> for OperationDescriptor {
    fn from(sig: &Signature) -> Self {
        Self {
            name: sig.name.to_owned(),
            params: sig.params.to_vec(),
            ret: sig.ret,
            fallible: sig.fallible,
        }
    }
}

fn join_tags(tags: &[TypeTag]) -> String {
    tags.iter()
        .map(|t| t.name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn honoring() -> ModuleManifest {
        ModuleManifest::new(
            "fixture",
            "0.0.0",
            DECLARED_OPERATIONS.iter().map(OperationDescriptor::from).collect(),
        )
    }

    #[test]
    fn honoring_manifest_verifies() {
        assert_eq!(verify(&honoring(), DECLARED_OPERATIONS), Ok(()));
    }

    #[test]
    fn extra_exports_are_tolerated() {
        let mut manifest = honoring();
        manifest.operations.push(OperationDescriptor {
            name: "goodbye".into(),
            params: vec![TypeTag::Text],
            ret: TypeTag::Unit,
            fallible: true,
        });
        assert!(verify(&manifest, DECLARED_OPERATIONS).is_ok());
    }

    #[test]
    fn missing_operation_is_reported() {
        let manifest = ModuleManifest::new("fixture", "0.0.0", Vec::new());
        let err = verify(&manifest, DECLARED_OPERATIONS).unwrap_err();
        assert_eq!(err.operation, "hello");
        assert_eq!(err.reason, MismatchReason::Missing);
    }

    #[test]
    fn parameter_drift_is_reported() {
        let mut manifest = honoring();
        manifest.operations[0].params = vec![TypeTag::Text];
        let err = verify(&manifest, DECLARED_OPERATIONS).unwrap_err();
        assert_eq!(
            err.reason,
            MismatchReason::Params {
                declared: String::new(),
                exported: "text".into(),
            }
        );
    }

    #[test]
    fn return_type_drift_is_reported() {
        let mut manifest = honoring();
        manifest.operations[0].ret = TypeTag::Bytes;
        let err = verify(&manifest, DECLARED_OPERATIONS).unwrap_err();
        assert!(matches!(err.reason, MismatchReason::Return { .. }));
    }

    #[test]
    fn fallibility_drift_is_reported() {
        let mut manifest = honoring();
        manifest.operations[0].fallible = true;
        let err = verify(&manifest, DECLARED_OPERATIONS).unwrap_err();
        assert_eq!(
            err.reason,
            MismatchReason::Fallibility {
                declared: false,
                exported: true,
            }
        );
    }

    #[test]
    fn hello_matches_native_table() {
        let ops: Vec<OperationDescriptor> = unsafe {
            crate::manifest::ModuleManifest::from_raw(tether_native::exports::tether_module_manifest())
        }
        .unwrap()
        .operations;
        let hello = ops.iter().find(|op| op.name == HELLO.name).unwrap();
        assert_eq!(*hello, OperationDescriptor::from(&HELLO));
    }
}
