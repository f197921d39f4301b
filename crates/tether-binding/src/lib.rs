//! Typed host binding for the Tether native module.
//!
//! The native module is a shared library compiled from `tether-native`. This
//! crate finds it, opens it once per process, checks that it exports what the
//! host declares, and exposes each export as an ordinary Rust function.
//!
//! ```rust,no_run
//! # fn main() -> Result<(), tether_binding::BindingError> {
//! // Host-only, never loads anything.
//! assert_eq!(tether_binding::greeting().message, "hello");
//!
//! // Loads the module on first use.
//! let text = tether_binding::hello()?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```
//!
//! Declarations are checked by the compiler. Passing arguments the
//! declaration does not take is a compile error:
//!
//! ```compile_fail
//! let _ = tether_binding::hello("extra");
//! ```
//!
//! ```compile_fail
//! use tether_binding::NativeExports;
//!
//! fn call(module: &impl NativeExports) {
//!     let _ = module.hello(1);
//! }
//! ```
//!
//! # Failure model
//!
//! A module that cannot be loaded, or that loads but does not honor the
//! declarations, fails once and keeps failing with the same
//! [`BindingError`] for the rest of the process. A failed call only affects
//! that call.

#![allow(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod binding;
mod declare;
mod error;
mod host;
mod loader;
mod manifest;
mod module;
mod source;

pub use binding::Binding;
pub use declare::{DECLARED_OPERATIONS, HELLO, NativeExports, Signature, verify};
pub use error::{
    BindingError, BindingResult, CallError, CallFailure, ContractMismatch, ErrorKind, LoadError,
    MismatchReason,
};
pub use host::{GREETING_MESSAGE, Greeting, greeting, hello, manifest, native, state};
pub use loader::LoadState;
pub use manifest::{ModuleManifest, OperationDescriptor};
pub use module::DylibModule;
pub use source::{
    ConfiguredSource, DylibSource, ModuleSource, default_search_dirs, library_file_name,
    verify_hash,
};
pub use tether_abi::TypeTag;
