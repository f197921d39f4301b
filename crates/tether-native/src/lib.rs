//! The Tether native module.
//!
//! Built as a `cdylib` and loaded by `tether-binding` at runtime. The exported
//! surface is fixed and versioned through `tether-abi`:
//!
//! | Symbol                   | Purpose                                   |
//! |--------------------------|-------------------------------------------|
//! | `tether_module_manifest` | Static self-description of every export   |
//! | `tether_module_init`     | One-time init, rejects foreign ABI revs   |
//! | `tether_hello`           | Placeholder operation returning text      |
//! | `tether_buffer_free`     | Releases buffers this module allocated    |
//!
//! Every entry point is reentrant and catches panics so that unwinding never
//! crosses the C boundary.

#![allow(unsafe_code)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
pub mod exports;
pub mod ops;

pub use error::{NativeError, NativeResult};
