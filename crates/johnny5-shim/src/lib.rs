//! # johnny5-shim
//!
//! LD_PRELOAD / DYLD_INSERT_LIBRARIES interposer for `uname(2)`.
//!
//! The library exports `uname` itself. Each call is forwarded to the libc
//! definition it shadows, and on success the `version` field is rewritten to
//! `Johnny 5`. Everything else the caller sees comes from libc unchanged.
//!
//! ```bash
//! LD_PRELOAD=target/debug/libjohnny5_shim.so uname -v
//! DYLD_FORCE_FLAT_NAMESPACE=1 DYLD_INSERT_LIBRARIES=target/debug/libjohnny5_shim.dylib uname -v
//! ```
//!
//! How the shadowed definition is found without recursing into our own export
//! differs per loader; see [`reals`].

// Allow unsafe FFI functions without safety docs - these are inherently unsafe C ABI
#![allow(clippy::missing_safety_doc)]

// Macros must be defined before modules that use them
#[macro_use]
pub mod macros;

pub mod interpose;
pub mod reals;
pub mod utsname;

pub use interpose::{uname, uname_through, UnameFn, VERSION_STAMP};
pub use reals::{Lookup, RealSymbol, SlotState, HOST_LOOKUP, REAL_UNAME};
