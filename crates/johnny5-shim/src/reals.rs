//! Real Symbol Storage
//!
//! Recovers the libc definition shadowed by an exported function of the same
//! name, without resolving back into this library.
//!
//! On ELF hosts: `dlsym(RTLD_NEXT)` searches the objects loaded after this one.
//! On macOS: RTLD_NEXT does not find the shadowed definition, so libc is opened
//! explicitly and queried through its own handle. Querying `RTLD_DEFAULT` there
//! would hand back our own export and recurse forever.

use libc::c_void;
use std::ffi::CStr;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicUsize, Ordering};

#[cfg(target_os = "macos")]
pub const SYSTEM_LIBRARY: &CStr = c"libc.dylib";
#[cfg(all(not(target_os = "macos"), target_env = "musl"))]
pub const SYSTEM_LIBRARY: &CStr = c"libc.so";
#[cfg(all(not(target_os = "macos"), not(target_env = "musl")))]
pub const SYSTEM_LIBRARY: &CStr = c"libc.so.6";

/// Lookup strategy picked for this build.
#[cfg(any(target_os = "macos", feature = "explicit-library"))]
pub const HOST_LOOKUP: Lookup = Lookup::Library(SYSTEM_LIBRARY);
#[cfg(not(any(target_os = "macos", feature = "explicit-library")))]
pub const HOST_LOOKUP: Lookup = Lookup::NextInSearchOrder;

/// How a [`RealSymbol`] finds the definition it wraps.
#[derive(Debug, Clone, Copy)]
pub enum Lookup {
    /// `dlsym(RTLD_NEXT, name)`. Must be issued from inside the interposing object.
    NextInSearchOrder,
    /// `dlopen(path, RTLD_NOW)` followed by `dlsym(handle, name)`.
    Library(&'static CStr),
    /// Caller-supplied lookup, used to stand in for the loader in tests.
    With(fn(&CStr) -> *mut c_void),
}

impl Lookup {
    /// Returns null when the symbol (or, for `Library`, the library) is not found.
    pub unsafe fn find(&self, name: &CStr) -> *mut c_void {
        match *self {
            Lookup::NextInSearchOrder => libc::dlsym(libc::RTLD_NEXT, name.as_ptr()),
            Lookup::Library(path) => {
                // The handle stays open for the life of the process so the
                // returned pointer remains valid.
                let handle = libc::dlopen(path.as_ptr(), libc::RTLD_NOW);
                if handle.is_null() {
                    return ptr::null_mut();
                }
                libc::dlsym(handle, name.as_ptr())
            }
            Lookup::With(f) => f(name),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Lookup::NextInSearchOrder => "next-in-search-order",
            Lookup::Library(_) => "explicit-library",
            Lookup::With(_) => "custom",
        }
    }
}

/// Observable lifecycle of a [`RealSymbol`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Unresolved,
    Resolved,
    /// Lookup came back null. The process exits right after entering this state.
    Failed,
}

/// Storage for a real libc function to avoid recursion into our own export.
///
/// The pointer is resolved lazily and never cleared. Two threads racing on the
/// first call may both resolve; they store the same address.
pub struct RealSymbol {
    ptr: AtomicPtr<c_void>,
    name: &'static CStr,
    lookup: Lookup,
    resolutions: AtomicUsize,
    failed: AtomicBool,
}

impl RealSymbol {
    pub const fn new(name: &'static CStr, lookup: Lookup) -> Self {
        Self {
            ptr: AtomicPtr::new(ptr::null_mut()),
            name,
            lookup,
            resolutions: AtomicUsize::new(0),
            failed: AtomicBool::new(false),
        }
    }

    /// Cached pointer, resolving it on first use. Null if the lookup failed.
    pub unsafe fn get(&self) -> *mut c_void {
        let p = self.ptr.load(Ordering::Acquire);
        if !p.is_null() {
            return p;
        }
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        let f = self.lookup.find(self.name);
        if f.is_null() {
            return f;
        }
        tracing::debug!(
            symbol = %self.name.to_string_lossy(),
            strategy = self.lookup.describe(),
            "resolved original symbol"
        );
        self.ptr.store(f, Ordering::Release);
        f
    }

    /// Like [`get`](Self::get), but a missing symbol is fatal: a diagnostic goes
    /// to stderr and the process exits with status 1.
    pub unsafe fn get_or_exit(&self) -> *mut c_void {
        let f = self.get();
        if f.is_null() {
            self.failed.store(true, Ordering::Release);
            shim_stderr!(
                "ERROR: Failed to locate original {}() function; exiting",
                self.name.to_str().unwrap_or("?")
            );
            libc::exit(1);
        }
        f
    }

    /// Currently cached pointer without triggering a lookup.
    pub fn cached(&self) -> *mut c_void {
        self.ptr.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SlotState {
        if !self.cached().is_null() {
            SlotState::Resolved
        } else if self.failed.load(Ordering::Acquire) {
            SlotState::Failed
        } else {
            SlotState::Unresolved
        }
    }

    /// Number of lookups performed so far, successful or not.
    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static CStr {
        self.name
    }

    pub fn lookup(&self) -> Lookup {
        self.lookup
    }
}

pub static REAL_UNAME: RealSymbol = RealSymbol::new(c"uname", HOST_LOOKUP);
