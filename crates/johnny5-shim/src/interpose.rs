//! The exported `uname` and the delegation path behind it.
//! Safety: the extern "C" function here is dangerous FFI and must be used correctly.
#![allow(clippy::missing_safety_doc)]

use crate::reals::{RealSymbol, REAL_UNAME};
use crate::utsname::stamp_field;
use libc::{c_int, c_void, utsname};
use std::ffi::CStr;

/// Signature shared by our export and the libc definition it shadows.
pub type UnameFn = unsafe extern "C" fn(*mut utsname) -> c_int;

/// Written into `utsname::version` after every successful call.
pub const VERSION_STAMP: &CStr = c"Johnny 5";

/// Interposed `uname(2)`.
///
/// Delegates to the shadowed libc definition, then rewrites the version field
/// when that call succeeds. The status is returned untouched.
#[no_mangle]
pub unsafe extern "C" fn uname(name: *mut utsname) -> c_int {
    uname_through(&REAL_UNAME, name)
}

/// Body of [`uname`] with the original supplied by `real`.
pub unsafe fn uname_through(real: &RealSymbol, name: *mut utsname) -> c_int {
    let original = std::mem::transmute::<*mut c_void, UnameFn>(real.get_or_exit());
    let result = original(name);
    tracing::trace!(status = result, "delegated uname");

    if result == 0 {
        if let Some(name) = name.as_mut() {
            stamp_field(&mut name.version, VERSION_STAMP);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reals::Lookup;
    use crate::utsname::field_text;
    use std::mem;

    unsafe extern "C" fn fake_uname(name: *mut utsname) -> c_int {
        let name = &mut *name;
        stamp_field(&mut name.sysname, c"Linux");
        stamp_field(&mut name.nodename, c"lab-bench");
        stamp_field(&mut name.release, c"6.1.0-test");
        stamp_field(&mut name.version, c"#1 SMP PREEMPT_DYNAMIC");
        stamp_field(&mut name.machine, c"x86_64");
        0
    }

    unsafe extern "C" fn failing_uname(_name: *mut utsname) -> c_int {
        7
    }

    fn find_fake(_name: &CStr) -> *mut c_void {
        fake_uname as *mut c_void
    }

    fn find_failing(_name: &CStr) -> *mut c_void {
        failing_uname as *mut c_void
    }

    fn bytes_of(name: &utsname) -> &[u8] {
        unsafe {
            std::slice::from_raw_parts(name as *const utsname as *const u8, mem::size_of::<utsname>())
        }
    }

    #[test]
    fn test_success_stamps_version_only() {
        let real = RealSymbol::new(c"uname", Lookup::With(find_fake));
        let mut got: utsname = unsafe { mem::zeroed() };
        let mut expected: utsname = unsafe { mem::zeroed() };

        assert_eq!(unsafe { uname_through(&real, &mut got) }, 0);
        assert_eq!(unsafe { fake_uname(&mut expected) }, 0);
        stamp_field(&mut expected.version, VERSION_STAMP);

        assert_eq!(field_text(&got.version), "Johnny 5");
        assert_eq!(field_text(&got.release), "6.1.0-test");
        assert_eq!(bytes_of(&got), bytes_of(&expected));
    }

    #[test]
    fn test_failure_passes_status_and_leaves_output() {
        let real = RealSymbol::new(c"uname", Lookup::With(find_failing));
        let mut got: utsname = unsafe { mem::zeroed() };
        stamp_field(&mut got.version, c"caller supplied");
        let before = bytes_of(&got).to_vec();

        assert_eq!(unsafe { uname_through(&real, &mut got) }, 7);
        assert_eq!(bytes_of(&got), &before[..]);
        assert_eq!(field_text(&got.version), "caller supplied");
    }

    #[test]
    fn test_failure_with_null_output() {
        let real = RealSymbol::new(c"uname", Lookup::With(find_failing));
        assert_eq!(unsafe { uname_through(&real, std::ptr::null_mut()) }, 7);
    }

    #[test]
    fn test_exported_uname_reports_stamp() {
        let mut got: utsname = unsafe { mem::zeroed() };
        assert_eq!(unsafe { uname(&mut got) }, 0);
        assert_eq!(field_text(&got.version), "Johnny 5");
        assert!(!field_text(&got.sysname).is_empty());
    }
}
