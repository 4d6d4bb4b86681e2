//! Bounded access to the fixed-size text fields of `struct utsname`.

use libc::c_char;
use std::borrow::Cow;
use std::ffi::CStr;

/// Copy `text` into `field` the way `strncpy` would, except that the last
/// byte of the field is always reserved for the terminator.
///
/// Bytes after the copied text are zeroed. A zero-length field is left alone.
pub fn stamp_field(field: &mut [c_char], text: &CStr) {
    let Some(limit) = field.len().checked_sub(1) else {
        return;
    };
    let bytes = text.to_bytes();
    let n = bytes.len().min(limit);
    for (dst, &src) in field[..n].iter_mut().zip(bytes) {
        *dst = src as c_char;
    }
    field[n..].fill(0);
}

/// Text of a field up to its first NUL, or the whole field if it has none.
pub fn field_text(field: &[c_char]) -> Cow<'_, str> {
    // c_char is i8 or u8 depending on the target; both are one byte wide.
    let bytes = unsafe { std::slice::from_raw_parts(field.as_ptr() as *const u8, field.len()) };
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end])
}
