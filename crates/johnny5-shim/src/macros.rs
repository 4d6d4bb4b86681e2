/// Format a line into a stack buffer and write it straight to fd 2.
///
/// Used on paths where the allocator or stdio may not be usable, such as the
/// fatal exit taken when the original symbol cannot be found.
#[macro_export]
macro_rules! shim_stderr {
    ($($arg:tt)*) => {{
        use std::fmt::Write;
        let mut buf = [0u8; 512];
        let mut writer = $crate::macros::StackWriter::new(&mut buf);
        let _ = writeln!(writer, $($arg)*);
        $crate::macros::write_stderr(writer.as_bytes());
    }};
}

/// Raw `write(2)` to fd 2. Short writes and errors are ignored.
pub fn write_stderr(msg: &[u8]) {
    unsafe {
        libc::write(2, msg.as_ptr() as *const libc::c_void, msg.len());
    }
}

/// Fixed-capacity `fmt::Write` sink. Output past the end of the buffer is dropped.
pub struct StackWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> StackWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.as_bytes()).unwrap_or("")
    }
}

impl<'a> std::fmt::Write for StackWriter<'a> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        let bytes = s.as_bytes();
        let remaining = self.buf.len() - self.pos;
        let to_copy = std::cmp::min(bytes.len(), remaining);
        self.buf[self.pos..self.pos + to_copy].copy_from_slice(&bytes[..to_copy]);
        self.pos += to_copy;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn test_stack_writer_formats_in_place() {
        let mut buf = [0u8; 64];
        let mut w = StackWriter::new(&mut buf);
        write!(w, "original {}() missing", "uname").unwrap();
        assert_eq!(w.as_str(), "original uname() missing");
    }

    #[test]
    fn test_stack_writer_truncates_at_capacity() {
        let mut buf = [0u8; 8];
        let mut w = StackWriter::new(&mut buf);
        write!(w, "Johnny 5 is alive").unwrap();
        assert_eq!(w.as_bytes(), b"Johnny 5");
        write!(w, "more").unwrap();
        assert_eq!(w.as_bytes().len(), 8);
    }
}
