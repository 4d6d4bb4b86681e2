//! `johnny5 uname` - report what uname(2) returns to this process.
//!
//! The call goes through the dynamic libc, so under `johnny5 run` it lands in
//! the preloaded shim.

use std::ffi::CStr;
use std::fmt;
use std::io;

use anyhow::Result;
use libc::c_char;

/// Owned copy of the text fields of `struct utsname`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemIdentity {
    pub sysname: String,
    pub nodename: String,
    pub release: String,
    pub version: String,
    pub machine: String,
}

impl SystemIdentity {
    pub fn current() -> io::Result<Self> {
        let mut name: libc::utsname = unsafe { std::mem::zeroed() };
        if unsafe { libc::uname(&mut name) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            sysname: field(&name.sysname),
            nodename: field(&name.nodename),
            release: field(&name.release),
            version: field(&name.version),
            machine: field(&name.machine),
        })
    }
}

impl fmt::Display for SystemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.sysname, self.nodename, self.release, self.version, self.machine
        )
    }
}

fn field(raw: &[c_char]) -> String {
    let bytes = unsafe { std::slice::from_raw_parts(raw.as_ptr() as *const u8, raw.len()) };
    match CStr::from_bytes_until_nul(bytes) {
        Ok(s) => s.to_string_lossy().into_owned(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

pub fn cmd_uname(all: bool) -> Result<()> {
    let identity = SystemIdentity::current()?;
    if all {
        println!("{}", identity);
    } else {
        println!("release: {}", identity.release);
        println!("version: {}", identity.version);
    }
    Ok(())
}
