//! Thin wrappers over the `bpf(2)` element commands.
//!
//! aya only exposes element access through typed maps whose key and value
//! types are known at compile time. Global-data maps of instrumented
//! programs have sizes only known at runtime, so lookups go through the
//! raw syscall here.

use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};

use libc as c;

const BPF_MAP_LOOKUP_ELEM: c::c_long = 1; // from linux/bpf.h
const BPF_MAP_GET_NEXT_KEY: c::c_long = 4; // from linux/bpf.h

/// `union bpf_attr` as used by the element commands.
#[repr(C)]
struct MapElemAttr {
    map_fd: u32,
    _pad: u32, // align to 64-bit for following fields
    key: u64,
    value: u64, // `next_key` for BPF_MAP_GET_NEXT_KEY
    flags: u64,
}

fn bpf(cmd: c::c_long, attr: &MapElemAttr) -> io::Result<()> {
    // SAFETY: `attr` is a fully initialized `MapElemAttr` that outlives the
    // call; the kernel reads at most `size_of::<MapElemAttr>()` bytes of it.
    let ret = unsafe {
        c::syscall(
            c::SYS_bpf,
            cmd,
            std::ptr::from_ref(attr),
            std::mem::size_of::<MapElemAttr>(),
        )
    };
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[allow(clippy::cast_sign_loss)]
fn raw_fd(fd: BorrowedFd<'_>) -> u32 {
    fd.as_raw_fd() as u32
}

/// Retrieves the key following `key`, or the first key when `key` is `None`.
///
/// `next_key` must be exactly the map's key size long.
///
/// # Errors
///
/// Returns the OS error; `ENOENT` means there is no such key.
pub fn map_get_next_key(
    fd: BorrowedFd<'_>,
    key: Option<&[u8]>,
    next_key: &mut [u8],
) -> io::Result<()> {
    let attr = MapElemAttr {
        map_fd: raw_fd(fd),
        _pad: 0,
        key: key.map_or(0, |k| k.as_ptr() as u64),
        value: next_key.as_mut_ptr() as u64,
        flags: 0,
    };
    bpf(BPF_MAP_GET_NEXT_KEY, &attr)
}

/// Copies the value stored under `key` into `value`.
///
/// `key` and `value` must be exactly the map's key and value sizes long,
/// and the map must not be per-CPU.
///
/// # Errors
///
/// Returns the OS error; `ENOENT` means the key is absent.
pub fn map_lookup_elem(fd: BorrowedFd<'_>, key: &[u8], value: &mut [u8]) -> io::Result<()> {
    let attr = MapElemAttr {
        map_fd: raw_fd(fd),
        _pad: 0,
        key: key.as_ptr() as u64,
        value: value.as_mut_ptr() as u64,
        flags: 0,
    };
    bpf(BPF_MAP_LOOKUP_ELEM, &attr)
}
