//! C ABI symbols that route a consuming library's file opens through [`BrokeredOpen::global()`].
//!
//! The symbols replace the library's own definitions at link time, so the library needs no source
//! changes. They preserve its return value conventions: a null stream or `-1` on failure, with
//! `errno` describing the cause.

use std::ffi::{CStr, c_char, c_int};
use std::os::fd::IntoRawFd;
use std::ptr;

use crate::pal::set_errno;
use crate::{BrokeredOpen, Error};

// Reported when a failure carries no operating system error of its own.
const FALLBACK_ERRNO: c_int = libc::EIO;

/// Opens a C buffered stream by name, resolving `fd:N` synthetic paths against open descriptors.
///
/// See [`BrokeredOpen::open_stream()`] for the semantics. Returns null on failure, with `errno` set.
///
/// # Safety
///
/// `fname` must be null or point to a NUL-terminated string. `mode` must point to a
/// NUL-terminated string. Both must remain valid for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ggml_fopen(fname: *const c_char, mode: *const c_char) -> *mut libc::FILE {
    if mode.is_null() {
        set_errno(libc::EINVAL);
        return ptr::null_mut();
    }

    // SAFETY: Forwarding the caller's guarantees.
    let name = unsafe { optional_c_str(fname) };
    // SAFETY: Forwarding the caller's guarantees. We checked for null above.
    let mode = unsafe { CStr::from_ptr(mode) };

    match BrokeredOpen::global().open_stream(name, mode) {
        Ok(stream) => stream.into_raw(),
        Err(error) => {
            report(&error);
            ptr::null_mut()
        }
    }
}

/// Opens a raw descriptor by name, resolving `fd:N` synthetic paths against open descriptors.
///
/// See [`BrokeredOpen::open_descriptor()`] for the semantics. Returns `-1` on failure, with
/// `errno` set.
///
/// # Safety
///
/// `fname` must be null or point to a NUL-terminated string that remains valid for the duration
/// of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn llama_open(fname: *const c_char, flags: c_int) -> c_int {
    // SAFETY: Forwarding the caller's guarantees.
    let name = unsafe { optional_c_str(fname) };

    match BrokeredOpen::global().open_descriptor(name, flags) {
        Ok(fd) => fd.into_raw_fd(),
        Err(error) => {
            report(&error);
            -1
        }
    }
}

/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn optional_c_str<'a>(ptr: *const c_char) -> Option<&'a CStr> {
    if ptr.is_null() {
        None
    } else {
        // SAFETY: Forwarding the caller's guarantees.
        Some(unsafe { CStr::from_ptr(ptr) })
    }
}

// Cleanup after a failed wrap closes a descriptor, which may overwrite errno. We set it last, from
// the error that caused the failure.
fn report(error: &Error) {
    set_errno(error.raw_os_error().unwrap_or(FALLBACK_ERRNO));
}
