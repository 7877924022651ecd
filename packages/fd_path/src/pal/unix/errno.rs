use std::ffi::c_int;

/// Sets `errno` for the current thread, for reporting failures to C callers.
pub(crate) fn set_errno(code: c_int) {
    // SAFETY: The location is valid for the lifetime of the current thread and only this thread
    // accesses it.
    unsafe {
        *errno_location() = code;
    }
}

#[cfg(any(target_os = "linux", target_os = "emscripten", target_os = "redox"))]
fn errno_location() -> *mut c_int {
    // SAFETY: No safety requirements.
    unsafe { libc::__errno_location() }
}

#[cfg(any(target_os = "android", target_os = "netbsd", target_os = "openbsd"))]
fn errno_location() -> *mut c_int {
    // SAFETY: No safety requirements.
    unsafe { libc::__errno() }
}

#[cfg(any(target_vendor = "apple", target_os = "freebsd"))]
fn errno_location() -> *mut c_int {
    // SAFETY: No safety requirements.
    unsafe { libc::__error() }
}
