use std::ffi::{CStr, c_int, c_uint};
use std::fmt::Debug;
use std::io;
use std::os::fd::{FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::ptr::NonNull;

use crate::pal::Bindings;

// Permission bits for files created by a fallback open() that carries O_CREAT. The process umask
// still applies on top of this.
const CREATE_MODE: c_uint = 0o666;

/// FFI bindings that target the real operating system that the build is targeting.
///
/// You would only use different bindings in unit tests that need to use mock bindings.
/// Even then, whenever possible, tests should use real bindings for maximum realism.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetBindings;

// Real OS bindings are excluded from coverage measurement because:
// 1. They are tested via integration tests running against the real C library.
// 2. Several error paths require OS-level failures that are impractical to trigger in tests.
#[cfg_attr(coverage_nightly, coverage(off))]
impl Bindings for BuildTargetBindings {
    fn duplicate(&self, fd: RawFd, close_on_exec: bool) -> io::Result<OwnedFd> {
        let result = if close_on_exec {
            // SAFETY: No safety requirements. An invalid `fd` is reported as EBADF.
            unsafe { libc::fcntl(fd, libc::F_DUPFD_CLOEXEC, 0) }
        } else {
            // SAFETY: No safety requirements. An invalid `fd` is reported as EBADF.
            unsafe { libc::dup(fd) }
        };

        if result < 0 {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: A successful duplication returns a fresh descriptor that nothing else owns.
        Ok(unsafe { OwnedFd::from_raw_fd(result) })
    }

    fn fdopen(&self, fd: RawFd, mode: &CStr) -> io::Result<NonNull<libc::FILE>> {
        // SAFETY: `mode` is a valid NUL-terminated string for the duration of the call.
        let file = unsafe { libc::fdopen(fd, mode.as_ptr()) };

        NonNull::new(file).ok_or_else(io::Error::last_os_error)
    }

    fn fopen(&self, name: &CStr, mode: &CStr) -> io::Result<NonNull<libc::FILE>> {
        // SAFETY: Both strings are valid and NUL-terminated for the duration of the call.
        let file = unsafe { libc::fopen(name.as_ptr(), mode.as_ptr()) };

        NonNull::new(file).ok_or_else(io::Error::last_os_error)
    }

    fn open(&self, name: &CStr, flags: c_int) -> io::Result<OwnedFd> {
        // The mode argument is only read when `flags` asks for a file to be created.
        // SAFETY: `name` is a valid NUL-terminated string for the duration of the call.
        let fd = unsafe { libc::open(name.as_ptr(), flags, CREATE_MODE) };

        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: A successful open() returns a fresh descriptor that nothing else owns.
        Ok(unsafe { OwnedFd::from_raw_fd(fd) })
    }

    fn close(&self, fd: OwnedFd) -> io::Result<()> {
        // SAFETY: We took ownership of the descriptor from the OwnedFd, so nothing else closes it.
        let result = unsafe { libc::close(fd.into_raw_fd()) };

        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}
