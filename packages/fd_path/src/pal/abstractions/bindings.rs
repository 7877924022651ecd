use std::ffi::{CStr, c_int};
use std::fmt::Debug;
use std::io;
use std::os::fd::{OwnedFd, RawFd};
use std::ptr::NonNull;

/// Bindings for FFI calls into the C library.
///
/// All PAL FFI calls made by the open operations must go through this trait, enabling them to be
/// mocked.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Bindings: Debug + Send + Sync + 'static {
    // dup(), or fcntl(F_DUPFD_CLOEXEC) if close_on_exec is set
    fn duplicate(&self, fd: RawFd, close_on_exec: bool) -> io::Result<OwnedFd>;

    // fdopen() - the stream owns `fd` on success, the caller still owns it on failure
    fn fdopen(&self, fd: RawFd, mode: &CStr) -> io::Result<NonNull<libc::FILE>>;

    fn fopen(&self, name: &CStr, mode: &CStr) -> io::Result<NonNull<libc::FILE>>;

    fn open(&self, name: &CStr, flags: c_int) -> io::Result<OwnedFd>;

    // close() - the descriptor is gone afterwards even if an error is reported
    fn close(&self, fd: OwnedFd) -> io::Result<()>;
}
