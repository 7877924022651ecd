use std::fs::{self, File};
use std::io::{self, Read};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

/// Counts the descriptors currently open in this process.
///
/// Only meaningful in a test binary that runs a single test, because concurrently running tests
/// open and close descriptors of their own. Such tests live in their own file under `tests/`.
///
/// # Panics
///
/// Panics if the descriptor table cannot be listed.
#[must_use]
pub fn open_descriptor_count() -> usize {
    // Listing the directory opens one descriptor of its own. It is included in every count, so
    // differences between counts are exact.
    let dir = if cfg!(any(target_os = "linux", target_os = "android")) {
        "/proc/self/fd"
    } else {
        "/dev/fd"
    };

    fs::read_dir(dir)
        .expect("descriptor table must be listable")
        .count()
}

/// Whether `fd` refers to an open descriptor in this process.
#[must_use]
pub fn is_open(fd: RawFd) -> bool {
    // SAFETY: F_GETFD only inspects the descriptor table. An invalid `fd` is reported as EBADF.
    unsafe { libc::fcntl(fd, libc::F_GETFD) != -1 }
}

/// Creates a pipe whose read end never blocks.
///
/// The write end is a convenient stand-in for a derived descriptor: once every copy of it is
/// closed, [`is_write_end_closed()`] observes that from the read end.
///
/// # Panics
///
/// Panics if the pipe cannot be created.
#[must_use]
pub fn nonblocking_pipe() -> (File, OwnedFd) {
    let mut fds: [RawFd; 2] = [-1; 2];

    // SAFETY: The array has room for the two descriptors pipe() writes.
    let result = unsafe { libc::pipe(fds.as_mut_ptr()) };
    assert_eq!(result, 0, "pipe() failed: {}", io::Error::last_os_error());

    let [read_end, write_end] = fds;

    // SAFETY: pipe() just created the descriptor and nothing else owns it.
    let reader = unsafe { File::from_raw_fd(read_end) };
    // SAFETY: pipe() just created the descriptor and nothing else owns it.
    let writer = unsafe { OwnedFd::from_raw_fd(write_end) };

    // SAFETY: No safety requirements beyond passing a valid descriptor.
    let flags = unsafe { libc::fcntl(read_end, libc::F_GETFL) };
    assert_ne!(flags, -1, "F_GETFL failed: {}", io::Error::last_os_error());

    // SAFETY: No safety requirements beyond passing a valid descriptor.
    let result = unsafe { libc::fcntl(read_end, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    assert_ne!(result, -1, "F_SETFL failed: {}", io::Error::last_os_error());

    (reader, writer)
}

/// Whether every copy of the write end of a [`nonblocking_pipe()`] has been closed.
///
/// Drains any data still in the pipe.
///
/// # Panics
///
/// Panics if reading from the pipe fails for any reason other than it being empty.
#[must_use]
pub fn is_write_end_closed(mut reader: &File) -> bool {
    let mut buf = [0_u8; 64];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => return true,
            Ok(_) => {}
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => return false,
            Err(error) => panic!("reading from pipe failed: {error}"),
        }
    }
}

/// Returns the number of a descriptor that was open a moment ago and is closed now.
///
/// Only meaningful in a test binary that runs a single test, because a concurrently running test
/// may reuse the number at any time.
///
/// # Panics
///
/// Panics if no descriptor can be opened.
#[must_use]
pub fn recently_closed_descriptor() -> RawFd {
    let file = tempfile::tempfile().expect("temporary file must be creatable");
    let fd = file.as_raw_fd();

    drop(file);

    assert!(!is_open(fd));
    fd
}
