//! Descriptor 0 cannot be addressed by a synthetic path, so it cannot become a source handle.
//!
//! One test per file to enforce process isolation (the test closes the process's stdin).

#![cfg(unix)]

use std::os::fd::{FromRawFd, OwnedFd};

use fd_path::{Error, SourceHandle};
use testing::is_open;

#[test]
fn descriptor_zero_is_rejected() {
    // SAFETY: Nothing else in this test process uses stdin. The handle takes ownership of it.
    let stdin = unsafe { OwnedFd::from_raw_fd(0) };

    let error = SourceHandle::new(stdin).unwrap_err();

    assert!(matches!(error, Error::UnrepresentableDescriptor { fd: 0 }));

    // The rejected descriptor was closed, not leaked.
    assert!(!is_open(0));
}
