//! When a derived descriptor cannot be wrapped in a stream, it is closed before the failure is
//! reported.
//!
//! One test per file to enforce process isolation (descriptor counts are process-level state).

#![cfg(unix)]

use std::os::fd::AsRawFd;

use fd_path::{BrokeredOpen, Error, SyntheticPath};
use testing::{is_open, model_file, open_descriptor_count, open_read_only};

#[test]
fn wrap_failure_does_not_leak() {
    let model = model_file(b"payload");
    let source = open_read_only(&model);
    let path = SyntheticPath::for_fd(&source).unwrap().to_c_string();

    let broker = BrokeredOpen::new();
    let before = open_descriptor_count();

    // No C library accepts a mode that starts with 'z'. Duplication succeeds, wrapping fails.
    let error = broker.open_stream(Some(&path), c"z").unwrap_err();

    assert!(matches!(error, Error::Wrap { .. }), "unexpected error: {error}");
    assert_eq!(error.raw_os_error(), Some(libc::EINVAL));

    let Error::Wrap { fd: derived, .. } = error else {
        unreachable!("checked above");
    };

    assert_ne!(derived, source.as_raw_fd());
    assert!(!is_open(derived));
    assert_eq!(open_descriptor_count(), before);
    assert!(is_open(source.as_raw_fd()));
}
