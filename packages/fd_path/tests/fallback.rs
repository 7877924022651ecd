//! Names that are not synthetic paths reach the ordinary path-based open unmodified.

#![cfg(unix)]

use std::ffi::CString;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::os::unix::ffi::OsStrExt;

use fd_path::{BrokeredOpen, Error};
use testing::{MODEL_MAGIC, model_file};

const NOT_SYNTHETIC: &[&str] = &[
    "fd:", "fd:0", "fd:-5", "fd:abc", "foo", "fd:0012", "fd:12abc", "fd: 12",
];

#[test]
fn malformed_synthetic_paths_are_not_found() {
    let broker = BrokeredOpen::new();

    for name in NOT_SYNTHETIC {
        let name = CString::new(*name).unwrap();

        let error = broker.open_stream(Some(&name), c"rb").unwrap_err();
        assert!(
            matches!(error, Error::Open { .. }),
            "{name:?} must reach the standard stream open, got {error}"
        );
        assert_eq!(error.os_error().unwrap().kind(), ErrorKind::NotFound);

        let error = broker
            .open_descriptor(Some(&name), libc::O_RDONLY)
            .unwrap_err();
        assert!(
            matches!(error, Error::Open { .. }),
            "{name:?} must reach the standard descriptor open, got {error}"
        );
        assert_eq!(error.os_error().unwrap().kind(), ErrorKind::NotFound);
    }
}

#[test]
fn empty_name_is_not_found() {
    let error = BrokeredOpen::new()
        .open_stream(Some(c""), c"rb")
        .unwrap_err();

    assert!(matches!(error, Error::Open { .. }));
    assert_eq!(error.raw_os_error(), Some(libc::ENOENT));
}

#[test]
fn null_name_fails_without_crashing() {
    let broker = BrokeredOpen::new();

    let error = broker.open_stream(None, c"rb").unwrap_err();
    assert_eq!(error.raw_os_error(), Some(libc::EFAULT));

    let error = broker.open_descriptor(None, libc::O_RDONLY).unwrap_err();
    assert_eq!(error.raw_os_error(), Some(libc::EFAULT));
}

#[test]
fn ordinary_paths_open_normally() {
    let model = model_file(b"payload");
    let path = CString::new(model.path().as_os_str().as_bytes()).unwrap();

    let broker = BrokeredOpen::new();

    let mut stream = broker.open_stream(Some(&path), c"rb").unwrap();
    let mut contents = Vec::new();
    stream.read_to_end(&mut contents).unwrap();
    assert!(contents.starts_with(MODEL_MAGIC));

    let mut file = File::from(broker.open_descriptor(Some(&path), libc::O_RDONLY).unwrap());
    let mut contents = Vec::new();
    file.read_to_end(&mut contents).unwrap();
    assert!(contents.starts_with(MODEL_MAGIC));

    let mut file = broker
        .open_file(model.path(), File::options().read(true))
        .unwrap();
    let mut contents = Vec::new();
    file.read_to_end(&mut contents).unwrap();
    assert!(contents.starts_with(MODEL_MAGIC));
}

#[test]
fn standard_open_flags_are_passed_through() {
    let dir = tempfile::tempdir().unwrap();
    let created = dir.path().join("created.gguf");
    let path = CString::new(created.as_os_str().as_bytes()).unwrap();

    let broker = BrokeredOpen::new();

    // Without O_CREAT the file does not appear.
    let error = broker
        .open_descriptor(Some(&path), libc::O_RDWR)
        .unwrap_err();
    assert_eq!(error.raw_os_error(), Some(libc::ENOENT));

    drop(
        broker
            .open_descriptor(Some(&path), libc::O_RDWR | libc::O_CREAT)
            .unwrap(),
    );
    assert!(created.exists());

    // Stream modes are passed through as well.
    let mut stream = broker.open_stream(Some(&path), c"wb").unwrap();
    std::io::Write::write_all(&mut stream, b"GGUF").unwrap();
    stream.close().unwrap();

    assert_eq!(std::fs::read(&created).unwrap(), b"GGUF");
}

#[test]
fn unused_descriptor_number_is_a_duplicate_failure() {
    // No process can have this many descriptors open.
    let error = BrokeredOpen::new()
        .open_stream(Some(c"fd:2147483647"), c"rb")
        .unwrap_err();

    assert!(matches!(error, Error::Duplicate { fd: 2_147_483_647, .. }));
    assert_eq!(error.raw_os_error(), Some(libc::EBADF));
}
