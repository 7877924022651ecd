use std::ffi::{CStr, c_int};
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use tracing::{debug, error, warn};

use crate::pal::{Bindings, BindingsFacade};
use crate::{BrokeredOpenBuilder, Error, Result, Stream, SyntheticPath};

static GLOBAL: BrokeredOpen = BrokeredOpen::with_internals(false, BindingsFacade::target());

/// Opens files by name, resolving [synthetic paths][SyntheticPath] against the descriptors they
/// name instead of the filesystem.
///
/// Each open operation checks whether the name is a synthetic path (`fd:N`). If it is, the source
/// descriptor `N` is duplicated and the duplicate is returned in the form the operation promises.
/// Otherwise the name is handed unmodified to the ordinary path-based open of the same form.
///
/// The source descriptor is never closed or otherwise modified, whatever the outcome. Every open
/// of the same synthetic path yields a fresh derived descriptor that the returned value owns
/// exclusively, so derived handles can be closed in any order without affecting each other or
/// the source.
///
/// The type holds no mutable state and can be used from any number of threads at the same time.
///
/// # Example
///
/// ```
/// use std::fs::File;
/// use std::io::Read;
///
/// use fd_path::{BrokeredOpen, SyntheticPath};
///
/// # let model = tempfile::NamedTempFile::new().unwrap();
/// # std::fs::write(model.path(), b"weights").unwrap();
/// let source = File::open(model.path()).unwrap();
/// let path = SyntheticPath::for_fd(&source).unwrap().to_c_string();
///
/// let broker = BrokeredOpen::new();
///
/// let mut stream = broker.open_stream(Some(&path), c"rb").unwrap();
/// let descriptor = broker.open_descriptor(Some(&path), libc::O_RDONLY).unwrap();
///
/// let mut contents = String::new();
/// stream.read_to_string(&mut contents).unwrap();
/// assert_eq!(contents, "weights");
///
/// drop(stream);
/// drop(descriptor);
///
/// // The source is still open and usable.
/// assert!(SyntheticPath::for_fd(&source).is_some());
/// ```
#[derive(Clone, Debug)]
pub struct BrokeredOpen {
    close_on_exec: bool,

    bindings: BindingsFacade,
}

impl BrokeredOpen {
    /// Creates an instance with the default configuration.
    ///
    /// Use [`builder()`][Self::builder] to customize the configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder for an instance with custom configuration.
    #[must_use]
    pub fn builder() -> BrokeredOpenBuilder {
        BrokeredOpenBuilder::new()
    }

    /// The process-wide instance with the default configuration.
    ///
    /// This is the instance that the C ABI exports route through.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    pub(crate) const fn with_internals(close_on_exec: bool, bindings: BindingsFacade) -> Self {
        Self {
            close_on_exec,
            bindings,
        }
    }

    /// Whether derived descriptors are created with the close-on-exec flag set.
    #[must_use]
    pub fn close_on_exec(&self) -> bool {
        self.close_on_exec
    }

    /// Opens a C buffered stream, in the manner of `fopen()`.
    ///
    /// If `name` is a synthetic path, the source descriptor is duplicated and the duplicate is
    /// wrapped in a stream with the given `mode`. The mode must be compatible with the access mode
    /// of the source descriptor.
    ///
    /// Otherwise, including when `name` is `None`, the name and mode are passed unmodified to
    /// `fopen()`. A `None` name fails with `EFAULT`.
    ///
    /// # Errors
    ///
    /// * [`Error::Duplicate`] if the source descriptor could not be duplicated.
    /// * [`Error::Wrap`] if the duplicate could not be wrapped in a stream. The duplicate has been
    ///   closed already.
    /// * [`Error::Open`] if `name` was not a synthetic path and `fopen()` failed.
    pub fn open_stream(&self, name: Option<&CStr>, mode: &CStr) -> Result<Stream> {
        debug!(?name, ?mode, "open_stream");

        match name.and_then(SyntheticPath::parse_c_str) {
            Some(path) => self.open_synthetic_stream(path, mode),
            None => self.open_standard_stream(name, mode),
        }
    }

    /// Opens a raw descriptor, in the manner of `open()`.
    ///
    /// If `name` is a synthetic path, the source descriptor is duplicated and the duplicate is
    /// returned. The `flags` do not apply in this case: the duplicate shares the access mode and
    /// status flags of the source.
    ///
    /// Otherwise, including when `name` is `None`, the name and flags are passed unmodified to
    /// `open()`. A `None` name fails with `EFAULT`.
    ///
    /// # Errors
    ///
    /// * [`Error::Duplicate`] if the source descriptor could not be duplicated.
    /// * [`Error::Open`] if `name` was not a synthetic path and `open()` failed.
    pub fn open_descriptor(&self, name: Option<&CStr>, flags: c_int) -> Result<OwnedFd> {
        debug!(?name, flags, "open_descriptor");

        match name.and_then(SyntheticPath::parse_c_str) {
            Some(path) => self.duplicate(path),
            None => self.open_standard_descriptor(name, flags),
        }
    }

    /// Opens a [`File`], in the manner of [`OpenOptions::open()`].
    ///
    /// If `path` is a synthetic path, the source descriptor is duplicated and the duplicate is
    /// returned as a `File`. The `options` do not apply in this case: the duplicate shares the
    /// access mode and status flags of the source.
    ///
    /// Otherwise the path is opened with `options`.
    ///
    /// # Errors
    ///
    /// * [`Error::Duplicate`] if the source descriptor could not be duplicated.
    /// * [`Error::Open`] if `path` was not a synthetic path and could not be opened.
    pub fn open_file(&self, path: impl AsRef<Path>, options: &OpenOptions) -> Result<File> {
        let path = path.as_ref();

        debug!(?path, "open_file");

        if let Some(synthetic) = SyntheticPath::parse_bytes(path.as_os_str().as_bytes()) {
            return self.duplicate(synthetic).map(File::from);
        }

        options.open(path).map_err(|source| {
            debug!(?path, %source, "standard open failed");

            Error::Open {
                name: Some(path.to_string_lossy().into_owned()),
                source,
            }
        })
    }

    fn duplicate(&self, path: SyntheticPath) -> Result<OwnedFd> {
        let fd = path.fd();

        match self.bindings.duplicate(fd, self.close_on_exec) {
            Ok(derived) => {
                debug!(fd, derived = derived.as_raw_fd(), "duplicated source descriptor");
                Ok(derived)
            }
            Err(source) => {
                warn!(fd, %source, "failed to duplicate source descriptor");
                Err(Error::Duplicate { fd, source })
            }
        }
    }

    fn open_synthetic_stream(&self, path: SyntheticPath, mode: &CStr) -> Result<Stream> {
        let derived = self.duplicate(path)?;
        let derived_fd = derived.as_raw_fd();

        match self.bindings.fdopen(derived_fd, mode) {
            Ok(file) => {
                // fdopen() took ownership, fclose() will close the descriptor.
                let _stream_owned: c_int = derived.into_raw_fd();

                debug!(fd = path.fd(), derived = derived_fd, "opened derived stream");

                // SAFETY: fdopen() just created the stream and nothing else owns it.
                Ok(unsafe { Stream::from_non_null(file) })
            }
            Err(source) => {
                // fdopen() did not take ownership, so the duplicate is still ours to close.
                drop(derived);

                error!(
                    fd = path.fd(),
                    derived = derived_fd,
                    ?mode,
                    %source,
                    "failed to open derived descriptor as a stream"
                );

                Err(Error::Wrap {
                    fd: derived_fd,
                    mode: mode.to_string_lossy().into_owned(),
                    source,
                })
            }
        }
    }

    fn open_standard_stream(&self, name: Option<&CStr>, mode: &CStr) -> Result<Stream> {
        let Some(name) = name else {
            return Err(null_name_error());
        };

        match self.bindings.fopen(name, mode) {
            // SAFETY: fopen() just created the stream and nothing else owns it.
            Ok(file) => Ok(unsafe { Stream::from_non_null(file) }),
            Err(source) => {
                debug!(?name, %source, "standard open failed");
                Err(open_error(name, source))
            }
        }
    }

    fn open_standard_descriptor(&self, name: Option<&CStr>, flags: c_int) -> Result<OwnedFd> {
        let Some(name) = name else {
            return Err(null_name_error());
        };

        self.bindings.open(name, flags).map_err(|source| {
            debug!(?name, %source, "standard open failed");
            open_error(name, source)
        })
    }
}

impl Default for BrokeredOpen {
    fn default() -> Self {
        Self::new()
    }
}

// A null path pointer is EFAULT when it reaches the kernel. The C library does not promise that it
// gets that far, so we answer on its behalf.
fn null_name_error() -> Error {
    debug!("standard open of a null name");

    Error::Open {
        name: None,
        source: io::Error::from_raw_os_error(libc::EFAULT),
    }
}

fn open_error(name: &CStr, source: io::Error) -> Error {
    Error::Open {
        name: Some(name.to_string_lossy().into_owned()),
        source,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io::{Read, Write};
    use std::os::fd::{AsRawFd, RawFd};
    use std::ptr;

    use mockall::predicate::eq;
    use static_assertions::assert_impl_all;
    use testing::{is_write_end_closed, nonblocking_pipe};

    use super::*;
    use crate::pal::MockBindings;

    assert_impl_all!(BrokeredOpen: Send, Sync, Clone);

    fn broker_with(mock: MockBindings) -> BrokeredOpen {
        BrokeredOpenBuilder::with_bindings(BindingsFacade::from_mock(mock)).build()
    }

    fn os_error(code: c_int) -> io::Error {
        io::Error::from_raw_os_error(code)
    }

    #[test]
    fn global_is_single_instance() {
        assert!(ptr::eq(BrokeredOpen::global(), BrokeredOpen::global()));
        assert!(!BrokeredOpen::global().close_on_exec());
    }

    #[test]
    fn stream_duplicate_failure_stops_before_wrapping() {
        let mut mock = MockBindings::new();
        mock.expect_duplicate()
            .with(eq(42), eq(false))
            .times(1)
            .returning(|_, _| Err(os_error(libc::EBADF)));
        mock.expect_fdopen().never();
        mock.expect_fopen().never();

        let error = broker_with(mock)
            .open_stream(Some(c"fd:42"), c"rb")
            .unwrap_err();

        assert!(matches!(error, Error::Duplicate { fd: 42, .. }));
        assert_eq!(error.raw_os_error(), Some(libc::EBADF));
    }

    #[test]
    fn stream_wrap_failure_closes_derived_descriptor() {
        let (reader, writer) = nonblocking_pipe();
        let derived_fd = writer.as_raw_fd();

        let mut mock = MockBindings::new();
        mock.expect_duplicate()
            .with(eq(7), eq(false))
            .return_once(move |_, _| Ok(writer));
        mock.expect_fdopen()
            .withf(move |fd, mode| *fd == derived_fd && mode == c"z")
            .times(1)
            .returning(|_, _| Err(os_error(libc::EINVAL)));
        mock.expect_fopen().never();

        let error = broker_with(mock)
            .open_stream(Some(c"fd:7"), c"z")
            .unwrap_err();

        let Error::Wrap { fd, mode, source } = error else {
            panic!("expected wrap error");
        };

        assert_eq!(fd, derived_fd);
        assert_eq!(mode, "z");
        assert_eq!(source.raw_os_error(), Some(libc::EINVAL));
        assert!(is_write_end_closed(&reader));
    }

    #[test]
    fn stream_non_synthetic_names_fall_through_unmodified() {
        for name in [
            c"fd:", c"fd:0", c"fd:-5", c"fd:abc", c"foo", c"", c"fd:012", c"fd:3 ",
        ] {
            let mut mock = MockBindings::new();
            mock.expect_duplicate().never();
            mock.expect_fdopen().never();
            mock.expect_fopen()
                .withf(move |actual_name, mode| actual_name == name && mode == c"rb")
                .times(1)
                .returning(|_, _| Err(os_error(libc::ENOENT)));

            let error = broker_with(mock).open_stream(Some(name), c"rb").unwrap_err();

            let Error::Open {
                name: Some(reported),
                source,
            } = error
            else {
                panic!("expected open error for {name:?}");
            };

            assert_eq!(reported.as_bytes(), name.to_bytes());
            assert_eq!(source.raw_os_error(), Some(libc::ENOENT));
        }
    }

    #[test]
    fn null_name_is_never_synthetic() {
        let mut mock = MockBindings::new();
        mock.expect_duplicate().never();
        mock.expect_fdopen().never();
        mock.expect_fopen().never();
        mock.expect_open().never();

        let broker = broker_with(mock);

        let error = broker.open_stream(None, c"rb").unwrap_err();
        assert!(matches!(error, Error::Open { name: None, .. }));
        assert_eq!(error.raw_os_error(), Some(libc::EFAULT));

        let error = broker.open_descriptor(None, libc::O_RDONLY).unwrap_err();
        assert!(matches!(error, Error::Open { name: None, .. }));
        assert_eq!(error.raw_os_error(), Some(libc::EFAULT));
    }

    #[test]
    fn descriptor_returns_derived_descriptor() {
        let (_reader, writer) = nonblocking_pipe();
        let derived_fd = writer.as_raw_fd();

        let mut mock = MockBindings::new();
        mock.expect_duplicate()
            .with(eq(9), eq(false))
            .return_once(move |_, _| Ok(writer));
        mock.expect_open().never();

        let derived = broker_with(mock)
            .open_descriptor(Some(c"fd:9"), libc::O_RDONLY)
            .unwrap();

        assert_eq!(derived.as_raw_fd(), derived_fd);
    }

    #[test]
    fn descriptor_duplicate_failure_is_reported() {
        let mut mock = MockBindings::new();
        mock.expect_duplicate()
            .returning(|_, _| Err(os_error(libc::EMFILE)));
        mock.expect_open().never();

        let error = broker_with(mock)
            .open_descriptor(Some(c"fd:3"), libc::O_RDONLY)
            .unwrap_err();

        assert!(matches!(error, Error::Duplicate { fd: 3, .. }));
        assert_eq!(error.raw_os_error(), Some(libc::EMFILE));
    }

    #[test]
    fn descriptor_zero_falls_through_to_standard_open() {
        let mut mock = MockBindings::new();
        mock.expect_duplicate().never();
        mock.expect_open()
            .withf(|name, flags| name == c"fd:0" && *flags == libc::O_RDONLY)
            .times(1)
            .returning(|_, _| Err(os_error(libc::ENOENT)));

        let error = broker_with(mock)
            .open_descriptor(Some(c"fd:0"), libc::O_RDONLY)
            .unwrap_err();

        assert!(matches!(error, Error::Open { .. }));
        assert_eq!(error.raw_os_error(), Some(libc::ENOENT));
    }

    #[test]
    fn close_on_exec_is_requested_when_configured() {
        let mut mock = MockBindings::new();
        mock.expect_duplicate()
            .with(eq(5), eq(true))
            .times(1)
            .returning(|_, _| Err(os_error(libc::EBADF)));

        let broker = BrokeredOpenBuilder::with_bindings(BindingsFacade::from_mock(mock))
            .close_on_exec(true)
            .build();

        broker
            .open_descriptor(Some(c"fd:5"), libc::O_RDONLY)
            .unwrap_err();
    }

    #[test]
    fn file_from_synthetic_path_owns_derived_descriptor() {
        let (mut reader, writer) = nonblocking_pipe();
        let derived_fd: RawFd = writer.as_raw_fd();

        let mut mock = MockBindings::new();
        mock.expect_duplicate()
            .with(eq(11), eq(false))
            .return_once(move |_, _| Ok(writer));

        let mut file = broker_with(mock)
            .open_file("fd:11", File::options().write(true))
            .unwrap();

        assert_eq!(file.as_raw_fd(), derived_fd);

        file.write_all(b"ping").unwrap();
        drop(file);

        let mut received = Vec::new();
        reader.read_to_end(&mut received).unwrap();
        assert_eq!(received, b"ping");
    }

    #[test]
    fn file_from_ordinary_path_uses_options() {
        let mut mock = MockBindings::new();
        mock.expect_duplicate().never();

        let error = broker_with(mock)
            .open_file("fd:0", File::options().read(true))
            .unwrap_err();

        let Error::Open { name, source } = error else {
            panic!("expected open error");
        };

        assert_eq!(name.as_deref(), Some("fd:0"));
        assert_eq!(source.kind(), io::ErrorKind::NotFound);
    }
}
