use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};

use tracing::{debug, warn};

use crate::pal::{Bindings, BindingsFacade};
use crate::{Error, Result, SyntheticPath};

/// Keeps a source descriptor open for as long as a consuming library may open its synthetic path.
///
/// This is the caller's side of the contract: the descriptor a synthetic path names must stay open
/// until the consuming library is done with it, typically until a model is unloaded. Holding a
/// `SourceHandle` for that duration and then closing it discharges that responsibility.
///
/// Using this type is optional. Any descriptor that the caller keeps open by other means works
/// equally well with [`SyntheticPath::for_fd()`].
///
/// # Example
///
/// ```
/// use std::fs::File;
///
/// use fd_path::{BrokeredOpen, SourceHandle};
///
/// # let model = tempfile::NamedTempFile::new().unwrap();
/// let source = SourceHandle::new(File::open(model.path()).unwrap()).unwrap();
///
/// let derived = BrokeredOpen::global()
///     .open_file(source.path().to_string(), &File::options())
///     .unwrap();
///
/// // Closing the source does not affect descriptors derived from it.
/// source.close().unwrap();
/// assert!(derived.metadata().is_ok());
/// ```
#[derive(Debug)]
pub struct SourceHandle {
    fd: OwnedFd,
    path: SyntheticPath,
}

impl SourceHandle {
    /// Takes ownership of a source descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrepresentableDescriptor`] if the descriptor cannot be addressed by a
    /// synthetic path (descriptor 0). The descriptor is closed in that case.
    pub fn new(fd: impl Into<OwnedFd>) -> Result<Self> {
        let fd = fd.into();
        let raw = fd.as_raw_fd();

        let path = SyntheticPath::for_fd(&fd)
            .ok_or(Error::UnrepresentableDescriptor { fd: raw })?;

        debug!(fd = raw, %path, "source handle opened");

        Ok(Self { fd, path })
    }

    /// The synthetic path that addresses the source descriptor.
    #[must_use]
    pub fn path(&self) -> SyntheticPath {
        self.path
    }

    /// Closes the source descriptor, reporting any error.
    ///
    /// Descriptors derived from the source remain open. Dropping the handle also closes the
    /// source descriptor but ignores errors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Close`] if the operating system reported an error. The descriptor is
    /// closed either way.
    pub fn close(self) -> Result<()> {
        let fd = self.path.fd();

        BindingsFacade::target().close(self.fd).map_err(|source| {
            warn!(fd, %source, "failed to close source descriptor");
            Error::Close { fd, source }
        })?;

        debug!(fd, "source handle closed");
        Ok(())
    }

    /// Releases the source descriptor to the caller without closing it.
    #[must_use]
    pub fn into_inner(self) -> OwnedFd {
        self.fd
    }
}

impl AsFd for SourceHandle {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for SourceHandle {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl From<SourceHandle> for OwnedFd {
    fn from(value: SourceHandle) -> Self {
        value.into_inner()
    }
}
