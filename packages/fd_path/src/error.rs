use std::io;
use std::os::fd::RawFd;

use thiserror::Error;

/// Errors that can occur when opening files through a [`BrokeredOpen`][crate::BrokeredOpen] or
/// when working with synthetic paths.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller provided a supposed synthetic path but it did not match the expected format.
    ///
    /// Only explicit parsing via [`str::parse()`] reports this. The open operations treat a
    /// malformed synthetic path as an ordinary filesystem path instead.
    #[error("invalid synthetic path syntax: '{invalid_value}' is invalid: {problem}")]
    InvalidSyntax {
        /// The entire value that was rejected.
        invalid_value: String,

        /// A human-readable description of the problem.
        problem: String,
    },

    /// The descriptor cannot be addressed by a synthetic path because its number is not positive.
    #[error("descriptor {fd} cannot be addressed by a synthetic path, only positive numbers can")]
    UnrepresentableDescriptor {
        /// The descriptor number that was rejected.
        fd: RawFd,
    },

    /// The source descriptor named by a synthetic path could not be duplicated.
    ///
    /// This is typically `EBADF` (the descriptor is not open) or `EMFILE` (the process descriptor
    /// table is full). No descriptor was created.
    #[error("failed to duplicate source descriptor {fd}")]
    Duplicate {
        /// The source descriptor number from the synthetic path.
        fd: RawFd,

        /// The operating system error.
        #[source]
        source: io::Error,
    },

    /// A derived descriptor could not be wrapped in a buffered stream.
    ///
    /// The derived descriptor has already been closed when this is reported.
    #[error("failed to open derived descriptor {fd} as a stream with mode '{mode}'")]
    Wrap {
        /// The derived descriptor number, which is no longer open.
        fd: RawFd,

        /// The stream mode requested by the caller.
        mode: String,

        /// The operating system error.
        #[source]
        source: io::Error,
    },

    /// The name was not a synthetic path and the ordinary path-based open failed.
    #[error("failed to open {}", display_name(.name.as_deref()))]
    Open {
        /// The name that was opened, if there was one.
        name: Option<String>,

        /// The operating system error, unchanged.
        #[source]
        source: io::Error,
    },

    /// The source descriptor could not be closed cleanly.
    ///
    /// The descriptor is no longer open when this is reported.
    #[error("failed to close source descriptor {fd}")]
    Close {
        /// The source descriptor number.
        fd: RawFd,

        /// The operating system error.
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// The operating system error behind this error, if there is one.
    #[must_use]
    pub fn os_error(&self) -> Option<&io::Error> {
        match self {
            Self::InvalidSyntax { .. } | Self::UnrepresentableDescriptor { .. } => None,
            Self::Duplicate { source, .. }
            | Self::Wrap { source, .. }
            | Self::Open { source, .. }
            | Self::Close { source, .. } => Some(source),
        }
    }

    /// The raw operating system error code behind this error, if there is one.
    ///
    /// This is the value a C caller would find in `errno`.
    #[must_use]
    pub fn raw_os_error(&self) -> Option<i32> {
        self.os_error().and_then(io::Error::raw_os_error)
    }
}

fn display_name(name: Option<&str>) -> String {
    name.map_or_else(|| "<null name>".to_string(), |name| format!("'{name}'"))
}

/// A specialized `Result` type for `fd_path` operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
