#![cfg_attr(coverage_nightly, coverage(off))]

use std::ffi::{CStr, c_int};
use std::fmt::Debug;
use std::io;
use std::os::fd::{OwnedFd, RawFd};
use std::ptr::NonNull;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use crate::pal::MockBindings;
use crate::pal::{Bindings, BuildTargetBindings};

/// Enum to hide the real/mock choice behind a single wrapper type.
#[derive(Clone)]
pub(crate) enum BindingsFacade {
    Target(&'static BuildTargetBindings),

    #[cfg(test)]
    Mock(Arc<MockBindings>),
}

impl BindingsFacade {
    pub(crate) const fn target() -> Self {
        Self::Target(&BuildTargetBindings)
    }

    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockBindings) -> Self {
        Self::Mock(Arc::new(mock))
    }
}

impl Bindings for BindingsFacade {
    fn duplicate(&self, fd: RawFd, close_on_exec: bool) -> io::Result<OwnedFd> {
        match self {
            Self::Target(bindings) => bindings.duplicate(fd, close_on_exec),
            #[cfg(test)]
            Self::Mock(mock) => mock.duplicate(fd, close_on_exec),
        }
    }

    fn fdopen(&self, fd: RawFd, mode: &CStr) -> io::Result<NonNull<libc::FILE>> {
        match self {
            Self::Target(bindings) => bindings.fdopen(fd, mode),
            #[cfg(test)]
            Self::Mock(mock) => mock.fdopen(fd, mode),
        }
    }

    fn fopen(&self, name: &CStr, mode: &CStr) -> io::Result<NonNull<libc::FILE>> {
        match self {
            Self::Target(bindings) => bindings.fopen(name, mode),
            #[cfg(test)]
            Self::Mock(mock) => mock.fopen(name, mode),
        }
    }

    fn open(&self, name: &CStr, flags: c_int) -> io::Result<OwnedFd> {
        match self {
            Self::Target(bindings) => bindings.open(name, flags),
            #[cfg(test)]
            Self::Mock(mock) => mock.open(name, flags),
        }
    }

    fn close(&self, fd: OwnedFd) -> io::Result<()> {
        match self {
            Self::Target(bindings) => bindings.close(fd),
            #[cfg(test)]
            Self::Mock(mock) => mock.close(fd),
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))] // No API contract to test.
impl Debug for BindingsFacade {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target(inner) => inner.fmt(f),
            #[cfg(test)]
            Self::Mock(inner) => inner.fmt(f),
        }
    }
}
