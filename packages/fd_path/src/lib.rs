#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Lets an already-open file descriptor stand in for a path string, for libraries that only ever
//! open their input by path.
//!
//! Sandboxed storage permission systems commonly hand out capability-scoped descriptors that have
//! no filesystem path at all. Model-loading libraries, on the other hand, address their input by
//! path and open it several times during a load: once to read metadata, again to memory-map the
//! weights and possibly more for fallback paths. This package bridges the two with a synthetic
//! path convention:
//!
//! ```text
//! fd:<descriptor number>
//! ```
//!
//! Every open of a synthetic path duplicates the source descriptor, so each open yields a handle
//! that can be closed independently, without invalidating the source or any other handle derived
//! from it. Every other name falls through to the ordinary path-based open, unmodified.
//!
//! # Example
//!
//! ```
//! use std::fs::File;
//! use std::io::Read;
//!
//! use fd_path::{BrokeredOpen, SourceHandle};
//!
//! # let model = tempfile::NamedTempFile::new().unwrap();
//! # std::fs::write(model.path(), b"GGUF").unwrap();
//! # let capability_scoped_file = File::open(model.path()).unwrap();
//! // The host receives an open file from its storage permission system.
//! let source = SourceHandle::new(capability_scoped_file).unwrap();
//!
//! // The path string is what the consuming library gets to see.
//! let path = source.path().to_string();
//! assert!(path.starts_with("fd:"));
//!
//! // The library opens "the file" as many times as it likes.
//! let broker = BrokeredOpen::global();
//! let mut metadata = broker.open_file(&path, File::options().read(true)).unwrap();
//! let weights = broker.open_file(&path, File::options().read(true)).unwrap();
//!
//! let mut magic = [0_u8; 4];
//! metadata.read_exact(&mut magic).unwrap();
//! assert_eq!(&magic, b"GGUF");
//!
//! // Each derived handle closes on its own schedule.
//! drop(metadata);
//! drop(weights);
//!
//! // The caller decides when the source itself goes away.
//! source.close().unwrap();
//! ```
//!
//! # Entry points
//!
//! [`BrokeredOpen`] offers one entry point per open convention:
//!
//! * [`open_stream()`][BrokeredOpen::open_stream] mirrors `fopen()` and returns a C buffered
//!   [`Stream`].
//! * [`open_descriptor()`][BrokeredOpen::open_descriptor] mirrors `open()` and returns an
//!   [`OwnedFd`][std::os::fd::OwnedFd].
//! * [`open_file()`][BrokeredOpen::open_file] mirrors [`OpenOptions::open()`][1] and returns a
//!   [`File`][std::fs::File].
//!
//! With the `c-exports` Cargo feature enabled, the package also exports the `ggml_fopen` and
//! `llama_open` C ABI symbols, so a model-loading library that calls them routes its opens through
//! [`BrokeredOpen::global()`] without any modification.
//!
//! # Ownership of the source descriptor
//!
//! The source descriptor belongs to the caller. This package never closes it and never assumes it
//! is the only reference to the underlying file. The caller must keep it open for as long as the
//! consuming library may open the synthetic path and close it afterwards, either directly or by
//! wrapping it in a [`SourceHandle`].
//!
//! Derived descriptors share the open file description of the source, including the file offset
//! and status flags, as defined by the operating system's descriptor duplication semantics.
//!
//! # Operating system compatibility
//!
//! This package requires a Unix-like operating system. On other operating systems it is empty.
//!
//! [1]: std::fs::OpenOptions::open

#[cfg(unix)]
mod brokered_open;
#[cfg(unix)]
mod brokered_open_builder;
#[cfg(all(unix, feature = "c-exports"))]
mod c_exports;
#[cfg(unix)]
mod error;
#[cfg(unix)]
mod source_handle;
#[cfg(unix)]
mod stream;
#[cfg(unix)]
mod synthetic_path;

#[cfg(unix)]
pub use brokered_open::*;
#[cfg(unix)]
pub use brokered_open_builder::*;
#[cfg(all(unix, feature = "c-exports"))]
pub use c_exports::*;
#[cfg(unix)]
pub use error::*;
#[cfg(unix)]
pub use source_handle::*;
#[cfg(unix)]
pub use stream::*;
#[cfg(unix)]
pub use synthetic_path::*;

#[cfg(unix)]
pub(crate) mod pal;
