#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for tests, benchmarks and examples in the `fd_path` workspace.

#[cfg(unix)]
mod descriptors;
#[cfg(unix)]
mod model_file;

#[cfg(unix)]
pub use descriptors::*;
#[cfg(unix)]
pub use model_file::*;
