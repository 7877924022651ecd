//! We hand a model file to a loader that only accepts path strings, without giving the loader
//! any access to the file system.
//!
//! The file is opened once, the way a storage permission system would hand it out, and the loader
//! receives an `fd:N` synthetic path instead of the real location. Every open the loader performs
//! on that path yields its own independent descriptor.
//!
//! Run with `RUST_LOG=fd_path=debug` to see the broker's decisions.

use std::ffi::CStr;
use std::io::Read;

use fd_path::{BrokeredOpen, SourceHandle};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let model = testing::model_file(b"weights");
    let source = SourceHandle::new(testing::open_read_only(&model)).unwrap();

    println!("Loader receives path {}", source.path());

    load(&source.path().to_c_string());

    // The model is unloaded, so the source descriptor is no longer needed.
    source.close().unwrap();
}

/// Stands in for a model-loading library: reads the header via a stream, then maps the rest via
/// a descriptor, each opened separately by name.
fn load(path: &CStr) {
    let broker = BrokeredOpen::global();

    let mut header = broker.open_stream(Some(path), c"rb").unwrap();
    let mut magic = [0_u8; 4];
    header.read_exact(&mut magic).unwrap();
    header.close().unwrap();

    println!("Header: {}", String::from_utf8_lossy(&magic));

    let weights = broker.open_descriptor(Some(path), libc::O_RDONLY).unwrap();
    let mut contents = Vec::new();
    std::fs::File::from(weights).read_to_end(&mut contents).unwrap();

    println!("Read {} bytes through an independent descriptor", contents.len());
}
