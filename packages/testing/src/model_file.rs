use std::fs::File;
use std::io::Write;

use tempfile::NamedTempFile;

/// Bytes that a model-loading library would find at the start of a GGUF model file.
pub const MODEL_MAGIC: &[u8; 4] = b"GGUF";

/// Creates a temporary file that stands in for a model file, with the given contents after the
/// magic bytes.
///
/// The file is deleted when the returned value is dropped.
///
/// # Panics
///
/// Panics if the file cannot be created or written.
#[must_use]
pub fn model_file(payload: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temporary file must be creatable");

    file.write_all(MODEL_MAGIC).expect("temporary file must be writable");
    file.write_all(payload).expect("temporary file must be writable");
    file.flush().expect("temporary file must be writable");

    file
}

/// Opens a model file read-only, the way a storage permission system would hand it out.
///
/// # Panics
///
/// Panics if the file cannot be opened.
#[must_use]
pub fn open_read_only(model: &NamedTempFile) -> File {
    File::open(model.path()).expect("temporary file must be readable")
}
