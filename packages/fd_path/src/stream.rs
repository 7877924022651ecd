use std::fmt::{self, Debug};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::mem::ManuallyDrop;
use std::os::fd::{AsRawFd, RawFd};
use std::ptr::NonNull;

/// An owned C buffered stream (`FILE *`).
///
/// This is what [`BrokeredOpen::open_stream()`][crate::BrokeredOpen::open_stream] returns. The
/// stream exclusively owns its descriptor: dropping the stream closes it via `fclose()`.
///
/// Use [`into_raw()`][Self::into_raw] to hand the stream over to C code, which then becomes
/// responsible for calling `fclose()` on it.
///
/// The [`Read`], [`Write`] and [`Seek`] implementations go through the stream's own buffer, so
/// they can be mixed freely with C code that operates on the same stream.
pub struct Stream {
    file: NonNull<libc::FILE>,
}

impl Stream {
    /// Takes ownership of a C stream.
    ///
    /// Returns `None` if `file` is null.
    ///
    /// # Safety
    ///
    /// `file` must be null or a valid stream that nothing else will close.
    #[must_use]
    pub unsafe fn from_raw(file: *mut libc::FILE) -> Option<Self> {
        NonNull::new(file).map(|file| Self { file })
    }

    /// # Safety
    ///
    /// `file` must be a valid stream that nothing else will close.
    pub(crate) unsafe fn from_non_null(file: NonNull<libc::FILE>) -> Self {
        Self { file }
    }

    /// Returns the underlying C stream, which remains owned by this value.
    #[must_use]
    pub fn as_ptr(&self) -> *mut libc::FILE {
        self.file.as_ptr()
    }

    /// Releases ownership of the underlying C stream to the caller, who becomes responsible
    /// for closing it with `fclose()`.
    #[must_use]
    pub fn into_raw(self) -> *mut libc::FILE {
        ManuallyDrop::new(self).file.as_ptr()
    }

    /// Flushes and closes the stream, reporting any error.
    ///
    /// Dropping the stream also closes it but ignores errors.
    ///
    /// # Errors
    ///
    /// Returns the operating system error if flushing or closing failed. The stream and its
    /// descriptor are closed either way.
    pub fn close(self) -> io::Result<()> {
        let file = self.into_raw();

        // SAFETY: We own the stream and it is not used after this.
        let result = unsafe { libc::fclose(file) };

        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    fn take_error(&mut self) -> Option<io::Error> {
        // SAFETY: The stream is valid for as long as we own it.
        let failed = unsafe { libc::ferror(self.as_ptr()) } != 0;

        if !failed {
            return None;
        }

        let error = io::Error::last_os_error();

        // SAFETY: The stream is valid for as long as we own it.
        unsafe {
            libc::clearerr(self.as_ptr());
        }

        Some(error)
    }
}

// SAFETY: C streams carry their own lock, so they may be used from any thread, one at a time.
unsafe impl Send for Stream {}

impl AsRawFd for Stream {
    fn as_raw_fd(&self) -> RawFd {
        // SAFETY: The stream is valid for as long as we own it.
        unsafe { libc::fileno(self.as_ptr()) }
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        // SAFETY: The buffer is valid for writes of `buf.len()` bytes and the stream is valid
        // for as long as we own it.
        let read = unsafe { libc::fread(buf.as_mut_ptr().cast(), 1, buf.len(), self.as_ptr()) };

        if read == 0 {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
        }

        Ok(read)
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        // SAFETY: The buffer is valid for reads of `buf.len()` bytes and the stream is valid
        // for as long as we own it.
        let written = unsafe { libc::fwrite(buf.as_ptr().cast(), 1, buf.len(), self.as_ptr()) };

        if written == 0 {
            if let Some(error) = self.take_error() {
                return Err(error);
            }
        }

        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        // SAFETY: The stream is valid for as long as we own it.
        let result = unsafe { libc::fflush(self.as_ptr()) };

        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

impl Seek for Stream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            SeekFrom::Start(offset) => (to_file_offset(offset)?, libc::SEEK_SET),
            SeekFrom::End(offset) => (to_file_offset(offset)?, libc::SEEK_END),
            SeekFrom::Current(offset) => (to_file_offset(offset)?, libc::SEEK_CUR),
        };

        // SAFETY: The stream is valid for as long as we own it.
        if unsafe { libc::fseeko(self.as_ptr(), offset, whence) } != 0 {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: The stream is valid for as long as we own it.
        let position = unsafe { libc::ftello(self.as_ptr()) };

        if position < 0 {
            return Err(io::Error::last_os_error());
        }

        u64::try_from(position)
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        // There is nobody to report the error to. Callers who care use close().
        // SAFETY: We own the stream and it is not used after this.
        unsafe {
            libc::fclose(self.as_ptr());
        }
    }
}

impl Debug for Stream {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("file", &self.file)
            .field("fd", &self.as_raw_fd())
            .finish()
    }
}

// 32-bit Android has a 32-bit off_t, everything else we build for has a 64-bit one.
fn to_file_offset<T>(offset: T) -> io::Result<libc::off_t>
where
    libc::off_t: TryFrom<T>,
    <libc::off_t as TryFrom<T>>::Error: std::error::Error + Send + Sync + 'static,
{
    libc::off_t::try_from(offset)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error))
}
