use std::ffi::{CStr, CString};
use std::fmt::{self, Display};
use std::num::NonZero;
use std::os::fd::{AsFd, AsRawFd, RawFd};
use std::str::FromStr;

use crate::Error;

/// A path string that addresses an already-open file descriptor instead of a file on a filesystem.
///
/// The textual form is the prefix `fd:` followed immediately by the descriptor number in base 10,
/// for example `fd:123`. The number must be positive and must be written with ASCII digits only,
/// without a sign, without leading zeros and without any surrounding whitespace or suffix. Any
/// string that deviates from this form is an ordinary filesystem path.
///
/// A synthetic path does not own the descriptor it names. The descriptor must stay open for as
/// long as anything may open the synthetic path.
///
/// # Example
///
/// ```
/// use fd_path::SyntheticPath;
///
/// let path = SyntheticPath::parse("fd:123").unwrap();
/// assert_eq!(path.fd(), 123);
/// assert_eq!(path.to_string(), "fd:123");
///
/// // Near misses are ordinary paths.
/// assert!(SyntheticPath::parse("fd:0").is_none());
/// assert!(SyntheticPath::parse("fd:0123").is_none());
/// assert!(SyntheticPath::parse("fd: 123").is_none());
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SyntheticPath {
    fd: NonZero<RawFd>,
}

impl SyntheticPath {
    /// The prefix that marks a path string as a synthetic path.
    pub const PREFIX: &'static str = "fd:";

    /// Creates a synthetic path for the descriptor with the given number.
    ///
    /// Returns `None` if the number is not positive.
    #[must_use]
    pub fn new(fd: RawFd) -> Option<Self> {
        if fd <= 0 {
            return None;
        }

        NonZero::new(fd).map(|fd| Self { fd })
    }

    /// Creates a synthetic path for an open descriptor.
    ///
    /// Returns `None` if the descriptor number is 0, which synthetic paths cannot address.
    ///
    /// The caller must keep the descriptor open for as long as anything may open the path.
    #[must_use]
    pub fn for_fd(fd: impl AsFd) -> Option<Self> {
        Self::new(fd.as_fd().as_raw_fd())
    }

    /// Matches a path string against the synthetic path format.
    ///
    /// Returns `None` if the string is an ordinary filesystem path.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::parse_bytes(name.as_bytes())
    }

    /// Matches a path string given as raw bytes against the synthetic path format.
    ///
    /// Returns `None` if the bytes are an ordinary filesystem path.
    #[must_use]
    pub fn parse_bytes(name: &[u8]) -> Option<Self> {
        let digits = name.strip_prefix(Self::PREFIX.as_bytes())?;

        parse_descriptor_number(digits).ok().map(|fd| Self { fd })
    }

    /// Matches a C string against the synthetic path format.
    ///
    /// Returns `None` if the string is an ordinary filesystem path.
    #[must_use]
    pub fn parse_c_str(name: &CStr) -> Option<Self> {
        Self::parse_bytes(name.to_bytes())
    }

    /// The number of the descriptor this path addresses.
    #[must_use]
    pub fn fd(&self) -> RawFd {
        self.fd.get()
    }

    /// Returns the path as a C string, for handing to a library that takes `const char *` paths.
    #[must_use]
    pub fn to_c_string(&self) -> CString {
        CString::new(self.to_string()).expect("synthetic paths never contain NUL bytes")
    }
}

impl Display for SyntheticPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.fd)
    }
}

impl FromStr for SyntheticPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |problem: &str| Error::InvalidSyntax {
            invalid_value: s.to_string(),
            problem: problem.to_string(),
        };

        let digits = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| invalid("the 'fd:' prefix is missing"))?;

        parse_descriptor_number(digits.as_bytes())
            .map(|fd| Self { fd })
            .map_err(invalid)
    }
}

fn parse_descriptor_number(digits: &[u8]) -> Result<NonZero<RawFd>, &'static str> {
    match digits {
        [] => Err("the descriptor number is missing"),
        [b'0'] => Err("the descriptor number must be positive"),
        [b'0', ..] => Err("the descriptor number must not have leading zeros"),
        _ if !digits.iter().all(u8::is_ascii_digit) => {
            Err("the descriptor number must consist of decimal digits only")
        }
        _ => std::str::from_utf8(digits)
            .ok()
            .and_then(|digits| digits.parse::<NonZero<RawFd>>().ok())
            .ok_or("the descriptor number is out of range"),
    }
}
