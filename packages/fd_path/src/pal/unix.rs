mod bindings;
#[cfg(feature = "c-exports")]
mod errno;

pub(crate) use bindings::*;
#[cfg(feature = "c-exports")]
pub(crate) use errno::*;
