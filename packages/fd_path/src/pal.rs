//! Platform Abstraction Layer (PAL). Every call into the C library that the open operations make
//! goes through the [`Bindings`] trait, so unit tests can substitute failures that the real
//! operating system will not produce on demand.

mod abstractions;
pub(crate) use abstractions::*;

mod facade;
pub(crate) use facade::*;

mod unix;
pub(crate) use unix::*;
