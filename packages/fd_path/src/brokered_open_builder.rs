use crate::BrokeredOpen;
use crate::pal::BindingsFacade;

/// Builds a [`BrokeredOpen`] with custom configuration.
///
/// You can obtain a builder via [`BrokeredOpen::builder()`].
///
/// # Example
///
/// ```
/// use fd_path::BrokeredOpen;
///
/// // Descriptors handed to the consuming library do not leak into child processes.
/// let broker = BrokeredOpen::builder().close_on_exec(true).build();
/// # drop(broker);
/// ```
#[derive(Clone, Debug)]
pub struct BrokeredOpenBuilder {
    close_on_exec: bool,

    bindings: BindingsFacade,
}

impl BrokeredOpenBuilder {
    /// Creates a builder with the default configuration.
    ///
    /// By default, derived descriptors are plain duplicates of the source descriptor, without the
    /// close-on-exec flag.
    #[must_use]
    pub fn new() -> Self {
        Self::with_bindings(BindingsFacade::target())
    }

    pub(crate) const fn with_bindings(bindings: BindingsFacade) -> Self {
        Self {
            close_on_exec: false,
            bindings,
        }
    }

    /// Sets whether derived descriptors are created with the close-on-exec flag set.
    ///
    /// When enabled, each duplication atomically marks the new descriptor close-on-exec, so no
    /// child process spawned concurrently can inherit it. The source descriptor is not affected.
    #[must_use]
    pub fn close_on_exec(mut self, close_on_exec: bool) -> Self {
        self.close_on_exec = close_on_exec;
        self
    }

    /// Creates the [`BrokeredOpen`] with the configuration of this builder.
    #[must_use]
    pub fn build(self) -> BrokeredOpen {
        BrokeredOpen::with_internals(self.close_on_exec, self.bindings)
    }
}

impl Default for BrokeredOpenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
