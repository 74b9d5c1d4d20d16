//! Codec configuration.

/// What to do when a value has no natural descriptor (containers encoded
/// without one) and would fall back to the opaque format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImplicitOpaque {
    /// Encode opaquely and log a warning.
    #[default]
    Warn,
    /// Encode opaquely without logging.
    Allow,
    /// Fail with [`EncodeError::ImplicitOpaque`](crate::EncodeError::ImplicitOpaque).
    Deny,
}

/// Options shared by every call made through a [`Codec`](crate::Codec).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub implicit_opaque: ImplicitOpaque,
    /// Upper bound on the capacity reserved up front for a decoded container,
    /// whatever count the input claims.
    pub max_prealloc: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            implicit_opaque: ImplicitOpaque::Warn,
            max_prealloc: 4096,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn implicit_opaque(mut self, policy: ImplicitOpaque) -> Self {
        self.implicit_opaque = policy;
        self
    }

    pub fn max_prealloc(mut self, max: usize) -> Self {
        self.max_prealloc = max;
        self
    }
}
