//! Registry configuration parameters.

/// Configuration for a [`crate::RegionRegistry`].
///
/// Controls how requested byte sizes are rounded into actual region
/// capacities. All values are immutable after creation.
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// Rounding quantum for region capacities in bytes.
    ///
    /// Default: 8 (one backing word). Every `allocate`/`resize` request is
    /// rounded up to a multiple of this, so the actual capacity handed back
    /// to views is always ≥ the requested size.
    pub word_bytes: usize,
}

impl RegistryConfig {
    /// Default rounding quantum: one backing word.
    pub const DEFAULT_WORD_BYTES: usize = 8;

    /// Round a requested size up to the configured quantum.
    pub fn round_up(&self, bytes: usize) -> usize {
        bytes.div_ceil(self.word_bytes) * self.word_bytes
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            word_bytes: Self::DEFAULT_WORD_BYTES,
        }
    }
}
