use crate::utils::is_power_of_two;

/// Alignment used by the shorthand allocation calls ([`crate::Arena::alloc`] and friends).
pub const DEFAULT_ALIGNMENT: usize = 8;

/// How many times the page-rounded request a grow-on-demand region is sized to.
pub const DEFAULT_FACTOR: usize = 4;

/// Alignment of every range handed out by the built-in heap backend.
pub const BACKEND_ALIGNMENT: usize = 16;

/// Tunables of an [`crate::Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
    growth_factor: usize,
    default_alignment: usize,
}

impl ArenaConfig {
    pub const fn new() -> Self {
        Self {
            growth_factor: DEFAULT_FACTOR,
            default_alignment: DEFAULT_ALIGNMENT,
        }
    }

    /// Sets the growth factor. `0` behaves as `1` (no scaling).
    pub const fn with_growth_factor(mut self, factor: usize) -> Self {
        self.growth_factor = if factor == 0 { 1 } else { factor };
        self
    }

    /// Sets the alignment used by the shorthand allocation calls.
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is not a power of two.
    pub const fn with_default_alignment(mut self, alignment: usize) -> Self {
        assert!(is_power_of_two(alignment), "default alignment must be a power of two");
        self.default_alignment = alignment;
        self
    }

    #[inline]
    pub const fn growth_factor(&self) -> usize {
        self.growth_factor
    }

    #[inline]
    pub const fn default_alignment(&self) -> usize {
        self.default_alignment
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}
