//! Helper arithmetic shared by the region bump logic and the arena growth policy.
//! None of these functions belong to a concrete module of the allocator.

/// Returns `true` if `value` is a power of two. Zero is not.
#[inline]
pub const fn is_power_of_two(value: usize) -> bool {
    value != 0 && (value & (value - 1)) == 0
}

/// Normalizes a caller supplied alignment.
///
/// `0` means "no alignment requirement" and becomes `1`. Any other value must be
/// a power of two: continuing with anything else would silently corrupt the bump
/// arithmetic, so this is a contract fault and panics.
#[inline]
pub(crate) fn checked_alignment(alignment: usize) -> usize {
    if alignment == 0 {
        return 1;
    }

    assert!(
        is_power_of_two(alignment),
        "alignment must be a power of two, got {alignment}"
    );

    alignment
}

/// It aligns `to_be_aligned` up to the next multiple of `alignment`.
///
/// Used both to align addresses inside a region's block and to round region
/// sizes up to a multiple of [`crate::kernel::page_size`]. Returns `None` when
/// the result does not fit in a `usize`.
///
/// `alignment` must be a power of two.
#[inline]
pub fn align(to_be_aligned: usize, alignment: usize) -> Option<usize> {
    debug_assert!(is_power_of_two(alignment));

    to_be_aligned
        .checked_add(alignment - 1)
        .map(|value| value & !(alignment - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn align_pointer_size() {
        let alignments = vec![(1..8, 8), (9..16, 16), (17..24, 24), (25..32, 32)];

        for (sizes, expected) in alignments {
            for size in sizes {
                assert_eq!(Some(expected), align(size, mem::size_of::<u64>()));
            }
        }
    }

    #[test]
    fn align_page_size() {
        // For testing purposes we are assuming the page size is 4096
        let alignments = vec![(1..4096, 4096), (4097..8192, 8192)];

        for (sizes, expected) in alignments {
            for size in sizes {
                assert_eq!(Some(expected), align(size, 4096));
            }
        }
    }

    #[test]
    fn aligned_values_are_untouched() {
        for alignment in [1, 2, 4, 8, 16, 4096] {
            assert_eq!(Some(alignment * 3), align(alignment * 3, alignment));
        }
        assert_eq!(Some(0), align(0, 16));
    }

    #[test]
    fn align_overflow_is_reported() {
        assert_eq!(None, align(usize::MAX, 16));
        assert_eq!(Some(usize::MAX), align(usize::MAX, 1));
    }

    #[test]
    fn powers_of_two() {
        assert!(!is_power_of_two(0));
        assert!(is_power_of_two(1));
        assert!(is_power_of_two(64));
        assert!(!is_power_of_two(24));
    }

    #[test]
    fn zero_alignment_means_unaligned() {
        assert_eq!(1, checked_alignment(0));
        assert_eq!(16, checked_alignment(16));
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn non_power_of_two_alignment_panics() {
        checked_alignment(12);
    }
}
