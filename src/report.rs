use std::fmt;

use crate::{backend::Backend, region::RegionHeader};

/// Aggregate byte counts over every region of an arena.
///
/// Built from the raw cursor of each region, so a region the arena has not
/// revisited since [`crate::Arena::free_all`] still counts what it held before
/// the reset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Report {
    /// Bytes between each block start and its cursor, padding included.
    pub used: usize,
    /// Sum of all block sizes.
    pub reserved: usize,
}

impl Report {
    /// Walks the chain once.
    pub(crate) fn collect<'a, B, I>(regions: I) -> Self
    where
        B: Backend + 'a,
        I: IntoIterator<Item = &'a RegionHeader<B>>,
    {
        regions.into_iter().fold(Report::default(), |report, region| Report {
            used: report.used + (region.block_size() - region.available()),
            reserved: report.reserved + region.block_size(),
        })
    }

    /// Reserved bytes not accounted as used.
    #[inline]
    pub const fn free(&self) -> usize {
        self.reserved.saturating_sub(self.used)
    }
}

impl From<Report> for (usize, usize) {
    fn from(report: Report) -> Self {
        (report.used, report.reserved)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} bytes used", self.used, self.reserved)
    }
}
