//! Column masks for stitched alignments
//!
//! Masking is all-or-nothing per column: a column either keeps every row's
//! characters or is replaced with `?` in every row.

use homsampler_common::seq::MASK_CHAR;

use crate::alignment::Alignment;
use crate::model::{Gene, Interval};

/// Sorted, merged, non-overlapping intervals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    pub fn new(intervals: impl IntoIterator<Item = Interval>) -> Self {
        let mut sorted: Vec<Interval> = intervals.into_iter().filter(|i| !i.is_empty()).collect();
        sorted.sort();

        let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
        for iv in sorted {
            match merged.last_mut() {
                // touching intervals merge too
                Some(last) if iv.start <= last.end.saturating_add(1) => {
                    last.end = last.end.max(iv.end);
                },
                _ => merged.push(iv),
            }
        }
        Self { intervals: merged }
    }

    pub fn contains(&self, pos: u64) -> bool {
        let idx = self.intervals.partition_point(|iv| iv.end < pos);
        self.intervals.get(idx).is_some_and(|iv| iv.contains(pos))
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Number of positions covered
    pub fn coverage(&self) -> u64 {
        self.intervals.iter().map(Interval::len).sum()
    }
}

/// What counts as intronic for one member of an ortholog group
#[derive(Debug, Clone)]
pub struct IntronMask {
    span: Interval,
    exons: IntervalSet,
    repeats: IntervalSet,
}

impl IntronMask {
    pub fn for_gene(gene: &Gene) -> Self {
        Self {
            span: gene.location.region.interval(),
            exons: IntervalSet::new(gene.exon_intervals()),
            repeats: IntervalSet::default(),
        }
    }

    pub fn with_repeats(mut self, repeats: impl IntoIterator<Item = Interval>) -> Self {
        self.repeats = IntervalSet::new(repeats);
        self
    }

    /// Position lies in the gene span, off every exon and every repeat
    pub fn is_intronic(&self, pos: u64) -> bool {
        self.span.contains(pos) && !self.exons.contains(pos) && !self.repeats.contains(pos)
    }
}

/// Full-gene mode: columns whose reference position is coding stay visible
pub fn coding_columns(alignment: &Alignment, coding: &IntervalSet) -> Vec<bool> {
    let Some(reference) = alignment.rows.first() else {
        return Vec::new();
    };
    reference
        .coords
        .iter()
        .map(|c| c.is_some_and(|pos| coding.contains(pos)))
        .collect()
}

/// Intron mode: a column stays visible only if it is intronic in every row
///
/// `members` is parallel to `alignment.rows`.
pub fn intronic_columns(alignment: &Alignment, members: &[IntronMask]) -> Vec<bool> {
    let width = alignment.width();
    (0..width)
        .map(|col| {
            alignment.rows.len() == members.len()
                && alignment
                    .rows
                    .iter()
                    .zip(members)
                    .all(|(row, mask)| row.coords[col].is_some_and(|pos| mask.is_intronic(pos)))
        })
        .collect()
}

/// Replace every hidden column with the mask symbol
pub fn apply_mask(alignment: &mut Alignment, visible: &[bool]) {
    for row in &mut alignment.rows {
        for (base, keep) in row.seq.iter_mut().zip(visible) {
            if !keep {
                *base = MASK_CHAR;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_set_merges() {
        let set = IntervalSet::new([
            Interval::new(50, 60),
            Interval::new(10, 20),
            Interval::new(21, 25),
            Interval::new(55, 70),
        ]);
        assert_eq!(set.intervals(), &[Interval::new(10, 25), Interval::new(50, 70)]);
        assert_eq!(set.coverage(), 16 + 21);
        assert!(set.contains(10));
        assert!(set.contains(25));
        assert!(!set.contains(26));
        assert!(set.contains(70));
        assert!(!set.contains(71));
        assert!(!IntervalSet::default().contains(1));
    }

    #[test]
    fn test_intron_mask_excludes_exons_and_repeats() {
        let mask = IntronMask {
            span: Interval::new(100, 200),
            exons: IntervalSet::new([Interval::new(100, 120), Interval::new(180, 200)]),
            repeats: IntervalSet::default(),
        }
        .with_repeats([Interval::new(140, 145)]);

        assert!(!mask.is_intronic(99));
        assert!(!mask.is_intronic(110));
        assert!(mask.is_intronic(121));
        assert!(!mask.is_intronic(142));
        assert!(mask.is_intronic(179));
        assert!(!mask.is_intronic(201));
    }
}
