//! Cross-file comparison of analyzed documents.
//!
//! Each side is reported independently: total segments, total dataset
//! blocks, and every segment matching the name filter with its region and
//! verdict. Pairing across files is positional within the filtered,
//! same-named subsequence of each file. It is not semantic: the n-th matching
//! segment of one file is not known to describe the same region or contact as
//! the n-th of the other.

use crate::types::{DocumentReport, QualityLabel};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One filtered segment of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedSegment {
    /// Segment ordinal in its document
    pub ordinal: usize,
    /// Region tag, verbatim
    pub validity_region: Option<String>,
    /// `None` when the segment was not classified
    pub label: Option<QualityLabel>,
    /// Whether the verdict covers every declared value
    pub sample_complete: bool,
    /// Count declared by the source
    pub declared_count: usize,
}

/// Per-file half of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSide {
    /// File identifier
    pub file: String,
    /// Segments with a `Values` block
    pub total_segments: usize,
    /// Every dataset block, including those without values
    pub total_blocks: usize,
    /// Segments matching the filter
    pub matched_count: usize,
    /// Matching segments in source order
    pub matched: Vec<MatchedSegment>,
}

impl FileSide {
    fn from_report(report: &DocumentReport, filter: &str) -> Self {
        let matched: Vec<MatchedSegment> = report
            .segments_named(filter)
            .map(|s| {
                let verdict = report.classification_for(s.ordinal);
                MatchedSegment {
                    ordinal: s.ordinal,
                    validity_region: s.validity_region.clone(),
                    label: verdict.map(|c| c.label),
                    sample_complete: s.sample_complete,
                    declared_count: s.declared_count,
                }
            })
            .collect();

        Self {
            file: report.file.clone(),
            total_segments: report.segments.len(),
            total_blocks: report.inventory.len().max(report.segments.len()),
            matched_count: matched.len(),
            matched,
        }
    }
}

/// Position `index` in both filtered subsequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentPair {
    /// Position in the filtered subsequences
    pub index: usize,
    /// Left file's segment at `index`
    pub left: Option<MatchedSegment>,
    /// Right file's segment at `index`
    pub right: Option<MatchedSegment>,
}

impl SegmentPair {
    /// Both sides present with different region tags.
    pub fn region_changed(&self) -> bool {
        match (&self.left, &self.right) {
            (Some(l), Some(r)) => l.validity_region != r.validity_region,
            _ => false,
        }
    }

    /// Both sides classified with different labels.
    pub fn label_changed(&self) -> bool {
        match (&self.left, &self.right) {
            (Some(l), Some(r)) => l.label != r.label,
            _ => false,
        }
    }
}

/// Structured comparison of two documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Dataset name compared
    pub filter: String,
    /// First document
    pub left: FileSide,
    /// Second document
    pub right: FileSide,
    /// Positional pairs, as many as the longer filtered subsequence
    pub pairs: Vec<SegmentPair>,
    /// `right.matched_count - left.matched_count`
    pub count_difference: i64,
}

impl ComparisonReport {
    /// Whether both files hold the same number of matching segments.
    pub fn counts_match(&self) -> bool {
        self.count_difference == 0
    }

    /// Pairs whose labels differ.
    pub fn label_changes(&self) -> impl Iterator<Item = &SegmentPair> {
        self.pairs.iter().filter(|p| p.label_changed())
    }
}

/// Compare the segments named `filter` in two reports.
pub fn compare(left: &DocumentReport, right: &DocumentReport, filter: &str) -> ComparisonReport {
    let left_side = FileSide::from_report(left, filter);
    let right_side = FileSide::from_report(right, filter);

    let len = left_side.matched_count.max(right_side.matched_count);
    let pairs = (0..len)
        .map(|index| SegmentPair {
            index,
            left: left_side.matched.get(index).cloned(),
            right: right_side.matched.get(index).cloned(),
        })
        .collect();

    let count_difference = right_side.matched_count as i64 - left_side.matched_count as i64;
    debug!(
        filter,
        left = left_side.matched_count,
        right = right_side.matched_count,
        "compared documents"
    );

    ComparisonReport {
        filter: filter.to_string(),
        left: left_side,
        right: right_side,
        pairs,
        count_difference,
    }
}
