//! Remaining space on the last page of a rendered document.
//!
//! The vertical extent of the page crop is kept as a set of disjoint
//! half-open intervals; every text block is chopped out of it and what is
//! left are the vertical gaps. The gap above the first block is never
//! counted, neither is the one at the bottom when the page carries a page
//! number. The metric is the widest remaining gap, in points.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vary_sandbox::render::RenderedDocument;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpaceError {
    #[error("no gap left between the page's text blocks")]
    Degenerate,

    #[error("rendered document has no pages")]
    NoPages,

    #[error("document did not report its remaining space")]
    NoIndicator,
}

/// Where the space metric comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpaceSource {
    /// Page geometry, bottom gap reserved for the page number.
    #[default]
    Geometry,
    /// Page geometry, bottom gap counted.
    GeometryNoPageNumber,
    /// Value written by the in-document indicator (may be negative).
    TexIndicator,
}

impl fmt::Display for SpaceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpaceSource::Geometry => "geometry",
            SpaceSource::GeometryNoPageNumber => "geometry-no-page-number",
            SpaceSource::TexIndicator => "tex-indicator",
        };
        f.write_str(name)
    }
}

impl FromStr for SpaceSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "geometry" => Ok(SpaceSource::Geometry),
            "geometry-no-page-number" => Ok(SpaceSource::GeometryNoPageNumber),
            "tex-indicator" => Ok(SpaceSource::TexIndicator),
            other => Err(format!(
                "unknown space source '{other}' (expected geometry, geometry-no-page-number or tex-indicator)"
            )),
        }
    }
}

// ── Interval set ─────────────────────────────────────────────────────

/// Total order over interval bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bound(f64);

impl Eq for Bound {}

impl PartialOrd for Bound {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Bound {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Disjoint half-open intervals `[start, end)` keyed by start.
#[derive(Debug, Clone, Default)]
pub struct IntervalSet {
    intervals: BTreeMap<Bound, f64>,
}

impl IntervalSet {
    pub fn new(start: f64, end: f64) -> Self {
        let mut set = Self::default();
        if start < end {
            set.intervals.insert(Bound(start), end);
        }
        set
    }

    /// Remove `[start, end)`, trimming or splitting the intervals it
    /// overlaps. Empty remainders are dropped.
    pub fn chop(&mut self, start: f64, end: f64) {
        if start >= end {
            return;
        }
        // Intervals are disjoint, so ends grow with starts: walk back from
        // the last interval starting before `end` until one ends at or
        // before `start`.
        let overlapping: Vec<(f64, f64)> = self
            .intervals
            .range(..Bound(end))
            .rev()
            .take_while(|entry| *entry.1 > start)
            .map(|(s, &e)| (s.0, e))
            .collect();

        for (s, e) in overlapping {
            self.intervals.remove(&Bound(s));
            if s < start {
                self.intervals.insert(Bound(s), start);
            }
            if e > end {
                self.intervals.insert(Bound(end), e);
            }
        }
    }

    /// Intervals in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.intervals.iter().map(|(s, &e)| (s.0, e))
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}

// ── Metric ───────────────────────────────────────────────────────────

/// Widest vertical gap of a page once the text blocks are removed from the
/// crop extent. The topmost gap is excluded, and the bottommost one too when
/// `page_number` is set.
pub fn remaining_space(
    crop: (f64, f64),
    blocks: &[(f64, f64)],
    page_number: bool,
) -> Result<f64, SpaceError> {
    let mut gaps = IntervalSet::new(crop.0, crop.1);
    for &(y0, y1) in blocks {
        gaps.chop(y0, y1);
    }

    let gaps: Vec<(f64, f64)> = gaps.iter().collect();
    let end = if page_number {
        gaps.len().saturating_sub(1)
    } else {
        gaps.len()
    };
    gaps.get(1..end)
        .unwrap_or(&[])
        .iter()
        .map(|(s, e)| e - s)
        .max_by(f64::total_cmp)
        .ok_or(SpaceError::Degenerate)
}

/// Space metric of a rendered document according to `source`.
pub fn measure(doc: &RenderedDocument, source: SpaceSource) -> Result<f64, SpaceError> {
    match source {
        SpaceSource::TexIndicator => doc.reported_space.ok_or(SpaceError::NoIndicator),
        SpaceSource::Geometry | SpaceSource::GeometryNoPageNumber => {
            let page = doc.last_page().ok_or(SpaceError::NoPages)?;
            remaining_space(
                page.crop_extent(),
                &page.block_extents(),
                source == SpaceSource::Geometry,
            )
        }
    }
}
