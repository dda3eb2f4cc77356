//! Incremental banded DTW.
//!
//! The candidate sequence grows one frame at a time; each appended frame
//! adds one column to the accumulated-cost matrix, and only that column's
//! band is computed. The aligner keeps a single previous column of band
//! cells, so memory stays O(band width) no matter how long a recording
//! grows, and per-frame work is O(band width).
//!
//! Queries read the best path-length-normalized cost over the band of the
//! latest column. While the candidate is still shorter than the reference
//! this is an open-end alignment against a reference prefix; once the
//! candidate reaches the reference's length the terminal cell lies inside
//! that band. Feeding all frames and then querying is exactly equivalent to
//! querying after each frame: columns only ever depend on their predecessor.

use std::sync::Arc;

use crate::config::AlignmentConfig;
use crate::dtw::euclidean;
use crate::features::FeatureFrame;

/// Weights applied to the three predecessor moves.
#[derive(Debug, Clone, Copy)]
pub struct StepWeights {
    pub diagonal: f32,
    pub horizontal: f32,
    pub vertical: f32,
}

impl From<&AlignmentConfig> for StepWeights {
    fn from(config: &AlignmentConfig) -> Self {
        Self {
            diagonal: config.diagonal_weight,
            horizontal: config.horizontal_weight,
            vertical: config.vertical_weight,
        }
    }
}

/// Band of one matrix column: accumulated costs and path lengths for rows
/// `lo..lo + costs.len()`.
#[derive(Debug, Clone)]
struct Column {
    lo: usize,
    costs: Vec<f32>,
    steps: Vec<u32>,
}

impl Column {
    fn get(&self, i: usize) -> Option<(f32, u32)> {
        if i < self.lo {
            return None;
        }
        let idx = i - self.lo;
        if idx >= self.costs.len() {
            return None;
        }
        Some((self.costs[idx], self.steps[idx]))
    }
}

/// Snapshot of the best alignment ending at the latest candidate frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignSnapshot {
    /// Accumulated cost of the best cell in the latest column's band.
    pub cost: f32,
    /// Cost normalized by alignment path length.
    pub normalized: f32,
    /// Path length (number of matched cell pairs) at that cell.
    pub path_len: u32,
    /// Reference row of that cell.
    pub reference_row: usize,
}

/// Streaming DTW aligner against a fixed reference sequence.
pub struct IncrementalAligner {
    reference: Arc<Vec<FeatureFrame>>,
    band: usize,
    weights: StepWeights,
    prev: Option<Column>,
    columns: usize,
}

impl IncrementalAligner {
    pub fn new(reference: Arc<Vec<FeatureFrame>>, config: &AlignmentConfig) -> Self {
        Self {
            reference,
            band: config.band_width.max(1),
            weights: StepWeights::from(config),
            prev: None,
            columns: 0,
        }
    }

    /// Number of candidate frames consumed so far.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Appends one candidate frame, computing its column band.
    pub fn push_frame(&mut self, frame: &[f32]) {
        let n = self.reference.len();
        let j = self.columns;
        self.columns += 1;
        if n == 0 {
            return;
        }

        // Band rows for this column. The lower bound is clamped so a
        // candidate that outgrows the reference keeps the last rows
        // reachable instead of going dark.
        let lo = j.saturating_sub(self.band).min(n - 1);
        let hi = (j + self.band).min(n - 1);

        let len = hi - lo + 1;
        let mut costs = vec![f32::INFINITY; len];
        let mut steps = vec![0u32; len];

        for i in lo..=hi {
            let d = euclidean(&self.reference[i], frame);

            let mut best: Option<(f32, u32)> = None;
            let mut consider = |cell: Option<(f32, u32)>, weight: f32| {
                if let Some((cost, len)) = cell {
                    if cost.is_finite() {
                        let total = cost + weight * d;
                        if best.map(|(c, _)| total < c).unwrap_or(true) {
                            best = Some((total, len + 1));
                        }
                    }
                }
            };

            if let Some(prev) = &self.prev {
                if i > 0 {
                    consider(prev.get(i - 1), self.weights.diagonal);
                }
                consider(prev.get(i), self.weights.horizontal);
            }
            if i > lo {
                let idx = i - 1 - lo;
                consider(
                    Some((costs[idx], steps[idx])),
                    self.weights.vertical,
                );
            }
            if j == 0 && i == 0 {
                // Matrix origin: the path starts here.
                consider(Some((0.0, 0)), 1.0);
            }

            if let Some((cost, len)) = best {
                costs[i - lo] = cost;
                steps[i - lo] = len;
            }
        }

        self.prev = Some(Column { lo, costs, steps });
    }

    /// Best normalized alignment ending at the latest candidate frame.
    ///
    /// Returns `None` before any frame was pushed, when the reference is
    /// empty, or when no cell in the current band is reachable.
    pub fn query(&self) -> Option<AlignSnapshot> {
        let column = self.prev.as_ref()?;

        let mut best: Option<AlignSnapshot> = None;
        for (idx, (&cost, &len)) in column.costs.iter().zip(column.steps.iter()).enumerate() {
            if !cost.is_finite() || len == 0 {
                continue;
            }
            let normalized = cost / len as f32;
            if best.map(|b| normalized < b.normalized).unwrap_or(true) {
                best = Some(AlignSnapshot {
                    cost,
                    normalized,
                    path_len: len,
                    reference_row: column.lo + idx,
                });
            }
        }
        best
    }

    /// Drops all alignment state, keeping reference and parameters.
    pub fn reset(&mut self) {
        self.prev = None;
        self.columns = 0;
    }
}
