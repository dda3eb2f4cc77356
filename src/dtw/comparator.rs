//! Batch sequence comparison.
//!
//! Wraps the incremental aligner for one-shot comparisons of two fully
//! materialized feature sequences, and adds warping-path reconstruction for
//! visualization, which the O(band) streaming aligner cannot provide because
//! it discards columns as it goes.

use std::sync::Arc;

use crate::config::AlignmentConfig;
use crate::dtw::incremental::{IncrementalAligner, StepWeights};
use crate::dtw::euclidean;
use crate::features::FeatureFrame;

/// Result of comparing two feature sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// Accumulated cost of the best alignment.
    pub cost: f32,
    /// Cost normalized by path length; infinite when no alignment exists.
    pub distance: f32,
    /// Number of matched cell pairs on the best path.
    pub path_len: u32,
    /// Warping path as (reference index, candidate index) pairs, earliest
    /// first. Only populated by [`DtwComparator::compare_with_path`].
    pub path: Option<Vec<(usize, usize)>>,
}

impl Alignment {
    fn unreachable() -> Self {
        Self {
            cost: f32::INFINITY,
            distance: f32::INFINITY,
            path_len: 0,
            path: None,
        }
    }
}

/// Batch DTW comparator with a Sakoe-Chiba band.
pub struct DtwComparator {
    config: AlignmentConfig,
}

impl DtwComparator {
    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    /// Compares two sequences and returns the alignment without a path.
    ///
    /// Identical to feeding `candidate` frame-by-frame into an
    /// [`IncrementalAligner`] and querying once at the end.
    pub fn compare(&self, reference: &Arc<Vec<FeatureFrame>>, candidate: &[FeatureFrame]) -> Alignment {
        if reference.is_empty() || candidate.is_empty() {
            return Alignment::unreachable();
        }

        let mut aligner = IncrementalAligner::new(reference.clone(), &self.config);
        for frame in candidate {
            aligner.push_frame(frame);
        }

        match aligner.query() {
            Some(snap) => Alignment {
                cost: snap.cost,
                distance: snap.normalized,
                path_len: snap.path_len,
                path: None,
            },
            None => Alignment::unreachable(),
        }
    }

    /// Compares two sequences and reconstructs the warping path.
    ///
    /// Retains all column bands (O(candidate × band) memory), so this is for
    /// offline inspection rather than the per-chunk hot path.
    pub fn compare_with_path(
        &self,
        reference: &Arc<Vec<FeatureFrame>>,
        candidate: &[FeatureFrame],
    ) -> Alignment {
        let n = reference.len();
        let m = candidate.len();
        if n == 0 || m == 0 {
            return Alignment::unreachable();
        }

        let band = self.config.band_width.max(1);
        let weights = StepWeights::from(&self.config);

        // Per-column band arenas.
        let mut lows = vec![0usize; m];
        let mut costs: Vec<Vec<f32>> = Vec::with_capacity(m);
        let mut steps: Vec<Vec<u32>> = Vec::with_capacity(m);
        let mut moves: Vec<Vec<u8>> = Vec::with_capacity(m); // 0 diag, 1 horiz, 2 vert, 3 origin

        for j in 0..m {
            let lo = j.saturating_sub(band).min(n - 1);
            let hi = (j + band).min(n - 1);
            lows[j] = lo;
            let len = hi - lo + 1;
            let mut col_costs = vec![f32::INFINITY; len];
            let mut col_steps = vec![0u32; len];
            let mut col_moves = vec![u8::MAX; len];

            for i in lo..=hi {
                let d = euclidean(&reference[i], &candidate[j]);

                let mut best_cost = f32::INFINITY;
                let mut best_steps = 0u32;
                let mut best_move = u8::MAX;
                let mut consider = |cell: Option<(f32, u32)>, weight: f32, mv: u8| {
                    if let Some((cost, plen)) = cell {
                        if cost.is_finite() {
                            let total = cost + weight * d;
                            if total < best_cost {
                                best_cost = total;
                                best_steps = plen + 1;
                                best_move = mv;
                            }
                        }
                    }
                };

                if j > 0 {
                    let plo = lows[j - 1];
                    let fetch = |i: usize| {
                        if i < plo {
                            return None;
                        }
                        let idx = i - plo;
                        if idx >= costs[j - 1].len() {
                            return None;
                        }
                        Some((costs[j - 1][idx], steps[j - 1][idx]))
                    };
                    if i > 0 {
                        consider(fetch(i - 1), weights.diagonal, 0);
                    }
                    consider(fetch(i), weights.horizontal, 1);
                }
                if i > lo {
                    let idx = i - 1 - lo;
                    consider(Some((col_costs[idx], col_steps[idx])), weights.vertical, 2);
                }
                if j == 0 && i == 0 {
                    consider(Some((0.0, 0)), 1.0, 3);
                }

                if best_move != u8::MAX {
                    col_costs[i - lo] = best_cost;
                    col_steps[i - lo] = best_steps;
                    col_moves[i - lo] = best_move;
                }
            }

            costs.push(col_costs);
            steps.push(col_steps);
            moves.push(col_moves);
        }

        // Best normalized cell of the last column.
        let last = m - 1;
        let mut best: Option<(usize, f32)> = None;
        for (idx, (&cost, &plen)) in costs[last].iter().zip(steps[last].iter()).enumerate() {
            if !cost.is_finite() || plen == 0 {
                continue;
            }
            let normalized = cost / plen as f32;
            if best.map(|(_, d)| normalized < d).unwrap_or(true) {
                best = Some((idx, normalized));
            }
        }
        let Some((best_idx, distance)) = best else {
            return Alignment::unreachable();
        };

        // Walk back through the recorded moves.
        let mut path = Vec::new();
        let mut i = lows[last] + best_idx;
        let mut j = last;
        loop {
            path.push((i, j));
            match moves[j][i - lows[j]] {
                0 => {
                    i -= 1;
                    j -= 1;
                }
                1 => {
                    j -= 1;
                }
                2 => {
                    i -= 1;
                }
                _ => break, // origin
            }
        }
        path.reverse();

        Alignment {
            cost: costs[last][best_idx],
            distance,
            path_len: steps[last][best_idx],
            path: Some(path),
        }
    }
}
