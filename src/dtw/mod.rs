//! Sequence alignment: banded dynamic time warping over feature sequences,
//! incremental and batch, plus the distance-to-similarity calibration.

pub mod comparator;
pub mod incremental;
pub mod score;

pub use comparator::{Alignment, DtwComparator};
pub use incremental::IncrementalAligner;
pub use score::{ScoreCurve, SimilarityReading, SimilarityStatus};

/// Euclidean distance between two coefficient vectors.
pub(crate) fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    sum.sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_zero_for_identical() {
        let v = vec![1.0, -2.0, 3.5];
        assert_eq!(euclidean(&v, &v), 0.0);
    }

    #[test]
    fn test_euclidean_known_value() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!((euclidean(&a, &b) - 5.0).abs() < 1e-6);
    }
}
