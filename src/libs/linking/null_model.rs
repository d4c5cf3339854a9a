use super::link_finder::MetcalfWeights;
use crate::libs::error::LinkError;
use nalgebra::DMatrix;
use statrs::distribution::{Discrete, Hypergeometric};

/// Variances below this are degenerate and replaced by 1
const MIN_VARIANCE: f64 = 1e-9;

/// Expected Metcalf score and its variance under random strain assignment.
///
/// Entry `(n, m)` holds the moments for a metabolomic object seen in `n` strains and a
/// GCF seen in `m` strains, with the overlap drawn from the hypergeometric distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct NullModel {
    n_strains: usize,
    weights: MetcalfWeights,
    mean: DMatrix<f64>,
    variance: DMatrix<f64>,
}

impl NullModel {
    /// Builds the `(N+1) x (N+1)` mean and variance tables.
    ///
    /// # Example
    /// ```
    /// use nplink::libs::linking::{MetcalfWeights, NullModel};
    /// let null = NullModel::build(3, MetcalfWeights::default()).unwrap();
    /// assert_eq!(null.mean().shape(), (4, 4));
    /// ```
    pub fn build(n_strains: usize, weights: MetcalfWeights) -> Result<Self, LinkError> {
        let size = n_strains + 1;
        let mut mean = DMatrix::zeros(size, size);
        let mut variance = DMatrix::zeros(size, size);

        let population = n_strains as u64;
        for n in 0..size {
            for m in 0..size {
                let dist = Hypergeometric::new(population, n as u64, m as u64)
                    .map_err(|e| LinkError::Stats(e.to_string()))?;

                let lo = (n + m).saturating_sub(n_strains);
                let hi = n.min(m);
                let mut expected = 0.0;
                let mut expected_sq = 0.0;
                for overlap in lo..=hi {
                    let p = dist.ln_pmf(overlap as u64).exp();
                    let score = weights.score(overlap, n, m, n_strains);
                    expected += p * score;
                    expected_sq += p * score * score;
                }

                let mut var = expected_sq - expected * expected;
                if var < MIN_VARIANCE {
                    var = 1.0;
                }
                mean[(n, m)] = expected;
                variance[(n, m)] = var;
            }
        }
        log::debug!("Built Metcalf null model for {} strains", n_strains);

        Ok(Self {
            n_strains,
            weights,
            mean,
            variance,
        })
    }

    /// Restores previously built tables.
    pub fn from_parts(
        n_strains: usize,
        weights: MetcalfWeights,
        mean: DMatrix<f64>,
        variance: DMatrix<f64>,
    ) -> Result<Self, LinkError> {
        let size = (n_strains + 1, n_strains + 1);
        if mean.shape() != size || variance.shape() != size {
            return Err(LinkError::Shape(format!(
                "null model tables must be {:?}, got {:?} and {:?}",
                size,
                mean.shape(),
                variance.shape()
            )));
        }
        Ok(Self {
            n_strains,
            weights,
            mean,
            variance,
        })
    }

    pub fn n_strains(&self) -> usize {
        self.n_strains
    }

    pub fn weights(&self) -> &MetcalfWeights {
        &self.weights
    }

    pub fn mean(&self) -> &DMatrix<f64> {
        &self.mean
    }

    pub fn variance(&self) -> &DMatrix<f64> {
        &self.variance
    }

    pub fn std(&self, n: usize, m: usize) -> f64 {
        self.variance[(n, m)].sqrt()
    }

    /// `(raw - mean) / std` for a metabolomic object in `n` strains and a GCF in `m` strains
    pub fn standardise(&self, raw: f64, n: usize, m: usize) -> f64 {
        (raw - self.mean[(n, m)]) / self.std(n, m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_shape_and_variance() {
        let null = NullModel::build(5, MetcalfWeights::default()).unwrap();
        assert_eq!(null.mean().shape(), (6, 6));
        assert_eq!(null.variance().shape(), (6, 6));
        assert!(null.variance().iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_known_moments() {
        let null = NullModel::build(3, MetcalfWeights::default()).unwrap();

        // one strain each: overlap 1 with p = 1/3 (score 12), else score -9
        assert_relative_eq!(null.mean()[(1, 1)], -2.0, epsilon = 1e-9);
        assert_relative_eq!(null.variance()[(1, 1)], 98.0, epsilon = 1e-9);

        // no strains at all: deterministic score, degenerate variance
        assert_relative_eq!(null.mean()[(0, 0)], 3.0, epsilon = 1e-9);
        assert_relative_eq!(null.variance()[(0, 0)], 1.0);

        // present everywhere: overlap is forced
        assert_relative_eq!(null.mean()[(3, 3)], 30.0, epsilon = 1e-9);
        assert_relative_eq!(null.variance()[(3, 3)], 1.0);
    }

    #[test]
    fn test_mean_matches_direct_sum() {
        let n_strains: usize = 6;
        let weights = MetcalfWeights::default();
        let null = NullModel::build(n_strains, weights).unwrap();

        for (n, m) in [(2usize, 3usize), (4, 4), (1, 6), (5, 2)] {
            let dist = Hypergeometric::new(n_strains as u64, n as u64, m as u64).unwrap();
            let direct: f64 = ((n + m).saturating_sub(n_strains)..=n.min(m))
                .map(|o| dist.pmf(o as u64) * weights.score(o, n, m, n_strains))
                .sum();
            assert_relative_eq!(null.mean()[(n, m)], direct, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_standardise() {
        let null = NullModel::build(3, MetcalfWeights::default()).unwrap();
        assert_relative_eq!(
            null.standardise(12.0, 1, 1),
            14.0 / 98f64.sqrt(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_empty_universe() {
        let null = NullModel::build(0, MetcalfWeights::default()).unwrap();
        assert_eq!(null.mean().shape(), (1, 1));
        assert_relative_eq!(null.variance()[(0, 0)], 1.0);
    }

    #[test]
    fn test_from_parts() {
        let null = NullModel::build(2, MetcalfWeights::default()).unwrap();
        let again = NullModel::from_parts(
            2,
            *null.weights(),
            null.mean().clone(),
            null.variance().clone(),
        )
        .unwrap();
        assert_eq!(null, again);

        let bad = NullModel::from_parts(3, *null.weights(), null.mean().clone(), null.variance().clone());
        assert!(matches!(bad, Err(LinkError::Shape(_))));
    }
}
