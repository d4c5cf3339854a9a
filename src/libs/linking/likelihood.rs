use super::data_links::Cooccurrence;
use nalgebra::DMatrix;

/// Conditional probabilities of strain co-occurrence between metabolomic objects
/// (type1, rows) and GCFs (columns).
#[derive(Debug, Clone)]
pub struct Likelihood {
    /// P(gcf | type1)
    pub gcf_given_type1: DMatrix<f64>,
    /// P(gcf | not type1)
    pub gcf_given_not_type1: DMatrix<f64>,
    /// P(type1 | gcf)
    pub type1_given_gcf: DMatrix<f64>,
    /// P(type1 | not gcf)
    pub type1_given_not_gcf: DMatrix<f64>,
}

// zero totals are replaced by 1
fn guard(total: f64) -> f64 {
    if total < 1.0 {
        1.0
    } else {
        total
    }
}

impl Likelihood {
    /// `type1_totals` and `gcf_totals` are the strain counts of each row and column object.
    pub fn compute(
        co: &Cooccurrence,
        type1_totals: &[f64],
        gcf_totals: &[f64],
        n_strains: usize,
    ) -> Self {
        let (nrows, ncols) = co.shape();
        let n = n_strains as f64;

        Self {
            gcf_given_type1: DMatrix::from_fn(nrows, ncols, |i, j| {
                co.both[(i, j)] / guard(type1_totals[i])
            }),
            gcf_given_not_type1: DMatrix::from_fn(nrows, ncols, |i, j| {
                co.gcf_only[(i, j)] / guard(n - type1_totals[i])
            }),
            type1_given_gcf: DMatrix::from_fn(nrows, ncols, |i, j| {
                co.both[(i, j)] / guard(gcf_totals[j])
            }),
            type1_given_not_gcf: DMatrix::from_fn(nrows, ncols, |i, j| {
                co.type1_only[(i, j)] / guard(n - gcf_totals[j])
            }),
        }
    }

    /// `P(gcf|type1) * (1 - P(type1|not gcf)) * (1 - exp(-alpha * overlap))`
    pub fn score(&self, co: &Cooccurrence, alpha: f64) -> DMatrix<f64> {
        let (nrows, ncols) = co.shape();
        DMatrix::from_fn(nrows, ncols, |i, j| {
            self.gcf_given_type1[(i, j)]
                * (1.0 - self.type1_given_not_gcf[(i, j)])
                * (1.0 - (-alpha * co.both[(i, j)]).exp())
        })
    }
}
