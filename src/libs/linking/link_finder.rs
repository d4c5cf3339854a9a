use super::data_links::{Cooccurrence, DataLinks};
use super::likelihood::Likelihood;
use super::null_model::NullModel;
use super::LinkType;
use crate::libs::entity::{common_kind, Entity, EntityKind};
use crate::libs::error::LinkError;
use crate::libs::scoring::ScoringMethod;
use indexmap::{IndexMap, IndexSet};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use statrs::distribution::{DiscreteCDF, Hypergeometric};
use std::collections::HashSet;
use std::str::FromStr;

/// Default rate of the overlap term in the likelihood score
pub const DEFAULT_ALPHA: f64 = 0.5;

/// Weights of the four co-occurrence counts in the Metcalf score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetcalfWeights {
    pub both: f64,
    pub type1_only: f64,
    pub gcf_only: f64,
    pub neither: f64,
}

impl Default for MetcalfWeights {
    fn default() -> Self {
        Self {
            both: 10.0,
            type1_only: -10.0,
            gcf_only: 0.0,
            neither: 1.0,
        }
    }
}

impl MetcalfWeights {
    /// Score of a pair with `overlap` shared strains, the metabolomic object in
    /// `n_type1` strains and the GCF in `n_gcf` strains.
    ///
    /// # Example
    /// ```
    /// use nplink::libs::linking::MetcalfWeights;
    /// let w = MetcalfWeights::default();
    /// assert_eq!(w.score(1, 1, 2, 3), 11.0);
    /// ```
    pub fn score(&self, overlap: usize, n_type1: usize, n_gcf: usize, n_strains: usize) -> f64 {
        let o = overlap as f64;
        let neither = n_strains as f64 - (n_type1 + n_gcf) as f64 + o;
        self.both * o
            + self.type1_only * (n_type1 as f64 - o)
            + self.gcf_only * (n_gcf as f64 - o)
            + self.neither * neither
    }

    pub fn apply(&self, co: &Cooccurrence) -> DMatrix<f64> {
        &co.both * self.both
            + &co.type1_only * self.type1_only
            + &co.gcf_only * self.gcf_only
            + &co.neither * self.neither
    }

    /// Bit pattern usable as a hash key
    pub fn key(&self) -> [u64; 4] {
        [
            self.both.to_bits(),
            self.type1_only.to_bits(),
            self.gcf_only.to_bits(),
            self.neither.to_bits(),
        ]
    }
}

impl FromStr for MetcalfWeights {
    type Err = LinkError;

    /// Four comma separated numbers: both, type1 only, gcf only, neither
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| LinkError::invalid_value(format!("weights {}: {}", s, e)))?;
        match parts[..] {
            [both, type1_only, gcf_only, neither] => Ok(Self {
                both,
                type1_only,
                gcf_only,
                neither,
            }),
            _ => Err(LinkError::invalid_value(format!(
                "weights {}: expected four values",
                s
            ))),
        }
    }
}

/// Raw score matrices of one link type, metabolomic objects in rows and GCFs in columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMatrices {
    pub rows: IndexSet<String>,
    pub cols: IndexSet<String>,
    pub metcalf: DMatrix<f64>,
    pub hypergeom: DMatrix<f64>,
    pub likelihood: DMatrix<f64>,
}

impl ScoreMatrices {
    pub fn get(&self, method: ScoringMethod) -> &DMatrix<f64> {
        match method {
            ScoringMethod::Metcalf => &self.metcalf,
            ScoringMethod::Hypergeom => &self.hypergeom,
            ScoringMethod::Likelihood => &self.likelihood,
        }
    }

    pub fn value(&self, method: ScoringMethod, row_id: &str, col_id: &str) -> Option<f64> {
        let i = self.rows.get_index_of(row_id)?;
        let j = self.cols.get_index_of(col_id)?;
        Some(self.get(method)[(i, j)])
    }
}

/// Links found for one link type.
///
/// `source` is always the id of a queried object.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkTable {
    pub link_type: LinkType,
    pub source_kind: EntityKind,
    pub links: Vec<(String, String, f64)>,
}

impl LinkTable {
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// P(X >= overlap) for X ~ Hypergeometric(N, gcf_count, type1_count)
fn hypergeom_matrix(
    co: &Cooccurrence,
    type1_totals: &[f64],
    gcf_totals: &[f64],
    n_strains: usize,
) -> Result<DMatrix<f64>, LinkError> {
    let (nrows, ncols) = co.shape();
    let mut result = DMatrix::from_element(nrows, ncols, 1.0);
    for i in 0..nrows {
        for j in 0..ncols {
            let overlap = co.both[(i, j)].round() as u64;
            if overlap == 0 {
                continue;
            }
            let dist = Hypergeometric::new(
                n_strains as u64,
                gcf_totals[j].round() as u64,
                type1_totals[i].round() as u64,
            )
            .map_err(|e| LinkError::Stats(e.to_string()))?;
            result[(i, j)] = dist.sf(overlap - 1);
        }
    }
    Ok(result)
}

/// Turns co-occurrence counts into raw per-method score matrices.
#[derive(Debug, Clone)]
pub struct LinkFinder {
    weights: MetcalfWeights,
    alpha: f64,
    scores: IndexMap<LinkType, ScoreMatrices>,
}

impl Default for LinkFinder {
    fn default() -> Self {
        Self::new(MetcalfWeights::default(), DEFAULT_ALPHA)
    }
}

impl LinkFinder {
    pub fn new(weights: MetcalfWeights, alpha: f64) -> Self {
        Self {
            weights,
            alpha,
            scores: IndexMap::new(),
        }
    }

    pub fn weights(&self) -> &MetcalfWeights {
        &self.weights
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Computes all score matrices of `link_type`, replacing earlier ones.
    pub fn calc_score(&mut self, data_links: &DataLinks, link_type: LinkType) -> Result<(), LinkError> {
        let co = data_links.cooccurrence(link_type);
        let type1_totals = data_links
            .presence(link_type.metabolomic_kind())
            .row_totals();
        let gcf_totals = data_links.occurrence_gcf_strain().row_totals();
        let n_strains = data_links.n_strains();

        let metcalf = self.weights.apply(co);
        let hypergeom = hypergeom_matrix(co, &type1_totals, &gcf_totals, n_strains)?;
        let likelihood =
            Likelihood::compute(co, &type1_totals, &gcf_totals, n_strains).score(co, self.alpha);

        log::debug!("Scored {} links of type {}", co.both.len(), link_type);
        self.scores.insert(
            link_type,
            ScoreMatrices {
                rows: co.rows.clone(),
                cols: co.cols.clone(),
                metcalf,
                hypergeom,
                likelihood,
            },
        );
        Ok(())
    }

    pub fn calc_all(&mut self, data_links: &DataLinks) -> Result<(), LinkError> {
        for link_type in LinkType::ALL {
            self.calc_score(data_links, link_type)?;
        }
        Ok(())
    }

    pub fn scores(&self, link_type: LinkType) -> Result<&ScoreMatrices, LinkError> {
        self.scores
            .get(&link_type)
            .ok_or(LinkError::MissingScores(link_type))
    }

    /// Installs matrices computed elsewhere, e.g. restored from a cache
    pub fn insert_scores(&mut self, link_type: LinkType, scores: ScoreMatrices) {
        self.scores.insert(link_type, scores);
    }

    /// Metcalf null model for `n_strains` with this finder's weights
    pub fn null_model(&self, n_strains: usize) -> Result<NullModel, LinkError> {
        NullModel::build(n_strains, self.weights)
    }

    /// Links of `objects` whose `method` score is at least `score_cutoff`.
    ///
    /// GCF input yields two tables (spec-gcf, mf-gcf), spectra or molecular families
    /// one. Entries follow matrix order. Objects absent from the matrices are skipped.
    ///
    /// # Errors
    /// `InvalidValue` for empty input, `InvalidType` for mixed input, `MissingScores`
    /// when a needed link type was not computed.
    pub fn get_links(
        &self,
        objects: &[Entity],
        method: ScoringMethod,
        score_cutoff: f64,
    ) -> Result<Vec<LinkTable>, LinkError> {
        let kind = common_kind(objects)?;
        let wanted: HashSet<&str> = objects.iter().map(|o| o.id()).collect();
        let link_types = match LinkType::for_kind(kind) {
            Some(link_type) => vec![link_type],
            None => LinkType::ALL.to_vec(),
        };

        let mut tables = vec![];
        for link_type in link_types {
            let sm = self.scores(link_type)?;
            let matrix = sm.get(method);

            let pick = |axis: &IndexSet<String>, select: bool| -> Vec<usize> {
                axis.iter()
                    .enumerate()
                    .filter(|(_, id)| !select || wanted.contains(id.as_str()))
                    .map(|(i, _)| i)
                    .collect()
            };
            let is_gcf = kind == EntityKind::Gcf;
            let rows = pick(&sm.rows, !is_gcf);
            let cols = pick(&sm.cols, is_gcf);

            let mut links = vec![];
            for &i in &rows {
                for &j in &cols {
                    let value = matrix[(i, j)];
                    if value < score_cutoff || value.is_nan() {
                        continue;
                    }
                    let (row_id, col_id) = (&sm.rows[i], &sm.cols[j]);
                    let (source, target) = if is_gcf {
                        (col_id, row_id)
                    } else {
                        (row_id, col_id)
                    };
                    links.push((source.clone(), target.clone(), value));
                }
            }

            tables.push(LinkTable {
                link_type,
                source_kind: kind,
                links,
            });
        }

        Ok(tables)
    }
}
