use crate::libs::error::LinkError;
use crate::libs::linking::{LinkFinder, LinkType, LinkingConfig, MetcalfWeights, NullModel, ScoreMatrices};
use indexmap::IndexSet;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// File name of the score cache inside the cache directory
pub const CACHE_FILE: &str = "cache_metcalf_scoring.json";

const CACHE_VERSION: u32 = 1;

/// Everything that decides whether cached scores can be reused
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheKey {
    pub fingerprint: u64,
    pub weights: MetcalfWeights,
    pub alpha: f64,
    pub linking: LinkingConfig,
}

// column-major, as nalgebra stores it
#[derive(Debug, Serialize, Deserialize)]
struct DenseTable {
    nrows: usize,
    ncols: usize,
    data: Vec<f64>,
}

impl DenseTable {
    fn from_matrix(m: &DMatrix<f64>) -> Self {
        Self {
            nrows: m.nrows(),
            ncols: m.ncols(),
            data: m.as_slice().to_vec(),
        }
    }

    fn into_matrix(self) -> Result<DMatrix<f64>, LinkError> {
        if self.data.len() != self.nrows * self.ncols {
            return Err(LinkError::Cache(format!(
                "table of {}x{} holds {} values",
                self.nrows,
                self.ncols,
                self.data.len()
            )));
        }
        Ok(DMatrix::from_vec(self.nrows, self.ncols, self.data))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedScores {
    link_type: LinkType,
    rows: IndexSet<String>,
    cols: IndexSet<String>,
    metcalf: DenseTable,
    hypergeom: DenseTable,
    likelihood: DenseTable,
}

impl CachedScores {
    // every matrix spans rows x cols
    fn into_scores(self) -> Result<ScoreMatrices, LinkError> {
        let shape = (self.rows.len(), self.cols.len());
        let sm = ScoreMatrices {
            rows: self.rows,
            cols: self.cols,
            metcalf: self.metcalf.into_matrix()?,
            hypergeom: self.hypergeom.into_matrix()?,
            likelihood: self.likelihood.into_matrix()?,
        };
        for m in [&sm.metcalf, &sm.hypergeom, &sm.likelihood] {
            if m.shape() != shape {
                return Err(LinkError::Cache(format!(
                    "{} scores of {}x{} over {} x {} objects",
                    self.link_type,
                    m.nrows(),
                    m.ncols(),
                    shape.0,
                    shape.1
                )));
            }
        }
        Ok(sm)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheBlob {
    version: u32,
    key: CacheKey,
    n_strains: usize,
    scores: Vec<CachedScores>,
    null_mean: DenseTable,
    null_variance: DenseTable,
}

/// On-disk store of raw score matrices and the Metcalf null model.
///
/// The blob is only trusted when its key matches; anything else is a miss.
#[derive(Debug, Clone)]
pub struct ScoreCache {
    path: PathBuf,
}

impl ScoreCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CACHE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when there is no cache or it was written for other data.
    ///
    /// # Errors
    /// An unreadable or malformed blob.
    pub fn load(&self, key: &CacheKey) -> Result<Option<(LinkFinder, NullModel)>, LinkError> {
        if !self.path.is_file() {
            return Ok(None);
        }
        let file = std::fs::File::open(&self.path)?;
        let blob: CacheBlob = serde_json::from_reader(BufReader::new(file))?;
        if blob.version != CACHE_VERSION || blob.key != *key {
            log::debug!("Cache {} was built for other data", self.path.display());
            return Ok(None);
        }

        let mut link_finder = LinkFinder::new(key.weights, key.alpha);
        for cached in blob.scores {
            let link_type = cached.link_type;
            link_finder.insert_scores(link_type, cached.into_scores()?);
        }
        let null_model = NullModel::from_parts(
            blob.n_strains,
            key.weights,
            blob.null_mean.into_matrix()?,
            blob.null_variance.into_matrix()?,
        )?;

        Ok(Some((link_finder, null_model)))
    }

    /// Replaces the blob atomically.
    pub fn save(&self, key: &CacheKey, link_finder: &LinkFinder, null_model: &NullModel) -> Result<(), LinkError> {
        let mut scores = vec![];
        for link_type in LinkType::ALL {
            let sm = link_finder.scores(link_type)?;
            scores.push(CachedScores {
                link_type,
                rows: sm.rows.clone(),
                cols: sm.cols.clone(),
                metcalf: DenseTable::from_matrix(&sm.metcalf),
                hypergeom: DenseTable::from_matrix(&sm.hypergeom),
                likelihood: DenseTable::from_matrix(&sm.likelihood),
            });
        }
        let blob = CacheBlob {
            version: CACHE_VERSION,
            key: *key,
            n_strains: null_model.n_strains(),
            scores,
            null_mean: DenseTable::from_matrix(null_model.mean()),
            null_variance: DenseTable::from_matrix(null_model.variance()),
        };

        let dir = self
            .path
            .parent()
            .ok_or_else(|| LinkError::Cache(format!("no parent for {}", self.path.display())))?;
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, &blob)?;
            writer.flush()?;
        }
        tmp.persist(&self.path).map_err(|e| LinkError::Io(e.error))?;
        log::info!("Saved scores to {}", self.path.display());

        Ok(())
    }
}
