use super::cache::{CacheKey, ScoreCache};
use super::link_graph::{LinkGraph, ObjectLink};
use super::score::{Score, ScoreParams, ScoringMethod};
use crate::libs::dataset::Dataset;
use crate::libs::entity::{Entity, EntityKind};
use crate::libs::error::LinkError;
use crate::libs::linking::link_finder::DEFAULT_ALPHA;
use crate::libs::linking::{DataLinks, LinkFinder, LinkTable, LinkingConfig, MetcalfWeights, NullModel};
use indexmap::IndexMap;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

/// Null models kept in memory
const NULL_CACHE_SIZE: usize = 4;

/// Settings of a scoring session.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringOptions {
    pub weights: MetcalfWeights,
    /// Rate of the overlap term of the likelihood score
    pub alpha: f64,
    pub linking: LinkingConfig,
    /// Directory of the score cache, no disk cache when `None`
    pub cache_dir: Option<PathBuf>,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            weights: MetcalfWeights::default(),
            alpha: DEFAULT_ALPHA,
            linking: LinkingConfig::default(),
            cache_dir: None,
        }
    }
}

type NullKey = (usize, [u64; 4]);

/// Least recently used null models, keyed by strain count and weights.
#[derive(Debug)]
pub struct NullModelCache {
    lru: LruCache<NullKey, Arc<NullModel>>,
}

impl NullModelCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            lru: LruCache::new(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lru.is_empty()
    }

    pub fn insert(&mut self, null_model: Arc<NullModel>) {
        let key = (null_model.n_strains(), null_model.weights().key());
        self.lru.put(key, null_model);
    }

    pub fn get_or_build(&mut self, n_strains: usize, weights: MetcalfWeights) -> Result<Arc<NullModel>, LinkError> {
        let key = (n_strains, weights.key());
        if let Some(null_model) = self.lru.get(&key) {
            log::debug!("Reusing null model for {} strains", n_strains);
            return Ok(null_model.clone());
        }
        let null_model = Arc::new(NullModel::build(n_strains, weights)?);
        self.lru.put(key, null_model.clone());
        Ok(null_model)
    }
}

impl Clone for NullModelCache {
    fn clone(&self) -> Self {
        let mut lru = LruCache::new(self.lru.cap());
        // oldest first, so recency survives
        for (k, v) in self.lru.iter().rev() {
            lru.put(*k, v.clone());
        }
        Self { lru }
    }
}

/// Co-occurrence data, raw scores and the null model of one dataset snapshot.
///
/// Queries only read the session; rebuilding needs `&mut self`.
#[derive(Debug, Clone)]
pub struct ScoringSession {
    options: ScoringOptions,
    fingerprint: u64,
    data_links: DataLinks,
    link_finder: LinkFinder,
    null_model: Arc<NullModel>,
    null_cache: NullModelCache,
}

impl ScoringSession {
    pub fn setup(dataset: &Dataset, options: ScoringOptions) -> Result<Self, LinkError> {
        let mut null_cache = NullModelCache::new(NULL_CACHE_SIZE);
        let fingerprint = dataset.fingerprint();
        let data_links = DataLinks::new(dataset, &options.linking)?;
        let (link_finder, null_model) =
            compute_scores(&data_links, &options, fingerprint, &mut null_cache)?;

        Ok(Self {
            options,
            fingerprint,
            data_links,
            link_finder,
            null_model,
            null_cache,
        })
    }

    /// Rebuilds everything for a changed dataset, e.g. after a strain filter.
    ///
    /// Null models for an unchanged strain count are reused.
    pub fn refresh(&mut self, dataset: &Dataset) -> Result<(), LinkError> {
        let fingerprint = dataset.fingerprint();
        if fingerprint == self.fingerprint {
            return Ok(());
        }
        let data_links = DataLinks::new(dataset, &self.options.linking)?;
        let (link_finder, null_model) =
            compute_scores(&data_links, &self.options, fingerprint, &mut self.null_cache)?;

        self.fingerprint = fingerprint;
        self.data_links = data_links;
        self.link_finder = link_finder;
        self.null_model = null_model;
        Ok(())
    }

    /// True when `dataset` differs from the snapshot this session was built on
    pub fn is_stale(&self, dataset: &Dataset) -> bool {
        dataset.fingerprint() != self.fingerprint
    }

    pub fn options(&self) -> &ScoringOptions {
        &self.options
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn data_links(&self) -> &DataLinks {
        &self.data_links
    }

    pub fn link_finder(&self) -> &LinkFinder {
        &self.link_finder
    }

    pub fn null_model(&self) -> &NullModel {
        &self.null_model
    }

    pub fn null_cache(&self) -> &NullModelCache {
        &self.null_cache
    }

    /// GCFs taking part in scoring
    pub fn gcfs(&self) -> Vec<Entity> {
        self.data_links.objects(EntityKind::Gcf).cloned().collect()
    }

    /// Turns link tables into a graph.
    ///
    /// `rescore` maps `(metabolomic, gcf, raw)` to the final value, `None` drops the link.
    /// Each link carries its shared strains.
    pub(crate) fn build_graph<F>(
        &self,
        tables: &[LinkTable],
        method: ScoringMethod,
        params: ScoreParams,
        mut rescore: F,
    ) -> Result<LinkGraph, LinkError>
    where
        F: FnMut(&Entity, &Entity, f64) -> Option<f64>,
    {
        let mut lg = LinkGraph::new();
        for table in tables {
            let met_kind = table.link_type.metabolomic_kind();
            for (source, target, raw) in &table.links {
                let (gcf_id, met_id) = if table.source_kind == EntityKind::Gcf {
                    (source, target)
                } else {
                    (target, source)
                };
                let gcf = self.lookup(EntityKind::Gcf, gcf_id)?;
                let met = self.lookup(met_kind, met_id)?;

                let value = match rescore(met, gcf, *raw) {
                    Some(value) => value,
                    None => continue,
                };
                let link = ObjectLink {
                    scores: IndexMap::from([(method, Score::of(method, value, params))]),
                    shared_strains: self.data_links.shared_strains(met, gcf),
                };
                lg.add_object_link(gcf, met, link)?;
            }
        }
        Ok(lg)
    }

    fn lookup(&self, kind: EntityKind, id: &str) -> Result<&Entity, LinkError> {
        self.data_links
            .entity(kind, id)
            .ok_or_else(|| LinkError::not_found(format!("{} {}", kind, id)))
    }
}

fn compute_scores(
    data_links: &DataLinks,
    options: &ScoringOptions,
    fingerprint: u64,
    null_cache: &mut NullModelCache,
) -> Result<(LinkFinder, Arc<NullModel>), LinkError> {
    let key = CacheKey {
        fingerprint,
        weights: options.weights,
        alpha: options.alpha,
        linking: options.linking,
    };
    let disk = options.cache_dir.as_ref().map(ScoreCache::new);

    if let Some(cache) = &disk {
        match cache.load(&key) {
            Ok(Some((link_finder, null_model)))
                if matches_axes(&link_finder, data_links)
                    && null_model.n_strains() == data_links.n_strains() =>
            {
                log::info!("Loaded scores from {}", cache.path().display());
                let null_model = Arc::new(null_model);
                null_cache.insert(null_model.clone());
                return Ok((link_finder, null_model));
            }
            Ok(_) => log::info!("No usable scores in {}, recomputing", cache.path().display()),
            Err(e) => log::warn!(
                "Ignoring unreadable cache {}: {}",
                cache.path().display(),
                e
            ),
        }
    }

    let mut link_finder = LinkFinder::new(options.weights, options.alpha);
    link_finder.calc_all(data_links)?;
    let null_model = null_cache.get_or_build(data_links.n_strains(), options.weights)?;

    if let Some(cache) = &disk {
        if let Err(e) = cache.save(&key, &link_finder, &null_model) {
            log::warn!("Failed to write cache {}: {}", cache.path().display(), e);
        }
    }

    Ok((link_finder, null_model))
}

// cached matrices must index the same objects
fn matches_axes(link_finder: &LinkFinder, data_links: &DataLinks) -> bool {
    crate::libs::linking::LinkType::ALL.iter().all(|&link_type| {
        let co = data_links.cooccurrence(link_type);
        match link_finder.scores(link_type) {
            Ok(sm) => sm.rows == co.rows && sm.cols == co.cols,
            Err(_) => false,
        }
    })
}
