use super::base::{LinkParams, ScoringBase};
use super::link_graph::LinkGraph;
use super::score::{ScoreParams, ScoringMethod};
use super::session::{ScoringOptions, ScoringSession};
use crate::libs::dataset::Dataset;
use crate::libs::entity::Entity;
use crate::libs::error::LinkError;
use std::sync::Arc;

/// Default significance level
pub const DEFAULT_P_CUTOFF: f64 = 0.05;

/// Hypergeometric scoring: the probability of seeing at least the observed
/// strain overlap by chance. Smaller is stronger, links with `p <= cutoff` are kept.
#[derive(Debug, Clone)]
pub struct HypergeomScoring {
    session: Arc<ScoringSession>,
    cutoff: f64,
}

impl HypergeomScoring {
    pub fn new(session: Arc<ScoringSession>) -> Self {
        Self {
            session,
            cutoff: DEFAULT_P_CUTOFF,
        }
    }

    pub fn setup(dataset: &Dataset, options: ScoringOptions) -> Result<Self, LinkError> {
        Ok(Self::new(Arc::new(ScoringSession::setup(dataset, options)?)))
    }

    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn refresh(&mut self, dataset: &Dataset) -> Result<(), LinkError> {
        Arc::make_mut(&mut self.session).refresh(dataset)
    }
}

impl ScoringBase for HypergeomScoring {
    fn method(&self) -> ScoringMethod {
        ScoringMethod::Hypergeom
    }

    fn session(&self) -> &ScoringSession {
        &self.session
    }

    fn get_links(&self, objects: &[Entity], params: &LinkParams) -> Result<LinkGraph, LinkError> {
        let cutoff = params.cutoff.unwrap_or(self.cutoff);
        let score_params = ScoreParams {
            cutoff,
            standardised: false,
        };
        let tables =
            self.session
                .link_finder()
                .get_links(objects, ScoringMethod::Hypergeom, f64::NEG_INFINITY)?;
        self.session
            .build_graph(&tables, ScoringMethod::Hypergeom, score_params, |_, _, p| {
                (p <= cutoff).then_some(p)
            })
    }
}
