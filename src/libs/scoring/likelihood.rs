use super::base::{LinkParams, ScoringBase};
use super::link_graph::LinkGraph;
use super::score::{ScoreParams, ScoringMethod};
use super::session::{ScoringOptions, ScoringSession};
use crate::libs::dataset::Dataset;
use crate::libs::entity::Entity;
use crate::libs::error::LinkError;
use std::sync::Arc;

/// Likelihood scoring, in `[0, 1)`; links with `score >= cutoff` are kept.
#[derive(Debug, Clone)]
pub struct LikelihoodScoring {
    session: Arc<ScoringSession>,
    cutoff: f64,
}

impl LikelihoodScoring {
    pub fn new(session: Arc<ScoringSession>) -> Self {
        Self {
            session,
            cutoff: 0.0,
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

impl ScoringBase for LikelihoodScoring {
    fn method(&self) -> ScoringMethod {
        ScoringMethod::Likelihood
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
        let tables = self
            .session
            .link_finder()
            .get_links(objects, ScoringMethod::Likelihood, cutoff)?;
        self.session
            .build_graph(&tables, ScoringMethod::Likelihood, score_params, |_, _, v| {
                Some(v)
            })
    }
}
