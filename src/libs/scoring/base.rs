use super::link_graph::LinkGraph;
use super::score::ScoringMethod;
use super::session::ScoringSession;
use crate::libs::entity::Entity;
use crate::libs::error::LinkError;

/// Per-query overrides, `None` falls back to the strategy's own setting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinkParams {
    pub cutoff: Option<f64>,
    pub standardised: Option<bool>,
}

impl LinkParams {
    pub fn with_cutoff(cutoff: f64) -> Self {
        Self {
            cutoff: Some(cutoff),
            ..Default::default()
        }
    }

    pub fn standardised(self, standardised: bool) -> Self {
        Self {
            standardised: Some(standardised),
            ..self
        }
    }
}

/// A way of turning raw link scores into a `LinkGraph`.
pub trait ScoringBase {
    fn method(&self) -> ScoringMethod;

    fn session(&self) -> &ScoringSession;

    /// Links of `objects`, all of the same kind, to objects of the other side.
    ///
    /// # Errors
    /// `InvalidValue` for an empty input, `InvalidType` for mixed kinds.
    fn get_links(&self, objects: &[Entity], params: &LinkParams) -> Result<LinkGraph, LinkError>;

    /// Links of every GCF taking part in scoring
    fn get_all_links(&self, params: &LinkParams) -> Result<LinkGraph, LinkError> {
        let gcfs = self.session().gcfs();
        if gcfs.is_empty() {
            return Ok(LinkGraph::new());
        }
        self.get_links(&gcfs, params)
    }
}
