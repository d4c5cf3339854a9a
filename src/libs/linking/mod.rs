//! Presence, co-occurrence and raw link scores between genomic and metabolomic objects.

pub mod data_links;
pub mod likelihood;
pub mod link_finder;
pub mod null_model;
pub mod presence;

pub use data_links::{Cooccurrence, DataLinks, LinkingConfig};
pub use likelihood::Likelihood;
pub use link_finder::{LinkFinder, LinkTable, MetcalfWeights, ScoreMatrices};
pub use null_model::NullModel;
pub use presence::PresenceMatrix;

use crate::libs::entity::EntityKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two pairings that are scored. Genomic objects are always GCFs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LinkType {
    #[serde(rename = "spec-gcf")]
    SpecGcf,
    #[serde(rename = "mf-gcf")]
    MfGcf,
}

impl LinkType {
    pub const ALL: [LinkType; 2] = [LinkType::SpecGcf, LinkType::MfGcf];

    /// Link type whose metabolomic side is `kind`
    pub fn for_kind(kind: EntityKind) -> Option<LinkType> {
        match kind {
            EntityKind::Spectrum => Some(LinkType::SpecGcf),
            EntityKind::MolecularFamily => Some(LinkType::MfGcf),
            EntityKind::Gcf => None,
        }
    }

    pub fn metabolomic_kind(&self) -> EntityKind {
        match self {
            LinkType::SpecGcf => EntityKind::Spectrum,
            LinkType::MfGcf => EntityKind::MolecularFamily,
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkType::SpecGcf => write!(f, "spec-gcf"),
            LinkType::MfGcf => write!(f, "mf-gcf"),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing;
