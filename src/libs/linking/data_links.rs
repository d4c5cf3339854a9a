use super::presence::PresenceMatrix;
use super::LinkType;
use crate::libs::dataset::Dataset;
use crate::libs::entity::{Entity, EntityKind};
use crate::libs::error::LinkError;
use crate::libs::strain::{Strain, StrainCollection};
use indexmap::{IndexMap, IndexSet};
use itertools::iproduct;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Which objects take part in scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkingConfig {
    /// Score GCFs made of MiBIG reference BGCs only
    pub include_mibig_only: bool,
    /// Score singleton molecular families
    pub include_singletons: bool,
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            include_mibig_only: false,
            include_singletons: true,
        }
    }
}

/// Four-way strain co-occurrence counts between metabolomic objects (rows) and GCFs (columns).
///
/// In every cell `both + type1_only + gcf_only + neither` equals the number of strains.
#[derive(Debug, Clone)]
pub struct Cooccurrence {
    pub rows: IndexSet<String>,
    pub cols: IndexSet<String>,
    pub both: DMatrix<f64>,
    pub type1_only: DMatrix<f64>,
    pub gcf_only: DMatrix<f64>,
    pub neither: DMatrix<f64>,
}

impl Cooccurrence {
    /// `type1` and `gcf` must share the strain axis.
    pub fn compute(type1: &PresenceMatrix, gcf: &PresenceMatrix) -> Result<Self, LinkError> {
        if type1.cols() != gcf.cols() {
            return Err(LinkError::Shape(format!(
                "strain axes differ: {} vs {} columns",
                type1.cols().len(),
                gcf.cols().len()
            )));
        }

        let a = type1.data();
        let b = gcf.data();
        let not_a = a.map(|x| 1.0 - x);
        let not_b = b.map(|x| 1.0 - x);
        let bt = b.transpose();
        let not_bt = not_b.transpose();

        Ok(Self {
            rows: type1.rows().clone(),
            cols: gcf.rows().clone(),
            both: a * &bt,
            type1_only: a * &not_bt,
            gcf_only: &not_a * &bt,
            neither: &not_a * &not_bt,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.both.shape()
    }

    /// Checks that the four counts partition `n_strains` in every cell
    pub fn is_consistent(&self, n_strains: usize) -> bool {
        let total = &self.both + &self.type1_only + &self.gcf_only + &self.neither;
        total.iter().all(|&x| (x - n_strains as f64).abs() < 1e-9)
    }
}

/// Presence matrices for GCFs, spectra and molecular families over one strain universe,
/// and their co-occurrence counts.
#[derive(Debug, Clone)]
pub struct DataLinks {
    strains: StrainCollection,
    strain_fingerprint: u64,
    objects: IndexMap<EntityKind, IndexMap<String, Entity>>,
    presence: IndexMap<EntityKind, PresenceMatrix>,
    cooccurrence: IndexMap<LinkType, Cooccurrence>,
}

impl DataLinks {
    pub fn new(dataset: &Dataset, config: &LinkingConfig) -> Result<Self, LinkError> {
        let mut gcfs = dataset.gcf_entities();
        if !config.include_mibig_only {
            let before = gcfs.len();
            gcfs.retain(|o| match o {
                Entity::Gcf(gcf) => !gcf.has_mibig_only(),
                _ => true,
            });
            log::debug!("Excluded {} MiBIG-only GCFs", before - gcfs.len());
        }

        let mut mfs = dataset.mf_entities();
        if !config.include_singletons {
            mfs.retain(|o| match o {
                Entity::MolecularFamily(mf) => !mf.is_singleton(),
                _ => true,
            });
        }

        let groups = [
            (EntityKind::Gcf, gcfs),
            (EntityKind::Spectrum, dataset.spectrum_entities()),
            (EntityKind::MolecularFamily, mfs),
        ];

        let mut objects = IndexMap::new();
        let mut presence = IndexMap::new();
        for (kind, group) in groups {
            presence.insert(kind, PresenceMatrix::build(&group, &dataset.strains)?);
            objects.insert(
                kind,
                group
                    .into_iter()
                    .map(|o| (o.id().to_string(), o))
                    .collect::<IndexMap<_, _>>(),
            );
        }

        let mut cooccurrence = IndexMap::new();
        for link_type in LinkType::ALL {
            let co = Cooccurrence::compute(
                &presence[&link_type.metabolomic_kind()],
                &presence[&EntityKind::Gcf],
            )?;
            cooccurrence.insert(link_type, co);
        }

        log::info!(
            "Built co-occurrence of {} GCFs, {} spectra and {} molecular families over {} strains",
            objects[&EntityKind::Gcf].len(),
            objects[&EntityKind::Spectrum].len(),
            objects[&EntityKind::MolecularFamily].len(),
            dataset.strains.len()
        );

        Ok(Self {
            strains: dataset.strains.clone(),
            strain_fingerprint: dataset.strains.fingerprint(),
            objects,
            presence,
            cooccurrence,
        })
    }

    pub fn strains(&self) -> &StrainCollection {
        &self.strains
    }

    pub fn n_strains(&self) -> usize {
        self.strains.len()
    }

    pub fn strain_fingerprint(&self) -> u64 {
        self.strain_fingerprint
    }

    /// Rejects matrices built against a strain universe that has changed since.
    pub fn ensure_current(&self, strains: &StrainCollection) -> Result<(), LinkError> {
        let current = strains.fingerprint();
        if current != self.strain_fingerprint {
            return Err(LinkError::Stale {
                built: self.strain_fingerprint,
                current,
            });
        }
        Ok(())
    }

    pub fn presence(&self, kind: EntityKind) -> &PresenceMatrix {
        &self.presence[&kind]
    }

    pub fn occurrence_gcf_strain(&self) -> &PresenceMatrix {
        self.presence(EntityKind::Gcf)
    }

    pub fn occurrence_spec_strain(&self) -> &PresenceMatrix {
        self.presence(EntityKind::Spectrum)
    }

    pub fn occurrence_mf_strain(&self) -> &PresenceMatrix {
        self.presence(EntityKind::MolecularFamily)
    }

    pub fn cooccurrence(&self, link_type: LinkType) -> &Cooccurrence {
        &self.cooccurrence[&link_type]
    }

    /// Objects of `kind` taking part in scoring, in matrix row order
    pub fn objects(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.objects[&kind].values()
    }

    pub fn entity(&self, kind: EntityKind, id: &str) -> Option<&Entity> {
        self.objects[&kind].get(id)
    }

    /// Number of strains of the universe the object occurs in
    pub fn strain_count(&self, entity: &Entity) -> usize {
        let pm = self.presence(entity.kind());
        match pm.row_of(entity.id()) {
            Some(row) => (0..pm.shape().1).filter(|&j| pm.is_present(row, j)).count(),
            None => self
                .strains
                .iter()
                .filter(|s| entity.has_strain(s))
                .count(),
        }
    }

    /// Number of objects of `kind` found in each strain, in strain order
    pub fn objects_per_strain(&self, kind: EntityKind) -> IndexMap<String, usize> {
        let pm = self.presence(kind);
        pm.cols()
            .iter()
            .cloned()
            .zip(pm.col_totals().into_iter().map(|t| t as usize))
            .collect()
    }

    /// Strains of the universe in which both objects occur
    pub fn shared_strains(&self, a: &Entity, b: &Entity) -> Vec<Strain> {
        let pa = self.presence(a.kind());
        let pb = self.presence(b.kind());
        match (pa.row_of(a.id()), pb.row_of(b.id())) {
            (Some(ra), Some(rb)) => pa
                .shared_cols(ra, pb, rb)
                .into_iter()
                .filter_map(|j| self.strains.lookup_index(j).ok())
                .cloned()
                .collect(),
            _ => self
                .strains
                .iter()
                .filter(|s| a.has_strain(s) && b.has_strain(s))
                .cloned()
                .collect(),
        }
    }

    /// Shared strains for every (metabolomic object, GCF) pair of the two inputs.
    ///
    /// The arguments may come in either order: one side holds GCFs, the other spectra
    /// and/or molecular families. Keys are always `(metabolomic, gcf)`.
    ///
    /// # Errors
    /// `InvalidType` when a side is empty, mixes GCFs with metabolomic objects, or both
    /// sides hold the same kind of object.
    pub fn get_common_strains(
        &self,
        first: &[Entity],
        second: &[Entity],
        filter_no_shared: bool,
    ) -> Result<IndexMap<(Entity, Entity), Vec<Strain>>, LinkError> {
        let (mets, gcfs) = match (side_of(first)?, side_of(second)?) {
            (Side::Metabolomic, Side::Genomic) => (first, second),
            (Side::Genomic, Side::Metabolomic) => (second, first),
            _ => {
                return Err(LinkError::invalid_type(
                    "one argument must hold GCFs and the other spectra or molecular families",
                ))
            }
        };

        let mut result = IndexMap::new();
        for (met, gcf) in iproduct!(mets, gcfs) {
            let shared = self.shared_strains(met, gcf);
            if filter_no_shared && shared.is_empty() {
                continue;
            }
            result.insert((met.clone(), gcf.clone()), shared);
        }
        Ok(result)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Side {
    Genomic,
    Metabolomic,
}

fn side_of(objects: &[Entity]) -> Result<Side, LinkError> {
    if objects.is_empty() {
        return Err(LinkError::invalid_type("empty list of objects"));
    }
    let n_gcf = objects.iter().filter(|o| o.is_gcf()).count();
    if n_gcf == objects.len() {
        Ok(Side::Genomic)
    } else if n_gcf == 0 {
        Ok(Side::Metabolomic)
    } else {
        Err(LinkError::invalid_type(
            "GCFs can not be mixed with spectra or molecular families",
        ))
    }
}
