use crate::libs::entity::{Entity, Gcf, MolecularFamily, Spectrum};
use crate::libs::error::LinkError;
use crate::libs::strain::{Strain, StrainCollection};
use std::collections::HashSet;
use std::sync::Arc;
use xxhash_rust::xxh3::Xxh3;

/// The strain universe together with the three object collections that are linked.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub strains: StrainCollection,
    pub gcfs: Vec<Arc<Gcf>>,
    pub spectra: Vec<Arc<Spectrum>>,
    pub mfs: Vec<Arc<MolecularFamily>>,
}

impl Dataset {
    pub fn new(
        strains: StrainCollection,
        gcfs: Vec<Gcf>,
        spectra: Vec<Spectrum>,
        mfs: Vec<MolecularFamily>,
    ) -> Self {
        Self {
            strains,
            gcfs: gcfs.into_iter().map(Arc::new).collect(),
            spectra: spectra.into_iter().map(Arc::new).collect(),
            mfs: mfs.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn gcf_entities(&self) -> Vec<Entity> {
        self.gcfs.iter().cloned().map(Entity::Gcf).collect()
    }

    pub fn spectrum_entities(&self) -> Vec<Entity> {
        self.spectra.iter().cloned().map(Entity::Spectrum).collect()
    }

    pub fn mf_entities(&self) -> Vec<Entity> {
        self.mfs.iter().cloned().map(Entity::MolecularFamily).collect()
    }

    pub fn get_gcf(&self, id: &str) -> Option<Entity> {
        self.gcfs
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .map(Entity::Gcf)
    }

    pub fn get_spectrum(&self, id: &str) -> Option<Entity> {
        self.spectra
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .map(Entity::Spectrum)
    }

    pub fn get_mf(&self, id: &str) -> Option<Entity> {
        self.mfs
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .map(Entity::MolecularFamily)
    }

    /// Hash over the strain universe and the identity and strain content of every object.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Xxh3::new();
        hasher.update(&self.strains.fingerprint().to_le_bytes());

        let groups = [
            self.gcf_entities(),
            self.spectrum_entities(),
            self.mf_entities(),
        ];
        for group in groups.iter() {
            hasher.update(&(group.len() as u64).to_le_bytes());
            for obj in group {
                hasher.update(obj.id().as_bytes());
                hasher.update(b"\n");
                for strain in obj.strains() {
                    hasher.update(strain.id().as_bytes());
                    hasher.update(b"\t");
                }
            }
        }
        hasher.digest()
    }

    /// Restricts the strain universe to strains seen in both BGCs and spectra.
    ///
    /// Returns the number of strains kept.
    pub fn filter_common_strains(&mut self) -> usize {
        let bgc_strains: HashSet<&str> = self
            .gcfs
            .iter()
            .flat_map(|gcf| gcf.bgcs())
            .filter_map(|bgc| bgc.strain.as_ref())
            .map(|strain| strain.id())
            .collect();
        let spectrum_strains: HashSet<&str> = self
            .spectra
            .iter()
            .flat_map(|s| s.strains())
            .map(|strain| strain.id())
            .collect();

        log::debug!(
            "Filtering strains: genomics count {}, metabolomics count: {}",
            bgc_strains.len(),
            spectrum_strains.len()
        );
        let common: Vec<Strain> = self
            .strains
            .iter()
            .filter(|s| bgc_strains.contains(s.id()) && spectrum_strains.contains(s.id()))
            .cloned()
            .collect();
        self.strains.filter(&common);
        log::info!("Strains filtered down to total of {}", self.strains.len());

        self.strains.len()
    }

    /// Keeps only the user-selected strains and drops objects left without any strain.
    ///
    /// # Errors
    /// `NotFound` for an unknown name, `InvalidValue` if nothing is left.
    pub fn filter_user_strains(&mut self, names: &[&str]) -> Result<(), LinkError> {
        if names.is_empty() {
            log::info!("No further strain filtering to apply");
            return Ok(());
        }

        let keep = names
            .iter()
            .map(|name| self.strains.lookup(name).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        self.strains.filter(&keep);
        if self.strains.is_empty() {
            return Err(LinkError::invalid_value(
                "no strains left after filtering",
            ));
        }

        let strains = &self.strains;
        let in_universe = |sc: &StrainCollection| sc.iter().any(|s| strains.contains(s));
        self.gcfs.retain(|o| in_universe(o.strains()));
        self.spectra.retain(|o| in_universe(o.strains()));
        self.mfs.retain(|o| in_universe(o.strains()));
        log::info!(
            "Retained {} GCFs, {} spectra, {} molecular families",
            self.gcfs.len(),
            self.spectra.len(),
            self.mfs.len()
        );

        Ok(())
    }
}
