use crate::libs::error::LinkError;
use crate::libs::strain::{Strain, StrainCollection};
use indexmap::{IndexMap, IndexSet};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

lazy_static! {
    // MiBIG accessions: BGC0000001, BGC0000001.2
    static ref MIBIG_ID: Regex = Regex::new(r"^BGC\d+").unwrap();
}

/// GNPS family id shared by all spectra without a family
pub const SINGLETON_FAMILY_ID: &str = "-1";

/// A biosynthetic gene cluster.
#[derive(Debug, Clone)]
pub struct Bgc {
    pub id: String,
    /// Reference BGCs have no strain
    pub strain: Option<Strain>,
    pub product_prediction: Vec<String>,
}

impl Bgc {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            strain: None,
            product_prediction: vec![],
        }
    }

    pub fn with_strain(mut self, strain: Strain) -> Self {
        self.strain = Some(strain);
        self
    }

    pub fn with_products<'a>(mut self, products: impl IntoIterator<Item = &'a str>) -> Self {
        self.product_prediction = products.into_iter().map(|p| p.to_string()).collect();
        self
    }

    /// MiBIG accessions look like `BGC0000001`.
    pub fn is_mibig(&self) -> bool {
        MIBIG_ID.is_match(&self.id)
    }
}

/// Gene cluster family, a group of similar BGCs.
///
/// Its strains are the union of its BGCs' strains.
#[derive(Debug, Clone, Default)]
pub struct Gcf {
    pub id: String,
    pub bigscape_class: Option<String>,
    bgcs: Vec<Bgc>,
    strains: StrainCollection,
}

impl Gcf {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn bgcs(&self) -> &[Bgc] {
        &self.bgcs
    }

    pub fn strains(&self) -> &StrainCollection {
        &self.strains
    }

    pub fn add_bgc(&mut self, bgc: Bgc) -> Result<(), LinkError> {
        match &bgc.strain {
            Some(strain) => self.strains.add(strain.clone())?,
            None => log::debug!("No strain specified for the BGC {}", bgc.id),
        }
        self.bgcs.retain(|b| b.id != bgc.id);
        self.bgcs.push(bgc);
        Ok(())
    }

    /// Removes a BGC. Its strain leaves the GCF unless another BGC still carries it.
    pub fn detach_bgc(&mut self, bgc_id: &str) -> Option<Bgc> {
        let pos = self.bgcs.iter().position(|b| b.id == bgc_id)?;
        let bgc = self.bgcs.remove(pos);
        if let Some(strain) = &bgc.strain {
            let shared = self.bgcs.iter().any(|b| b.strain.as_ref() == Some(strain));
            if !shared && self.strains.contains(strain) {
                self.strains.remove(strain).ok();
            }
        }
        Some(bgc)
    }

    /// Attaches a strain without going through a BGC
    pub fn add_strain(&mut self, strain: Strain) -> Result<(), LinkError> {
        self.strains.add(strain)
    }

    pub fn has_strain(&self, strain: &Strain) -> bool {
        self.strains.contains(strain)
    }

    /// True when the GCF has BGCs and all of them are MiBIG references.
    pub fn has_mibig_only(&self) -> bool {
        !self.bgcs.is_empty() && self.bgcs.iter().all(|b| b.is_mibig())
    }

    pub fn is_singleton(&self) -> bool {
        self.bgcs.len() == 1
    }
}

/// MS/MS spectrum with per-strain abundance.
#[derive(Debug, Clone, Default)]
pub struct Spectrum {
    pub id: String,
    pub precursor_mz: f64,
    /// strain id -> growth medium -> intensity
    abundance: IndexMap<String, IndexMap<String, f64>>,
    strains: StrainCollection,
}

impl Spectrum {
    pub fn new(id: &str, precursor_mz: f64) -> Self {
        Self {
            id: id.to_string(),
            precursor_mz,
            ..Default::default()
        }
    }

    pub fn strains(&self) -> &StrainCollection {
        &self.strains
    }

    /// Records the intensity of this spectrum for a strain grown in `medium`.
    /// Repeated measurements in the same medium accumulate.
    pub fn add_strain(&mut self, strain: Strain, medium: &str, intensity: f64) -> Result<(), LinkError> {
        *self
            .abundance
            .entry(strain.id().to_string())
            .or_default()
            .entry(medium.to_string())
            .or_insert(0.0) += intensity;

        if self.abundance_of(strain.id()) > 0.0 {
            self.strains.add(strain)?;
        }
        Ok(())
    }

    fn abundance_of(&self, strain_id: &str) -> f64 {
        self.abundance
            .get(strain_id)
            .map(|media| media.values().sum())
            .unwrap_or(0.0)
    }

    /// Total intensity over all growth media
    pub fn abundance(&self, strain: &Strain) -> f64 {
        self.abundance_of(strain.id())
    }

    pub fn media(&self, strain: &Strain) -> Option<&IndexMap<String, f64>> {
        self.abundance.get(strain.id())
    }

    pub fn has_strain(&self, strain: &Strain) -> bool {
        self.abundance(strain) > 0.0
    }
}

/// A group of spectra. Its strains are the union of its members' strains.
#[derive(Debug, Clone, Default)]
pub struct MolecularFamily {
    pub id: String,
    /// Family id as reported by GNPS, `-1` for singletons
    pub family_id: String,
    spectra: Vec<Arc<Spectrum>>,
    strains: StrainCollection,
}

impl MolecularFamily {
    pub fn new(family_id: &str) -> Self {
        Self {
            id: family_id.to_string(),
            family_id: family_id.to_string(),
            ..Default::default()
        }
    }

    /// A family holding exactly one spectrum.
    ///
    /// All singletons share the GNPS family id `-1`, so the id is derived from the spectrum.
    pub fn singleton(spectrum: Arc<Spectrum>) -> Result<Self, LinkError> {
        let mut mf = Self {
            id: format!("singleton-{}", spectrum.id),
            family_id: SINGLETON_FAMILY_ID.to_string(),
            ..Default::default()
        };
        mf.add_spectrum(spectrum)?;
        Ok(mf)
    }

    pub fn is_singleton(&self) -> bool {
        self.family_id == SINGLETON_FAMILY_ID
    }

    pub fn spectra(&self) -> &[Arc<Spectrum>] {
        &self.spectra
    }

    pub fn add_spectrum(&mut self, spectrum: Arc<Spectrum>) -> Result<(), LinkError> {
        if self.is_singleton() && !self.spectra.is_empty() {
            return Err(LinkError::invalid_value(format!(
                "singleton family {} already holds a spectrum",
                self.id
            )));
        }
        self.strains.merge(spectrum.strains())?;
        self.spectra.push(spectrum);
        Ok(())
    }

    pub fn strains(&self) -> &StrainCollection {
        &self.strains
    }

    pub fn has_strain(&self, strain: &Strain) -> bool {
        self.strains.contains(strain)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Gcf,
    Spectrum,
    MolecularFamily,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Gcf => "GCF",
            EntityKind::Spectrum => "Spectrum",
            EntityKind::MolecularFamily => "MolecularFamily",
        };
        write!(f, "{}", name)
    }
}

/// Any object that can take part in a link.
///
/// Cloning is cheap. Two entities are equal when kind and id match.
#[derive(Debug, Clone)]
pub enum Entity {
    Gcf(Arc<Gcf>),
    Spectrum(Arc<Spectrum>),
    MolecularFamily(Arc<MolecularFamily>),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Gcf(_) => EntityKind::Gcf,
            Entity::Spectrum(_) => EntityKind::Spectrum,
            Entity::MolecularFamily(_) => EntityKind::MolecularFamily,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entity::Gcf(o) => &o.id,
            Entity::Spectrum(o) => &o.id,
            Entity::MolecularFamily(o) => &o.id,
        }
    }

    pub fn strains(&self) -> &StrainCollection {
        match self {
            Entity::Gcf(o) => o.strains(),
            Entity::Spectrum(o) => o.strains(),
            Entity::MolecularFamily(o) => o.strains(),
        }
    }

    pub fn has_strain(&self, strain: &Strain) -> bool {
        match self {
            Entity::Gcf(o) => o.has_strain(strain),
            Entity::Spectrum(o) => o.has_strain(strain),
            Entity::MolecularFamily(o) => o.has_strain(strain),
        }
    }

    pub fn is_gcf(&self) -> bool {
        matches!(self, Entity::Gcf(_))
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.id() == other.id()
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.id().hash(state);
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.id())
    }
}

impl From<Gcf> for Entity {
    fn from(o: Gcf) -> Self {
        Entity::Gcf(Arc::new(o))
    }
}

impl From<Spectrum> for Entity {
    fn from(o: Spectrum) -> Self {
        Entity::Spectrum(Arc::new(o))
    }
}

impl From<MolecularFamily> for Entity {
    fn from(o: MolecularFamily) -> Self {
        Entity::MolecularFamily(Arc::new(o))
    }
}

/// The single kind shared by all `objects`.
///
/// # Errors
/// `InvalidValue` for an empty slice, `InvalidType` when kinds are mixed.
pub fn common_kind(objects: &[Entity]) -> Result<EntityKind, LinkError> {
    let first = objects
        .first()
        .ok_or_else(|| LinkError::invalid_value("empty input objects"))?;
    let kinds: IndexSet<EntityKind> = objects.iter().map(|o| o.kind()).collect();
    if kinds.len() > 1 {
        return Err(LinkError::invalid_type(format!(
            "input objects must all be of one type, found {}",
            kinds.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", ")
        )));
    }
    Ok(first.kind())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcf_strains_from_bgcs() {
        let mut gcf = Gcf::new("gcf1");
        gcf.add_bgc(Bgc::new("bgc1").with_strain(Strain::new("strain1")))
            .unwrap();
        gcf.add_bgc(Bgc::new("bgc2").with_strain(Strain::new("strain1")))
            .unwrap();
        gcf.add_bgc(Bgc::new("bgc3").with_strain(Strain::new("strain2")))
            .unwrap();
        assert_eq!(gcf.strains().len(), 2);

        gcf.detach_bgc("bgc1");
        assert!(gcf.has_strain(&Strain::new("strain1")));
        gcf.detach_bgc("bgc2");
        assert!(!gcf.has_strain(&Strain::new("strain1")));
    }

    #[test]
    fn test_gcf_mibig_only() {
        let mut gcf = Gcf::new("gcf1");
        assert!(!gcf.has_mibig_only());

        gcf.add_bgc(Bgc::new("BGC0000001")).unwrap();
        assert!(gcf.has_mibig_only());
        assert!(gcf.is_singleton());

        gcf.add_bgc(Bgc::new("SAMPLE.region01").with_strain(Strain::new("strain1")))
            .unwrap();
        assert!(!gcf.has_mibig_only());
    }

    #[test]
    fn test_spectrum_abundance() {
        let mut spec = Spectrum::new("spectrum1", 150.0);
        spec.add_strain(Strain::new("strain1"), "medium1", 10.0)
            .unwrap();
        spec.add_strain(Strain::new("strain1"), "medium2", 5.0)
            .unwrap();
        spec.add_strain(Strain::new("strain2"), "medium1", 0.0)
            .unwrap();

        assert_eq!(spec.abundance(&Strain::new("strain1")), 15.0);
        assert!(spec.has_strain(&Strain::new("strain1")));
        assert!(!spec.has_strain(&Strain::new("strain2")));
        assert_eq!(spec.strains().len(), 1);
    }

    #[test]
    fn test_molecular_family_union() {
        let mut s1 = Spectrum::new("spectrum1", 100.0);
        s1.add_strain(Strain::new("strain1"), "m", 1.0).unwrap();
        let mut s2 = Spectrum::new("spectrum2", 200.0);
        s2.add_strain(Strain::new("strain2"), "m", 1.0).unwrap();

        let mut mf = MolecularFamily::new("mf1");
        mf.add_spectrum(Arc::new(s1.clone())).unwrap();
        mf.add_spectrum(Arc::new(s2)).unwrap();
        assert_eq!(mf.strains().len(), 2);
        assert!(!mf.is_singleton());

        let mut single = MolecularFamily::singleton(Arc::new(s1)).unwrap();
        assert!(single.is_singleton());
        assert_eq!(single.id, "singleton-spectrum1");
        assert!(single
            .add_spectrum(Arc::new(Spectrum::new("spectrum3", 1.0)))
            .is_err());
    }

    #[test]
    fn test_entity_identity() {
        let a: Entity = Gcf::new("x").into();
        let b: Entity = Gcf::new("x").into();
        let c: Entity = Spectrum::new("x", 1.0).into();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(c.to_string(), "Spectrum(x)");
    }

    #[test]
    fn test_common_kind() {
        let gcf: Entity = Gcf::new("gcf1").into();
        let spec: Entity = Spectrum::new("spectrum1", 1.0).into();

        assert_eq!(common_kind(&[gcf.clone()]).unwrap(), EntityKind::Gcf);
        assert!(matches!(common_kind(&[]), Err(LinkError::InvalidValue(_))));
        assert!(matches!(
            common_kind(&[gcf, spec]),
            Err(LinkError::InvalidType(_))
        ));
    }
}
