//! Tab-separated input tables.
//!
//! * GCF membership: `gcf_id  bgc_id  strain  [bigscape_class  [products]]`, strain `-`
//!   for reference BGCs, products separated by commas
//! * Spectrum abundance: `spectrum_id  strain  intensity  [medium]`
//! * Molecular families: `family_id  spectrum_id`
//!
//! Empty lines and lines starting with `#` are skipped.

use crate::libs::dataset::Dataset;
use crate::libs::entity::{Bgc, Gcf, MolecularFamily, Spectrum, SINGLETON_FAMILY_ID};
use crate::libs::error::LinkError;
use crate::libs::strain::{Strain, StrainCollection};
use indexmap::IndexMap;
use std::io::BufRead;
use std::sync::Arc;

/// Growth medium of abundance rows without one
pub const DEFAULT_MEDIUM: &str = "unknown";

// empty strain or optional column
const NO_VALUE: &str = "-";

/// Collects objects from the input tables, resolving strain names on the way.
///
/// With a known strain universe, names are resolved through ids and aliases and
/// unknown names are dropped with a warning. Without one, every name seen becomes
/// a strain.
#[derive(Debug, Default)]
pub struct DatasetLoader {
    strains: StrainCollection,
    learn: bool,
    gcfs: IndexMap<String, Gcf>,
    spectra: IndexMap<String, Spectrum>,
    families: IndexMap<String, Vec<String>>,
}

// data lines with their 1-based numbers
fn records(reader: impl BufRead) -> impl Iterator<Item = Result<(usize, String), LinkError>> {
    reader
        .lines()
        .enumerate()
        .map(|(i, line)| line.map(|l| (i + 1, l)).map_err(LinkError::from))
        .filter(|r| match r {
            Ok((_, line)) => !line.trim().is_empty() && !line.starts_with('#'),
            Err(_) => true,
        })
}

fn fields(line: &str, no: usize, min: usize, max: usize) -> Result<Vec<&str>, LinkError> {
    let fields: Vec<&str> = line.split('\t').map(|f| f.trim()).collect();
    if fields.len() < min || fields.len() > max {
        return Err(LinkError::invalid_value(format!(
            "line {}: expected {} to {} fields, got {}",
            no,
            min,
            max,
            fields.len()
        )));
    }
    Ok(fields)
}

impl DatasetLoader {
    /// `None` learns the strain universe from the tables
    pub fn new(strains: Option<StrainCollection>) -> Self {
        match strains {
            Some(strains) => Self {
                strains,
                ..Default::default()
            },
            None => Self {
                learn: true,
                ..Default::default()
            },
        }
    }

    pub fn strains(&self) -> &StrainCollection {
        &self.strains
    }

    fn resolve(&mut self, name: &str) -> Result<Option<Strain>, LinkError> {
        if name.is_empty() || name == NO_VALUE {
            return Ok(None);
        }
        if let Ok(strain) = self.strains.lookup(name) {
            return Ok(Some(strain.clone()));
        }
        if self.learn {
            let strain = Strain::new(name);
            self.strains.add(strain.clone())?;
            return Ok(Some(strain));
        }
        log::warn!("Strain {} is not in the strain mappings, dropped", name);
        Ok(None)
    }

    /// Reads `gcf_id  bgc_id  strain  [bigscape_class  [products]]` rows.
    ///
    /// A GCF keeps the first BiG-SCAPE class given for it; `-` leaves a column empty.
    pub fn read_gcfs(&mut self, reader: impl BufRead) -> Result<(), LinkError> {
        let mut count = 0;
        for record in records(reader) {
            let (no, line) = record?;
            let f = fields(&line, no, 3, 5)?;
            let strain = self.resolve(f[2])?;
            let class = f.get(3).copied().filter(|c| !c.is_empty() && *c != NO_VALUE);
            let products = f
                .get(4)
                .copied()
                .filter(|p| *p != NO_VALUE)
                .unwrap_or_default()
                .split(',')
                .map(|p| p.trim())
                .filter(|p| !p.is_empty());

            let mut bgc = Bgc::new(f[1]).with_products(products);
            if let Some(strain) = strain {
                bgc = bgc.with_strain(strain);
            }
            let gcf = self
                .gcfs
                .entry(f[0].to_string())
                .or_insert_with(|| Gcf::new(f[0]));
            match (&gcf.bigscape_class, class) {
                (None, Some(class)) => gcf.bigscape_class = Some(class.to_string()),
                (Some(kept), Some(class)) if kept != class => log::warn!(
                    "line {}: GCF {} is already of class {}, ignoring {}",
                    no,
                    gcf.id,
                    kept,
                    class
                ),
                _ => {}
            }
            gcf.add_bgc(bgc)?;
            count += 1;
        }
        log::info!("Read {} BGCs in {} GCFs", count, self.gcfs.len());
        Ok(())
    }

    /// Reads `spectrum_id  strain  intensity  [medium]` rows.
    pub fn read_spectra(&mut self, reader: impl BufRead) -> Result<(), LinkError> {
        for record in records(reader) {
            let (no, line) = record?;
            let f = fields(&line, no, 3, 4)?;
            let intensity: f64 = f[2].parse().map_err(|_| {
                LinkError::invalid_value(format!("line {}: bad intensity {}", no, f[2]))
            })?;
            let medium = f.get(3).copied().unwrap_or(DEFAULT_MEDIUM);

            let strain = self.resolve(f[1])?;
            let spectrum = self
                .spectra
                .entry(f[0].to_string())
                .or_insert_with(|| Spectrum::new(f[0], 0.0));
            if let Some(strain) = strain {
                spectrum.add_strain(strain, medium, intensity)?;
            }
        }
        log::info!("Read {} spectra", self.spectra.len());
        Ok(())
    }

    /// Reads `family_id  spectrum_id` rows. Family `-1` marks a singleton.
    pub fn read_families(&mut self, reader: impl BufRead) -> Result<(), LinkError> {
        for record in records(reader) {
            let (no, line) = record?;
            let f = fields(&line, no, 2, 2)?;
            if f[0] == SINGLETON_FAMILY_ID {
                continue;
            }
            self.families
                .entry(f[0].to_string())
                .or_default()
                .push(f[1].to_string());
        }
        log::info!("Read {} molecular families", self.families.len());
        Ok(())
    }

    /// Assembles the dataset. Spectra outside every family become singleton families.
    pub fn build(self) -> Result<Dataset, LinkError> {
        let spectra: Vec<Spectrum> = self.spectra.into_values().collect();
        let shared: IndexMap<String, Arc<Spectrum>> = spectra
            .iter()
            .map(|s| (s.id.clone(), Arc::new(s.clone())))
            .collect();

        let mut mfs = vec![];
        let mut grouped = std::collections::HashSet::new();
        for (family_id, members) in self.families {
            let mut mf = MolecularFamily::new(&family_id);
            for spectrum_id in members {
                match shared.get(&spectrum_id) {
                    Some(spectrum) => {
                        mf.add_spectrum(spectrum.clone())?;
                        grouped.insert(spectrum_id);
                    }
                    None => log::warn!(
                        "Spectrum {} of family {} has no abundance data, skipped",
                        spectrum_id,
                        family_id
                    ),
                }
            }
            if !mf.spectra().is_empty() {
                mfs.push(mf);
            }
        }
        for (id, spectrum) in &shared {
            if !grouped.contains(id) {
                mfs.push(MolecularFamily::singleton(spectrum.clone())?);
            }
        }

        Ok(Dataset::new(
            self.strains,
            self.gcfs.into_values().collect(),
            spectra,
            mfs,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::entity::EntityKind;
    use std::io::BufReader;

    const GCF: &str = "# gcf_id\tbgc_id\tstrain\n\
        gcf1\tbgc1\tstrain1\n\
        gcf1\tbgc2\tstrain3\tPKSI\tT1PKS,NRPS\n\
        gcf1\tbgc3\tstrain3\tNRPS\n\
        gcf2\tBGC0000001\t-\t-\t-\n";

    const SPECTRA: &str = "spectrum1\tstrain1\t10\n\
        spectrum2\tstrain2\t5\tISP2\n\
        spectrum2\tstrain2\t5\tR5\n\
        \n\
        spectrum3\tstrain1\t1\n";

    const MF: &str = "fam1\tspectrum1\n\
        fam1\tspectrum2\n\
        -1\tspectrum3\n\
        fam2\tspectrum9\n";

    fn load(strains: Option<StrainCollection>) -> Dataset {
        let mut loader = DatasetLoader::new(strains);
        loader.read_gcfs(BufReader::new(GCF.as_bytes())).unwrap();
        loader
            .read_spectra(BufReader::new(SPECTRA.as_bytes()))
            .unwrap();
        loader.read_families(BufReader::new(MF.as_bytes())).unwrap();
        loader.build().unwrap()
    }

    #[test]
    fn test_learn_strains() {
        let ds = load(None);
        assert_eq!(ds.strains.ids().collect::<Vec<_>>(), vec!["strain1", "strain3", "strain2"]);
        assert_eq!(ds.gcfs.len(), 2);
        assert_eq!(ds.gcfs[0].bgcs().len(), 3);
        assert!(ds.gcfs[1].has_mibig_only());
        assert_eq!(ds.spectra.len(), 3);
        assert_eq!(ds.spectra[1].abundance(&Strain::new("strain2")), 10.0);
        assert_eq!(ds.spectra[1].media(&Strain::new("strain2")).unwrap().len(), 2);
    }

    #[test]
    fn test_gcf_annotations() {
        let ds = load(None);
        assert_eq!(ds.gcfs[0].bigscape_class.as_deref(), Some("PKSI"));
        let bgcs = ds.gcfs[0].bgcs();
        assert!(bgcs[0].product_prediction.is_empty());
        assert_eq!(bgcs[1].product_prediction, vec!["T1PKS", "NRPS"]);
        assert!(bgcs[2].product_prediction.is_empty());

        assert_eq!(ds.gcfs[1].bigscape_class, None);
        assert!(ds.gcfs[1].bgcs()[0].product_prediction.is_empty());
    }

    #[test]
    fn test_families_and_singletons() {
        let ds = load(None);
        let ids: Vec<&str> = ds.mfs.iter().map(|mf| mf.id.as_str()).collect();
        assert_eq!(ids, vec!["fam1", "singleton-spectrum3"]);
        assert_eq!(ds.mfs[0].spectra().len(), 2);
        assert!(ds.mfs[1].is_singleton());
        assert_eq!(
            ds.get_mf("fam1").unwrap().kind(),
            EntityKind::MolecularFamily
        );
    }

    #[test]
    fn test_known_strains() {
        let mut strains = StrainCollection::new();
        strains
            .add(Strain::with_aliases("strain1", ["s1-alias"]))
            .unwrap();
        strains.add(Strain::new("strain2")).unwrap();

        let mut loader = DatasetLoader::new(Some(strains));
        loader
            .read_spectra(BufReader::new("spectrum1\ts1-alias\t2\nspectrum1\tstrain9\t2\n".as_bytes()))
            .unwrap();
        assert_eq!(loader.strains().len(), 2);
        let ds = loader.build().unwrap();
        assert_eq!(ds.spectra[0].strains().ids().collect::<Vec<_>>(), vec!["strain1"]);
    }

    #[test]
    fn test_malformed() {
        let mut loader = DatasetLoader::new(None);
        let err = loader
            .read_gcfs(BufReader::new("gcf1\tbgc1\n".as_bytes()))
            .unwrap_err();
        assert!(err.to_string().contains("line 1"));
        assert!(loader
            .read_gcfs(BufReader::new("gcf1\tbgc1\t-\tPKSI\tNRPS\textra\n".as_bytes()))
            .is_err());

        let err = loader
            .read_spectra(BufReader::new("spectrum1\tstrain1\tmany\n".as_bytes()))
            .unwrap_err();
        assert!(matches!(err, LinkError::InvalidValue(_)));
    }
}
