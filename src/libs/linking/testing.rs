use crate::libs::dataset::Dataset;
use crate::libs::entity::{Gcf, MolecularFamily, Spectrum};
use crate::libs::strain::{Strain, StrainCollection};
use std::sync::Arc;

fn universe() -> StrainCollection {
    let mut strains = StrainCollection::new();
    for id in ["strain1", "strain2", "strain3"] {
        strains.add(Strain::new(id)).unwrap();
    }
    strains
}

fn gcf(id: &str, strains: &[&str]) -> Gcf {
    let mut gcf = Gcf::new(id);
    for s in strains {
        gcf.add_strain(Strain::new(s)).unwrap();
    }
    gcf
}

fn spectrum(id: &str, strains: &[&str]) -> Spectrum {
    let mut spec = Spectrum::new(id, 100.0);
    for s in strains {
        spec.add_strain(Strain::new(s), "medium", 1.0).unwrap();
    }
    spec
}

/// gcf1/spectrum1 in strain1, gcf2/spectrum2 in strain2, gcf3/spectrum3 in both.
/// strain3 is in the universe but unused. mfN wraps spectrumN.
pub(crate) fn paired_dataset() -> Dataset {
    let gcfs = vec![
        gcf("gcf1", &["strain1"]),
        gcf("gcf2", &["strain2"]),
        gcf("gcf3", &["strain1", "strain2"]),
    ];
    let spectra = vec![
        spectrum("spectrum1", &["strain1"]),
        spectrum("spectrum2", &["strain2"]),
        spectrum("spectrum3", &["strain1", "strain2"]),
    ];
    let mfs = spectra
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let mut mf = MolecularFamily::new(&format!("mf{}", i + 1));
            mf.add_spectrum(Arc::new(spec.clone())).unwrap();
            mf
        })
        .collect();

    Dataset::new(universe(), gcfs, spectra, mfs)
}

/// gcf1 in strain1 and strain3; spectrum3 in all strains.
pub(crate) fn sparse_dataset() -> Dataset {
    let gcfs = vec![gcf("gcf1", &["strain1", "strain3"])];
    let spectra = vec![
        spectrum("spectrum1", &["strain1"]),
        spectrum("spectrum2", &["strain2"]),
        spectrum("spectrum3", &["strain1", "strain2", "strain3"]),
    ];

    Dataset::new(universe(), gcfs, spectra, vec![])
}
