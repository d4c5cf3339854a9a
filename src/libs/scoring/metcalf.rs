use super::base::{LinkParams, ScoringBase};
use super::link_graph::LinkGraph;
use super::score::{ScoreParams, ScoringMethod};
use super::session::{ScoringOptions, ScoringSession};
use crate::libs::dataset::Dataset;
use crate::libs::entity::Entity;
use crate::libs::error::LinkError;
use std::sync::Arc;

/// Metcalf scoring: weighted strain co-occurrence counts, optionally standardised
/// against the hypergeometric null model.
///
/// # Example
/// ```
/// use nplink::libs::dataset::Dataset;
/// use nplink::libs::entity::{Gcf, Spectrum};
/// use nplink::libs::scoring::{LinkParams, MetcalfScoring, ScoringBase, ScoringOptions};
/// use nplink::libs::strain::{Strain, StrainCollection};
///
/// let mut strains = StrainCollection::new();
/// strains.add(Strain::new("strain1")).unwrap();
/// strains.add(Strain::new("strain2")).unwrap();
///
/// let mut gcf = Gcf::new("gcf1");
/// gcf.add_strain(Strain::new("strain1")).unwrap();
/// let mut spec = Spectrum::new("spectrum1", 100.0);
/// spec.add_strain(Strain::new("strain1"), "medium", 1.0).unwrap();
///
/// let ds = Dataset::new(strains, vec![gcf], vec![spec], vec![]);
/// let mc = MetcalfScoring::setup(&ds, ScoringOptions::default()).unwrap();
/// let lg = mc.get_links(&ds.gcf_entities(), &LinkParams::default()).unwrap();
/// assert_eq!(lg.edge_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MetcalfScoring {
    session: Arc<ScoringSession>,
    cutoff: f64,
    standardised: bool,
}

impl MetcalfScoring {
    pub fn new(session: Arc<ScoringSession>) -> Self {
        Self {
            session,
            cutoff: 0.0,
            standardised: false,
        }
    }

    pub fn setup(dataset: &Dataset, options: ScoringOptions) -> Result<Self, LinkError> {
        Ok(Self::new(Arc::new(ScoringSession::setup(dataset, options)?)))
    }

    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn with_standardised(mut self, standardised: bool) -> Self {
        self.standardised = standardised;
        self
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn standardised(&self) -> bool {
        self.standardised
    }

    /// Rebuilds the session for a changed dataset.
    ///
    /// Other strategies sharing the old session keep their snapshot.
    pub fn refresh(&mut self, dataset: &Dataset) -> Result<(), LinkError> {
        Arc::make_mut(&mut self.session).refresh(dataset)
    }
}

impl ScoringBase for MetcalfScoring {
    fn method(&self) -> ScoringMethod {
        ScoringMethod::Metcalf
    }

    fn session(&self) -> &ScoringSession {
        &self.session
    }

    /// Raw scores are cut directly; standardised ones are cut after conversion to z-scores.
    fn get_links(&self, objects: &[Entity], params: &LinkParams) -> Result<LinkGraph, LinkError> {
        let cutoff = params.cutoff.unwrap_or(self.cutoff);
        let standardised = params.standardised.unwrap_or(self.standardised);
        let score_params = ScoreParams {
            cutoff,
            standardised,
        };
        let session = &*self.session;

        if !standardised {
            let tables = session
                .link_finder()
                .get_links(objects, ScoringMethod::Metcalf, cutoff)?;
            return session.build_graph(&tables, ScoringMethod::Metcalf, score_params, |_, _, raw| {
                Some(raw)
            });
        }

        let tables =
            session
                .link_finder()
                .get_links(objects, ScoringMethod::Metcalf, f64::NEG_INFINITY)?;
        let data_links = session.data_links();
        let null_model = session.null_model();
        log::debug!(
            "Standardising Metcalf scores against {} strains",
            null_model.n_strains()
        );
        session.build_graph(&tables, ScoringMethod::Metcalf, score_params, |met, gcf, raw| {
            let n = data_links.strain_count(met);
            let m = data_links.strain_count(gcf);
            let z = null_model.standardise(raw, n, m);
            (z >= cutoff).then_some(z)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::entity::EntityKind;
    use crate::libs::linking::testing::{paired_dataset, sparse_dataset};
    use crate::libs::strain::Strain;
    use approx::assert_relative_eq;

    fn metcalf(ds: &Dataset) -> MetcalfScoring {
        MetcalfScoring::setup(ds, ScoringOptions::default()).unwrap()
    }

    fn value(lg: &LinkGraph, u: &Entity, v: &Entity) -> Option<f64> {
        lg.get_link_data(u, v)
            .and_then(|data| data.value(ScoringMethod::Metcalf))
    }

    #[test]
    fn test_raw_scores() {
        let ds = sparse_dataset();
        let mc = metcalf(&ds);
        let gcf1 = ds.get_gcf("gcf1").unwrap();
        let spec1 = ds.get_spectrum("spectrum1").unwrap();
        let spec2 = ds.get_spectrum("spectrum2").unwrap();
        let spec3 = ds.get_spectrum("spectrum3").unwrap();

        let lg = mc.get_links(&[gcf1.clone()], &LinkParams::default()).unwrap();
        assert_eq!(lg.edge_count(), 2);
        assert_eq!(value(&lg, &gcf1, &spec1), Some(11.0));
        assert_eq!(value(&lg, &gcf1, &spec3), Some(10.0));
        assert!(!lg.has_link(&gcf1, &spec2));

        let lg = mc
            .get_links(&[gcf1.clone()], &LinkParams::with_cutoff(10.5))
            .unwrap();
        assert_eq!(lg.edge_count(), 1);
        assert!(lg.has_link(&spec1, &gcf1));

        let lg = mc
            .get_links(&[gcf1.clone()], &LinkParams::with_cutoff(-100.0))
            .unwrap();
        assert_eq!(value(&lg, &gcf1, &spec2), Some(-10.0));
    }

    #[test]
    fn test_standardised() {
        let ds = sparse_dataset();
        let mc = metcalf(&ds).with_standardised(true);
        let gcf1 = ds.get_gcf("gcf1").unwrap();
        let spec1 = ds.get_spectrum("spectrum1").unwrap();
        let spec3 = ds.get_spectrum("spectrum3").unwrap();

        // n=1, m=2 of 3 strains: mean 4, variance 98
        let lg = mc.get_links(&[spec1.clone()], &LinkParams::default()).unwrap();
        let z = value(&lg, &spec1, &gcf1).unwrap();
        assert_relative_eq!(z, 7.0 / 98f64.sqrt(), epsilon = 1e-9);

        let data = lg.get_link_data(&gcf1, &spec1).unwrap();
        let score = data.score(ScoringMethod::Metcalf).unwrap();
        assert!(score.parameter.standardised);

        // a fixed overlap has no spread, z is 0
        let lg = mc
            .get_links(&[spec3.clone()], &LinkParams::with_cutoff(-1.0))
            .unwrap();
        assert_relative_eq!(value(&lg, &spec3, &gcf1).unwrap(), 0.0, epsilon = 1e-9);

        // cut on the z-score
        let lg = mc
            .get_links(&[gcf1.clone()], &LinkParams::with_cutoff(0.5))
            .unwrap();
        assert_eq!(lg.edge_count(), 1);
        assert!(lg.has_link(&gcf1, &spec1));

        // overridden per query
        let lg = mc
            .get_links(
                &[gcf1.clone()],
                &LinkParams::with_cutoff(10.5).standardised(false),
            )
            .unwrap();
        assert_eq!(value(&lg, &gcf1, &spec1), Some(11.0));
    }

    #[test]
    fn test_shared_strains_on_links() {
        let ds = sparse_dataset();
        let mc = metcalf(&ds);
        let gcf1 = ds.get_gcf("gcf1").unwrap();
        let spec1 = ds.get_spectrum("spectrum1").unwrap();
        let spec3 = ds.get_spectrum("spectrum3").unwrap();

        let lg = mc.get_all_links(&LinkParams::default()).unwrap();
        let data = lg.get_link_data(&gcf1, &spec1).unwrap();
        assert_eq!(data.shared_strains, vec![Strain::new("strain1")]);
        let data = lg.get_link_data(&gcf1, &spec3).unwrap();
        assert_eq!(
            data.shared_strains,
            vec![Strain::new("strain1"), Strain::new("strain3")]
        );
    }

    #[test]
    fn test_spectra_and_families() {
        let ds = paired_dataset();
        let mc = metcalf(&ds);
        let gcf1 = ds.get_gcf("gcf1").unwrap();

        let lg = mc.get_links(&[gcf1.clone()], &LinkParams::default()).unwrap();
        // spectrum1 12, spectrum3 1, mf1 12, mf3 1
        assert_eq!(lg.edge_count(), 4);
        assert_eq!(value(&lg, &gcf1, &ds.get_mf("mf1").unwrap()), Some(12.0));
        assert_eq!(value(&lg, &gcf1, &ds.get_spectrum("spectrum3").unwrap()), Some(1.0));

        let lg = mc.get_links(&ds.mf_entities(), &LinkParams::default()).unwrap();
        assert!(lg
            .nodes()
            .filter(|n| !n.is_gcf())
            .all(|n| n.kind() == EntityKind::MolecularFamily));
    }

    #[test]
    fn test_get_links_idempotent() {
        let ds = paired_dataset();
        let mc = metcalf(&ds);
        let first = mc.get_all_links(&LinkParams::default()).unwrap();
        let second = mc.get_all_links(&LinkParams::default()).unwrap();
        assert_eq!(first.links(), second.links());
    }

    #[test]
    fn test_invalid_input() {
        let ds = paired_dataset();
        let mc = metcalf(&ds);
        assert!(matches!(
            mc.get_links(&[], &LinkParams::default()),
            Err(LinkError::InvalidValue(_))
        ));
        let mixed = [
            ds.get_gcf("gcf1").unwrap(),
            ds.get_spectrum("spectrum1").unwrap(),
        ];
        assert!(matches!(
            mc.get_links(&mixed, &LinkParams::default()),
            Err(LinkError::InvalidType(_))
        ));
    }

    #[test]
    fn test_refresh() {
        let mut ds = sparse_dataset();
        let mut mc = metcalf(&ds);
        let shared = mc.clone();

        ds.strains.filter(&[Strain::new("strain1"), Strain::new("strain2")]);
        assert!(mc.session().is_stale(&ds));
        mc.refresh(&ds).unwrap();
        assert!(!mc.session().is_stale(&ds));
        assert!(shared.session().is_stale(&ds));

        // gcf1 now only in strain1: spectrum1 10 + 1, spectrum3 10 - 10 + 0
        let gcf1 = ds.get_gcf("gcf1").unwrap();
        let lg = mc
            .get_links(&[gcf1.clone()], &LinkParams::with_cutoff(-100.0))
            .unwrap();
        assert_eq!(value(&lg, &gcf1, &ds.get_spectrum("spectrum1").unwrap()), Some(11.0));
        assert_eq!(value(&lg, &gcf1, &ds.get_spectrum("spectrum3").unwrap()), Some(0.0));
    }

    #[test]
    fn test_session_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ScoringSession>();
        assert_send_sync::<MetcalfScoring>();
    }
}
