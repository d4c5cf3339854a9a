use crate::libs::error::LinkError;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// A biological sample, identified by a canonical id and known by any number of aliases.
///
/// Equality and hashing only look at the canonical id.
///
/// # Example
/// ```
/// use nplink::libs::strain::Strain;
/// let mut strain = Strain::new("strain1");
/// strain.add_alias("s1");
/// assert_eq!(strain.names(), vec!["strain1", "s1"]);
/// assert_eq!(strain, Strain::new("strain1"));
/// ```
#[derive(Debug, Clone, Eq)]
pub struct Strain {
    id: String,
    aliases: IndexSet<String>,
}

impl Strain {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            aliases: IndexSet::new(),
        }
    }

    pub fn with_aliases<'a>(id: &str, aliases: impl IntoIterator<Item = &'a str>) -> Self {
        let mut strain = Self::new(id);
        for alias in aliases {
            strain.add_alias(alias);
        }
        strain
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.iter().map(|s| s.as_str())
    }

    /// The canonical id followed by all aliases
    pub fn names(&self) -> Vec<&str> {
        std::iter::once(self.id.as_str())
            .chain(self.aliases())
            .collect()
    }

    /// Empty aliases are refused with a warning. An alias equal to the id is a no-op.
    pub fn add_alias(&mut self, alias: &str) {
        if alias.is_empty() {
            log::warn!("Refusing to add an empty alias to strain {}", self.id);
            return;
        }
        if alias != self.id {
            self.aliases.insert(alias.to_string());
        }
    }
}

impl PartialEq for Strain {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Hash for Strain {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Strain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StrainMappings {
    strain_mappings: Vec<StrainMapping>,
    version: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StrainMapping {
    strain_id: String,
    strain_alias: Vec<String>,
}

const MAPPINGS_VERSION: &str = "1.0";

/// Insertion-ordered set of unique strains.
///
/// Every strain is reachable by its id or any alias. The position of a strain is the
/// column it occupies in presence matrices.
#[derive(Debug, Clone, Default)]
pub struct StrainCollection {
    strains: IndexMap<String, Strain>,
    // any name -> canonical id
    names: HashMap<String, String>,
}

impl StrainCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.strains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strains.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Values<'_, String, Strain> {
        self.strains.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.strains.keys().map(|s| s.as_str())
    }

    /// Adds a strain, merging its aliases into an existing strain with the same id.
    ///
    /// # Errors
    /// `InvalidValue` if any name of `strain` already resolves to a different strain.
    ///
    /// # Example
    /// ```
    /// use nplink::libs::strain::{Strain, StrainCollection};
    /// let mut sc = StrainCollection::new();
    /// sc.add(Strain::new("strain1")).unwrap();
    /// sc.add(Strain::with_aliases("strain1", ["s1"])).unwrap();
    /// assert_eq!(sc.len(), 1);
    /// assert_eq!(sc.lookup("s1").unwrap().id(), "strain1");
    /// assert!(sc.add(Strain::with_aliases("strain2", ["s1"])).is_err());
    /// ```
    pub fn add(&mut self, strain: Strain) -> Result<(), LinkError> {
        for name in strain.names() {
            if let Some(owner) = self.names.get(name) {
                if owner != strain.id() {
                    return Err(LinkError::invalid_value(format!(
                        "name {} of strain {} already belongs to strain {}",
                        name,
                        strain.id(),
                        owner
                    )));
                }
            }
        }

        for name in strain.names() {
            self.names.insert(name.to_string(), strain.id().to_string());
        }
        match self.strains.get_mut(strain.id()) {
            Some(existing) => {
                for alias in strain.aliases() {
                    existing.add_alias(alias);
                }
            }
            None => {
                self.strains.insert(strain.id().to_string(), strain);
            }
        }

        Ok(())
    }

    /// Adds every strain of `other`
    pub fn merge(&mut self, other: &StrainCollection) -> Result<(), LinkError> {
        for strain in other.iter() {
            self.add(strain.clone())?;
        }
        Ok(())
    }

    /// Removes a strain and all its names, keeping the order of the others.
    pub fn remove(&mut self, strain: &Strain) -> Result<Strain, LinkError> {
        let removed = self
            .strains
            .shift_remove(strain.id())
            .ok_or_else(|| LinkError::not_found(format!("strain {}", strain.id())))?;
        for name in removed.names() {
            self.names.remove(name);
        }
        Ok(removed)
    }

    /// Resolves an id or an alias.
    pub fn lookup(&self, name: &str) -> Result<&Strain, LinkError> {
        self.names
            .get(name)
            .and_then(|id| self.strains.get(id))
            .ok_or_else(|| LinkError::not_found(format!("strain {}", name)))
    }

    pub fn lookup_index(&self, index: usize) -> Result<&Strain, LinkError> {
        self.strains
            .get_index(index)
            .map(|(_, s)| s)
            .ok_or_else(|| {
                LinkError::not_found(format!(
                    "strain index {} (collection has {})",
                    index,
                    self.len()
                ))
            })
    }

    /// Column of the strain known by `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names
            .get(name)
            .and_then(|id| self.strains.get_index_of(id))
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn contains(&self, strain: &Strain) -> bool {
        self.strains.contains_key(strain.id())
    }

    /// Keeps only the strains in `keep` (matched by id), preserving relative order.
    /// Strains not in `keep` are dropped silently.
    pub fn filter<'a>(&mut self, keep: impl IntoIterator<Item = &'a Strain>) {
        let keep: HashSet<&str> = keep.into_iter().map(|s| s.id()).collect();
        let before = self.len();
        self.strains.retain(|id, _| keep.contains(id.as_str()));
        self.names.retain(|_, id| keep.contains(id.as_str()));
        log::debug!("Strain filter kept {} of {} strains", self.len(), before);
    }

    /// Strains of `self` that are also in `other`, in the order of `self`
    pub fn intersection(&self, other: &StrainCollection) -> StrainCollection {
        let mut result = StrainCollection::new();
        for strain in self.iter().filter(|s| other.contains(s)) {
            for name in strain.names() {
                result.names.insert(name.to_string(), strain.id().to_string());
            }
            result
                .strains
                .insert(strain.id().to_string(), strain.clone());
        }
        result
    }

    /// Hash of the ordered canonical ids.
    ///
    /// Any change of membership or order yields a different value.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = xxhash_rust::xxh3::Xxh3::new();
        hasher.update(&(self.len() as u64).to_le_bytes());
        for id in self.strains.keys() {
            hasher.update(id.as_bytes());
            hasher.update(b"\t");
        }
        hasher.digest()
    }

    //----------------------------
    // Strain mappings
    //----------------------------
    /// Parses the strain mappings JSON layout
    /// `{"strain_mappings": [{"strain_id": .., "strain_alias": [..]}], "version": "1.0"}`.
    pub fn from_json(text: &str) -> Result<Self, LinkError> {
        let mappings: StrainMappings = serde_json::from_str(text)?;
        if mappings.version != MAPPINGS_VERSION {
            return Err(LinkError::invalid_value(format!(
                "unsupported strain mappings version {}",
                mappings.version
            )));
        }

        let mut sc = StrainCollection::new();
        for mapping in mappings.strain_mappings {
            let strain = Strain::with_aliases(
                &mapping.strain_id,
                mapping.strain_alias.iter().map(|s| s.as_str()),
            );
            sc.add(strain)?;
        }
        Ok(sc)
    }

    pub fn read_json(path: impl AsRef<Path>) -> Result<Self, LinkError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String, LinkError> {
        let mappings = StrainMappings {
            strain_mappings: self
                .iter()
                .map(|s| StrainMapping {
                    strain_id: s.id().to_string(),
                    strain_alias: s.aliases().map(|a| a.to_string()).collect(),
                })
                .collect(),
            version: MAPPINGS_VERSION.to_string(),
        };
        Ok(serde_json::to_string_pretty(&mappings)?)
    }
}

impl<'a> IntoIterator for &'a StrainCollection {
    type Item = &'a Strain;
    type IntoIter = indexmap::map::Values<'a, String, Strain>;

    fn into_iter(self) -> Self::IntoIter {
        self.strains.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection() -> StrainCollection {
        let mut sc = StrainCollection::new();
        sc.add(Strain::with_aliases("strain1", ["s1", "S1-a"]))
            .unwrap();
        sc.add(Strain::new("strain2")).unwrap();
        sc.add(Strain::with_aliases("strain3", ["s3"])).unwrap();
        sc
    }

    #[test]
    fn test_strain_identity() {
        let a = Strain::with_aliases("strain1", ["x"]);
        let b = Strain::new("strain1");
        assert_eq!(a, b);

        let set: HashSet<Strain> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_strain_empty_alias() {
        let mut strain = Strain::new("strain1");
        strain.add_alias("");
        strain.add_alias("strain1");
        assert_eq!(strain.aliases().count(), 0);
    }

    #[test]
    fn test_lookup_by_any_name() {
        let sc = collection();
        for name in ["strain1", "s1", "S1-a"] {
            assert_eq!(sc.lookup(name).unwrap().id(), "strain1");
        }
        assert!(matches!(sc.lookup("nope"), Err(LinkError::NotFound(_))));
        assert!(sc.has_name("s3"));
        assert!(!sc.has_name("s2"));
    }

    #[test]
    fn test_add_merges_aliases() {
        let mut sc = collection();
        sc.add(Strain::with_aliases("strain2", ["s2"])).unwrap();
        assert_eq!(sc.len(), 3);
        assert_eq!(sc.lookup("s2").unwrap().id(), "strain2");
        assert_eq!(sc.position("s2"), Some(1));
    }

    #[test]
    fn test_add_conflict() {
        let mut sc = collection();
        let err = sc.add(Strain::with_aliases("strain4", ["s3"]));
        assert!(matches!(err, Err(LinkError::InvalidValue(_))));
        // failed add leaves the collection untouched
        assert_eq!(sc.len(), 3);
        assert!(!sc.has_name("strain4"));
    }

    #[test]
    fn test_remove() {
        let mut sc = collection();
        sc.remove(&Strain::new("strain1")).unwrap();
        assert_eq!(sc.len(), 2);
        assert!(!sc.has_name("s1"));
        assert_eq!(sc.lookup_index(0).unwrap().id(), "strain2");
        assert!(matches!(
            sc.remove(&Strain::new("strain1")),
            Err(LinkError::NotFound(_))
        ));
    }

    #[test]
    fn test_lookup_index() {
        let sc = collection();
        assert_eq!(sc.lookup_index(2).unwrap().id(), "strain3");
        assert!(sc.lookup_index(3).is_err());
    }

    #[test]
    fn test_filter() {
        let mut sc = collection();
        let before = sc.fingerprint();
        let keep = [Strain::new("strain3"), Strain::new("strain1"), Strain::new("other")];
        sc.filter(&keep);

        assert_eq!(sc.ids().collect::<Vec<_>>(), vec!["strain1", "strain3"]);
        assert!(!sc.has_name("strain2"));
        assert_eq!(sc.lookup("s3").unwrap().id(), "strain3");
        assert_ne!(before, sc.fingerprint());
    }

    #[test]
    fn test_intersection() {
        let sc = collection();
        let mut other = StrainCollection::new();
        other.add(Strain::new("strain3")).unwrap();
        other.add(Strain::new("strain2")).unwrap();

        let common = sc.intersection(&other);
        assert_eq!(common.ids().collect::<Vec<_>>(), vec!["strain2", "strain3"]);
        assert_eq!(common.lookup("s3").unwrap().id(), "strain3");
    }

    #[test]
    fn test_json() {
        let text = r#"{
            "strain_mappings": [
                {"strain_id": "strain1", "strain_alias": ["s1", "s1-b"]},
                {"strain_id": "strain2", "strain_alias": []}
            ],
            "version": "1.0"
        }"#;
        let sc = StrainCollection::from_json(text).unwrap();
        assert_eq!(sc.len(), 2);
        assert_eq!(sc.lookup("s1-b").unwrap().id(), "strain1");

        let again = StrainCollection::from_json(&sc.to_json().unwrap()).unwrap();
        assert_eq!(again.fingerprint(), sc.fingerprint());

        let bad = r#"{"strain_mappings": [], "version": "2.0"}"#;
        assert!(StrainCollection::from_json(bad).is_err());
    }
}
