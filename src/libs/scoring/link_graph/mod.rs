use super::score::{Score, ScoringMethod};
use crate::libs::entity::Entity;
use crate::libs::error::LinkError;
use crate::libs::strain::Strain;
use indexmap::IndexMap;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::fmt;
use std::io::Write;
use std::path::Path;

/// Data attached to a link: one score per method and the strains both objects occur in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectLink {
    pub scores: IndexMap<ScoringMethod, Score>,
    pub shared_strains: Vec<Strain>,
}

impl ObjectLink {
    pub fn score(&self, method: ScoringMethod) -> Option<&Score> {
        self.scores.get(&method)
    }

    pub fn value(&self, method: ScoringMethod) -> Option<f64> {
        self.score(method).map(|s| s.value)
    }

    // same method overwrites, new shared strains replace old ones
    fn merge(&mut self, other: ObjectLink) {
        self.scores.extend(other.scores);
        if !other.shared_strains.is_empty() {
            self.shared_strains = other.shared_strains;
        }
    }
}

/// One line of the tabular view of a `LinkGraph`
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRow {
    pub index: usize,
    pub genomic_object_type: String,
    pub genomic_object_id: String,
    pub metabolomic_object_type: String,
    pub metabolomic_object_id: String,
    pub metcalf_score: String,
    pub hg_score: String,
    pub likescore_score: String,
    pub shared_strains: String,
}

impl LinkRow {
    pub const HEADER: [&'static str; 9] = [
        "index",
        "genomic_object_type",
        "genomic_object_id",
        "metabolomic_object_type",
        "metabolomic_object_id",
        "metcalf_score",
        "hg_score",
        "likescore_score",
        "shared_strains",
    ];

    pub fn fields(&self) -> [String; 9] {
        [
            self.index.to_string(),
            self.genomic_object_type.clone(),
            self.genomic_object_id.clone(),
            self.metabolomic_object_type.clone(),
            self.metabolomic_object_id.clone(),
            self.metcalf_score.clone(),
            self.hg_score.clone(),
            self.likescore_score.clone(),
            self.shared_strains.clone(),
        ]
    }
}

fn format_score(link: &ObjectLink, method: ScoringMethod) -> String {
    match (link.value(method), method) {
        (None, _) => "-".to_string(),
        (Some(v), ScoringMethod::Hypergeom) => format!("{:.4e}", v),
        (Some(v), ScoringMethod::Likelihood) => format!("{:.4}", v),
        (Some(v), ScoringMethod::Metcalf) => format!("{:.2}", v),
    }
}

/// Undirected bipartite graph of scored links.
///
/// Every edge joins a GCF with a spectrum or a molecular family. Nodes only exist
/// while they take part in at least one link.
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    graph: UnGraph<Entity, ObjectLink>,
    index: IndexMap<Entity, NodeIndex>,
}

// GCF first
fn orient<'a>(u: &'a Entity, v: &'a Entity) -> Result<(&'a Entity, &'a Entity), LinkError> {
    match (u.is_gcf(), v.is_gcf()) {
        (true, false) => Ok((u, v)),
        (false, true) => Ok((v, u)),
        _ => Err(LinkError::invalid_type(format!(
            "a link joins a GCF with a Spectrum or MolecularFamily, got {} and {}",
            u.kind(),
            v.kind()
        ))),
    }
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, node: &Entity) -> bool {
        self.index.contains_key(node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Entity> {
        self.index.keys()
    }

    fn node(&mut self, entity: &Entity) -> NodeIndex {
        if let Some(&idx) = self.index.get(entity) {
            return idx;
        }
        let idx = self.graph.add_node(entity.clone());
        self.index.insert(entity.clone(), idx);
        idx
    }

    /// Adds a link scored by one or more methods.
    ///
    /// Scores are merged into an existing link; a method scored again overwrites.
    ///
    /// # Errors
    /// `InvalidType` unless exactly one of `u`, `v` is a GCF. `InvalidValue` without scores.
    ///
    /// # Example
    /// ```
    /// use nplink::libs::entity::{Entity, Gcf, Spectrum};
    /// use nplink::libs::scoring::{LinkGraph, Score, ScoreParams, ScoringMethod};
    ///
    /// let gcf: Entity = Gcf::new("gcf1").into();
    /// let spec: Entity = Spectrum::new("spectrum1", 100.0).into();
    /// let score = Score::of(ScoringMethod::Metcalf, 12.0, ScoreParams::default());
    ///
    /// let mut lg = LinkGraph::new();
    /// lg.add_link(&gcf, &spec, [score]).unwrap();
    /// assert_eq!(lg.len(), 2);
    /// assert!(lg.has_link(&spec, &gcf));
    /// assert!(lg.add_link(&gcf, &gcf, [score]).is_err());
    /// ```
    pub fn add_link(
        &mut self,
        u: &Entity,
        v: &Entity,
        scores: impl IntoIterator<Item = Score>,
    ) -> Result<(), LinkError> {
        let scores: IndexMap<ScoringMethod, Score> =
            scores.into_iter().map(|s| (s.method, s)).collect();
        if scores.is_empty() {
            return Err(LinkError::invalid_value(format!(
                "no scoring data for the link {} - {}",
                u, v
            )));
        }
        self.add_object_link(
            u,
            v,
            ObjectLink {
                scores,
                shared_strains: vec![],
            },
        )
    }

    /// Adds or merges a complete link payload.
    pub fn add_object_link(&mut self, u: &Entity, v: &Entity, link: ObjectLink) -> Result<(), LinkError> {
        let (gcf, other) = orient(u, v)?;
        if link.scores.is_empty() {
            return Err(LinkError::invalid_value(format!(
                "no scoring data for the link {} - {}",
                gcf, other
            )));
        }

        let a = self.node(gcf);
        let b = self.node(other);
        match self.graph.find_edge(a, b) {
            Some(e) => self.graph[e].merge(link),
            None => {
                self.graph.add_edge(a, b, link);
            }
        }
        Ok(())
    }

    pub fn set_shared_strains(&mut self, u: &Entity, v: &Entity, strains: Vec<Strain>) -> Result<(), LinkError> {
        let e = self
            .edge(u, v)
            .ok_or_else(|| LinkError::not_found(format!("link {} - {}", u, v)))?;
        self.graph[e].shared_strains = strains;
        Ok(())
    }

    fn edge(&self, u: &Entity, v: &Entity) -> Option<EdgeIndex> {
        let a = *self.index.get(u)?;
        let b = *self.index.get(v)?;
        self.graph.find_edge(a, b)
    }

    pub fn has_link(&self, u: &Entity, v: &Entity) -> bool {
        self.edge(u, v).is_some()
    }

    pub fn get_link_data(&self, u: &Entity, v: &Entity) -> Option<&ObjectLink> {
        self.edge(u, v).map(|e| &self.graph[e])
    }

    /// All links of `u`, keyed by the linked object.
    pub fn neighbors(&self, u: &Entity) -> Result<IndexMap<Entity, &ObjectLink>, LinkError> {
        let &a = self
            .index
            .get(u)
            .ok_or_else(|| LinkError::not_found(format!("node {}", u)))?;

        let mut adjacent: Vec<(Entity, &ObjectLink)> = self
            .graph
            .edges(a)
            .map(|edge| {
                let other = if edge.source() == a {
                    edge.target()
                } else {
                    edge.source()
                };
                (self.graph[other].clone(), edge.weight())
            })
            .collect();
        // petgraph walks edges newest first
        adjacent.reverse();
        Ok(adjacent.into_iter().collect())
    }

    /// Every link as `(gcf, metabolomic object, data)`, in insertion order
    pub fn links(&self) -> Vec<(&Entity, &Entity, &ObjectLink)> {
        self.graph
            .edge_indices()
            .filter_map(|e| {
                let (a, b) = self.graph.edge_endpoints(e)?;
                Some((&self.graph[a], &self.graph[b], &self.graph[e]))
            })
            .collect()
    }

    /// Sub-graph restricted to the given nodes.
    ///
    /// With only one non-empty list, every link of those nodes is kept. With both,
    /// only links between a node of `u_nodes` and a node of `v_nodes` are kept.
    pub fn filter(&self, u_nodes: &[Entity], v_nodes: &[Entity]) -> LinkGraph {
        let (u_nodes, v_nodes) = if u_nodes.is_empty() {
            (v_nodes, u_nodes)
        } else {
            (u_nodes, v_nodes)
        };

        let mut lg = LinkGraph::new();
        if v_nodes.is_empty() {
            for u in u_nodes {
                if let Ok(neighbors) = self.neighbors(u) {
                    for (v, link) in neighbors {
                        // both endpoints come from this graph, so orientation is valid
                        let _ = lg.add_object_link(u, &v, link.clone());
                    }
                }
            }
        } else {
            for u in u_nodes {
                for v in v_nodes {
                    if let Some(link) = self.get_link_data(u, v) {
                        let _ = lg.add_object_link(u, v, link.clone());
                    }
                }
            }
        }
        lg
    }

    /// Adds every link of `other`, merging scores on shared links.
    pub fn merge(&mut self, other: &LinkGraph) -> Result<(), LinkError> {
        for (u, v, link) in other.links() {
            self.add_object_link(u, v, link.clone())?;
        }
        Ok(())
    }

    /// One row per link, numbered from 1, at most `limit` rows
    pub fn table_data(&self, limit: Option<usize>) -> Vec<LinkRow> {
        self.links()
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .enumerate()
            .map(|(i, (gcf, met, link))| LinkRow {
                index: i + 1,
                genomic_object_type: gcf.kind().to_string(),
                genomic_object_id: gcf.id().to_string(),
                metabolomic_object_type: met.kind().to_string(),
                metabolomic_object_id: met.id().to_string(),
                metcalf_score: format_score(link, ScoringMethod::Metcalf),
                hg_score: format_score(link, ScoringMethod::Hypergeom),
                likescore_score: format_score(link, ScoringMethod::Likelihood),
                shared_strains: link
                    .shared_strains
                    .iter()
                    .map(|s| s.id())
                    .collect::<Vec<_>>()
                    .join(","),
            })
            .collect()
    }

    /// Writes the table view as TSV with a header line
    pub fn write_tsv(&self, writer: &mut dyn Write) -> Result<(), LinkError> {
        writer.write_fmt(format_args!("{}\n", LinkRow::HEADER.join("\t")))?;
        for row in self.table_data(None) {
            writer.write_fmt(format_args!("{}\n", row.fields().join("\t")))?;
        }
        Ok(())
    }

    pub fn export_links(&self, path: impl AsRef<Path>) -> Result<(), LinkError> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write_tsv(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Display for LinkGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LinkGraph(#nodes={}, #links={})",
            self.len(),
            self.edge_count()
        )
    }
}
