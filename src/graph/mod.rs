//! Node and link bookkeeping for one simulation.
//!
//! Nodes live in a flat arena indexed by insertion order; links and the
//! spatial index refer to nodes by that index, never by reference.

pub mod document;

use std::collections::{HashMap, HashSet};

use eframe::egui::{Vec2, vec2};
use serde_json::{Map, Value};

use crate::error::ConstructionError;
use crate::layout::initial_position;

pub use document::{GraphDocument, LinkRecord, NodeRecord, NodeRef};

const LABEL_KEYS: [&str; 3] = ["label", "country", "name"];

/// Description of a node to add.
#[derive(Clone, Debug, Default)]
pub struct NodeSpec {
    pub id: String,
    pub position: Option<Vec2>,
    pub payload: Map<String, Value>,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = Some(vec2(x, y));
        self
    }

    pub fn with_payload(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}

/// Description of a link to add, endpoints named by node id.
#[derive(Clone, Debug)]
pub struct LinkSpec {
    pub source: String,
    pub target: String,
    pub distance: Option<f32>,
    pub strength: Option<f32>,
}

impl LinkSpec {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            distance: None,
            strength: None,
        }
    }

    pub fn with_distance(mut self, distance: f32) -> Self {
        self.distance = Some(distance);
        self
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = Some(strength);
        self
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    id: String,
    payload: Map<String, Value>,
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) fixed: Option<Vec2>,
}

impl Node {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Display label: the first of `label`, `country` or `name` that is a string.
    pub fn label(&self) -> Option<&str> {
        LABEL_KEYS
            .iter()
            .find_map(|key| self.payload.get(*key).and_then(Value::as_str))
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Pinned position, if the node is currently fixed.
    pub fn fixed(&self) -> Option<Vec2> {
        self.fixed
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Link {
    pub source: usize,
    pub target: usize,
    /// Ideal length; `None` uses the configured link distance.
    pub distance: Option<f32>,
    pub strength: f32,
}

#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    links: Vec<Link>,
    index_by_id: HashMap<String, usize>,
    degree: Vec<usize>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every node or none: a duplicate id, against the existing set or
    /// within the batch, rejects the whole batch.
    pub fn add_nodes(
        &mut self,
        nodes: impl IntoIterator<Item = NodeSpec>,
    ) -> Result<(), ConstructionError> {
        let nodes = nodes.into_iter().collect::<Vec<_>>();
        let mut batch_ids = HashSet::with_capacity(nodes.len());
        for spec in &nodes {
            if self.index_by_id.contains_key(&spec.id) || !batch_ids.insert(spec.id.as_str()) {
                return Err(ConstructionError::DuplicateNode(spec.id.clone()));
            }
        }

        self.nodes.reserve(nodes.len());
        for spec in nodes {
            let index = self.nodes.len();
            let position = spec
                .position
                .filter(|position| position.x.is_finite() && position.y.is_finite())
                .unwrap_or_else(|| initial_position(index));
            self.index_by_id.insert(spec.id.clone(), index);
            self.nodes.push(Node {
                id: spec.id,
                payload: spec.payload,
                position,
                velocity: Vec2::ZERO,
                fixed: None,
            });
            self.degree.push(0);
        }
        Ok(())
    }

    /// Adds every link or none: the first endpoint missing from the node set
    /// rejects the whole batch.
    pub fn add_links(
        &mut self,
        links: impl IntoIterator<Item = LinkSpec>,
    ) -> Result<(), ConstructionError> {
        let mut resolved = Vec::new();
        for spec in links {
            let lookup = |id: &str| {
                self.index_by_id
                    .get(id)
                    .copied()
                    .ok_or_else(|| ConstructionError::DanglingLink {
                        from: spec.source.clone(),
                        to: spec.target.clone(),
                        missing: id.to_owned(),
                    })
            };
            let source = lookup(&spec.source)?;
            let target = lookup(&spec.target)?;
            resolved.push(Link {
                source,
                target,
                distance: spec.distance,
                strength: spec.strength.unwrap_or(1.0),
            });
        }

        for link in &resolved {
            self.degree[link.source] += 1;
            self.degree[link.target] += 1;
        }
        self.links.extend(resolved);
        Ok(())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index_of(id).map(|index| &self.nodes[index])
    }

    pub(crate) fn degrees(&self) -> &[usize] {
        &self.degree
    }

    /// Number of link endpoints attached to the node at `index`.
    pub fn degree(&self, index: usize) -> usize {
        self.degree.get(index).copied().unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Graph {
        let mut graph = Graph::new();
        graph
            .add_nodes(["a", "b", "c"].map(NodeSpec::new))
            .unwrap();
        graph
            .add_links([LinkSpec::new("a", "b"), LinkSpec::new("b", "c")])
            .unwrap();
        graph
    }

    #[test]
    fn test_add_nodes_and_links() {
        let graph = triangle();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.link_count(), 2);
        assert_eq!(graph.index_of("c"), Some(2));
        assert_eq!(graph.links()[1].source, 1);
        assert_eq!(graph.links()[1].target, 2);
        assert_eq!(graph.links()[0].strength, 1.0);
        assert_eq!(graph.links()[0].distance, None);
    }

    #[test]
    fn test_degree_counts_both_endpoints() {
        let graph = triangle();
        assert_eq!(graph.degree(0), 1);
        assert_eq!(graph.degree(1), 2);
        assert_eq!(graph.degree(2), 1);
    }

    #[test]
    fn test_duplicate_against_existing_rejected() {
        let mut graph = triangle();
        let err = graph
            .add_nodes([NodeSpec::new("d"), NodeSpec::new("a")])
            .unwrap_err();
        assert!(matches!(err, ConstructionError::DuplicateNode(id) if id == "a"));
        assert_eq!(graph.node_count(), 3);
        assert!(graph.node("d").is_none());
    }

    #[test]
    fn test_duplicate_within_batch_rejected() {
        let mut graph = Graph::new();
        let err = graph
            .add_nodes([NodeSpec::new("x"), NodeSpec::new("x")])
            .unwrap_err();
        assert!(matches!(err, ConstructionError::DuplicateNode(_)));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_dangling_link_adds_nothing() {
        let mut graph = triangle();
        let err = graph
            .add_links([LinkSpec::new("a", "c"), LinkSpec::new("c", "zz")])
            .unwrap_err();
        match err {
            ConstructionError::DanglingLink { from, to, missing } => {
                assert_eq!(from, "c");
                assert_eq!(to, "zz");
                assert_eq!(missing, "zz");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(graph.link_count(), 2);
        assert_eq!(graph.degree(0), 1);
    }

    #[test]
    fn test_unpositioned_nodes_get_initial_layout() {
        let mut graph = Graph::new();
        graph
            .add_nodes([NodeSpec::new("a").at(3.0, 4.0), NodeSpec::new("b")])
            .unwrap();
        assert_eq!(graph.nodes()[0].position(), vec2(3.0, 4.0));
        assert_eq!(graph.nodes()[1].position(), initial_position(1));
        assert_eq!(graph.nodes()[1].velocity(), Vec2::ZERO);
        assert_eq!(graph.nodes()[1].fixed(), None);
    }

    #[test]
    fn test_label_lookup_order() {
        let mut graph = Graph::new();
        graph
            .add_nodes([
                NodeSpec::new("0")
                    .with_payload("country", "Norway")
                    .with_payload("code", "no"),
                NodeSpec::new("1")
                    .with_payload("name", "fallback")
                    .with_payload("label", "preferred"),
                NodeSpec::new("2").with_payload("code", "se"),
            ])
            .unwrap();
        assert_eq!(graph.nodes()[0].label(), Some("Norway"));
        assert_eq!(graph.nodes()[1].label(), Some("preferred"));
        assert_eq!(graph.nodes()[2].label(), None);
    }
}
