//! The graph document exchanged with the data-loading side.
//!
//! ```json
//! { "nodes": [{ "country": "Norway", "code": "no" }, ...],
//!   "links": [{ "source": 0, "target": 35 }, ...] }
//! ```
//!
//! Link endpoints are either an index into `nodes` or a node `id` string.

use std::collections::HashSet;
use std::io::Read;

use eframe::egui::vec2;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Graph, LinkSpec, NodeSpec};
use crate::error::ConstructionError;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GraphDocument {
    pub nodes: Vec<NodeRecord>,
    pub links: Vec<LinkRecord>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct NodeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LinkRecord {
    pub source: NodeRef,
    pub target: NodeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum NodeRef {
    Index(usize),
    Id(String),
}

impl NodeRef {
    fn describe(&self) -> String {
        match self {
            Self::Index(index) => index.to_string(),
            Self::Id(id) => id.clone(),
        }
    }
}

/// Ids for every record. A record without one is named after its index,
/// prefixed with `#` as often as needed to stay clear of every explicit id.
fn resolve_ids(nodes: &[NodeRecord]) -> Vec<String> {
    let explicit = nodes
        .iter()
        .filter_map(|record| record.id.as_deref())
        .collect::<HashSet<_>>();

    nodes
        .iter()
        .enumerate()
        .map(|(index, record)| match &record.id {
            Some(id) => id.clone(),
            None => {
                let mut id = index.to_string();
                while explicit.contains(id.as_str()) {
                    id.insert(0, '#');
                }
                id
            }
        })
        .collect()
}

impl GraphDocument {
    pub fn from_json(raw: &str) -> Result<Self, ConstructionError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, ConstructionError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Builds the node/link set. Fails without partial output on an empty
    /// node list, a duplicate id, a node with only one of `x`/`y`, or a link
    /// endpoint that resolves to no node.
    pub fn to_graph(&self) -> Result<Graph, ConstructionError> {
        if self.nodes.is_empty() {
            return Err(ConstructionError::EmptyGraph);
        }

        let ids = resolve_ids(&self.nodes);

        let mut specs = Vec::with_capacity(self.nodes.len());
        for (record, id) in self.nodes.iter().zip(&ids) {
            let position = match (record.x, record.y) {
                (Some(x), Some(y)) => Some(vec2(x, y)),
                (None, None) => None,
                _ => return Err(ConstructionError::PartialPosition(id.clone())),
            };
            specs.push(NodeSpec {
                id: id.clone(),
                position,
                payload: record.payload.clone(),
            });
        }

        let mut graph = Graph::new();
        graph.add_nodes(specs)?;

        let resolve = |link: &LinkRecord, endpoint: &NodeRef| match endpoint {
            NodeRef::Index(index) => {
                ids.get(*index)
                    .cloned()
                    .ok_or_else(|| ConstructionError::DanglingLink {
                        from: link.source.describe(),
                        to: link.target.describe(),
                        missing: endpoint.describe(),
                    })
            }
            NodeRef::Id(id) => Ok(id.clone()),
        };

        let mut specs = Vec::with_capacity(self.links.len());
        for link in &self.links {
            specs.push(LinkSpec {
                source: resolve(link, &link.source)?,
                target: resolve(link, &link.target)?,
                distance: link.distance,
                strength: link.strength,
            });
        }
        graph.add_links(specs)?;
        Ok(graph)
    }

    /// Writes each node's current position back into its `x`/`y` fields.
    /// `graph` must have been built from this document.
    pub fn record_positions(&mut self, graph: &Graph) {
        for (record, node) in self.nodes.iter_mut().zip(graph.nodes()) {
            let position = node.position();
            record.x = Some(position.x);
            record.y = Some(position.y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTRIES: &str = r#"{
        "nodes": [
            { "country": "Norway", "code": "no" },
            { "country": "Sweden", "code": "se" },
            { "country": "Finland", "code": "fi" }
        ],
        "links": [
            { "target": 1, "source": 0 },
            { "target": 2, "source": 1 }
        ]
    }"#;

    #[test]
    fn test_index_references() {
        let doc = GraphDocument::from_json(COUNTRIES).unwrap();
        let graph = doc.to_graph().unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.link_count(), 2);
        assert_eq!(graph.nodes()[1].id(), "1");
        assert_eq!(graph.nodes()[1].label(), Some("Sweden"));
        assert_eq!(
            graph.nodes()[2].payload().get("code").and_then(Value::as_str),
            Some("fi")
        );
        assert_eq!(graph.links()[1].source, 1);
        assert_eq!(graph.links()[1].target, 2);
    }

    #[test]
    fn test_id_references_and_positions() {
        let raw = r#"{
            "nodes": [
                { "id": "no", "x": 1.5, "y": -2.0 },
                { "id": "se" }
            ],
            "links": [{ "source": "no", "target": "se", "distance": 30.0 }]
        }"#;
        let graph = GraphDocument::from_json(raw).unwrap().to_graph().unwrap();
        assert_eq!(graph.node("no").unwrap().position(), vec2(1.5, -2.0));
        assert_eq!(graph.links()[0].distance, Some(30.0));
    }

    #[test]
    fn test_missing_links_key() {
        let err = GraphDocument::from_json(r#"{ "nodes": [] }"#).unwrap_err();
        assert!(matches!(err, ConstructionError::Document(_)));
    }

    #[test]
    fn test_missing_nodes_key() {
        let err = GraphDocument::from_json(r#"{ "links": [] }"#).unwrap_err();
        assert!(matches!(err, ConstructionError::Document(_)));
    }

    #[test]
    fn test_empty_node_set() {
        let doc = GraphDocument::from_json(r#"{ "nodes": [], "links": [] }"#).unwrap();
        assert!(matches!(doc.to_graph(), Err(ConstructionError::EmptyGraph)));
    }

    #[test]
    fn test_out_of_range_index() {
        let raw = r#"{ "nodes": [{}, {}], "links": [{ "source": 0, "target": 7 }] }"#;
        let err = GraphDocument::from_json(raw).unwrap().to_graph().unwrap_err();
        match err {
            ConstructionError::DanglingLink { missing, .. } => assert_eq!(missing, "7"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_id_reference() {
        let raw = r#"{ "nodes": [{ "id": "a" }], "links": [{ "source": "a", "target": "b" }] }"#;
        let err = GraphDocument::from_json(raw).unwrap().to_graph().unwrap_err();
        assert!(matches!(err, ConstructionError::DanglingLink { .. }));
    }

    #[test]
    fn test_implicit_ids_avoid_explicit_ones() {
        let raw = r##"{
            "nodes": [{ "id": "1" }, { "country": "Belgium" }, { "id": "#1" }],
            "links": [{ "source": 0, "target": 1 }, { "source": 1, "target": "#1" }]
        }"##;
        let graph = GraphDocument::from_json(raw).unwrap().to_graph().unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.nodes()[1].id(), "##1");
        assert_eq!(graph.nodes()[1].label(), Some("Belgium"));
        assert_eq!(graph.links()[0].source, 0);
        assert_eq!(graph.links()[0].target, 1);
        assert_eq!(graph.degree(1), 2);
    }

    #[test]
    fn test_half_specified_position_rejected() {
        let raw = r#"{ "nodes": [{ "id": "is", "x": 4.0 }], "links": [] }"#;
        let err = GraphDocument::from_json(raw).unwrap().to_graph().unwrap_err();
        match err {
            ConstructionError::PartialPosition(id) => assert_eq!(id, "is"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_record_positions_round_trips_payload() {
        let mut doc = GraphDocument::from_json(COUNTRIES).unwrap();
        let graph = doc.to_graph().unwrap();
        doc.record_positions(&graph);

        let written = serde_json::to_value(&doc).unwrap();
        let first = &written["nodes"][0];
        assert_eq!(first["country"], "Norway");
        assert!(first["x"].is_number());
        assert!(first["y"].is_number());
        assert!(first.get("id").is_none());
    }
}
