//! The canonical scene store: nodes, attributes and connections.
//!
//! [`SceneGraph`] is populated once per parse by either reader and queried many
//! times afterwards. Lookups never fail on unknown keys; absence is `None`.
use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};
use crate::graph::node::UNKNOWN_NODE_TYPE;
use crate::graph::{AttributeValue, Node, NodeId};

/// A `node.attr` reference.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttrRef {
    pub node: String,
    pub attr: String,
}

impl AttrRef {
    pub fn new(node: impl Into<String>, attr: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            attr: attr.into(),
        }
    }

    /// Splits `node.attr` at the first dot. A missing dot yields an empty attribute.
    pub fn parse(path: &str) -> Self {
        match path.split_once('.') {
            Some((node, attr)) => Self::new(node, attr),
            None => Self::new(path, ""),
        }
    }
}

impl fmt::Display for AttrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.attr)
    }
}

/// A directed attribute connection.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    pub source: AttrRef,
    pub destination: AttrRef,
}

impl Connection {
    pub fn new(source: AttrRef, destination: AttrRef) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// Schema-less scene graph.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    by_name: HashMap<String, usize>,
    connections: Vec<Connection>,
    metadata: Vec<(String, String)>,
    revision: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Structural revision; bumped by node creation, retyping, reparenting and connection changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Creates the node or refines its type. An empty `node_type` leaves the type untouched.
    pub fn add_or_update_node(&mut self, name: &str, node_type: &str) -> NodeId {
        if let Some(&idx) = self.by_name.get(name) {
            let node = &mut self.nodes[idx];
            if !node_type.is_empty() && node.node_type != node_type {
                trace!(
                    "Refining type of '{}' from '{}' to '{}'.",
                    name,
                    node.node_type,
                    node_type
                );
                node.node_type = node_type.to_owned();
                self.revision += 1;
            }
            return node.id;
        }

        let id = NodeId(self.nodes.len() as u32);
        let ty = if node_type.is_empty() {
            UNKNOWN_NODE_TYPE
        } else {
            node_type
        };
        self.nodes.push(Node::new(id, name, ty));
        self.by_name.insert(name.to_owned(), id.0 as usize);
        self.revision += 1;
        id
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.by_name.get(name).map(|&idx| &self.nodes[idx])
    }

    pub fn node_by_id(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    /// Nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn set_parent(&mut self, child: &str, parent: Option<&str>) -> Result<()> {
        let idx = self.index_of(child)?;
        self.nodes[idx].parent = parent.map(str::to_owned);
        self.revision += 1;
        Ok(())
    }

    /// Last write wins; returns the replaced value, if any.
    pub fn set_attribute(
        &mut self,
        node: &str,
        path: &str,
        value: AttributeValue,
    ) -> Result<Option<AttributeValue>> {
        let idx = self.index_of(node)?;
        Ok(self.nodes[idx].attributes.insert(path.to_owned(), value))
    }

    pub fn attribute(&self, node: &str, path: &str) -> Option<&AttributeValue> {
        self.node(node).and_then(|n| n.attribute(path))
    }

    /// Appends a connection. Duplicates and dangling endpoints are kept as records.
    pub fn add_connection(&mut self, source: AttrRef, destination: AttrRef) {
        self.connections.push(Connection::new(source, destination));
        self.revision += 1;
    }

    /// [`SceneGraph::add_connection`] over `node.attr` strings.
    pub fn connect(&mut self, source: &str, destination: &str) {
        self.add_connection(AttrRef::parse(source), AttrRef::parse(destination));
    }

    /// All connections in recording order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Connections into `node` whose destination attribute is one of `aliases`, in recording order.
    pub fn incoming_to<'a>(
        &'a self,
        node: &'a str,
        aliases: &'a [&'a str],
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| {
            c.destination.node == node && aliases.iter().any(|a| c.destination.attr == *a)
        })
    }

    /// Source `node.attr` of the most recently recorded connection into any alias.
    pub fn find_last_incoming_to(&self, node: &str, aliases: &[&str]) -> Option<String> {
        self.incoming_to(node, aliases)
            .last()
            .map(|c| c.source.to_string())
    }

    /// Records a file-level key/value pair (plugin requirements, file info, units).
    pub fn push_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.push((key.into(), value.into()));
    }

    /// Last recorded value for a metadata key.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn metadata_entries(&self) -> &[(String, String)] {
        &self.metadata
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownNode {
                name: name.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_or_update_is_idempotent_and_refines_type() {
        let mut scene = SceneGraph::new();
        let a = scene.add_or_update_node("time1", "");
        assert_eq!(scene.node("time1").unwrap().node_type(), UNKNOWN_NODE_TYPE);

        let b = scene.add_or_update_node("time1", "time");
        assert_eq!(a, b);
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.node("time1").unwrap().node_type(), "time");

        scene.add_or_update_node("time1", "");
        assert_eq!(scene.node("time1").unwrap().node_type(), "time");
    }

    #[test]
    fn node_ids_are_unique_and_ordered() {
        let mut scene = SceneGraph::new();
        let ids: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|n| scene.add_or_update_node(n, "transform"))
            .collect();
        assert_eq!(ids, vec![NodeId(0), NodeId(1), NodeId(2)]);
        assert_eq!(scene.node_by_id(NodeId(1)).unwrap().name(), "b");
    }

    #[test]
    fn set_attribute_is_last_write_wins() {
        let mut scene = SceneGraph::new();
        scene.add_or_update_node("a", "transform");
        assert_eq!(
            scene.set_attribute("a", ".tx", AttributeValue::Float(1.0)).unwrap(),
            None
        );
        let prev = scene.set_attribute("a", ".tx", AttributeValue::Float(2.0)).unwrap();
        assert_eq!(prev, Some(AttributeValue::Float(1.0)));
        assert_eq!(scene.attribute("a", ".tx"), Some(&AttributeValue::Float(2.0)));
    }

    #[test]
    fn set_attribute_on_unknown_node_errors() {
        let mut scene = SceneGraph::new();
        let err = scene
            .set_attribute("ghost", "x", AttributeValue::Float(1.0))
            .expect_err("unknown node");
        assert!(matches!(err, Error::UnknownNode { ref name } if name == "ghost"));
    }

    #[test]
    fn lookups_on_unknown_keys_are_none() {
        let scene = SceneGraph::new();
        assert!(scene.node("nope").is_none());
        assert!(scene.attribute("nope", "x").is_none());
        assert!(scene.find_last_incoming_to("nope", &["x"]).is_none());
    }

    #[test]
    fn connections_are_appended_without_dedup() {
        let mut scene = SceneGraph::new();
        scene.connect("a.out", "b.in");
        scene.connect("a.out", "b.in");
        assert_eq!(scene.connections().len(), 2);
    }

    #[test]
    fn last_incoming_follows_recording_order() {
        let mut scene = SceneGraph::new();
        scene.connect("x.out", "dst.in");
        scene.connect("y.out", "dst.in");
        scene.connect("other.out", "dst.unrelated");
        scene.connect("z.out", "dst.in");

        assert_eq!(
            scene.find_last_incoming_to("dst", &["in"]).as_deref(),
            Some("z.out")
        );
        assert_eq!(scene.incoming_to("dst", &["in"]).count(), 3);
    }

    #[test]
    fn last_incoming_matches_any_alias() {
        let mut scene = SceneGraph::new();
        scene.connect("x.outColor", "mat.color");
        scene.connect("y.outColor", "mat.c");
        assert_eq!(
            scene.find_last_incoming_to("mat", &["color", "c"]).as_deref(),
            Some("y.outColor")
        );
        assert_eq!(
            scene.find_last_incoming_to("mat", &["color"]).as_deref(),
            Some("x.outColor")
        );
    }

    #[test]
    fn attr_ref_splits_at_first_dot() {
        let r = AttrRef::parse("pma.input3D[0].input3Dx");
        assert_eq!(r.node, "pma");
        assert_eq!(r.attr, "input3D[0].input3Dx");
        assert_eq!(AttrRef::parse("lonely").attr, "");
    }

    #[test]
    fn revision_tracks_structural_changes_only() {
        let mut scene = SceneGraph::new();
        scene.add_or_update_node("a", "transform");
        let r = scene.revision();
        scene.set_attribute("a", "tx", AttributeValue::Float(1.0)).unwrap();
        assert_eq!(scene.revision(), r);
        scene.add_or_update_node("a", "transform");
        scene.add_or_update_node("a", "");
        assert_eq!(scene.revision(), r);
        scene.add_or_update_node("a", "joint");
        assert_eq!(scene.revision(), r + 1);
        scene.connect("a.tx", "a.ty");
        assert!(scene.revision() > r + 1);
    }

    #[test]
    fn metadata_returns_last_value() {
        let mut scene = SceneGraph::new();
        scene.push_metadata("units.linear", "cm");
        scene.push_metadata("units.linear", "m");
        assert_eq!(scene.metadata("units.linear"), Some("m"));
        assert_eq!(scene.metadata_entries().len(), 2);
    }
}
