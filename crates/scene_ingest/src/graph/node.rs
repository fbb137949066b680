//! Scene nodes and the alias-probing read surface used by leaf decoders.
use std::collections::BTreeMap;
use std::fmt;

use glam::DVec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::graph::AttributeValue;

/// Type tag given to nodes referenced before any statement declared their type.
pub const UNKNOWN_NODE_TYPE: &str = "unknown";

/// Stable per-scene node identifier, assigned in creation order.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A scene node with an open-vocabulary type tag and schema-less attributes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) node_type: String,
    pub(crate) parent: Option<String>,
    pub(crate) attributes: BTreeMap<String, AttributeValue>,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: &str, node_type: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            node_type: node_type.to_owned(),
            parent: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Looks up an attribute by its exact path.
    pub fn attribute(&self, path: &str) -> Option<&AttributeValue> {
        self.attributes.get(path)
    }

    pub fn has_attribute(&self, path: &str) -> bool {
        self.attributes.contains_key(path)
    }

    /// Attributes in path order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Returns the first alias whose value converts with `f`.
    ///
    /// Aliases are tried in order; an alias that is present but does not
    /// convert falls through to the next one.
    pub fn read_with<T>(
        &self,
        aliases: &[&str],
        f: impl Fn(&AttributeValue) -> Option<T>,
    ) -> Option<T> {
        aliases
            .iter()
            .filter_map(|alias| self.attributes.get(*alias))
            .find_map(f)
    }

    pub fn read_float(&self, default: f64, aliases: &[&str]) -> f64 {
        self.read_with(aliases, AttributeValue::as_f64)
            .unwrap_or(default)
    }

    pub fn read_int(&self, default: i64, aliases: &[&str]) -> i64 {
        self.read_with(aliases, AttributeValue::as_i64)
            .unwrap_or(default)
    }

    pub fn read_bool(&self, default: bool, aliases: &[&str]) -> bool {
        self.read_with(aliases, AttributeValue::as_bool)
            .unwrap_or(default)
    }

    /// Reads a string; scalar numbers and booleans are rendered as text.
    pub fn read_string(&self, default: &str, aliases: &[&str]) -> String {
        self.read_with(aliases, |v| match v {
            AttributeValue::String(s) => Some(s.clone()),
            AttributeValue::Float(_) | AttributeValue::Int(_) | AttributeValue::Bool(_) => {
                Some(v.to_string())
            }
            _ => None,
        })
        .unwrap_or_else(|| default.to_owned())
    }

    pub fn read_vec3(&self, default: DVec3, aliases: &[&str]) -> DVec3 {
        self.read_with(aliases, AttributeValue::as_vec3)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_with(attrs: &[(&str, AttributeValue)]) -> Node {
        let mut node = Node::new(NodeId(0), "n", "transform");
        for (k, v) in attrs {
            node.attributes.insert((*k).to_owned(), v.clone());
        }
        node
    }

    #[test]
    fn read_float_falls_through_to_later_alias() {
        let node = node_with(&[("scale", AttributeValue::from("2.5"))]);
        assert_eq!(node.read_float(1.0, &[".scale", "scale"]), 2.5);
    }

    #[test]
    fn first_alias_wins_when_several_are_present() {
        let node = node_with(&[
            (".tx", AttributeValue::Float(1.0)),
            ("translateX", AttributeValue::Float(9.0)),
        ]);
        assert_eq!(node.read_float(0.0, &[".tx", "translateX"]), 1.0);
        assert_eq!(node.read_float(0.0, &["translateX", ".tx"]), 9.0);
    }

    #[test]
    fn missing_aliases_return_default() {
        let node = node_with(&[]);
        assert_eq!(node.read_int(7, &["a", "b"]), 7);
        assert!(node.read_bool(true, &["visibility"]));
        assert_eq!(node.read_string("none", &["name"]), "none");
        assert_eq!(node.read_vec3(DVec3::ONE, &["t"]), DVec3::ONE);
    }

    #[test]
    fn unconvertible_value_falls_through() {
        let node = node_with(&[
            ("op", AttributeValue::Opaque(vec![0, 1])),
            ("operation", AttributeValue::Int(3)),
        ]);
        assert_eq!(node.read_int(1, &["op", "operation"]), 3);
    }

    #[test]
    fn read_string_renders_scalars() {
        let node = node_with(&[("count", AttributeValue::Int(4))]);
        assert_eq!(node.read_string("", &["count"]), "4");
    }
}
