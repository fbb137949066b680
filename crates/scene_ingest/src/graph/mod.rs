//! Scene graph model shared by the ASCII and binary readers.
//!
//! Groups the tagged [`AttributeValue`], [`Node`] with its alias read surface,
//! and the [`SceneGraph`] store of nodes and [`Connection`]s.
pub mod node;
pub mod scene;
pub mod value;

pub use node::{Node, NodeId, UNKNOWN_NODE_TYPE};
pub use scene::{AttrRef, Connection, SceneGraph};
pub use value::AttributeValue;
