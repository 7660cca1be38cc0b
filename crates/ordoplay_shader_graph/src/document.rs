// SPDX-License-Identifier: MIT OR Apache-2.0
//! On-disk graph format.
//!
//! Nodes are stored by name with their kind, connections as `"node.port"`
//! endpoint pairs. Ids are runtime-only: loading assigns fresh ones and
//! re-validates every connection with [`Graph::connect`].
//!
//! ```ron
//! (
//!     name: "glow",
//!     nodes: [
//!         (name: "tint", kind: Constant(Vector3((1.0, 0.5, 0.0)))),
//!         (name: "output", kind: Output(Material)),
//!     ],
//!     connections: [
//!         (from: "tint.value", to: "output.color"),
//!     ],
//! )
//! ```

use crate::graph::{ConnectionError, Graph};
use crate::kinds::NodeKind;
use serde::{Deserialize, Serialize};

/// Serialized node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    /// Node name
    pub name: String,
    /// Node kind with its parameters
    pub kind: NodeKind,
}

/// Serialized connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDocument {
    /// `"node.output"`
    pub from: String,
    /// `"node.input"`
    pub to: String,
}

/// Serialized graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Graph name
    pub name: String,
    /// Nodes in insertion order
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,
    /// Connections in insertion order
    #[serde(default)]
    pub connections: Vec<ConnectionDocument>,
}

/// Error loading a graph document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The text is not a valid document
    #[error("Invalid graph document: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Serialization failed
    #[error("Failed to write graph document: {0}")]
    Write(#[from] ron::Error),

    /// Two nodes share a name
    #[error("Duplicate node name: {0}")]
    DuplicateNode(String),

    /// A node name is not a valid identifier
    #[error("Invalid node name: {0}")]
    InvalidNodeName(String),

    /// A connection endpoint is not `node.port`
    #[error("Invalid connection endpoint '{0}', expected 'node.port'")]
    InvalidEndpoint(String),

    /// A connection was rejected
    #[error("Connection {from} -> {to}: {source}")]
    Connection {
        /// Source endpoint
        from: String,
        /// Target endpoint
        to: String,
        /// Why it was rejected
        source: ConnectionError,
    },
}

impl GraphDocument {
    /// Parse RON text
    pub fn from_ron_str(text: &str) -> Result<Self, DocumentError> {
        Ok(ron::from_str(text)?)
    }

    /// Pretty RON text
    pub fn to_ron_string(&self) -> Result<String, DocumentError> {
        let config = ron::ser::PrettyConfig::default().enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Parse RON text straight into a validated graph
    pub fn load_graph(text: &str) -> Result<Graph, DocumentError> {
        Graph::try_from(Self::from_ron_str(text)?)
    }
}

fn split_endpoint(endpoint: &str) -> Result<(&str, &str), DocumentError> {
    endpoint
        .rsplit_once('.')
        .filter(|(node, port)| !node.is_empty() && !port.is_empty())
        .ok_or_else(|| DocumentError::InvalidEndpoint(endpoint.to_string()))
}

impl From<Graph> for GraphDocument {
    fn from(graph: Graph) -> Self {
        let nodes = graph
            .nodes()
            .map(|n| NodeDocument {
                name: n.name.clone(),
                kind: n.kind.clone(),
            })
            .collect();
        let connections = graph
            .connections()
            .filter_map(|c| {
                let from = graph.node(c.from_node)?;
                let to = graph.node(c.to_node)?;
                Some(ConnectionDocument {
                    from: format!("{}.{}", from.name, c.from_output),
                    to: format!("{}.{}", to.name, c.to_input),
                })
            })
            .collect();
        Self {
            name: graph.name,
            nodes,
            connections,
        }
    }
}

impl TryFrom<GraphDocument> for Graph {
    type Error = DocumentError;

    fn try_from(document: GraphDocument) -> Result<Self, Self::Error> {
        let mut graph = Graph::new(document.name);
        for node in document.nodes {
            if graph.node_by_name(&node.name).is_some() {
                return Err(DocumentError::DuplicateNode(node.name));
            }
            let id = graph.add(&node.name, node.kind);
            // Names must survive the round trip unchanged
            if graph.node(id).is_some_and(|n| n.name != node.name) {
                return Err(DocumentError::InvalidNodeName(node.name));
            }
        }
        for connection in document.connections {
            let (from_node, from_port) = split_endpoint(&connection.from)?;
            let (to_node, to_port) = split_endpoint(&connection.to)?;
            graph
                .connect_names(from_node, from_port, to_node, to_port)
                .map_err(|source| DocumentError::Connection {
                    from: connection.from.clone(),
                    to: connection.to.clone(),
                    source,
                })?;
        }
        // Loading is not an edit
        graph.take_dirty();
        Ok(graph)
    }
}
