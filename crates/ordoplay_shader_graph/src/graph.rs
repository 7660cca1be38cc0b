// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.

use crate::connection::{Connection, ConnectionId};
use crate::error::CompileError;
use crate::kinds::NodeKind;
use crate::document::GraphDocument;
use crate::node::{Node, NodeId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A node graph
///
/// Node and connection storage is insertion ordered, so every traversal
/// over a graph is reproducible. Serializes through [`GraphDocument`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "GraphDocument", try_from = "GraphDocument")]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Node>,
    /// Connections between nodes
    connections: IndexMap<ConnectionId, Connection>,
    /// Bumped by every structural edit
    version: u64,
    /// Graph-level error from the last failed compile
    pub error: Option<String>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
            version: 0,
            error: None,
        }
    }

    /// Add a node to the graph.
    ///
    /// A name already used in this graph gets a numeric suffix so names stay
    /// unique within the scope. A node whose id is already present is refused.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, ConnectionError> {
        if self.nodes.contains_key(&node.id) {
            return Err(ConnectionError::DuplicateNode(node.id));
        }
        Ok(self.insert_node(node))
    }

    /// Add a fresh node built from `name` and `kind`
    pub fn add(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        self.insert_node(Node::new(name, kind))
    }

    fn insert_node(&mut self, mut node: Node) -> NodeId {
        node.name = self.unique_name(&node.name);
        let id = node.id;
        self.nodes.insert(id, node);
        self.version += 1;
        id
    }

    fn unique_name(&self, requested: &str) -> String {
        let base = sanitize_name(requested);
        if self.node_by_name(&base).is_none() {
            return base;
        }
        let stem = base.trim_end_matches(|c: char| c.is_ascii_digit());
        let stem = if stem.is_empty() { base.as_str() } else { stem };
        (1..)
            .map(|n| format!("{stem}{n}"))
            .find(|candidate| self.node_by_name(candidate).is_none())
            .unwrap_or(base)
    }

    /// Remove a node and its connections
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        // Remove connections involving this node
        self.connections.retain(|_, c| !c.involves_node(node_id));
        let removed = self.nodes.shift_remove(&node_id);
        if removed.is_some() {
            self.version += 1;
        }
        removed
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a node by name
    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.name == name)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Change a node's parameters.
    ///
    /// Marks the node dirty. When the new kind changes the port layout the
    /// edit is structural: connections to vanished ports are dropped.
    pub fn edit_node(
        &mut self,
        node_id: NodeId,
        edit: impl FnOnce(&mut NodeKind),
    ) -> Result<(), ConnectionError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(ConnectionError::NodeNotFound(node_id))?;
        let mut kind = node.kind.clone();
        edit(&mut kind);
        if node.set_kind(kind) {
            self.version += 1;
            let nodes = &self.nodes;
            self.connections.retain(|_, c| {
                let from_ok = nodes
                    .get(&c.from_node)
                    .is_some_and(|n| n.output(&c.from_output).is_some());
                let to_ok = nodes
                    .get(&c.to_node)
                    .is_some_and(|n| n.input(&c.to_input).is_some());
                from_ok && to_ok
            });
        }
        Ok(())
    }

    /// Mutable access to the network of a subnet node.
    ///
    /// Counts as a structural edit of this graph.
    pub fn subnet_mut(&mut self, node_id: NodeId) -> Option<&mut Graph> {
        match &mut self.nodes.get_mut(&node_id)?.kind {
            NodeKind::Subnet(subnet) => {
                self.version += 1;
                Some(&mut subnet.network)
            }
            _ => None,
        }
    }

    /// Add a connection between ports
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_output: &str,
        to_node: NodeId,
        to_input: &str,
    ) -> Result<ConnectionId, ConnectionError> {
        // Validate nodes exist
        let source_node = self.nodes.get(&from_node)
            .ok_or(ConnectionError::NodeNotFound(from_node))?;
        let target_node = self.nodes.get(&to_node)
            .ok_or(ConnectionError::NodeNotFound(to_node))?;

        // Validate ports exist
        let source_port = source_node.output(from_output)
            .ok_or_else(|| ConnectionError::PortNotFound(format!("{}.{from_output}", source_node.name)))?;
        let target_port = target_node.input(to_input)
            .ok_or_else(|| ConnectionError::PortNotFound(format!("{}.{to_input}", target_node.name)))?;

        // Validate connection is valid
        if !source_port.can_connect(target_port) {
            return Err(ConnectionError::IncompatiblePorts {
                from: source_port.port_type.glsl_name(),
                to: target_port.port_type.glsl_name(),
            });
        }

        // An input takes at most one connection
        if self.input_source(to_node, to_input).is_some() {
            return Err(ConnectionError::PortAlreadyConnected(format!(
                "{}.{to_input}",
                target_node.name
            )));
        }

        // Prevent self-loops
        if from_node == to_node {
            return Err(ConnectionError::SelfLoop);
        }

        if self.depends_on(from_node, to_node) {
            return Err(ConnectionError::Cycle);
        }

        let connection = Connection::new(from_node, from_output, to_node, to_input);
        let id = connection.id;
        self.connections.insert(id, connection);
        self.version += 1;
        Ok(id)
    }

    /// Connect by node names, e.g. `connect_names("const1", "value", "output1", "color")`
    pub fn connect_names(
        &mut self,
        from_node: &str,
        from_output: &str,
        to_node: &str,
        to_input: &str,
    ) -> Result<ConnectionId, ConnectionError> {
        let from = self.node_by_name(from_node)
            .ok_or_else(|| ConnectionError::NodeNameNotFound(from_node.to_string()))?
            .id;
        let to = self.node_by_name(to_node)
            .ok_or_else(|| ConnectionError::NodeNameNotFound(to_node.to_string()))?
            .id;
        self.connect(from, from_output, to, to_input)
    }

    /// Whether `node` (transitively) reads from `ancestor`
    fn depends_on(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut stack = vec![node];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == ancestor {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            stack.extend(
                self.connections
                    .values()
                    .filter(|c| c.to_node == current)
                    .map(|c| c.from_node),
            );
        }
        false
    }

    /// Insert a connection without validation.
    ///
    /// Used by programmatic builders that bypass the editor's checks; the
    /// compiler still detects cycles introduced this way.
    pub fn insert_connection_unchecked(&mut self, connection: Connection) -> ConnectionId {
        let id = connection.id;
        self.connections.insert(id, connection);
        self.version += 1;
        id
    }

    /// Remove a connection
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        let removed = self.connections.shift_remove(&connection_id);
        if removed.is_some() {
            self.version += 1;
        }
        removed
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// The connection feeding `input` of `node_id`, if any
    pub fn input_source(&self, node_id: NodeId, input: &str) -> Option<&Connection> {
        self.connections.values().find(|c| c.targets(node_id, input))
    }

    /// Get connections leaving a node
    pub fn connections_from(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.from_node == node_id)
    }

    /// Names of a node's outputs that feed at least one input, in port order
    pub fn connected_outputs(&self, node_id: NodeId) -> Vec<&str> {
        let Some(node) = self.nodes.get(&node_id) else {
            return Vec::new();
        };
        node.outputs
            .iter()
            .filter(|port| self.connections_from(node_id).any(|c| c.from_output == port.name))
            .map(|port| port.name.as_str())
            .collect()
    }

    /// Whether a given output of a node feeds anything
    pub fn is_output_connected(&self, node_id: NodeId, output: &str) -> bool {
        self.connections_from(node_id).any(|c| c.from_output == output)
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Structural version of this graph and every nested network.
    ///
    /// Only ever grows: adding, removing or connecting nodes bumps it, and so
    /// does reaching into a nested network through [`Graph::subnet_mut`].
    /// Parameter edits that keep the port layout do not count.
    pub fn structure_version(&self) -> u64 {
        self.version
    }

    /// Whether any node (including nested ones) changed since the last `take_dirty`
    pub fn is_dirty(&self) -> bool {
        self.nodes.values().any(|n| {
            n.dirty
                || matches!(&n.kind, NodeKind::Subnet(subnet) if subnet.network.is_dirty())
        })
    }

    /// Clear dirty flags and return the ids of nodes that were dirty
    pub fn take_dirty(&mut self) -> Vec<NodeId> {
        let mut dirty = Vec::new();
        for node in self.nodes.values_mut() {
            if std::mem::take(&mut node.dirty) {
                dirty.push(node.id);
            }
            if let NodeKind::Subnet(subnet) = &mut node.kind {
                dirty.extend(subnet.network.take_dirty());
            }
        }
        dirty
    }

    /// Find a node here or in any nested network
    pub fn find_node_deep(&self, node_id: NodeId) -> Option<&Node> {
        self.node(node_id).or_else(|| {
            self.nodes.values().find_map(|n| match &n.kind {
                NodeKind::Subnet(subnet) => subnet.network.find_node_deep(node_id),
                _ => None,
            })
        })
    }

    fn find_node_deep_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        if self.nodes.contains_key(&node_id) {
            return self.nodes.get_mut(&node_id);
        }
        self.nodes.values_mut().find_map(|n| match &mut n.kind {
            NodeKind::Subnet(subnet) => subnet.network.find_node_deep_mut(node_id),
            _ => None,
        })
    }

    /// Attach a compile error to the node it originated from.
    ///
    /// Errors without an originating node (graph-shape errors) land on the
    /// graph itself.
    pub fn attach_error(&mut self, error: &CompileError) {
        let message = error.to_string();
        match error.node().and_then(|r| self.find_node_deep_mut(r.id)) {
            Some(node) => node.error = Some(message),
            None => self.error = Some(message),
        }
    }

    /// Clear every node-level and graph-level error
    pub fn clear_errors(&mut self) {
        self.error = None;
        for node in self.nodes.values_mut() {
            node.error = None;
            if let NodeKind::Subnet(subnet) = &mut node.kind {
                subnet.network.clear_errors();
            }
        }
    }
}

// Compares content by name: ids are runtime-only and edit history is ignored
impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        fn endpoints(graph: &Graph) -> Vec<(Option<&str>, &str, Option<&str>, &str)> {
            graph
                .connections()
                .map(|c| {
                    (
                        graph.node(c.from_node).map(|n| n.name.as_str()),
                        c.from_output.as_str(),
                        graph.node(c.to_node).map(|n| n.name.as_str()),
                        c.to_input.as_str(),
                    )
                })
                .collect()
        }

        self.name == other.name
            && self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .values()
                .zip(other.nodes.values())
                .all(|(a, b)| a.name == b.name && a.kind == b.kind)
            && endpoints(self) == endpoints(other)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Reduce a requested node name to a valid GLSL identifier fragment
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "node".to_string()
    } else {
        cleaned
    }
}

/// Error when creating a connection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Node not found by name
    #[error("Node not found: {0}")]
    NodeNameNotFound(String),

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Incompatible port types
    #[error("Incompatible port types: {from} -> {to}")]
    IncompatiblePorts {
        /// Source type
        from: &'static str,
        /// Target type
        to: &'static str,
    },

    /// Port is already connected
    #[error("Port already connected: {0}")]
    PortAlreadyConnected(String),

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// Connection would close a cycle
    #[error("Connection would create a cycle")]
    Cycle,

    /// A node with this id is already in the graph
    #[error("Node already present: {0:?}")]
    DuplicateNode(NodeId),
}
