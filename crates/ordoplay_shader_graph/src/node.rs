// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph framework.

use crate::kinds::NodeKind;
use crate::port::Port;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// A node instance in the graph
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Name, unique within the owning graph
    pub name: String,
    /// What the node computes and how it emits code
    pub kind: NodeKind,
    /// Input ports, resolved from the kind at construction
    pub inputs: Vec<Port>,
    /// Output ports, resolved from the kind at construction
    pub outputs: Vec<Port>,
    /// Set when a parameter changed since the last compile
    pub dirty: bool,
    /// Node-level error from the last failed compile
    pub error: Option<String>,
}

impl Node {
    /// Create a node of the given kind
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        let (inputs, outputs) = kind.ports();
        Self {
            id: NodeId::new(),
            name: name.into(),
            kind,
            inputs,
            outputs,
            dirty: true,
            error: None,
        }
    }

    /// Get an input port by name
    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Get an output port by name
    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Get all ports
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Names of the input ports, in declaration order
    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|p| p.name.as_str())
    }

    /// Replace the kind and re-resolve ports.
    ///
    /// Returns `true` when the port layout changed, which is a structural edit.
    pub(crate) fn set_kind(&mut self, kind: NodeKind) -> bool {
        let (inputs, outputs) = kind.ports();
        let structural = inputs != self.inputs || outputs != self.outputs;
        self.kind = kind;
        self.inputs = inputs;
        self.outputs = outputs;
        self.dirty = true;
        structural
    }
}

/// Identity of a node for diagnostics: its id and slash-separated path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    /// Node id
    pub id: NodeId,
    /// Path such as `/material/subnet1/add1`
    pub path: String,
}

impl NodeRef {
    /// Reference `node` inside a scope whose path is `scope_path`
    pub fn new(scope_path: &str, node: &Node) -> Self {
        Self {
            id: node.id,
            path: format!("{}/{}", scope_path.trim_end_matches('/'), node.name),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}
