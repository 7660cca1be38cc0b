// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compile errors.
//!
//! Every error that can be pinned to a node carries a [`NodeRef`] so the
//! host can attach it to that node (see [`Graph::attach_error`]). Graph-shape
//! errors belong to the graph being compiled.
//!
//! [`Graph::attach_error`]: crate::Graph::attach_error

use crate::compiler::ShaderStage;
use crate::node::{NodeId, NodeRef};

/// Error raised while compiling a graph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// The graph has no output node for the backend
    #[error("{graph}: one output node is required")]
    MissingOutputNode {
        /// Graph name
        graph: String,
    },

    /// The graph has more than one output node for the backend
    #[error("{graph}: only one output node is allowed, found {count}")]
    MultipleOutputNodes {
        /// Graph name
        graph: String,
        /// Number of output nodes found
        count: usize,
    },

    /// A node needs a companion node that is absent (e.g. a subnet without
    /// its subnet output)
    #[error("{node}: a {companion} node is required")]
    MissingCompanionNode {
        /// The node missing its companion
        node: NodeRef,
        /// Kind of the missing companion
        companion: &'static str,
    },

    /// A required input has no connection
    #[error("{node}: input '{input}' requires a connection")]
    MissingInput {
        /// Node owning the input
        node: NodeRef,
        /// Input name
        input: String,
    },

    /// A function node references a function missing from the registry
    #[error("{node}: unknown function '{function}'")]
    UnknownFunction {
        /// Calling node
        node: NodeRef,
        /// Function name
        function: String,
    },

    /// A particle attribute was used without a texture allocation
    #[error("{node}: attribute '{attribute}' has no texture allocation")]
    UnallocatedAttribute {
        /// Reading or writing node
        node: NodeRef,
        /// Attribute name
        attribute: String,
    },

    /// An attribute type that cannot be stored in a simulation texture
    #[error("{node}: attribute '{attribute}' of type {ty} cannot be simulated")]
    UnsupportedAttributeType {
        /// Attribute node
        node: NodeRef,
        /// Attribute name
        attribute: String,
        /// GLSL type name
        ty: &'static str,
    },

    /// A node kind the backend cannot compile, or one placed where it is not allowed
    #[error("{node}: node is not supported by the {backend} backend")]
    UnsupportedNode {
        /// Offending node
        node: NodeRef,
        /// Backend name
        backend: &'static str,
    },

    /// The stage-relevant part of the graph contains a cycle through this node
    #[error("{node}: cyclic dependency")]
    CyclicDependency {
        /// A node on the cycle
        node: NodeRef,
    },

    /// A connection or root references a node that does not exist
    #[error("node {0:?} not found")]
    NodeNotFound(NodeId),

    /// A configuration value the backend cannot honor
    #[error("invalid {option}: {reason}")]
    InvalidConfig {
        /// Dotted path of the option
        option: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// Two values in one scope map to the same variable name
    #[error("{node}: variable '{variable}' is already used by {other}")]
    DuplicateVariable {
        /// Node whose variable clashes
        node: NodeRef,
        /// The variable name
        variable: String,
        /// Path of the node or port that already holds the name
        other: String,
    },

    /// A node declared a definition that an earlier node declared differently
    #[error("{node}: '{rejected}' conflicts with '{existing}'")]
    ConflictingDefinition {
        /// Node emitting the rejected definition
        node: NodeRef,
        /// Line already declared
        existing: String,
        /// Line that was dropped
        rejected: String,
    },

    /// A shader template lacks a splice marker
    #[error("{stage} template is missing the '{marker}' marker")]
    Template {
        /// Stage whose template is broken
        stage: ShaderStage,
        /// Missing marker text
        marker: &'static str,
    },
}

impl CompileError {
    /// The node this error originates from, if any
    pub fn node(&self) -> Option<&NodeRef> {
        match self {
            Self::MissingCompanionNode { node, .. }
            | Self::MissingInput { node, .. }
            | Self::UnknownFunction { node, .. }
            | Self::UnallocatedAttribute { node, .. }
            | Self::UnsupportedAttributeType { node, .. }
            | Self::UnsupportedNode { node, .. }
            | Self::DuplicateVariable { node, .. }
            | Self::ConflictingDefinition { node, .. }
            | Self::CyclicDependency { node } => Some(node),
            Self::MissingOutputNode { .. }
            | Self::InvalidConfig { .. }
            | Self::MultipleOutputNodes { .. }
            | Self::NodeNotFound(_)
            | Self::Template { .. } => None,
        }
    }
}
