// SPDX-License-Identifier: MIT OR Apache-2.0
//! Stage-aware dependency traversal.
//!
//! Walks predecessor edges from a root set, following only the inputs the
//! [`InputFilter`] names for the stage being built. The result is a
//! post-order: every node comes after all of its stage-relevant
//! predecessors, which is exactly the order nodes must emit in.

use crate::error::CompileError;
use crate::graph::Graph;
use crate::kinds::NodeKind;
use crate::node::{Node, NodeId, NodeRef};
use std::collections::HashSet;

/// Which inputs of a node matter for the stage being traversed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputFilter {
    /// Every input
    All,
    /// Only the named inputs
    Only(Vec<String>),
}

impl InputFilter {
    /// Filter naming exactly `names`
    pub fn only<'n>(names: impl IntoIterator<Item = &'n str>) -> Self {
        Self::Only(names.into_iter().map(str::to_string).collect())
    }

    /// Filter that excludes every input
    pub fn none() -> Self {
        Self::Only(Vec::new())
    }

    /// Whether `input` is followed
    pub fn allows(&self, input: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.iter().any(|n| n == input),
        }
    }

    /// Whether no input at all is followed
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Only(names) if names.is_empty())
    }
}

/// How subnets are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalMode {
    /// Subnets are opaque nodes
    Shallow,
    /// Subnets are entered through their output child, and their input
    /// child continues to the subnet's own inputs in the parent network
    Deep,
}

/// Result of a traversal
#[derive(Debug, Clone, Default)]
pub struct Traversal<'a> {
    /// Nodes without a followed, connected predecessor, in discovery order
    pub leaves: Vec<&'a Node>,
    /// Every reached node, predecessors first
    pub ordered: Vec<&'a Node>,
    /// Path of the network holding each node of `ordered`
    pub scopes: Vec<String>,
}

/// A subnet being walked in deep mode, with where it sits in its parent
#[derive(Clone)]
struct Frame<'a> {
    graph: &'a Graph,
    subnet: &'a Node,
    path: String,
}

#[derive(Default)]
struct State<'a> {
    visited: HashSet<NodeId>,
    temp_mark: HashSet<NodeId>,
    traversal: Traversal<'a>,
}

/// Computes stage-relevant leaves and dependency order from a root set
pub struct GraphTraverser<'a> {
    graph: &'a Graph,
    scope_path: String,
    mode: TraversalMode,
    filter: &'a dyn Fn(&Node) -> InputFilter,
}

impl<'a> GraphTraverser<'a> {
    /// Traverser over `graph`, whose nodes are reported under `scope_path`
    pub fn new(
        graph: &'a Graph,
        scope_path: &str,
        mode: TraversalMode,
        filter: &'a dyn Fn(&Node) -> InputFilter,
    ) -> Self {
        Self {
            graph,
            scope_path: scope_path.to_string(),
            mode,
            filter,
        }
    }

    /// Leaves and dependency order for `roots`
    pub fn traverse(&self, roots: &[NodeId]) -> Result<Traversal<'a>, CompileError> {
        let mut state = State::default();
        for root in roots {
            let node = self
                .graph
                .node(*root)
                .ok_or(CompileError::NodeNotFound(*root))?;
            self.visit(self.graph, &self.scope_path, node, &[], &mut state)?;
        }
        Ok(state.traversal)
    }

    /// Leaf nodes reachable from `roots`
    pub fn leaves_from_nodes(&self, roots: &[NodeId]) -> Result<Vec<&'a Node>, CompileError> {
        Ok(self.traverse(roots)?.leaves)
    }

    /// Nodes reachable from `roots`, predecessors first
    pub fn sorted_nodes(&self, roots: &[NodeId]) -> Result<Vec<&'a Node>, CompileError> {
        Ok(self.traverse(roots)?.ordered)
    }

    /// Ids of every node reachable from `roots`
    pub fn reachable_nodes(&self, roots: &[NodeId]) -> Result<HashSet<NodeId>, CompileError> {
        Ok(self.traverse(roots)?.ordered.iter().map(|n| n.id).collect())
    }

    /// Like [`Self::sorted_nodes`], each node paired with the path of its network
    pub fn scoped_nodes(&self, roots: &[NodeId]) -> Result<Vec<(String, &'a Node)>, CompileError> {
        let traversal = self.traverse(roots)?;
        Ok(traversal.scopes.into_iter().zip(traversal.ordered).collect())
    }

    fn visit(
        &self,
        graph: &'a Graph,
        path: &str,
        node: &'a Node,
        frames: &[Frame<'a>],
        state: &mut State<'a>,
    ) -> Result<(), CompileError> {
        if state.temp_mark.contains(&node.id) {
            return Err(CompileError::CyclicDependency {
                node: NodeRef::new(path, node),
            });
        }
        if state.visited.contains(&node.id) {
            return Ok(());
        }

        state.temp_mark.insert(node.id);
        let filter = (self.filter)(node);
        let mut has_predecessor = false;

        match (&node.kind, self.mode, frames.split_last()) {
            (NodeKind::Subnet(subnet), TraversalMode::Deep, _) => {
                if let Some(output) = subnet.output_node() {
                    let mut nested = frames.to_vec();
                    nested.push(Frame {
                        graph,
                        subnet: node,
                        path: path.to_string(),
                    });
                    let inner_path = format!("{}/{}", path.trim_end_matches('/'), node.name);
                    self.visit(&subnet.network, &inner_path, output, &nested, state)?;
                    has_predecessor = true;
                }
            }
            (NodeKind::SubnetInput(_), TraversalMode::Deep, Some((frame, outer))) => {
                let parent_filter = (self.filter)(frame.subnet);
                for input in frame.subnet.input_names() {
                    if !parent_filter.allows(input) {
                        continue;
                    }
                    if let Some(source) = self.source_of(frame.graph, frame.subnet, input)? {
                        has_predecessor = true;
                        self.visit(frame.graph, &frame.path, source, outer, state)?;
                    }
                }
            }
            _ => {
                for input in node.input_names() {
                    if !filter.allows(input) {
                        continue;
                    }
                    if let Some(source) = self.source_of(graph, node, input)? {
                        has_predecessor = true;
                        self.visit(graph, path, source, frames, state)?;
                    }
                }
            }
        }

        state.temp_mark.remove(&node.id);
        state.visited.insert(node.id);
        state.traversal.ordered.push(node);
        state.traversal.scopes.push(path.to_string());
        if !has_predecessor {
            state.traversal.leaves.push(node);
        }
        Ok(())
    }

    fn source_of(
        &self,
        graph: &'a Graph,
        node: &Node,
        input: &str,
    ) -> Result<Option<&'a Node>, CompileError> {
        match graph.input_source(node.id, input) {
            Some(connection) => graph
                .node(connection.from_node)
                .map(Some)
                .ok_or(CompileError::NodeNotFound(connection.from_node)),
            None => Ok(None),
        }
    }
}
