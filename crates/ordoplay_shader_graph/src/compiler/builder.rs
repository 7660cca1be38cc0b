// SPDX-License-Identifier: MIT OR Apache-2.0
//! The pass orchestrator.

use super::collection::LinesController;
use super::emit::EmitContext;
use super::metadata::ProgramMetadata;
use super::scope::Scope;
use super::traverser::{GraphTraverser, TraversalMode};
use super::ShaderStage;
use crate::assemblers::AssemblerHooks;
use crate::config::CompileContext;
use crate::error::CompileError;
use crate::graph::Graph;
use crate::kinds::NodeKind;
use crate::node::{Node, NodeId, NodeRef};
use tracing::{debug, trace};

/// Drives node emission for one network in dependency order
pub struct CodeBuilder<'a> {
    graph: &'a Graph,
    hooks: &'a dyn AssemblerHooks,
    context: &'a CompileContext,
    scope: &'a Scope,
}

impl<'a> CodeBuilder<'a> {
    /// Builder over `graph` in `scope`
    pub fn new(
        graph: &'a Graph,
        hooks: &'a dyn AssemblerHooks,
        context: &'a CompileContext,
        scope: &'a Scope,
    ) -> Self {
        Self {
            graph,
            hooks,
            context,
            scope,
        }
    }

    /// Build every stage of the backend from `roots` and `side_roots`
    pub fn build_from_nodes(
        &self,
        roots: &[NodeId],
        side_roots: &[NodeId],
        lines: &mut LinesController,
        metadata: &mut ProgramMetadata,
    ) -> Result<(), CompileError> {
        let all_roots: Vec<NodeId> = roots.iter().chain(side_roots).copied().collect();
        for stage in self.hooks.stages() {
            self.build_stage(stage, &all_roots, lines, metadata)?;
        }
        Ok(())
    }

    /// Emit every node `stage` needs, predecessors first
    pub fn build_stage(
        &self,
        stage: ShaderStage,
        roots: &[NodeId],
        lines: &mut LinesController,
        metadata: &mut ProgramMetadata,
    ) -> Result<(), CompileError> {
        let filter = |node: &Node| self.hooks.input_names_for_stage(node, stage);

        // A root with nothing to contribute to this stage is skipped entirely
        let stage_roots: Vec<NodeId> = roots
            .iter()
            .copied()
            .filter(|id| {
                self.graph
                    .node(*id)
                    .map_or(true, |node| node.inputs.is_empty() || !filter(node).is_empty())
            })
            .collect();

        let traverser = GraphTraverser::new(self.graph, &self.scope.path, TraversalMode::Shallow, &filter);
        let nodes = traverser.sorted_nodes(&stage_roots)?;
        debug!(
            stage = %stage,
            scope = %self.scope.path,
            nodes = nodes.len(),
            "Building stage"
        );

        for node in nodes {
            self.check_supported(node)?;
            lines.set_current_stage(stage);
            let mut ctx = EmitContext {
                graph: self.graph,
                node,
                stage,
                scope: self.scope,
                hooks: self.hooks,
                context: self.context,
                metadata: &mut *metadata,
            };
            node.kind.emit(&mut ctx, lines)?;
            trace!(node = %ctx.node_ref(), kind = node.kind.type_name(), "Emitted");
            if let Some(conflict) = lines.take_conflicts().into_iter().next() {
                return Err(CompileError::ConflictingDefinition {
                    node: NodeRef::new(&self.scope.path, node),
                    existing: conflict.existing,
                    rejected: conflict.rejected,
                });
            }
        }
        Ok(())
    }

    fn check_supported(&self, node: &Node) -> Result<(), CompileError> {
        let nested_output = self.scope.depth > 0 && matches!(node.kind, NodeKind::Output(_));
        if nested_output || !self.hooks.supports(&node.kind) {
            return Err(CompileError::UnsupportedNode {
                node: NodeRef::new(&self.scope.path, node),
                backend: self.hooks.backend(),
            });
        }
        Ok(())
    }
}
