// SPDX-License-Identifier: MIT OR Apache-2.0
//! Backend assemblers.
//!
//! An assembler is the policy half of a compile: which stages exist, which
//! inputs matter in which stage, how output/attribute/globals nodes wire up,
//! and the template each stage is spliced into. The shared pass itself is
//! [`CodeBuilder`].

pub mod allocation;
pub mod material;
pub mod particles;
pub mod point;
pub mod template;

pub use allocation::{AttributeAllocation, StateTexture, TextureAllocations};
pub use material::{MaterialAssembler, MaterialProgram};
pub use particles::{ParticlesAssembler, ParticlesProgram, SimulationShader};
pub use point::{FreeVariable, PointBuilderAssembler, PointProgram};
pub use template::{ShaderTemplate, BODY_MARKER, DEFINITIONS_MARKER};

use crate::compiler::scope::check_variable_names;
use crate::compiler::{
    CodeBuilder, Definition, EmitContext, GraphTraverser, InputFilter, LinesController,
    ProgramMetadata, Scope, ShaderStage, TraversalMode,
};
use crate::config::{CompileContext, CompilerConfig};
use crate::error::CompileError;
use crate::graph::Graph;
use crate::kinds::{AttributeNode, NodeKind, OutputTarget};
use crate::node::{Node, NodeId, NodeRef};
use tracing::{debug, warn};

/// Backend policy consulted while building
pub trait AssemblerHooks {
    /// Backend name used in diagnostics
    fn backend(&self) -> &'static str;

    /// Output node kind this backend compiles from
    fn target(&self) -> OutputTarget;

    /// Stages compiled, in build order
    fn stages(&self) -> Vec<ShaderStage>;

    /// Skeleton of `stage`
    fn template(&self, stage: ShaderStage, config: &CompilerConfig) -> ShaderTemplate;

    /// Whether nodes of this kind can take part in a compile
    fn supports(&self, kind: &NodeKind) -> bool;

    /// Roots besides the output node, such as attribute exports or varying writes
    fn side_roots(&self, _graph: &Graph) -> Vec<NodeId> {
        Vec::new()
    }

    /// Inputs of `node` that matter for `stage`
    fn input_names_for_stage(&self, _node: &Node, _stage: ShaderStage) -> InputFilter {
        InputFilter::All
    }

    /// Declarations every stage starts with
    fn stage_definitions(
        &self,
        _stage: ShaderStage,
        owner: NodeId,
        config: &CompilerConfig,
    ) -> Vec<Definition> {
        vec![Definition::precision(owner, config.formatting.precision)]
    }

    /// Wire the output node
    fn emit_output(
        &self,
        ctx: &mut EmitContext<'_>,
        lines: &mut LinesController,
    ) -> Result<(), CompileError>;

    /// Read and/or write an attribute
    fn emit_attribute(
        &self,
        attribute: &AttributeNode,
        ctx: &mut EmitContext<'_>,
        lines: &mut LinesController,
    ) -> Result<(), CompileError>;

    /// Resolve the connected outputs of a globals node
    fn emit_globals(
        &self,
        ctx: &mut EmitContext<'_>,
        lines: &mut LinesController,
    ) -> Result<(), CompileError>;
}

/// A backend that turns a graph into a program
pub trait Assembler: AssemblerHooks {
    /// Compiled program
    type Output;

    /// Compile `graph`. Fails without side effects on the graph.
    fn compile(&mut self, graph: &Graph, context: &CompileContext) -> Result<Self::Output, CompileError>;
}

/// The single output node of `target` in `graph`
pub fn find_output_node(graph: &Graph, target: OutputTarget) -> Result<NodeId, CompileError> {
    let outputs: Vec<NodeId> = graph
        .nodes()
        .filter(|n| matches!(n.kind, NodeKind::Output(t) if t == target))
        .map(|n| n.id)
        .collect();
    match outputs.as_slice() {
        [] => Err(CompileError::MissingOutputNode {
            graph: graph.name.clone(),
        }),
        [single] => Ok(*single),
        _ => Err(CompileError::MultipleOutputNodes {
            graph: graph.name.clone(),
            count: outputs.len(),
        }),
    }
}

/// Ids of the nodes in `graph` whose `input` is connected and which match
/// `filter`, plus every subnet holding such a node at any depth
pub(crate) fn nodes_with_connected_input(
    graph: &Graph,
    input: &str,
    filter: &dyn Fn(&NodeKind) -> bool,
) -> Vec<NodeId> {
    graph
        .nodes()
        .filter(|n| match &n.kind {
            NodeKind::Subnet(subnet) => {
                !nodes_with_connected_input(&subnet.network, input, filter).is_empty()
            }
            kind => filter(kind) && graph.input_source(n.id, input).is_some(),
        })
        .map(|n| n.id)
        .collect()
}

/// Collected output of one validated pass
pub(crate) struct Pass {
    pub(crate) lines: LinesController,
    pub(crate) metadata: ProgramMetadata,
}

/// Validate the graph shape and build every stage of `hooks`
pub(crate) fn run_pass(
    hooks: &dyn AssemblerHooks,
    graph: &Graph,
    context: &CompileContext,
) -> Result<Pass, CompileError> {
    let output = find_output_node(graph, hooks.target())?;
    let scope = Scope::root(&graph.name);
    if let Some(node) = graph.nodes().find(|n| !hooks.supports(&n.kind)) {
        return Err(CompileError::UnsupportedNode {
            node: NodeRef::new(&scope.path, node),
            backend: hooks.backend(),
        });
    }
    check_variable_names(graph, &scope)?;

    let stages = hooks.stages();
    let mut lines = LinesController::new(stages.first().copied().unwrap_or(ShaderStage::Point));
    for stage in &stages {
        let definitions = hooks.stage_definitions(*stage, output, &context.config);
        lines.add_definitions(output, definitions, Some(*stage));
    }

    let side_roots = hooks.side_roots(graph);
    let everything = |_: &Node| InputFilter::All;
    let roots: Vec<NodeId> = std::iter::once(output).chain(side_roots.iter().copied()).collect();
    let reachable = GraphTraverser::new(graph, &scope.path, TraversalMode::Shallow, &everything)
        .reachable_nodes(&roots)?;
    debug!(
        graph = %graph.name,
        pruned = graph.node_count().saturating_sub(reachable.len()),
        "Unreachable nodes skipped"
    );

    let mut metadata = ProgramMetadata::default();
    CodeBuilder::new(graph, hooks, context, &scope).build_from_nodes(
        &[output],
        &side_roots,
        &mut lines,
        &mut metadata,
    )?;
    debug!(
        backend = hooks.backend(),
        graph = %graph.name,
        stages = stages.len(),
        "Pass complete"
    );
    Ok(Pass { lines, metadata })
}

impl Pass {
    /// Body texts of `stage` followed by `epilogue`
    pub(crate) fn body(&self, stage: ShaderStage, epilogue: &[String]) -> Vec<String> {
        self.lines
            .all_body_lines(stage)
            .iter()
            .map(|l| l.text.clone())
            .chain(epilogue.iter().cloned())
            .collect()
    }

    /// Splice `stage` into its template
    pub(crate) fn render(
        &self,
        hooks: &dyn AssemblerHooks,
        stage: ShaderStage,
        config: &CompilerConfig,
        epilogue: &[String],
    ) -> Result<String, CompileError> {
        let definitions = self.lines.definition_lines(stage);
        Ok(hooks
            .template(stage, config)
            .insert(stage, DEFINITIONS_MARKER, &definitions)?
            .insert(stage, BODY_MARKER, &self.body(stage, epilogue))?
            .into_source())
    }
}

/// A compiled artifact bound to one assembler.
///
/// A failed compile leaves the last good output in place and attaches the
/// error to the node it came from.
pub struct ShaderArtifact<A: Assembler> {
    assembler: A,
    output: Option<A::Output>,
    error: Option<CompileError>,
    compiled_version: Option<u64>,
}

impl<A: Assembler> ShaderArtifact<A> {
    /// Artifact that has not compiled yet
    pub fn new(assembler: A) -> Self {
        Self {
            assembler,
            output: None,
            error: None,
            compiled_version: None,
        }
    }

    /// The assembler
    pub fn assembler(&self) -> &A {
        &self.assembler
    }

    /// Last successful output
    pub fn output(&self) -> Option<&A::Output> {
        self.output.as_ref()
    }

    /// Error of the last compile, if it failed
    pub fn error(&self) -> Option<&CompileError> {
        self.error.as_ref()
    }

    /// Whether `graph` changed since the last compile
    pub fn needs_recompile(&self, graph: &Graph) -> bool {
        self.compiled_version != Some(graph.structure_version()) || graph.is_dirty()
    }

    /// Compile `graph`, keeping the previous output when it fails
    pub fn compile(
        &mut self,
        graph: &mut Graph,
        context: &CompileContext,
    ) -> Result<&A::Output, CompileError> {
        graph.clear_errors();
        let result = self.assembler.compile(graph, context);
        self.compiled_version = Some(graph.structure_version());
        graph.take_dirty();
        match result {
            Ok(output) => {
                self.error = None;
                Ok(self.output.insert(output))
            }
            Err(error) => {
                warn!(
                    backend = self.assembler.backend(),
                    graph = %graph.name,
                    "Compile failed: {error}"
                );
                graph.attach_error(&error);
                self.error = Some(error.clone());
                Err(error)
            }
        }
    }

    /// Compile only if `graph` changed; returns the current output
    pub fn update(&mut self, graph: &mut Graph, context: &CompileContext) -> Option<&A::Output> {
        if self.needs_recompile(graph) {
            // The error is recorded on the graph and in `error()`
            let _ = self.compile(graph, context);
        }
        self.output()
    }
}
