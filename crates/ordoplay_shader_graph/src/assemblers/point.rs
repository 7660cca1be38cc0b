// SPDX-License-Identifier: MIT OR Apache-2.0
//! Point builder backend.
//!
//! Compiles to a single GLSL function mutating a `Point` record in place.
//! The host owns the rest of the shader, so the result is split into the
//! function itself, the helper functions it calls and the free variables
//! (uniforms) the host has to declare and bind.

use super::{nodes_with_connected_input, run_pass, Assembler, AssemblerHooks, ShaderTemplate, BODY_MARKER};
use crate::compiler::{
    BodyLineOptions, Definition, DefinitionKind, EmitContext, LinesController, ParamBinding,
    ShaderStage,
};
use crate::config::{CompileContext, CompilerConfig};
use crate::error::CompileError;
use crate::graph::Graph;
use crate::kinds::attribute::EXPORT_INPUT;
use crate::kinds::{globals, AttributeNode, NodeKind, OutputTarget};
use crate::node::NodeId;
use crate::port::PortType;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::warn;

const OUTPUT_FIELDS: [&str; 3] = ["position", "normal", "color"];

/// A uniform the host must declare next to the point function
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreeVariable {
    /// Uniform name
    pub name: String,
    /// GLSL type
    pub ty: &'static str,
}

/// A compiled point builder
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointProgram {
    /// Helper functions followed by the point function
    pub source: String,
    /// Statements of the point function
    pub body: String,
    /// Helper function sources
    pub functions: Vec<String>,
    /// Uniforms referenced by the body
    pub free_variables: Vec<FreeVariable>,
    /// Parameter bindings
    pub params: IndexMap<String, ParamBinding>,
    /// Point fields read
    pub attributes_read: IndexSet<String>,
    /// Point fields written
    pub attributes_written: IndexSet<String>,
    /// Reads elapsed time
    pub time_dependent: bool,
}

/// Compiles point graphs
#[derive(Debug, Clone, Copy, Default)]
pub struct PointBuilderAssembler;

impl PointBuilderAssembler {
    /// Create a point builder assembler
    pub fn new() -> Self {
        Self
    }

    fn field(ctx: &EmitContext<'_>, name: &str) -> String {
        format!("{}.{name}", ctx.context.config.points.point_variable)
    }

    fn check_type(attribute: &AttributeNode, ctx: &EmitContext<'_>) -> Result<(), CompileError> {
        if attribute.port_type.components() == 0 {
            return Err(CompileError::UnsupportedAttributeType {
                node: ctx.node_ref(),
                attribute: attribute.name.clone(),
                ty: attribute.port_type.glsl_name(),
            });
        }
        Ok(())
    }
}

impl AssemblerHooks for PointBuilderAssembler {
    fn backend(&self) -> &'static str {
        "points"
    }

    fn target(&self) -> OutputTarget {
        OutputTarget::Points
    }

    fn stages(&self) -> Vec<ShaderStage> {
        vec![ShaderStage::Point]
    }

    fn template(&self, _stage: ShaderStage, config: &CompilerConfig) -> ShaderTemplate {
        let points = &config.points;
        ShaderTemplate::new(format!(
            "void {}(inout Point {}) {{\n\t{BODY_MARKER}\n}}\n",
            points.function_name, points.point_variable
        ))
    }

    fn supports(&self, kind: &NodeKind) -> bool {
        match kind {
            NodeKind::Output(target) => *target == OutputTarget::Points,
            NodeKind::VaryingWrite(_) | NodeKind::VaryingRead(_) => false,
            _ => true,
        }
    }

    fn side_roots(&self, graph: &Graph) -> Vec<NodeId> {
        nodes_with_connected_input(graph, EXPORT_INPUT, &|kind| {
            matches!(kind, NodeKind::Attribute(_))
        })
    }

    // No precision statement: the host shader declares it
    fn stage_definitions(
        &self,
        _stage: ShaderStage,
        _owner: NodeId,
        _config: &CompilerConfig,
    ) -> Vec<Definition> {
        Vec::new()
    }

    fn emit_output(
        &self,
        ctx: &mut EmitContext<'_>,
        lines: &mut LinesController,
    ) -> Result<(), CompileError> {
        let mut body = Vec::new();
        for name in OUTPUT_FIELDS {
            if !ctx.is_input_connected(name) {
                continue;
            }
            let value = ctx.input(name)?;
            body.push(format!("{} = {value};", Self::field(ctx, name)));
            ctx.metadata.attributes_written.insert(name.to_string());
        }
        lines.add_body_lines(ctx.owner(), body, None, BodyLineOptions::default());
        Ok(())
    }

    fn emit_attribute(
        &self,
        attribute: &AttributeNode,
        ctx: &mut EmitContext<'_>,
        lines: &mut LinesController,
    ) -> Result<(), CompileError> {
        Self::check_type(attribute, ctx)?;
        let field = Self::field(ctx, &attribute.name);
        let mut body = Vec::new();
        if ctx.graph.is_output_connected(ctx.owner(), "value") {
            ctx.metadata.attributes_read.insert(attribute.name.clone());
            body.push(ctx.assign_output("value", &field));
        }
        if ctx.is_input_connected(EXPORT_INPUT) {
            let value = ctx.input(EXPORT_INPUT)?;
            ctx.metadata.attributes_written.insert(attribute.name.clone());
            body.push(format!("{field} = {value};"));
        }
        lines.add_body_lines(ctx.owner(), body, None, BodyLineOptions::default());
        Ok(())
    }

    fn emit_globals(
        &self,
        ctx: &mut EmitContext<'_>,
        lines: &mut LinesController,
    ) -> Result<(), CompileError> {
        globals::emit_with(ctx, lines, |output, ctx, lines| {
            let owner = ctx.owner();
            Ok(match output {
                globals::TIME => {
                    let uniform = Definition::uniform(owner, PortType::Float, globals::TIME);
                    lines.add_definitions(owner, vec![uniform], None);
                    ctx.metadata.time_dependent = true;
                    globals::TIME.to_string()
                }
                globals::RESOLUTION => {
                    let uniform = Definition::uniform(owner, PortType::Vector2, globals::RESOLUTION);
                    lines.add_definitions(owner, vec![uniform], None);
                    ctx.metadata.resolution_dependent = true;
                    globals::RESOLUTION.to_string()
                }
                globals::FRAG_COORD => {
                    warn!(node = %ctx.node_ref(), "Point builders have no fragment coordinate");
                    PortType::Vector4.zero_literal()
                }
                field => {
                    ctx.metadata.attributes_read.insert(field.to_string());
                    Self::field(ctx, field)
                }
            })
        })
    }
}

impl Assembler for PointBuilderAssembler {
    type Output = PointProgram;

    fn compile(&mut self, graph: &Graph, context: &CompileContext) -> Result<PointProgram, CompileError> {
        let pass = run_pass(&*self, graph, context)?;
        let stage = ShaderStage::Point;
        let body_lines = pass.body(stage, &[]);
        let function = self
            .template(stage, &context.config)
            .insert(stage, BODY_MARKER, &body_lines)?
            .into_source();

        let mut functions = Vec::new();
        let mut free_variables = Vec::new();
        pass.lines.traverse_definitions(stage, |definition| match definition.kind() {
            DefinitionKind::Function => functions.push(definition.line()),
            DefinitionKind::Uniform => free_variables.push(FreeVariable {
                name: definition.name().to_string(),
                ty: definition.port_type().glsl_name(),
            }),
            _ => {}
        });

        let mut source = functions.join("\n\n");
        if !source.is_empty() {
            source.push_str("\n\n");
        }
        source.push_str(&function);

        Ok(PointProgram {
            source,
            body: body_lines.join("\n"),
            functions,
            free_variables,
            params: pass.metadata.params,
            attributes_read: pass.metadata.attributes_read,
            attributes_written: pass.metadata.attributes_written,
            time_dependent: pass.metadata.time_dependent,
        })
    }
}
