// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material backend: a vertex and a fragment shader.
//!
//! The output node's `position`/`normal` belong to the vertex stage and
//! `color`/`alpha` to the fragment stage. Attributes only exist per vertex,
//! so a fragment-stage read goes through a `v_attr_<name>` varying whose
//! vertex side is emitted as well.

use super::{nodes_with_connected_input, run_pass, Assembler, AssemblerHooks, ShaderTemplate};
use crate::compiler::{
    BodyLineOptions, Definition, EmitContext, InputFilter, LinesController, ParamBinding,
    ShaderStage,
};
use crate::config::{CompileContext, CompilerConfig};
use crate::error::CompileError;
use crate::graph::Graph;
use crate::kinds::attribute::EXPORT_INPUT;
use crate::kinds::{globals, AttributeNode, NodeKind, OutputTarget};
use crate::node::{Node, NodeId};
use crate::port::PortType;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

const VERTEX_TEMPLATE: &str = "\
// INSERT DEFINITIONS
uniform mat4 modelViewMatrix;
uniform mat4 projectionMatrix;
uniform mat3 normalMatrix;

void main() {
\t// INSERT BODY
}
";

const FRAGMENT_TEMPLATE: &str = "\
// INSERT DEFINITIONS

void main() {
\t// INSERT BODY
}
";

const VERTEX_INPUTS: [&str; 2] = ["position", "normal"];
const FRAGMENT_INPUTS: [&str; 2] = ["color", "alpha"];

/// A compiled material
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialProgram {
    /// Vertex shader source
    pub vertex: String,
    /// Fragment shader source
    pub fragment: String,
    /// Parameter bindings
    pub params: IndexMap<String, ParamBinding>,
    /// Reads elapsed time: re-render every frame
    pub time_dependent: bool,
    /// Reads the viewport size
    pub resolution_dependent: bool,
}

/// Compiles material graphs
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialAssembler;

impl MaterialAssembler {
    /// Create a material assembler
    pub fn new() -> Self {
        Self
    }

    /// Expression reading attribute `name` in the current stage
    fn read_attribute(
        &self,
        name: &str,
        port_type: PortType,
        ctx: &mut EmitContext<'_>,
        lines: &mut LinesController,
    ) -> String {
        let owner = ctx.owner();
        ctx.metadata.attributes_read.insert(name.to_string());
        lines.add_definitions(
            owner,
            vec![Definition::attribute(owner, port_type, name)],
            Some(ShaderStage::Vertex),
        );
        if ctx.stage == ShaderStage::Vertex {
            return name.to_string();
        }

        let varying = format!("v_attr_{name}");
        let definition = Definition::varying(owner, port_type, &varying);
        lines.add_definitions(owner, vec![definition.clone()], Some(ShaderStage::Vertex));
        lines.add_definitions(owner, vec![definition], None);
        lines.add_body_lines(
            owner,
            vec![format!("{varying} = {name};")],
            Some(ShaderStage::Vertex),
            BodyLineOptions::uniq_text(),
        );
        varying
    }
}

impl AssemblerHooks for MaterialAssembler {
    fn backend(&self) -> &'static str {
        "material"
    }

    fn target(&self) -> OutputTarget {
        OutputTarget::Material
    }

    fn stages(&self) -> Vec<ShaderStage> {
        vec![ShaderStage::Vertex, ShaderStage::Fragment]
    }

    fn template(&self, stage: ShaderStage, config: &CompilerConfig) -> ShaderTemplate {
        let custom = match stage {
            ShaderStage::Vertex => config.material.vertex_template.clone(),
            _ => config.material.fragment_template.clone(),
        };
        match (custom, stage) {
            (Some(source), _) => ShaderTemplate::new(source),
            (None, ShaderStage::Vertex) => ShaderTemplate::new(VERTEX_TEMPLATE),
            (None, _) => ShaderTemplate::new(FRAGMENT_TEMPLATE),
        }
    }

    fn supports(&self, kind: &NodeKind) -> bool {
        match kind {
            NodeKind::Output(target) => *target == OutputTarget::Material,
            _ => true,
        }
    }

    fn side_roots(&self, graph: &Graph) -> Vec<NodeId> {
        nodes_with_connected_input(graph, "value", &|kind| {
            matches!(kind, NodeKind::VaryingWrite(_))
        })
    }

    fn input_names_for_stage(&self, node: &Node, stage: ShaderStage) -> InputFilter {
        match (&node.kind, stage) {
            (NodeKind::Output(_), ShaderStage::Vertex) => InputFilter::only(VERTEX_INPUTS),
            (NodeKind::Output(_), _) => InputFilter::only(FRAGMENT_INPUTS),
            (NodeKind::VaryingWrite(_), ShaderStage::Vertex) => InputFilter::All,
            (NodeKind::VaryingWrite(_) | NodeKind::Attribute(_), _) => InputFilter::none(),
            _ => InputFilter::All,
        }
    }

    fn emit_output(
        &self,
        ctx: &mut EmitContext<'_>,
        lines: &mut LinesController,
    ) -> Result<(), CompileError> {
        let owner = ctx.owner();
        let mut body = Vec::new();
        if ctx.stage == ShaderStage::Vertex {
            let position = if ctx.is_input_connected("position") {
                ctx.input("position")?
            } else {
                self.read_attribute("position", PortType::Vector3, ctx, lines)
            };
            body.push(format!("vec3 transformed = {position};"));
            if ctx.is_input_connected("normal") {
                let normal = ctx.input("normal")?;
                let definition = Definition::varying(owner, PortType::Vector3, "v_normal");
                lines.add_definitions(owner, vec![definition.clone()], Some(ShaderStage::Vertex));
                lines.add_definitions(owner, vec![definition], Some(ShaderStage::Fragment));
                body.push(format!("v_normal = normalize(normalMatrix * {normal});"));
            }
        } else {
            let color = ctx.input("color")?;
            let alpha = ctx.input("alpha")?;
            body.push(format!("vec4 diffuseColor = vec4({color}, {alpha});"));
        }
        lines.add_body_lines(owner, body, None, BodyLineOptions::default());
        Ok(())
    }

    fn emit_attribute(
        &self,
        attribute: &AttributeNode,
        ctx: &mut EmitContext<'_>,
        lines: &mut LinesController,
    ) -> Result<(), CompileError> {
        if attribute.port_type.components() == 0 {
            return Err(CompileError::UnsupportedAttributeType {
                node: ctx.node_ref(),
                attribute: attribute.name.clone(),
                ty: attribute.port_type.glsl_name(),
            });
        }
        if ctx.is_input_connected(EXPORT_INPUT) {
            warn!(node = %ctx.node_ref(), "Material attributes are read-only, export ignored");
        }
        let expr = self.read_attribute(&attribute.name, attribute.port_type, ctx, lines);
        let line = ctx.assign_output("value", &expr);
        lines.add_body_lines(ctx.owner(), vec![line], None, BodyLineOptions::default());
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
                globals::FRAG_COORD if ctx.stage == ShaderStage::Fragment => {
                    "gl_FragCoord".to_string()
                }
                globals::FRAG_COORD => {
                    warn!(node = %ctx.node_ref(), "frag_coord is only defined in the fragment stage");
                    PortType::Vector4.zero_literal()
                }
                globals::POSITION => {
                    self.read_attribute(globals::POSITION, PortType::Vector3, ctx, lines)
                }
                _ => self.read_attribute(globals::UV, PortType::Vector2, ctx, lines),
            })
        })
    }
}

impl Assembler for MaterialAssembler {
    type Output = MaterialProgram;

    fn compile(&mut self, graph: &Graph, context: &CompileContext) -> Result<MaterialProgram, CompileError> {
        let pass = run_pass(&*self, graph, context)?;
        let config = &context.config;
        let vertex = pass.render(
            &*self,
            ShaderStage::Vertex,
            config,
            &["gl_Position = projectionMatrix * modelViewMatrix * vec4(transformed, 1.0);".to_string()],
        )?;
        let fragment = pass.render(
            &*self,
            ShaderStage::Fragment,
            config,
            &["gl_FragColor = diffuseColor;".to_string()],
        )?;
        Ok(MaterialProgram {
            vertex,
            fragment,
            params: pass.metadata.params,
            time_dependent: pass.metadata.time_dependent,
            resolution_dependent: pass.metadata.resolution_dependent,
        })
    }
}
