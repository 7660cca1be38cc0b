// SPDX-License-Identifier: MIT OR Apache-2.0
//! Particle simulation backend.
//!
//! One fragment shader per state texture. Each shader starts from the
//! texture's previous value and overwrites the channels of the attributes
//! written this frame; every read samples the previous frame.

use super::allocation::{AttributeAllocation, AttributeRequest, TextureAllocations};
use super::{nodes_with_connected_input, run_pass, Assembler, AssemblerHooks, ShaderTemplate};
use crate::compiler::{
    BodyLineOptions, Definition, EmitContext, GraphTraverser, InputFilter, LinesController,
    ParamBinding, Scope, ShaderStage, TraversalMode,
};
use crate::config::{CompileContext, CompilerConfig};
use crate::error::CompileError;
use crate::graph::Graph;
use crate::kinds::attribute::EXPORT_INPUT;
use crate::kinds::{globals, AttributeNode, NodeKind, OutputTarget};
use crate::node::{Node, NodeId, NodeRef};
use crate::port::PortType;
use indexmap::IndexMap;
use serde::Serialize;

/// Output node inputs and the attribute each one writes
const OUTPUT_ATTRIBUTES: [&str; 2] = ["position", "velocity"];

/// Shader updating one state texture
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationShader {
    /// Stage / texture index
    pub index: u8,
    /// Sampler uniform of the texture it writes
    pub texture: String,
    /// Fragment shader source
    pub source: String,
}

/// A compiled particle simulation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticlesProgram {
    /// One shader per state texture, in texture order
    pub shaders: Vec<SimulationShader>,
    /// Channel table the host's stepper binds textures with
    pub allocations: TextureAllocations,
    /// Parameter bindings
    pub params: IndexMap<String, ParamBinding>,
    /// Reads elapsed time
    pub time_dependent: bool,
}

/// Compiles particle graphs, keeping channel allocations across compiles
#[derive(Debug, Clone, Default)]
pub struct ParticlesAssembler {
    allocations: TextureAllocations,
}

impl ParticlesAssembler {
    /// Assembler with no allocation yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Current channel table
    pub fn allocations(&self) -> &TextureAllocations {
        &self.allocations
    }

    fn stage_index(stage: ShaderStage) -> Option<u8> {
        match stage {
            ShaderStage::Simulation(index) => Some(index),
            _ => None,
        }
    }

    fn owned_by(&self, attribute: &str, stage: ShaderStage) -> bool {
        self.allocations
            .get(attribute)
            .is_some_and(|a| Some(a.texture) == Self::stage_index(stage))
    }

    fn allocation(
        &self,
        attribute: &str,
        ctx: &EmitContext<'_>,
    ) -> Result<&AttributeAllocation, CompileError> {
        self.allocations
            .get(attribute)
            .ok_or_else(|| CompileError::UnallocatedAttribute {
                node: ctx.node_ref(),
                attribute: attribute.to_string(),
            })
    }

    /// Sample `attribute` from the previous frame, converted to `port_type`
    fn read(
        &self,
        attribute: &str,
        port_type: PortType,
        ctx: &mut EmitContext<'_>,
        lines: &mut LinesController,
    ) -> Result<String, CompileError> {
        let allocation = self.allocation(attribute, ctx)?;
        let texture = self
            .allocations
            .texture_name(allocation.texture)
            .unwrap_or_default()
            .to_string();
        let owner = ctx.owner();
        lines.add_definitions(owner, vec![Definition::uniform(owner, PortType::Texture, &texture)], None);
        ctx.metadata.attributes_read.insert(attribute.to_string());
        let swizzle = allocation.swizzle(port_type.components());
        let sample = format!("texture2D({texture}, particleUV).{swizzle}");
        Ok(channel_type(swizzle).convert_expr(&port_type, &sample))
    }

    /// Write `value`, of type `port_type`, into the channels of `attribute`
    fn write(
        &self,
        attribute: &str,
        port_type: PortType,
        value: &str,
        ctx: &mut EmitContext<'_>,
    ) -> Result<String, CompileError> {
        let allocation = self.allocation(attribute, ctx)?;
        ctx.metadata.attributes_written.insert(attribute.to_string());
        let swizzle = allocation.swizzle(port_type.components());
        let value = port_type.convert_expr(&channel_type(swizzle), value);
        Ok(format!("gl_FragColor.{swizzle} = {value};"))
    }

    /// Every attribute the graph can touch, including inside subnets
    fn collect_requests(
        &self,
        graph: &Graph,
        path: &str,
        roots: &[NodeId],
        requests: &mut Vec<AttributeRequest>,
    ) -> Result<(), CompileError> {
        let all = |_: &Node| InputFilter::All;
        let traverser = GraphTraverser::new(graph, path, TraversalMode::Deep, &all);
        for (scope, node) in traverser.scoped_nodes(roots)? {
            let request = |name: &str, port_type| AttributeRequest {
                name: name.to_string(),
                port_type,
                node: NodeRef::new(&scope, node),
            };
            match &node.kind {
                NodeKind::Attribute(attribute) => {
                    requests.push(request(&attribute.name, attribute.port_type));
                }
                NodeKind::Output(_) => {
                    for name in OUTPUT_ATTRIBUTES {
                        if graph.input_source(node.id, name).is_some() {
                            requests.push(request(name, PortType::Vector3));
                        }
                    }
                }
                NodeKind::Subnet(subnet) => {
                    let side_roots = self.side_roots(&subnet.network);
                    if !side_roots.is_empty() {
                        let inner = format!("{scope}/{}", node.name);
                        self.collect_requests(&subnet.network, &inner, &side_roots, requests)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl AssemblerHooks for ParticlesAssembler {
    fn backend(&self) -> &'static str {
        "particles"
    }

    fn target(&self) -> OutputTarget {
        OutputTarget::Particles
    }

    fn stages(&self) -> Vec<ShaderStage> {
        (0..self.allocations.texture_count())
            .filter_map(|i| u8::try_from(i).ok())
            .map(ShaderStage::Simulation)
            .collect()
    }

    fn template(&self, stage: ShaderStage, _config: &CompilerConfig) -> ShaderTemplate {
        let texture = Self::stage_index(stage)
            .and_then(|i| self.allocations.texture_name(i))
            .unwrap_or_default();
        ShaderTemplate::new(format!(
            "// INSERT DEFINITIONS\n\nvoid main() {{\n\tvec2 particleUV = gl_FragCoord.xy / resolution.xy;\n\tgl_FragColor = texture2D({texture}, particleUV);\n\t// INSERT BODY\n}}\n"
        ))
    }

    fn supports(&self, kind: &NodeKind) -> bool {
        match kind {
            NodeKind::Output(target) => *target == OutputTarget::Particles,
            NodeKind::VaryingWrite(_) | NodeKind::VaryingRead(_) => false,
            _ => true,
        }
    }

    fn side_roots(&self, graph: &Graph) -> Vec<NodeId> {
        nodes_with_connected_input(graph, EXPORT_INPUT, &|kind| {
            matches!(kind, NodeKind::Attribute(_))
        })
    }

    fn input_names_for_stage(&self, node: &Node, stage: ShaderStage) -> InputFilter {
        match &node.kind {
            NodeKind::Output(_) => InputFilter::only(
                OUTPUT_ATTRIBUTES
                    .into_iter()
                    .filter(|name| self.owned_by(name, stage)),
            ),
            NodeKind::Attribute(attribute) if !self.owned_by(&attribute.name, stage) => {
                InputFilter::none()
            }
            _ => InputFilter::All,
        }
    }

    fn stage_definitions(
        &self,
        stage: ShaderStage,
        owner: NodeId,
        config: &CompilerConfig,
    ) -> Vec<Definition> {
        let texture = Self::stage_index(stage)
            .and_then(|i| self.allocations.texture_name(i))
            .unwrap_or_default();
        vec![
            Definition::precision(owner, config.formatting.precision),
            Definition::uniform(owner, PortType::Vector2, globals::RESOLUTION),
            Definition::uniform(owner, PortType::Texture, texture),
        ]
    }

    fn emit_output(
        &self,
        ctx: &mut EmitContext<'_>,
        lines: &mut LinesController,
    ) -> Result<(), CompileError> {
        let mut body = Vec::new();
        for name in OUTPUT_ATTRIBUTES {
            if !self.owned_by(name, ctx.stage) || !ctx.is_input_connected(name) {
                continue;
            }
            let value = ctx.input(name)?;
            body.push(self.write(name, PortType::Vector3, &value, ctx)?);
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
        let mut body = Vec::new();
        if ctx.graph.is_output_connected(ctx.owner(), "value") {
            let expr = self.read(&attribute.name, attribute.port_type, ctx, lines)?;
            body.push(ctx.assign_output("value", &expr));
        }
        if ctx.is_input_connected(EXPORT_INPUT) && self.owned_by(&attribute.name, ctx.stage) {
            let value = ctx.input(EXPORT_INPUT)?;
            body.push(self.write(&attribute.name, attribute.port_type, &value, ctx)?);
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
                    ctx.metadata.resolution_dependent = true;
                    globals::RESOLUTION.to_string()
                }
                globals::FRAG_COORD => "gl_FragCoord".to_string(),
                globals::POSITION => self.read(globals::POSITION, PortType::Vector3, ctx, lines)?,
                _ => "particleUV".to_string(),
            })
        })
    }
}

/// Float type of the sampled channels `swizzle`
fn channel_type(swizzle: &str) -> PortType {
    u8::try_from(swizzle.len())
        .ok()
        .and_then(PortType::float_vector)
        .unwrap_or(PortType::Float)
}

impl Assembler for ParticlesAssembler {
    type Output = ParticlesProgram;

    fn compile(&mut self, graph: &Graph, context: &CompileContext) -> Result<ParticlesProgram, CompileError> {
        let output = super::find_output_node(graph, OutputTarget::Particles)?;
        let scope = Scope::root(&graph.name);
        let mut roots = vec![output];
        roots.extend(self.side_roots(graph));

        let mut requests = Vec::new();
        self.collect_requests(graph, &scope.path, &roots, &mut requests)?;
        self.allocations.update(&requests, &context.config.particles)?;

        let pass = run_pass(&*self, graph, context)?;
        let mut shaders = Vec::with_capacity(self.allocations.texture_count());
        for stage in self.stages() {
            let Some(index) = Self::stage_index(stage) else {
                continue;
            };
            shaders.push(SimulationShader {
                index,
                texture: self.allocations.texture_name(index).unwrap_or_default().to_string(),
                source: pass.render(&*self, stage, &context.config, &[])?,
            });
        }

        Ok(ParticlesProgram {
            shaders,
            allocations: self.allocations.clone(),
            params: pass.metadata.params,
            time_dependent: pass.metadata.time_dependent,
        })
    }
}
