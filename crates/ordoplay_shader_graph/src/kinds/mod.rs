// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node kinds.
//!
//! [`NodeKind`] is a closed set: ports are resolved from the kind once, when
//! a [`Node`](crate::Node) is constructed, and code emission dispatches on
//! the variant. Output, attribute and globals nodes hand their wiring to the
//! active backend through [`AssemblerHooks`](crate::assemblers::AssemblerHooks).

pub mod attribute;
pub mod constant;
pub mod function;
pub mod globals;
pub mod math;
pub mod output;
pub mod param;
pub mod subnet;
pub mod varying;

pub use attribute::AttributeNode;
pub use function::FunctionCall;
pub use math::{MathNode, MathOp};
pub use output::OutputTarget;
pub use param::ParamNode;
pub use subnet::{ScopeBlock, SubnetNetwork};
pub use varying::VaryingNode;

use crate::compiler::{EmitContext, LinesController};
use crate::error::CompileError;
use crate::port::{Port, PortSpec, PortType, PortValue};
use serde::{Deserialize, Serialize};

/// What a node computes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// A literal value
    Constant(PortValue),
    /// A value exposed to the host as a uniform
    Param(ParamNode),
    /// A GLSL built-in math operation
    Math(MathNode),
    /// Host-provided values: time, resolution, screen position, geometry
    Globals,
    /// Reads (and optionally writes) a named per-vertex/per-particle/per-point value
    Attribute(AttributeNode),
    /// Writes a varying from the vertex stage
    VaryingWrite(VaryingNode),
    /// Reads a varying
    VaryingRead(VaryingNode),
    /// Calls a function from the function registry
    Function(FunctionCall),
    /// Final outputs of a program
    Output(OutputTarget),
    /// A nested network compiled as an isolated scope
    Subnet(Box<SubnetNetwork>),
    /// Inside a subnet: exposes the subnet's inputs
    SubnetInput(Vec<PortSpec>),
    /// Inside a subnet: collects the subnet's outputs
    SubnetOutput(Vec<PortSpec>),
}

impl NodeKind {
    /// Math node of the given operation and operand type
    pub fn math(op: MathOp, port_type: PortType) -> Self {
        Self::Math(MathNode { op, port_type })
    }

    /// Param node exposing a uniform
    pub fn param(name: impl Into<String>, default: PortValue) -> Self {
        Self::Param(ParamNode::new(name, default))
    }

    /// Attribute node
    pub fn attribute(name: impl Into<String>, port_type: PortType) -> Self {
        Self::Attribute(AttributeNode::new(name, port_type))
    }

    /// Short type tag used in logs
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Constant(_) => "constant",
            Self::Param(_) => "param",
            Self::Math(_) => "math",
            Self::Globals => "globals",
            Self::Attribute(_) => "attribute",
            Self::VaryingWrite(_) => "varying_write",
            Self::VaryingRead(_) => "varying_read",
            Self::Function(_) => "function",
            Self::Output(_) => "output",
            Self::Subnet(_) => "subnet",
            Self::SubnetInput(_) => "subnet_input",
            Self::SubnetOutput(_) => "subnet_output",
        }
    }

    /// Input and output ports of a node of this kind
    pub fn ports(&self) -> (Vec<Port>, Vec<Port>) {
        match self {
            Self::Constant(value) => (vec![], vec![Port::output("value", value.port_type())]),
            Self::Param(param) => (vec![], vec![Port::output("value", param.port_type)]),
            Self::Math(math) => math.ports(),
            Self::Globals => (vec![], globals::outputs()),
            Self::Attribute(attribute) => attribute.ports(),
            Self::VaryingWrite(varying) => {
                (vec![Port::input("value", varying.port_type)], vec![])
            }
            Self::VaryingRead(varying) => {
                (vec![], vec![Port::output("value", varying.port_type)])
            }
            Self::Function(call) => call.ports(),
            Self::Output(target) => (target.inputs(), vec![]),
            Self::Subnet(subnet) => subnet.ports(),
            Self::SubnetInput(specs) => (vec![], specs.iter().map(|s| Port::output(&s.name, s.port_type)).collect()),
            Self::SubnetOutput(specs) => (specs.iter().map(|s| Port::input(&s.name, s.port_type)).collect(), vec![]),
        }
    }

    /// Write this node's definitions and body lines for `ctx.stage`
    pub(crate) fn emit(
        &self,
        ctx: &mut EmitContext<'_>,
        lines: &mut LinesController,
    ) -> Result<(), CompileError> {
        let hooks = ctx.hooks;
        match self {
            Self::Constant(value) => constant::emit(value, ctx, lines),
            Self::Param(param) => param.emit(ctx, lines),
            Self::Math(math) => math.emit(ctx, lines),
            Self::Globals => hooks.emit_globals(ctx, lines),
            Self::Attribute(attribute) => hooks.emit_attribute(attribute, ctx, lines),
            Self::VaryingWrite(varying) => varying.emit_write(ctx, lines),
            Self::VaryingRead(varying) => varying.emit_read(ctx, lines),
            Self::Function(call) => call.emit(ctx, lines),
            Self::Output(_) => hooks.emit_output(ctx, lines),
            Self::Subnet(subnet) => crate::compiler::scope::emit_subnet(subnet, ctx, lines),
            // Its outputs resolve to the locals bound in the subnet's pre-block
            Self::SubnetInput(_) => Ok(()),
            Self::SubnetOutput(_) => subnet::emit_output_bridge(ctx, lines),
        }
    }
}
