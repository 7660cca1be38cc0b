// SPDX-License-Identifier: MIT OR Apache-2.0
//! Subnet nodes: a nested network compiled as its own scope.
//!
//! The network always contains one [`NodeKind::SubnetInput`] child mirroring
//! the subnet's inputs and one [`NodeKind::SubnetOutput`] child collecting its
//! outputs. The splice itself lives in [`crate::compiler::scope`].

use super::NodeKind;
use crate::compiler::{BodyLineOptions, EmitContext, LinesController};
use crate::error::CompileError;
use crate::graph::Graph;
use crate::node::Node;
use crate::port::{Port, PortSpec};
use serde::{Deserialize, Serialize};

/// Default name of the input child
pub const INPUT_NODE: &str = "subnet_input";
/// Default name of the output child
pub const OUTPUT_NODE: &str = "subnet_output";

/// Block construct wrapping the nested body
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScopeBlock {
    /// `if (true) { ... }`: scoping only
    #[default]
    Always,
    /// `if (<input>) { ... }`: runs the body only when the named bool input holds
    Conditional {
        /// Name of a bool input of the subnet
        condition: String,
    },
}

/// A nested network with a declared port boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubnetNetwork {
    /// Inputs, visible inside through the subnet input child
    pub inputs: Vec<PortSpec>,
    /// Outputs, fed inside through the subnet output child
    pub outputs: Vec<PortSpec>,
    /// Block wrapping the nested body
    #[serde(default)]
    pub block: ScopeBlock,
    /// Inner network
    pub network: Graph,
}

impl SubnetNetwork {
    /// Create a subnet whose network holds just its input and output children
    pub fn new(name: impl Into<String>, inputs: Vec<PortSpec>, outputs: Vec<PortSpec>) -> Self {
        let mut network = Graph::new(name);
        network.add(INPUT_NODE, NodeKind::SubnetInput(inputs.clone()));
        network.add(OUTPUT_NODE, NodeKind::SubnetOutput(outputs.clone()));
        Self {
            inputs,
            outputs,
            block: ScopeBlock::Always,
            network,
        }
    }

    /// Use a different block construct
    pub fn with_block(mut self, block: ScopeBlock) -> Self {
        self.block = block;
        self
    }

    /// The child collecting the subnet's outputs
    pub fn output_node(&self) -> Option<&Node> {
        self.network
            .nodes()
            .find(|n| matches!(n.kind, NodeKind::SubnetOutput(_)))
    }

    /// The child exposing the subnet's inputs
    pub fn input_node(&self) -> Option<&Node> {
        self.network
            .nodes()
            .find(|n| matches!(n.kind, NodeKind::SubnetInput(_)))
    }

    pub(crate) fn ports(&self) -> (Vec<Port>, Vec<Port>) {
        (
            self.inputs.iter().map(|s| Port::input(&s.name, s.port_type)).collect(),
            self.outputs.iter().map(|s| Port::output(&s.name, s.port_type)).collect(),
        )
    }
}

/// Assign each collected value to the parent-scope output variable.
///
/// Runs inside the subnet's block: the parent declared the outputs in its
/// pre-block, so these are plain assignments.
pub(crate) fn emit_output_bridge(
    ctx: &mut EmitContext<'_>,
    lines: &mut LinesController,
) -> Result<(), CompileError> {
    let names: Vec<String> = ctx.node.input_names().map(str::to_string).collect();
    let mut body = Vec::with_capacity(names.len());
    for name in &names {
        if !ctx.is_input_connected(name) {
            continue;
        }
        let value = ctx.input(name)?;
        body.push(format!("{} = {value};", ctx.scope.output_var(name)));
    }
    lines.add_body_lines(ctx.owner(), body, None, BodyLineOptions::default());
    Ok(())
}
