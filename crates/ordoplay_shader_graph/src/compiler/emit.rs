// SPDX-License-Identifier: MIT OR Apache-2.0
//! Everything a node kind sees while emitting.

use super::metadata::ProgramMetadata;
use super::scope::Scope;
use super::ShaderStage;
use crate::assemblers::AssemblerHooks;
use crate::config::CompileContext;
use crate::error::CompileError;
use crate::graph::Graph;
use crate::kinds::NodeKind;
use crate::node::{Node, NodeId, NodeRef};
use crate::port::PortType;

/// Emission context for one node in one stage
pub struct EmitContext<'a> {
    /// Network the node lives in
    pub graph: &'a Graph,
    /// The emitting node
    pub node: &'a Node,
    /// Stage being built
    pub stage: ShaderStage,
    /// Lexical scope of `graph`
    pub scope: &'a Scope,
    /// Backend policy
    pub hooks: &'a dyn AssemblerHooks,
    /// Config and function registry
    pub context: &'a CompileContext,
    /// Host requirements collected by the pass
    pub metadata: &'a mut ProgramMetadata,
}

impl<'a> EmitContext<'a> {
    /// Id of the emitting node, owner of whatever it adds
    pub fn owner(&self) -> NodeId {
        self.node.id
    }

    /// The emitting node for diagnostics
    pub fn node_ref(&self) -> NodeRef {
        NodeRef::new(&self.scope.path, self.node)
    }

    /// Variable holding `output` of the emitting node
    pub fn var_name(&self, output: &str) -> String {
        self.variable_of(self.node, output)
    }

    /// Variable holding `output` of `node`, a node of the current scope
    pub fn variable_of(&self, node: &Node, output: &str) -> String {
        match node.kind {
            NodeKind::SubnetInput(_) => self.scope.input_var(output),
            _ => self.scope.var_name(&node.name, output),
        }
    }

    /// Declare the variable of `output` and assign `expr` to it
    pub fn assign_output(&self, output: &str, expr: &str) -> String {
        let port_type = self
            .node
            .output(output)
            .map_or(PortType::Float, |p| p.port_type);
        format!("{} = {expr};", port_type.declare(&self.var_name(output)))
    }

    /// Expression for `input`, typed as the input port.
    ///
    /// Resolves to the connected source variable, else the port default,
    /// else the type's zero. Required inputs without a connection fail.
    pub fn input(&self, name: &str) -> Result<String, CompileError> {
        let Some(port) = self.node.input(name) else {
            return Err(CompileError::MissingInput {
                node: self.node_ref(),
                input: name.to_string(),
            });
        };

        if let Some(connection) = self.graph.input_source(self.node.id, name) {
            let source = self
                .graph
                .node(connection.from_node)
                .ok_or(CompileError::NodeNotFound(connection.from_node))?;
            let from_type = source
                .output(&connection.from_output)
                .map_or(port.port_type, |p| p.port_type);
            let expr = self.variable_of(source, &connection.from_output);
            return Ok(from_type.convert_expr(&port.port_type, &expr));
        }

        if port.required {
            return Err(CompileError::MissingInput {
                node: self.node_ref(),
                input: name.to_string(),
            });
        }

        Ok(match &port.default_value {
            Some(value) => value.port_type().convert_expr(&port.port_type, &value.literal()),
            None => port.port_type.zero_literal(),
        })
    }

    /// Whether `input` of the emitting node has a connection
    pub fn is_input_connected(&self, input: &str) -> bool {
        self.graph.input_source(self.node.id, input).is_some()
    }

    /// Outputs of the emitting node that feed something
    pub fn connected_outputs(&self) -> Vec<&'a str> {
        self.graph.connected_outputs(self.node.id)
    }

    /// One indentation unit
    pub fn indent(&self) -> &'a str {
        &self.context.config.formatting.indent
    }
}
