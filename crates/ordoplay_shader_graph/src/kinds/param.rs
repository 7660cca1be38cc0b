// SPDX-License-Identifier: MIT OR Apache-2.0
//! Parameter nodes: host-editable values bound to uniforms.

use crate::compiler::{BodyLineOptions, Definition, EmitContext, LinesController, ParamBinding};
use crate::error::CompileError;
use crate::port::{PortType, PortValue};
use serde::{Deserialize, Serialize};

/// A value the host sets at runtime through a uniform named `param_<name>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamNode {
    /// Parameter name, shared by every param node bound to the same uniform
    pub name: String,
    /// Uniform type
    pub port_type: PortType,
    /// Initial value the host should upload
    pub default: PortValue,
}

impl ParamNode {
    /// Param typed after its default value
    pub fn new(name: impl Into<String>, default: PortValue) -> Self {
        Self {
            name: name.into(),
            port_type: default.port_type(),
            default,
        }
    }

    /// Name of the uniform carrying this parameter
    pub fn uniform_name(&self) -> String {
        format!("param_{}", self.name)
    }

    pub(crate) fn emit(
        &self,
        ctx: &mut EmitContext<'_>,
        lines: &mut LinesController,
    ) -> Result<(), CompileError> {
        let uniform = self.uniform_name();
        let owner = ctx.owner();
        lines.add_definitions(
            owner,
            vec![Definition::uniform(owner, self.port_type, &uniform)],
            None,
        );
        let binding = ParamBinding {
            node: ctx.node_ref().path,
            param: self.name.clone(),
            uniform: uniform.clone(),
            port_type: self.port_type,
            default: self.default.clone(),
        };
        ctx.metadata.params.entry(self.name.clone()).or_insert(binding);

        let line = ctx.assign_output("value", &uniform);
        lines.add_body_lines(owner, vec![line], None, BodyLineOptions::default());
        Ok(())
    }
}
