// SPDX-License-Identifier: MIT OR Apache-2.0
//! Varying nodes: values computed per vertex and interpolated per fragment.

use crate::compiler::{BodyLineOptions, Definition, EmitContext, LinesController, ShaderStage};
use crate::error::CompileError;
use crate::port::PortType;
use serde::{Deserialize, Serialize};

/// A named varying
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaryingNode {
    /// Varying name, shared by the writer and its readers
    pub name: String,
    /// Varying type
    pub port_type: PortType,
}

impl VaryingNode {
    /// Varying of the given name and type
    pub fn new(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            name: name.into(),
            port_type,
        }
    }

    /// Declared varying identifier
    pub fn varying_name(&self) -> String {
        format!("v_var_{}", self.name)
    }

    pub(crate) fn emit_write(
        &self,
        ctx: &mut EmitContext<'_>,
        lines: &mut LinesController,
    ) -> Result<(), CompileError> {
        let owner = ctx.owner();
        let varying = self.varying_name();
        let definition = Definition::varying(owner, self.port_type, &varying);
        lines.add_definitions(owner, vec![definition.clone()], None);
        // The fragment side reads it whether or not a reader exists yet
        if ctx.stage == ShaderStage::Vertex {
            lines.add_definitions(owner, vec![definition], Some(ShaderStage::Fragment));
        }
        let value = ctx.input("value")?;
        lines.add_body_lines(
            owner,
            vec![format!("{varying} = {value};")],
            None,
            BodyLineOptions::default(),
        );
        Ok(())
    }

    pub(crate) fn emit_read(
        &self,
        ctx: &mut EmitContext<'_>,
        lines: &mut LinesController,
    ) -> Result<(), CompileError> {
        let owner = ctx.owner();
        let varying = self.varying_name();
        lines.add_definitions(owner, vec![Definition::varying(owner, self.port_type, &varying)], None);
        let line = ctx.assign_output("value", &varying);
        lines.add_body_lines(owner, vec![line], None, BodyLineOptions::default());
        Ok(())
    }
}
