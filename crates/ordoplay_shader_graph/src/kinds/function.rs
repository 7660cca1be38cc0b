// SPDX-License-Identifier: MIT OR Apache-2.0
//! Function call nodes.

use crate::compiler::{BodyLineOptions, Definition, EmitContext, LinesController};
use crate::error::CompileError;
use crate::port::{Port, PortSpec, PortType};
use serde::{Deserialize, Serialize};

/// Calls a function resolved through the compile context's
/// [`FunctionRegistry`](crate::FunctionRegistry)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Registered function name
    pub function: String,
    /// Arguments in call order
    pub inputs: Vec<PortSpec>,
    /// Return type, exposed as the `result` output
    pub output: PortType,
}

impl FunctionCall {
    // Arguments have no default: every one must be wired
    pub(crate) fn ports(&self) -> (Vec<Port>, Vec<Port>) {
        let inputs = self
            .inputs
            .iter()
            .map(|spec| Port::input(&spec.name, spec.port_type).required())
            .collect();
        (inputs, vec![Port::output("result", self.output)])
    }

    pub(crate) fn emit(
        &self,
        ctx: &mut EmitContext<'_>,
        lines: &mut LinesController,
    ) -> Result<(), CompileError> {
        let function = ctx
            .context
            .functions
            .get(&self.function)
            .ok_or_else(|| CompileError::UnknownFunction {
                node: ctx.node_ref(),
                function: self.function.clone(),
            })?;
        let owner = ctx.owner();
        lines.add_definitions(
            owner,
            vec![Definition::function(
                owner,
                function.output,
                &function.name,
                &function.source,
            )],
            None,
        );

        let args = self
            .inputs
            .iter()
            .map(|spec| ctx.input(&spec.name))
            .collect::<Result<Vec<_>, _>>()?;
        let call = format!("{}({})", function.name, args.join(", "));
        let line = ctx.assign_output("result", &call);
        lines.add_body_lines(owner, vec![line], None, BodyLineOptions::default());
        Ok(())
    }
}
