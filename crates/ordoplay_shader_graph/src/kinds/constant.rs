// SPDX-License-Identifier: MIT OR Apache-2.0
//! Constant node emission.

use crate::compiler::{BodyLineOptions, EmitContext, LinesController};
use crate::error::CompileError;
use crate::port::PortValue;

pub(crate) fn emit(
    value: &PortValue,
    ctx: &mut EmitContext<'_>,
    lines: &mut LinesController,
) -> Result<(), CompileError> {
    let line = ctx.assign_output("value", &value.literal());
    lines.add_body_lines(ctx.owner(), vec![line], None, BodyLineOptions::default());
    Ok(())
}
