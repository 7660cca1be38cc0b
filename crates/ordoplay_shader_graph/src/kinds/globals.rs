// SPDX-License-Identifier: MIT OR Apache-2.0
//! Globals node: host-provided values.
//!
//! Each backend resolves the outputs differently; this module only fixes the
//! port layout and the shared emission loop.

use crate::compiler::{BodyLineOptions, EmitContext, LinesController};
use crate::error::CompileError;
use crate::port::{Port, PortType};

/// Elapsed time in seconds
pub const TIME: &str = "time";
/// Viewport or render-target size in pixels
pub const RESOLUTION: &str = "resolution";
/// Screen-space position of the current fragment
pub const FRAG_COORD: &str = "frag_coord";
/// Object-space position of the current vertex/particle/point
pub const POSITION: &str = "position";
/// Texture coordinate of the current vertex/particle/point
pub const UV: &str = "uv";

pub(crate) fn outputs() -> Vec<Port> {
    vec![
        Port::output(TIME, PortType::Float),
        Port::output(RESOLUTION, PortType::Vector2),
        Port::output(FRAG_COORD, PortType::Vector4),
        Port::output(POSITION, PortType::Vector3),
        Port::output(UV, PortType::Vector2),
    ]
}

/// Emit one local per connected output, asking `resolve` for its expression.
///
/// Unconnected outputs are skipped, so a globals node only declares (and
/// flags the program for) the values something actually uses.
pub(crate) fn emit_with(
    ctx: &mut EmitContext<'_>,
    lines: &mut LinesController,
    mut resolve: impl FnMut(&str, &mut EmitContext<'_>, &mut LinesController) -> Result<String, CompileError>,
) -> Result<(), CompileError> {
    let connected: Vec<String> = ctx
        .connected_outputs()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut body = Vec::with_capacity(connected.len());
    for output in &connected {
        let expr = resolve(output, ctx, lines)?;
        body.push(ctx.assign_output(output, &expr));
    }
    lines.add_body_lines(ctx.owner(), body, None, BodyLineOptions::default());
    Ok(())
}
