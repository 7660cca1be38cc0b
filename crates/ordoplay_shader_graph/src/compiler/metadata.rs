// SPDX-License-Identifier: MIT OR Apache-2.0
//! What a compiled program needs from its host.

use crate::port::{PortType, PortValue};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// A param node bound to a uniform
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamBinding {
    /// Path of the first param node that declared the parameter
    pub node: String,
    /// Parameter name
    pub param: String,
    /// Uniform the host uploads the value to
    pub uniform: String,
    /// Uniform type
    pub port_type: PortType,
    /// Initial value
    pub default: PortValue,
}

/// Collected during a pass alongside the lines
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgramMetadata {
    /// Parameter bindings by parameter name
    pub params: IndexMap<String, ParamBinding>,
    /// The program reads elapsed time and must re-run every frame
    pub time_dependent: bool,
    /// The program reads the viewport/target size
    pub resolution_dependent: bool,
    /// Attributes the program reads
    pub attributes_read: IndexSet<String>,
    /// Attributes the program writes
    pub attributes_written: IndexSet<String>,
}
