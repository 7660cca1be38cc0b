// SPDX-License-Identifier: MIT OR Apache-2.0
//! Attribute nodes.
//!
//! An attribute is a named value that lives outside the program: a vertex
//! attribute for materials, a texture channel for particles, a field of the
//! point record for point builders. Reading is always possible; connecting
//! the `export` input writes the value back where the backend supports it.

use crate::port::{Port, PortType};
use serde::{Deserialize, Serialize};

/// Name of the input that writes the attribute back
pub const EXPORT_INPUT: &str = "export";

/// Reads and optionally writes a named attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeNode {
    /// Attribute name
    pub name: String,
    /// Attribute type
    pub port_type: PortType,
}

impl AttributeNode {
    /// Attribute of the given name and type
    pub fn new(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            name: name.into(),
            port_type,
        }
    }

    pub(crate) fn ports(&self) -> (Vec<Port>, Vec<Port>) {
        (
            vec![Port::input(EXPORT_INPUT, self.port_type)],
            vec![Port::output("value", self.port_type)],
        )
    }
}
