// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output nodes: the roots of a compile pass.

use crate::port::{Port, PortType, PortValue};
use serde::{Deserialize, Serialize};

/// Which backend an output node feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputTarget {
    /// Vertex position/normal and fragment color/alpha
    Material,
    /// Per-particle position and velocity for the next frame
    Particles,
    /// Per-point position, normal and color
    Points,
}

impl OutputTarget {
    /// Input ports of an output node for this target
    pub fn inputs(&self) -> Vec<Port> {
        match self {
            Self::Material => vec![
                Port::input("position", PortType::Vector3),
                Port::input("normal", PortType::Vector3),
                Port::input("color", PortType::Vector3).with_default(PortValue::Vector3([1.0; 3])),
                Port::input("alpha", PortType::Float).with_default(PortValue::Float(1.0)),
            ],
            Self::Particles => vec![
                Port::input("position", PortType::Vector3),
                Port::input("velocity", PortType::Vector3),
            ],
            Self::Points => vec![
                Port::input("position", PortType::Vector3),
                Port::input("normal", PortType::Vector3),
                Port::input("color", PortType::Vector3),
            ],
        }
    }

    /// Backend name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::Material => "material",
            Self::Particles => "particles",
            Self::Points => "points",
        }
    }
}
