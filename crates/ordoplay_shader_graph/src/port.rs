// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.
//!
//! A port's [`PortType`] drives both connection validation and the GLSL type
//! used when a value flowing through it is declared.

use serde::{Deserialize, Serialize};

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// Element type of an array port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// `float`
    Float,
    /// `vec2`
    Vector2,
    /// `vec3`
    Vector3,
    /// `vec4`
    Vector4,
}

impl ElementType {
    /// The scalar/vector type of a single element
    pub fn port_type(self) -> PortType {
        match self {
            Self::Float => PortType::Float,
            Self::Vector2 => PortType::Vector2,
            Self::Vector3 => PortType::Vector3,
            Self::Vector4 => PortType::Vector4,
        }
    }
}

/// Data type that can flow through ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    /// Boolean value
    Bool,
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// 4D vector
    Vector4,
    /// Texture sampler (declarations only, never wired between nodes)
    Texture,
    /// Fixed-size array
    Array(ElementType, u16),
}

impl PortType {
    /// GLSL type name
    pub fn glsl_name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Vector2 => "vec2",
            Self::Vector3 => "vec3",
            Self::Vector4 => "vec4",
            Self::Texture => "sampler2D",
            Self::Array(element, _) => element.port_type().glsl_name(),
        }
    }

    /// Declarator for a variable of this type, e.g. `vec3 v_normal` or `float weights[4]`
    pub fn declare(&self, name: &str) -> String {
        match self {
            Self::Array(_, len) => format!("{} {name}[{len}]", self.glsl_name()),
            _ => format!("{} {name}", self.glsl_name()),
        }
    }

    /// Number of float channels this type occupies in a render target
    pub fn components(&self) -> u8 {
        match self {
            Self::Bool | Self::Int | Self::Float => 1,
            Self::Vector2 => 2,
            Self::Vector3 => 3,
            Self::Vector4 => 4,
            Self::Texture | Self::Array(..) => 0,
        }
    }

    /// Zero value literal of this type
    pub fn zero_literal(&self) -> String {
        match self {
            Self::Bool => "false".to_string(),
            Self::Int => "0".to_string(),
            Self::Float => "0.0".to_string(),
            Self::Vector2 | Self::Vector3 | Self::Vector4 => format!("{}(0.0)", self.glsl_name()),
            Self::Texture => String::new(),
            Self::Array(element, len) => {
                let zero = element.port_type().zero_literal();
                let items = vec![zero; usize::from(*len)].join(", ");
                format!("{}[{len}]({items})", self.glsl_name())
            }
        }
    }

    /// Check if this type can connect to another type
    pub fn can_connect_to(&self, other: &PortType) -> bool {
        // Same types can always connect
        if self == other {
            return true;
        }

        // Implicit conversions
        match (self, other) {
            // Numeric conversions
            (Self::Int, Self::Float) | (Self::Float, Self::Int) => true,
            // Vector conversions
            (Self::Float, Self::Vector2 | Self::Vector3 | Self::Vector4) => true,
            (Self::Vector2, Self::Vector3 | Self::Vector4) => true,
            (Self::Vector3, Self::Vector4) => true,
            // No other implicit conversions
            _ => false,
        }
    }

    /// Float vector with `components` components, `float` for one
    pub fn float_vector(components: u8) -> Option<Self> {
        match components {
            1 => Some(Self::Float),
            2 => Some(Self::Vector2),
            3 => Some(Self::Vector3),
            4 => Some(Self::Vector4),
            _ => None,
        }
    }

    /// Wrap `expr` (of this type) so it evaluates to `to`.
    ///
    /// Covers the pairs accepted by [`PortType::can_connect_to`] plus the
    /// `bool`/`int` casts to and from `float` used by texture storage;
    /// anything else is returned unchanged.
    pub fn convert_expr(&self, to: &PortType, expr: &str) -> String {
        match (self, to) {
            (a, b) if a == b => expr.to_string(),
            (Self::Int | Self::Bool, Self::Float) => format!("float({expr})"),
            (Self::Float, Self::Int) => format!("int({expr})"),
            (Self::Float, Self::Bool) => format!("bool({expr})"),
            (Self::Float, Self::Vector2 | Self::Vector3 | Self::Vector4) => {
                format!("{}({expr})", to.glsl_name())
            }
            (Self::Vector2, Self::Vector3) => format!("vec3({expr}, 0.0)"),
            (Self::Vector2, Self::Vector4) => format!("vec4({expr}, 0.0, 1.0)"),
            (Self::Vector3, Self::Vector4) => format!("vec4({expr}, 1.0)"),
            _ => expr.to_string(),
        }
    }
}

/// A port on a node
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    /// Port name, unique per direction on a node
    pub name: String,
    /// Port direction
    pub direction: PortDirection,
    /// Data type
    pub port_type: PortType,
    /// Default value (for inputs)
    pub default_value: Option<PortValue>,
    /// Whether this port must be connected (for inputs)
    pub required: bool,
}

impl Port {
    /// Create a new input port
    pub fn input(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Input,
            port_type,
            default_value: None,
            required: false,
        }
    }

    /// Create a new output port
    pub fn output(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            name: name.into(),
            direction: PortDirection::Output,
            port_type,
            default_value: None,
            required: false,
        }
    }

    /// Set the default value
    pub fn with_default(mut self, value: PortValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Check if a connection to another port is valid
    pub fn can_connect(&self, other: &Port) -> bool {
        // Must be opposite directions
        if self.direction == other.direction {
            return false;
        }

        // Check type compatibility, always from the output side
        let (from, to) = match self.direction {
            PortDirection::Output => (self, other),
            PortDirection::Input => (other, self),
        };
        from.port_type.can_connect_to(&to.port_type)
    }
}

/// Name and type of a port declared by data rather than by a node kind
/// (subnet boundaries, function signatures)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    /// Port name
    pub name: String,
    /// Data type
    pub port_type: PortType,
}

impl PortSpec {
    /// Create a port spec
    pub fn new(name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            name: name.into(),
            port_type,
        }
    }
}

/// Value that can be stored in a port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PortValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// 2D vector
    Vector2([f32; 2]),
    /// 3D vector
    Vector3([f32; 3]),
    /// 4D vector
    Vector4([f32; 4]),
}

impl PortValue {
    /// Get the port type for this value
    pub fn port_type(&self) -> PortType {
        match self {
            Self::Bool(_) => PortType::Bool,
            Self::Int(_) => PortType::Int,
            Self::Float(_) => PortType::Float,
            Self::Vector2(_) => PortType::Vector2,
            Self::Vector3(_) => PortType::Vector3,
            Self::Vector4(_) => PortType::Vector4,
        }
    }

    /// A value of `port_type` with every component set to `value`.
    ///
    /// Returns `None` for types without a literal form (textures, arrays).
    pub fn splat(value: f32, port_type: PortType) -> Option<Self> {
        match port_type {
            PortType::Bool => Some(Self::Bool(value != 0.0)),
            PortType::Int => Some(Self::Int(value as i32)),
            PortType::Float => Some(Self::Float(value)),
            PortType::Vector2 => Some(Self::Vector2([value; 2])),
            PortType::Vector3 => Some(Self::Vector3([value; 3])),
            PortType::Vector4 => Some(Self::Vector4([value; 4])),
            PortType::Texture | PortType::Array(..) => None,
        }
    }

    /// GLSL literal for this value
    pub fn literal(&self) -> String {
        match self {
            Self::Bool(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => float_literal(*v),
            Self::Vector2(v) => vector_literal("vec2", v),
            Self::Vector3(v) => vector_literal("vec3", v),
            Self::Vector4(v) => vector_literal("vec4", v),
        }
    }
}

fn vector_literal(type_name: &str, components: &[f32]) -> String {
    let parts: Vec<String> = components.iter().copied().map(float_literal).collect();
    format!("{type_name}({})", parts.join(", "))
}

/// Format a float so GLSL always parses it as a float (`1` becomes `1.0`)
pub fn float_literal(value: f32) -> String {
    if !value.is_finite() {
        tracing::warn!("non-finite float {value} replaced by 0.0");
        return "0.0".to_string();
    }
    let text = format!("{value:?}");
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{text}.0")
    }
}
