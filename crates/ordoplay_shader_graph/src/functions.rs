// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of named GLSL helper functions.
//!
//! Function nodes reference functions by name; the registry travels in the
//! [`CompileContext`](crate::CompileContext), so independent compiles never
//! share state.

use crate::kinds::{FunctionCall, NodeKind};
use crate::port::{PortSpec, PortType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A GLSL function callable from a function node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderFunction {
    /// GLSL identifier
    pub name: String,
    /// Description
    pub description: String,
    /// Parameters in call order
    pub inputs: Vec<PortSpec>,
    /// Return type
    pub output: PortType,
    /// Full definition text
    pub source: String,
}

impl ShaderFunction {
    /// Create a function definition
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<PortSpec>,
        output: PortType,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            inputs,
            output,
            source: source.into(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Registry of shader functions by name
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: IndexMap<String, ShaderFunction>,
}

impl FunctionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in helpers
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for function in builtins() {
            registry.register(function);
        }
        registry
    }

    /// Register a function, replacing one of the same name
    pub fn register(&mut self, function: ShaderFunction) {
        self.functions.insert(function.name.clone(), function);
    }

    /// Get a function by name
    pub fn get(&self, name: &str) -> Option<&ShaderFunction> {
        self.functions.get(name)
    }

    /// All registered functions
    pub fn functions(&self) -> impl Iterator<Item = &ShaderFunction> {
        self.functions.values()
    }

    /// Node kind calling the function `name`, with its registered signature
    pub fn call_node(&self, name: &str) -> Option<NodeKind> {
        self.get(name).map(|function| {
            NodeKind::Function(FunctionCall {
                function: function.name.clone(),
                inputs: function.inputs.clone(),
                output: function.output,
            })
        })
    }
}

fn builtins() -> Vec<ShaderFunction> {
    vec![
        ShaderFunction::new(
            "luminance",
            vec![PortSpec::new("color", PortType::Vector3)],
            PortType::Float,
            "float luminance(vec3 color) {\n\treturn dot(color, vec3(0.2126, 0.7152, 0.0722));\n}",
        )
        .with_description("Relative luminance of a linear RGB color"),
        ShaderFunction::new(
            "hash12",
            vec![PortSpec::new("p", PortType::Vector2)],
            PortType::Float,
            "float hash12(vec2 p) {\n\tvec3 p3 = fract(vec3(p.xyx) * 0.1031);\n\tp3 += dot(p3, p3.yzx + 33.33);\n\treturn fract((p3.x + p3.y) * p3.z);\n}",
        )
        .with_description("Pseudo-random value in [0, 1) from a 2D seed"),
        ShaderFunction::new(
            "rotate2d",
            vec![
                PortSpec::new("v", PortType::Vector2),
                PortSpec::new("angle", PortType::Float),
            ],
            PortType::Vector2,
            "vec2 rotate2d(vec2 v, float angle) {\n\tfloat s = sin(angle);\n\tfloat c = cos(angle);\n\treturn vec2(c * v.x - s * v.y, s * v.x + c * v.y);\n}",
        )
        .with_description("Rotate a 2D vector counter-clockwise"),
        ShaderFunction::new(
            "remap",
            vec![
                PortSpec::new("x", PortType::Float),
                PortSpec::new("from_min", PortType::Float),
                PortSpec::new("from_max", PortType::Float),
                PortSpec::new("to_min", PortType::Float),
                PortSpec::new("to_max", PortType::Float),
            ],
            PortType::Float,
            "float remap(float x, float from_min, float from_max, float to_min, float to_max) {\n\treturn to_min + (x - from_min) * (to_max - to_min) / (from_max - from_min);\n}",
        )
        .with_description("Linearly map a value between ranges"),
    ]
}
