// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compiler configuration.
//!
//! [`CompilerConfig`] is composed of one options struct per concern. Each
//! part has its own defaults and can be loaded or replaced on its own; the
//! builder combines them.

use crate::compiler::PrecisionQualifier;
use crate::error::CompileError;
use crate::functions::FunctionRegistry;
use serde::{Deserialize, Serialize};

/// Text layout of generated code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormattingOptions {
    /// One indentation unit
    pub indent: String,
    /// Default float precision declared in every stage
    pub precision: PrecisionQualifier,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            indent: "\t".to_string(),
            precision: PrecisionQualifier::High,
        }
    }
}

/// Material backend options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialOptions {
    /// Replaces the built-in vertex template
    pub vertex_template: Option<String>,
    /// Replaces the built-in fragment template
    pub fragment_template: Option<String>,
}

/// Particle simulation backend options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticlesOptions {
    /// Float channels available per state texture
    pub channels_per_texture: u8,
    /// Prefix of the sampler uniform of each state texture
    pub texture_prefix: String,
}

impl Default for ParticlesOptions {
    fn default() -> Self {
        Self {
            channels_per_texture: 4,
            texture_prefix: "texture_".to_string(),
        }
    }
}

impl ParticlesOptions {
    /// Channels of an RGBA render target
    pub const MAX_CHANNELS_PER_TEXTURE: u8 = 4;

    /// Reject packings no render target can hold
    pub fn validate(&self) -> Result<(), CompileError> {
        if !(1..=Self::MAX_CHANNELS_PER_TEXTURE).contains(&self.channels_per_texture) {
            return Err(CompileError::InvalidConfig {
                option: "particles.channels_per_texture",
                reason: format!(
                    "{} is outside 1..={}",
                    self.channels_per_texture,
                    Self::MAX_CHANNELS_PER_TEXTURE
                ),
            });
        }
        Ok(())
    }
}

/// Point builder backend options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointOptions {
    /// Name of the generated function
    pub function_name: String,
    /// Name of its `inout Point` parameter
    pub point_variable: String,
}

impl Default for PointOptions {
    fn default() -> Self {
        Self {
            function_name: "build_point".to_string(),
            point_variable: "point".to_string(),
        }
    }
}

/// Complete compiler configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Text layout
    pub formatting: FormattingOptions,
    /// Material backend
    pub material: MaterialOptions,
    /// Particle backend
    pub particles: ParticlesOptions,
    /// Point builder backend
    pub points: PointOptions,
}

impl CompilerConfig {
    /// Start from defaults
    pub fn builder() -> CompilerConfigBuilder {
        CompilerConfigBuilder::default()
    }

    /// Check every part
    pub fn validate(&self) -> Result<(), CompileError> {
        self.particles.validate()
    }

    /// Parse a RON config; omitted sections keep their defaults
    pub fn from_ron_str(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Pretty RON text of this config
    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        ron::ser::to_string_pretty(self, config)
    }
}

/// Assembles a [`CompilerConfig`] part by part
#[derive(Debug, Clone, Default)]
pub struct CompilerConfigBuilder {
    config: CompilerConfig,
}

impl CompilerConfigBuilder {
    /// Set the formatting options
    pub fn formatting(mut self, formatting: FormattingOptions) -> Self {
        self.config.formatting = formatting;
        self
    }

    /// Set the material options
    pub fn material(mut self, material: MaterialOptions) -> Self {
        self.config.material = material;
        self
    }

    /// Set the particle options
    pub fn particles(mut self, particles: ParticlesOptions) -> Self {
        self.config.particles = particles;
        self
    }

    /// Set the point builder options
    pub fn points(mut self, points: PointOptions) -> Self {
        self.config.points = points;
        self
    }

    /// Set just the indent unit
    pub fn indent(mut self, indent: impl Into<String>) -> Self {
        self.config.formatting.indent = indent.into();
        self
    }

    /// Finish
    pub fn build(self) -> CompilerConfig {
        self.config
    }
}

/// Everything a compile pass reads besides the graph
#[derive(Debug, Clone)]
pub struct CompileContext {
    /// Configuration
    pub config: CompilerConfig,
    /// Functions callable from function nodes
    pub functions: FunctionRegistry,
}

impl CompileContext {
    /// Context with the given config and the built-in functions
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            functions: FunctionRegistry::with_builtins(),
        }
    }
}

impl Default for CompileContext {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}
