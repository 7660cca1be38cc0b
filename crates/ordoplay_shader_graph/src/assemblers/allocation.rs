// SPDX-License-Identifier: MIT OR Apache-2.0
//! Texture channel allocation for particle state.
//!
//! Every simulated attribute lives in channels of a persistent render
//! target: frame N reads what frame N-1 wrote. Moving an attribute to other
//! channels corrupts the state in flight, so the table is only rebuilt when
//! the set of attributes (or the packing options) changes.

use crate::config::ParticlesOptions;
use crate::error::CompileError;
use crate::node::NodeRef;
use crate::port::PortType;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

const SWIZZLE: &str = "xyzw";

/// Attribute every particle system stores, always in the first channels
pub const POSITION: &str = "position";

/// An attribute the graph reads or writes, found before compiling
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRequest {
    /// Attribute name
    pub name: String,
    /// Type requested by the node
    pub port_type: PortType,
    /// Requesting node
    pub node: NodeRef,
}

/// Where one attribute lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeAllocation {
    /// Attribute name
    pub name: String,
    /// Stored type (the widest requested)
    pub port_type: PortType,
    /// Index of the state texture, which is also the simulation stage index
    pub texture: u8,
    /// First channel
    pub offset: u8,
}

impl AttributeAllocation {
    /// Channels holding the first `components` components, e.g. `yzw`
    pub fn swizzle(&self, components: u8) -> &'static str {
        let start = usize::from(self.offset);
        let len = usize::from(components.min(self.port_type.components()));
        SWIZZLE.get(start..start + len).unwrap_or_default()
    }
}

/// One persistent render target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateTexture {
    /// Texture index
    pub index: u8,
    /// Sampler uniform name
    pub name: String,
    /// Attributes packed into it, in channel order
    pub attributes: Vec<String>,
    /// Channels in use
    pub used: u8,
}

/// The attribute → (texture, channel) table of a particle system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TextureAllocations {
    /// Bumped whenever the table is rebuilt
    pub generation: u64,
    /// Allocations by attribute name
    pub attributes: IndexMap<String, AttributeAllocation>,
    /// Textures in index order
    pub textures: Vec<StateTexture>,
    #[serde(skip)]
    signature: Vec<(String, PortType)>,
    #[serde(skip)]
    options: Option<(u8, String)>,
}

impl TextureAllocations {
    /// Allocation of `name`
    pub fn get(&self, name: &str) -> Option<&AttributeAllocation> {
        self.attributes.get(name)
    }

    /// Sampler uniform of texture `index`
    pub fn texture_name(&self, index: u8) -> Option<&str> {
        self.textures.get(usize::from(index)).map(|t| t.name.as_str())
    }

    /// Number of state textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Bring the table in line with `requests`.
    ///
    /// Returns `true` when the table was rebuilt; an unchanged attribute set
    /// keeps every channel where it is.
    pub fn update(
        &mut self,
        requests: &[AttributeRequest],
        options: &ParticlesOptions,
    ) -> Result<bool, CompileError> {
        options.validate()?;
        let signature = signature(requests, options)?;
        let packing = Some((options.channels_per_texture, options.texture_prefix.clone()));
        if signature == self.signature && packing == self.options && !self.textures.is_empty() {
            debug!(generation = self.generation, "Texture allocation reused");
            return Ok(false);
        }

        let mut attributes = IndexMap::new();
        let mut textures: Vec<StateTexture> = Vec::new();
        for (name, port_type) in &signature {
            let components = port_type.components();
            let slot = textures
                .iter()
                .position(|t| t.used + components <= options.channels_per_texture);
            let index = match slot {
                Some(index) => index,
                None => {
                    textures.push(StateTexture {
                        index: u8::try_from(textures.len()).unwrap_or(u8::MAX),
                        name: String::new(),
                        attributes: Vec::new(),
                        used: 0,
                    });
                    textures.len() - 1
                }
            };
            let texture = &mut textures[index];
            attributes.insert(
                name.clone(),
                AttributeAllocation {
                    name: name.clone(),
                    port_type: *port_type,
                    texture: texture.index,
                    offset: texture.used,
                },
            );
            texture.used += components;
            texture.attributes.push(name.clone());
        }
        for texture in &mut textures {
            texture.name = format!("{}{}", options.texture_prefix, texture.attributes.join("_"));
        }

        self.generation += 1;
        self.attributes = attributes;
        self.textures = textures;
        self.signature = signature;
        self.options = packing;
        info!(
            generation = self.generation,
            textures = self.textures.len(),
            attributes = self.attributes.len(),
            "Texture allocation rebuilt"
        );
        Ok(true)
    }
}

/// Distinct attributes with their widest requested type, position first,
/// then in request order
fn signature(
    requests: &[AttributeRequest],
    options: &ParticlesOptions,
) -> Result<Vec<(String, PortType)>, CompileError> {
    if PortType::Vector3.components() > options.channels_per_texture {
        return Err(CompileError::InvalidConfig {
            option: "particles.channels_per_texture",
            reason: format!(
                "{} channels cannot hold the vec3 {POSITION}",
                options.channels_per_texture
            ),
        });
    }
    let mut merged: IndexMap<&str, PortType> = IndexMap::new();
    merged.insert(POSITION, PortType::Vector3);
    for request in requests {
        let components = request.port_type.components();
        if components == 0 || components > options.channels_per_texture {
            return Err(CompileError::UnsupportedAttributeType {
                node: request.node.clone(),
                attribute: request.name.clone(),
                ty: request.port_type.glsl_name(),
            });
        }
        let entry = merged.entry(request.name.as_str()).or_insert(request.port_type);
        if components > entry.components() {
            *entry = request.port_type;
        }
    }
    Ok(merged
        .into_iter()
        .map(|(name, port_type)| (name.to_string(), port_type))
        .collect())
}
