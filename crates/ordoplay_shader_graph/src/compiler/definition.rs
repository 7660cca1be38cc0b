// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed declarations.
//!
//! A [`Definition`] is anything that lives outside `main()`: attributes,
//! varyings, uniforms, helper functions and precision statements. Two
//! definitions with the same `(kind, name)` key render the same text, so the
//! [`LinesController`](super::LinesController) keeps only the first one.

use crate::node::NodeId;
use crate::port::PortType;
use serde::{Deserialize, Serialize};

/// Declaration category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DefinitionKind {
    /// `precision highp float;`
    Precision,
    /// `attribute vec3 position;`
    Attribute,
    /// `varying vec2 v_uv;`
    Varying,
    /// `uniform float time;`
    Uniform,
    /// A helper function
    Function,
}

/// Float precision qualifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PrecisionQualifier {
    /// `lowp`
    Low,
    /// `mediump`
    Medium,
    /// `highp`
    #[default]
    High,
}

impl PrecisionQualifier {
    /// GLSL keyword
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Low => "lowp",
            Self::Medium => "mediump",
            Self::High => "highp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Payload {
    None,
    Source(String),
    Qualifier(PrecisionQualifier),
}

/// A typed declaration owned by a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    kind: DefinitionKind,
    port_type: PortType,
    name: String,
    owner: NodeId,
    payload: Payload,
}

impl Definition {
    fn new(kind: DefinitionKind, owner: NodeId, port_type: PortType, name: impl Into<String>) -> Self {
        Self {
            kind,
            port_type,
            name: name.into(),
            owner,
            payload: Payload::None,
        }
    }

    /// `attribute <type> <name>;`
    pub fn attribute(owner: NodeId, port_type: PortType, name: impl Into<String>) -> Self {
        Self::new(DefinitionKind::Attribute, owner, port_type, name)
    }

    /// `varying <type> <name>;`
    pub fn varying(owner: NodeId, port_type: PortType, name: impl Into<String>) -> Self {
        Self::new(DefinitionKind::Varying, owner, port_type, name)
    }

    /// `uniform <type> <name>;`
    pub fn uniform(owner: NodeId, port_type: PortType, name: impl Into<String>) -> Self {
        Self::new(DefinitionKind::Uniform, owner, port_type, name)
    }

    /// A function named `name` returning `return_type`, rendered as `source`
    pub fn function(
        owner: NodeId,
        return_type: PortType,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            payload: Payload::Source(source.into()),
            ..Self::new(DefinitionKind::Function, owner, return_type, name)
        }
    }

    /// `precision <qualifier> float;`
    pub fn precision(owner: NodeId, qualifier: PrecisionQualifier) -> Self {
        Self {
            payload: Payload::Qualifier(qualifier),
            ..Self::new(DefinitionKind::Precision, owner, PortType::Float, "float")
        }
    }

    /// Declaration category
    pub fn kind(&self) -> DefinitionKind {
        self.kind
    }

    /// Declared name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type
    pub fn port_type(&self) -> PortType {
        self.port_type
    }

    /// Node that emitted the definition
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Function source, for function definitions
    pub fn source(&self) -> Option<&str> {
        match &self.payload {
            Payload::Source(source) => Some(source),
            _ => None,
        }
    }

    /// Identity used for deduplication
    pub fn key(&self) -> (DefinitionKind, &str) {
        (self.kind, &self.name)
    }

    /// The same declaration attributed to another node
    pub fn rehomed(&self, owner: NodeId) -> Self {
        Self {
            owner,
            ..self.clone()
        }
    }

    /// Rendered declaration text
    pub fn line(&self) -> String {
        match (&self.kind, &self.payload) {
            (DefinitionKind::Precision, Payload::Qualifier(qualifier)) => {
                format!("precision {} {};", qualifier.keyword(), self.name)
            }
            (DefinitionKind::Precision, _) => format!("precision highp {};", self.name),
            (DefinitionKind::Attribute, _) => format!("attribute {};", self.port_type.declare(&self.name)),
            (DefinitionKind::Varying, _) => format!("varying {};", self.port_type.declare(&self.name)),
            (DefinitionKind::Uniform, _) => format!("uniform {};", self.port_type.declare(&self.name)),
            (DefinitionKind::Function, Payload::Source(source)) => source.trim_end().to_string(),
            (DefinitionKind::Function, _) => String::new(),
        }
    }
}
