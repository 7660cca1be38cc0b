// SPDX-License-Identifier: MIT OR Apache-2.0
//! The node-graph-to-shader compiler core.
//!
//! A compile pass hands the root nodes to a [`CodeBuilder`], which asks the
//! [`GraphTraverser`] for the dependency order of every stage and lets each
//! node emit [`Definition`]s and body lines into a [`LinesController`].
//! Subnets run a nested pass (see [`scope`]) and are spliced back in.

pub mod builder;
pub mod collection;
pub mod definition;
pub mod emit;
pub mod metadata;
pub mod scope;
pub mod traverser;

pub use builder::CodeBuilder;
pub use collection::{BodyLineOptions, CodeLine, DefinitionConflict, LinesController};
pub use definition::{Definition, DefinitionKind, PrecisionQualifier};
pub use emit::EmitContext;
pub use metadata::{ParamBinding, ProgramMetadata};
pub use scope::Scope;
pub use traverser::{GraphTraverser, InputFilter, Traversal, TraversalMode};

use serde::{Deserialize, Serialize};
use std::fmt;

/// An execution phase of a generated program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShaderStage {
    /// Material vertex shader
    Vertex,
    /// Material fragment shader
    Fragment,
    /// Particle simulation shader writing the render target with this index
    Simulation(u8),
    /// Point builder function
    Point,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
            Self::Simulation(index) => write!(f, "simulation_{index}"),
            Self::Point => f.write_str("point"),
        }
    }
}
