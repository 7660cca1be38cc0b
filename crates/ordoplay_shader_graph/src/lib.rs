// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader node graph compiler for `OrdoPlay`.
//!
//! This crate turns a dataflow graph of typed shader nodes into ordered,
//! deduplicated GLSL source per execution stage. It powers:
//! - Material graphs (vertex + fragment shaders)
//! - Particle simulation graphs (one fragment shader per state texture)
//! - Point builder graphs (a per-point evaluator function)
//!
//! ## Architecture
//!
//! The compiler is built on:
//! - A typed graph model with validated connections and subnet nesting
//! - A traverser computing stage-relevant, dependency-ordered node lists
//! - A code builder driving each node kind's emission into a lines controller
//! - Backend assemblers splicing the collected lines into shader templates

pub mod node;
pub mod port;
pub mod connection;
pub mod graph;
pub mod document;
pub mod error;
pub mod config;
pub mod functions;
pub mod kinds;
pub mod compiler;
pub mod assemblers;

pub use node::{Node, NodeId, NodeRef};
pub use port::{ElementType, Port, PortDirection, PortSpec, PortType, PortValue};
pub use connection::{Connection, ConnectionId};
pub use graph::{ConnectionError, Graph};
pub use document::{DocumentError, GraphDocument};
pub use error::CompileError;
pub use config::{CompileContext, CompilerConfig};
pub use functions::{FunctionRegistry, ShaderFunction};
pub use kinds::{MathOp, NodeKind, OutputTarget, ScopeBlock};
pub use compiler::{LinesController, ShaderStage};
pub use assemblers::{
    Assembler, MaterialAssembler, MaterialProgram, ParticlesAssembler, ParticlesProgram,
    PointBuilderAssembler, PointProgram, ShaderArtifact,
};
