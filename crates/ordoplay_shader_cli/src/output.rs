// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compiling a graph into files and writing them out.

use crate::Backend;
use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use ordoplay_shader_graph::assemblers::{FreeVariable, TextureAllocations};
use ordoplay_shader_graph::compiler::ParamBinding;
use ordoplay_shader_graph::{
    CompileContext, Graph, MaterialAssembler, ParticlesAssembler, PointBuilderAssembler,
    ShaderArtifact,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One artifact per backend, kept across recompiles
pub enum Compiler {
    /// Material backend
    Material(ShaderArtifact<MaterialAssembler>),
    /// Particle backend, which also keeps its channel allocation
    Particles(ShaderArtifact<ParticlesAssembler>),
    /// Point builder backend
    Points(ShaderArtifact<PointBuilderAssembler>),
}

/// Everything written for one successful compile
#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    /// File stem derived from the graph name
    pub graph: String,
    /// `(file name, contents)` per stage
    pub files: Vec<(String, String)>,
    /// Pretty-printed JSON manifest
    pub manifest: String,
}

#[derive(Serialize)]
struct Manifest<'a> {
    graph: &'a str,
    backend: &'static str,
    files: Vec<&'a str>,
    params: &'a IndexMap<String, ParamBinding>,
    time_dependent: bool,
    #[serde(flatten)]
    details: Details<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Details<'a> {
    Material {
        resolution_dependent: bool,
    },
    Particles {
        allocations: &'a TextureAllocations,
    },
    Points {
        free_variables: &'a [FreeVariable],
        attributes_read: &'a IndexSet<String>,
        attributes_written: &'a IndexSet<String>,
    },
}

impl Compiler {
    /// Fresh artifact for `backend`
    pub fn new(backend: Backend) -> Self {
        match backend {
            Backend::Material => Self::Material(ShaderArtifact::new(MaterialAssembler::new())),
            Backend::Particles => Self::Particles(ShaderArtifact::new(ParticlesAssembler::new())),
            Backend::Points => Self::Points(ShaderArtifact::new(PointBuilderAssembler::new())),
        }
    }

    /// Backend of this compiler
    pub fn backend(&self) -> Backend {
        match self {
            Self::Material(_) => Backend::Material,
            Self::Particles(_) => Backend::Particles,
            Self::Points(_) => Backend::Points,
        }
    }

    /// Compile `graph` into stage files and a manifest.
    ///
    /// Errors are attached to the graph and the previous output is kept by
    /// the artifact.
    pub fn compile(&mut self, graph: &mut Graph, context: &CompileContext) -> Result<Artifacts> {
        let backend = self.backend().name();
        let title = graph.name.clone();
        let name = file_stem(&title);
        let (files, manifest) = match self {
            Self::Material(artifact) => {
                let program = artifact.compile(graph, context)?;
                let files = vec![
                    (format!("{name}.vert"), program.vertex.clone()),
                    (format!("{name}.frag"), program.fragment.clone()),
                ];
                let manifest = Manifest {
                    graph: &title,
                    backend,
                    files: file_names(&files),
                    params: &program.params,
                    time_dependent: program.time_dependent,
                    details: Details::Material {
                        resolution_dependent: program.resolution_dependent,
                    },
                };
                let json = serde_json::to_string_pretty(&manifest)?;
                (files, json)
            }
            Self::Particles(artifact) => {
                let program = artifact.compile(graph, context)?;
                let files: Vec<(String, String)> = program
                    .shaders
                    .iter()
                    .map(|shader| (format!("{name}.sim{}.frag", shader.index), shader.source.clone()))
                    .collect();
                let manifest = Manifest {
                    graph: &title,
                    backend,
                    files: file_names(&files),
                    params: &program.params,
                    time_dependent: program.time_dependent,
                    details: Details::Particles {
                        allocations: &program.allocations,
                    },
                };
                let json = serde_json::to_string_pretty(&manifest)?;
                (files, json)
            }
            Self::Points(artifact) => {
                let program = artifact.compile(graph, context)?;
                let files = vec![(format!("{name}.point.glsl"), program.source.clone())];
                let manifest = Manifest {
                    graph: &title,
                    backend,
                    files: file_names(&files),
                    params: &program.params,
                    time_dependent: program.time_dependent,
                    details: Details::Points {
                        free_variables: &program.free_variables,
                        attributes_read: &program.attributes_read,
                        attributes_written: &program.attributes_written,
                    },
                };
                let json = serde_json::to_string_pretty(&manifest)?;
                (files, json)
            }
        };
        Ok(Artifacts {
            graph: name,
            files,
            manifest,
        })
    }
}

/// Graph names come from the document; keep only characters that cannot
/// leave the output directory
fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "graph".to_string()
    } else {
        stem
    }
}

fn file_names(files: &[(String, String)]) -> Vec<&str> {
    files.iter().map(|(name, _)| name.as_str()).collect()
}

/// Write `artifacts` into `dir`, returning the paths written
pub fn write(dir: &Path, artifacts: &Artifacts) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let manifest = (format!("{}.json", artifacts.graph), artifacts.manifest.clone());
    let mut written = Vec::with_capacity(artifacts.files.len() + 1);
    for (name, contents) in artifacts.files.iter().chain(std::iter::once(&manifest)) {
        let path = dir.join(name);
        fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        tracing::debug!("Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordoplay_shader_graph::{NodeKind, OutputTarget, PortType, PortValue};

    fn glow() -> Graph {
        let mut graph = Graph::new("glow");
        graph.add("strength", NodeKind::param("strength", PortValue::Float(0.5)));
        graph.add("output", NodeKind::Output(OutputTarget::Material));
        graph.connect_names("strength", "value", "output", "alpha").unwrap();
        graph
    }

    #[test]
    fn test_material_files_and_manifest() {
        let mut compiler = Compiler::new(Backend::Material);
        let artifacts = compiler
            .compile(&mut glow(), &CompileContext::default())
            .unwrap();
        assert_eq!(file_names(&artifacts.files), vec!["glow.vert", "glow.frag"]);

        let manifest: serde_json::Value = serde_json::from_str(&artifacts.manifest).unwrap();
        assert_eq!(manifest["backend"], "material");
        assert_eq!(manifest["files"][1], "glow.frag");
        assert_eq!(manifest["params"]["strength"]["uniform"], "param_strength");
        assert_eq!(manifest["resolution_dependent"], false);
    }

    #[test]
    fn test_particle_manifest_lists_allocations() {
        let mut graph = Graph::new("swarm");
        graph.add("age", NodeKind::attribute("age", PortType::Float));
        graph.add("output", NodeKind::Output(OutputTarget::Particles));
        graph.connect_names("age", "value", "output", "velocity").unwrap();

        let mut compiler = Compiler::new(Backend::Particles);
        let artifacts = compiler
            .compile(&mut graph, &CompileContext::default())
            .unwrap();
        assert_eq!(file_names(&artifacts.files), vec!["swarm.sim0.frag", "swarm.sim1.frag"]);
        let manifest: serde_json::Value = serde_json::from_str(&artifacts.manifest).unwrap();
        assert_eq!(manifest["allocations"]["attributes"]["age"]["offset"], 3);
        assert_eq!(manifest["allocations"]["textures"][1]["name"], "texture_velocity");
    }

    #[test]
    fn test_graph_name_cannot_escape_output_dir() {
        assert_eq!(file_stem("../../etc/passwd"), "______etc_passwd");
        assert_eq!(file_stem("glow-2"), "glow-2");
        assert_eq!(file_stem(""), "graph");

        let mut compiler = Compiler::new(Backend::Points);
        let mut points = Graph::new("../up/glow");
        points.add("output", NodeKind::Output(OutputTarget::Points));
        let artifacts = compiler
            .compile(&mut points, &CompileContext::default())
            .unwrap();
        assert_eq!(artifacts.graph, "___up_glow");
        assert_eq!(file_names(&artifacts.files), vec!["___up_glow.point.glsl"]);
        let manifest: serde_json::Value = serde_json::from_str(&artifacts.manifest).unwrap();
        assert_eq!(manifest["graph"], "../up/glow");

        let dir = std::env::temp_dir().join(format!("ordoplay_shader_out_{}", std::process::id()));
        let written = write(&dir, &artifacts).unwrap();
        assert!(written.iter().all(|path| path.parent() == Some(dir.as_path())));
    }

    #[test]
    fn test_compile_error_is_reported() {
        let mut graph = Graph::new("empty");
        let mut compiler = Compiler::new(Backend::Points);
        let err = compiler
            .compile(&mut graph, &CompileContext::default())
            .unwrap_err();
        assert!(err.to_string().contains("one output node is required"));
    }
}
