// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loading the compiler configuration and graph documents.

use anyhow::{Context, Result};
use ordoplay_shader_graph::{CompilerConfig, Graph, GraphDocument};
use std::fs;
use std::path::Path;

/// Configuration from a RON file, or the defaults when no file is given.
///
/// Every section is optional in the file; missing ones keep their defaults.
pub fn load_config(path: Option<&Path>) -> Result<CompilerConfig> {
    let Some(path) = path else {
        return Ok(CompilerConfig::default());
    };
    let content =
        fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    let config = CompilerConfig::from_ron_str(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("checking config {}", path.display()))?;
    tracing::info!("Loaded compiler config from {}", path.display());
    Ok(config)
}

/// Graph from a RON document
pub fn load_document(path: &Path) -> Result<Graph> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading document {}", path.display()))?;
    let graph = GraphDocument::load_graph(&content)
        .with_context(|| format!("loading document {}", path.display()))?;
    tracing::debug!(
        graph = %graph.name,
        nodes = graph.node_count(),
        connections = graph.connection_count(),
        "Loaded {}",
        path.display()
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn temp_file(name: &str, content: &str) -> std::path::PathBuf {
        let dir = env::temp_dir().join(format!("ordoplay_shader_cli_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        assert_eq!(load_config(None).unwrap(), CompilerConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let path = temp_file("config.ron", "(formatting: (indent: \"    \"))");
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.formatting.indent, "    ");
        assert_eq!(config.particles.channels_per_texture, 4);
    }

    #[test]
    fn test_out_of_range_channels_are_rejected() {
        let path = temp_file("wide.ron", "(particles: (channels_per_texture: 8))");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().starts_with("checking config"));
        assert!(format!("{err:#}").contains("8 is outside 1..=4"));
    }

    #[test]
    fn test_load_document() {
        let path = temp_file(
            "glow.ron",
            r#"(
                name: "glow",
                nodes: [
                    (name: "k", kind: Constant(Float(0.5))),
                    (name: "output", kind: Output(Material)),
                ],
                connections: [(from: "k.value", to: "output.alpha")],
            )"#,
        );
        let graph = load_document(&path).unwrap();
        assert_eq!(graph.name, "glow");
        assert_eq!(graph.connection_count(), 1);

        let err = load_document(&path.with_file_name("absent.ron")).unwrap_err();
        assert!(err.to_string().starts_with("reading document"));
    }
}
