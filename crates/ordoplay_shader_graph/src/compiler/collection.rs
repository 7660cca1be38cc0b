// SPDX-License-Identifier: MIT OR Apache-2.0
//! The per-pass sink for definitions and body lines.
//!
//! Everything is append-only and keyed by stage in first-touch order, so a
//! fixed sequence of calls always yields the same text.

use super::definition::{Definition, DefinitionKind};
use super::ShaderStage;
use crate::node::NodeId;
use indexmap::IndexMap;

/// A body statement and the node that emitted it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLine {
    /// Emitting node
    pub owner: NodeId,
    /// Statement text, without trailing newline
    pub text: String,
}

/// Options for [`LinesController::add_body_lines`]
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyLineOptions {
    /// Skip lines already present with the same text and owner
    pub make_uniq: bool,
    /// With `make_uniq`, compare the text only
    pub any_owner: bool,
}

impl BodyLineOptions {
    /// Options with `make_uniq` set
    pub fn uniq() -> Self {
        Self {
            make_uniq: true,
            any_owner: false,
        }
    }

    /// Skip lines whose text is already present, whoever emitted them
    pub fn uniq_text() -> Self {
        Self {
            make_uniq: true,
            any_owner: true,
        }
    }
}

/// A definition dropped because its key was already declared differently
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionConflict {
    /// Node that tried to add it
    pub owner: NodeId,
    /// Declaration kept
    pub existing: String,
    /// Declaration dropped
    pub rejected: String,
}

type DefinitionMap = IndexMap<(DefinitionKind, String), Definition>;

/// Collects the definitions and body lines of one compile pass
#[derive(Debug, Clone)]
pub struct LinesController {
    current_stage: ShaderStage,
    definitions: IndexMap<ShaderStage, DefinitionMap>,
    body_lines: IndexMap<ShaderStage, Vec<CodeLine>>,
    conflicts: Vec<DefinitionConflict>,
}

impl LinesController {
    /// Empty controller whose current stage is `stage`
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            current_stage: stage,
            definitions: IndexMap::new(),
            body_lines: IndexMap::new(),
            conflicts: Vec::new(),
        }
    }

    /// Stage used by calls that pass `None`
    pub fn current_stage(&self) -> ShaderStage {
        self.current_stage
    }

    /// Change the stage used by calls that pass `None`
    pub fn set_current_stage(&mut self, stage: ShaderStage) {
        self.current_stage = stage;
    }

    /// Add definitions to `stage` (or the current stage), skipping keys already present.
    ///
    /// A skipped definition whose declaration differs from the kept one is
    /// recorded; see [`Self::take_conflicts`].
    pub fn add_definitions(
        &mut self,
        owner: NodeId,
        definitions: Vec<Definition>,
        stage: Option<ShaderStage>,
    ) {
        let stage = stage.unwrap_or(self.current_stage);
        let map = self.definitions.entry(stage).or_default();
        for definition in definitions {
            let key = (definition.kind(), definition.name().to_string());
            if let Some(existing) = map.get(&key) {
                let (kept, dropped) = (existing.line(), definition.line());
                if kept != dropped {
                    self.conflicts.push(DefinitionConflict {
                        owner,
                        existing: kept,
                        rejected: dropped,
                    });
                }
                continue;
            }
            let definition = if definition.owner() == owner {
                definition
            } else {
                definition.rehomed(owner)
            };
            map.insert(key, definition);
        }
    }

    /// Append body lines to `stage` (or the current stage)
    pub fn add_body_lines(
        &mut self,
        owner: NodeId,
        lines: Vec<String>,
        stage: Option<ShaderStage>,
        options: BodyLineOptions,
    ) {
        let stage = stage.unwrap_or(self.current_stage);
        let body = self.body_lines.entry(stage).or_default();
        for text in lines {
            let present = |l: &CodeLine| l.text == text && (options.any_owner || l.owner == owner);
            if options.make_uniq && body.iter().any(present) {
                continue;
            }
            body.push(CodeLine { owner, text });
        }
    }

    /// Drain the conflicts recorded by [`Self::add_definitions`]
    pub fn take_conflicts(&mut self) -> Vec<DefinitionConflict> {
        std::mem::take(&mut self.conflicts)
    }

    /// Lines `owner` emitted into `stage`
    pub fn body_lines(&self, stage: ShaderStage, owner: NodeId) -> Vec<&str> {
        self.all_body_lines(stage)
            .iter()
            .filter(|l| l.owner == owner)
            .map(|l| l.text.as_str())
            .collect()
    }

    /// Every line of `stage`, in emission order
    pub fn all_body_lines(&self, stage: ShaderStage) -> &[CodeLine] {
        self.body_lines.get(&stage).map_or(&[], Vec::as_slice)
    }

    /// Visit the definitions of `stage` in insertion order
    pub fn traverse_definitions(&self, stage: ShaderStage, mut callback: impl FnMut(&Definition)) {
        for definition in self.definitions.get(&stage).into_iter().flat_map(IndexMap::values) {
            callback(definition);
        }
    }

    /// Definitions of `stage` in insertion order
    pub fn definitions(&self, stage: ShaderStage) -> Vec<&Definition> {
        self.definitions
            .get(&stage)
            .map(|map| map.values().collect())
            .unwrap_or_default()
    }

    /// Rendered declarations of `stage`, grouped by kind (precision first),
    /// insertion order within a kind
    pub fn definition_lines(&self, stage: ShaderStage) -> Vec<String> {
        let mut definitions = self.definitions(stage);
        definitions.sort_by_key(|d| d.kind());
        definitions.iter().map(|d| d.line()).collect()
    }

    /// Every stage that received a definition or a line, in first-touch order
    pub fn stages(&self) -> Vec<ShaderStage> {
        let mut stages: Vec<ShaderStage> = self.definitions.keys().copied().collect();
        for stage in self.body_lines.keys() {
            if !stages.contains(stage) {
                stages.push(*stage);
            }
        }
        stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::PortType;

    #[test]
    fn test_definitions_dedup_per_stage() {
        let mut lines = LinesController::new(ShaderStage::Vertex);
        let a = NodeId::new();
        let b = NodeId::new();
        lines.add_definitions(a, vec![Definition::uniform(a, PortType::Float, "time")], None);
        lines.add_definitions(b, vec![Definition::uniform(b, PortType::Float, "time")], None);
        lines.add_definitions(
            b,
            vec![Definition::uniform(b, PortType::Float, "time")],
            Some(ShaderStage::Fragment),
        );

        assert_eq!(lines.definition_lines(ShaderStage::Vertex), vec!["uniform float time;"]);
        assert_eq!(lines.definitions(ShaderStage::Vertex)[0].owner(), a);
        assert_eq!(lines.definition_lines(ShaderStage::Fragment).len(), 1);
    }

    #[test]
    fn test_make_uniq_checks_owner_and_text() {
        let mut lines = LinesController::new(ShaderStage::Vertex);
        let a = NodeId::new();
        let b = NodeId::new();
        let line = || vec!["v_attr_uv = uv;".to_string()];
        lines.add_body_lines(a, line(), None, BodyLineOptions::uniq());
        lines.add_body_lines(a, line(), None, BodyLineOptions::uniq());
        lines.add_body_lines(b, line(), None, BodyLineOptions::uniq());
        lines.add_body_lines(a, line(), None, BodyLineOptions::default());
        assert_eq!(lines.all_body_lines(ShaderStage::Vertex).len(), 3);
        assert_eq!(lines.body_lines(ShaderStage::Vertex, b), vec!["v_attr_uv = uv;"]);
    }

    #[test]
    fn test_uniq_text_ignores_owner() {
        let mut lines = LinesController::new(ShaderStage::Vertex);
        let a = NodeId::new();
        let b = NodeId::new();
        let line = || vec!["v_attr_uv = uv;".to_string()];
        lines.add_body_lines(a, line(), None, BodyLineOptions::uniq_text());
        lines.add_body_lines(b, line(), None, BodyLineOptions::uniq_text());
        assert_eq!(lines.all_body_lines(ShaderStage::Vertex).len(), 1);
        assert!(lines.body_lines(ShaderStage::Vertex, b).is_empty());
    }

    #[test]
    fn test_same_key_different_type_is_a_conflict() {
        let mut lines = LinesController::new(ShaderStage::Fragment);
        let a = NodeId::new();
        let b = NodeId::new();
        lines.add_definitions(a, vec![Definition::uniform(a, PortType::Float, "param_s")], None);
        lines.add_definitions(a, vec![Definition::uniform(a, PortType::Float, "param_s")], None);
        assert!(lines.take_conflicts().is_empty());

        lines.add_definitions(b, vec![Definition::uniform(b, PortType::Vector3, "param_s")], None);
        assert_eq!(lines.definition_lines(ShaderStage::Fragment), vec!["uniform float param_s;"]);
        assert_eq!(
            lines.take_conflicts(),
            vec![DefinitionConflict {
                owner: b,
                existing: "uniform float param_s;".to_string(),
                rejected: "uniform vec3 param_s;".to_string(),
            }]
        );
        assert!(lines.take_conflicts().is_empty());
    }

    #[test]
    fn test_missing_stage_is_empty() {
        let lines = LinesController::new(ShaderStage::Point);
        assert!(lines.all_body_lines(ShaderStage::Fragment).is_empty());
        assert!(lines.definition_lines(ShaderStage::Fragment).is_empty());
        assert!(lines.stages().is_empty());
    }

    #[test]
    fn test_definition_lines_group_by_kind() {
        let mut lines = LinesController::new(ShaderStage::Fragment);
        let a = NodeId::new();
        lines.add_definitions(
            a,
            vec![
                Definition::uniform(a, PortType::Float, "time"),
                Definition::varying(a, PortType::Vector2, "v_attr_uv"),
                Definition::precision(a, Default::default()),
            ],
            None,
        );
        assert_eq!(
            lines.definition_lines(ShaderStage::Fragment),
            vec!["precision highp float;", "varying vec2 v_attr_uv;", "uniform float time;"]
        );
    }
}
