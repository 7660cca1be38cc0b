// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader skeletons with splice markers.

use crate::compiler::ShaderStage;
use crate::error::CompileError;
use std::borrow::Cow;

/// Line replaced by the stage's declarations
pub const DEFINITIONS_MARKER: &str = "// INSERT DEFINITIONS";
/// Line replaced by the stage's body
pub const BODY_MARKER: &str = "// INSERT BODY";

/// A fixed prelude/epilogue around splice markers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderTemplate {
    source: Cow<'static, str>,
}

impl ShaderTemplate {
    /// Template from text
    pub fn new(source: impl Into<Cow<'static, str>>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Replace the line holding `marker` with `lines`, each indented like the marker.
    ///
    /// Multi-line entries (function definitions) are indented line by line.
    pub fn insert(
        self,
        stage: ShaderStage,
        marker: &'static str,
        lines: &[String],
    ) -> Result<Self, CompileError> {
        let mut found = false;
        let mut out: Vec<String> = Vec::new();
        for line in self.source.lines() {
            if found || line.trim() != marker {
                out.push(line.to_string());
                continue;
            }
            found = true;
            let indent = &line[..line.len() - line.trim_start().len()];
            for text in lines.iter().flat_map(|l| l.lines()) {
                if text.is_empty() {
                    out.push(String::new());
                } else {
                    out.push(format!("{indent}{text}"));
                }
            }
        }
        if !found {
            return Err(CompileError::Template { stage, marker });
        }
        let mut source = out.join("\n");
        source.push('\n');
        Ok(Self::new(source))
    }

    /// The (spliced) text
    pub fn into_source(self) -> String {
        self.source.into_owned()
    }
}
