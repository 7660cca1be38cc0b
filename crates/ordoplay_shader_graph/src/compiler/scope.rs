// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lexical scopes and subnet splicing.
//!
//! A subnet compiles in a nested pass with its own [`LinesController`]. The
//! parent gets, in order:
//!
//! ```text
//! float v_sub_input_a = v_k_value;   // one binding per input
//! float v_sub_out = 0.0;             // one declaration per output
//! if (true) {
//!     float v_sub_abs_result = abs(v_sub_input_a);
//!     v_sub_out = v_sub_abs_result;  // output bridge
//! }
//! ```
//!
//! Every splice adds one indent unit, so a line contributed at nesting depth
//! `d` carries exactly `d` units.

use super::builder::CodeBuilder;
use super::collection::{BodyLineOptions, LinesController};
use super::emit::EmitContext;
use crate::error::CompileError;
use crate::graph::Graph;
use crate::kinds::{NodeKind, ScopeBlock, SubnetNetwork};
use crate::node::NodeRef;
use std::collections::HashMap;

/// Prefixes of the varyings the backends declare themselves
const RESERVED_PREFIXES: [&str; 2] = ["v_attr_", "v_var_"];

/// Naming and diagnostics context of one network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// Slash-separated path of the network
    pub path: String,
    /// Number of enclosing subnets
    pub depth: usize,
    /// Name of the subnet this scope belongs to, `None` at the root
    pub subnet: Option<String>,
    prefix: String,
}

impl Scope {
    /// Root scope of the graph named `graph_name`
    pub fn root(graph_name: &str) -> Self {
        Self {
            path: format!("/{graph_name}"),
            depth: 0,
            subnet: None,
            prefix: String::new(),
        }
    }

    /// Scope of the subnet node `subnet_name` declared in this scope
    pub fn enter(&self, subnet_name: &str) -> Self {
        Self {
            path: format!("{}/{subnet_name}", self.path),
            depth: self.depth + 1,
            subnet: Some(subnet_name.to_string()),
            prefix: format!("{}{subnet_name}_", self.prefix),
        }
    }

    /// Variable of `output` of the node named `node` in this scope
    pub fn var_name(&self, node: &str, output: &str) -> String {
        format!("v_{}{node}_{output}", self.prefix)
    }

    /// Local bound to the subnet input `input` in the pre-block
    pub fn input_var(&self, input: &str) -> String {
        format!("v_{}input_{input}", self.prefix)
    }

    /// Parent-scope variable of the subnet output `output`
    pub fn output_var(&self, output: &str) -> String {
        format!("v_{}{output}", self.prefix)
    }
}

/// Reject a graph in which two values would share one variable.
///
/// Names are joined with `_`, so node `a_b` and subnet `a` with output
/// `b_value` both map to `v_a_b_value`. Checks every network of the
/// hierarchy, reachable or not.
pub fn check_variable_names(graph: &Graph, scope: &Scope) -> Result<(), CompileError> {
    claim_variables(graph, scope, &mut HashMap::new())
}

fn claim_variables(
    graph: &Graph,
    scope: &Scope,
    taken: &mut HashMap<String, String>,
) -> Result<(), CompileError> {
    for node in graph.nodes() {
        let mut claims = Vec::new();
        match &node.kind {
            // Resolves to the locals of the enclosing subnet's pre-block
            NodeKind::SubnetInput(_) => continue,
            NodeKind::Subnet(subnet) => {
                let inner = scope.enter(&node.name);
                for spec in &subnet.inputs {
                    claims.push(inner.input_var(&spec.name));
                }
            }
            _ => {}
        }
        claims.extend(node.outputs.iter().map(|port| scope.var_name(&node.name, &port.name)));

        let holder = format!("{}/{}", scope.path, node.name);
        for variable in claims {
            let clash = match RESERVED_PREFIXES.iter().find(|p| variable.starts_with(*p)) {
                Some(prefix) => Some(format!("the {prefix} varyings")),
                None => taken.get(&variable).cloned(),
            };
            if let Some(other) = clash {
                return Err(CompileError::DuplicateVariable {
                    node: NodeRef::new(&scope.path, node),
                    variable,
                    other,
                });
            }
            taken.insert(variable, holder.clone());
        }

        if let NodeKind::Subnet(subnet) = &node.kind {
            claim_variables(&subnet.network, &scope.enter(&node.name), taken)?;
        }
    }
    Ok(())
}

/// Compile `subnet` in a nested pass and splice it into `lines`
pub(crate) fn emit_subnet(
    subnet: &SubnetNetwork,
    ctx: &mut EmitContext<'_>,
    lines: &mut LinesController,
) -> Result<(), CompileError> {
    let owner = ctx.owner();
    let inner = ctx.scope.enter(&ctx.node.name);

    let output_node = subnet
        .output_node()
        .ok_or_else(|| CompileError::MissingCompanionNode {
            node: ctx.node_ref(),
            companion: "subnet output",
        })?;

    // Pre-block
    let mut body = Vec::with_capacity(subnet.inputs.len() + subnet.outputs.len() + 2);
    for spec in &subnet.inputs {
        let value = ctx.input(&spec.name)?;
        body.push(format!("{} = {value};", spec.port_type.declare(&inner.input_var(&spec.name))));
    }
    for spec in &subnet.outputs {
        body.push(format!(
            "{} = {};",
            spec.port_type.declare(&ctx.var_name(&spec.name)),
            spec.port_type.zero_literal()
        ));
    }

    body.push(match &subnet.block {
        ScopeBlock::Always => "if (true) {".to_string(),
        ScopeBlock::Conditional { condition } => format!("if ({}) {{", inner.input_var(condition)),
    });

    let mut nested = LinesController::new(ctx.stage);
    let mut roots = vec![output_node.id];
    roots.extend(ctx.hooks.side_roots(&subnet.network));
    CodeBuilder::new(&subnet.network, ctx.hooks, ctx.context, &inner).build_stage(
        ctx.stage,
        &roots,
        &mut nested,
        ctx.metadata,
    )?;

    // Declarations are global whatever the nesting; lines other stages
    // received (e.g. the vertex side of a fragment attribute read) go there
    // unindented and at most once per text.
    for stage in nested.stages() {
        let definitions = nested.definitions(stage).into_iter().cloned().collect();
        lines.add_definitions(owner, definitions, Some(stage));
        if stage != ctx.stage {
            let other: Vec<String> = nested
                .all_body_lines(stage)
                .iter()
                .map(|l| l.text.clone())
                .collect();
            lines.add_body_lines(owner, other, Some(stage), BodyLineOptions::uniq_text());
        }
    }

    let indent = ctx.indent();
    body.extend(
        nested
            .all_body_lines(ctx.stage)
            .iter()
            .map(|l| format!("{indent}{}", l.text)),
    );
    body.push("}".to_string());

    lines.add_body_lines(owner, body, Some(ctx.stage), BodyLineOptions::default());
    Ok(())
}
