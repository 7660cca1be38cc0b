// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end compiles of small graphs, checked against the exact text.

use ordoplay_shader_graph::kinds::SubnetNetwork;
use ordoplay_shader_graph::{
    Assembler, CompileContext, CompileError, Graph, MaterialAssembler, MathOp, NodeKind,
    OutputTarget, ParticlesAssembler, PortSpec, PortType, PortValue, ShaderArtifact,
};

fn material(graph: &Graph) -> ordoplay_shader_graph::MaterialProgram {
    MaterialAssembler::new()
        .compile(graph, &CompileContext::default())
        .unwrap()
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[test]
fn test_constant_to_output() {
    let mut graph = Graph::new("s1");
    graph.add("k", NodeKind::Constant(PortValue::Float(1.0)));
    graph.add("output", NodeKind::Output(OutputTarget::Material));
    graph.connect_names("k", "value", "output", "alpha").unwrap();

    let program = material(&graph);
    assert_eq!(
        program.fragment,
        "precision highp float;\n\
         \n\
         void main() {\n\
         \tfloat v_k_value = 1.0;\n\
         \tvec4 diffuseColor = vec4(vec3(1.0, 1.0, 1.0), v_k_value);\n\
         \tgl_FragColor = diffuseColor;\n\
         }\n"
    );
    // Only the fragment stage needs the constant
    assert_eq!(count(&program.vertex, "v_k_value"), 0);
    assert!(program.vertex.contains("attribute vec3 position;"));
    assert!(program.vertex.contains("\tvec3 transformed = position;\n"));
    assert!(!program.time_dependent);
}

#[test]
fn test_subnet_splice() {
    let mut graph = Graph::new("s2");
    graph.add("k1", NodeKind::Constant(PortValue::Float(0.25)));
    graph.add("k2", NodeKind::Constant(PortValue::Float(0.75)));
    let subnet = SubnetNetwork::new(
        "blend",
        vec![PortSpec::new("a", PortType::Float), PortSpec::new("b", PortType::Float)],
        vec![PortSpec::new("out", PortType::Float)],
    );
    let blend = graph.add("blend", NodeKind::Subnet(Box::new(subnet)));
    graph.add("output", NodeKind::Output(OutputTarget::Material));

    let inner = graph.subnet_mut(blend).unwrap();
    inner.add("sum", NodeKind::math(MathOp::Add, PortType::Float));
    inner.connect_names("subnet_input", "a", "sum", "a").unwrap();
    inner.connect_names("subnet_input", "b", "sum", "b").unwrap();
    inner.connect_names("sum", "result", "subnet_output", "out").unwrap();

    graph.connect_names("k1", "value", "blend", "a").unwrap();
    graph.connect_names("k2", "value", "blend", "b").unwrap();
    graph.connect_names("blend", "out", "output", "alpha").unwrap();

    let program = material(&graph);
    assert_eq!(
        program.fragment,
        "precision highp float;\n\
         \n\
         void main() {\n\
         \tfloat v_k1_value = 0.25;\n\
         \tfloat v_k2_value = 0.75;\n\
         \tfloat v_blend_input_a = v_k1_value;\n\
         \tfloat v_blend_input_b = v_k2_value;\n\
         \tfloat v_blend_out = 0.0;\n\
         \tif (true) {\n\
         \t\tfloat v_blend_sum_result = v_blend_input_a + v_blend_input_b;\n\
         \t\tv_blend_out = v_blend_sum_result;\n\
         \t}\n\
         \tvec4 diffuseColor = vec4(vec3(1.0, 1.0, 1.0), v_blend_out);\n\
         \tgl_FragColor = diffuseColor;\n\
         }\n"
    );
}

#[test]
fn test_conditional_subnet_block() {
    let mut graph = Graph::new("cond");
    graph.add("flag", NodeKind::Constant(PortValue::Bool(true)));
    let subnet = SubnetNetwork::new(
        "gate",
        vec![PortSpec::new("enabled", PortType::Bool)],
        vec![PortSpec::new("out", PortType::Float)],
    )
    .with_block(ordoplay_shader_graph::ScopeBlock::Conditional {
        condition: "enabled".to_string(),
    });
    let gate = graph.add("gate", NodeKind::Subnet(Box::new(subnet)));
    graph.add("output", NodeKind::Output(OutputTarget::Material));

    let inner = graph.subnet_mut(gate).unwrap();
    inner.add("half", NodeKind::Constant(PortValue::Float(0.5)));
    inner.connect_names("half", "value", "subnet_output", "out").unwrap();
    graph.connect_names("flag", "value", "gate", "enabled").unwrap();
    graph.connect_names("gate", "out", "output", "alpha").unwrap();

    let program = material(&graph);
    assert!(program.fragment.contains("\tbool v_gate_input_enabled = v_flag_value;\n"));
    assert!(program.fragment.contains("\tif (v_gate_input_enabled) {\n"));
    assert!(program.fragment.contains("\t\tfloat v_gate_half_value = 0.5;\n"));
    assert!(program.fragment.contains("\t\tv_gate_out = v_gate_half_value;\n"));
}

#[test]
fn test_particle_attribute_shared_channel() {
    let mut graph = Graph::new("s3");
    graph.add("age1", NodeKind::attribute("age", PortType::Float));
    graph.add("age2", NodeKind::attribute("age", PortType::Float));
    graph.add("sum", NodeKind::math(MathOp::Add, PortType::Float));
    graph.add("output", NodeKind::Output(OutputTarget::Particles));
    graph.connect_names("age1", "value", "sum", "a").unwrap();
    graph.connect_names("age2", "value", "sum", "b").unwrap();
    graph.connect_names("sum", "result", "output", "velocity").unwrap();

    let mut assembler = ParticlesAssembler::new();
    let program = assembler.compile(&graph, &CompileContext::default()).unwrap();

    let allocations = &program.allocations;
    let names: Vec<&str> = allocations.attributes.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["position", "age", "velocity"]);
    let age = allocations.get("age").unwrap();
    assert_eq!((age.texture, age.offset), (0, 3));

    assert_eq!(program.shaders.len(), 2);
    assert_eq!(program.shaders[0].texture, "texture_position_age");
    assert_eq!(program.shaders[1].texture, "texture_velocity");

    // Velocity is written by the second texture's shader, which samples age twice
    let velocity = &program.shaders[1].source;
    assert_eq!(count(velocity, "texture2D(texture_position_age, particleUV).w"), 2);
    assert_eq!(count(velocity, "uniform sampler2D texture_position_age;"), 1);
    assert!(velocity.contains("\tgl_FragColor.xyz = vec3(v_sum_result);\n"));

    // Position is never written, so its shader only carries the state over
    let position = &program.shaders[0].source;
    assert!(position.contains("\tgl_FragColor = texture2D(texture_position_age, particleUV);\n"));
    assert_eq!(count(position, "gl_FragColor."), 0);
}

#[test]
fn test_missing_output_node() {
    let mut graph = Graph::new("s4");
    graph.add("k", NodeKind::Constant(PortValue::Float(1.0)));

    let mut artifact = ShaderArtifact::new(MaterialAssembler::new());
    let err = artifact
        .compile(&mut graph, &CompileContext::default())
        .unwrap_err();
    assert!(matches!(err, CompileError::MissingOutputNode { .. }));
    assert!(err.to_string().contains("one output node is required"));
    assert!(artifact.output().is_none());
    assert_eq!(graph.error.as_deref(), Some("s4: one output node is required"));
}

#[test]
fn test_constant_edit_changes_one_line() {
    let mut graph = Graph::new("s5");
    let alpha = graph.add("alpha", NodeKind::Constant(PortValue::Float(1.0)));
    graph.add("tint", NodeKind::Constant(PortValue::Vector3([1.0, 0.5, 0.0])));
    graph.add("output", NodeKind::Output(OutputTarget::Material));
    graph.connect_names("alpha", "value", "output", "alpha").unwrap();
    graph.connect_names("tint", "value", "output", "color").unwrap();

    let context = CompileContext::default();
    let mut artifact = ShaderArtifact::new(MaterialAssembler::new());
    let before = artifact.compile(&mut graph, &context).unwrap().clone();
    assert!(!artifact.needs_recompile(&graph));

    graph
        .edit_node(alpha, |kind| *kind = NodeKind::Constant(PortValue::Float(0.5)))
        .unwrap();
    assert!(artifact.needs_recompile(&graph));
    let after = artifact.update(&mut graph, &context).unwrap().clone();

    assert_eq!(before.vertex, after.vertex);
    let old: Vec<&str> = before.fragment.lines().collect();
    let new: Vec<&str> = after.fragment.lines().collect();
    assert_eq!(old.len(), new.len());
    let changed: Vec<(&str, &str)> = old
        .iter()
        .zip(&new)
        .filter(|(a, b)| a != b)
        .map(|(a, b)| (*a, *b))
        .collect();
    assert_eq!(changed, vec![("\tfloat v_alpha_value = 1.0;", "\tfloat v_alpha_value = 0.5;")]);
}
