// SPDX-License-Identifier: MIT OR Apache-2.0
//! Backend-specific wiring: attributes, varyings, params, functions and errors.

use ordoplay_shader_graph::assemblers::FreeVariable;
use ordoplay_shader_graph::config::{MaterialOptions, ParticlesOptions};
use ordoplay_shader_graph::kinds::{FunctionCall, SubnetNetwork, VaryingNode};
use ordoplay_shader_graph::{
    Assembler, CompileContext, CompileError, CompilerConfig, Connection, Graph,
    MaterialAssembler, MathOp, NodeKind, OutputTarget, ParticlesAssembler, PointBuilderAssembler,
    PortSpec, PortType, PortValue, ShaderArtifact, ShaderStage,
};

#[test]
fn test_fragment_attribute_goes_through_varying() {
    let mut graph = Graph::new("uvs");
    graph.add("uvs", NodeKind::attribute("uv", PortType::Vector2));
    graph.add("output", NodeKind::Output(OutputTarget::Material));
    graph.connect_names("uvs", "value", "output", "color").unwrap();

    let program = MaterialAssembler::new()
        .compile(&graph, &CompileContext::default())
        .unwrap();
    assert_eq!(
        program.vertex,
        "precision highp float;\n\
         attribute vec3 position;\n\
         attribute vec2 uv;\n\
         varying vec2 v_attr_uv;\n\
         uniform mat4 modelViewMatrix;\n\
         uniform mat4 projectionMatrix;\n\
         uniform mat3 normalMatrix;\n\
         \n\
         void main() {\n\
         \tvec3 transformed = position;\n\
         \tv_attr_uv = uv;\n\
         \tgl_Position = projectionMatrix * modelViewMatrix * vec4(transformed, 1.0);\n\
         }\n"
    );
    assert!(program.fragment.contains("varying vec2 v_attr_uv;\n"));
    assert!(program.fragment.contains("\tvec2 v_uvs_value = v_attr_uv;\n"));
    assert!(program
        .fragment
        .contains("\tvec4 diffuseColor = vec4(vec3(v_uvs_value, 0.0), 1.0);\n"));
    assert!(!program.fragment.contains("attribute"));
}

#[test]
fn test_varying_written_in_vertex_read_in_fragment() {
    let mut graph = Graph::new("height");
    let varying = VaryingNode::new("height", PortType::Float);
    graph.add("k", NodeKind::Constant(PortValue::Float(2.0)));
    graph.add("write", NodeKind::VaryingWrite(varying.clone()));
    graph.add("read", NodeKind::VaryingRead(varying));
    graph.add("output", NodeKind::Output(OutputTarget::Material));
    graph.connect_names("k", "value", "write", "value").unwrap();
    graph.connect_names("read", "value", "output", "alpha").unwrap();

    let program = MaterialAssembler::new()
        .compile(&graph, &CompileContext::default())
        .unwrap();
    assert!(program.vertex.contains("varying float v_var_height;\n"));
    assert!(program.vertex.contains("\tfloat v_k_value = 2.0;\n\tv_var_height = v_k_value;\n"));
    assert_eq!(program.fragment.matches("varying float v_var_height;").count(), 1);
    assert!(program.fragment.contains("\tfloat v_read_value = v_var_height;\n"));
    assert!(!program.fragment.contains("v_k_value"));
}

#[test]
fn test_params_and_normal() {
    let mut graph = Graph::new("params");
    graph.add("strength", NodeKind::param("strength", PortValue::Float(0.5)));
    graph.add("up", NodeKind::Constant(PortValue::Vector3([0.0, 1.0, 0.0])));
    graph.add("output", NodeKind::Output(OutputTarget::Material));
    graph.connect_names("strength", "value", "output", "alpha").unwrap();
    graph.connect_names("up", "value", "output", "normal").unwrap();

    let program = MaterialAssembler::new()
        .compile(&graph, &CompileContext::default())
        .unwrap();
    assert!(program.fragment.contains("uniform float param_strength;\n"));
    assert!(program.fragment.contains("\tfloat v_strength_value = param_strength;\n"));
    assert!(program.vertex.contains("varying vec3 v_normal;\n"));
    assert!(program.fragment.contains("varying vec3 v_normal;\n"));
    assert!(program.vertex.contains("\tv_normal = normalize(normalMatrix * v_up_value);\n"));

    let binding = &program.params["strength"];
    assert_eq!(binding.uniform, "param_strength");
    assert_eq!(binding.node, "/params/strength");
    assert_eq!(binding.default, PortValue::Float(0.5));
}

#[test]
fn test_function_node_declares_its_source() {
    let context = CompileContext::default();
    let mut graph = Graph::new("lum");
    graph.add("c", NodeKind::Constant(PortValue::Vector3([0.2, 0.4, 0.6])));
    graph.add("lum", context.functions.call_node("luminance").unwrap());
    graph.add("output", NodeKind::Output(OutputTarget::Material));
    graph.connect_names("c", "value", "lum", "color").unwrap();
    graph.connect_names("lum", "result", "output", "alpha").unwrap();

    let program = MaterialAssembler::new().compile(&graph, &context).unwrap();
    assert_eq!(program.fragment.matches("float luminance(vec3 color) {").count(), 1);
    assert!(program.fragment.contains("\tfloat v_lum_result = luminance(v_c_value);\n"));
    // Functions come after every other declaration
    let function = program.fragment.find("float luminance").unwrap();
    let precision = program.fragment.find("precision highp float;").unwrap();
    assert!(precision < function);
}

#[test]
fn test_unknown_function() {
    let mut graph = Graph::new("missing");
    let call = FunctionCall {
        function: "nope".to_string(),
        inputs: vec![],
        output: PortType::Float,
    };
    graph.add("f", NodeKind::Function(call));
    graph.add("output", NodeKind::Output(OutputTarget::Material));
    graph.connect_names("f", "result", "output", "alpha").unwrap();

    let err = MaterialAssembler::new()
        .compile(&graph, &CompileContext::default())
        .unwrap_err();
    assert!(matches!(err, CompileError::UnknownFunction { ref function, .. } if function == "nope"));
    assert_eq!(err.node().map(|n| n.path.as_str()), Some("/missing/f"));
}

#[test]
fn test_unwired_function_argument() {
    let context = CompileContext::default();
    let mut graph = Graph::new("unwired");
    graph.add("lum", context.functions.call_node("luminance").unwrap());
    graph.add("output", NodeKind::Output(OutputTarget::Material));
    graph.connect_names("lum", "result", "output", "alpha").unwrap();

    let err = MaterialAssembler::new().compile(&graph, &context).unwrap_err();
    assert!(matches!(err, CompileError::MissingInput { ref input, .. } if input == "color"));
    assert_eq!(err.node().map(|n| n.path.as_str()), Some("/unwired/lum"));
}

#[test]
fn test_param_declared_with_two_types() {
    let mut graph = Graph::new("params");
    graph.add("p1", NodeKind::param("s", PortValue::Float(1.0)));
    graph.add("p2", NodeKind::param("s", PortValue::Vector3([0.0, 0.5, 1.0])));
    graph.add("output", NodeKind::Output(OutputTarget::Material));
    graph.connect_names("p1", "value", "output", "alpha").unwrap();
    graph.connect_names("p2", "value", "output", "color").unwrap();

    let err = MaterialAssembler::new()
        .compile(&graph, &CompileContext::default())
        .unwrap_err();
    let CompileError::ConflictingDefinition { existing, rejected, .. } = &err else {
        panic!("unexpected {err:?}");
    };
    let mut lines = vec![existing.as_str(), rejected.as_str()];
    lines.sort_unstable();
    assert_eq!(lines, vec!["uniform float param_s;", "uniform vec3 param_s;"]);
    assert!(err.node().is_some());
}

#[test]
fn test_underscore_names_cannot_share_a_variable() {
    let mut graph = Graph::new("names");
    graph.add("a_b", NodeKind::Constant(PortValue::Float(1.0)));
    let mut subnet = SubnetNetwork::new("a", vec![], vec![PortSpec::new("b_value", PortType::Float)]);
    subnet.network.add("k", NodeKind::Constant(PortValue::Float(0.0)));
    subnet.network.connect_names("k", "value", "subnet_output", "b_value").unwrap();
    graph.add("a", NodeKind::Subnet(Box::new(subnet)));
    graph.add("sum", NodeKind::math(MathOp::Add, PortType::Float));
    graph.add("output", NodeKind::Output(OutputTarget::Material));
    graph.connect_names("a_b", "value", "sum", "a").unwrap();
    graph.connect_names("a", "b_value", "sum", "b").unwrap();
    graph.connect_names("sum", "result", "output", "alpha").unwrap();

    let err = MaterialAssembler::new()
        .compile(&graph, &CompileContext::default())
        .unwrap_err();
    assert!(matches!(
        err,
        CompileError::DuplicateVariable { ref variable, .. } if variable == "v_a_b_value"
    ));
    assert_eq!(err.node().map(|n| n.path.as_str()), Some("/names/a"));
}

/// Subnet `tint` reading the `uv` attribute into its `out` output
fn uv_subnet() -> SubnetNetwork {
    let mut subnet = SubnetNetwork::new("tint", vec![], vec![PortSpec::new("out", PortType::Vector2)]);
    subnet.network.add("uvs", NodeKind::attribute("uv", PortType::Vector2));
    subnet.network.connect_names("uvs", "value", "subnet_output", "out").unwrap();
    subnet
}

#[test]
fn test_fragment_attribute_inside_subnet_goes_through_varying() {
    let mut graph = Graph::new("mat");
    graph.add("tint", NodeKind::Subnet(Box::new(uv_subnet())));
    graph.add("output", NodeKind::Output(OutputTarget::Material));
    graph.connect_names("tint", "out", "output", "color").unwrap();

    let program = MaterialAssembler::new()
        .compile(&graph, &CompileContext::default())
        .unwrap();
    assert!(program.vertex.contains("attribute vec2 uv;
"));
    assert!(program.vertex.contains("varying vec2 v_attr_uv;
"));
    assert!(program
        .vertex
        .contains("	vec3 transformed = position;
	v_attr_uv = uv;
	gl_Position"));
    assert!(program.fragment.contains("varying vec2 v_attr_uv;
"));
    assert!(program.fragment.contains("		vec2 v_tint_uvs_value = v_attr_uv;
"));
    assert!(!program.fragment.contains("attribute"));
}

#[test]
fn test_shared_attribute_varying_assigned_once() {
    let mut graph = Graph::new("mat");
    graph.add("uvs", NodeKind::attribute("uv", PortType::Vector2));
    graph.add("uvs_again", NodeKind::attribute("uv", PortType::Vector2));
    graph.add("tint", NodeKind::Subnet(Box::new(uv_subnet())));
    graph.add("sum", NodeKind::math(MathOp::Add, PortType::Vector2));
    graph.add("total", NodeKind::math(MathOp::Add, PortType::Vector2));
    graph.add("output", NodeKind::Output(OutputTarget::Material));
    graph.connect_names("uvs", "value", "sum", "a").unwrap();
    graph.connect_names("uvs_again", "value", "sum", "b").unwrap();
    graph.connect_names("sum", "result", "total", "a").unwrap();
    graph.connect_names("tint", "out", "total", "b").unwrap();
    graph.connect_names("total", "result", "output", "color").unwrap();

    let program = MaterialAssembler::new()
        .compile(&graph, &CompileContext::default())
        .unwrap();
    assert_eq!(program.vertex.matches("v_attr_uv = uv;").count(), 1);
    assert_eq!(program.vertex.matches("varying vec2 v_attr_uv;").count(), 1);
    assert_eq!(program.fragment.matches("= v_attr_uv;").count(), 3);
}

#[test]
fn test_point_builder() {
    let mut graph = Graph::new("points");
    graph.add("g", NodeKind::Globals);
    graph.add("size_in", NodeKind::attribute("size", PortType::Float));
    graph.add("size_out", NodeKind::attribute("size", PortType::Float));
    graph.add("scale", NodeKind::param("scale", PortValue::Float(2.0)));
    graph.add("mul", NodeKind::math(MathOp::Multiply, PortType::Float));
    graph.add("output", NodeKind::Output(OutputTarget::Points));
    graph.connect_names("g", "position", "output", "position").unwrap();
    graph.connect_names("size_in", "value", "mul", "a").unwrap();
    graph.connect_names("scale", "value", "mul", "b").unwrap();
    graph.connect_names("mul", "result", "size_out", "export").unwrap();

    let program = PointBuilderAssembler::new()
        .compile(&graph, &CompileContext::default())
        .unwrap();
    assert_eq!(
        program.body,
        "vec3 v_g_position = point.position;\n\
         point.position = v_g_position;\n\
         float v_size_in_value = point.size;\n\
         float v_scale_value = param_scale;\n\
         float v_mul_result = v_size_in_value * v_scale_value;\n\
         point.size = v_mul_result;"
    );
    assert!(program.source.starts_with("void build_point(inout Point point) {\n\tvec3 v_g_position"));
    assert!(program.source.ends_with("\tpoint.size = v_mul_result;\n}\n"));
    assert!(program.functions.is_empty());
    assert_eq!(
        program.free_variables,
        vec![FreeVariable {
            name: "param_scale".to_string(),
            ty: "float",
        }]
    );
    let read: Vec<&str> = program.attributes_read.iter().map(String::as_str).collect();
    let written: Vec<&str> = program.attributes_written.iter().map(String::as_str).collect();
    assert_eq!(read, vec!["position", "size"]);
    assert_eq!(written, vec!["position", "size"]);
    assert!(!program.time_dependent);
}

#[test]
fn test_particle_export_and_reallocation() {
    let mut graph = Graph::new("ages");
    graph.add("age_in", NodeKind::attribute("age", PortType::Float));
    graph.add("age_out", NodeKind::attribute("age", PortType::Float));
    graph.add("dt", NodeKind::Constant(PortValue::Float(0.016)));
    graph.add("add", NodeKind::math(MathOp::Add, PortType::Float));
    graph.add("output", NodeKind::Output(OutputTarget::Particles));
    graph.connect_names("age_in", "value", "add", "a").unwrap();
    graph.connect_names("dt", "value", "add", "b").unwrap();
    graph.connect_names("add", "result", "age_out", "export").unwrap();

    let context = CompileContext::default();
    let mut assembler = ParticlesAssembler::new();
    let program = assembler.compile(&graph, &context).unwrap();
    assert_eq!(program.shaders.len(), 1);
    assert_eq!(
        program.shaders[0].source,
        "precision highp float;\n\
         uniform vec2 resolution;\n\
         uniform sampler2D texture_position_age;\n\
         \n\
         void main() {\n\
         \tvec2 particleUV = gl_FragCoord.xy / resolution.xy;\n\
         \tgl_FragColor = texture2D(texture_position_age, particleUV);\n\
         \tfloat v_age_in_value = texture2D(texture_position_age, particleUV).w;\n\
         \tfloat v_dt_value = 0.016;\n\
         \tfloat v_add_result = v_age_in_value + v_dt_value;\n\
         \tgl_FragColor.w = v_add_result;\n\
         }\n"
    );

    // Same attribute set: channels stay where they are
    assembler.compile(&graph, &context).unwrap();
    assert_eq!(assembler.allocations().generation, 1);

    graph.add("life", NodeKind::attribute("life", PortType::Float));
    graph.connect_names("dt", "value", "life", "export").unwrap();
    let program = assembler.compile(&graph, &context).unwrap();
    assert_eq!(program.allocations.generation, 2);
    let life = program.allocations.get("life").unwrap();
    assert_eq!((life.texture, life.offset), (1, 0));
    assert_eq!(program.shaders[1].texture, "texture_life");
    assert!(program.shaders[1].source.contains("\tgl_FragColor.x = v_dt_value;\n"));
}

#[test]
fn test_int_particle_attribute_is_converted() {
    let mut graph = Graph::new("counts");
    graph.add("count_in", NodeKind::attribute("count", PortType::Int));
    graph.add("count_out", NodeKind::attribute("count", PortType::Int));
    graph.add("output", NodeKind::Output(OutputTarget::Particles));
    graph.connect_names("count_in", "value", "count_out", "export").unwrap();

    let program = ParticlesAssembler::new()
        .compile(&graph, &CompileContext::default())
        .unwrap();
    assert_eq!(
        program.shaders[0].source,
        "precision highp float;\n\
         uniform vec2 resolution;\n\
         uniform sampler2D texture_position_count;\n\
         \n\
         void main() {\n\
         \tvec2 particleUV = gl_FragCoord.xy / resolution.xy;\n\
         \tgl_FragColor = texture2D(texture_position_count, particleUV);\n\
         \tint v_count_in_value = int(texture2D(texture_position_count, particleUV).w);\n\
         \tgl_FragColor.w = float(v_count_in_value);\n\
         }\n"
    );
}

/// Particle graph whose only effect is an `age` update inside subnet `aging`
fn aging_graph() -> Graph {
    let mut subnet = SubnetNetwork::new("aging", vec![], vec![]);
    let inner = &mut subnet.network;
    inner.add("age_in", NodeKind::attribute("age", PortType::Float));
    inner.add("age_out", NodeKind::attribute("age", PortType::Float));
    inner.add("dt", NodeKind::Constant(PortValue::Float(0.016)));
    inner.add("add", NodeKind::math(MathOp::Add, PortType::Float));
    inner.connect_names("age_in", "value", "add", "a").unwrap();
    inner.connect_names("dt", "value", "add", "b").unwrap();
    inner.connect_names("add", "result", "age_out", "export").unwrap();

    let mut graph = Graph::new("swarm");
    graph.add("aging", NodeKind::Subnet(Box::new(subnet)));
    graph.add("output", NodeKind::Output(OutputTarget::Particles));
    graph
}

#[test]
fn test_particle_attribute_inside_subnet() {
    let program = ParticlesAssembler::new()
        .compile(&aging_graph(), &CompileContext::default())
        .unwrap();
    let age = program.allocations.get("age").unwrap();
    assert_eq!((age.texture, age.offset), (0, 3));
    assert_eq!(program.shaders.len(), 1);

    let source = &program.shaders[0].source;
    assert!(source.contains(
        "\tif (true) {\n\
         \t\tfloat v_aging_age_in_value = texture2D(texture_position_age, particleUV).w;\n"
    ));
    assert!(source.contains("\t\tgl_FragColor.w = v_aging_add_result;\n\t}\n"));
    assert_eq!(source.matches("uniform sampler2D texture_position_age;").count(), 1);
}

#[test]
fn test_nested_attribute_errors_name_the_inner_node() {
    let mut subnet = SubnetNetwork::new("aging", vec![], vec![]);
    subnet.network.add("src", NodeKind::attribute("map", PortType::Texture));
    subnet.network.add("dst", NodeKind::attribute("map", PortType::Texture));
    subnet.network.connect_names("src", "value", "dst", "export").unwrap();
    let mut graph = Graph::new("swarm");
    graph.add("aging", NodeKind::Subnet(Box::new(subnet)));
    graph.add("output", NodeKind::Output(OutputTarget::Particles));

    let err = ParticlesAssembler::new()
        .compile(&graph, &CompileContext::default())
        .unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedAttributeType { ty: "sampler2D", .. }));
    assert_eq!(err.node().map(|n| n.path.as_str()), Some("/swarm/aging/src"));
}

#[test]
fn test_particle_channel_count_out_of_range() {
    let config = CompilerConfig::builder()
        .particles(ParticlesOptions {
            channels_per_texture: 8,
            ..Default::default()
        })
        .build();
    let mut assembler = ParticlesAssembler::new();
    let err = assembler
        .compile(&aging_graph(), &CompileContext::new(config))
        .unwrap_err();
    assert!(matches!(
        err,
        CompileError::InvalidConfig { option: "particles.channels_per_texture", .. }
    ));
    assert_eq!(assembler.allocations().texture_count(), 0);
}

#[test]
fn test_varyings_rejected_by_particles() {
    let mut graph = Graph::new("bad");
    graph.add("read", NodeKind::VaryingRead(VaryingNode::new("h", PortType::Float)));
    graph.add("output", NodeKind::Output(OutputTarget::Particles));

    let err = ParticlesAssembler::new()
        .compile(&graph, &CompileContext::default())
        .unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedNode { backend: "particles", .. }));
}

#[test]
fn test_two_outputs_rejected() {
    let mut graph = Graph::new("twice");
    graph.add("a", NodeKind::Output(OutputTarget::Material));
    graph.add("b", NodeKind::Output(OutputTarget::Material));
    let err = MaterialAssembler::new()
        .compile(&graph, &CompileContext::default())
        .unwrap_err();
    assert_eq!(
        err,
        CompileError::MultipleOutputNodes {
            graph: "twice".to_string(),
            count: 2,
        }
    );
}

#[test]
fn test_cycle_from_unchecked_connection() {
    let mut graph = Graph::new("loop");
    let a = graph.add("a", NodeKind::math(MathOp::Add, PortType::Float));
    let b = graph.add("b", NodeKind::math(MathOp::Add, PortType::Float));
    graph.add("output", NodeKind::Output(OutputTarget::Material));
    graph.connect(a, "result", b, "a").unwrap();
    graph.insert_connection_unchecked(Connection::new(b, "result", a, "a"));
    graph.connect_names("b", "result", "output", "alpha").unwrap();

    let err = MaterialAssembler::new()
        .compile(&graph, &CompileContext::default())
        .unwrap_err();
    assert!(matches!(err, CompileError::CyclicDependency { .. }));
}

#[test]
fn test_template_without_marker() {
    let config = CompilerConfig::builder()
        .material(MaterialOptions {
            vertex_template: None,
            fragment_template: Some("void main() {}\n".to_string()),
        })
        .build();
    let mut graph = Graph::new("tpl");
    graph.add("output", NodeKind::Output(OutputTarget::Material));

    let err = MaterialAssembler::new()
        .compile(&graph, &CompileContext::new(config))
        .unwrap_err();
    assert!(matches!(err, CompileError::Template { stage: ShaderStage::Fragment, .. }));
}

#[test]
fn test_failed_compile_keeps_last_output() {
    let mut graph = Graph::new("keep");
    graph.add("k", NodeKind::Constant(PortValue::Float(0.5)));
    graph.add("output", NodeKind::Output(OutputTarget::Material));
    graph.connect_names("k", "value", "output", "alpha").unwrap();

    let context = CompileContext::default();
    let mut artifact = ShaderArtifact::new(MaterialAssembler::new());
    let good = artifact.compile(&mut graph, &context).unwrap().clone();

    let call = FunctionCall {
        function: "nope".to_string(),
        inputs: vec![],
        output: PortType::Float,
    };
    let f = graph.add("f", NodeKind::Function(call));
    graph.connect_names("f", "result", "output", "color").unwrap();

    assert_eq!(artifact.update(&mut graph, &context), Some(&good));
    assert!(matches!(artifact.error(), Some(CompileError::UnknownFunction { .. })));
    let message = graph.node(f).and_then(|n| n.error.clone()).unwrap();
    assert_eq!(message, "/keep/f: unknown function 'nope'");
    assert!(graph.error.is_none());

    // Fixing the graph clears the error
    graph.remove_node(f);
    assert!(artifact.update(&mut graph, &context).is_some());
    assert!(artifact.error().is_none());
}

#[test]
fn test_removing_a_subnet_triggers_recompile() {
    let mut graph = Graph::new("keep");
    let k = graph.add("k", NodeKind::Constant(PortValue::Float(0.5)));
    let m = graph.add("m", NodeKind::math(MathOp::Sin, PortType::Float));
    let subnet = SubnetNetwork::new("s", vec![], vec![PortSpec::new("out", PortType::Float)]);
    let s = graph.add("s", NodeKind::Subnet(Box::new(subnet)));
    graph.add("output", NodeKind::Output(OutputTarget::Material));
    let inner = graph.subnet_mut(s).unwrap();
    inner.add("c", NodeKind::Constant(PortValue::Float(0.25)));
    inner.add("d", NodeKind::Constant(PortValue::Float(0.75)));
    inner.connect_names("c", "value", "subnet_output", "out").unwrap();
    graph.connect_names("s", "out", "output", "alpha").unwrap();

    let context = CompileContext::default();
    let mut artifact = ShaderArtifact::new(MaterialAssembler::new());
    let first = artifact.compile(&mut graph, &context).unwrap();
    assert!(first.fragment.contains("v_s_out"));
    assert!(!artifact.needs_recompile(&graph));

    graph.remove_node(s);
    graph.connect(k, "value", m, "x").unwrap();
    assert!(artifact.needs_recompile(&graph));
    let program = artifact.update(&mut graph, &context).unwrap();
    assert!(!program.fragment.contains("v_s_"));
}
