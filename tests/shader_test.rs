use cgmath::{Matrix4, Vector3};
use scene_ngin::{
    device::headless::{DeviceCall, ObjectKind},
    error::{ShaderError, ShaderStage, UniformError},
    shader::{ShaderProgram, UniformKind},
};

use crate::common::test_utils::{FRAGMENT_SRC, VERTEX_SRC, headless, plain_program, program, slot};

mod common;

#[test]
fn syntax_error_reports_the_compiler_log() {
    let (device, ctx) = headless();
    let broken = VERTEX_SRC.replace("return out;", "return out");

    let error = ShaderProgram::create(&ctx, &broken, FRAGMENT_SRC).unwrap_err();

    match &error {
        ShaderError::Compile { stage, log } => {
            assert_eq!(*stage, ShaderStage::Vertex);
            assert!(!log.is_empty());
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
    assert!(error.log().is_some());
    assert!(
        !device
            .calls()
            .iter()
            .any(|call| matches!(call, DeviceCall::CreateProgram { .. }))
    );
    assert_eq!(device.live_count(ObjectKind::Program), 0);
}

#[test]
fn fragment_errors_name_the_fragment_stage() {
    let (_device, ctx) = headless();
    let broken = FRAGMENT_SRC.replace("vec4<f32>(color, 1.0)", "vec4<f32>(color, undeclared)");

    let error = ShaderProgram::create(&ctx, VERTEX_SRC, &broken).unwrap_err();

    assert!(matches!(
        error,
        ShaderError::Compile {
            stage: ShaderStage::Fragment,
            ..
        }
    ));
}

#[test]
fn missing_entry_point_fails_to_link() {
    let (device, ctx) = headless();
    let no_vertex_entry = "fn helper(x: f32) -> f32 { return x * 2.0; }";

    let error = ShaderProgram::create(&ctx, no_vertex_entry, FRAGMENT_SRC).unwrap_err();

    let ShaderError::Link { log } = &error else {
        panic!("expected a link error, got {error:?}");
    };
    assert!(log.contains("vertex"));
    assert_eq!(device.live_count(ObjectKind::Program), 0);
}

#[test]
fn stages_disagreeing_on_a_binding_fail_to_link() {
    let (_device, ctx) = headless();
    let clashing_fragment = r#"
@group(0) @binding(2) var<uniform> tint: vec4<f32>;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return tint;
}
"#;

    let error = ShaderProgram::create(&ctx, VERTEX_SRC, clashing_fragment).unwrap_err();

    let ShaderError::Link { log } = &error else {
        panic!("expected a link error, got {error:?}");
    };
    assert!(log.contains("@group(0) @binding(2)"));
}

#[test]
fn uniforms_are_reflected_by_name() {
    let (_device, ctx) = headless();
    let program = program(&ctx);

    assert_eq!(slot(&program, "model").kind, UniformKind::Mat4);
    assert_eq!(slot(&program, "material.ambient_color").kind, UniformKind::Vec3);
    assert_eq!(slot(&program, "material.shininess").kind, UniformKind::Float);
    assert_eq!(slot(&program, "point_light_positions[99]").kind, UniformKind::Vec3);
    assert_eq!(slot(&program, "point_light_count").kind, UniformKind::Int);
    assert_eq!(
        slot(&program, "material.texture_diffuse_1").kind,
        UniformKind::Texture
    );
    assert!(!program.location("point_light_positions[100]").is_resolved());
    assert!(!program.location("viewPos").is_resolved());
}

#[test]
fn struct_members_follow_uniform_layout() {
    let (_device, ctx) = headless();
    let program = program(&ctx);

    let ambient = slot(&program, "material.ambient_color");
    let emission = slot(&program, "material.emission_color");
    assert_eq!(ambient.binding, emission.binding);
    assert_eq!(emission.offset - ambient.offset, 16);

    let first = slot(&program, "point_light_positions[0]");
    let second = slot(&program, "point_light_positions[1]");
    assert_eq!(second.offset - first.offset, 16);
}

#[test]
fn unused_globals_are_not_exposed() {
    let (_device, ctx) = headless();
    let mut program = plain_program(&ctx);

    assert!(program.location("projection").is_resolved());
    assert!(!program.location("material.ambient_color").is_resolved());
    assert_eq!(
        program.set_vec3("material.ambient_color", Vector3::new(1.0, 0.0, 0.0)),
        Err(UniformError::NotFound {
            name: "material.ambient_color".to_string()
        })
    );
}

#[test]
fn setters_check_the_uniform_type() {
    let (_device, ctx) = headless();
    let mut program = program(&ctx);

    let error = program
        .set_vec3("model", Vector3::new(1.0, 2.0, 3.0))
        .unwrap_err();
    assert!(matches!(error, UniformError::TypeMismatch { .. }));
    assert!(!error.is_not_found());
    assert_eq!(error.name(), "model");

    assert!(program.set_1i("material.shininess", 3).is_err());
    assert!(program.set_1f("material.shininess", 3.0).is_ok());
    assert!(program.set_mat4("model", &Matrix4::from_scale(2.0)).is_ok());
}

#[test]
fn texture_units_default_to_zero_and_reject_negatives() {
    let (_device, ctx) = headless();
    let mut program = program(&ctx);

    assert_eq!(program.texture_unit("material.texture_diffuse_2"), Some(0));
    program.set_1i("material.texture_diffuse_2", 1).unwrap();
    assert_eq!(program.texture_unit("material.texture_diffuse_2"), Some(1));

    assert!(program.set_1i("material.texture_diffuse_2", -1).is_err());
    assert_eq!(program.texture_unit("material.texture_diffuse_2"), Some(1));
    assert_eq!(program.texture_unit("material.texture_specular_1"), None);
}

#[test]
fn missing_source_files_are_read_errors() {
    let (_device, ctx) = headless();
    let error = ShaderProgram::from_files(
        &ctx,
        "assets/shaders/does_not_exist.wgsl",
        "assets/shaders/fragment_texture.wgsl",
    )
    .unwrap_err();
    assert!(matches!(error, ShaderError::Read { .. }));
    assert!(error.log().is_none());
}

#[test]
fn bundled_shaders_build() {
    let (device, ctx) = headless();
    let program = ShaderProgram::from_files(
        &ctx,
        "assets/shaders/vertex.wgsl",
        "assets/shaders/fragment_texture.wgsl",
    )
    .unwrap();

    for name in [
        "projection",
        "view",
        "model",
        "viewPos",
        "material.diffuse_color",
        "material.texture_diffuse_1",
        "point_light_colors[0]",
        "point_light_count",
    ] {
        assert!(program.location(name).is_resolved(), "{name} should resolve");
    }
    assert_eq!(device.live_count(ObjectKind::Program), 1);
}

#[test]
fn program_is_released_once_on_drop() {
    let (device, ctx) = headless();
    let program = program(&ctx);
    let id = program.id();
    assert!(device.is_live(ObjectKind::Program, id.raw()));

    drop(program);

    assert!(!device.is_live(ObjectKind::Program, id.raw()));
    assert!(device.bad_releases().is_empty());
}
