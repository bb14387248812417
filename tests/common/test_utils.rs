use std::{cell::RefCell, rc::Rc};

use cgmath::{Matrix4, SquareMatrix};
use scene_ngin::{
    context::Context,
    data_structures::{
        mesh::{Mesh, Vertex},
        texture::{ImageData, Texture, TextureKind},
    },
    device::headless::HeadlessDevice,
    render::{DrawContext, Drawable},
    shader::{ShaderProgram, UniformLocation, UniformSlot},
};

pub const VERTEX_SRC: &str = r#"
@group(0) @binding(0) var<uniform> projection: mat4x4<f32>;
@group(0) @binding(1) var<uniform> view: mat4x4<f32>;
@group(0) @binding(2) var<uniform> model: mat4x4<f32>;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = projection * view * model * vec4<f32>(position, 1.0);
    out.uv = uv;
    return out;
}
"#;

pub const FRAGMENT_SRC: &str = r#"
struct Material {
    ambient_color: vec3<f32>,
    emission_color: vec3<f32>,
    diffuse_color: vec3<f32>,
    specular_color: vec3<f32>,
    shininess: f32,
};

@group(1) @binding(0) var<uniform> material: Material;
@group(1) @binding(1) var material__texture_diffuse_1: texture_2d<f32>;
@group(1) @binding(2) var material__texture_diffuse_2: texture_2d<f32>;
@group(1) @binding(3) var material_sampler: sampler;

@group(2) @binding(0) var<uniform> point_light_positions: array<vec3<f32>, 100>;
@group(2) @binding(1) var<uniform> point_light_colors: array<vec3<f32>, 100>;
@group(2) @binding(2) var<uniform> point_light_count: i32;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    var color = material.ambient_color + material.emission_color
        + material.diffuse_color * material.shininess + material.specular_color;
    color += textureSample(material__texture_diffuse_1, material_sampler, in.uv).rgb;
    color += textureSample(material__texture_diffuse_2, material_sampler, in.uv).rgb;
    for (var i = 0; i < point_light_count; i = i + 1) {
        color += point_light_positions[i] * point_light_colors[i];
    }
    return vec4<f32>(color, 1.0);
}
"#;

/// A fragment stage that only outputs a constant, so nothing but the matrices resolves.
pub const PLAIN_FRAGMENT_SRC: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(in.uv, 0.0, 1.0);
}
"#;

/// A context over a recording device the test can still inspect.
pub fn headless() -> (Rc<HeadlessDevice>, Context) {
    let _ = env_logger::builder().is_test(true).try_init();
    let device = Rc::new(HeadlessDevice::new());
    let ctx = Context::from_shared(device.clone());
    (device, ctx)
}

pub fn program(ctx: &Context) -> ShaderProgram {
    ShaderProgram::create(ctx, VERTEX_SRC, FRAGMENT_SRC).expect("test shaders should build")
}

pub fn plain_program(ctx: &Context) -> ShaderProgram {
    ShaderProgram::create(ctx, VERTEX_SRC, PLAIN_FRAGMENT_SRC).expect("test shaders should build")
}

pub fn slot(program: &ShaderProgram, name: &str) -> UniformSlot {
    match program.location(name) {
        UniformLocation::Resolved(slot) => slot,
        UniformLocation::Unresolved => panic!("uniform '{name}' should resolve"),
    }
}

pub const TRIANGLE: [Vertex; 3] = [
    Vertex::new([-0.5, -0.5, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
    Vertex::new([0.5, -0.5, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
    Vertex::new([0.0, 0.5, 0.0], [0.0, 0.0, 1.0], [0.5, 1.0]),
];

pub fn triangle(ctx: &Context) -> Mesh {
    Mesh::create(ctx, &TRIANGLE, &[0, 1, 2]).expect("triangle should upload")
}

pub fn texture(ctx: &Context, kind: TextureKind) -> Rc<Texture> {
    Rc::new(
        Texture::create(ctx, &ImageData::solid(2, 2, [255, 0, 0]), kind)
            .expect("texture should upload"),
    )
}

pub fn identity() -> Matrix4<f32> {
    Matrix4::identity()
}

/// A drawable that only notes down when it was drawn and with which transform.
pub struct Recorder {
    pub id: usize,
    pub log: Rc<RefCell<Vec<(usize, Matrix4<f32>)>>>,
}

impl Recorder {
    pub fn new(id: usize, log: &Rc<RefCell<Vec<(usize, Matrix4<f32>)>>>) -> Rc<Self> {
        Rc::new(Self {
            id,
            log: Rc::clone(log),
        })
    }
}

impl Drawable for Recorder {
    fn draw(&self, ctx: &mut DrawContext<'_>) {
        self.log.borrow_mut().push((self.id, ctx.transform()));
    }
}

fn block_bytes(program: &ShaderProgram, name: &str, len: usize) -> Vec<u8> {
    let slot = slot(program, name);
    let start = slot.offset as usize;
    program
        .blocks()
        .iter()
        .find(|block| block.binding == slot.binding)
        .and_then(|block| block.bytes.get(start..start + len))
        .map(<[u8]>::to_vec)
        .unwrap_or_else(|| panic!("'{name}' should lie inside its block"))
}

/// Current host-side value of a `vec3<f32>` uniform.
pub fn read_vec3(program: &ShaderProgram, name: &str) -> [f32; 3] {
    let bytes = block_bytes(program, name, 12);
    let mut out = [0.0; 3];
    for (value, chunk) in out.iter_mut().zip(bytes.chunks_exact(4)) {
        *value = f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    out
}

pub fn read_i32(program: &ShaderProgram, name: &str) -> i32 {
    let bytes = block_bytes(program, name, 4);
    i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

pub fn read_mat4(program: &ShaderProgram, name: &str) -> Matrix4<f32> {
    let bytes = block_bytes(program, name, 64);
    let floats: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    let column = |i: usize| cgmath::Vector4::new(floats[i * 4], floats[i * 4 + 1], floats[i * 4 + 2], floats[i * 4 + 3]);
    Matrix4::from_cols(column(0), column(1), column(2), column(3))
}
