//! WGSL compilation and uniform reflection.
//!
//! Each stage is parsed and validated with naga. The globals its entry point
//! actually uses are turned into a flat table of uniform names:
//!
//! - a `__` in a global's name stands for `.`, so `material__texture_diffuse_1`
//!   is looked up as `material.texture_diffuse_1`
//! - members of a uniform struct are `global.member`
//! - elements of a fixed-size array are `global[i]`
//!
//! Globals the entry point never touches do not appear, the same way a GLSL
//! compiler strips unused uniforms.

use std::collections::BTreeMap;

use naga::{
    AddressSpace, ArraySize, Handle, Module, ScalarKind, Type, TypeInner, VectorSize,
    valid::{Capabilities, ValidationFlags, Validator},
};

use crate::{
    device::BindingPoint,
    error::{ShaderError, ShaderStage},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Int,
    Uint,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
    Texture,
    Other,
}

impl UniformKind {
    pub fn name(self) -> &'static str {
        match self {
            UniformKind::Float => "f32",
            UniformKind::Int => "i32",
            UniformKind::Uint => "u32",
            UniformKind::Vec2 => "vec2<f32>",
            UniformKind::Vec3 => "vec3<f32>",
            UniformKind::Vec4 => "vec4<f32>",
            UniformKind::Mat4 => "mat4x4<f32>",
            UniformKind::Texture => "texture",
            UniformKind::Other => "unsupported type",
        }
    }
}

/// Where a uniform's bytes live: the block's binding and the byte offset inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    pub binding: BindingPoint,
    pub offset: u32,
    pub kind: UniformKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BlockLayout {
    pub binding: BindingPoint,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TextureSlot {
    pub binding: BindingPoint,
    pub name: String,
}

#[derive(Debug, Default)]
pub(crate) struct Reflection {
    pub uniforms: BTreeMap<String, UniformSlot>,
    pub blocks: Vec<BlockLayout>,
    pub textures: Vec<TextureSlot>,
    pub samplers: Vec<BindingPoint>,
}

#[derive(Debug)]
struct GlobalSignature {
    binding: BindingPoint,
    name: String,
    ty: String,
}

#[derive(Debug)]
pub(crate) struct CompiledStage {
    stage: ShaderStage,
    entry_point: Option<String>,
    reflection: Reflection,
    signatures: Vec<GlobalSignature>,
}

/// A vertex and fragment stage that compiled and link together.
#[derive(Debug)]
pub(crate) struct LinkedProgram {
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub reflection: Reflection,
}

pub(crate) fn uniform_name(global: &str) -> String {
    global.replace("__", ".")
}

fn scalar_name(scalar: &naga::Scalar) -> String {
    let prefix = match scalar.kind {
        ScalarKind::Float => "f",
        ScalarKind::Sint => "i",
        ScalarKind::Uint => "u",
        ScalarKind::Bool => return "bool".to_string(),
        _ => "abstract",
    };
    format!("{}{}", prefix, u32::from(scalar.width) * 8)
}

/// Structural description of a type, comparable across modules.
fn describe(module: &Module, ty: Handle<Type>) -> String {
    match &module.types[ty].inner {
        TypeInner::Scalar(scalar) => scalar_name(scalar),
        TypeInner::Vector { size, scalar } => format!("vec{}<{}>", *size as u8, scalar_name(scalar)),
        TypeInner::Matrix {
            columns,
            rows,
            scalar,
        } => format!("mat{}x{}<{}>", *columns as u8, *rows as u8, scalar_name(scalar)),
        TypeInner::Array { base, size, .. } => match size {
            ArraySize::Constant(len) => format!("array<{}, {}>", describe(module, *base), len),
            _ => format!("array<{}>", describe(module, *base)),
        },
        TypeInner::Struct { members, .. } => {
            let fields: Vec<String> = members
                .iter()
                .map(|m| format!("{}: {}", m.name.as_deref().unwrap_or("_"), describe(module, m.ty)))
                .collect();
            format!("struct {{ {} }}", fields.join(", "))
        }
        TypeInner::Sampler { comparison: true } => "sampler_comparison".to_string(),
        TypeInner::Sampler { comparison: false } => "sampler".to_string(),
        other => format!("{other:?}"),
    }
}

fn leaf_kind(inner: &TypeInner) -> Option<UniformKind> {
    match inner {
        TypeInner::Scalar(scalar) => Some(match scalar.kind {
            ScalarKind::Float => UniformKind::Float,
            ScalarKind::Sint => UniformKind::Int,
            ScalarKind::Uint => UniformKind::Uint,
            _ => UniformKind::Other,
        }),
        TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float => Some(match size {
            VectorSize::Bi => UniformKind::Vec2,
            VectorSize::Tri => UniformKind::Vec3,
            VectorSize::Quad => UniformKind::Vec4,
        }),
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar,
        } if scalar.kind == ScalarKind::Float => Some(UniformKind::Mat4),
        TypeInner::Vector { .. } | TypeInner::Matrix { .. } | TypeInner::Atomic(_) => {
            Some(UniformKind::Other)
        }
        _ => None,
    }
}

fn flatten(
    module: &Module,
    ty: Handle<Type>,
    name: String,
    binding: BindingPoint,
    offset: u32,
    out: &mut BTreeMap<String, UniformSlot>,
) {
    let inner = &module.types[ty].inner;
    if let Some(kind) = leaf_kind(inner) {
        out.insert(
            name,
            UniformSlot {
                binding,
                offset,
                kind,
            },
        );
        return;
    }
    match inner {
        TypeInner::Struct { members, .. } => {
            for member in members {
                let member_name = member.name.as_deref().unwrap_or_default();
                flatten(
                    module,
                    member.ty,
                    format!("{name}.{member_name}"),
                    binding,
                    offset + member.offset,
                    out,
                );
            }
        }
        TypeInner::Array {
            base,
            size: ArraySize::Constant(len),
            stride,
        } => {
            for i in 0..len.get() {
                flatten(module, *base, format!("{name}[{i}]"), binding, offset + i * stride, out);
            }
        }
        _ => log::debug!("uniform '{}' has a type that cannot be set from the host", name),
    }
}

/// Parses and validates one stage and reflects the globals its entry point uses.
pub(crate) fn compile_stage(stage: ShaderStage, source: &str) -> Result<CompiledStage, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Compile {
        stage,
        log: e.emit_to_string(source),
    })?;
    let info = Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| ShaderError::Compile {
            stage,
            log: e.emit_to_string(source),
        })?;

    let wanted = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let Some((index, entry_point)) = module
        .entry_points
        .iter()
        .enumerate()
        .find(|(_, ep)| ep.stage == wanted)
    else {
        return Ok(CompiledStage {
            stage,
            entry_point: None,
            reflection: Reflection::default(),
            signatures: Vec::new(),
        });
    };
    let usage = info.get_entry_point(index);

    let mut reflection = Reflection::default();
    let mut signatures = Vec::new();
    for (handle, global) in module.global_variables.iter() {
        if usage[handle].is_empty() {
            continue;
        }
        let Some(resource) = &global.binding else {
            continue;
        };
        let binding = BindingPoint::new(resource.group, resource.binding);
        let wgsl_name = global.name.clone().unwrap_or_default();
        let name = uniform_name(&wgsl_name);
        signatures.push(GlobalSignature {
            binding,
            name: wgsl_name,
            ty: describe(&module, global.ty),
        });

        let inner = &module.types[global.ty].inner;
        match (global.space, inner) {
            (AddressSpace::Uniform, _) => {
                reflection.blocks.push(BlockLayout {
                    binding,
                    size: inner.size(module.to_ctx()),
                });
                flatten(&module, global.ty, name, binding, 0, &mut reflection.uniforms);
            }
            (AddressSpace::Handle, TypeInner::Image { .. }) => {
                reflection.uniforms.insert(
                    name.clone(),
                    UniformSlot {
                        binding,
                        offset: 0,
                        kind: UniformKind::Texture,
                    },
                );
                reflection.textures.push(TextureSlot { binding, name });
            }
            (AddressSpace::Handle, TypeInner::Sampler { .. }) => reflection.samplers.push(binding),
            _ => log::debug!("global '{}' is neither a uniform nor a texture, ignored", name),
        }
    }

    Ok(CompiledStage {
        stage,
        entry_point: Some(entry_point.name.clone()),
        reflection,
        signatures,
    })
}

/// Checks that both stages have an entry point and agree on every binding
/// they share, then merges their reflections.
pub(crate) fn link(vertex: CompiledStage, fragment: CompiledStage) -> Result<LinkedProgram, ShaderError> {
    let mut problems = Vec::new();
    for stage in [&vertex, &fragment] {
        if stage.entry_point.is_none() {
            problems.push(format!("{} source declares no @{} entry point", stage.stage, stage.stage));
        }
    }
    for v in &vertex.signatures {
        for f in &fragment.signatures {
            if v.binding == f.binding && (v.name != f.name || v.ty != f.ty) {
                problems.push(format!(
                    "@group({}) @binding({}) is '{}: {}' in the vertex stage but '{}: {}' in the fragment stage",
                    v.binding.group, v.binding.binding, v.name, v.ty, f.name, f.ty
                ));
            } else if v.name == f.name && v.binding != f.binding {
                problems.push(format!(
                    "'{}' is bound at @group({}) @binding({}) in the vertex stage but at @group({}) @binding({}) in the fragment stage",
                    v.name, v.binding.group, v.binding.binding, f.binding.group, f.binding.binding
                ));
            }
        }
    }
    let (Some(vertex_entry), Some(fragment_entry)) = (vertex.entry_point, fragment.entry_point)
    else {
        return Err(ShaderError::Link {
            log: problems.join("\n"),
        });
    };
    if !problems.is_empty() {
        return Err(ShaderError::Link {
            log: problems.join("\n"),
        });
    }

    let mut reflection = vertex.reflection;
    let other = fragment.reflection;
    for (name, slot) in other.uniforms {
        reflection.uniforms.entry(name).or_insert(slot);
    }
    for block in other.blocks {
        if !reflection.blocks.iter().any(|b| b.binding == block.binding) {
            reflection.blocks.push(block);
        }
    }
    for texture in other.textures {
        if !reflection.textures.iter().any(|t| t.binding == texture.binding) {
            reflection.textures.push(texture);
        }
    }
    for sampler in other.samplers {
        if !reflection.samplers.contains(&sampler) {
            reflection.samplers.push(sampler);
        }
    }
    reflection.blocks.sort_by_key(|b| b.binding);
    reflection.textures.sort_by_key(|t| t.binding);
    reflection.samplers.sort();

    Ok(LinkedProgram {
        vertex_entry,
        fragment_entry,
        reflection,
    })
}
