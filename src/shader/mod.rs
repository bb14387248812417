//! Compiled shader programs and their uniforms.
//!
//! A [`ShaderProgram`] is built from a WGSL vertex and fragment source. Both
//! are compiled and linked on the host first, so a broken source never reaches
//! the device and the error carries the full compiler log.
//!
//! Uniforms are addressed by name, the way the shaders spell them. Values live
//! in host-side copies of the program's uniform blocks and persist until they
//! are overwritten; every draw takes a snapshot of the current values.

pub mod reflect;

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fs,
    path::Path,
};

use cgmath::{Matrix4, Vector3};

use crate::{
    context::Context,
    device::{BindingPoint, ProgramId, ProgramSource, TextureBinding, TextureId, UniformBlock},
    error::{ShaderError, ShaderStage, UniformError},
};

pub use reflect::{UniformKind, UniformSlot};
use reflect::TextureSlot;

/// Result of looking a uniform up by name.
///
/// `Unresolved` is a normal outcome: compilers drop uniforms a program does
/// not use, and shaders are free to leave out any of the engine's uniforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformLocation {
    Resolved(UniformSlot),
    Unresolved,
}

impl UniformLocation {
    pub fn is_resolved(&self) -> bool {
        matches!(self, UniformLocation::Resolved(_))
    }
}

pub struct ShaderProgram {
    ctx: Context,
    id: ProgramId,
    uniforms: BTreeMap<String, UniformSlot>,
    blocks: Vec<(BindingPoint, Vec<u8>)>,
    textures: Vec<TextureSlot>,
    texture_units: HashMap<String, u32>,
    reported: HashSet<String>,
}

impl ShaderProgram {
    /// Compiles and links the two stages and creates the device program.
    pub fn create(ctx: &Context, vertex_src: &str, fragment_src: &str) -> Result<Self, ShaderError> {
        Self::create_labelled(ctx, "shader program", vertex_src, fragment_src)
    }

    /// Reads both stages from disk, then behaves like [`create`](Self::create).
    pub fn from_files(
        ctx: &Context,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<Self, ShaderError> {
        let read = |path: &Path| {
            fs::read_to_string(path).map_err(|source| ShaderError::Read {
                path: path.to_path_buf(),
                source,
            })
        };
        let vertex_path = vertex_path.as_ref();
        let fragment_path = fragment_path.as_ref();
        let vertex_src = read(vertex_path)?;
        let fragment_src = read(fragment_path)?;
        let label = format!("{} + {}", vertex_path.display(), fragment_path.display());
        Self::create_labelled(ctx, &label, &vertex_src, &fragment_src)
    }

    fn create_labelled(
        ctx: &Context,
        label: &str,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<Self, ShaderError> {
        let vertex = reflect::compile_stage(ShaderStage::Vertex, vertex_src)?;
        let fragment = reflect::compile_stage(ShaderStage::Fragment, fragment_src)?;
        let linked = reflect::link(vertex, fragment)?;

        let id = ctx.create_program(&ProgramSource {
            label: label.to_string(),
            vertex_source: vertex_src.to_string(),
            vertex_entry: linked.vertex_entry,
            fragment_source: fragment_src.to_string(),
            fragment_entry: linked.fragment_entry,
            samplers: linked.reflection.samplers,
        })?;
        log::debug!(
            "created {} '{}' with {} uniforms",
            id,
            label,
            linked.reflection.uniforms.len()
        );

        let blocks = linked
            .reflection
            .blocks
            .iter()
            .map(|block| (block.binding, vec![0u8; block.size as usize]))
            .collect();
        Ok(Self {
            ctx: ctx.clone(),
            id,
            uniforms: linked.reflection.uniforms,
            blocks,
            textures: linked.reflection.textures,
            texture_units: HashMap::new(),
            reported: HashSet::new(),
        })
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn location(&self, name: &str) -> UniformLocation {
        match self.uniforms.get(name) {
            Some(slot) => UniformLocation::Resolved(*slot),
            None => UniformLocation::Unresolved,
        }
    }

    /// Names of every uniform the program exposes, sorted.
    pub fn uniform_names(&self) -> impl Iterator<Item = &str> {
        self.uniforms.keys().map(String::as_str)
    }

    /// The unit a texture uniform samples from. Units default to 0.
    pub fn texture_unit(&self, name: &str) -> Option<u32> {
        self.textures
            .iter()
            .any(|t| t.name == name)
            .then(|| self.texture_units.get(name).copied().unwrap_or(0))
    }

    fn resolve(&self, name: &str, expected: UniformKind) -> Result<UniformSlot, UniformError> {
        let slot = *self.uniforms.get(name).ok_or_else(|| UniformError::NotFound {
            name: name.to_string(),
        })?;
        if slot.kind != expected {
            return Err(UniformError::TypeMismatch {
                name: name.to_string(),
                expected: expected.name(),
                found: slot.kind.name(),
            });
        }
        Ok(slot)
    }

    fn write(&mut self, slot: UniformSlot, bytes: &[u8]) {
        let start = slot.offset as usize;
        let target = self
            .blocks
            .iter_mut()
            .find(|(binding, _)| *binding == slot.binding)
            .and_then(|(_, block)| block.get_mut(start..start + bytes.len()));
        match target {
            Some(target) => target.copy_from_slice(bytes),
            None => log::error!("uniform write outside of block {:?}", slot.binding),
        }
    }

    pub fn set_mat4(&mut self, name: &str, value: &Matrix4<f32>) -> Result<(), UniformError> {
        let slot = self.resolve(name, UniformKind::Mat4)?;
        let columns: [[f32; 4]; 4] = (*value).into();
        self.write(slot, bytemuck::bytes_of(&columns));
        Ok(())
    }

    pub fn set_vec3(&mut self, name: &str, value: Vector3<f32>) -> Result<(), UniformError> {
        let slot = self.resolve(name, UniformKind::Vec3)?;
        let components: [f32; 3] = value.into();
        self.write(slot, bytemuck::bytes_of(&components));
        Ok(())
    }

    /// Sets an integer uniform, or the unit a texture uniform samples from.
    pub fn set_1i(&mut self, name: &str, value: i32) -> Result<(), UniformError> {
        let slot = *self.uniforms.get(name).ok_or_else(|| UniformError::NotFound {
            name: name.to_string(),
        })?;
        match slot.kind {
            UniformKind::Texture => {
                let unit = u32::try_from(value).map_err(|_| UniformError::TypeMismatch {
                    name: name.to_string(),
                    expected: "texture unit",
                    found: "negative integer",
                })?;
                self.texture_units.insert(name.to_string(), unit);
            }
            UniformKind::Int => self.write(slot, bytemuck::bytes_of(&value)),
            UniformKind::Uint => self.write(slot, bytemuck::bytes_of(&(value as u32))),
            other => {
                return Err(UniformError::TypeMismatch {
                    name: name.to_string(),
                    expected: UniformKind::Int.name(),
                    found: other.name(),
                });
            }
        }
        Ok(())
    }

    pub fn set_1f(&mut self, name: &str, value: f32) -> Result<(), UniformError> {
        let slot = self.resolve(name, UniformKind::Float)?;
        self.write(slot, bytemuck::bytes_of(&value));
        Ok(())
    }

    /// Logs a failed best-effort uniform write, once per uniform name.
    pub fn report_unresolved(&mut self, error: &UniformError) {
        if self.reported.insert(error.name().to_string()) {
            log::warn!("{} (program {})", error, self.id);
        }
    }

    /// Current values of every uniform block.
    pub fn blocks(&self) -> Vec<UniformBlock<'_>> {
        self.blocks
            .iter()
            .map(|(binding, bytes)| UniformBlock {
                binding: *binding,
                bytes,
            })
            .collect()
    }

    /// Forgets every unit assigned through [`set_1i`](Self::set_1i), so the
    /// next draw only samples what is assigned after this call.
    pub fn reset_texture_units(&mut self) {
        self.texture_units.clear();
    }

    /// Texture globals resolved against what is bound to each unit. A texture
    /// uniform without an assigned unit gets no texture, the device binds its
    /// fallback instead.
    pub fn texture_bindings(&self, units: &[Option<TextureId>]) -> Vec<TextureBinding<'_>> {
        self.textures
            .iter()
            .map(|slot| {
                let assigned = self.texture_units.get(&slot.name).copied();
                TextureBinding {
                    binding: slot.binding,
                    name: &slot.name,
                    unit: assigned.unwrap_or(0),
                    texture: assigned.and_then(|unit| units.get(unit as usize).copied().flatten()),
                }
            })
            .collect()
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        log::debug!("releasing {}", self.id);
        self.ctx.destroy_program(self.id);
    }
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("id", &self.id)
            .field("uniforms", &self.uniforms.len())
            .finish()
    }
}
