//! Surface description attached to every mesh.

use std::rc::Rc;

use cgmath::Vector3;

use crate::data_structures::texture::{Texture, TextureKind};

/// Colours, shininess and the textures a mesh is drawn with.
///
/// Fields are public: callers recolour a mesh by editing its material
/// directly, e.g. `mesh.material_mut().ambient_color = ...`.
#[derive(Debug, Clone)]
pub struct Material {
    pub ambient_color: Vector3<f32>,
    pub emission_color: Vector3<f32>,
    pub diffuse_color: Vector3<f32>,
    pub specular_color: Vector3<f32>,
    pub shininess: f32,
    pub textures: Vec<Rc<Texture>>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient_color: Vector3::new(0.5, 0.5, 0.5),
            emission_color: Vector3::new(0.0, 0.0, 0.0),
            diffuse_color: Vector3::new(0.0, 0.0, 1.0),
            specular_color: Vector3::new(1.0, 1.0, 1.0),
            shininess: 0.0,
            textures: Vec::new(),
        }
    }
}

impl Material {
    pub fn with_textures(textures: Vec<Rc<Texture>>) -> Self {
        Self {
            textures,
            ..Default::default()
        }
    }

    pub fn count(&self, kind: TextureKind) -> usize {
        self.textures.iter().filter(|t| t.kind() == kind).count()
    }

    /// Uniform name for every attached texture in order, `_<n>` counted per kind from 1.
    pub fn texture_uniforms(&self) -> Vec<String> {
        let mut diffuse = 0;
        let mut specular = 0;
        self.textures
            .iter()
            .map(|texture| {
                let counter = match texture.kind() {
                    TextureKind::Diffuse => &mut diffuse,
                    TextureKind::Specular => &mut specular,
                };
                *counter += 1;
                format!("{}{}", texture.kind().uniform_prefix(), counter)
            })
            .collect()
    }
}
