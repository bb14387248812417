//! The asset import boundary.
//!
//! Importers read a model file and hand back plain data: a node hierarchy,
//! meshes with positions, normals, uvs and triangle indices, and materials
//! with texture references. Nothing in here touches the device; turning the
//! data into [`Mesh`](crate::data_structures::mesh::Mesh)es is the job of
//! [`ModelLoader`](crate::resources::ModelLoader).

use std::path::{Path, PathBuf};

use crate::{
    data_structures::texture::ImageData,
    error::ImportError,
    resources::{gltf::GltfImporter, obj::ObjImporter},
};

/// Where a material's texture comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextureSource {
    /// A file, relative to the model file's directory.
    File(PathBuf),
    /// An image decoded by the importer, index into [`ImportedScene::images`].
    Embedded(usize),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// First uv channel, bottom-left origin.
    pub uvs: Vec<[f32; 2]>,
    /// Triangle list.
    pub indices: Vec<u32>,
    pub material: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedMaterial {
    pub name: String,
    pub ambient: Option<[f32; 3]>,
    pub diffuse: Option<[f32; 3]>,
    pub specular: Option<[f32; 3]>,
    pub shininess: Option<f32>,
    pub diffuse_textures: Vec<TextureSource>,
    pub specular_textures: Vec<TextureSource>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedNode {
    pub name: String,
    /// Indices into [`ImportedScene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<ImportedNode>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportedScene {
    pub root: ImportedNode,
    pub meshes: Vec<ImportedMesh>,
    pub materials: Vec<ImportedMaterial>,
    pub images: Vec<ImageData>,
}

pub trait AssetImporter {
    fn import(&self, path: &Path) -> Result<ImportedScene, ImportError>;
}

/// Picks an importer by file extension.
pub fn importer_for(path: &Path) -> Result<Box<dyn AssetImporter>, ImportError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("obj") => Ok(Box::new(ObjImporter)),
        Some("gltf") | Some("glb") => Ok(Box::new(GltfImporter)),
        _ => Err(ImportError::Unsupported(path.to_path_buf())),
    }
}
