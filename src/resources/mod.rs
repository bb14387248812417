//! Loading meshes, textures and shader sources from external files.
//!
//! File formats are handled behind two boundaries: [`import::AssetImporter`]
//! for model files (OBJ via tobj, glTF via gltf) and [`image::ImageDecoder`]
//! for pictures. [`ModelLoader`] puts the two together and creates the device
//! resources.

pub mod gltf;
pub mod image;
pub mod import;
pub mod obj;

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use cgmath::Vector3;

use crate::{
    context::Context,
    data_structures::{
        material::Material,
        mesh::{Mesh, Vertex},
        model::Model,
        texture::{Texture, TextureKind},
    },
    error::ResourceError,
    resources::{
        image::{FileImageDecoder, ImageDecoder},
        import::{AssetImporter, ImportedMesh, ImportedNode, ImportedScene, TextureSource, importer_for},
    },
};

/// Path of a file below `./assets`.
pub fn asset_path(file_name: impl AsRef<Path>) -> PathBuf {
    Path::new("./").join("assets").join(file_name)
}

pub fn load_string(file_name: impl AsRef<Path>) -> Result<String, ResourceError> {
    let path = asset_path(file_name);
    fs::read_to_string(&path).map_err(|source| ResourceError::Io { path, source })
}

pub fn load_binary(file_name: impl AsRef<Path>) -> Result<Vec<u8>, ResourceError> {
    let path = asset_path(file_name);
    fs::read(&path).map_err(|source| ResourceError::Io { path, source })
}

/// Builds [`Model`]s from model files.
///
/// Loading tolerates partial failure: a mesh that cannot be converted or
/// uploaded is skipped, a texture that cannot be loaded is left off its mesh,
/// each with a warning. Only a file that cannot be opened fails the load.
pub struct ModelLoader {
    importer: Option<Box<dyn AssetImporter>>,
    decoder: Box<dyn ImageDecoder>,
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self {
            importer: None,
            decoder: Box::new(FileImageDecoder),
        }
    }
}

/// Textures loaded so far during one [`ModelLoader::load`].
type TextureCache = HashMap<TextureSource, Rc<Texture>>;

impl ModelLoader {
    /// Uses `importer` for every file instead of choosing one by extension.
    pub fn with_importer(mut self, importer: impl AssetImporter + 'static) -> Self {
        self.importer = Some(Box::new(importer));
        self
    }

    pub fn with_decoder(mut self, decoder: impl ImageDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn load(&self, ctx: &Context, path: impl AsRef<Path>) -> Result<Model, ResourceError> {
        let path = path.as_ref();
        let scene = match &self.importer {
            Some(importer) => importer.import(path)?,
            None => importer_for(path)?.import(path)?,
        };
        let base = path.parent().unwrap_or_else(|| Path::new(""));

        let mut textures = TextureCache::new();
        let mut meshes = Vec::new();
        self.process_node(ctx, &scene, &scene.root, base, &mut textures, &mut meshes);
        log::info!(
            "loaded {} of {} meshes from '{}'",
            meshes.len(),
            scene.meshes.len(),
            path.display()
        );
        Ok(Model::from_meshes(meshes))
    }

    /// Own meshes first, then the children in order.
    fn process_node(
        &self,
        ctx: &Context,
        scene: &ImportedScene,
        node: &ImportedNode,
        base: &Path,
        textures: &mut TextureCache,
        meshes: &mut Vec<Mesh>,
    ) {
        for (i, &index) in node.meshes.iter().enumerate() {
            let Some(imported) = scene.meshes.get(index) else {
                log::warn!("node '{}' references missing mesh {}", node.name, index);
                continue;
            };
            match self.process_mesh(ctx, scene, imported, base, textures) {
                Ok(mesh) => meshes.push(mesh),
                Err(e) => log::warn!("could not load mesh {} from node '{}': {}", i, node.name, e),
            }
        }
        for child in &node.children {
            self.process_node(ctx, scene, child, base, textures, meshes);
        }
    }

    fn process_mesh(
        &self,
        ctx: &Context,
        scene: &ImportedScene,
        imported: &ImportedMesh,
        base: &Path,
        textures: &mut TextureCache,
    ) -> Result<Mesh, ResourceError> {
        let vertices: Vec<Vertex> = imported
            .positions
            .iter()
            .enumerate()
            .map(|(i, &position)| Vertex {
                position,
                normal: imported.normals.get(i).copied().unwrap_or([0.0; 3]),
                uv: imported.uvs.get(i).copied().unwrap_or([0.0; 2]),
            })
            .collect();

        let mut material = Material::default();
        if let Some(imported_material) = imported.material.and_then(|i| scene.materials.get(i)) {
            if let Some(ambient) = imported_material.ambient {
                material.ambient_color = Vector3::from(ambient);
            }
            if let Some(diffuse) = imported_material.diffuse {
                material.diffuse_color = Vector3::from(diffuse);
            }
            if let Some(specular) = imported_material.specular {
                material.specular_color = Vector3::from(specular);
            }
            if let Some(shininess) = imported_material.shininess {
                material.shininess = shininess;
            }
            if let Some(source) = imported_material.diffuse_textures.first() {
                match self.texture(ctx, scene, source, base, textures) {
                    Ok(texture) => material.textures.push(texture),
                    Err(e) => log::warn!(
                        "texture of mesh '{}' dropped: {}",
                        imported.name,
                        e
                    ),
                }
            }
        }

        Mesh::with_material(ctx, &vertices, &imported.indices, material)
    }

    fn texture(
        &self,
        ctx: &Context,
        scene: &ImportedScene,
        source: &TextureSource,
        base: &Path,
        textures: &mut TextureCache,
    ) -> Result<Rc<Texture>, ResourceError> {
        if let Some(texture) = textures.get(source) {
            return Ok(Rc::clone(texture));
        }
        let texture = match source {
            TextureSource::File(file) => {
                Texture::load_with(ctx, self.decoder.as_ref(), &base.join(file), TextureKind::Diffuse)?
            }
            TextureSource::Embedded(index) => {
                let image = scene.images.get(*index).ok_or_else(|| {
                    ResourceError::InvalidMesh(format!("missing embedded image {index}"))
                })?;
                Texture::create(ctx, image, TextureKind::Diffuse)?
            }
        };
        let texture = Rc::new(texture);
        textures.insert(source.clone(), Rc::clone(&texture));
        Ok(texture)
    }
}
