//! Wavefront OBJ import via tobj.

use std::path::{Path, PathBuf};

use crate::{
    error::ImportError,
    resources::import::{
        AssetImporter, ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene, TextureSource,
    },
};

/// Loads every object of an OBJ file as one mesh under a single root node.
///
/// Faces are triangulated and positions, normals and uvs share one index, so
/// the index list can be used as is.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjImporter;

fn chunk3(values: &[f32]) -> Vec<[f32; 3]> {
    values.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect()
}

fn texture(name: &Option<String>) -> Vec<TextureSource> {
    name.iter()
        .filter(|n| !n.is_empty())
        .map(|n| TextureSource::File(PathBuf::from(n)))
        .collect()
}

impl AssetImporter for ObjImporter {
    fn import(&self, path: &Path) -> Result<ImportedScene, ImportError> {
        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|e| ImportError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let materials = materials.unwrap_or_else(|e| {
            log::warn!("no materials for '{}': {}", path.display(), e);
            Vec::new()
        });

        let meshes: Vec<ImportedMesh> = models
            .into_iter()
            .map(|m| ImportedMesh {
                name: m.name,
                positions: chunk3(&m.mesh.positions),
                normals: chunk3(&m.mesh.normals),
                // OBJ texture coordinates already have their origin bottom-left.
                uvs: m
                    .mesh
                    .texcoords
                    .chunks_exact(2)
                    .map(|c| [c[0], c[1]])
                    .collect(),
                indices: m.mesh.indices,
                material: m.mesh.material_id,
            })
            .collect();

        let materials = materials
            .into_iter()
            .map(|m| ImportedMaterial {
                diffuse_textures: texture(&m.diffuse_texture),
                specular_textures: texture(&m.specular_texture),
                name: m.name,
                ambient: m.ambient,
                diffuse: m.diffuse,
                specular: m.specular,
                shininess: m.shininess,
            })
            .collect();

        let root = ImportedNode {
            name: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            meshes: (0..meshes.len()).collect(),
            children: Vec::new(),
        };

        Ok(ImportedScene {
            root,
            meshes,
            materials,
            images: Vec::new(),
        })
    }
}
