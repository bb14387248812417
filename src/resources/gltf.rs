//! glTF import via the gltf crate.

use std::path::Path;

use crate::{
    data_structures::texture::ImageData,
    error::ImportError,
    resources::import::{
        AssetImporter, ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene, TextureSource,
    },
};

/// Loads the default scene of a `.gltf`/`.glb` file, keeping the node hierarchy.
///
/// Every triangle primitive becomes one mesh. Images are decoded by gltf and
/// stored flipped, uvs are converted to a bottom-left origin to match. Node
/// transforms are not applied.
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfImporter;

/// Converts to tightly packed RGB, bottom row first. `None` for formats other than 8 bit.
fn to_image_data(image: &gltf::image::Data) -> Option<ImageData> {
    let rgb: Vec<u8> = match image.format {
        gltf::image::Format::R8G8B8 => image.pixels.clone(),
        gltf::image::Format::R8G8B8A8 => image
            .pixels
            .chunks_exact(4)
            .flat_map(|p| [p[0], p[1], p[2]])
            .collect(),
        gltf::image::Format::R8 => image.pixels.iter().flat_map(|&g| [g, g, g]).collect(),
        other => {
            log::warn!("unsupported glTF image format {:?}", other);
            return None;
        }
    };
    let row = image.width as usize * 3;
    if row == 0 {
        return None;
    }
    let pixels = rgb.chunks_exact(row).rev().flatten().copied().collect();
    Some(ImageData {
        width: image.width,
        height: image.height,
        pixels,
    })
}

struct Converter<'a> {
    buffers: &'a [gltf::buffer::Data],
    meshes: Vec<ImportedMesh>,
    /// Converted primitives per glTF mesh; meshes used by several nodes convert once.
    converted: Vec<Option<std::ops::Range<usize>>>,
}

impl Converter<'_> {
    fn mesh(&mut self, mesh: &gltf::Mesh) -> std::ops::Range<usize> {
        if let Some(Some(range)) = self.converted.get(mesh.index()) {
            return range.clone();
        }
        let buffers = self.buffers;
        let start = self.meshes.len();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "primitive {} of mesh {} is not a triangle list, skipped",
                    primitive.index(),
                    mesh.index()
                );
                continue;
            }
            let reader =
                primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .map(|p| p.collect())
                .unwrap_or_default();
            let normals = reader
                .read_normals()
                .map(|n| n.collect())
                .unwrap_or_default();
            let uvs = reader
                .read_tex_coords(0)
                .map(|uv| uv.into_f32().map(|[u, v]| [u, 1.0 - v]).collect())
                .unwrap_or_default();
            let indices = reader
                .read_indices()
                .map(|i| i.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());
            self.meshes.push(ImportedMesh {
                name: mesh.name().unwrap_or_default().to_string(),
                positions,
                normals,
                uvs,
                indices,
                material: primitive.material().index(),
            });
        }
        let range = start..self.meshes.len();
        if let Some(slot) = self.converted.get_mut(mesh.index()) {
            *slot = Some(range.clone());
        }
        range
    }

    fn node(&mut self, node: gltf::Node) -> ImportedNode {
        let meshes = node.mesh().map(|m| self.mesh(&m).collect()).unwrap_or_default();
        ImportedNode {
            name: node.name().unwrap_or_default().to_string(),
            meshes,
            children: node.children().map(|child| self.node(child)).collect(),
        }
    }
}

impl AssetImporter for GltfImporter {
    fn import(&self, path: &Path) -> Result<ImportedScene, ImportError> {
        let (document, buffers, images) = gltf::import(path).map_err(|e| ImportError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) else {
            return Err(ImportError::Open {
                path: path.to_path_buf(),
                reason: "file contains no scene".to_string(),
            });
        };

        let mut converter = Converter {
            buffers: &buffers,
            meshes: Vec::new(),
            converted: vec![None; document.meshes().count()],
        };
        let root = ImportedNode {
            name: scene.name().unwrap_or_default().to_string(),
            meshes: Vec::new(),
            children: scene.nodes().map(|node| converter.node(node)).collect(),
        };

        // Undecodable images stay as 1x1 white to keep the indices stable.
        let images: Vec<ImageData> = images
            .iter()
            .map(|image| to_image_data(image).unwrap_or_else(|| ImageData::solid(1, 1, [255; 3])))
            .collect();

        let materials = document
            .materials()
            .map(|material| {
                let pbr = material.pbr_metallic_roughness();
                let [r, g, b, _] = pbr.base_color_factor();
                ImportedMaterial {
                    name: material.name().unwrap_or_default().to_string(),
                    diffuse: Some([r, g, b]),
                    diffuse_textures: pbr
                        .base_color_texture()
                        .map(|info| TextureSource::Embedded(info.texture().source().index()))
                        .into_iter()
                        .collect(),
                    ..Default::default()
                }
            })
            .collect();

        Ok(ImportedScene {
            root,
            meshes: converter.meshes,
            materials,
            images,
        })
    }
}
