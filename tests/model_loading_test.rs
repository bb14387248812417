use std::{
    cell::Cell,
    io,
    path::{Path, PathBuf},
    rc::Rc,
};

use cgmath::Vector3;
use scene_ngin::{
    data_structures::{model::Model, texture::ImageData},
    device::headless::ObjectKind,
    error::{ImportError, ResourceError},
    resources::{
        ModelLoader,
        image::ImageDecoder,
        import::{
            AssetImporter, ImportedMaterial, ImportedMesh, ImportedNode, ImportedScene,
            TextureSource,
        },
    },
};

use crate::common::test_utils::headless;

mod common;

fn quad(name: &str, material: Option<usize>) -> ImportedMesh {
    ImportedMesh {
        name: name.to_string(),
        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        normals: vec![[0.0, 0.0, 1.0]; 4],
        uvs: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        indices: vec![0, 1, 2, 0, 2, 3],
        material,
    }
}

/// Hands out a fixed scene regardless of the path.
struct FixedImporter(ImportedScene);

impl AssetImporter for FixedImporter {
    fn import(&self, _path: &Path) -> Result<ImportedScene, ImportError> {
        Ok(self.0.clone())
    }
}

struct BrokenDecoder;

impl ImageDecoder for BrokenDecoder {
    fn decode(&self, path: &Path) -> Result<ImageData, ResourceError> {
        Err(ResourceError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidData, "corrupt image"),
        })
    }
}

/// Decodes every file to a 1x1 pixel and counts the calls.
#[derive(Clone, Default)]
struct CountingDecoder(Rc<Cell<usize>>);

impl ImageDecoder for CountingDecoder {
    fn decode(&self, _path: &Path) -> Result<ImageData, ResourceError> {
        self.0.set(self.0.get() + 1);
        Ok(ImageData::solid(1, 1, [255, 255, 255]))
    }
}

fn textured_material(file: &str) -> ImportedMaterial {
    ImportedMaterial {
        name: "textured".to_string(),
        ambient: Some([0.1, 0.2, 0.3]),
        diffuse_textures: vec![TextureSource::File(PathBuf::from(file))],
        ..Default::default()
    }
}

#[test]
fn broken_parts_are_skipped_and_the_rest_is_kept() {
    let (device, ctx) = headless();
    let mut broken = quad("broken", None);
    broken.indices = vec![0, 1, 9];
    let scene = ImportedScene {
        root: ImportedNode {
            name: "root".to_string(),
            meshes: vec![0, 1, 7],
            children: vec![ImportedNode {
                name: "child".to_string(),
                meshes: vec![2],
                children: Vec::new(),
            }],
        },
        meshes: vec![quad("textured", Some(0)), broken, quad("plain", None)],
        materials: vec![textured_material("missing.png")],
        images: Vec::new(),
    };

    let model = ModelLoader::default()
        .with_importer(FixedImporter(scene))
        .with_decoder(BrokenDecoder)
        .load(&ctx, "virtual/model.obj")
        .unwrap();

    assert_eq!(model.meshes().len(), 2);
    let textured = model.meshes()[0].material();
    assert!(textured.textures.is_empty());
    assert_eq!(textured.ambient_color, Vector3::new(0.1, 0.2, 0.3));
    assert_eq!(model.meshes()[1].index_count(), 6);
    drop(textured);

    assert_eq!(device.live_count(ObjectKind::Texture), 0);
    drop(model);
    assert_eq!(device.live_count(ObjectKind::Buffer), 0);
    assert!(device.bad_releases().is_empty());
}

#[test]
fn meshes_follow_depth_first_node_order() {
    let (_device, ctx) = headless();
    let mut first = quad("first", None);
    first.indices = vec![0, 1, 2];
    let scene = ImportedScene {
        root: ImportedNode {
            name: "root".to_string(),
            meshes: vec![0],
            children: vec![
                ImportedNode {
                    name: "a".to_string(),
                    meshes: vec![1],
                    children: vec![ImportedNode {
                        name: "a.a".to_string(),
                        meshes: vec![2],
                        children: Vec::new(),
                    }],
                },
                ImportedNode {
                    name: "b".to_string(),
                    meshes: vec![0],
                    children: Vec::new(),
                },
            ],
        },
        meshes: vec![first, quad("second", None), quad("third", None)],
        materials: Vec::new(),
        images: Vec::new(),
    };

    let model = ModelLoader::default()
        .with_importer(FixedImporter(scene))
        .load(&ctx, "virtual/model.gltf")
        .unwrap();

    let counts: Vec<u32> = model.meshes().iter().map(|m| m.index_count()).collect();
    assert_eq!(counts, vec![3, 6, 6, 3]);
}

#[test]
fn textures_are_decoded_once_per_model() {
    let (device, ctx) = headless();
    let decoder = CountingDecoder::default();
    let scene = ImportedScene {
        root: ImportedNode {
            name: "root".to_string(),
            meshes: vec![0, 1],
            children: Vec::new(),
        },
        meshes: vec![quad("a", Some(0)), quad("b", Some(1))],
        materials: vec![textured_material("shared.png"), textured_material("shared.png")],
        images: Vec::new(),
    };

    let model = ModelLoader::default()
        .with_importer(FixedImporter(scene))
        .with_decoder(decoder.clone())
        .load(&ctx, "virtual/model.obj")
        .unwrap();

    assert_eq!(decoder.0.get(), 1);
    assert_eq!(device.live_count(ObjectKind::Texture), 1);
    let first = Rc::clone(&model.meshes()[0].material().textures[0]);
    let second = Rc::clone(&model.meshes()[1].material().textures[0]);
    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn embedded_images_become_textures() {
    let (device, ctx) = headless();
    let scene = ImportedScene {
        root: ImportedNode {
            name: "root".to_string(),
            meshes: vec![0],
            children: Vec::new(),
        },
        meshes: vec![quad("a", Some(0))],
        materials: vec![ImportedMaterial {
            diffuse_textures: vec![TextureSource::Embedded(0)],
            ..Default::default()
        }],
        images: vec![ImageData::solid(4, 2, [10, 20, 30])],
    };

    let model = ModelLoader::default()
        .with_importer(FixedImporter(scene))
        .load(&ctx, "virtual/model.glb")
        .unwrap();

    let material = model.meshes()[0].material();
    assert_eq!(material.textures.len(), 1);
    assert_eq!((material.textures[0].width(), material.textures[0].height()), (4, 2));
    assert_eq!(device.live_count(ObjectKind::Texture), 1);
}

#[test]
fn bundled_cube_loads_with_its_material() {
    let (device, ctx) = headless();

    let model = Model::create(&ctx, "assets/models/cube/cube.obj").unwrap();

    assert_eq!(model.meshes().len(), 1);
    let cube = &model.meshes()[0];
    assert_eq!(cube.index_count(), 36);
    let material = cube.material();
    assert_eq!(material.ambient_color, Vector3::new(0.2, 0.2, 0.2));
    assert_eq!(material.shininess, 32.0);
    assert_eq!(material.textures.len(), 1);
    assert_eq!(material.textures[0].width(), 16);
    assert_eq!(device.live_count(ObjectKind::Texture), 1);
}

#[test]
fn unknown_extensions_are_rejected() {
    let (_device, ctx) = headless();
    let error = Model::create(&ctx, "assets/models/cube/cube.mtl").unwrap_err();
    assert!(matches!(
        error,
        ResourceError::Import(ImportError::Unsupported(_))
    ));
}

#[test]
fn missing_files_fail_the_load() {
    let (device, ctx) = headless();
    let error = Model::create(&ctx, "assets/models/missing.obj").unwrap_err();
    assert!(matches!(error, ResourceError::Import(ImportError::Open { .. })));
    assert_eq!(device.live_count(ObjectKind::Buffer), 0);
}
