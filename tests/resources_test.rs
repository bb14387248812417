use std::{path::Path, rc::Rc};

use cgmath::{Matrix4, Quaternion, SquareMatrix, Vector3, Vector4};
use scene_ngin::{
    data_structures::{instance::Instance, light::PointLight, scene::Scene},
    error::{ImportError, ResourceError},
    resources::{
        asset_path,
        image::{FileImageDecoder, ImageDecoder},
        import::importer_for,
        load_binary, load_string,
    },
};

use crate::common::test_utils::{headless, triangle};

mod common;

#[test]
fn decoded_images_start_with_the_bottom_row() {
    let image = FileImageDecoder
        .decode(Path::new("assets/textures/checker.png"))
        .unwrap();

    assert_eq!((image.width, image.height), (8, 8));
    assert_eq!(image.pixels.len(), 8 * 8 * 3);
    // The top-left texel of the file is light, the bottom-left one dark.
    assert_eq!(&image.pixels[0..3], &[40, 40, 40]);
    let last_row = 7 * 8 * 3;
    assert_eq!(&image.pixels[last_row..last_row + 3], &[230, 230, 230]);
}

#[test]
fn undecodable_images_are_image_errors() {
    let error = FileImageDecoder
        .decode(Path::new("assets/models/cube/cube.obj"))
        .unwrap_err();
    assert!(matches!(error, ResourceError::Image { .. }));
}

#[test]
fn assets_are_resolved_below_the_assets_directory() {
    assert_eq!(
        asset_path("shaders/vertex.wgsl"),
        Path::new("./assets/shaders/vertex.wgsl")
    );
    assert!(load_string("shaders/vertex.wgsl").unwrap().contains("@vertex"));
    assert!(!load_binary("textures/checker.png").unwrap().is_empty());
    assert!(matches!(
        load_string("shaders/missing.wgsl"),
        Err(ResourceError::Io { .. })
    ));
}

#[test]
fn importers_are_chosen_by_extension() {
    assert!(importer_for(Path::new("a/b.OBJ")).is_ok());
    assert!(importer_for(Path::new("scene.gltf")).is_ok());
    assert!(importer_for(Path::new("scene.glb")).is_ok());
    assert!(matches!(
        importer_for(Path::new("scene.fbx")),
        Err(ImportError::Unsupported(_))
    ));
    assert!(importer_for(Path::new("no_extension")).is_err());
}

#[test]
fn scene_keeps_insertion_order_and_clears() {
    let (_device, ctx) = headless();
    let mesh = Rc::new(triangle(&ctx));
    let mut scene = Scene::new();
    assert!(scene.is_empty());

    scene.add_instance(Instance::at(mesh.clone(), Vector3::new(1.0, 0.0, 0.0)));
    scene.add_instance(Instance::identity(mesh));
    let light = scene.add_light(PointLight::white(Vector3::new(0.0, 1.0, 0.0)));

    assert_eq!(scene.len(), 2);
    assert_eq!(light, 0);
    assert_eq!(
        scene.instances()[0].transform,
        Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0))
    );
    assert_eq!(scene.instances()[1].transform, Matrix4::identity());

    scene.clear();
    assert!(scene.is_empty());
    assert!(scene.lights().is_empty());
}

#[test]
fn instance_parts_scale_before_translating() {
    let (_device, ctx) = headless();
    let instance = Instance::from_parts(
        Rc::new(triangle(&ctx)),
        Vector3::new(0.0, 0.0, -2.0),
        Quaternion::new(1.0, 0.0, 0.0, 0.0),
        Vector3::new(2.0, 3.0, 4.0),
    );

    let moved = instance.transform * Vector4::new(1.0, 1.0, 1.0, 1.0);
    assert_eq!(moved, Vector4::new(2.0, 3.0, 2.0, 1.0));
}
