use std::rc::Rc;

use scene_ngin::{
    data_structures::{
        buffer::GpuBuffer,
        mesh::Mesh,
        model::Model,
        scene::Scene,
        texture::{ImageData, Texture, TextureKind},
    },
    device::{
        BufferKind,
        headless::{DeviceCall, ObjectKind},
    },
    error::{DeviceError, ResourceError},
    render::Renderer,
};

use crate::common::test_utils::{TRIANGLE, headless, identity, program, texture, triangle};

mod common;

const KINDS: [ObjectKind; 4] = [
    ObjectKind::Buffer,
    ObjectKind::Texture,
    ObjectKind::Program,
    ObjectKind::VertexLayout,
];

#[test]
fn everything_is_released_exactly_once() {
    let (device, ctx) = headless();
    {
        let mut program = program(&ctx);
        let renderer = Renderer::create(&ctx).unwrap();
        let shared = texture(&ctx, TextureKind::Diffuse);
        let first = Mesh::with_textures(&ctx, &TRIANGLE, &[0, 1, 2], vec![Rc::clone(&shared)]).unwrap();
        let second = Mesh::with_textures(&ctx, &TRIANGLE, &[0, 1, 2], vec![shared]).unwrap();
        let model = Model::from_meshes(vec![triangle(&ctx)]);

        let mut scene = Scene::new();
        scene.add(Rc::new(first), identity());
        scene.add(Rc::new(second), identity());
        scene.add(Rc::new(model), identity());
        renderer
            .render_scene(&scene, &mut program, &identity(), &identity())
            .unwrap();

        assert_eq!(device.live_count(ObjectKind::Buffer), 6);
        assert_eq!(device.live_count(ObjectKind::Texture), 1);
        assert_eq!(device.live_count(ObjectKind::Program), 1);
        assert_eq!(device.live_count(ObjectKind::VertexLayout), 1);
    }

    for kind in KINDS {
        assert_eq!(device.live_count(kind), 0, "{kind:?} left alive");
    }
    assert!(device.bad_releases().is_empty());
}

#[test]
fn texture_outlives_the_mesh_that_dropped_it() {
    let (device, ctx) = headless();
    let shared = texture(&ctx, TextureKind::Diffuse);
    let mesh = Mesh::with_textures(&ctx, &TRIANGLE, &[0, 1, 2], vec![Rc::clone(&shared)]).unwrap();

    drop(mesh);
    assert!(device.is_live(ObjectKind::Texture, shared.id().raw()));

    let id = shared.id();
    drop(shared);
    assert!(!device.is_live(ObjectKind::Texture, id.raw()));
    assert!(device.bad_releases().is_empty());
}

#[test]
fn failed_index_upload_releases_the_vertex_buffer() {
    let (device, ctx) = headless();
    device.fail_allocations_after(1, 1);

    let error = Mesh::create(&ctx, &TRIANGLE, &[0, 1, 2]).unwrap_err();

    assert!(matches!(error, ResourceError::Device(DeviceError::Allocation { .. })));
    assert_eq!(device.live_count(ObjectKind::Buffer), 0);
    assert!(device.bad_releases().is_empty());
}

#[test]
fn failed_allocation_leaks_nothing() {
    let (device, ctx) = headless();

    device.fail_next_allocations(1);
    let error = Mesh::create(&ctx, &TRIANGLE, &[0, 1, 2]).unwrap_err();
    assert!(matches!(error, ResourceError::Device(DeviceError::Allocation { .. })));

    device.fail_next_allocations(1);
    let image = ImageData::solid(1, 1, [0, 0, 0]);
    assert!(Texture::create(&ctx, &image, TextureKind::Diffuse).is_err());

    device.fail_next_allocations(1);
    assert!(Renderer::create(&ctx).is_err());

    for kind in KINDS {
        assert_eq!(device.live_count(kind), 0, "{kind:?} left alive");
    }
    assert!(device.bad_releases().is_empty());
}

#[test]
fn textures_with_mismatched_pixel_data_are_rejected() {
    let (device, ctx) = headless();
    let images = [
        ImageData {
            width: 64,
            height: 64,
            pixels: vec![0; 3],
        },
        ImageData {
            width: 2,
            height: 2,
            pixels: vec![0; 2 * 2 * 3 + 1],
        },
        ImageData {
            width: 0,
            height: 4,
            pixels: Vec::new(),
        },
        ImageData {
            width: u32::MAX,
            height: u32::MAX,
            pixels: vec![0; 3],
        },
    ];

    for image in &images {
        let error = Texture::create(&ctx, image, TextureKind::Diffuse).unwrap_err();
        assert!(
            matches!(error, DeviceError::Allocation { what: "texture", .. }),
            "{}x{} with {} bytes: {error}",
            image.width,
            image.height,
            image.pixels.len()
        );
    }

    assert_eq!(device.live_count(ObjectKind::Texture), 0);
    assert!(
        !device
            .calls()
            .iter()
            .any(|call| matches!(call, DeviceCall::CreateTexture { .. }))
    );
    assert!(Texture::create(&ctx, &ImageData::solid(2, 2, [1, 2, 3]), TextureKind::Diffuse).is_ok());
}

#[test]
fn buffers_report_their_size() {
    let (_device, ctx) = headless();
    let buffer = GpuBuffer::from_slice(&ctx, BufferKind::Index, &[0u32, 1, 2]).unwrap();
    assert_eq!(buffer.byte_length(), 12);
    assert_eq!(buffer.kind(), BufferKind::Index);
}
