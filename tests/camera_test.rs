use std::time::Duration;

use cgmath::{Deg, EuclideanSpace, InnerSpace, Point3, Vector3, Vector4};
use scene_ngin::camera::{Camera, CameraController, MAX_PITCH, Projection};
use winit::{event::ElementState, keyboard::KeyCode};

fn assert_close(actual: Vector3<f32>, expected: Vector3<f32>) {
    assert!(
        (actual - expected).magnitude() < 1e-4,
        "{actual:?} is not close to {expected:?}"
    );
}

fn camera() -> Camera {
    Camera::new(
        Point3::new(0.0, 0.0, 3.0),
        Vector3::new(0.0, 0.0, -1.0),
        Vector3::new(0.0, 1.0, 0.0),
    )
}

#[test]
fn pitch_saturates_below_vertical() {
    let mut camera = camera();
    camera.add_pitch(200.0);
    assert_eq!(camera.pitch(), MAX_PITCH);
    assert!(camera.front().y < 1.0);

    camera.add_pitch(-500.0);
    assert_eq!(camera.pitch(), -MAX_PITCH);
    assert!(camera.front().y > -1.0);
}

#[test]
fn view_matrix_is_pure() {
    let camera = camera();
    assert_eq!(camera.view_matrix(), camera.view_matrix());
}

#[test]
fn zero_rotation_keeps_looking_down_negative_z() {
    let mut camera = camera();
    camera.add_yaw(0.0);
    assert_close(camera.front(), Vector3::new(0.0, 0.0, -1.0));
    assert!((camera.front().magnitude() - 1.0).abs() < 1e-5);
}

#[test]
fn yaw_turns_to_the_right() {
    let mut camera = camera();
    camera.add_yaw(90.0);
    assert_close(camera.front(), Vector3::new(1.0, 0.0, 0.0));
}

#[test]
fn view_matrix_moves_the_eye_to_the_origin() {
    let camera = camera();
    let eye = camera.view_matrix() * Point3::new(0.0, 0.0, 3.0).to_homogeneous();
    assert_close(eye.truncate(), Vector3::new(0.0, 0.0, 0.0));
}

#[test]
fn projection_tracks_the_viewport() {
    let mut projection = Projection::new(640, 480, Deg(45.0), 0.1, 1000.0);
    assert!((projection.aspect() - 640.0 / 480.0).abs() < 1e-6);
    projection.resize(100, 100);
    assert_eq!(projection.aspect(), 1.0);

    // A zero height must not turn the aspect into infinity.
    projection.resize(100, 0);
    assert!(projection.aspect().is_finite());
}

#[test]
fn near_plane_maps_to_zero_depth_for_wgpu() {
    let projection = Projection::new(100, 100, Deg(45.0), 0.1, 1000.0);
    let clip = projection.wgpu_matrix() * Vector4::new(0.0, 0.0, -0.1, 1.0);
    assert!((clip.z / clip.w).abs() < 1e-4);
}

#[test]
fn controller_moves_only_while_a_key_is_held() {
    let mut controller = CameraController::new(2.0, 40.0);
    let mut camera = camera();

    assert!(controller.handle_key(KeyCode::KeyW, ElementState::Pressed));
    controller.update_camera(&mut camera, Duration::from_secs(1));
    assert_close(camera.position().to_vec(), Vector3::new(0.0, 0.0, 1.0));

    assert!(controller.handle_key(KeyCode::KeyW, ElementState::Released));
    controller.update_camera(&mut camera, Duration::from_secs(1));
    assert_close(camera.position().to_vec(), Vector3::new(0.0, 0.0, 1.0));
}

#[test]
fn controller_ignores_unmapped_keys() {
    let mut controller = CameraController::new(1.0, 40.0);
    assert!(!controller.handle_key(KeyCode::KeyQ, ElementState::Pressed));
}
