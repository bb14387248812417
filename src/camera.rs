//! First-person camera, perspective projection and the viewer's key mapping.
//!
//! [`Camera`] holds position and orientation and produces the view matrix.
//! [`Projection`] produces the projection matrix for a viewport.
//! [`CameraController`] turns pressed keys into camera movement; only the
//! viewer uses it.

use std::time::Duration;

use cgmath::{Deg, InnerSpace, Matrix4, Point3, Vector3, Zero, perspective};
use winit::{event::ElementState, keyboard::KeyCode};

/// cgmath produces OpenGL clip space (z in -1..1); wgpu expects 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Pitch never reaches ±90° so the view never flips over.
pub const MAX_PITCH: f32 = 89.9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    position: Point3<f32>,
    front: Vector3<f32>,
    up: Vector3<f32>,
    /// Degrees.
    pitch: f32,
    /// Degrees.
    yaw: f32,
}

impl Camera {
    /// A camera with zero pitch and a yaw of -90°, i.e. looking down -z.
    ///
    /// `front` is used as given until the first pitch or yaw change.
    pub fn new(position: Point3<f32>, front: Vector3<f32>, up: Vector3<f32>) -> Self {
        Self {
            position,
            front,
            up,
            pitch: 0.0,
            yaw: -90.0,
        }
    }

    /// Right-handed look-at. Pure: same state, same matrix.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.front, self.up)
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn front(&self) -> Vector3<f32> {
        self.front
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn right(&self) -> Vector3<f32> {
        self.front.cross(self.up).normalize()
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Moves by `direction` as is; scaling by speed and time is up to the caller.
    pub fn pan(&mut self, direction: Vector3<f32>) {
        self.position += direction;
    }

    pub fn add_pitch(&mut self, degrees: f32) {
        self.pitch = (self.pitch + degrees).clamp(-MAX_PITCH, MAX_PITCH);
        self.update_front();
    }

    pub fn add_yaw(&mut self, degrees: f32) {
        self.yaw += degrees;
        self.update_front();
    }

    fn update_front(&mut self) {
        let (pitch_sin, pitch_cos) = self.pitch.to_radians().sin_cos();
        let (yaw_sin, yaw_cos) = self.yaw.to_radians().sin_cos();
        self.front = Vector3::new(yaw_cos * pitch_cos, pitch_sin, yaw_sin * pitch_cos).normalize();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Deg<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Deg<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Perspective projection in OpenGL clip space.
    pub fn matrix(&self) -> Matrix4<f32> {
        perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    /// Perspective projection in wgpu clip space.
    pub fn wgpu_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * self.matrix()
    }
}

/// Maps WASD, Space and Ctrl to movement and the arrow keys to rotation.
#[derive(Debug, Clone, Default)]
pub struct CameraController {
    /// Units per second.
    movement_speed: f32,
    /// Degrees per second.
    rotation_speed: f32,
    forward: bool,
    backward: bool,
    left: bool,
    right: bool,
    up: bool,
    down: bool,
    pitch_up: bool,
    pitch_down: bool,
    yaw_left: bool,
    yaw_right: bool,
}

impl CameraController {
    pub fn new(movement_speed: f32, rotation_speed: f32) -> Self {
        Self {
            movement_speed,
            rotation_speed,
            ..Default::default()
        }
    }

    /// Returns whether the key is one the controller reacts to.
    pub fn handle_key(&mut self, key: KeyCode, state: ElementState) -> bool {
        let pressed = state == ElementState::Pressed;
        let flag = match key {
            KeyCode::KeyW => &mut self.forward,
            KeyCode::KeyS => &mut self.backward,
            KeyCode::KeyA => &mut self.left,
            KeyCode::KeyD => &mut self.right,
            KeyCode::Space => &mut self.up,
            KeyCode::ControlLeft => &mut self.down,
            KeyCode::ArrowUp => &mut self.pitch_up,
            KeyCode::ArrowDown => &mut self.pitch_down,
            KeyCode::ArrowLeft => &mut self.yaw_left,
            KeyCode::ArrowRight => &mut self.yaw_right,
            _ => return false,
        };
        *flag = pressed;
        true
    }

    pub fn update_camera(&self, camera: &mut Camera, dt: Duration) {
        let dt = dt.as_secs_f32();

        let mut direction = Vector3::zero();
        let right = camera.right();
        if self.forward {
            direction += camera.front();
        }
        if self.backward {
            direction -= camera.front();
        }
        if self.up {
            direction += camera.up();
        }
        if self.down {
            direction -= camera.up();
        }
        if self.right {
            direction += right;
        }
        if self.left {
            direction -= right;
        }
        if direction != Vector3::zero() {
            camera.pan(direction.normalize() * self.movement_speed * dt);
        }

        let step = self.rotation_speed * dt;
        let pitch = (self.pitch_up as i8 - self.pitch_down as i8) as f32 * step;
        let yaw = (self.yaw_right as i8 - self.yaw_left as i8) as f32 * step;
        if pitch != 0.0 {
            camera.add_pitch(pitch);
        }
        if yaw != 0.0 {
            camera.add_yaw(yaw);
        }
    }
}

