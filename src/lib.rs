//! scene-ngin
//!
//! A small real-time 3D renderer. Meshes and models loaded from OBJ or glTF
//! files are placed in a scene together with point lights and drawn through
//! one shader program, once per frame, in insertion order. Every GPU-owning
//! value releases its resource exactly once when dropped.
//!
//! High-level modules
//! - `device`: the graphics device boundary, a wgpu backend and a recording headless one
//! - `context`: the shared handle every resource wrapper keeps to its device
//! - `shader`: WGSL programs with name-based uniform access
//! - `data_structures`: buffers, textures, materials, meshes, models, lights and the scene
//! - `resources`: file loading and the model import boundary
//! - `render`: the renderer and the per-frame draw path
//! - `camera`: fly camera, projection and key controls
//! - `app`: the winit viewer built on top of all of the above
//!

pub mod app;
pub mod camera;
pub mod context;
pub mod data_structures;
pub mod device;
pub mod error;
pub mod logging;
pub mod render;
pub mod resources;
pub mod shader;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use context::Context;
pub use render::{Drawable, DrawContext, Renderer};
