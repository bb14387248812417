//! Engine data structures: GPU resources, materials, drawables and the scene.
//!
//! - `buffer` owns one device buffer of vertex or index data
//! - `texture` owns one device image and knows its role in a material
//! - `material` holds colours, shininess and the textures of a mesh
//! - `mesh` and `model` are the two [`Drawable`](crate::render::Drawable) kinds
//! - `light` has the light kinds a scene can hold
//! - `instance` places a drawable in the world
//! - `scene` collects instances and lights for one render

pub mod buffer;
pub mod instance;
pub mod light;
pub mod material;
pub mod mesh;
pub mod model;
pub mod scene;
pub mod texture;
