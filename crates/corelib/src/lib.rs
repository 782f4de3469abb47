//! Core types: math re-exports and helpers, Transform, Camera, PointLight, Scene.

pub use glam::{EulerRot, Mat3, Mat4, Quat, Vec3, vec3};

pub mod camera;
pub mod light;
pub mod maths;
pub mod scene;
pub mod transform;
