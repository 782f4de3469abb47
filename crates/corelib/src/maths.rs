//! Scalar vector helpers over [`Vec3`], spelled out component-wise.

use crate::Vec3;

/// Euclidean norm.
#[inline]
pub fn length(v: Vec3) -> f32 {
    (v.x * v.x + v.y * v.y + v.z * v.z).sqrt()
}

/// Unit vector in the direction of `v`.
/// A zero-length input yields [`Vec3::ZERO`] rather than NaNs.
#[inline]
pub fn normalize(v: Vec3) -> Vec3 {
    let l = length(v);
    if l == 0.0 {
        return Vec3::ZERO;
    }
    Vec3::new(v.x / l, v.y / l, v.z / l)
}

#[inline]
pub fn dot(a: Vec3, b: Vec3) -> f32 {
    a.x * b.x + a.y * b.y + a.z * b.z
}

/// Right-handed cross product.
#[inline]
pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(
        a.y * b.z - a.z * b.y,
        a.z * b.x - a.x * b.z,
        a.x * b.y - a.y * b.x,
    )
}
