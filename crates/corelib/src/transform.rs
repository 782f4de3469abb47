use crate::{EulerRot, Mat3, Mat4, Quat, Vec3};

/// Placement of a model instance in world space (Euler XYZ rotation, radians).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation_euler: Vec3,
    pub scale: Vec3,
}

impl Transform {
    #[inline]
    pub const fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation_euler: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    #[inline]
    pub fn with_uniform_scale(mut self, factor: f32) -> Self {
        self.scale = Vec3::splat(factor);
        self
    }

    #[inline]
    fn rotation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::XYZ,
            self.rotation_euler.x,
            self.rotation_euler.y,
            self.rotation_euler.z,
        )
    }

    /// `T * R * S`, column-major.
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation(), self.translation)
    }

    /// Inverse-transpose of the upper 3x3, for transforming normals.
    /// A zero scale component has no inverse; the rotation alone is used then.
    pub fn normal_matrix(&self) -> Mat3 {
        let linear = Mat3::from_mat4(self.matrix());
        if linear.determinant() == 0.0 {
            return Mat3::from_quat(self.rotation());
        }
        let normal = linear.inverse().transpose();
        if normal.is_finite() {
            normal
        } else {
            Mat3::from_quat(self.rotation())
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
