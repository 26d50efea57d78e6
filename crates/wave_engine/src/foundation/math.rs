//! Math utilities and types
//!
//! Provides fundamental math types for 3D graphics, backed by `nalgebra`.

pub use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Round `size` up to the next multiple of `alignment`.
///
/// Constant-buffer blocks must be a multiple of the minimum hardware
/// allocation size (usually 256 bytes), so a 300-byte block occupies 512.
/// `alignment` must be a power of two.
pub const fn align_up(size: usize, alignment: usize) -> usize {
    (size + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up_constant_block_sizes() {
        assert_eq!(align_up(300, 256), 512);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(1, 256), 256);
        assert_eq!(align_up(257, 256), 512);
    }

    #[test]
    fn test_align_up_non_constant_strides() {
        // Vertex-style strides round to themselves at alignment 1.
        assert_eq!(align_up(44, 1), 44);
        assert_eq!(align_up(0, 256), 0);
    }
}
