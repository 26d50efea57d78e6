//! GPU constant-block and vertex layouts
//!
//! These structs are copied byte-for-byte into upload buffers, so their
//! layout is fixed with `#[repr(C, align(16))]` and 16-byte padding rules
//! matching shader-side constant blocks.

use crate::foundation::math::{Mat4, Vec2, Vec3, Vec4};

/// Per-pass constants - updated once per rendered frame
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy)]
pub struct PassConstants {
    /// View matrix (world to camera space)
    pub view: Mat4,
    /// Inverse view matrix
    pub inv_view: Mat4,
    /// Projection matrix (camera to clip space)
    pub proj: Mat4,
    /// Inverse projection matrix
    pub inv_proj: Mat4,
    /// Pre-computed view-projection matrix
    pub view_proj: Mat4,
    /// Inverse view-projection matrix
    pub inv_view_proj: Mat4,
    /// Camera position in world space (Vec3 + padding)
    pub eye_position: Vec4,
    /// Render target size (width, height)
    pub render_target_size: Vec2,
    /// Reciprocal render target size
    pub inv_render_target_size: Vec2,
    /// Near clip plane
    pub near_z: f32,
    /// Far clip plane
    pub far_z: f32,
    /// Total running time in seconds
    pub total_time: f32,
    /// Delta time of this frame in seconds
    pub delta_time: f32,
    /// Ambient light color and intensity
    pub ambient_light: Vec4,
}

/// Per-object constants - updated while the object is dirty
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy)]
pub struct ObjectConstants {
    /// World matrix (object to world space)
    pub world: Mat4,
    /// Texture coordinate transform
    pub tex_transform: Mat4,
}

/// Per-material constants - updated while the material is dirty
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy)]
pub struct MaterialConstants {
    /// Base color (RGBA)
    pub diffuse_albedo: Vec4,
    /// Fresnel reflectance at normal incidence
    pub fresnel_r0: Vec3,
    /// Surface roughness in [0, 1]
    pub roughness: f32,
    /// Material texture transform
    pub transform: Mat4,
}

/// Standard scene vertex; also streamed per frame for dynamic surfaces
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// World-space position
    pub position: Vec3,
    /// Surface normal
    pub normal: Vec3,
    /// Texture coordinate
    pub tex_coord: Vec2,
    /// Vertex color (RGBA)
    pub color: Vec4,
}

unsafe impl bytemuck::Pod for PassConstants {}
unsafe impl bytemuck::Zeroable for PassConstants {}

unsafe impl bytemuck::Pod for ObjectConstants {}
unsafe impl bytemuck::Zeroable for ObjectConstants {}

unsafe impl bytemuck::Pod for MaterialConstants {}
unsafe impl bytemuck::Zeroable for MaterialConstants {}

unsafe impl bytemuck::Pod for Vertex {}
unsafe impl bytemuck::Zeroable for Vertex {}

impl Default for PassConstants {
    fn default() -> Self {
        Self {
            view: Mat4::identity(),
            inv_view: Mat4::identity(),
            proj: Mat4::identity(),
            inv_proj: Mat4::identity(),
            view_proj: Mat4::identity(),
            inv_view_proj: Mat4::identity(),
            eye_position: Vec4::new(0.0, 0.0, 0.0, 1.0),
            render_target_size: Vec2::new(800.0, 600.0),
            inv_render_target_size: Vec2::new(1.0 / 800.0, 1.0 / 600.0),
            near_z: 0.1,
            far_z: 1000.0,
            total_time: 0.0,
            delta_time: 0.0,
            ambient_light: Vec4::new(0.25, 0.25, 0.35, 1.0),
        }
    }
}

impl Default for ObjectConstants {
    fn default() -> Self {
        Self {
            world: Mat4::identity(),
            tex_transform: Mat4::identity(),
        }
    }
}

impl Default for MaterialConstants {
    fn default() -> Self {
        Self {
            diffuse_albedo: Vec4::new(1.0, 1.0, 1.0, 1.0),
            fresnel_r0: Vec3::new(0.01, 0.01, 0.01),
            roughness: 0.25,
            transform: Mat4::identity(),
        }
    }
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            normal: Vec3::new(0.0, 1.0, 0.0),
            tex_coord: Vec2::zeros(),
            color: Vec4::new(1.0, 1.0, 1.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_blocks_have_shader_friendly_sizes() {
        // 16-byte multiples with no implicit padding holes.
        assert_eq!(std::mem::size_of::<PassConstants>() % 16, 0);
        assert_eq!(std::mem::size_of::<ObjectConstants>(), 128);
        assert_eq!(std::mem::size_of::<MaterialConstants>(), 96);
    }

    #[test]
    fn test_vertex_is_densely_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 48);
    }
}
