//! Scene-side tables: geometries, materials, render items
//!
//! Geometries and materials live in arena-owned tables ([`slotmap`]);
//! render items refer to them by key, never by reference, so rebuilding a
//! table can never leave an item dangling.
//!
//! Objects and materials carry a dirty-frame counter sized to the frame
//! ring depth. A change must reach the constant buffer of *every*
//! in-flight slot, so the per-frame upload copies the block while the
//! counter is positive and decrements it once per frame; after `depth`
//! frames the change has propagated everywhere and the copies stop.

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::gpu::device::{DeviceError, UploadMemory};
use crate::gpu::frame::FrameLayout;
use crate::gpu::upload::UploadBuffer;
use crate::render::constants::{MaterialConstants, ObjectConstants, Vertex};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Key into the geometry table
    pub struct GeometryKey;

    /// Key into the material table
    pub struct MaterialKey;
}

/// Static mesh data produced by an external geometry builder
pub struct Geometry {
    /// Debug name
    pub name: String,
    /// Vertex array (empty for dynamic geometry streamed per frame)
    pub vertices: Vec<Vertex>,
    /// Index array
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Number of indices
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

/// Material description with staleness tracking
pub struct Material {
    /// Debug name
    pub name: String,
    /// Slot in the per-material constant buffer
    pub constant_index: usize,
    /// Base color (RGBA)
    pub diffuse_albedo: Vec4,
    /// Fresnel reflectance at normal incidence
    pub fresnel_r0: Vec3,
    /// Surface roughness in [0, 1]
    pub roughness: f32,
    /// Material texture transform
    pub transform: Mat4,
    dirty_frames: usize,
}

impl Material {
    /// Frames this material still needs to be re-uploaded for
    pub fn dirty_frames(&self) -> usize {
        self.dirty_frames
    }
}

/// One drawable object: transforms plus table keys and draw ranges
pub struct RenderItem {
    /// World matrix (object to world space)
    pub world: Mat4,
    /// Texture coordinate transform
    pub tex_transform: Mat4,
    /// Geometry providing the vertex/index data
    pub geometry: GeometryKey,
    /// Material this item is shaded with
    pub material: MaterialKey,
    /// Slot in the per-object constant buffer
    pub object_index: usize,
    /// Number of indices to draw
    pub index_count: u32,
    /// First index in the geometry's index array
    pub start_index: u32,
    /// Offset added to each index
    pub base_vertex: i32,
    /// Whether the item reads the frame slot's dynamic vertex buffer
    /// instead of the geometry's static vertices
    pub dynamic_vertices: bool,
    dirty_frames: usize,
}

impl RenderItem {
    /// Frames this item still needs to be re-uploaded for
    pub fn dirty_frames(&self) -> usize {
        self.dirty_frames
    }
}

/// Owning tables for everything the frame loop draws
pub struct SceneTables {
    /// Geometry arena
    pub geometries: SlotMap<GeometryKey, Geometry>,
    /// Material arena
    pub materials: SlotMap<MaterialKey, Material>,
    items: Vec<RenderItem>,
    ring_depth: usize,
}

impl SceneTables {
    /// Create empty tables for a ring of `ring_depth` slots
    pub fn new(ring_depth: usize) -> Self {
        Self {
            geometries: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            items: Vec::new(),
            ring_depth,
        }
    }

    /// Add a geometry and return its key
    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryKey {
        self.geometries.insert(geometry)
    }

    /// Add a material and return its key
    ///
    /// The material starts fully dirty so its constants reach every ring
    /// slot before first use.
    pub fn add_material(
        &mut self,
        name: impl Into<String>,
        diffuse_albedo: Vec4,
        fresnel_r0: Vec3,
        roughness: f32,
    ) -> MaterialKey {
        let constant_index = self.materials.len();
        self.materials.insert(Material {
            name: name.into(),
            constant_index,
            diffuse_albedo,
            fresnel_r0,
            roughness,
            transform: Mat4::identity(),
            dirty_frames: self.ring_depth,
        })
    }

    /// Add a render item; its constant-buffer slot is its insertion order
    pub fn add_item(
        &mut self,
        world: Mat4,
        tex_transform: Mat4,
        geometry: GeometryKey,
        material: MaterialKey,
        dynamic_vertices: bool,
    ) -> usize {
        let index_count = self.geometries[geometry].index_count();
        let object_index = self.items.len();
        self.items.push(RenderItem {
            world,
            tex_transform,
            geometry,
            material,
            object_index,
            index_count,
            start_index: 0,
            base_vertex: 0,
            dynamic_vertices,
            dirty_frames: self.ring_depth,
        });
        object_index
    }

    /// Render items in draw order
    pub fn items(&self) -> &[RenderItem] {
        &self.items
    }

    /// Move an item; restarts its staleness countdown
    pub fn set_item_world(&mut self, object_index: usize, world: Mat4) {
        let item = &mut self.items[object_index];
        item.world = world;
        item.dirty_frames = self.ring_depth;
    }

    /// Change a material's scalar properties; restarts its countdown
    pub fn set_material(
        &mut self,
        key: MaterialKey,
        diffuse_albedo: Vec4,
        fresnel_r0: Vec3,
        roughness: f32,
    ) {
        let material = &mut self.materials[key];
        material.diffuse_albedo = diffuse_albedo;
        material.fresnel_r0 = fresnel_r0;
        material.roughness = roughness;
        material.dirty_frames = self.ring_depth;
    }

    /// Buffer sizing for one frame slot
    pub fn frame_layout(&self, wave_vertex_count: Option<usize>) -> FrameLayout {
        FrameLayout {
            pass_count: 1,
            object_count: self.items.len(),
            material_count: self.materials.len(),
            wave_vertex_count,
        }
    }

    /// Copy dirty object constants into the current slot's buffer
    ///
    /// Safe only after the slot's fence wait; each dirty item is uploaded
    /// once per frame until every in-flight slot has seen it.
    pub fn upload_object_constants<M: UploadMemory>(
        &mut self,
        buffer: &mut UploadBuffer<ObjectConstants, M>,
    ) -> Result<(), DeviceError> {
        for item in &mut self.items {
            if item.dirty_frames > 0 {
                buffer.copy_data(
                    item.object_index,
                    &ObjectConstants {
                        world: item.world,
                        tex_transform: item.tex_transform,
                    },
                )?;
                item.dirty_frames -= 1;
            }
        }
        Ok(())
    }

    /// Copy dirty material constants into the current slot's buffer
    pub fn upload_material_constants<M: UploadMemory>(
        &mut self,
        buffer: &mut UploadBuffer<MaterialConstants, M>,
    ) -> Result<(), DeviceError> {
        for material in self.materials.values_mut() {
            if material.dirty_frames > 0 {
                buffer.copy_data(
                    material.constant_index,
                    &MaterialConstants {
                        diffuse_albedo: material.diffuse_albedo,
                        fresnel_r0: material.fresnel_r0,
                        roughness: material.roughness,
                        transform: material.transform,
                    },
                )?;
                material.dirty_frames -= 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless::{HeadlessConfig, HeadlessDevice};
    use crate::gpu::upload::UploadKind;

    fn tables_with_one_item(depth: usize) -> SceneTables {
        let mut tables = SceneTables::new(depth);
        let geometry = tables.add_geometry(Geometry {
            name: "quad".into(),
            vertices: vec![Vertex::default(); 4],
            indices: vec![0, 1, 2, 0, 2, 3],
        });
        let material = tables.add_material(
            "grass",
            Vec4::new(0.2, 0.6, 0.2, 1.0),
            Vec3::new(0.01, 0.01, 0.01),
            0.9,
        );
        tables.add_item(
            Mat4::identity(),
            Mat4::identity(),
            geometry,
            material,
            false,
        );
        tables
    }

    #[test]
    fn test_new_item_starts_fully_dirty() {
        let tables = tables_with_one_item(3);
        assert_eq!(tables.items()[0].dirty_frames(), 3);
        assert_eq!(tables.items()[0].index_count, 6);
    }

    #[test]
    fn test_staleness_propagates_exactly_ring_depth_frames() {
        let depth = 3;
        let mut tables = tables_with_one_item(depth);
        let (mut device, _queue) = HeadlessDevice::new(HeadlessConfig::default());
        let mut buffer =
            UploadBuffer::new(&mut device, 1, UploadKind::ConstantBlock).unwrap();

        for expected_remaining in (0..depth).rev() {
            tables.upload_object_constants(&mut buffer).unwrap();
            assert_eq!(tables.items()[0].dirty_frames(), expected_remaining);
        }

        // Fully propagated: further frames no longer copy.
        tables.upload_object_constants(&mut buffer).unwrap();
        assert_eq!(tables.items()[0].dirty_frames(), 0);
    }

    #[test]
    fn test_moving_an_item_restarts_the_countdown() {
        let mut tables = tables_with_one_item(3);
        let (mut device, _queue) = HeadlessDevice::new(HeadlessConfig::default());
        let mut buffer =
            UploadBuffer::new(&mut device, 1, UploadKind::ConstantBlock).unwrap();
        for _ in 0..3 {
            tables.upload_object_constants(&mut buffer).unwrap();
        }
        assert_eq!(tables.items()[0].dirty_frames(), 0);

        tables.set_item_world(0, Mat4::new_translation(&Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(tables.items()[0].dirty_frames(), 3);
    }

    #[test]
    fn test_material_constant_slots_follow_insertion_order() {
        let mut tables = SceneTables::new(3);
        let a = tables.add_material(
            "a",
            Vec4::new(1.0, 0.0, 0.0, 1.0),
            Vec3::zeros(),
            0.5,
        );
        let b = tables.add_material(
            "b",
            Vec4::new(0.0, 1.0, 0.0, 1.0),
            Vec3::zeros(),
            0.5,
        );
        assert_eq!(tables.materials[a].constant_index, 0);
        assert_eq!(tables.materials[b].constant_index, 1);
    }

    #[test]
    fn test_material_edit_marks_dirty() {
        let mut tables = tables_with_one_item(3);
        let key = tables.materials.keys().next().unwrap();
        let (mut device, _queue) = HeadlessDevice::new(HeadlessConfig::default());
        let mut buffer =
            UploadBuffer::new(&mut device, 1, UploadKind::ConstantBlock).unwrap();
        for _ in 0..3 {
            tables.upload_material_constants(&mut buffer).unwrap();
        }
        assert_eq!(tables.materials[key].dirty_frames(), 0);

        tables.set_material(
            key,
            Vec4::new(0.0, 0.0, 1.0, 1.0),
            Vec3::new(0.02, 0.02, 0.02),
            0.3,
        );
        assert_eq!(tables.materials[key].dirty_frames(), 3);
    }
}
