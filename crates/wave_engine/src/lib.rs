//! # Wave Engine
//!
//! A frame-resource pipelined rendering core with a real-time
//! finite-difference water simulation.
//!
//! The engine keeps N frames "in flight": while the GPU executes frame
//! `k-1`, the CPU already prepares frame `k+1`. Every piece of per-frame
//! data (pass/object/material constants, dynamic wave vertices) lives in
//! a rotating ring of [`gpu::FrameResource`] slots, and a fence value per
//! slot guarantees the CPU never overwrites a buffer the GPU may still
//! read.
//!
//! ## Features
//!
//! - **Frame pipelining**: fixed-depth frame-resource ring with a single
//!   steady-state blocking point
//! - **Fence synchronization**: monotonic fence counter, exact waits,
//!   full-queue flush for resize and shutdown
//! - **Wave simulation**: damped finite-difference height field with
//!   localized disturb impulses
//! - **Device seam**: the graphics queue/allocator/upload capability is a
//!   trait; a deterministic headless device ships for tests and demos,
//!   a Vulkan implementation behind the `vulkan` feature
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wave_engine::prelude::*;
//!
//! struct MyScene;
//!
//! impl<D: RenderDevice> Scene<D> for MyScene {
//!     fn build(&mut self, _device: &mut D) -> Result<SceneLayout, EngineError> {
//!         Ok(SceneLayout { object_count: 1, material_count: 1, ..SceneLayout::default() })
//!     }
//!
//!     fn update(&mut self, _frame: &mut FrameResource<D>, _timing: &FrameTiming)
//!         -> Result<(), EngineError>
//!     {
//!         Ok(())
//!     }
//!
//!     fn record(&mut self, _frame: &FrameResource<D>) -> Result<(), EngineError> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (device, queue) = HeadlessDevice::new(HeadlessConfig::default());
//!     let mut engine = Engine::new(device, queue, MyScene, EngineConfig::default())?;
//!     engine.run_frame()?;
//!     engine.shutdown()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod gpu;
pub mod render;
pub mod sim;

mod engine;
mod scene;

pub use engine::{Engine, EngineConfig, EngineError, FrameTiming};
pub use scene::{Scene, SceneLayout};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        engine::{Engine, EngineConfig, EngineError, FrameTiming},
        foundation::{
            math::{Mat4, Vec2, Vec3, Vec4},
            time::FrameTimer,
        },
        gpu::{
            FrameResource, FrameResourceRing, GpuQueue, HeadlessConfig, HeadlessDevice,
            RenderDevice, Synchronizer, UploadBuffer,
        },
        render::{
            constants::{MaterialConstants, ObjectConstants, PassConstants, Vertex},
            scene::{GeometryKey, MaterialKey, RenderItem, SceneTables},
        },
        scene::{Scene, SceneLayout},
        sim::waves::WaveField,
    };
}
