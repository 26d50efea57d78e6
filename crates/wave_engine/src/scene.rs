//! Scene trait and lifecycle
//!
//! Scenes plug into the engine by composition: one fixed frame loop
//! drives any type implementing [`Scene`], instead of per-demo app
//! subclasses overriding init/update/render.

use crate::engine::{EngineError, FrameTiming};
use crate::gpu::device::RenderDevice;
use crate::gpu::frame::FrameResource;

/// Buffer sizing a scene reports at build time
pub type SceneLayout = crate::gpu::frame::FrameLayout;

/// Scene lifecycle trait
///
/// Implement this to put content in front of the engine's frame loop.
pub trait Scene<D: RenderDevice> {
    /// Build the scene
    ///
    /// Called once before the frame-resource ring is created. Upload
    /// static geometry here and return the buffer sizing for the ring;
    /// counts are fixed for the scene's lifetime.
    fn build(&mut self, device: &mut D) -> Result<SceneLayout, EngineError>;

    /// Per-frame CPU update
    ///
    /// Called after the ring's fence wait, so every `copy_data` into
    /// `frame`'s buffers is safe. Advance simulations and copy dirty
    /// constants and dynamic vertices here.
    fn update(&mut self, frame: &mut FrameResource<D>, timing: &FrameTiming)
        -> Result<(), EngineError>;

    /// Record draw commands referencing `frame`'s buffers
    ///
    /// The actual command recording is an external capability; the engine
    /// only guarantees `frame` is safe to reference and submits right
    /// after this returns.
    fn record(&mut self, frame: &FrameResource<D>) -> Result<(), EngineError>;

    /// Notification after swap-chain buffers were recreated
    fn resized(&mut self, width: u32, height: u32) {
        let _ = (width, height);
    }
}
