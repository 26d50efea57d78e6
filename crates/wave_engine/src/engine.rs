//! Core engine implementation
//!
//! One fixed frame loop drives any [`Scene`]: pick the next ring slot,
//! wait if the GPU still owns it, run the CPU update into that slot's
//! buffers, hand the recorded work to the queue, signal the fence, and
//! present. Resize and shutdown drain the whole queue first.

use crate::foundation::time::FrameTimer;
use crate::gpu::device::{DeviceError, RenderDevice};
use crate::gpu::frame::FrameResourceRing;
use crate::gpu::sync::Synchronizer;
use crate::scene::Scene;
use crate::sim::SimError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Device or synchronization failure; fatal to the frame loop
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// Simulation precondition violation
    #[error("simulation error: {0}")]
    Sim(#[from] SimError),

    /// Configuration parsing or validation error
    #[error("config error: {0}")]
    Config(String),

    /// Scene-specific error
    #[error("scene error: {0}")]
    Scene(String),
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of frames in flight
    pub frame_ring_depth: usize,
    /// Initial render-target width
    pub window_width: u32,
    /// Initial render-target height
    pub window_height: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_ring_depth: crate::gpu::frame::DEFAULT_FRAME_RING_DEPTH,
            window_width: 800,
            window_height: 600,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self, EngineError> {
        toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Load a configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml(&text)
    }

    /// Serialize the configuration to TOML text
    pub fn to_toml(&self) -> Result<String, EngineError> {
        toml::to_string(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Write the configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let text = self.to_toml()?;
        std::fs::write(path.as_ref(), text)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.as_ref().display())))
    }
}

/// Per-frame timing handed to the scene update
#[derive(Debug, Clone, Copy)]
pub struct FrameTiming {
    /// Seconds since the previous frame (zero while paused)
    pub delta_time: f32,
    /// Total unpaused running time in seconds
    pub total_time: f32,
    /// Index of the frame being prepared
    pub frame_index: u64,
}

/// The frame update/submit loop
///
/// Owns the device, the queue synchronizer, the frame-resource ring, and
/// the scene. A single logical thread drives [`Engine::run_frame`]; the
/// GPU is the only other actor and is reachable solely through the
/// signal/wait fence protocol.
pub struct Engine<D: RenderDevice, S: Scene<D>> {
    device: D,
    sync: Synchronizer<D::Queue>,
    ring: FrameResourceRing<D>,
    scene: S,
    timer: FrameTimer,
    frame_index: u64,
}

impl<D: RenderDevice, S: Scene<D>> Engine<D, S> {
    /// Build the scene and the frame-resource ring
    ///
    /// Flushes the queue once after scene build so initial resource
    /// uploads are complete before the first frame, then sizes the
    /// render targets from the configuration.
    pub fn new(
        mut device: D,
        queue: D::Queue,
        mut scene: S,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        log::info!(
            "initializing engine (ring depth {}, {}x{})",
            config.frame_ring_depth,
            config.window_width,
            config.window_height
        );

        let layout = scene.build(&mut device)?;
        log::debug!(
            "scene layout: {} objects, {} materials, dynamic vertices: {:?}",
            layout.object_count,
            layout.material_count,
            layout.wave_vertex_count
        );

        let ring = FrameResourceRing::new(&mut device, config.frame_ring_depth, &layout)?;
        let mut sync = Synchronizer::new(queue);

        sync.flush_all()?;
        device.resize_buffers(config.window_width, config.window_height)?;
        scene.resized(config.window_width, config.window_height);

        Ok(Self {
            device,
            sync,
            ring,
            scene,
            timer: FrameTimer::new(),
            frame_index: 0,
        })
    }

    /// Prepare, submit, and present one frame
    ///
    /// The fence wait on the selected ring slot is the only point that
    /// may block; everything after it runs without suspension.
    pub fn run_frame(&mut self) -> Result<(), EngineError> {
        self.ring.advance();
        self.ring.wait_if_pending(&self.sync)?;
        self.ring.reset_current_allocator()?;

        self.timer.tick();
        let timing = FrameTiming {
            delta_time: self.timer.delta_time(),
            total_time: self.timer.total_time(),
            frame_index: self.frame_index,
        };

        self.scene.update(self.ring.current_mut(), &timing)?;
        self.scene.record(self.ring.current())?;

        self.sync.submit()?;
        let fence = self.sync.signal()?;
        self.ring.mark_submitted(fence);

        self.device.present()?;
        self.frame_index += 1;
        Ok(())
    }

    /// Resize the swap chain
    ///
    /// Never re-enters the frame loop: all outstanding GPU work is
    /// drained first, then buffers are recreated and the back-buffer
    /// index restarts at 0.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), EngineError> {
        log::info!("resizing to {width}x{height}");
        self.sync.flush_all()?;
        self.device.resize_buffers(width, height)?;
        self.scene.resized(width, height);
        Ok(())
    }

    /// Pause the simulation clock; frames keep presenting with zero delta
    pub fn pause(&mut self) {
        self.timer.stop();
    }

    /// Resume a paused simulation clock
    pub fn resume(&mut self) {
        self.timer.start();
    }

    /// Whether the simulation clock is paused
    pub fn is_paused(&self) -> bool {
        self.timer.is_stopped()
    }

    /// Drain all GPU work and consume the engine
    ///
    /// Must run before resources the GPU might still touch are released;
    /// dropping without it would free in-flight buffers.
    pub fn shutdown(mut self) -> Result<(), EngineError> {
        let outstanding = self.sync.last_signaled() - self.sync.completed_value();
        log::info!("engine shutdown: flushing {outstanding} outstanding signals");
        self.sync.flush_all()?;
        Ok(())
    }

    /// Number of frames submitted so far
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The render device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// The scene
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Mutable access to the scene (between frames)
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// The queue synchronizer
    pub fn synchronizer(&self) -> &Synchronizer<D::Queue> {
        &self.sync
    }

    /// The frame-resource ring
    pub fn ring(&self) -> &FrameResourceRing<D> {
        &self.ring
    }

    /// The frame timer
    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::frame::FrameResource;
    use crate::gpu::headless::{HeadlessConfig, HeadlessDevice};
    use crate::scene::SceneLayout;

    /// Minimal scene: counts only, no dynamic geometry.
    struct CountingScene {
        updates: u64,
        records: u64,
        resizes: Vec<(u32, u32)>,
    }

    impl CountingScene {
        fn new() -> Self {
            Self {
                updates: 0,
                records: 0,
                resizes: Vec::new(),
            }
        }
    }

    impl Scene<HeadlessDevice> for CountingScene {
        fn build(&mut self, _device: &mut HeadlessDevice) -> Result<SceneLayout, EngineError> {
            Ok(SceneLayout {
                object_count: 2,
                material_count: 1,
                ..SceneLayout::default()
            })
        }

        fn update(
            &mut self,
            frame: &mut FrameResource<HeadlessDevice>,
            timing: &FrameTiming,
        ) -> Result<(), EngineError> {
            let mut pass = crate::render::constants::PassConstants::default();
            pass.total_time = timing.total_time;
            pass.delta_time = timing.delta_time;
            frame.pass_constants.copy_data(0, &pass)?;
            self.updates += 1;
            Ok(())
        }

        fn record(&mut self, _frame: &FrameResource<HeadlessDevice>) -> Result<(), EngineError> {
            self.records += 1;
            Ok(())
        }

        fn resized(&mut self, width: u32, height: u32) {
            self.resizes.push((width, height));
        }
    }

    fn engine_with_lag(lag: usize) -> Engine<HeadlessDevice, CountingScene> {
        let (device, queue) = HeadlessDevice::new(HeadlessConfig {
            gpu_lag_frames: lag,
            ..HeadlessConfig::default()
        });
        Engine::new(device, queue, CountingScene::new(), EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_frames_update_record_submit_present_in_lockstep() {
        let mut engine = engine_with_lag(2);
        for _ in 0..10 {
            engine.run_frame().unwrap();
        }
        assert_eq!(engine.frame_index(), 10);
        assert_eq!(engine.scene().updates, 10);
        assert_eq!(engine.scene().records, 10);
        assert_eq!(engine.device().present_count(), 10);
        // Initial flush signaled once; every frame signals once more.
        assert_eq!(engine.synchronizer().last_signaled(), 11);
    }

    #[test]
    fn test_resize_is_serialized_behind_a_flush() {
        let mut engine = engine_with_lag(16);
        for _ in 0..5 {
            engine.run_frame().unwrap();
        }
        // With lag 16 nothing has retired on its own; a bare device
        // resize would be rejected. The engine flushes first.
        engine.resize(1920, 1080).unwrap();
        assert_eq!(engine.device().extent(), (1920, 1080));
        assert_eq!(engine.device().back_buffer_index(), 0);
        assert_eq!(engine.scene().resizes.last(), Some(&(1920, 1080)));

        // The loop resumes cleanly after a resize.
        engine.run_frame().unwrap();
        assert_eq!(engine.frame_index(), 6);
    }

    #[test]
    fn test_shutdown_drains_the_queue() {
        let mut engine = engine_with_lag(16);
        for _ in 0..4 {
            engine.run_frame().unwrap();
        }
        engine.shutdown().unwrap();
    }

    #[test]
    fn test_paused_engine_reports_zero_delta() {
        let mut engine = engine_with_lag(2);
        engine.run_frame().unwrap();
        engine.pause();
        assert!(engine.is_paused());
        let total_before = engine.timer().total_time();
        engine.run_frame().unwrap();
        assert_eq!(engine.timer().delta_time(), 0.0);
        assert_eq!(engine.timer().total_time(), total_before);
        engine.resume();
        assert!(!engine.is_paused());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = EngineConfig::from_toml(
            "frame_ring_depth = 4\nwindow_width = 1024\nwindow_height = 768\n",
        )
        .unwrap();
        assert_eq!(config.frame_ring_depth, 4);
        assert_eq!(config.window_width, 1024);

        // Missing fields fall back to defaults.
        let sparse = EngineConfig::from_toml("frame_ring_depth = 2\n").unwrap();
        assert_eq!(sparse.frame_ring_depth, 2);
        assert_eq!(sparse.window_height, 600);

        let reparsed = EngineConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(reparsed.frame_ring_depth, config.frame_ring_depth);
        assert_eq!(reparsed.window_width, config.window_width);
    }
}
