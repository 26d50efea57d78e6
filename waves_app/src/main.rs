//! Land and waves demo
//!
//! A hilly terrain grid next to an animated 128x128 water surface. Every
//! quarter second a random raindrop disturbs the water, and the wave
//! field's vertices are streamed into the current frame slot's dynamic
//! vertex buffer each frame.
//!
//! Runs on the headless device so it needs no GPU; pass a frame count as
//! the first argument (default 2000).

use rand::Rng;
use wave_engine::foundation::math::{Point3, Vec2};
use wave_engine::prelude::*;
use wave_engine::render::scene::Geometry;
use wave_engine::sim::SimError;

const WATER_COLOR: Vec4 = Vec4::new(0.0, 0.2, 0.6, 1.0);
const DISTURB_INTERVAL: f32 = 0.25;

#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("simulation error: {0}")]
    Sim(#[from] SimError),

    #[error("invalid frame count argument: {0}")]
    Args(#[from] std::num::ParseIntError),
}

/// Terrain height function
fn hill_height(x: f32, z: f32) -> f32 {
    0.3 * (z * (0.1 * x).sin() + x * (0.1 * z).cos())
}

/// Analytic terrain normal (negated gradient, unit length)
fn hill_normal(x: f32, z: f32) -> Vec3 {
    let n = Vec3::new(
        -0.03 * z * (0.1 * x).cos() - 0.3 * (0.1 * z).cos(),
        1.0,
        -0.3 * (0.1 * x).sin() + 0.03 * x * (0.1 * z).sin(),
    );
    n.normalize()
}

fn hill_color(y: f32) -> Vec4 {
    if y < -10.0 {
        Vec4::new(1.0, 0.96, 0.62, 1.0) // sandy beach
    } else if y < 5.0 {
        Vec4::new(0.48, 0.77, 0.46, 1.0) // light green
    } else if y < 12.0 {
        Vec4::new(0.1, 0.48, 0.19, 1.0) // dark green
    } else if y < 20.0 {
        Vec4::new(0.45, 0.39, 0.34, 1.0) // brown
    } else {
        Vec4::new(1.0, 1.0, 1.0, 1.0) // snow
    }
}

/// Build the static terrain grid
fn build_land_geometry(width: f32, depth: f32, rows: usize, cols: usize) -> Geometry {
    let half_width = 0.5 * width;
    let half_depth = 0.5 * depth;
    let dx = width / (cols - 1) as f32;
    let dz = depth / (rows - 1) as f32;

    let mut vertices = Vec::with_capacity(rows * cols);
    for i in 0..rows {
        let z = half_depth - i as f32 * dz;
        for j in 0..cols {
            let x = -half_width + j as f32 * dx;
            let y = hill_height(x, z);
            vertices.push(Vertex {
                position: Vec3::new(x, y, z),
                normal: hill_normal(x, z),
                tex_coord: Vec2::new(j as f32 / (cols - 1) as f32, i as f32 / (rows - 1) as f32),
                color: hill_color(y),
            });
        }
    }

    Geometry {
        name: "land".to_string(),
        vertices,
        indices: grid_indices(rows, cols),
    }
}

/// Two triangles per grid quad
fn grid_indices(rows: usize, cols: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity((rows - 1) * (cols - 1) * 6);
    for i in 0..rows - 1 {
        for j in 0..cols - 1 {
            let top_left = (i * cols + j) as u32;
            let top_right = top_left + 1;
            let bottom_left = ((i + 1) * cols + j) as u32;
            let bottom_right = bottom_left + 1;
            indices.extend_from_slice(&[
                top_left,
                top_right,
                bottom_left,
                bottom_left,
                top_right,
                bottom_right,
            ]);
        }
    }
    indices
}

struct LandAndWavesScene {
    tables: SceneTables,
    waves: WaveField,
    rng: rand::rngs::ThreadRng,
    last_disturb: f32,
    disturb_count: u64,
    /// Camera orbit: azimuth, polar angle, distance from origin
    theta: f32,
    phi: f32,
    radius: f32,
    extent: (u32, u32),
}

impl LandAndWavesScene {
    fn new(ring_depth: usize) -> Result<Self, AppError> {
        Ok(Self {
            tables: SceneTables::new(ring_depth),
            waves: WaveField::new(128, 128, 1.0, 0.03, 4.0, 0.2)?,
            rng: rand::thread_rng(),
            last_disturb: 0.0,
            disturb_count: 0,
            theta: 1.5 * std::f32::consts::PI,
            phi: 0.2 * std::f32::consts::PI,
            radius: 50.0,
            extent: (800, 600),
        })
    }

    fn fill_pass_constants(&self, timing: &FrameTiming) -> PassConstants {
        let eye = Point3::new(
            self.radius * self.phi.sin() * self.theta.cos(),
            self.radius * self.phi.cos(),
            self.radius * self.phi.sin() * self.theta.sin(),
        );
        let view = Mat4::look_at_rh(&eye, &Point3::origin(), &Vec3::new(0.0, 1.0, 0.0));

        let (width, height) = self.extent;
        let aspect = width as f32 / height as f32;
        let (near_z, far_z) = (1.0, 1000.0);
        let proj = Mat4::new_perspective(aspect, 0.25 * std::f32::consts::PI, near_z, far_z);
        let view_proj = proj * view;

        PassConstants {
            view,
            inv_view: view.try_inverse().unwrap_or_else(Mat4::identity),
            proj,
            inv_proj: proj.try_inverse().unwrap_or_else(Mat4::identity),
            view_proj,
            inv_view_proj: view_proj.try_inverse().unwrap_or_else(Mat4::identity),
            eye_position: Vec4::new(eye.x, eye.y, eye.z, 1.0),
            render_target_size: Vec2::new(width as f32, height as f32),
            inv_render_target_size: Vec2::new(1.0 / width as f32, 1.0 / height as f32),
            near_z,
            far_z,
            total_time: timing.total_time,
            delta_time: timing.delta_time,
            ..PassConstants::default()
        }
    }
}

impl Scene<HeadlessDevice> for LandAndWavesScene {
    fn build(&mut self, _device: &mut HeadlessDevice) -> Result<SceneLayout, EngineError> {
        let land_geometry = self.tables.add_geometry(build_land_geometry(160.0, 160.0, 50, 50));
        let water_geometry = self.tables.add_geometry(Geometry {
            name: "water".to_string(),
            vertices: Vec::new(),
            indices: grid_indices(self.waves.rows(), self.waves.cols()),
        });

        let grass = self.tables.add_material(
            "grass",
            Vec4::new(0.2, 0.6, 0.2, 1.0),
            Vec3::new(0.01, 0.01, 0.01),
            0.125,
        );
        let water = self.tables.add_material(
            "water",
            WATER_COLOR,
            Vec3::new(0.1, 0.1, 0.1),
            0.0,
        );

        self.tables.add_item(Mat4::identity(), Mat4::identity(), land_geometry, grass, false);
        self.tables.add_item(Mat4::identity(), Mat4::identity(), water_geometry, water, true);

        Ok(self.tables.frame_layout(Some(self.waves.vertex_count())))
    }

    fn update(
        &mut self,
        frame: &mut FrameResource<HeadlessDevice>,
        timing: &FrameTiming,
    ) -> Result<(), EngineError> {
        // Raindrops land on a fixed cadence while the clock runs.
        if timing.total_time - self.last_disturb >= DISTURB_INTERVAL {
            self.last_disturb = timing.total_time;
            let i = self.rng.gen_range(4..self.waves.rows() - 4);
            let j = self.rng.gen_range(4..self.waves.cols() - 4);
            let magnitude = self.rng.gen_range(0.2..0.5);
            self.waves.disturb(i, j, magnitude)?;
            self.disturb_count += 1;
            log::debug!("disturb #{} at ({i}, {j}), magnitude {magnitude:.2}", self.disturb_count);
        }

        self.waves.update(timing.delta_time);

        if let Some(buffer) = frame.wave_vertices.as_mut() {
            for n in 0..self.waves.vertex_count() {
                let (u, v) = self.waves.tex_coord(n);
                buffer.copy_data(
                    n,
                    &Vertex {
                        position: self.waves.position(n),
                        normal: self.waves.normal(n),
                        tex_coord: Vec2::new(u, v),
                        color: WATER_COLOR,
                    },
                )?;
            }
        }

        frame
            .pass_constants
            .copy_data(0, &self.fill_pass_constants(timing))?;
        self.tables.upload_object_constants(&mut frame.object_constants)?;
        self.tables.upload_material_constants(&mut frame.material_constants)?;
        Ok(())
    }

    fn record(&mut self, _frame: &FrameResource<HeadlessDevice>) -> Result<(), EngineError> {
        log::trace!("recording {} render items", self.tables.items().len());
        Ok(())
    }

    fn resized(&mut self, width: u32, height: u32) {
        self.extent = (width, height);
    }
}

fn run() -> Result<(), AppError> {
    let frame_target: u64 = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 2000,
    };

    let config = EngineConfig::default();
    let scene = LandAndWavesScene::new(config.frame_ring_depth)?;
    let (device, queue) = HeadlessDevice::new(HeadlessConfig::default());
    let mut engine = Engine::new(device, queue, scene, config)?;

    log::info!("running {frame_target} frames of land-and-waves");
    while engine.frame_index() < frame_target {
        engine.run_frame()?;
        if engine.frame_index() % 500 == 0 {
            log::info!(
                "frame {}: {:.1} fps average, {} raindrops, water height(64,64) = {:+.4}",
                engine.frame_index(),
                engine.timer().average_fps(),
                engine.scene().disturb_count,
                engine.scene().waves.height(64, 64),
            );
        }
    }

    log::info!(
        "done: {} frames, {} raindrops, last fence {}",
        engine.frame_index(),
        engine.scene().disturb_count,
        engine.synchronizer().last_signaled(),
    );
    engine.shutdown()?;
    Ok(())
}

fn main() {
    wave_engine::foundation::logging::init();
    if let Err(error) = run() {
        log::error!("{error}");
        std::process::exit(1);
    }
}
