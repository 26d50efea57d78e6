//! Finite-difference water surface simulation
//!
//! Integrates the damped 2D wave equation over a regular grid with an
//! explicit stencil. The solver keeps two whole height fields (`prev` and
//! `curr`) and swaps them by ownership after every discrete step, so a
//! step is O(interior cells) with no per-element copying.
//!
//! The integration is decoupled from the render rate: callers feed real
//! frame deltas into [`WaveField::update`], and the solver only performs a
//! step each time the accumulated time crosses its fixed time step. This
//! keeps the stencil numerically stable regardless of frame-rate jitter.

use crate::foundation::math::Vec3;
use thiserror::Error;

/// Errors from wave field construction and disturbance
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// Grid too small to have interior cells
    #[error("wave grid {rows}x{cols} is too small; need at least 5x5")]
    GridTooSmall {
        /// Requested row count
        rows: usize,
        /// Requested column count
        cols: usize,
    },

    /// Disturb target too close to the grid boundary
    #[error("disturb at ({row}, {col}) is within 2 cells of the boundary of a {rows}x{cols} grid")]
    DisturbOutOfBounds {
        /// Requested row
        row: usize,
        /// Requested column
        col: usize,
        /// Grid row count
        rows: usize,
        /// Grid column count
        cols: usize,
    },
}

/// Damped finite-difference height field
///
/// Grid dimensions are fixed at construction. The boundary ring of cells
/// (row/column 0 and the last row/column) is never updated by the stencil
/// and never perturbed, which keeps the surface pinned at the edges.
pub struct WaveField {
    rows: usize,
    cols: usize,
    spatial_step: f32,
    time_step: f32,

    // Update coefficients derived once from speed and damping.
    k1: f32,
    k2: f32,
    k3: f32,

    prev: Vec<f32>,
    curr: Vec<f32>,
    normals: Vec<Vec3>,
    tangents: Vec<Vec3>,

    accumulated: f32,
}

impl WaveField {
    /// Create a flat wave field
    ///
    /// `dx` is the spacing between grid cells, `dt` the fixed simulation
    /// time step, `speed` the wave propagation speed and `damping` the
    /// energy loss factor. Fails if the grid has no disturbable interior.
    pub fn new(
        rows: usize,
        cols: usize,
        dx: f32,
        dt: f32,
        speed: f32,
        damping: f32,
    ) -> Result<Self, SimError> {
        if rows < 5 || cols < 5 {
            return Err(SimError::GridTooSmall { rows, cols });
        }

        let d = damping * dt + 2.0;
        let e = (speed * speed) * (dt * dt) / (dx * dx);
        let vertex_count = rows * cols;

        Ok(Self {
            rows,
            cols,
            spatial_step: dx,
            time_step: dt,
            k1: (damping * dt - 2.0) / d,
            k2: (4.0 - 8.0 * e) / d,
            k3: (2.0 * e) / d,
            prev: vec![0.0; vertex_count],
            curr: vec![0.0; vertex_count],
            normals: vec![Vec3::new(0.0, 1.0, 0.0); vertex_count],
            tangents: vec![Vec3::new(1.0, 0.0, 0.0); vertex_count],
            accumulated: 0.0,
        })
    }

    /// Grid row count
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Grid column count
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total vertex count (rows * cols)
    pub fn vertex_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Triangle count of the surface mesh
    pub fn triangle_count(&self) -> usize {
        (self.rows - 1) * (self.cols - 1) * 2
    }

    /// World-space width of the surface (along x)
    pub fn width(&self) -> f32 {
        self.cols as f32 * self.spatial_step
    }

    /// World-space depth of the surface (along z)
    pub fn depth(&self) -> f32 {
        self.rows as f32 * self.spatial_step
    }

    /// World-space position of vertex `n`, centered about the origin
    pub fn position(&self, n: usize) -> Vec3 {
        let i = n / self.cols;
        let j = n % self.cols;
        let half_width = (self.cols - 1) as f32 * self.spatial_step * 0.5;
        let half_depth = (self.rows - 1) as f32 * self.spatial_step * 0.5;
        Vec3::new(
            -half_width + j as f32 * self.spatial_step,
            self.curr[n],
            half_depth - i as f32 * self.spatial_step,
        )
    }

    /// Surface normal of vertex `n`
    pub fn normal(&self, n: usize) -> Vec3 {
        self.normals[n]
    }

    /// Surface tangent (along +x) of vertex `n`
    pub fn tangent(&self, n: usize) -> Vec3 {
        self.tangents[n]
    }

    /// Texture coordinate of vertex `n` in [0, 1]^2
    pub fn tex_coord(&self, n: usize) -> (f32, f32) {
        let i = n / self.cols;
        let j = n % self.cols;
        (
            j as f32 / (self.cols - 1) as f32,
            i as f32 / (self.rows - 1) as f32,
        )
    }

    /// Current height of cell `(i, j)`
    pub fn height(&self, i: usize, j: usize) -> f32 {
        self.curr[i * self.cols + j]
    }

    /// Advance the simulation by a frame delta
    ///
    /// Accumulates `dt` and performs exactly one discrete stencil step per
    /// crossing of the fixed time step; sub-step calls only accumulate.
    pub fn update(&mut self, dt: f32) {
        self.accumulated += dt;

        if self.accumulated < self.time_step {
            return;
        }

        let cols = self.cols;
        for i in 1..self.rows - 1 {
            for j in 1..cols - 1 {
                let n = i * cols + j;
                self.prev[n] = self.k1 * self.prev[n]
                    + self.k2 * self.curr[n]
                    + self.k3
                        * (self.curr[n + cols]
                            + self.curr[n - cols]
                            + self.curr[n + 1]
                            + self.curr[n - 1]);
            }
        }

        // The buffers trade roles wholesale; `prev` now holds the new
        // solution and becomes `curr`.
        std::mem::swap(&mut self.prev, &mut self.curr);

        self.accumulated = 0.0;

        self.recompute_surface_frame();
    }

    /// Inject a local impulse at interior cell `(i, j)`
    ///
    /// Adds `magnitude` to the cell and half of it to the four orthogonal
    /// neighbours. Cells within 2 of any boundary are rejected so the
    /// impulse never touches the pinned boundary ring.
    pub fn disturb(&mut self, i: usize, j: usize, magnitude: f32) -> Result<(), SimError> {
        if i < 2 || i > self.rows - 3 || j < 2 || j > self.cols - 3 {
            return Err(SimError::DisturbOutOfBounds {
                row: i,
                col: j,
                rows: self.rows,
                cols: self.cols,
            });
        }

        let half = 0.5 * magnitude;
        let n = i * self.cols + j;

        self.curr[n] += magnitude;
        self.curr[n + 1] += half;
        self.curr[n - 1] += half;
        self.curr[n + self.cols] += half;
        self.curr[n - self.cols] += half;
        Ok(())
    }

    /// Recompute interior normals and tangents from centered differences
    fn recompute_surface_frame(&mut self) {
        let cols = self.cols;
        for i in 1..self.rows - 1 {
            for j in 1..cols - 1 {
                let n = i * cols + j;
                let left = self.curr[n - 1];
                let right = self.curr[n + 1];
                let top = self.curr[n - cols];
                let bottom = self.curr[n + cols];

                self.normals[n] =
                    Vec3::new(left - right, 2.0 * self.spatial_step, bottom - top).normalize();
                self.tangents[n] =
                    Vec3::new(2.0 * self.spatial_step, right - left, 0.0).normalize();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat_field() -> WaveField {
        WaveField::new(16, 16, 1.0, 0.03, 4.0, 0.2).expect("valid grid")
    }

    #[test]
    fn test_zero_state_is_fixed_point() {
        let mut waves = flat_field();
        for _ in 0..100 {
            waves.update(0.03);
        }
        for n in 0..waves.vertex_count() {
            assert_eq!(waves.position(n).y, 0.0);
        }
    }

    #[test]
    fn test_sub_step_calls_only_accumulate() {
        let mut waves = flat_field();
        waves.disturb(8, 8, 1.0).unwrap();
        let before = waves.height(8, 8);
        // Two sub-step calls must not run the stencil...
        waves.update(0.01);
        waves.update(0.01);
        assert_eq!(waves.height(8, 8), before);
        // ...but the third crosses the fixed time step.
        waves.update(0.01);
        assert_ne!(waves.height(8, 8), before);
    }

    #[test]
    fn test_disturb_changes_exactly_five_cells() {
        let mut waves = flat_field();
        waves.disturb(8, 9, 0.8).unwrap();

        for i in 0..16 {
            for j in 0..16 {
                let h = waves.height(i, j);
                match (i, j) {
                    (8, 9) => assert_relative_eq!(h, 0.8),
                    (7, 9) | (9, 9) | (8, 8) | (8, 10) => assert_relative_eq!(h, 0.4),
                    _ => assert_eq!(h, 0.0),
                }
            }
        }
    }

    #[test]
    fn test_disturb_rejects_boundary_adjacent_cells() {
        let mut waves = WaveField::new(5, 5, 1.0, 0.03, 4.0, 0.2).unwrap();
        for &(i, j) in &[(0, 2), (1, 2), (2, 0), (2, 1), (4, 2), (3, 2), (2, 4), (2, 3)] {
            assert!(
                waves.disturb(i, j, 1.0).is_err(),
                "disturb at ({i}, {j}) should be rejected"
            );
        }
        // The 5x5 grid has exactly one disturbable cell.
        assert!(waves.disturb(2, 2, 1.0).is_ok());
    }

    #[test]
    fn test_boundary_ring_stays_pinned() {
        let mut waves = flat_field();
        waves.disturb(2, 2, 2.0).unwrap();
        for _ in 0..50 {
            waves.update(0.03);
        }
        for j in 0..16 {
            assert_eq!(waves.height(0, j), 0.0);
            assert_eq!(waves.height(15, j), 0.0);
        }
        for i in 0..16 {
            assert_eq!(waves.height(i, 0), 0.0);
            assert_eq!(waves.height(i, 15), 0.0);
        }
    }

    #[test]
    fn test_ripple_damps_and_propagates() {
        // End-to-end scenario from the land-and-waves demo parameters.
        let mut waves = WaveField::new(128, 128, 1.0, 0.03, 4.0, 0.2).unwrap();
        waves.disturb(64, 64, 0.4).unwrap();
        let center = waves.height(64, 64);
        let neighbour = waves.height(63, 64);

        waves.update(0.03);

        // A fresh impulse carries velocity (prev lags curr), so the first
        // steps swell before the damped oscillation takes over.
        assert_relative_eq!(waves.height(64, 64), 0.786_12, epsilon = 1e-3);

        // The stencil moves the impulse center more than its neighbours.
        let center_change = (waves.height(64, 64) - center).abs();
        for &(i, j) in &[(63, 64), (65, 64), (64, 63), (64, 65)] {
            let change = (waves.height(i, j) - neighbour).abs();
            assert!(change < center_change);
        }
    }

    #[test]
    fn test_ripple_energy_decays_long_term() {
        let mut waves = WaveField::new(128, 128, 1.0, 0.03, 4.0, 0.2).unwrap();
        waves.disturb(64, 64, 0.4).unwrap();
        for _ in 0..500 {
            waves.update(0.03);
        }
        let max_abs = (0..waves.vertex_count())
            .map(|n| waves.position(n).y.abs())
            .fold(0.0_f32, f32::max);
        assert!(
            max_abs < 0.1,
            "ripple should damp out, max |height| = {max_abs}"
        );
    }

    #[test]
    fn test_interior_normals_tilt_after_disturb() {
        let mut waves = flat_field();
        waves.disturb(8, 8, 1.0).unwrap();
        waves.update(0.03);

        // Next to the ripple the surface is no longer flat.
        let n = waves.normal(8 * 16 + 7);
        assert!(n.y < 1.0);
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_rejects_degenerate_grid() {
        assert!(matches!(
            WaveField::new(4, 16, 1.0, 0.03, 4.0, 0.2),
            Err(SimError::GridTooSmall { .. })
        ));
    }
}
