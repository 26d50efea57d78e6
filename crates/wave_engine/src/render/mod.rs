//! Scene-facing rendering data
//!
//! GPU-visible constant-block layouts and the CPU-side tables the frame
//! loop reads when filling a frame slot's upload buffers. Mesh geometry
//! generation and draw-call recording are external collaborators; this
//! module only owns the data that crosses the CPU/GPU boundary.

pub mod constants;
pub mod scene;
