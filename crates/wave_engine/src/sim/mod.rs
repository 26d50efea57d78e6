//! CPU-side simulation systems
//!
//! Simulations here are pure CPU state with no GPU awareness; the frame
//! loop streams their results into GPU-visible upload buffers.

pub mod waves;

pub use waves::{SimError, WaveField};
