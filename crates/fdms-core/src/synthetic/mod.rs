//! Deterministic synthetic data for tests and demos.
//!
//! Everything here is reproducible from explicit seeds; nothing pulls in an
//! RNG crate.

pub mod interferogram;
pub mod noise;
pub mod surface;

pub use interferogram::{phase_from_height, InterferogramSynth};
pub use noise::UniformNoise;
pub use surface::{gaussian_dimple, spherical_dimple};
