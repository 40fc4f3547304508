//! Interferogram-to-height stages for fibre-dimple analysis.
//!
//! The stages run in a fixed order:
//! - [`averaging`]: collapse repeated exposures per phase step,
//! - [`demodulation`]: 5/6/7-step formulas to wrapped phase and contrast,
//! - [`region`]: crop to a validated ROI,
//! - [`unwrap`]: remove 2π ambiguities ([`PhaseUnwrapper`]),
//! - [`height`]: phase to corner-zeroed height in micrometres,
//! - [`initial_guess`]: seed for the tilted-Gaussian fit.
//!
//! Every function takes its inputs by reference and returns fresh maps.

pub mod averaging;
pub mod demodulation;
pub mod height;
pub mod initial_guess;
pub mod moments;
pub mod region;
pub mod unwrap;

pub use averaging::{average_frames, AveragedFrameSet};
pub use demodulation::{demodulate, Demodulated};
pub use height::{corner_block_size, height_map, phase_to_height, zero_corners, CornerMeans};
pub use initial_guess::{estimate_initial_guess, InitialGuess};
pub use moments::{d4sigma, BeamMoments};
pub use region::{crop, select_region};
pub use unwrap::{PhaseUnwrapper, QualityGuidedUnwrapper};
