//! Holter stream simulation
//! Location: src/hal/simulation/mod.rs

pub mod artifact_injection;
pub mod config;
pub mod ecg_model;

pub use artifact_injection::{ArtifactInjector, ArtifactSample};
pub use config::{ArtifactConfig, EcgConfig, MotionBurst, SimulationConfig};
pub use ecg_model::EcgModel;

use rand::Rng;

/// Standard normal draw (Box-Muller)
pub(crate) fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
