//! Noise helpers shared by the generator and the corrective actions.

use rand::Rng;

/// Draws uniform noise in `[-amplitude / 2, amplitude / 2)`.
///
/// # Arguments
///
/// * `rng` - Random number generator
/// * `amplitude` - Peak-to-peak width of the noise band
pub fn uniform_noise<R: Rng + ?Sized>(rng: &mut R, amplitude: f64) -> f64 {
    (rng.random::<f64>() - 0.5) * amplitude
}
