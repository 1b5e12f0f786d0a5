//! Synthetic `(time, power)` profiles for runs without measured data.

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::io::loader::Sample;

/// Shape of the generated power trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileShape {
    /// Flat output at the peak power.
    Constant,
    /// A single half-sine burst spanning the whole duration, peaking halfway.
    HalfSine,
}

/// Seeded generator for a synthetic harvester input profile.
///
/// Produces the same sample vector a measured CSV would yield after header
/// removal, so a [`crate::devices::source::PowerSource`] consumes either
/// interchangeably.
#[derive(Debug, Clone)]
pub struct SyntheticProfile {
    shape: ProfileShape,
    peak_w: f64,
    duration_s: f64,
    sample_interval_s: f64,
    noise_std: f64,
    seed: u64,
}

impl SyntheticProfile {
    /// Creates a generator.
    ///
    /// # Arguments
    ///
    /// * `shape` - Base shape of the trace
    /// * `peak_w` - Peak power in watts
    /// * `duration_s` - Length of the trace in seconds
    /// * `sample_interval_s` - Spacing between samples in seconds
    /// * `noise_std` - Standard deviation of additive Gaussian noise in watts
    /// * `seed` - Seed for reproducible noise
    ///
    /// # Panics
    ///
    /// Panics if duration or interval is not positive, or peak/noise is negative.
    pub fn new(
        shape: ProfileShape,
        peak_w: f64,
        duration_s: f64,
        sample_interval_s: f64,
        noise_std: f64,
        seed: u64,
    ) -> Self {
        assert!(duration_s > 0.0 && sample_interval_s > 0.0);
        assert!(peak_w >= 0.0 && noise_std >= 0.0);
        Self {
            shape,
            peak_w,
            duration_s,
            sample_interval_s,
            noise_std,
            seed,
        }
    }

    /// Generates the sample vector, one record per interval from 0 through the
    /// duration. Power never goes negative.
    pub fn samples(&self) -> Vec<Sample> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let steps = (self.duration_s / self.sample_interval_s).round() as usize;
        let mut out = Vec::with_capacity(steps + 1);
        for k in 0..=steps {
            let time = k as f64 * self.sample_interval_s;
            let base = match self.shape {
                ProfileShape::Constant => self.peak_w,
                ProfileShape::HalfSine => {
                    self.peak_w * (std::f64::consts::PI * time / self.duration_s).sin()
                }
            };
            let value = (base + gaussian_noise(&mut rng, self.noise_std)).max(0.0);
            out.push(Sample { time, value });
        }
        out
    }
}

/// Gaussian noise via the Box-Muller transform, mean 0.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_profile_is_flat_without_noise() {
        let profile = SyntheticProfile::new(ProfileShape::Constant, 1e-3, 10.0, 0.5, 0.0, 0);
        let samples = profile.samples();
        assert_eq!(samples.len(), 21);
        assert!(samples.iter().all(|s| s.value == 1e-3));
        assert_eq!(samples.last().map(|s| s.time), Some(10.0));
    }

    #[test]
    fn half_sine_peaks_midway_and_ends_near_zero() {
        let profile = SyntheticProfile::new(ProfileShape::HalfSine, 2.0, 10.0, 2.5, 0.0, 0);
        let samples = profile.samples();
        assert_eq!(samples.len(), 5);
        assert!(samples[0].value.abs() < 1e-12);
        assert!((samples[2].value - 2.0).abs() < 1e-12);
        assert!(samples[4].value.abs() < 1e-9);
    }

    #[test]
    fn times_are_strictly_increasing() {
        let profile = SyntheticProfile::new(ProfileShape::Constant, 1.0, 5.0, 0.25, 0.1, 7);
        let samples = profile.samples();
        assert!(samples.windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn same_seed_reproduces_the_trace() {
        let a = SyntheticProfile::new(ProfileShape::Constant, 1.0, 5.0, 0.5, 0.2, 9).samples();
        let b = SyntheticProfile::new(ProfileShape::Constant, 1.0, 5.0, 0.5, 0.2, 9).samples();
        assert_eq!(a, b);
    }

    #[test]
    fn noise_never_drives_power_negative() {
        let profile = SyntheticProfile::new(ProfileShape::Constant, 1e-4, 20.0, 0.1, 1.0, 3);
        assert!(profile.samples().iter().all(|s| s.value >= 0.0));
    }
}
