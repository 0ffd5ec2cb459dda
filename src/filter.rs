// src/filter.rs - Per-joint smoothing filter
use nalgebra::Vector3;

use crate::sensor::RawObservation;

/// Noise tuning shared by every filter in a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub process_noise: f64,
    pub observation_noise: f64,
    /// Variance a freshly seeded filter starts with.
    pub initial_uncertainty: f64,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            process_noise: 1.0,
            observation_noise: 0.02,
            initial_uncertainty: 0.0,
        }
    }
}

/// Constant-position Kalman estimator for one joint of one body.
///
/// Each axis is an independent scalar filter; there is no velocity term and
/// no cross-axis covariance.
#[derive(Debug, Clone)]
pub struct JointFilter {
    estimate: Vector3<f64>,
    variance: Vector3<f64>,
}

impl JointFilter {
    /// Seeds the filter directly at `position`, no blending.
    pub fn new(position: Vector3<f64>, initial_uncertainty: f64) -> Self {
        Self {
            estimate: position,
            variance: Vector3::repeat(initial_uncertainty.max(0.0)),
        }
    }

    pub fn predict(&mut self, process_noise: f64) {
        self.variance.add_scalar_mut(process_noise);
    }

    /// Blends a tracked observation into the estimate.
    ///
    /// Returns `false` and leaves the filter untouched when the joint was not
    /// tracked this frame; the previous estimate stands in for the current one.
    pub fn update(&mut self, observation: &RawObservation, observation_noise: f64) -> bool {
        if !observation.tracked {
            return false;
        }

        let gain = self.gain(observation_noise);
        let innovation = observation.position - self.estimate;

        self.estimate += gain.component_mul(&innovation);
        self.variance = (Vector3::repeat(1.0) - gain).component_mul(&self.variance);
        true
    }

    /// One frame: predict, then update.
    pub fn step(&mut self, observation: &RawObservation, params: &FilterParams) -> bool {
        self.predict(params.process_noise);
        self.update(observation, params.observation_noise)
    }

    /// Gain the next `update` would apply given the current (prior) variance.
    pub fn gain(&self, observation_noise: f64) -> Vector3<f64> {
        self.variance.map(|prior| blend_gain(prior, observation_noise))
    }

    pub fn position(&self) -> Vector3<f64> {
        self.estimate
    }

    pub fn variance(&self) -> Vector3<f64> {
        self.variance
    }
}

fn blend_gain(prior: f64, observation_noise: f64) -> f64 {
    let total = prior + observation_noise;
    // 0/0 only happens with a zero-variance filter and a noiseless sensor
    if total <= 0.0 {
        return 0.0;
    }
    (prior / total).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    fn tracked(x: f64, y: f64, z: f64) -> RawObservation {
        RawObservation::tracked(Vector3::new(x, y, z))
    }

    #[test]
    fn test_seed_is_exact() {
        let f = JointFilter::new(Vector3::new(0.0, 0.0, 1.0), 0.0);
        assert_eq!(f.position(), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(f.variance(), Vector3::zeros());
    }

    #[test]
    fn test_closed_form_update() {
        let params = FilterParams {
            process_noise: 1.0,
            observation_noise: 0.02,
            initial_uncertainty: 0.0,
        };
        let mut f = JointFilter::new(Vector3::new(0.0, 0.0, 1.0), params.initial_uncertainty);
        assert!(f.step(&tracked(0.1, 0.0, 1.0), &params));

        let prior = 0.0 + 1.0;
        let gain = prior / (prior + 0.02);
        let p = f.position();
        assert!(approx_eq(p.x, gain * 0.1, 1e-12));
        assert!(approx_eq(p.y, 0.0, 1e-12));
        assert!(approx_eq(p.z, 1.0, 1e-12));
        assert!(approx_eq(f.variance().x, (1.0 - gain) * prior, 1e-12));
    }

    #[test]
    fn test_untracked_keeps_estimate() {
        let params = FilterParams::default();
        let mut f = JointFilter::new(Vector3::new(1.0, 2.0, 3.0), 0.0);
        let lost = RawObservation::untracked(Vector3::new(9.0, 9.0, 9.0));
        assert!(!f.step(&lost, &params));
        assert_eq!(f.position(), Vector3::new(1.0, 2.0, 3.0));
        // prediction still widened the uncertainty
        assert!(approx_eq(f.variance().x, params.process_noise, 1e-12));
    }

    #[test]
    fn test_converges_with_tiny_observation_noise() {
        let params = FilterParams {
            process_noise: 0.5,
            observation_noise: 1e-9,
            initial_uncertainty: 10.0,
        };
        let mut f = JointFilter::new(Vector3::zeros(), params.initial_uncertainty);
        let target = tracked(1.0, -2.0, 0.5);

        f.step(&target, &params);
        let mut previous = f.variance();
        assert!(previous.max() < 1e-8);

        for _ in 0..10 {
            f.step(&target, &params);
            let variance = f.variance();
            for axis in 0..3 {
                // never grows, up to rounding in (1 - gain)
                assert!(variance[axis] <= previous[axis] * (1.0 + 1e-6));
            }
            previous = variance;
        }
        assert!((f.position() - target.position).norm() < 1e-6);
    }

    #[test]
    fn test_variance_and_gain_shrink_without_process_noise() {
        let params = FilterParams {
            process_noise: 0.0,
            observation_noise: 0.1,
            initial_uncertainty: 1.0,
        };
        let mut f = JointFilter::new(Vector3::new(0.5, 0.5, 0.5), params.initial_uncertainty);
        let obs = tracked(0.5, 0.5, 0.5);

        let mut last_variance = f.variance().x;
        let mut last_gain = f.gain(params.observation_noise).x;
        for _ in 0..200 {
            f.step(&obs, &params);
            let variance = f.variance().x;
            let gain = f.gain(params.observation_noise).x;
            assert!(variance < last_variance);
            assert!(gain < last_gain);
            last_variance = variance;
            last_gain = gain;
        }
        assert!(last_gain < 0.01);
    }

    #[test]
    fn test_axes_are_independent() {
        let params = FilterParams::default();
        let mut f = JointFilter::new(Vector3::zeros(), 0.0);
        f.step(&tracked(1.0, 0.0, 0.0), &params);
        let p = f.position();
        assert!(p.x > 0.0);
        assert_eq!(p.y, 0.0);
        assert_eq!(p.z, 0.0);
    }

    #[test]
    fn test_gain_bounds() {
        assert_eq!(blend_gain(0.0, 0.0), 0.0);
        assert_eq!(blend_gain(1.0, 0.0), 1.0);
        assert!(approx_eq(blend_gain(1.0, 1.0), 0.5, 1e-12));
    }
}
