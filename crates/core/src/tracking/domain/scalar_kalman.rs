/// One-dimensional Kalman filter with an identity motion model.
///
/// Smooths a single scalar time series (one edge of a bounding box).
/// Noise variances are fixed at construction; only `estimate` and
/// `error_covariance` evolve. `error_covariance` starts at 1.0 and stays
/// positive for positive variances.
///
/// Non-finite measurements are not guarded here and will poison the
/// estimate; callers validate upstream.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarKalmanFilter {
    process_variance: f64,
    measurement_variance: f64,
    estimate: f64,
    error_covariance: f64,
}

pub const INITIAL_ERROR_COVARIANCE: f64 = 1.0;

impl ScalarKalmanFilter {
    pub fn new(process_variance: f64, measurement_variance: f64, estimate: f64) -> Self {
        Self {
            process_variance,
            measurement_variance,
            estimate,
            error_covariance: INITIAL_ERROR_COVARIANCE,
        }
    }

    /// Folds one measurement into the estimate and returns the new estimate.
    pub fn update(&mut self, measurement: f64) -> f64 {
        let predicted_estimate = self.estimate;
        let predicted_error_covariance = self.error_covariance + self.process_variance;
        let gain =
            predicted_error_covariance / (predicted_error_covariance + self.measurement_variance);
        self.estimate = predicted_estimate + gain * (measurement - predicted_estimate);
        self.error_covariance = (1.0 - gain) * predicted_error_covariance;
        self.estimate
    }

    pub fn estimate(&self) -> f64 {
        self.estimate
    }

    pub fn error_covariance(&self) -> f64 {
        self.error_covariance
    }

    pub fn process_variance(&self) -> f64 {
        self.process_variance
    }

    pub fn measurement_variance(&self) -> f64 {
        self.measurement_variance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn default_filter() -> ScalarKalmanFilter {
        ScalarKalmanFilter::new(1e-4, 0.1, 0.0)
    }

    #[test]
    fn test_initial_state() {
        let f = default_filter();
        assert_relative_eq!(f.estimate(), 0.0);
        assert_relative_eq!(f.error_covariance(), 1.0);
    }

    #[test]
    fn test_first_update_matches_hand_computation() {
        let mut f = default_filter();
        let out = f.update(100.0);

        // p = 1 + 1e-4, k = p / (p + 0.1)
        let p = 1.0 + 1e-4;
        let k = p / (p + 0.1);
        assert_relative_eq!(out, k * 100.0, epsilon = 1e-12);
        assert_relative_eq!(f.error_covariance(), (1.0 - k) * p, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_input_converges_monotonically() {
        let mut f = default_filter();
        let target = 250.0;

        let mut prev_out = f.estimate();
        let mut prev_cov = f.error_covariance();
        for _ in 0..200 {
            let out = f.update(target);
            assert!(out > prev_out, "estimate should move toward target");
            assert!(out <= target);
            assert!(f.error_covariance() < prev_cov);
            assert!(f.error_covariance() > 0.0);
            prev_out = out;
            prev_cov = f.error_covariance();
        }
        assert_relative_eq!(prev_out, target, epsilon = 1.0);
    }

    #[test]
    fn test_covariance_approaches_positive_fixed_point() {
        // Steady state of p' = (1 - k)(p + q): p* solves p^2 + q p - q r = 0.
        let (q, r): (f64, f64) = (1e-4, 0.1);
        let fixed = (-q + (q * q + 4.0 * q * r).sqrt()) / 2.0;

        let mut f = ScalarKalmanFilter::new(q, r, 0.0);
        for _ in 0..5000 {
            f.update(1.0);
        }
        assert_relative_eq!(f.error_covariance(), fixed, epsilon = 1e-6);
        assert!(f.error_covariance() > 0.0);
    }

    #[test]
    fn test_near_zero_measurement_variance_tracks_measurement() {
        let mut f = ScalarKalmanFilter::new(1e-4, 1e-12, 0.0);
        assert_relative_eq!(f.update(42.0), 42.0, epsilon = 1e-9);
        assert_relative_eq!(f.update(-7.5), -7.5, epsilon = 1e-6);
    }

    #[test]
    fn test_non_finite_measurement_propagates() {
        let mut f = default_filter();
        assert!(f.update(f64::NAN).is_nan());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut a = default_filter();
        a.update(10.0);
        let mut b = a.clone();
        b.update(1000.0);
        assert!(a.estimate() < 10.0);
        assert!(b.estimate() > a.estimate());
    }
}
