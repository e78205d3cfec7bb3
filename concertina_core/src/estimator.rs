//! One-dimensional recursive smoother (scalar Kalman filter).
//!
//! The estimator assumes a constant underlying value observed through
//! additive noise.  Each [`ScalarEstimator::update`] call runs one
//! predict/correct cycle:
//!
//! ```text
//! P ← P + Q
//! K ← P / (P + R)
//! x ← x + K·(z − x)
//! P ← (1 − K)·P
//! ```
//!
//! It has no notion of what it is smoothing; the bellows tracker feeds it
//! anchor distances, but any noisy scalar works.

/// Default process noise `Q`.
pub const DEFAULT_PROCESS_NOISE:     f32 = 1e-4;
/// Default measurement noise `R`.
pub const DEFAULT_MEASUREMENT_NOISE: f32 = 1e-1;
/// Default initial estimate `x₀`.
pub const DEFAULT_INITIAL_VALUE:     f32 = 0.0;
/// Default initial error covariance `P₀`.
pub const DEFAULT_INITIAL_COVARIANCE: f32 = 1.0;

// ════════════════════════════════════════════════════════════════════════════
// ScalarEstimator
// ════════════════════════════════════════════════════════════════════════════

/// Scalar Kalman filter.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarEstimator {
    /// Process noise (how fast the true value may drift).
    process_noise:     f32,
    /// Measurement noise (how much each sample is trusted).
    measurement_noise: f32,
    /// Current estimate.
    value:             f32,
    /// Current error covariance.
    error_covariance:  f32,

    // Initial state, restored by `reset`.
    initial_value:      f32,
    initial_covariance: f32,
}

impl ScalarEstimator {
    /// Estimator with the default parameters `{Q=1e-4, R=1e-1, x=0, P=1}`.
    pub fn new() -> Self {
        Self::with_params(
            DEFAULT_PROCESS_NOISE,
            DEFAULT_MEASUREMENT_NOISE,
            DEFAULT_INITIAL_VALUE,
            DEFAULT_INITIAL_COVARIANCE,
        )
    }

    /// Estimator with explicit noise parameters and initial state.
    pub fn with_params(
        process_noise:      f32,
        measurement_noise:  f32,
        initial_value:      f32,
        initial_covariance: f32,
    ) -> Self {
        ScalarEstimator {
            process_noise,
            measurement_noise,
            value:            initial_value,
            error_covariance: initial_covariance,
            initial_value,
            initial_covariance,
        }
    }

    /// Feed one measurement and return the new estimate.
    pub fn update(&mut self, measurement: f32) -> f32 {
        // Predict
        self.error_covariance += self.process_noise;

        // Correct
        let gain = self.error_covariance / (self.error_covariance + self.measurement_noise);
        self.value += gain * (measurement - self.value);
        self.error_covariance *= 1.0 - gain;

        self.value
    }

    /// Current estimate without feeding a new sample.
    pub fn value(&self) -> f32 { self.value }

    /// Current error covariance `P`.
    pub fn error_covariance(&self) -> f32 { self.error_covariance }

    pub fn process_noise(&self) -> f32 { self.process_noise }
    pub fn measurement_noise(&self) -> f32 { self.measurement_noise }

    /// Restore the initial estimate and covariance.  Noise parameters are kept.
    pub fn reset(&mut self) {
        self.value            = self.initial_value;
        self.error_covariance = self.initial_covariance;
    }
}

impl Default for ScalarEstimator {
    fn default() -> Self {
        Self::new()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
