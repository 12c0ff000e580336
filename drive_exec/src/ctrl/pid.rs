//! # PID controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use util::maths::clamp_to;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains and limits of a PID controller.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PidParams {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Derivative gain
    pub k_d: f64,

    /// Limits on the output, `(min, max)`
    pub output_limits: (f64, f64),

    /// Limits on the integral accumulation, `(min, max)`
    pub integral_limits: (f64, f64),
}

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    params: PidParams,

    /// Previous error, `None` until the first update after construction or reset
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,

    /// Terms of the last update, kept for debugging
    terms: PidTerms,
}

/// The individual terms making up a controller output.
#[derive(Debug, Default, Serialize, Copy, Clone, PartialEq)]
pub struct PidTerms {
    pub p: f64,
    pub i: f64,
    pub d: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains and limits.
    pub fn new(params: PidParams) -> Self {
        Self {
            params,
            prev_error: None,
            integral: 0f64,
            terms: PidTerms::default(),
        }
    }

    /// Get the value of the controller for the given error, `dt_s` seconds after the previous
    /// update.
    ///
    /// A non-positive `dt_s` produces a zero output and leaves the controller untouched.
    pub fn get(&mut self, error: f64, dt_s: f64) -> f64 {
        if dt_s <= 0.0 {
            return 0f64;
        }

        self.integral = clamp_to(self.integral + error * dt_s, self.params.integral_limits);

        // No derivative until there's a previous error to difference against
        let deriv = match self.prev_error {
            Some(e) => (error - e) / dt_s,
            None => 0f64,
        };

        self.terms = PidTerms {
            p: self.params.k_p * error,
            i: self.params.k_i * self.integral,
            d: self.params.k_d * deriv,
        };

        self.prev_error = Some(error);

        clamp_to(
            self.terms.p + self.terms.i + self.terms.d,
            self.params.output_limits,
        )
    }

    /// Clear the integral accumulation and error history.
    pub fn reset(&mut self) {
        self.prev_error = None;
        self.integral = 0f64;
        self.terms = PidTerms::default();
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn terms(&self) -> PidTerms {
        self.terms
    }
}

impl PidParams {
    /// Gains with no limits on the output or integral.
    pub fn unlimited(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            output_limits: (std::f64::NEG_INFINITY, std::f64::INFINITY),
            integral_limits: (std::f64::NEG_INFINITY, std::f64::INFINITY),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_proportional() {
        let mut pid = PidController::new(PidParams::unlimited(1.0, 0.0, 0.0));

        assert_eq!(pid.get(2.0, 1.0), 2.0);
        assert_eq!(pid.get(-0.5, 1.0), -0.5);
    }

    #[test]
    fn test_non_positive_dt() {
        let mut pid = PidController::new(PidParams::unlimited(1.0, 1.0, 1.0));

        assert_eq!(pid.get(2.0, 0.0), 0.0);
        assert_eq!(pid.get(2.0, -0.1), 0.0);
        assert_eq!(pid.integral(), 0.0);

        // No history was recorded, so the first real update has no derivative
        assert_eq!(pid.get(2.0, 1.0), 2.0 + 2.0);
    }

    #[test]
    fn test_integral_monotonic() {
        let mut pid = PidController::new(PidParams::unlimited(0.0, 1.0, 0.0));

        let mut last = pid.get(0.5, 0.1);
        for _ in 0..50 {
            let out = pid.get(0.5, 0.1);
            assert!(out > last);
            last = out;
        }
        assert!((pid.integral() - 51.0 * 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_derivative() {
        let mut pid = PidController::new(PidParams::unlimited(0.0, 0.0, 1.0));

        assert_eq!(pid.get(1.0, 0.5), 0.0);
        assert_eq!(pid.get(2.0, 0.5), 2.0);
        assert_eq!(pid.terms().d, 2.0);

        pid.reset();
        assert_eq!(pid.get(5.0, 0.5), 0.0);
    }

    #[test]
    fn test_limits() {
        let mut pid = PidController::new(PidParams {
            k_p: 10.0,
            k_i: 1.0,
            k_d: 0.0,
            output_limits: (-1.0, 1.0),
            integral_limits: (-0.5, 0.5),
        });

        for _ in 0..100 {
            let out = pid.get(3.0, 0.1);
            assert!(out <= 1.0);
            assert!(pid.integral() <= 0.5);
        }
        assert_eq!(pid.integral(), 0.5);

        for _ in 0..100 {
            let out = pid.get(-3.0, 0.1);
            assert!(out >= -1.0);
            assert!(pid.integral() >= -0.5);
        }
        assert_eq!(pid.integral(), -0.5);
    }
}
