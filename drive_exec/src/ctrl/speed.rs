//! # Speed controller
//!
//! Longitudinal control. A single PID acts on the speed error, positive outputs are throttle
//! demands and negative outputs brake demands. Throttle and brake are never both non-zero.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use super::{PidController, SpeedCtrlParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SpeedCtrl {
    pid: PidController,
    target_speed_ms: f64,
}

/// Throttle and brake demands, both in [0, 1].
#[derive(Debug, Default, Serialize, Copy, Clone, PartialEq)]
pub struct PedalDems {
    pub throttle: f64,
    pub brake: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SpeedCtrl {
    pub fn new(params: &SpeedCtrlParams) -> Self {
        Self {
            pid: PidController::new(params.pid.clone()),
            target_speed_ms: 0.0,
        }
    }

    /// Set the target speed. Negative targets are clamped to zero, non-finite ones ignored.
    pub fn set_target_speed(&mut self, speed_ms: f64) {
        if speed_ms.is_finite() {
            self.target_speed_ms = speed_ms.max(0.0);
        }
    }

    pub fn target_speed(&self) -> f64 {
        self.target_speed_ms
    }

    /// Get the pedal demands for the current speed.
    pub fn get(&mut self, current_speed_ms: f64, dt_s: f64) -> PedalDems {
        if dt_s <= 0.0 {
            return PedalDems::default();
        }

        let out = self.pid.get(self.target_speed_ms - current_speed_ms, dt_s);

        if out >= 0.0 {
            PedalDems {
                throttle: out.min(1.0),
                brake: 0.0,
            }
        } else {
            PedalDems {
                throttle: 0.0,
                brake: (-out).min(1.0),
            }
        }
    }

    pub fn reset(&mut self) {
        self.pid.reset();
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_throttle_below_target() {
        let mut ctrl = SpeedCtrl::new(&SpeedCtrlParams::default());
        ctrl.set_target_speed(10.0);

        let dems = ctrl.get(5.0, 0.05);
        assert!(dems.throttle > 0.0);
        assert!(dems.throttle <= 1.0);
        assert_eq!(dems.brake, 0.0);
    }

    #[test]
    fn test_brake_above_target() {
        let mut ctrl = SpeedCtrl::new(&SpeedCtrlParams::default());
        ctrl.set_target_speed(5.0);

        let dems = ctrl.get(15.0, 0.05);
        assert_eq!(dems.throttle, 0.0);
        assert!(dems.brake > 0.0);
        assert!(dems.brake <= 1.0);
    }

    #[test]
    fn test_target_clamped() {
        let mut ctrl = SpeedCtrl::new(&SpeedCtrlParams::default());

        ctrl.set_target_speed(-3.0);
        assert_eq!(ctrl.target_speed(), 0.0);

        ctrl.set_target_speed(std::f64::NAN);
        assert_eq!(ctrl.target_speed(), 0.0);

        // Stationary at a zero target needs no demand at all
        let dems = ctrl.get(0.0, 0.05);
        assert_eq!(dems, PedalDems::default());
    }

    #[test]
    fn test_zero_dt() {
        let mut ctrl = SpeedCtrl::new(&SpeedCtrlParams::default());
        ctrl.set_target_speed(10.0);

        assert_eq!(ctrl.get(0.0, 0.0), PedalDems::default());
    }
}
