//! # Drive Communications Module
//!
//! Messages flowing into and out of the drive controller:
//!
//! - [`EgoFrame`]: the vehicle's pose and speed from perception, JSON encoded.
//! - [`DriveUpdate`]: binary path and target speed updates from the scenario host, see
//!   [`codec`].
//! - [`ControlCmd`]: actuator demands sent back, JSON encoded.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod codec;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

pub use codec::*;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The ego vehicle's state as reported by perception, in the world frame.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct EgoFrame {
    pub x_m: f64,
    pub y_m: f64,

    #[serde(default)]
    pub z_m: f64,

    /// Heading, counter clockwise from the world X axis
    pub heading_rad: f64,

    pub speed_ms: f64,
}

/// A path point as carried in a path update packet.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct WirePathPoint {
    pub x_m: f64,
    pub y_m: f64,
    pub heading_rad: f64,

    /// Road the point lies on, [`UNKNOWN_ROAD_ID`] if not known.
    pub road_id: u32,

    pub s_m: f64,
    pub lane_id: i32,
    pub lane_offset_m: f64,
}

/// Actuator demands produced by one control cycle.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlCmd {
    /// Normalised steering demand in [-1, 1], positive to the left
    pub steering: f64,

    /// Normalised throttle demand in [0, 1]
    pub throttle: f64,

    /// Normalised brake demand in [0, 1]
    pub brake: f64,

    pub indicator: Indicator,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Turn indicator demand.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Indicator {
    Off,
    Left,
    Right,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ControlCmd {
    /// Command which brings the vehicle to a stop with the given brake demand.
    pub fn safe_stop(brake: f64) -> Self {
        Self {
            steering: 0.0,
            throttle: 0.0,
            brake,
            indicator: Indicator::Off,
        }
    }

    /// Returns true if all demands are finite.
    pub fn is_valid(&self) -> bool {
        self.steering.is_finite() && self.throttle.is_finite() && self.brake.is_finite()
    }
}

impl Default for Indicator {
    fn default() -> Self {
        Indicator::Off
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ego_frame_json() {
        let frame: EgoFrame = serde_json::from_str(
            r#"{"x_m": 1.0, "y_m": 2.0, "heading_rad": 0.5, "speed_ms": 3.0}"#,
        )
        .unwrap();

        assert_eq!(frame.z_m, 0.0);
        assert_eq!(frame.speed_ms, 3.0);
    }

    #[test]
    fn test_control_cmd_validity() {
        assert!(ControlCmd::safe_stop(0.5).is_valid());

        let mut cmd = ControlCmd::safe_stop(0.5);
        cmd.steering = std::f64::NAN;
        assert!(!cmd.is_valid());
    }
}
