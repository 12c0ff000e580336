//! # Lane change manoeuvre
//!
//! A lane change is a small state machine, `LaneKeep -> Prepare -> Changing -> LaneKeep`. While
//! changing, a half sine steering offset is produced which the caller adds to the path
//! following demand. The manoeuvre completes when the vehicle is centred in the target lane or
//! when the configured duration has elapsed, whichever comes first.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;

use log::{debug, info};
use serde::Serialize;

use comms_if::drive::Indicator;

use crate::{path::VehicleState, road::LaneId};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Peak steering offset during a lane change.
const LANE_CHANGE_PEAK_OFFSET: f64 = 0.3;

/// Lane offset within which the vehicle counts as centred in the target lane.
const LANE_CENTRED_TOLERANCE_M: f64 = 0.5;

/// Progress beyond which the manoeuvre counts as finished.
const PROGRESS_COMPLETE: f64 = 1.0 - 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct LaneChange {
    state: LaneChangeState,
    target_lane: LaneId,

    /// Fraction of the manoeuvre completed, in [0, 1]
    progress: f64,

    duration_s: f64,
}

/// Output of one lane change update.
#[derive(Debug, Serialize, Copy, Clone, PartialEq)]
pub struct LaneChangeOutput {
    /// Steering offset to add to the path following demand
    pub steering_offset: f64,

    /// True once no manoeuvre is in progress
    pub completed: bool,

    pub indicator: Indicator,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum LaneChangeState {
    LaneKeep,
    Prepare,
    Changing,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LaneChange {
    pub fn new(duration_s: f64) -> Self {
        Self {
            state: LaneChangeState::LaneKeep,
            target_lane: 0,
            progress: 0.0,
            duration_s,
        }
    }

    /// Begin a lane change towards the given lane, replacing any manoeuvre in progress.
    pub fn start(&mut self, target_lane: LaneId) {
        info!("Lane change to lane {} requested", target_lane);
        self.state = LaneChangeState::Prepare;
        self.target_lane = target_lane;
        self.progress = 0.0;
    }

    /// Abandon any manoeuvre in progress.
    pub fn cancel(&mut self) {
        self.state = LaneChangeState::LaneKeep;
        self.progress = 0.0;
    }

    pub fn state(&self) -> LaneChangeState {
        self.state
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Advance the manoeuvre by `dt_s` seconds.
    pub fn update(&mut self, vehicle: &VehicleState, dt_s: f64) -> LaneChangeOutput {
        if self.state == LaneChangeState::Prepare {
            debug!("Lane change preparation done, changing to lane {}", self.target_lane);
            self.state = LaneChangeState::Changing;
        }

        if self.state != LaneChangeState::Changing {
            return LaneChangeOutput::idle();
        }

        let current_lane = vehicle.lane_id();
        let lane_offset_m = vehicle.road.map(|r| r.lane_offset_m).unwrap_or(0.0);

        if current_lane == self.target_lane && lane_offset_m.abs() < LANE_CENTRED_TOLERANCE_M {
            info!("Lane change complete, centred in lane {}", self.target_lane);
            self.cancel();
            return LaneChangeOutput::idle();
        }

        if dt_s > 0.0 && self.duration_s > 0.0 {
            self.progress = (self.progress + dt_s / self.duration_s).max(0.0).min(1.0);
        } else if self.duration_s <= 0.0 {
            self.progress = 1.0;
        }

        if self.progress >= PROGRESS_COMPLETE {
            info!("Lane change to lane {} timed out", self.target_lane);
            self.cancel();
            return LaneChangeOutput::idle();
        }

        // Positive lane direction is to the left, which is positive steering
        let direction = (self.target_lane - current_lane).signum() as f64;

        LaneChangeOutput {
            steering_offset: direction * LANE_CHANGE_PEAK_OFFSET * (self.progress * PI).sin(),
            completed: false,
            indicator: if direction > 0.0 {
                Indicator::Left
            } else {
                Indicator::Right
            },
        }
    }
}

impl LaneChangeOutput {
    fn idle() -> Self {
        Self {
            steering_offset: 0.0,
            completed: true,
            indicator: Indicator::Off,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::path::RoadFrame;

    fn in_lane(lane_id: LaneId, lane_offset_m: f64) -> VehicleState {
        let mut state = VehicleState::new(0.0, 0.0, 0.0, 10.0);
        state.road = Some(RoadFrame {
            road_id: 1,
            lane_id,
            s_m: 10.0,
            lane_offset_m,
            heading_relative_rad: 0.0,
        });
        state
    }

    #[test]
    fn test_idle() {
        let mut lc = LaneChange::new(5.0);

        let out = lc.update(&in_lane(-1, 0.0), 0.1);
        assert!(out.completed);
        assert_eq!(out.steering_offset, 0.0);
        assert_eq!(out.indicator, Indicator::Off);
    }

    #[test]
    fn test_timed_completion() {
        let mut lc = LaneChange::new(5.0);
        lc.start(1);
        assert_eq!(lc.state(), LaneChangeState::Prepare);

        let vehicle = in_lane(-1, 0.0);

        // 5 s at 0.1 s per tick, the vehicle never reaches the target lane
        for i in 0..49 {
            let out = lc.update(&vehicle, 0.1);
            assert!(!out.completed, "completed early at tick {}", i);
            assert_eq!(out.indicator, Indicator::Left);
            assert!(out.steering_offset > 0.0);
            assert!(out.steering_offset <= LANE_CHANGE_PEAK_OFFSET);
        }

        let out = lc.update(&vehicle, 0.1);
        assert!(out.completed);
        assert_eq!(out.indicator, Indicator::Off);
        assert_eq!(lc.state(), LaneChangeState::LaneKeep);
    }

    #[test]
    fn test_completion_in_target_lane() {
        let mut lc = LaneChange::new(5.0);
        lc.start(-2);

        let out = lc.update(&in_lane(-1, 0.0), 0.1);
        assert_eq!(out.indicator, Indicator::Right);
        assert!(out.steering_offset < 0.0);

        // Reached the lane but not yet centred
        let out = lc.update(&in_lane(-2, 0.8), 0.1);
        assert!(!out.completed);

        let out = lc.update(&in_lane(-2, 0.2), 0.1);
        assert!(out.completed);
        assert_eq!(out.steering_offset, 0.0);
    }

    #[test]
    fn test_offset_peaks_mid_manoeuvre() {
        let mut lc = LaneChange::new(1.0);
        lc.start(1);

        let vehicle = in_lane(-1, 0.0);
        let out = lc.update(&vehicle, 0.5);
        assert!((out.steering_offset - LANE_CHANGE_PEAK_OFFSET).abs() < 1e-9);
        assert!((lc.progress() - 0.5).abs() < 1e-9);
    }
}
