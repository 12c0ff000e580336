//! Controller parameters
//!
//! Defaults are the tuned values for a passenger car at urban speeds.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::PidParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for speed control
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SpeedCtrlParams {
    /// Speed error controller
    pub pid: PidParams,
}

/// Parameters for steering control
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SteerCtrlParams {
    /// Distance ahead of the nearest point over which the path curvature is measured
    pub curvature_sample_dist_m: f64,

    /// Distance to a curve at which anticipation begins to blend in
    pub anticipate_start_dist_m: f64,

    /// Distance to a curve at which anticipation is fully applied
    pub anticipate_end_dist_m: f64,

    /// Minimum accumulated heading change for a curve to be anticipated
    pub anticipate_min_heading_rad: f64,

    /// Gain applied to the accumulated heading change of an anticipated curve
    pub anticipate_max_gain: f64,

    /// Lookahead time, multiplied by speed to get the lookahead distance
    pub lookahead_time_s: f64,

    /// Minimum lookahead distance
    pub lookahead_min_dist_m: f64,

    /// Reduction of the lookahead distance per unit of curvature
    pub lookahead_curvature_scale: f64,

    /// Lower bound of the curvature reduction factor
    pub lookahead_min_factor: f64,

    /// Gain on the heading error
    pub heading_gain: f64,

    /// Gain on the cross track error at the reference speed. Negative, since a vehicle left of
    /// the path must steer right.
    pub xte_base_gain: f64,

    /// Lower bound of the speed scheduling factor of the cross track gain
    pub xte_speed_min_factor: f64,

    /// Upper bound of the speed scheduling factor of the cross track gain
    pub xte_speed_max_factor: f64,

    /// Speed at which the cross track gain equals the base gain
    pub xte_speed_reference_ms: f64,

    /// Cross track error above which the correction is amplified
    pub xte_nonlinear_threshold_m: f64,

    /// Amplification of large cross track errors
    pub xte_nonlinear_multiplier: f64,

    /// Distance from the vehicle origin to the front axle, where tracking is done
    pub front_axle_offset_m: f64,

    /// Weight of the previous output in the smoothed steering demand
    pub smoothing_factor: f64,

    /// Distance from the final path point within which lane keeping takes over
    pub route_end_dist_m: f64,

    /// Lookahead used for lane keeping at the end of the route
    pub lane_keep_lookahead_m: f64,

    /// Duration of a lane change manoeuvre
    pub lane_change_time_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SpeedCtrlParams {
    fn default() -> Self {
        Self {
            pid: PidParams {
                k_p: 0.8,
                k_i: 0.02,
                k_d: 0.1,
                output_limits: (-1.0, 1.0),
                integral_limits: (-0.5, 0.5),
            },
        }
    }
}

impl Default for SteerCtrlParams {
    fn default() -> Self {
        Self {
            curvature_sample_dist_m: 10.0,
            anticipate_start_dist_m: 10.0,
            anticipate_end_dist_m: 0.0,
            anticipate_min_heading_rad: 0.1,
            anticipate_max_gain: 0.7,
            lookahead_time_s: 0.6,
            lookahead_min_dist_m: 3.0,
            lookahead_curvature_scale: 10.0,
            lookahead_min_factor: 0.4,
            heading_gain: 0.8,
            xte_base_gain: -0.35,
            xte_speed_min_factor: 0.5,
            xte_speed_max_factor: 1.5,
            xte_speed_reference_ms: 10.0,
            xte_nonlinear_threshold_m: 1.0,
            xte_nonlinear_multiplier: 1.5,
            front_axle_offset_m: 3.0,
            smoothing_factor: 0.3,
            route_end_dist_m: 10.0,
            lane_keep_lookahead_m: 5.0,
            lane_change_time_s: 5.0,
        }
    }
}
