//! # Steering controller
//!
//! Lateral control along a path. Each update:
//!
//! 1. Projects the tracking point forward to the front axle.
//! 2. Finds the path point nearest the tracking point, searching a window around the previous
//!    nearest point so the search cost doesn't grow with the path.
//! 3. Measures the path curvature just ahead, and scans further ahead for the onset of a curve
//!    to produce an anticipation term.
//! 4. Picks a lookahead target, shortened on curvy paths.
//! 5. Combines a heading term towards the target, a speed scheduled cross track term and the
//!    anticipation term, then smooths and saturates the result.
//!
//! Close to the end of the route, where there's nothing left to look ahead at, the controller
//! hands over to plain lane keeping using the road query service.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use nalgebra::Vector2;
use serde::Serialize;
use util::maths::{clamp_to, lin_map, wrap_pi};

// Internal
use super::{LaneChange, LaneChangeOutput, SteerCtrlParams};
use crate::{
    path::{PathPoint, VehicleState},
    road::{LaneId, RoadQueryService},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of points behind the previous nearest point included in the nearest point search.
const NEAREST_SEARCH_BEHIND: usize = 10;

/// Number of points ahead of the previous nearest point included in the nearest point search.
const NEAREST_SEARCH_AHEAD: usize = 100;

/// Maximum number of segments walked when measuring curvature.
const CURVATURE_MAX_SEGMENTS: usize = 20;

/// Maximum number of segments scanned for an upcoming curve.
const ANTICIPATE_MAX_SEGMENTS: usize = 60;

/// Heading rate above which a segment is considered part of a curve.
const CURVE_ONSET_RATE_RADM: f64 = 0.02;

/// Segments shorter than this are ignored when scanning for curves.
const MIN_SEGMENT_LENGTH_M: f64 = 0.001;

/// Maximum number of segments walked to find the lookahead target.
const LOOKAHEAD_MAX_SEGMENTS: usize = 50;

/// Distance under which the target is too close to the nearest point to give a direction.
const MIN_TARGET_SEPARATION_M: f64 = 0.1;

/// Segments shorter than this give no cross track error.
const MIN_XTE_SEGMENT_LENGTH_M: f64 = 0.01;

/// Curvature above which smoothing is reduced.
const SMOOTHING_CURVATURE_THRESHOLD: f64 = 0.02;

/// Anticipation magnitude above which smoothing is reduced.
const SMOOTHING_ANTICIPATION_THRESHOLD: f64 = 0.05;

/// Fraction of the smoothing factor used while cornering.
const CORNERING_SMOOTHING_SCALE: f64 = 0.3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SteerCtrl {
    params: SteerCtrlParams,

    /// Last steering demand
    last_steering: f64,

    /// Index of the nearest path point found in the last update
    last_nearest_index: usize,

    lane_change: LaneChange,
}

/// Quantities computed during a steering update, for monitoring.
#[derive(Debug, Default, Serialize, Copy, Clone, PartialEq)]
pub struct SteerReport {
    pub mode: SteerMode,

    pub nearest_index: usize,
    pub target_index: usize,

    /// Path curvature just ahead of the nearest point
    pub curvature_radm: f64,

    /// Anticipation term of the steering demand
    pub anticipation: f64,

    pub heading_error_rad: f64,

    /// Cross track error of the front axle, positive to the left of the path
    pub xte_m: f64,

    pub steering: f64,
}

/// Result of the scan for an upcoming curve.
#[derive(Debug, Default, Copy, Clone)]
struct Anticipation {
    steering: f64,
    curve_detected: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Copy, Clone, PartialEq, Eq)]
pub enum SteerMode {
    /// No steering computed (no path or no elapsed time)
    Idle,

    /// Following the path
    PathFollow,

    /// Keeping the current lane at the end of the route
    LaneKeep,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SteerCtrl {
    pub fn new(params: &SteerCtrlParams) -> Self {
        Self {
            params: params.clone(),
            last_steering: 0.0,
            last_nearest_index: 0,
            lane_change: LaneChange::new(params.lane_change_time_s),
        }
    }

    /// Clear all controller memory, including any lane change in progress.
    pub fn reset(&mut self) {
        self.last_steering = 0.0;
        self.last_nearest_index = 0;
        self.lane_change.cancel();
    }

    /// Restart the nearest point search from the given index, used when the path is replaced.
    pub fn reset_tracking(&mut self, seed_index: usize) {
        self.last_nearest_index = seed_index;
    }

    pub fn last_nearest_index(&self) -> usize {
        self.last_nearest_index
    }

    /// Begin a lane change towards the given lane.
    pub fn start_lane_change(&mut self, target_lane: LaneId) {
        self.lane_change.start(target_lane);
    }

    pub fn cancel_lane_change(&mut self) {
        self.lane_change.cancel();
    }

    pub fn lane_change(&self) -> &LaneChange {
        &self.lane_change
    }

    /// Advance any lane change in progress, returning its steering offset.
    pub fn update_lane_change(&mut self, vehicle: &VehicleState, dt_s: f64) -> LaneChangeOutput {
        self.lane_change.update(vehicle, dt_s)
    }

    /// Get the steering demand for following the path.
    ///
    /// Returns zero when `dt_s` is not positive or the path has fewer than two points. The road
    /// query service is only needed for lane keeping at the end of the route.
    pub fn get(
        &mut self,
        vehicle: &VehicleState,
        path: &[PathPoint],
        dt_s: f64,
        road: Option<&dyn RoadQueryService>,
    ) -> (f64, SteerReport) {
        let mut report = SteerReport::default();

        if dt_s <= 0.0 || path.len() < 2 {
            return (0.0, report);
        }

        // ---- NEAREST POINT ----

        let heading = vehicle.heading_rad;
        let front_m = vehicle.position()
            + Vector2::new(heading.cos(), heading.sin()) * self.params.front_axle_offset_m;

        let nearest_index = self.find_nearest(path, &front_m);
        self.last_nearest_index = nearest_index;
        report.nearest_index = nearest_index;

        // ---- CURVATURE AND ANTICIPATION ----

        let curvature = self.curvature_ahead(path, nearest_index);
        let anticipation = self.anticipate(path, nearest_index);
        report.curvature_radm = curvature;
        report.anticipation = anticipation.steering;

        // ---- LOOKAHEAD TARGET ----

        let curvature_factor = self
            .params
            .lookahead_min_factor
            .max(1.0 - curvature * self.params.lookahead_curvature_scale);
        let lookahead_dist_m = self
            .params
            .lookahead_min_dist_m
            .max(vehicle.speed_ms * self.params.lookahead_time_s * curvature_factor);

        let target_index = self.find_target(path, nearest_index, lookahead_dist_m);
        report.target_index = target_index;

        // ---- ROUTE END ----

        let last = &path[path.len() - 1];
        if target_index >= path.len() - 1 && vehicle.dist_to(last) < self.params.route_end_dist_m {
            if let Some(road) = road {
                match self.lane_keep(vehicle, road) {
                    Some(steering) => {
                        self.last_steering = steering;
                        report.mode = SteerMode::LaneKeep;
                        report.steering = steering;
                        return (steering, report);
                    }
                    None => trace!("Lane keeping unavailable, following the path to its end"),
                }
            }
        }

        // ---- HEADING AND CROSS TRACK ERRORS ----

        let nearest = &path[nearest_index];
        let target = &path[target_index];

        let to_target = target.position() - nearest.position();
        let target_heading = if to_target.norm() > MIN_TARGET_SEPARATION_M {
            to_target[1].atan2(to_target[0])
        } else {
            target.heading_rad
        };
        let heading_error = wrap_pi(target_heading - heading);

        let next = &path[(nearest_index + 1).min(path.len() - 1)];
        let segment = next.position() - nearest.position();
        let segment_len = segment.norm();
        let xte_m = if segment_len > MIN_XTE_SEGMENT_LENGTH_M {
            let to_front = front_m - nearest.position();
            (segment[0] * to_front[1] - segment[1] * to_front[0]) / segment_len
        } else {
            0.0
        };

        report.heading_error_rad = heading_error;
        report.xte_m = xte_m;

        // ---- COMBINATION ----

        let speed_factor = clamp_to(
            self.params.xte_speed_reference_ms / vehicle.speed_ms.max(1.0),
            (
                self.params.xte_speed_min_factor,
                self.params.xte_speed_max_factor,
            ),
        );
        let mut xte_term = self.params.xte_base_gain * speed_factor * xte_m;
        if xte_m.abs() > self.params.xte_nonlinear_threshold_m {
            xte_term *= self.params.xte_nonlinear_multiplier;
        }

        let raw = self.params.heading_gain * heading_error + xte_term + anticipation.steering;

        // Smoothing is relaxed in curves so the demand can follow the path quickly
        let cornering = anticipation.curve_detected
            || curvature > SMOOTHING_CURVATURE_THRESHOLD
            || anticipation.steering.abs() > SMOOTHING_ANTICIPATION_THRESHOLD;
        let smoothing = if cornering {
            self.params.smoothing_factor * CORNERING_SMOOTHING_SCALE
        } else {
            self.params.smoothing_factor
        };

        let steering = clamp_to(
            raw * (1.0 - smoothing) + self.last_steering * smoothing,
            (-1.0, 1.0),
        );
        self.last_steering = steering;

        report.mode = SteerMode::PathFollow;
        report.steering = steering;

        debug!(
            "Steer: nearest {}, target {}, head err {:.3} rad, xte {:.2} m, antic {:.3}, out {:.3}",
            nearest_index, target_index, heading_error, xte_m, anticipation.steering, steering
        );

        (steering, report)
    }

    /// Index of the point nearest the tracking point within the search window.
    fn find_nearest(&self, path: &[PathPoint], front_m: &Vector2<f64>) -> usize {
        // A previous index past the end of a shorter replacement path restarts at its end
        let prev = self.last_nearest_index.min(path.len() - 1);
        let start = prev.saturating_sub(NEAREST_SEARCH_BEHIND);
        let end = (prev + NEAREST_SEARCH_AHEAD).min(path.len());

        let mut nearest_index = prev;
        let mut min_dist = std::f64::INFINITY;
        for (i, p) in path.iter().enumerate().take(end).skip(start) {
            let d = (p.position() - front_m).norm();
            if d < min_dist {
                min_dist = d;
                nearest_index = i;
            }
        }

        nearest_index
    }

    /// Heading change per metre over the sample distance ahead of `start`.
    fn curvature_ahead(&self, path: &[PathPoint], start: usize) -> f64 {
        let end = (start + CURVATURE_MAX_SEGMENTS).min(path.len() - 1);

        let mut sample_index = start;
        let mut dist_m = 0.0;
        for i in start..end {
            dist_m += path[i].dist_to(&path[i + 1]);
            sample_index = i + 1;
            if dist_m >= self.params.curvature_sample_dist_m {
                break;
            }
        }

        if sample_index > start && dist_m > 0.0 {
            wrap_pi(path[sample_index].heading_rad - path[start].heading_rad).abs() / dist_m
        } else {
            0.0
        }
    }

    /// Scan ahead for the onset of a curve and compute the anticipation term.
    fn anticipate(&self, path: &[PathPoint], start: usize) -> Anticipation {
        let end = (start + ANTICIPATE_MAX_SEGMENTS).min(path.len() - 1);

        let mut onset_dist_m: Option<f64> = None;
        let mut heading_change = 0.0;
        let mut scan_dist_m = 0.0;
        let mut prev_heading = path[start].heading_rad;

        for i in start..end {
            let segment_len = path[i].dist_to(&path[i + 1]);
            scan_dist_m += segment_len;
            if scan_dist_m > self.params.anticipate_start_dist_m {
                break;
            }

            let heading = path[i + 1].heading_rad;
            let delta_h = wrap_pi(heading - prev_heading);

            if segment_len > MIN_SEGMENT_LENGTH_M {
                if onset_dist_m.is_none() && delta_h.abs() / segment_len > CURVE_ONSET_RATE_RADM {
                    onset_dist_m = Some(scan_dist_m);
                }
                if onset_dist_m.is_some() {
                    heading_change += delta_h;
                }
            }

            prev_heading = heading;
        }

        let onset_dist_m = match onset_dist_m {
            Some(d) if heading_change.abs() > self.params.anticipate_min_heading_rad => d,
            _ => return Anticipation::default(),
        };

        let (start_dist, end_dist) = (
            self.params.anticipate_start_dist_m,
            self.params.anticipate_end_dist_m,
        );
        let blend = if onset_dist_m <= end_dist {
            1.0
        } else if onset_dist_m >= start_dist {
            0.0
        } else {
            lin_map((start_dist, end_dist), (0.0, 1.0), onset_dist_m)
        };

        Anticipation {
            steering: heading_change * self.params.anticipate_max_gain * blend,
            curve_detected: true,
        }
    }

    /// Index of the first point at least `lookahead_dist_m` along the path from `start`, or of
    /// the last point walked.
    fn find_target(&self, path: &[PathPoint], start: usize, lookahead_dist_m: f64) -> usize {
        let end = (start + LOOKAHEAD_MAX_SEGMENTS).min(path.len() - 1);

        let mut target_index = start;
        let mut dist_m = 0.0;
        for i in start..end {
            dist_m += path[i].dist_to(&path[i + 1]);
            target_index = i + 1;
            if dist_m >= lookahead_dist_m {
                break;
            }
        }

        target_index
    }

    /// Steering towards the current lane's centre a short distance ahead.
    ///
    /// The heading error is taken with a positive gain, the same convention as path following,
    /// so a lane centre to the left steers left. Negating the gain here would steer away from
    /// the lane.
    fn lane_keep(&self, vehicle: &VehicleState, road: &dyn RoadQueryService) -> Option<f64> {
        let ahead = road
            .lane_ahead(
                vehicle.x_m,
                vehicle.y_m,
                vehicle.heading_rad,
                self.params.lane_keep_lookahead_m,
            )
            .ok()?;

        let dx = ahead.x_m - vehicle.x_m;
        let dy = ahead.y_m - vehicle.y_m;
        let target_heading = if dx.hypot(dy) > MIN_TARGET_SEPARATION_M {
            dy.atan2(dx)
        } else {
            ahead.heading_rad
        };

        let heading_error = wrap_pi(target_heading - vehicle.heading_rad);

        Some(clamp_to(
            self.params.heading_gain * heading_error,
            (-1.0, 1.0),
        ))
    }
}

impl Default for SteerMode {
    fn default() -> Self {
        SteerMode::Idle
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::road::{polyline_net::RoadDef, PolylineRoadNet, RoadNetParams};
    use std::f64::consts::FRAC_PI_2;

    /// Straight path along +X with 1 m spacing.
    fn straight_path(len: usize) -> Vec<PathPoint> {
        (0..len)
            .map(|i| PathPoint::new(i as f64, 0.0, 0.0))
            .collect()
    }

    /// Straight for 30 m then a left quarter circle of radius 20 m.
    fn curve_path() -> Vec<PathPoint> {
        let mut path: Vec<PathPoint> = (0..30)
            .map(|i| PathPoint::new(i as f64, 0.0, 0.0))
            .collect();
        for i in 0..=31 {
            let a = (i as f64) / 31.0 * FRAC_PI_2;
            path.push(PathPoint::new(30.0 + 20.0 * a.sin(), 20.0 - 20.0 * a.cos(), a));
        }
        path
    }

    #[test]
    fn test_no_path() {
        let mut ctrl = SteerCtrl::new(&SteerCtrlParams::default());
        let vehicle = VehicleState::new(0.0, 0.0, 0.0, 10.0);

        assert_eq!(ctrl.get(&vehicle, &[], 0.05, None).0, 0.0);
        assert_eq!(ctrl.get(&vehicle, &straight_path(1), 0.05, None).0, 0.0);
        assert_eq!(ctrl.get(&vehicle, &straight_path(10), 0.0, None).0, 0.0);
    }

    #[test]
    fn test_on_path_zero() {
        let mut ctrl = SteerCtrl::new(&SteerCtrlParams::default());
        let path = straight_path(200);

        for i in 0..20 {
            let vehicle = VehicleState::new(10.0 + i as f64, 0.0, 0.0, 10.0);
            let (steering, report) = ctrl.get(&vehicle, &path, 0.05, None);
            assert!(steering.abs() < 1e-9);
            assert_eq!(report.anticipation, 0.0);
            assert_eq!(report.mode, SteerMode::PathFollow);
        }
    }

    #[test]
    fn test_bounded() {
        let path = curve_path();

        for &(x, y, h, v) in &[
            (5.0, 30.0, 3.0, 30.0),
            (0.0, -40.0, -2.0, 0.0),
            (40.0, 10.0, 1.0, 60.0),
            (15.0, 3.0, -3.1, 5.0),
        ] {
            let mut ctrl = SteerCtrl::new(&SteerCtrlParams::default());
            for _ in 0..20 {
                let (steering, _) = ctrl.get(&VehicleState::new(x, y, h, v), &path, 0.05, None);
                assert!(steering >= -1.0 && steering <= 1.0);
            }
        }
    }

    #[test]
    fn test_left_of_path_steers_right() {
        let mut ctrl = SteerCtrl::new(&SteerCtrlParams::default());
        let path = straight_path(200);

        let (steering, report) =
            ctrl.get(&VehicleState::new(20.0, 0.5, 0.0, 10.0), &path, 0.05, None);
        assert!(report.xte_m > 0.0);
        assert!(steering < 0.0);

        ctrl.reset();
        let (steering, report) =
            ctrl.get(&VehicleState::new(20.0, -0.5, 0.0, 10.0), &path, 0.05, None);
        assert!(report.xte_m < 0.0);
        assert!(steering > 0.0);
    }

    #[test]
    fn test_xte_term_monotonic_and_steeper_beyond_threshold() {
        let params = SteerCtrlParams {
            smoothing_factor: 0.0,
            ..Default::default()
        };
        let path = straight_path(200);

        // With zero heading error and no smoothing only the cross track term remains
        let offsets = [0.2, 0.4, 0.6, 0.8, 1.0, 1.2, 1.4, 1.6];
        let outputs: Vec<f64> = offsets
            .iter()
            .map(|&y| {
                let mut ctrl = SteerCtrl::new(&params);
                let (steering, report) =
                    ctrl.get(&VehicleState::new(20.0, y, 0.0, 10.0), &path, 0.05, None);
                assert_eq!(report.heading_error_rad, 0.0);
                steering
            })
            .collect();

        for w in outputs.windows(2) {
            assert!(w[1].abs() > w[0].abs());
        }

        // Slope above the threshold is steeper than below it
        let slope_below = (outputs[3] - outputs[2]).abs() / 0.2;
        let slope_above = (outputs[7] - outputs[6]).abs() / 0.2;
        assert!(slope_above > slope_below);
    }

    #[test]
    fn test_xte_speed_scheduling() {
        let params = SteerCtrlParams {
            smoothing_factor: 0.0,
            heading_gain: 0.0,
            ..Default::default()
        };
        let path = straight_path(400);

        let mut slow = SteerCtrl::new(&params);
        let mut fast = SteerCtrl::new(&params);
        let (slow_out, _) = slow.get(&VehicleState::new(20.0, 0.5, 0.0, 2.0), &path, 0.05, None);
        let (fast_out, _) = fast.get(&VehicleState::new(20.0, 0.5, 0.0, 30.0), &path, 0.05, None);

        // Speed factor clamps at 1.5 when slow and 0.5 when fast
        assert!((slow_out - (-0.35 * 1.5 * 0.5)).abs() < 1e-9);
        assert!((fast_out - (-0.35 * 0.5 * 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_anticipates_left_curve() {
        let params = SteerCtrlParams::default();
        let mut ctrl = SteerCtrl::new(&params);
        let path = curve_path();

        // Front axle at x = 25, 5 m before the curve onset
        let (_, report) = ctrl.get(&VehicleState::new(22.0, 0.0, 0.0, 10.0), &path, 0.05, None);
        assert!(report.anticipation > 0.0);

        // Far from the curve there's nothing to anticipate
        ctrl.reset();
        let (_, report) = ctrl.get(&VehicleState::new(2.0, 0.0, 0.0, 10.0), &path, 0.05, None);
        assert_eq!(report.anticipation, 0.0);
    }

    #[test]
    fn test_nearest_search_window() {
        let mut ctrl = SteerCtrl::new(&SteerCtrlParams::default());
        let path = straight_path(400);

        // The vehicle is at x = 300 but the search starts from the beginning of the path
        let (_, report) = ctrl.get(&VehicleState::new(297.0, 0.0, 0.0, 10.0), &path, 0.05, None);
        assert_eq!(report.nearest_index, 99);

        let (_, report) = ctrl.get(&VehicleState::new(297.0, 0.0, 0.0, 10.0), &path, 0.05, None);
        assert_eq!(report.nearest_index, 198);

        ctrl.reset_tracking(290);
        let (_, report) = ctrl.get(&VehicleState::new(297.0, 0.0, 0.0, 10.0), &path, 0.05, None);
        assert_eq!(report.nearest_index, 300);
    }

    #[test]
    fn test_lane_keep_at_route_end() {
        let net = PolylineRoadNet::new(RoadNetParams {
            roads: vec![RoadDef::straight(1, [0.0, 0.0], 0.0, 200.0, 3.5, 1, 1)],
            junctions: vec![],
        })
        .unwrap();

        let mut ctrl = SteerCtrl::new(&SteerCtrlParams::default());
        let path: Vec<PathPoint> = (0..=50)
            .map(|i| PathPoint::new(i as f64, -1.75, 0.0))
            .collect();

        // Vehicle 5 m from the end of the path, half a metre left of the lane centre
        let vehicle = VehicleState::new(45.0, -1.25, 0.0, 10.0);
        let (steering, report) = ctrl.get(&vehicle, &path, 0.05, Some(&net));
        assert_eq!(report.mode, SteerMode::LaneKeep);
        assert!(steering < 0.0);

        // Right of the lane centre steers left
        let mut ctrl = SteerCtrl::new(&SteerCtrlParams::default());
        let right = VehicleState::new(45.0, -2.25, 0.0, 10.0);
        let (steering, report) = ctrl.get(&right, &path, 0.05, Some(&net));
        assert_eq!(report.mode, SteerMode::LaneKeep);
        assert!(steering > 0.0);

        // On the centre line but yawed left steers right
        let mut ctrl = SteerCtrl::new(&SteerCtrlParams::default());
        let yawed = VehicleState::new(45.0, -1.75, 0.2, 10.0);
        let (steering, _) = ctrl.get(&yawed, &path, 0.05, Some(&net));
        assert!(steering < 0.0);

        // Without a road service the path is followed to its end
        let (_, report) = ctrl.get(&vehicle, &path, 0.05, None);
        assert_eq!(report.mode, SteerMode::PathFollow);
    }
}
