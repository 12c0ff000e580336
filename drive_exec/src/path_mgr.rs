//! # Path manager
//!
//! Paths come from three sources, in decreasing priority:
//!
//! 1. user paths set explicitly by the operator,
//! 2. calculated paths produced by the router,
//! 3. external paths received from the scenario host.
//!
//! Each source has its own list and the active path is always the highest priority non-empty
//! one, so clearing a higher priority path falls back to the next one without losing it. The
//! manager also tracks the index of the current point on the active path and classifies
//! individual points as passed or missed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use log::{debug, info};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::path::{PathPoint, VehicleState};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Thresholds used to classify points as passed or missed.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PassParams {
    /// Along-road distance before a point at which it counts as reached
    pub s_tolerance_m: f64,

    /// A point approached within this distance can be passed by moving away from it
    pub proximity_dist_m: f64,

    /// Distance beyond the closest approach after which the point counts as passed
    pub recede_margin_m: f64,

    /// A point behind the vehicle counts as passed when further away than this
    pub behind_min_dist_m: f64,

    /// Distance within which a point counts as reached
    pub reached_dist_m: f64,
}

#[derive(Debug, Clone)]
pub struct PathMgr {
    params: PassParams,

    user: Vec<PathPoint>,
    calculated: Vec<PathPoint>,
    external: Vec<PathPoint>,

    /// Index of the current point in the active path
    current_index: usize,

    /// Closest approach to points tracked off their road, keyed by the point's position
    min_dists: HashMap<(OrderedFloat<f64>, OrderedFloat<f64>), f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The source of a path.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum PathSource {
    User,
    Calculated,
    External,
}

/// Progress of the vehicle relative to a path point.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum PointStatus {
    NotReached,

    /// The point was reached in the right lane
    Passed,

    /// The point was reached in the wrong lane
    Missed,
}

/// Direction of travel along a road's `s` axis.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum TravelDirection {
    Forward,
    Backward,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathMgr {
    pub fn new(params: PassParams) -> Self {
        Self {
            params,
            user: Vec::new(),
            calculated: Vec::new(),
            external: Vec::new(),
            current_index: 0,
            min_dists: HashMap::new(),
        }
    }

    /// The active path, empty if no source has one.
    pub fn path(&self) -> &[PathPoint] {
        if !self.user.is_empty() {
            &self.user
        } else if !self.calculated.is_empty() {
            &self.calculated
        } else {
            &self.external
        }
    }

    /// The source of the active path, `None` if there's no path.
    pub fn source(&self) -> Option<PathSource> {
        if !self.user.is_empty() {
            Some(PathSource::User)
        } else if !self.calculated.is_empty() {
            Some(PathSource::Calculated)
        } else if !self.external.is_empty() {
            Some(PathSource::External)
        } else {
            None
        }
    }

    pub fn has_path(&self) -> bool {
        !self.path().is_empty()
    }

    /// Set the user path, which becomes active from its first point.
    pub fn set_user(&mut self, path: Vec<PathPoint>) {
        info!("User path set with {} points", path.len());
        self.user = path;
        self.current_index = 0;
        self.min_dists.clear();
        self.clamp_index();
    }

    /// Clear the user path, falling back to the calculated or external path.
    pub fn clear_user(&mut self) {
        self.user.clear();
        self.min_dists.clear();
        self.clamp_index();
        debug!("User path cleared, active source now {:?}", self.source());
    }

    /// Set the calculated path. It becomes active from its first point unless a user path is
    /// present.
    pub fn set_calculated(&mut self, path: Vec<PathPoint>) {
        self.calculated = path;
        if self.user.is_empty() {
            self.current_index = 0;
        }
        self.min_dists.clear();
        self.clamp_index();
    }

    /// Set the external path along with the host's notion of the current point. The index is
    /// only taken when the external path is the active one.
    pub fn set_external(&mut self, path: Vec<PathPoint>, current_index: usize) {
        self.external = path;
        if self.user.is_empty() && self.calculated.is_empty() {
            self.current_index = current_index;
        }
        self.min_dists.clear();
        self.clamp_index();
    }

    /// Clear every source.
    pub fn clear(&mut self) {
        self.user.clear();
        self.calculated.clear();
        self.external.clear();
        self.current_index = 0;
        self.min_dists.clear();
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Set the current index, clamped to the active path.
    pub fn set_current_index(&mut self, index: usize) {
        self.current_index = index;
        self.clamp_index();
    }

    pub fn current_point(&self) -> Option<&PathPoint> {
        self.path().get(self.current_index)
    }

    pub fn next_point(&self) -> Option<&PathPoint> {
        self.path().get(self.current_index + 1)
    }

    /// Move to the next point. Returns false if already at the last point.
    pub fn advance(&mut self) -> bool {
        if self.current_index + 1 < self.path().len() {
            self.current_index += 1;
            true
        } else {
            false
        }
    }

    /// True if there's no path or the current point is the last one.
    pub fn is_complete(&self) -> bool {
        self.current_index + 1 >= self.path().len()
    }

    /// Classify the vehicle's progress relative to a target point.
    ///
    /// On the target's own road progress is judged by `s`. Elsewhere, typically while crossing
    /// a junction, it is judged by the distance to the point: a point approached closely and
    /// then left behind, a point well behind the vehicle, or a point reached directly all count
    /// as passed. Reached points are missed if the vehicle is in the wrong lane.
    pub fn classify(
        &mut self,
        vehicle: &VehicleState,
        target: &PathPoint,
        direction: TravelDirection,
    ) -> PointStatus {
        let dist_m = vehicle.dist_to(target);

        let frame = match (vehicle.road, target.road_id) {
            (Some(frame), Some(road_id)) if frame.road_id == road_id => frame,
            _ => return self.classify_off_road(vehicle, target, dist_m),
        };

        let reached = match direction {
            TravelDirection::Forward => frame.s_m > target.s_m - self.params.s_tolerance_m,
            TravelDirection::Backward => frame.s_m < target.s_m + self.params.s_tolerance_m,
        };

        if !reached {
            PointStatus::NotReached
        } else if lane_matches(frame.lane_id, target) {
            PointStatus::Passed
        } else {
            PointStatus::Missed
        }
    }

    fn classify_off_road(
        &mut self,
        vehicle: &VehicleState,
        target: &PathPoint,
        dist_m: f64,
    ) -> PointStatus {
        let key = (OrderedFloat(target.x_m), OrderedFloat(target.y_m));

        let min_dist_m = {
            let min = self.min_dists.entry(key).or_insert(dist_m);
            if dist_m < *min {
                *min = dist_m;
            }
            *min
        };

        if min_dist_m < self.params.proximity_dist_m
            && dist_m > min_dist_m + self.params.recede_margin_m
        {
            self.min_dists.remove(&key);
            return PointStatus::Passed;
        }

        let bearing_rad = (target.y_m - vehicle.y_m).atan2(target.x_m - vehicle.x_m);
        let off_bearing_rad = util::maths::wrap_pi(bearing_rad - vehicle.heading_rad);
        if off_bearing_rad.abs() > std::f64::consts::FRAC_PI_2
            && dist_m > self.params.behind_min_dist_m
        {
            self.min_dists.remove(&key);
            return PointStatus::Passed;
        }

        if dist_m < self.params.reached_dist_m {
            return if lane_matches(vehicle.lane_id(), target) {
                PointStatus::Passed
            } else {
                PointStatus::Missed
            };
        }

        PointStatus::NotReached
    }

    fn clamp_index(&mut self) {
        let len = self.path().len();
        self.current_index = self.current_index.min(len.saturating_sub(1));
    }
}

impl Default for PassParams {
    fn default() -> Self {
        Self {
            s_tolerance_m: 1.0,
            proximity_dist_m: 10.0,
            recede_margin_m: 3.0,
            behind_min_dist_m: 5.0,
            reached_dist_m: 1.5,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// A target lane of 0 matches any lane.
fn lane_matches(lane_id: i32, target: &PathPoint) -> bool {
    target.lane_id == 0 || lane_id == target.lane_id
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::path::RoadFrame;

    fn line(len: usize, y: f64) -> Vec<PathPoint> {
        (0..len)
            .map(|i| PathPoint::new(i as f64, y, 0.0))
            .collect()
    }

    fn on_road(x_m: f64, road_id: u32, lane_id: i32, s_m: f64) -> VehicleState {
        let mut v = VehicleState::new(x_m, 0.0, 0.0, 10.0);
        v.road = Some(RoadFrame {
            road_id,
            lane_id,
            s_m,
            lane_offset_m: 0.0,
            heading_relative_rad: 0.0,
        });
        v
    }

    fn road_point(x_m: f64, road_id: u32, lane_id: i32, s_m: f64) -> PathPoint {
        PathPoint {
            road_id: Some(road_id),
            lane_id,
            s_m,
            ..PathPoint::new(x_m, 0.0, 0.0)
        }
    }

    #[test]
    fn test_priority() {
        let mut mgr = PathMgr::new(PassParams::default());
        assert_eq!(mgr.source(), None);
        assert!(mgr.path().is_empty());

        mgr.set_external(line(10, 3.0), 4);
        assert_eq!(mgr.source(), Some(PathSource::External));
        assert_eq!(mgr.current_index(), 4);

        mgr.set_calculated(line(20, 2.0));
        assert_eq!(mgr.source(), Some(PathSource::Calculated));
        assert_eq!(mgr.current_index(), 0);

        mgr.set_user(line(5, 1.0));
        assert_eq!(mgr.source(), Some(PathSource::User));
        assert_eq!(mgr.path()[0].y_m, 1.0);

        // Lower priority updates don't disturb the active path
        mgr.set_external(line(10, 4.0), 7);
        mgr.set_calculated(line(30, 5.0));
        assert_eq!(mgr.source(), Some(PathSource::User));
        assert_eq!(mgr.path().len(), 5);
        assert_eq!(mgr.current_index(), 0);

        mgr.clear_user();
        assert_eq!(mgr.source(), Some(PathSource::Calculated));
        assert_eq!(mgr.path()[0].y_m, 5.0);

        mgr.clear();
        assert_eq!(mgr.source(), None);
    }

    #[test]
    fn test_index_clamped() {
        let mut mgr = PathMgr::new(PassParams::default());

        mgr.set_current_index(5);
        assert_eq!(mgr.current_index(), 0);

        mgr.set_external(line(10, 0.0), 50);
        assert_eq!(mgr.current_index(), 9);

        mgr.set_current_index(3);
        assert_eq!(mgr.current_index(), 3);

        // Switching to a shorter path keeps the index in range
        mgr.set_current_index(9);
        mgr.set_user(line(4, 0.0));
        mgr.set_current_index(100);
        assert_eq!(mgr.current_index(), 3);
        mgr.clear_user();
        assert_eq!(mgr.current_index(), 3);
    }

    #[test]
    fn test_advance() {
        let mut mgr = PathMgr::new(PassParams::default());
        assert!(!mgr.advance());
        assert!(mgr.is_complete());

        mgr.set_user(line(3, 0.0));
        assert!(!mgr.is_complete());
        assert_eq!(mgr.next_point().map(|p| p.x_m), Some(1.0));
        assert!(mgr.advance());
        assert!(mgr.advance());
        assert!(!mgr.advance());
        assert!(mgr.is_complete());
        assert_eq!(mgr.current_point().map(|p| p.x_m), Some(2.0));
        assert_eq!(mgr.next_point(), None);
    }

    #[test]
    fn test_classify_same_road() {
        let mut mgr = PathMgr::new(PassParams::default());
        let target = road_point(50.0, 1, -1, 50.0);

        assert_eq!(
            mgr.classify(&on_road(40.0, 1, -1, 40.0), &target, TravelDirection::Forward),
            PointStatus::NotReached
        );
        assert_eq!(
            mgr.classify(&on_road(49.5, 1, -1, 49.5), &target, TravelDirection::Forward),
            PointStatus::Passed
        );
        assert_eq!(
            mgr.classify(&on_road(49.5, 1, -2, 49.5), &target, TravelDirection::Forward),
            PointStatus::Missed
        );
        assert_eq!(
            mgr.classify(&on_road(60.0, 1, 1, 60.0), &target, TravelDirection::Backward),
            PointStatus::NotReached
        );
        assert_eq!(
            mgr.classify(&on_road(50.5, 1, -1, 50.5), &target, TravelDirection::Backward),
            PointStatus::Passed
        );

        // Any lane matches a target with an unknown lane
        let wildcard = road_point(50.0, 1, 0, 50.0);
        assert_eq!(
            mgr.classify(&on_road(55.0, 1, 2, 55.0), &wildcard, TravelDirection::Forward),
            PointStatus::Passed
        );
    }

    #[test]
    fn test_classify_off_road_recede() {
        let mut mgr = PathMgr::new(PassParams {
            recede_margin_m: 1.0,
            ..PassParams::default()
        });

        // Target on another road, 2 m to the side of the vehicle's track
        let target = PathPoint {
            road_id: Some(9),
            lane_id: -1,
            ..PathPoint::new(10.0, 2.0, 0.0)
        };
        let mut vehicle = VehicleState::new(0.0, 0.0, 0.0, 10.0);

        assert_eq!(
            mgr.classify(&vehicle, &target, TravelDirection::Forward),
            PointStatus::NotReached
        );

        // Abeam, 2 m closest approach
        vehicle.x_m = 10.0;
        assert_eq!(
            mgr.classify(&vehicle, &target, TravelDirection::Forward),
            PointStatus::NotReached
        );

        // Moving away, more than 3 m from the point but not yet far enough to count as behind
        vehicle.x_m = 13.0;
        assert_eq!(
            mgr.classify(&vehicle, &target, TravelDirection::Forward),
            PointStatus::Passed
        );
    }

    #[test]
    fn test_closest_approach_reset_on_new_path() {
        let mut mgr = PathMgr::new(PassParams {
            recede_margin_m: 1.0,
            ..PassParams::default()
        });

        let target = PathPoint {
            road_id: Some(9),
            lane_id: -1,
            ..PathPoint::new(10.0, 2.0, 0.0)
        };

        // Closest approach of 2 m recorded against the old path
        let mut vehicle = VehicleState::new(10.0, 0.0, 0.0, 10.0);
        assert_eq!(
            mgr.classify(&vehicle, &target, TravelDirection::Forward),
            PointStatus::NotReached
        );
        assert_eq!(mgr.min_dists.len(), 1);

        // A new path ending at the same place starts from a clean slate
        mgr.set_calculated(line(20, 0.0));
        assert!(mgr.min_dists.is_empty());

        vehicle.x_m = 13.0;
        assert_eq!(
            mgr.classify(&vehicle, &target, TravelDirection::Forward),
            PointStatus::NotReached
        );
    }

    #[test]
    fn test_classify_off_road_behind_and_reached() {
        let mut mgr = PathMgr::new(PassParams::default());

        let target = PathPoint {
            lane_id: -1,
            ..PathPoint::new(0.0, 0.0, 0.0)
        };

        // Never approached, but 20 m behind
        let behind = VehicleState::new(20.0, 0.0, 0.0, 10.0);
        assert_eq!(
            mgr.classify(&behind, &target, TravelDirection::Forward),
            PointStatus::Passed
        );

        // Reached, with and without the right lane
        let mut mgr = PathMgr::new(PassParams::default());
        let mut close = VehicleState::new(-1.0, 0.0, 0.0, 10.0);
        assert_eq!(
            mgr.classify(&close, &target, TravelDirection::Forward),
            PointStatus::Missed
        );
        close.road = Some(RoadFrame {
            road_id: 2,
            lane_id: -1,
            s_m: 0.0,
            lane_offset_m: 0.0,
            heading_relative_rad: 0.0,
        });
        assert_eq!(
            mgr.classify(&close, &target, TravelDirection::Forward),
            PointStatus::Passed
        );
    }
}
