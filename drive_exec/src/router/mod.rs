//! # Router
//!
//! Turns destinations into dense drivable paths. A route between two points on the same road is
//! sampled directly along the start lane. Otherwise the sequence of roads is found with an A*
//! search over the road graph (see [`graph_search`]) and each road is sampled in its direction
//! of travel.
//!
//! Sparse waypoints, such as those received from a scenario host, are stitched together segment
//! by segment with [`Router::calculate_route_from_waypoints`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod graph_search;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, trace};
use serde::Deserialize;

use crate::{
    path::PathPoint,
    road::{ContactPoint, LaneId, RoadId, RoadQueryError, RoadQueryService, WorldPose},
};

use graph_search::{RoadLeg, SearchStart};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance used when checking whether a stitched route already ends at its last waypoint.
const SAME_POINT_DIST_M: f64 = 1e-3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Router {
    params: RouterParams,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct RouterParams {
    /// Maximum number of nodes popped by the road graph search
    pub max_expansions: usize,

    /// A route from the vehicle to the first sparse waypoint is only added beyond this distance
    pub lead_in_min_dist_m: f64,

    /// A waypoint inside a junction may be skipped if the direct route passes this close to it
    pub junction_skip_max_dist_m: f64,

    /// Smallest accepted point spacing, which bounds the number of samples per road
    pub min_spacing_m: f64,
}

/// An endpoint resolved onto the road network.
#[derive(Debug, Copy, Clone)]
struct Anchor {
    road_id: RoadId,
    lane_id: LaneId,
    s_m: f64,
    point: PathPoint,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("The start of the route is not on a road: {0}")]
    StartNotOnRoad(RoadQueryError),

    #[error("The target of the route is not on a road: {0}")]
    TargetNotOnRoad(RoadQueryError),

    #[error("Point spacing must be finite and at least {min}, got {spacing}")]
    InvalidSpacing { spacing: f64, min: f64 },

    #[error("No road path from road {from} to road {to} within {expansions} expansions")]
    NoRoadPath {
        from: RoadId,
        to: RoadId,
        expansions: usize,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Router {
    pub fn new(params: RouterParams) -> Self {
        Self { params }
    }

    /// Calculate a path from `start` to `target` with points roughly `spacing_m` apart.
    ///
    /// The returned path always ends with the target itself.
    pub fn calculate_path(
        &self,
        road: &dyn RoadQueryService,
        start: &PathPoint,
        target: &PathPoint,
        spacing_m: f64,
    ) -> Result<Vec<PathPoint>, RouterError> {
        if !spacing_m.is_finite() || !(spacing_m >= self.params.min_spacing_m) {
            return Err(RouterError::InvalidSpacing {
                spacing: spacing_m,
                min: self.params.min_spacing_m,
            });
        }

        let start = resolve(road, start).map_err(RouterError::StartNotOnRoad)?;
        let target = resolve(road, target).map_err(RouterError::TargetNotOnRoad)?;

        if start.road_id == target.road_id {
            let mut path = Vec::new();
            sample_lane(
                road,
                &mut path,
                start.road_id,
                start.lane_id,
                start.s_m,
                target.s_m,
                spacing_m,
            );
            path.push(target.point);

            trace!(
                "Same road route on road {} with {} points",
                start.road_id,
                path.len()
            );
            return Ok(path);
        }

        let legs = graph_search::find_road_path(
            road,
            SearchStart {
                road_id: start.road_id,
                lane_id: start.lane_id,
                direct_dist_m: start.point.dist_to(&target.point),
            },
            target.road_id,
            self.params.max_expansions,
        )?;

        let path = densify_legs(road, &legs, &start, &target, spacing_m);

        debug!(
            "Route from road {} to road {} over {} roads with {} points",
            start.road_id,
            target.road_id,
            legs.len(),
            path.len()
        );

        Ok(path)
    }

    /// Build a dense route through a list of sparse waypoints, starting from the vehicle's
    /// current position.
    ///
    /// Segments which can't be routed degrade to the sparse waypoint itself, so the result is
    /// never empty unless `sparse` is.
    pub fn calculate_route_from_waypoints(
        &self,
        road: &dyn RoadQueryService,
        current: &PathPoint,
        sparse: &[PathPoint],
        step_m: f64,
    ) -> Vec<PathPoint> {
        let n = sparse.len();
        if n == 0 {
            return Vec::new();
        }

        let mut dense = Vec::new();

        // Lead in from the vehicle if the first waypoint isn't right in front of it
        if current.dist_to(&sparse[0]) > self.params.lead_in_min_dist_m {
            match self.calculate_path(road, current, &sparse[0], step_m) {
                Ok(mut segment) => {
                    segment.pop();
                    dense.extend(segment);
                }
                Err(e) => debug!("No lead in route to the first waypoint: {}", e),
            }
        }

        let mut i = 0;
        while i + 1 < n {
            if i + 2 < n {
                if let Some(segment) = self.skip_junction_waypoint(road, sparse, i, step_m) {
                    dense.extend(segment);
                    i += 2;
                    continue;
                }
            }

            match self.calculate_path(road, &sparse[i], &sparse[i + 1], step_m) {
                Ok(mut segment) => {
                    if i + 2 < n {
                        segment.pop();
                    }
                    dense.extend(segment);
                }
                Err(e) => {
                    debug!("Waypoint {} to {} not routed: {}", i, i + 1, e);
                    dense.push(sparse[i]);
                }
            }

            i += 1;
        }

        let last = sparse[n - 1];
        let closed = dense.last().map_or(false, |p| same_point(p, &last));
        if !dense.is_empty() && !closed {
            dense.push(last);
        }

        if dense.is_empty() {
            sparse.to_vec()
        } else {
            dense
        }
    }

    /// Try to route directly from waypoint `i` to waypoint `i + 2` when waypoint `i + 1` lies in
    /// a junction, which avoids picking the wrong connecting road for a waypoint placed at the
    /// junction's edge.
    fn skip_junction_waypoint(
        &self,
        road: &dyn RoadQueryService,
        sparse: &[PathPoint],
        i: usize,
        step_m: f64,
    ) -> Option<Vec<PathPoint>> {
        let via = &sparse[i + 1];
        if !road
            .is_in_junction(via.x_m, via.y_m, via.heading_rad)
            .unwrap_or(false)
        {
            return None;
        }

        let mut segment = match self.calculate_path(road, &sparse[i], &sparse[i + 2], step_m) {
            Ok(s) => s,
            Err(e) => {
                debug!("Direct route across junction at waypoint {} failed: {}", i + 1, e);
                return None;
            }
        };

        let min_dist_m = segment
            .iter()
            .map(|p| p.dist_to(via))
            .fold(std::f64::INFINITY, f64::min);

        if min_dist_m >= self.params.junction_skip_max_dist_m {
            debug!(
                "Direct route passes {:.1} m from junction waypoint {}, not skipping",
                min_dist_m,
                i + 1
            );
            return None;
        }

        debug!(
            "Skipped junction waypoint {} (direct route passes {:.1} m away)",
            i + 1,
            min_dist_m
        );

        if i + 3 < sparse.len() {
            segment.pop();
        }
        Some(segment)
    }
}

impl Default for RouterParams {
    fn default() -> Self {
        Self {
            max_expansions: 1000,
            lead_in_min_dist_m: 5.0,
            junction_skip_max_dist_m: 2.0,
            min_spacing_m: 0.1,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Resolve a point onto the road network.
///
/// Points that already carry road coordinates are placed at the centre of their lane, otherwise
/// the world position is converted.
fn resolve(road: &dyn RoadQueryService, point: &PathPoint) -> Result<Anchor, RoadQueryError> {
    if let (true, Some(road_id)) = (point.has_road_coords(), point.road_id) {
        match road.road_to_world(road_id, point.lane_id, point.s_m) {
            Ok(pose) => {
                return Ok(Anchor {
                    road_id,
                    lane_id: point.lane_id,
                    s_m: point.s_m,
                    point: PathPoint::on_road(&pose, road_id, point.lane_id, point.s_m),
                })
            }
            Err(e) => trace!("Road coordinates of point rejected, using world position: {}", e),
        }
    }

    let pos = road.world_to_road(point.x_m, point.y_m, point.heading_rad, None)?;
    let pose = WorldPose {
        x_m: point.x_m,
        y_m: point.y_m,
        z_m: 0.0,
        heading_rad: point.heading_rad,
    };

    Ok(Anchor {
        road_id: pos.road_id,
        lane_id: pos.lane_id,
        s_m: pos.s_m,
        point: PathPoint::from_road_position(&pose, &pos),
    })
}

/// Whether two points denote the same place, either by position or by road coordinates.
fn same_point(a: &PathPoint, b: &PathPoint) -> bool {
    if a.dist_to(b) < SAME_POINT_DIST_M {
        return true;
    }

    a.has_road_coords()
        && b.has_road_coords()
        && a.road_id == b.road_id
        && a.lane_id == b.lane_id
        && (a.s_m - b.s_m).abs() < SAME_POINT_DIST_M
}

/// Sample a lane from `from_s_m` towards `to_s_m`, excluding `to_s_m` itself. Samples the road
/// can't place are left out.
fn sample_lane(
    road: &dyn RoadQueryService,
    path: &mut Vec<PathPoint>,
    road_id: RoadId,
    lane_id: LaneId,
    from_s_m: f64,
    to_s_m: f64,
    spacing_m: f64,
) {
    let span_m = to_s_m - from_s_m;
    let dir = span_m.signum();
    let num_samples = (span_m.abs() / spacing_m).ceil() as usize;

    for k in 0..num_samples {
        let s_m = from_s_m + dir * spacing_m * k as f64;
        match road.road_to_world(road_id, lane_id, s_m) {
            Ok(pose) => path.push(PathPoint::on_road(&pose, road_id, lane_id, s_m)),
            Err(e) => trace!("Sample at s = {:.2} skipped: {}", s_m, e),
        }
    }
}

/// Sample each road of a multi-road route in its direction of travel, then append the target.
///
/// A road whose length can't be queried contributes no samples.
fn densify_legs(
    road: &dyn RoadQueryService,
    legs: &[RoadLeg],
    start: &Anchor,
    target: &Anchor,
    spacing_m: f64,
) -> Vec<PathPoint> {
    let mut path = Vec::new();
    let last = legs.len().saturating_sub(1);

    for (i, leg) in legs.iter().enumerate() {
        let length_m = match road.road_length(leg.road_id) {
            Ok(l) => l,
            Err(e) => {
                trace!("Road {} left out of the route: {}", leg.road_id, e);
                continue;
            }
        };

        let (from_s_m, to_s_m) = if i == 0 {
            // Leave the first road through the end the next road was reached from
            let exit = legs.get(1).and_then(|l| l.via).unwrap_or(ContactPoint::End);
            (start.s_m, exit.s_on(length_m))
        } else {
            let entry = leg.entry.unwrap_or(ContactPoint::Start);
            let from_s_m = entry.s_on(length_m);
            if i == last {
                (from_s_m, target.s_m)
            } else {
                let exit = match entry {
                    ContactPoint::Start => ContactPoint::End,
                    ContactPoint::End => ContactPoint::Start,
                };
                (from_s_m, exit.s_on(length_m))
            }
        };

        sample_lane(
            road,
            &mut path,
            leg.road_id,
            leg.lane_id,
            from_s_m,
            to_s_m,
            spacing_m,
        );
    }

    path.push(target.point);
    path
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
