//! # Path and vehicle state
//!
//! A path is a plain sequence of [`PathPoint`]s, consecutive points are joined by straight
//! segments. Paths are never edited in place, a replan replaces the whole sequence.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use nalgebra::Vector2;
use serde::Serialize;

use comms_if::drive::{EgoFrame, WirePathPoint, UNKNOWN_ROAD_ID};

use crate::road::{LaneId, RoadId, RoadPosition, RoadQueryService, WorldPose};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single point of a path.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct PathPoint {
    pub x_m: f64,
    pub y_m: f64,
    pub heading_rad: f64,

    /// Road the point lies on, `None` if unknown
    pub road_id: Option<RoadId>,

    /// Lane of the point, 0 if unknown (matches any lane)
    pub lane_id: LaneId,

    pub s_m: f64,
    pub lane_offset_m: f64,
}

/// The vehicle's road frame coordinates, filled in by [`VehicleState::enrich`].
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct RoadFrame {
    pub road_id: RoadId,
    pub lane_id: LaneId,
    pub s_m: f64,
    pub lane_offset_m: f64,
    pub heading_relative_rad: f64,
}

/// The vehicle's state for one control cycle.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct VehicleState {
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
    pub heading_rad: f64,
    pub speed_ms: f64,

    /// Road coordinates, `None` if not enriched or not on a road
    pub road: Option<RoadFrame>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PathPoint {
    /// A point known only by its world pose.
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            x_m,
            y_m,
            heading_rad,
            road_id: None,
            lane_id: 0,
            s_m: 0.0,
            lane_offset_m: 0.0,
        }
    }

    /// A point given in road coordinates together with its world pose.
    pub fn on_road(pose: &WorldPose, road_id: RoadId, lane_id: LaneId, s_m: f64) -> Self {
        Self {
            x_m: pose.x_m,
            y_m: pose.y_m,
            heading_rad: pose.heading_rad,
            road_id: Some(road_id),
            lane_id,
            s_m,
            lane_offset_m: 0.0,
        }
    }

    /// A point built from a world pose and its road position.
    pub fn from_road_position(pose: &WorldPose, pos: &RoadPosition) -> Self {
        Self {
            x_m: pose.x_m,
            y_m: pose.y_m,
            heading_rad: pose.heading_rad,
            road_id: Some(pos.road_id),
            lane_id: pos.lane_id,
            s_m: pos.s_m,
            lane_offset_m: pos.lane_offset_m,
        }
    }

    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x_m, self.y_m)
    }

    pub fn dist_to(&self, other: &PathPoint) -> f64 {
        (other.position() - self.position()).norm()
    }

    /// Whether the point's road coordinates can be used directly.
    pub fn has_road_coords(&self) -> bool {
        self.road_id.is_some() && self.s_m >= 0.0 && self.lane_id != 0
    }
}

impl From<WirePathPoint> for PathPoint {
    fn from(p: WirePathPoint) -> Self {
        Self {
            x_m: p.x_m,
            y_m: p.y_m,
            heading_rad: p.heading_rad,
            road_id: match p.road_id {
                UNKNOWN_ROAD_ID => None,
                id => Some(id),
            },
            lane_id: p.lane_id,
            s_m: p.s_m,
            lane_offset_m: p.lane_offset_m,
        }
    }
}

impl VehicleState {
    /// A state with no road frame.
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64, speed_ms: f64) -> Self {
        Self {
            x_m,
            y_m,
            z_m: 0.0,
            heading_rad,
            speed_ms,
            road: None,
        }
    }

    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x_m, self.y_m)
    }

    pub fn dist_to(&self, point: &PathPoint) -> f64 {
        (point.position() - self.position()).norm()
    }

    /// Return a copy of this state with its road frame filled in.
    ///
    /// If the position can't be resolved the copy has no road frame, the caller continues with
    /// world coordinates only.
    pub fn enrich(&self, road: &dyn RoadQueryService) -> Self {
        let frame = match road.world_to_road(self.x_m, self.y_m, self.heading_rad, Some(self.z_m))
        {
            Ok(pos) => Some(RoadFrame {
                road_id: pos.road_id,
                lane_id: pos.lane_id,
                s_m: pos.s_m,
                lane_offset_m: pos.lane_offset_m,
                heading_relative_rad: pos.heading_relative_rad,
            }),
            Err(e) => {
                trace!("Vehicle state not enriched: {}", e);
                None
            }
        };

        Self {
            road: frame,
            ..*self
        }
    }

    /// Current lane, 0 if unknown.
    pub fn lane_id(&self) -> LaneId {
        self.road.map(|r| r.lane_id).unwrap_or(0)
    }

    /// Express the vehicle's position as a path point, using the road frame if known.
    pub fn as_path_point(&self) -> PathPoint {
        match self.road {
            Some(r) => PathPoint {
                x_m: self.x_m,
                y_m: self.y_m,
                heading_rad: self.heading_rad,
                road_id: Some(r.road_id),
                lane_id: r.lane_id,
                s_m: r.s_m,
                lane_offset_m: r.lane_offset_m,
            },
            None => PathPoint::new(self.x_m, self.y_m, self.heading_rad),
        }
    }
}

impl From<EgoFrame> for VehicleState {
    fn from(f: EgoFrame) -> Self {
        Self {
            x_m: f.x_m,
            y_m: f.y_m,
            z_m: f.z_m,
            heading_rad: f.heading_rad,
            speed_ms: f.speed_ms,
            road: None,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::road::{PolylineRoadNet, RoadNetParams, polyline_net::RoadDef};

    #[test]
    fn test_wire_point_conversion() {
        let mut wire = WirePathPoint {
            x_m: 1.0,
            y_m: 2.0,
            heading_rad: 0.5,
            road_id: UNKNOWN_ROAD_ID,
            s_m: 4.0,
            lane_id: -1,
            lane_offset_m: 0.0,
        };

        let p = PathPoint::from(wire);
        assert_eq!(p.road_id, None);
        assert!(!p.has_road_coords());

        wire.road_id = 3;
        let p = PathPoint::from(wire);
        assert_eq!(p.road_id, Some(3));
        assert!(p.has_road_coords());
    }

    #[test]
    fn test_enrich() {
        let net = PolylineRoadNet::new(RoadNetParams {
            roads: vec![RoadDef::straight(7, [0.0, 0.0], 0.0, 100.0, 3.5, 1, 1)],
            junctions: vec![],
        })
        .unwrap();

        let state = VehicleState::new(10.0, -1.0, 0.0, 5.0).enrich(&net);
        let frame = state.road.unwrap();
        assert_eq!(frame.road_id, 7);
        assert_eq!(frame.lane_id, -1);
        assert_eq!(state.lane_id(), -1);

        let off_road = VehicleState::new(10.0, 50.0, 0.0, 5.0).enrich(&net);
        assert_eq!(off_road.road, None);
        assert_eq!(off_road.lane_id(), 0);
        assert_eq!(off_road.as_path_point().road_id, None);
    }
}
