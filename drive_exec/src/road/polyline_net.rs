//! # Polyline road network
//!
//! An in-memory road network implementing [`RoadQueryService`]. Each road's reference line is a
//! polyline, lanes are of constant width and road/junction links are given explicitly. It is
//! used by the executable when no external road engine is available, and by the tests.
//!
//! Networks are usually loaded from a parameter file:
//!
//! ```toml
//! [[roads]]
//! id = 1
//! points_m = [[0.0, 0.0], [100.0, 0.0]]
//! lane_width_m = 3.5
//! num_left_lanes = 1
//! num_right_lanes = 1
//! successor = { element_id = 2, element_type = "road", contact_point = "start" }
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::BTreeMap;

use nalgebra::Vector2;
use serde::Deserialize;
use util::maths::wrap_pi;

use super::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance used when checking positions against road extents.
const EXTENT_TOLERANCE_M: f64 = 1e-6;

/// Maximum number of road links followed by a single lane ahead query.
const MAX_LANE_AHEAD_HOPS: usize = 4;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Definition of the whole network.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RoadNetParams {
    pub roads: Vec<RoadDef>,

    #[serde(default)]
    pub junctions: Vec<JunctionDef>,
}

/// Definition of a single road.
#[derive(Deserialize, Debug, Clone)]
pub struct RoadDef {
    pub id: RoadId,

    /// Vertices of the reference line in the world frame
    pub points_m: Vec<[f64; 2]>,

    pub lane_width_m: f64,

    /// Number of lanes to the left of the reference line (positive IDs)
    pub num_left_lanes: u32,

    /// Number of lanes to the right of the reference line (negative IDs)
    pub num_right_lanes: u32,

    /// The junction this road belongs to, if it's a connecting road
    #[serde(default)]
    pub junction: Option<JunctionId>,

    #[serde(default)]
    pub predecessor: Option<RoadLink>,

    #[serde(default)]
    pub successor: Option<RoadLink>,
}

/// Definition of a junction.
#[derive(Deserialize, Debug, Clone)]
pub struct JunctionDef {
    pub id: JunctionId,
    pub connections: Vec<ConnectionDef>,
}

/// One permitted movement through a junction.
#[derive(Deserialize, Debug, Clone)]
pub struct ConnectionDef {
    pub incoming_road: RoadId,
    pub connecting_road: RoadId,

    /// The end of the connecting road which touches the incoming road
    pub contact_point: ContactPoint,
}

/// The road network.
#[derive(Debug, Clone)]
pub struct PolylineRoadNet {
    roads: BTreeMap<RoadId, Road>,
    junctions: BTreeMap<JunctionId, JunctionDef>,
}

/// A road with its precomputed reference line.
#[derive(Debug, Clone)]
struct Road {
    def: RoadDef,
    points: Vec<Vector2<f64>>,

    /// Distance along the reference line of each vertex
    vertex_s_m: Vec<f64>,

    length_m: f64,
}

/// Projection of a world point onto a road's reference line.
#[derive(Debug, Copy, Clone)]
struct Projection {
    s_m: f64,

    /// Signed lateral distance from the reference line, positive to the left
    t_m: f64,

    /// Distance to the closest point on the reference line
    dist_m: f64,

    ref_heading_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RoadNetError {
    #[error("Road {0} has a reference line of zero length")]
    DegenerateRoad(RoadId),

    #[error("Road {0} has a non-positive lane width")]
    InvalidLaneWidth(RoadId),

    #[error("Road {0} is defined more than once")]
    DuplicateRoad(RoadId),

    #[error("Junction {0} is defined more than once")]
    DuplicateJunction(JunctionId),

    #[error("Road {0} links to element {1} which does not exist")]
    DanglingLink(RoadId, u32),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PolylineRoadNet {
    /// Build the network from its definition, validating roads and links.
    pub fn new(params: RoadNetParams) -> Result<Self, RoadNetError> {
        let mut junctions = BTreeMap::new();
        for junction in params.junctions {
            if junctions.contains_key(&junction.id) {
                return Err(RoadNetError::DuplicateJunction(junction.id));
            }
            junctions.insert(junction.id, junction);
        }

        let mut roads = BTreeMap::new();
        for def in params.roads {
            if roads.contains_key(&def.id) {
                return Err(RoadNetError::DuplicateRoad(def.id));
            }
            roads.insert(def.id, Road::new(def)?);
        }

        // Every link must point at something that exists
        for road in roads.values() {
            for link in road.def.predecessor.iter().chain(road.def.successor.iter()) {
                let exists = match link.element_type {
                    ElementType::Road => roads.contains_key(&link.element_id),
                    ElementType::Junction => junctions.contains_key(&link.element_id),
                };
                if !exists {
                    return Err(RoadNetError::DanglingLink(road.def.id, link.element_id));
                }
            }
        }

        Ok(Self { roads, junctions })
    }

    /// Number of roads in the network.
    pub fn num_roads(&self) -> usize {
        self.roads.len()
    }

    fn road(&self, road_id: RoadId) -> Result<&Road, RoadQueryError> {
        self.roads
            .get(&road_id)
            .ok_or(RoadQueryError::UnknownRoad(road_id))
    }

    /// Find the road the point lies on, with its projection.
    fn locate(&self, x_m: f64, y_m: f64) -> Result<(&Road, Projection), RoadQueryError> {
        let point = Vector2::new(x_m, y_m);

        let mut best: Option<(&Road, Projection)> = None;
        for road in self.roads.values() {
            let proj = road.project(&point);
            if !road.contains(&proj) {
                continue;
            }
            let closer = best
                .as_ref()
                .map_or(true, |(_, b)| proj.dist_m < b.dist_m);
            if closer {
                best = Some((road, proj));
            }
        }

        best.ok_or(RoadQueryError::NotOnRoad(x_m, y_m))
    }
}

impl RoadQueryService for PolylineRoadNet {
    fn world_to_road(
        &self,
        x_m: f64,
        y_m: f64,
        heading_rad: f64,
        _z_m: Option<f64>,
    ) -> Result<RoadPosition, RoadQueryError> {
        let (road, proj) = self.locate(x_m, y_m)?;
        let lane_id = road.lane_at(proj.t_m);

        Ok(RoadPosition {
            road_id: road.def.id,
            lane_id,
            s_m: proj.s_m,
            lane_offset_m: proj.t_m - road.lane_centre_t(lane_id),
            heading_relative_rad: wrap_pi(heading_rad - proj.ref_heading_rad),
        })
    }

    fn road_to_world(
        &self,
        road_id: RoadId,
        lane_id: LaneId,
        s_m: f64,
    ) -> Result<WorldPose, RoadQueryError> {
        let road = self.road(road_id)?;

        if !road.has_lane(lane_id) {
            return Err(RoadQueryError::InvalidLane(road_id, lane_id));
        }
        if s_m < -EXTENT_TOLERANCE_M || s_m > road.length_m + EXTENT_TOLERANCE_M || !s_m.is_finite()
        {
            return Err(RoadQueryError::SOutOfRange(road_id, s_m));
        }

        let (ref_point, ref_heading) = road.pose_at(s_m);
        let left = Vector2::new(-ref_heading.sin(), ref_heading.cos());
        let point = ref_point + left * road.lane_centre_t(lane_id);

        // Traffic drives on the right, so left lanes run against the reference line
        let heading_rad = if lane_id < 0 {
            ref_heading
        } else {
            wrap_pi(ref_heading + std::f64::consts::PI)
        };

        Ok(WorldPose {
            x_m: point[0],
            y_m: point[1],
            z_m: 0.0,
            heading_rad,
        })
    }

    fn lane_ahead(
        &self,
        x_m: f64,
        y_m: f64,
        heading_rad: f64,
        lookahead_m: f64,
    ) -> Result<WorldPose, RoadQueryError> {
        let pos = self.world_to_road(x_m, y_m, heading_rad, None)?;

        let mut road = self.road(pos.road_id)?;
        let mut lane_id = pos.lane_id;
        let mut forward = pos.heading_relative_rad.abs() <= std::f64::consts::FRAC_PI_2;
        let mut s_m = pos.s_m;
        let mut remaining_m = lookahead_m.max(0.0);

        for _ in 0..MAX_LANE_AHEAD_HOPS {
            let to_end_m = if forward { road.length_m - s_m } else { s_m };
            if remaining_m <= to_end_m {
                s_m += if forward { remaining_m } else { -remaining_m };
                return self.road_to_world(road.def.id, lane_id, s_m);
            }

            // Continue onto the next road if it is linked directly and carries the lane
            let link = if forward {
                road.def.successor
            } else {
                road.def.predecessor
            };
            let next = match link {
                Some(l) if l.element_type == ElementType::Road => l,
                _ => break,
            };
            let next_road = self.road(next.element_id)?;

            // Leaving through the end and entering at a start keeps the direction of travel
            // along s, and with it the lane's side of the reference line
            let next_forward = next.contact_point == ContactPoint::Start;
            let next_lane = if next_forward == forward {
                lane_id
            } else {
                -lane_id
            };
            if !next_road.has_lane(next_lane) {
                break;
            }

            remaining_m -= to_end_m;
            road = next_road;
            lane_id = next_lane;
            forward = next_forward;
            s_m = next.contact_point.s_on(road.length_m);
        }

        let s_end = if forward { road.length_m } else { 0.0 };
        self.road_to_world(road.def.id, lane_id, s_end)
    }

    fn road_length(&self, road_id: RoadId) -> Result<f64, RoadQueryError> {
        self.road(road_id).map(|r| r.length_m)
    }

    fn successor(&self, road_id: RoadId) -> Result<Option<RoadLink>, RoadQueryError> {
        self.road(road_id).map(|r| r.def.successor)
    }

    fn predecessor(&self, road_id: RoadId) -> Result<Option<RoadLink>, RoadQueryError> {
        self.road(road_id).map(|r| r.def.predecessor)
    }

    fn junction_connections(
        &self,
        junction_id: JunctionId,
        incoming_road_id: RoadId,
    ) -> Result<Vec<JunctionConnection>, RoadQueryError> {
        let junction = self
            .junctions
            .get(&junction_id)
            .ok_or(RoadQueryError::UnknownJunction(junction_id))?;

        Ok(junction
            .connections
            .iter()
            .filter(|c| c.incoming_road == incoming_road_id)
            .map(|c| JunctionConnection {
                connecting_road_id: c.connecting_road,
                contact_point: c.contact_point,
            })
            .collect())
    }

    fn is_in_junction(
        &self,
        x_m: f64,
        y_m: f64,
        _heading_rad: f64,
    ) -> Result<bool, RoadQueryError> {
        self.locate(x_m, y_m)
            .map(|(road, _)| road.def.junction.is_some())
    }
}

impl Road {
    fn new(def: RoadDef) -> Result<Self, RoadNetError> {
        if !(def.lane_width_m > 0.0) {
            return Err(RoadNetError::InvalidLaneWidth(def.id));
        }

        // Drop repeated vertices so every segment has a direction
        let mut points: Vec<Vector2<f64>> = Vec::with_capacity(def.points_m.len());
        for p in def.points_m.iter() {
            let v = Vector2::new(p[0], p[1]);
            match points.last() {
                Some(last) if (v - last).norm() < EXTENT_TOLERANCE_M => (),
                _ => points.push(v),
            }
        }

        if points.len() < 2 {
            return Err(RoadNetError::DegenerateRoad(def.id));
        }

        let mut vertex_s_m = Vec::with_capacity(points.len());
        let mut s = 0.0;
        vertex_s_m.push(s);
        for w in points.windows(2) {
            s += (w[1] - w[0]).norm();
            vertex_s_m.push(s);
        }

        Ok(Self {
            def,
            points,
            vertex_s_m,
            length_m: s,
        })
    }

    fn segment_heading(&self, i: usize) -> f64 {
        let d = self.points[i + 1] - self.points[i];
        d[1].atan2(d[0])
    }

    /// Reference line point and heading at the given `s`, clamped to the road.
    fn pose_at(&self, s_m: f64) -> (Vector2<f64>, f64) {
        let s_m = s_m.max(0.0).min(self.length_m);
        let last_seg = self.points.len() - 2;

        let i = self
            .vertex_s_m
            .windows(2)
            .position(|w| s_m <= w[1])
            .unwrap_or(last_seg);

        let seg_len = self.vertex_s_m[i + 1] - self.vertex_s_m[i];
        let u = (s_m - self.vertex_s_m[i]) / seg_len;

        (
            self.points[i] + (self.points[i + 1] - self.points[i]) * u,
            self.segment_heading(i),
        )
    }

    fn project(&self, point: &Vector2<f64>) -> Projection {
        let mut best = Projection {
            s_m: 0.0,
            t_m: 0.0,
            dist_m: std::f64::INFINITY,
            ref_heading_rad: 0.0,
        };

        for i in 0..self.points.len() - 1 {
            let a = self.points[i];
            let seg = self.points[i + 1] - a;
            let seg_len = self.vertex_s_m[i + 1] - self.vertex_s_m[i];
            let dir = seg / seg_len;

            let rel = point - a;
            let u = rel.dot(&dir).max(0.0).min(seg_len);
            let dist_m = (rel - dir * u).norm();

            if dist_m < best.dist_m {
                best = Projection {
                    s_m: self.vertex_s_m[i] + u,
                    t_m: dir[0] * rel[1] - dir[1] * rel[0],
                    dist_m,
                    ref_heading_rad: self.segment_heading(i),
                };
            }
        }

        best
    }

    /// Whether a projected point lies within the road's lanes.
    fn contains(&self, proj: &Projection) -> bool {
        let width = if proj.t_m >= 0.0 {
            self.def.num_left_lanes as f64 * self.def.lane_width_m
        } else {
            self.def.num_right_lanes as f64 * self.def.lane_width_m
        };

        // Beyond the ends of the reference line the distance exceeds the lateral offset
        proj.dist_m <= width + EXTENT_TOLERANCE_M
            && proj.dist_m - proj.t_m.abs() <= EXTENT_TOLERANCE_M
    }

    fn has_lane(&self, lane_id: LaneId) -> bool {
        match lane_id {
            0 => false,
            l if l > 0 => l as u32 <= self.def.num_left_lanes,
            l => l.unsigned_abs() <= self.def.num_right_lanes,
        }
    }

    /// The lane containing the given lateral offset.
    fn lane_at(&self, t_m: f64) -> LaneId {
        let w = self.def.lane_width_m;
        let left = self.def.num_left_lanes as i32;
        let right = self.def.num_right_lanes as i32;

        if t_m > 0.0 || right == 0 {
            ((t_m / w).ceil() as i32).max(1).min(left.max(1))
        } else {
            -(((-t_m) / w).ceil() as i32).max(1).min(right)
        }
    }

    /// Lateral offset of a lane's centre from the reference line.
    fn lane_centre_t(&self, lane_id: LaneId) -> f64 {
        let w = self.def.lane_width_m;
        match lane_id {
            0 => 0.0,
            l if l > 0 => (l as f64 - 0.5) * w,
            l => (l as f64 + 0.5) * w,
        }
    }
}

impl RoadDef {
    /// A straight road starting at `start_m` and running along `heading_rad`.
    pub fn straight(
        id: RoadId,
        start_m: [f64; 2],
        heading_rad: f64,
        length_m: f64,
        lane_width_m: f64,
        num_left_lanes: u32,
        num_right_lanes: u32,
    ) -> Self {
        Self {
            id,
            points_m: vec![
                start_m,
                [
                    start_m[0] + length_m * heading_rad.cos(),
                    start_m[1] + length_m * heading_rad.sin(),
                ],
            ],
            lane_width_m,
            num_left_lanes,
            num_right_lanes,
            junction: None,
            predecessor: None,
            successor: None,
        }
    }

    /// A circular arc, turning left for positive `sweep_rad`, sampled into `num_segments`.
    pub fn arc(
        id: RoadId,
        start_m: [f64; 2],
        heading_rad: f64,
        radius_m: f64,
        sweep_rad: f64,
        num_segments: usize,
        lane_width_m: f64,
    ) -> Self {
        let turn = sweep_rad.signum();
        let centre = [
            start_m[0] - turn * radius_m * heading_rad.sin(),
            start_m[1] + turn * radius_m * heading_rad.cos(),
        ];
        let start_angle = (start_m[1] - centre[1]).atan2(start_m[0] - centre[0]);
        let num_segments = num_segments.max(1);

        let points_m = (0..=num_segments)
            .map(|i| {
                let a = start_angle + sweep_rad * (i as f64) / (num_segments as f64);
                [centre[0] + radius_m * a.cos(), centre[1] + radius_m * a.sin()]
            })
            .collect();

        Self {
            id,
            points_m,
            lane_width_m,
            num_left_lanes: 1,
            num_right_lanes: 1,
            junction: None,
            predecessor: None,
            successor: None,
        }
    }

    pub fn with_predecessor(mut self, link: RoadLink) -> Self {
        self.predecessor = Some(link);
        self
    }

    pub fn with_successor(mut self, link: RoadLink) -> Self {
        self.successor = Some(link);
        self
    }

    pub fn in_junction(mut self, junction_id: JunctionId) -> Self {
        self.junction = Some(junction_id);
        self
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn two_road_net() -> PolylineRoadNet {
        PolylineRoadNet::new(RoadNetParams {
            roads: vec![
                RoadDef::straight(1, [0.0, 0.0], 0.0, 100.0, 3.5, 1, 1)
                    .with_successor(RoadLink::road(2, ContactPoint::Start)),
                RoadDef::straight(2, [100.0, 0.0], 0.0, 50.0, 3.5, 1, 1)
                    .with_predecessor(RoadLink::road(1, ContactPoint::End)),
            ],
            junctions: vec![],
        })
        .unwrap()
    }

    #[test]
    fn test_world_to_road() {
        let net = two_road_net();

        let pos = net.world_to_road(20.0, -2.0, 0.1, None).unwrap();
        assert_eq!(pos.road_id, 1);
        assert_eq!(pos.lane_id, -1);
        assert!((pos.s_m - 20.0).abs() < 1e-9);
        assert!((pos.lane_offset_m + 0.25).abs() < 1e-9);
        assert!((pos.heading_relative_rad - 0.1).abs() < 1e-9);

        let pos = net.world_to_road(120.0, 1.0, PI, None).unwrap();
        assert_eq!(pos.road_id, 2);
        assert_eq!(pos.lane_id, 1);
        assert!((pos.s_m - 20.0).abs() < 1e-9);

        assert_eq!(
            net.world_to_road(20.0, 10.0, 0.0, None),
            Err(RoadQueryError::NotOnRoad(20.0, 10.0))
        );
        assert!(net.world_to_road(-5.0, 0.0, 0.0, None).is_err());
    }

    #[test]
    fn test_road_to_world() {
        let net = two_road_net();

        let pose = net.road_to_world(1, -1, 30.0).unwrap();
        assert!((pose.x_m - 30.0).abs() < 1e-9);
        assert!((pose.y_m + 1.75).abs() < 1e-9);
        assert!(pose.heading_rad.abs() < 1e-9);

        let pose = net.road_to_world(1, 1, 30.0).unwrap();
        assert!((pose.y_m - 1.75).abs() < 1e-9);
        assert!((pose.heading_rad.abs() - PI).abs() < 1e-9);

        assert_eq!(
            net.road_to_world(1, 0, 30.0),
            Err(RoadQueryError::InvalidLane(1, 0))
        );
        assert_eq!(
            net.road_to_world(1, -2, 30.0),
            Err(RoadQueryError::InvalidLane(1, -2))
        );
        assert_eq!(
            net.road_to_world(1, -1, 101.0),
            Err(RoadQueryError::SOutOfRange(1, 101.0))
        );
        assert_eq!(
            net.road_to_world(9, -1, 0.0),
            Err(RoadQueryError::UnknownRoad(9))
        );
    }

    #[test]
    fn test_lane_ahead_follows_successor() {
        let net = two_road_net();

        let pose = net.lane_ahead(98.0, -1.75, 0.0, 5.0).unwrap();
        assert!((pose.x_m - 103.0).abs() < 1e-9);
        assert!((pose.y_m + 1.75).abs() < 1e-9);

        // Running off the end of the network clamps to the last lane point
        let pose = net.lane_ahead(148.0, -1.75, 0.0, 5.0).unwrap();
        assert!((pose.x_m - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_arc_road() {
        let net = PolylineRoadNet::new(RoadNetParams {
            roads: vec![RoadDef::arc(1, [0.0, 0.0], 0.0, 20.0, FRAC_PI_2, 90, 3.5)],
            junctions: vec![],
        })
        .unwrap();

        let length = net.road_length(1).unwrap();
        assert!((length - 20.0 * FRAC_PI_2).abs() < 0.01);

        let end = net.road_to_world(1, -1, length).unwrap();
        assert!((end.heading_rad - FRAC_PI_2).abs() < 0.02);
        assert!((end.x_m - 21.75).abs() < 0.05);
        assert!((end.y_m - 20.0).abs() < 0.05);
    }

    #[test]
    fn test_junctions() {
        let net = PolylineRoadNet::new(RoadNetParams {
            roads: vec![
                RoadDef::straight(1, [0.0, 0.0], 0.0, 50.0, 3.5, 1, 1)
                    .with_successor(RoadLink::junction(10)),
                RoadDef::straight(5, [50.0, 0.0], 0.0, 10.0, 3.5, 1, 1).in_junction(10),
                RoadDef::straight(6, [50.0, 0.0], FRAC_PI_2, 10.0, 3.5, 1, 1).in_junction(10),
            ],
            junctions: vec![JunctionDef {
                id: 10,
                connections: vec![
                    ConnectionDef {
                        incoming_road: 1,
                        connecting_road: 5,
                        contact_point: ContactPoint::Start,
                    },
                    ConnectionDef {
                        incoming_road: 1,
                        connecting_road: 6,
                        contact_point: ContactPoint::Start,
                    },
                    ConnectionDef {
                        incoming_road: 7,
                        connecting_road: 5,
                        contact_point: ContactPoint::End,
                    },
                ],
            }],
        })
        .unwrap();

        let conns = net.junction_connections(10, 1).unwrap();
        assert_eq!(conns.len(), 2);
        assert_eq!(conns[1].connecting_road_id, 6);
        assert_eq!(
            net.junction_connections(11, 1),
            Err(RoadQueryError::UnknownJunction(11))
        );

        assert!(net.is_in_junction(55.0, -1.0, 0.0).unwrap());
        assert!(!net.is_in_junction(25.0, -1.0, 0.0).unwrap());
    }

    #[test]
    fn test_invalid_networks() {
        let r = PolylineRoadNet::new(RoadNetParams {
            roads: vec![RoadDef::straight(1, [0.0, 0.0], 0.0, 0.0, 3.5, 1, 1)],
            junctions: vec![],
        });
        assert!(matches!(r, Err(RoadNetError::DegenerateRoad(1))));

        let r = PolylineRoadNet::new(RoadNetParams {
            roads: vec![RoadDef::straight(1, [0.0, 0.0], 0.0, 10.0, 3.5, 1, 1)
                .with_successor(RoadLink::road(4, ContactPoint::Start))],
            junctions: vec![],
        });
        assert!(matches!(r, Err(RoadNetError::DanglingLink(1, 4))));
    }

    #[test]
    fn test_load_from_toml() {
        let params: RoadNetParams = util::params::from_str(
            r#"
            [[roads]]
            id = 1
            points_m = [[0.0, 0.0], [100.0, 0.0]]
            lane_width_m = 3.5
            num_left_lanes = 1
            num_right_lanes = 1
            successor = { element_id = 2, element_type = "road", contact_point = "start" }

            [[roads]]
            id = 2
            points_m = [[100.0, 0.0], [200.0, 0.0]]
            lane_width_m = 3.5
            num_left_lanes = 1
            num_right_lanes = 1
            "#,
        )
        .unwrap();

        let net = PolylineRoadNet::new(params).unwrap();
        assert_eq!(net.num_roads(), 2);
        assert_eq!(
            net.successor(1).unwrap(),
            Some(RoadLink::road(2, ContactPoint::Start))
        );
    }
}
