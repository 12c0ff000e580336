//! # Road query module
//!
//! The drive controller doesn't evaluate road geometry itself. Everything it needs to know about
//! the road network (conversions between world and road coordinates, lane sampling and road
//! connectivity) is asked of a [`RoadQueryService`]. Queries are stateless, the service is
//! borrowed for the duration of a single call and no handles are held between cycles.
//!
//! Road coordinates follow the usual reference line convention: `s` is the distance along the
//! road's reference line, lanes to the right of the line have negative IDs and lanes to the left
//! positive IDs. Lane 0 is the reference line itself and is used to mean "unknown lane".

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod polyline_net;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

pub use polyline_net::{PolylineRoadNet, RoadNetParams};

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// Identifier of a road within the network.
pub type RoadId = u32;

/// Identifier of a junction within the network.
pub type JunctionId = u32;

/// Signed lane identifier, negative to the right of the reference line.
pub type LaneId = i32;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A position expressed in road coordinates.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct RoadPosition {
    pub road_id: RoadId,
    pub lane_id: LaneId,

    /// Distance along the road's reference line
    pub s_m: f64,

    /// Lateral offset from the centre of the lane, positive to the left
    pub lane_offset_m: f64,

    /// Heading relative to the road's reference line
    pub heading_relative_rad: f64,
}

/// A pose in the world frame.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct WorldPose {
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
    pub heading_rad: f64,
}

/// The element at one end of a road.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RoadLink {
    pub element_id: u32,
    pub element_type: ElementType,

    /// Where on the linked road this road connects. Only meaningful for road elements.
    pub contact_point: ContactPoint,
}

/// A road leading out of a junction for a given incoming road.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct JunctionConnection {
    pub connecting_road_id: RoadId,
    pub contact_point: ContactPoint,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Road,
    Junction,
}

/// End of a road at which another element connects.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactPoint {
    /// The `s = 0` end
    Start,

    /// The `s = length` end
    End,
}

/// Errors returned by road queries.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum RoadQueryError {
    #[error("Position ({0:.2}, {1:.2}) is not on any road")]
    NotOnRoad(f64, f64),

    #[error("Road {0} does not exist")]
    UnknownRoad(RoadId),

    #[error("Junction {0} does not exist")]
    UnknownJunction(JunctionId),

    #[error("Lane {1} does not exist on road {0}")]
    InvalidLane(RoadId, LaneId),

    #[error("s = {1:.2} m is outside road {0}")]
    SOutOfRange(RoadId, f64),
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Queries against the road network used by the router and the controllers.
///
/// Implementations must not panic, failures are reported as [`RoadQueryError`].
pub trait RoadQueryService {
    /// Convert a world pose into road coordinates.
    fn world_to_road(
        &self,
        x_m: f64,
        y_m: f64,
        heading_rad: f64,
        z_m: Option<f64>,
    ) -> Result<RoadPosition, RoadQueryError>;

    /// Get the world pose at the centre of a lane. The returned heading is the direction of
    /// travel in the lane.
    fn road_to_world(
        &self,
        road_id: RoadId,
        lane_id: LaneId,
        s_m: f64,
    ) -> Result<WorldPose, RoadQueryError>;

    /// Get the pose at the centre of the current lane `lookahead_m` ahead of the given pose.
    fn lane_ahead(
        &self,
        x_m: f64,
        y_m: f64,
        heading_rad: f64,
        lookahead_m: f64,
    ) -> Result<WorldPose, RoadQueryError>;

    /// Length of a road's reference line.
    fn road_length(&self, road_id: RoadId) -> Result<f64, RoadQueryError>;

    /// The element connected to the `s = length` end of the road, if any.
    fn successor(&self, road_id: RoadId) -> Result<Option<RoadLink>, RoadQueryError>;

    /// The element connected to the `s = 0` end of the road, if any.
    fn predecessor(&self, road_id: RoadId) -> Result<Option<RoadLink>, RoadQueryError>;

    /// All roads through a junction that can be entered from the given incoming road.
    fn junction_connections(
        &self,
        junction_id: JunctionId,
        incoming_road_id: RoadId,
    ) -> Result<Vec<JunctionConnection>, RoadQueryError>;

    /// Whether the given pose lies on a road which is part of a junction.
    fn is_in_junction(&self, x_m: f64, y_m: f64, heading_rad: f64)
        -> Result<bool, RoadQueryError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RoadLink {
    /// A link to another road, touching it at the given end.
    pub fn road(road_id: RoadId, contact_point: ContactPoint) -> Self {
        Self {
            element_id: road_id,
            element_type: ElementType::Road,
            contact_point,
        }
    }

    /// A link into a junction.
    pub fn junction(junction_id: JunctionId) -> Self {
        Self {
            element_id: junction_id,
            element_type: ElementType::Junction,
            contact_point: ContactPoint::Start,
        }
    }
}

impl ContactPoint {
    /// The `s` value of this end of a road of the given length.
    pub fn s_on(self, length_m: f64) -> f64 {
        match self {
            ContactPoint::Start => 0.0,
            ContactPoint::End => length_m,
        }
    }
}
