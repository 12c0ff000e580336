//! Parameters structure for DriveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::{
    ctrl::{SpeedCtrlParams, SteerCtrlParams},
    path_mgr::PassParams,
    router::RouterParams,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for drive control.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Params {
    pub speed: SpeedCtrlParams,
    pub steer: SteerCtrlParams,
    pub pass: PassParams,
    pub router: RouterParams,

    // ---- ROUTING ----

    /// Spacing of the points of a route calculated towards a target.
    ///
    /// Units: meters
    pub target_route_spacing_m: f64,

    /// Spacing of the points of a route built from sparse waypoints.
    ///
    /// Units: meters
    pub densify_step_m: f64,

    /// A calculated route longer than this is considered dense, and isn't replaced by path
    /// updates.
    pub dense_route_min_points: usize,

    /// An external path shorter than this is considered sparse and densified.
    pub sparse_path_max_points: usize,

    /// Number of points of a densified path update searched for the vehicle's position.
    pub update_snap_window: usize,

    /// Number of points of a densified external path searched for the vehicle's position.
    pub sparse_snap_window: usize,

    // ---- SAFETY ----

    /// Brake demand sent when the control output can't be computed.
    pub safe_brake: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            speed: SpeedCtrlParams::default(),
            steer: SteerCtrlParams::default(),
            pass: PassParams::default(),
            router: RouterParams::default(),
            target_route_spacing_m: 20.0,
            densify_step_m: 1.0,
            dense_route_min_points: 50,
            sparse_path_max_points: 10,
            update_snap_window: 100,
            sparse_snap_window: 50,
            safe_brake: 0.5,
        }
    }
}
