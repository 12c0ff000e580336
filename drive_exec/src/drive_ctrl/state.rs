//! Implementations for the DriveCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use serde::Serialize;
use util::maths::clamp_to;

// Internal
use super::{DriveOutput, Params};
use crate::{
    ctrl::{LaneChangeState, PedalDems, SpeedCtrl, SteerCtrl, SteerMode, SteerReport},
    path::{PathPoint, VehicleState},
    path_mgr::{PathMgr, PathSource, PointStatus, TravelDirection},
    road::{LaneId, RoadQueryService},
    router::Router,
};
use comms_if::drive::ControlCmd;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of cycles between periodic debug summaries.
const DEBUG_PERIOD_CYCLES: u64 = 50;

/// Target speed changes smaller than this aren't logged.
const SPEED_CHANGE_LOG_THRESHOLD_MS: f64 = 0.1;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive control module state
pub struct DriveCtrl {
    params: Params,

    road: Box<dyn RoadQueryService>,
    router: Router,
    path_mgr: PathMgr,

    steer: SteerCtrl,
    speed: SpeedCtrl,

    /// The vehicle's position in the last cycle an ego state was received
    last_position: Option<PathPoint>,

    pending_target: Option<PathPoint>,
    pending_path: Option<PathUpdate>,
    pending_speed: Option<f64>,

    /// Set once the missing route has been reported, cleared when a route is provided
    no_route_warned: bool,

    /// Set once the end of the active path has been passed or missed
    end_reached: bool,

    num_cycles: u64,
    report: StatusReport,
}

/// A path received from the scenario host.
#[derive(Debug, Clone)]
pub struct PathUpdate {
    /// Index of the first point the vehicle hasn't yet passed
    pub current_index: usize,

    pub points: Vec<PathPoint>,
}

/// Status report for DriveCtrl processing.
#[derive(Debug, Default, Clone, Serialize)]
pub struct StatusReport {
    pub cycle: u64,

    pub source: Option<PathSource>,
    pub path_len: usize,
    pub current_index: usize,

    /// True if a new path was installed this cycle
    pub route_installed: bool,

    pub steer: SteerReport,
    pub lane_changing: bool,
    pub pedals: PedalDems,

    /// Progress towards the last point of the active path
    pub end_status: Option<PointStatus>,

    /// True if the demands were replaced by the safe stop command
    pub safe_stop: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveCtrl {
    /// Initialise the DriveCtrl module with its parameters and the road network to drive on.
    pub fn init(params: Params, road: Box<dyn RoadQueryService>) -> Self {
        Self {
            router: Router::new(params.router.clone()),
            path_mgr: PathMgr::new(params.pass.clone()),
            steer: SteerCtrl::new(&params.steer),
            speed: SpeedCtrl::new(&params.speed),
            params,
            road,
            last_position: None,
            pending_target: None,
            pending_path: None,
            pending_speed: None,
            no_route_warned: false,
            end_reached: false,
            num_cycles: 0,
            report: StatusReport::default(),
        }
    }

    /// Perform cyclic processing of drive control.
    ///
    /// `ego` is the vehicle state received this cycle, if any. Queued updates are applied even
    /// when there's no ego state, so that a path received before the first ego state isn't lost.
    pub fn proc(&mut self, ego: Option<&VehicleState>, dt_s: f64) -> DriveOutput {
        self.num_cycles += 1;
        self.report = StatusReport {
            cycle: self.num_cycles,
            ..Default::default()
        };

        if !(dt_s > 0.0) {
            return self.finish(DriveOutput::NoInput);
        }

        let vehicle = ego.map(|e| e.enrich(self.road.as_ref()));
        if let Some(ref v) = vehicle {
            self.last_position = Some(v.as_path_point());
        }

        // ---- UPDATES ----

        if let Some(speed_ms) = self.pending_speed.take() {
            self.set_target_speed(speed_ms);
        }

        if let Some(update) = self.pending_path.take() {
            self.apply_path_update(update);
        }

        let vehicle = match vehicle {
            Some(v) => v,
            None => {
                trace!("No ego state this cycle");
                return self.finish(DriveOutput::NoInput);
            }
        };

        // ---- ROUTING ----

        if let Some(target) = self.pending_target.take() {
            self.route_to_target(&target);
        }

        self.densify_sparse_path();

        if !self.path_mgr.has_path() {
            if !self.no_route_warned {
                warn!("No route available, control output suspended");
                self.no_route_warned = true;
            }
            return self.finish(DriveOutput::NoRoute);
        }

        // ---- CONTROL ----

        let (steering, steer_report) = self.steer.get(
            &vehicle,
            self.path_mgr.path(),
            dt_s,
            Some(self.road.as_ref()),
        );
        if steer_report.mode != SteerMode::Idle {
            self.path_mgr.set_current_index(steer_report.nearest_index);
        }

        let lane_change = self.steer.update_lane_change(&vehicle, dt_s);
        let pedals = self.speed.get(vehicle.speed_ms, dt_s);

        let mut cmd = ControlCmd {
            steering: clamp_to(steering + lane_change.steering_offset, (-1.0, 1.0)),
            throttle: pedals.throttle,
            brake: pedals.brake,
            indicator: lane_change.indicator,
        };

        if !cmd.is_valid() {
            warn!("Non-finite control demands ({:?}), commanding safe stop", cmd);
            self.steer.reset();
            self.speed.reset();
            cmd = ControlCmd::safe_stop(self.params.safe_brake);
            self.report.safe_stop = true;
        }

        self.update_end_status(&vehicle);

        self.report.steer = steer_report;
        self.report.lane_changing = self.steer.lane_change().state() != LaneChangeState::LaneKeep;
        self.report.pedals = pedals;

        if self.num_cycles % DEBUG_PERIOD_CYCLES == 0 {
            debug!(
                "Cycle {}: {:?} point {}/{}, steer {:.3}, throttle {:.2}, brake {:.2}, speed {:.2}/{:.2} m/s",
                self.num_cycles,
                self.path_mgr.source(),
                self.path_mgr.current_index(),
                self.path_mgr.path().len(),
                cmd.steering,
                cmd.throttle,
                cmd.brake,
                vehicle.speed_ms,
                self.speed.target_speed()
            );
        }

        self.finish(DriveOutput::Control(cmd))
    }

    /// Follow the given path in preference to any calculated or external path.
    pub fn set_user_path(&mut self, points: Vec<PathPoint>) {
        self.path_mgr.set_user(points);
        self.steer.reset_tracking(0);
        self.steer.cancel_lane_change();
        self.route_changed();
    }

    /// Drop the user path, falling back to any calculated or external path.
    pub fn clear_user_path(&mut self) {
        self.path_mgr.clear_user();
        self.steer.reset_tracking(self.path_mgr.current_index());
        self.route_changed();
    }

    /// Route to the given target on the next cycle.
    pub fn set_target(&mut self, target: PathPoint) {
        info!(
            "Target ({:.1}, {:.1}) set, route will be calculated",
            target.x_m, target.y_m
        );
        self.pending_target = Some(target);
        self.no_route_warned = false;
    }

    /// Set the target speed immediately.
    pub fn set_target_speed(&mut self, speed_ms: f64) {
        if (speed_ms - self.speed.target_speed()).abs() > SPEED_CHANGE_LOG_THRESHOLD_MS {
            debug!(
                "Target speed changed from {:.2} to {:.2} m/s",
                self.speed.target_speed(),
                speed_ms
            );
        }
        self.speed.set_target_speed(speed_ms);
    }

    /// Queue a path update to be applied on the next cycle, replacing any update already
    /// queued.
    pub fn queue_path_update(&mut self, current_index: usize, points: Vec<PathPoint>) {
        self.pending_path = Some(PathUpdate {
            current_index,
            points,
        });
    }

    /// Queue a target speed to be applied on the next cycle.
    pub fn queue_target_speed(&mut self, speed_ms: f64) {
        self.pending_speed = Some(speed_ms);
    }

    /// Begin a lane change towards the given lane.
    pub fn start_lane_change(&mut self, target_lane: LaneId) {
        self.steer.start_lane_change(target_lane);
    }

    pub fn path_mgr(&self) -> &PathMgr {
        &self.path_mgr
    }

    pub fn target_speed(&self) -> f64 {
        self.speed.target_speed()
    }

    /// The status report of the last cycle.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    /// Install a path update from the scenario host.
    ///
    /// Once the vehicle's position is known the update is densified into a calculated route,
    /// unless a dense calculated route is already being followed. Before that the raw points
    /// are used as the external path.
    fn apply_path_update(&mut self, update: PathUpdate) {
        if self.path_mgr.source() == Some(PathSource::Calculated)
            && self.path_mgr.path().len() > self.params.dense_route_min_points
        {
            trace!("Path update ignored, already following a dense route");
            return;
        }

        let pos = match self.last_position.filter(|_| !update.points.is_empty()) {
            Some(p) => p,
            None => {
                debug!(
                    "External path of {} points installed without densification",
                    update.points.len()
                );
                self.path_mgr
                    .set_external(update.points, update.current_index);
                self.route_changed();
                return;
            }
        };

        let start = update.current_index.min(update.points.len());
        let future = &update.points[start..];
        if future.is_empty() {
            return;
        }

        let dense = self.router.calculate_route_from_waypoints(
            self.road.as_ref(),
            &pos,
            future,
            self.params.densify_step_m,
        );
        if dense.is_empty() {
            return;
        }

        info!(
            "Dense route of {} points built from {} waypoints",
            dense.len(),
            future.len()
        );
        let index = closest_index(&dense, &pos, self.params.update_snap_window);
        self.install_calculated(dense, index);
    }

    fn route_to_target(&mut self, target: &PathPoint) {
        let pos = match self.last_position {
            Some(p) => p,
            None => return,
        };

        match self.router.calculate_path(
            self.road.as_ref(),
            &pos,
            target,
            self.params.target_route_spacing_m,
        ) {
            Ok(path) => {
                info!("Route to target calculated with {} points", path.len());
                self.install_calculated(path, 0);
            }
            Err(e) => warn!("Could not route to target: {}", e),
        }
    }

    /// Densify an external path which is too sparse to follow directly.
    fn densify_sparse_path(&mut self) {
        if self.path_mgr.source() != Some(PathSource::External)
            || self.path_mgr.path().len() >= self.params.sparse_path_max_points
        {
            return;
        }

        let pos = match self.last_position {
            Some(p) => p,
            None => return,
        };

        let sparse_len = self.path_mgr.path().len();
        let future = &self.path_mgr.path()[self.path_mgr.current_index()..];
        if future.is_empty() {
            return;
        }

        let dense = self.router.calculate_route_from_waypoints(
            self.road.as_ref(),
            &pos,
            future,
            self.params.densify_step_m,
        );

        if dense.len() > sparse_len {
            info!(
                "Sparse external path of {} points densified to {} points",
                sparse_len,
                dense.len()
            );
            let index = closest_index(&dense, &pos, self.params.sparse_snap_window);
            self.install_calculated(dense, index);
        }
    }

    /// Install a calculated path, starting from the given index.
    fn install_calculated(&mut self, path: Vec<PathPoint>, index: usize) {
        self.path_mgr.set_calculated(path);

        if self.path_mgr.source() == Some(PathSource::Calculated) {
            self.path_mgr.set_current_index(index);
            self.steer.reset_tracking(self.path_mgr.current_index());
            self.steer.cancel_lane_change();
        }

        self.report.route_installed = true;
        self.route_changed();
    }

    fn route_changed(&mut self) {
        self.no_route_warned = false;
        self.end_reached = false;
    }

    fn update_end_status(&mut self, vehicle: &VehicleState) {
        let path = self.path_mgr.path();
        let end = match path.last() {
            Some(p) => *p,
            None => return,
        };
        let direction = travel_direction(path);

        let status = self.path_mgr.classify(vehicle, &end, direction);
        self.report.end_status = Some(status);

        if status != PointStatus::NotReached && !self.end_reached {
            self.end_reached = true;
            match status {
                PointStatus::Missed => warn!("End of route reached in the wrong lane"),
                _ => info!("End of route reached"),
            }
        }
    }

    fn finish(&mut self, output: DriveOutput) -> DriveOutput {
        self.report.source = self.path_mgr.source();
        self.report.path_len = self.path_mgr.path().len();
        self.report.current_index = self.path_mgr.current_index();
        output
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Index of the point closest to `pos` among the first `window` points of the path.
fn closest_index(path: &[PathPoint], pos: &PathPoint, window: usize) -> usize {
    path.iter()
        .take(window)
        .enumerate()
        .fold((0, std::f64::INFINITY), |(best, best_dist), (i, p)| {
            let d = p.dist_to(pos);
            if d < best_dist {
                (i, d)
            } else {
                (best, best_dist)
            }
        })
        .0
}

/// Direction of travel along the road at the end of the path.
fn travel_direction(path: &[PathPoint]) -> TravelDirection {
    match path {
        [.., a, b] if a.road_id.is_some() && a.road_id == b.road_id && b.s_m < a.s_m => {
            TravelDirection::Backward
        }
        _ => TravelDirection::Forward,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
