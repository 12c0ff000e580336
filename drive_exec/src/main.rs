//! Main drive controller executable entry point.
//!
//! # Architecture
//!
//! The executable runs a fixed period loop:
//!
//!     - Drain the update sockets, queueing target speed and path updates in DriveCtrl
//!     - Receive the latest ego frame
//!     - Run one DriveCtrl cycle
//!     - Send the control command, if one was produced
//!     - Sleep until the end of the cycle period
//!
//! Network errors inside the loop are logged and the cycle continues without the affected
//! input. Only initialisation errors end the execution.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use serde::Deserialize;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use comms_if::{
    drive::{codec::decode_update, codec::DriveUpdate, EgoFrame},
    net::{NetError, NetParams, UdpEndpoint},
};
use drive_lib::{
    drive_ctrl::{self, DriveCtrl, DriveOutput},
    path::{PathPoint, VehicleState},
    road::{PolylineRoadNet, RoadNetParams},
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "drive_exec", about = "Vehicle drive controller")]
struct Opts {
    /// Executable parameter file, relative to the params directory
    #[structopt(long, default_value = "drive_exec.toml")]
    exec_params: String,

    /// Drive control parameter file, relative to the params directory
    #[structopt(long, default_value = "drive_ctrl.toml")]
    ctrl_params: String,

    /// Road network file, relative to the params directory
    #[structopt(long, default_value = "road_net.toml")]
    road_net: String,

    /// Log the per-cycle output of the drive controller
    #[structopt(short, long)]
    verbose: bool,

    /// Stop after this many cycles, run forever if not given
    #[structopt(long)]
    max_cycles: Option<u64>,
}

/// Parameters of the executable itself.
#[derive(Debug, Clone, Deserialize)]
struct ExecParams {
    /// Target period of one cycle.
    ///
    /// Units: seconds
    cycle_period_s: f64,

    net: NetParams,
}

/// Sockets used by the executable.
struct Endpoints {
    ego: UdpEndpoint,
    target_speed: UdpEndpoint,
    path_update: UdpEndpoint,
    cmd: UdpEndpoint,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
enum DriveExecError {
    #[error("The cycle period must be positive and finite, found {0}")]
    InvalidCyclePeriod(f64),

    #[error("Network error: {0}")]
    Net(#[from] NetError),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("drive_exec", "sessions").wrap_err("Failed to create the session")?;

    let drive_ctrl_level = if opts.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    };
    logger_init(
        LevelFilter::Info,
        &[("drive_lib::drive_ctrl", drive_ctrl_level)],
        &session,
    )
    .wrap_err("Failed to initialise logging")?;

    info!("Drive Controller Executable\n");
    info!("Session directory: {:?}", session.session_root);
    debug!("CLI options: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let exec_params: ExecParams =
        util::params::load(&opts.exec_params).wrap_err("Could not load exec params")?;
    if !(exec_params.cycle_period_s > 0.0 && exec_params.cycle_period_s.is_finite()) {
        return Err(DriveExecError::InvalidCyclePeriod(exec_params.cycle_period_s).into());
    }

    let ctrl_params: drive_ctrl::Params =
        util::params::load(&opts.ctrl_params).wrap_err("Could not load DriveCtrl params")?;

    let road_net_params: RoadNetParams =
        util::params::load(&opts.road_net).wrap_err("Could not load the road network")?;

    info!("Parameters loaded");

    // ---- INITIALISE MODULES ----

    let road_net = PolylineRoadNet::new(road_net_params).wrap_err("Invalid road network")?;
    info!("Road network loaded with {} roads", road_net.num_roads());

    let mut drive_ctrl = DriveCtrl::init(ctrl_params, Box::new(road_net));
    info!("DriveCtrl init complete");

    // ---- INITIALISE NETWORK ----

    let mut endpoints = bind_endpoints(&exec_params.net).wrap_err("Failed to bind sockets")?;
    info!(
        "Listening for ego frames on {}, sending commands to {}\n",
        exec_params.net.ego_frame_addr, exec_params.net.control_cmd_addr
    );

    // ---- MAIN LOOP ----

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);
    let mut last_cycle_start: Option<Instant> = None;
    let mut num_cycles: u64 = 0;

    info!("Beginning main loop\n");

    loop {
        let cycle_start = Instant::now();

        // dt is zero on the first cycle, which DriveCtrl treats as no input
        let dt_s = last_cycle_start
            .map(|t| cycle_start.duration_since(t).as_secs_f64())
            .unwrap_or(0.0);
        last_cycle_start = Some(cycle_start);

        // ---- UPDATE HANDLING ----

        receive_updates(&mut endpoints.target_speed, &mut drive_ctrl);
        receive_updates(&mut endpoints.path_update, &mut drive_ctrl);

        let ego = match endpoints.ego.recv_latest_json::<EgoFrame>() {
            Ok(f) => f.map(VehicleState::from),
            Err(e) => {
                warn!("Could not receive an ego frame: {}", e);
                None
            }
        };

        // ---- CONTROL PROCESSING ----

        let output = drive_ctrl.proc(ego.as_ref(), dt_s);

        if let DriveOutput::Control(cmd) = output {
            if let Err(e) = endpoints
                .cmd
                .send_json(&cmd, exec_params.net.control_cmd_addr)
            {
                warn!("Could not send the control command: {}", e);
            }
        }

        debug!("{:?}", drive_ctrl.report());

        // ---- CYCLE MANAGEMENT ----

        num_cycles += 1;
        if opts.max_cycles.map_or(false, |m| num_cycles >= m) {
            info!("Reached the cycle limit ({})", num_cycles);
            break;
        }

        match cycle_period.checked_sub(cycle_start.elapsed()) {
            Some(d) => thread::sleep(d),
            None => warn!(
                "Cycle overran by {:.06} s",
                cycle_start.elapsed().as_secs_f64() - cycle_period.as_secs_f64()
            ),
        }
    }

    info!("End of execution");

    Ok(())
}

/// Bind all sockets the executable uses.
fn bind_endpoints(net: &NetParams) -> Result<Endpoints, DriveExecError> {
    Ok(Endpoints {
        ego: UdpEndpoint::bind(net.ego_frame_addr)?,
        target_speed: UdpEndpoint::bind(net.target_speed_addr)?,
        path_update: UdpEndpoint::bind(net.path_update_addr)?,
        cmd: UdpEndpoint::ephemeral()?,
    })
}

/// Drain an update socket, queueing every valid update in DriveCtrl.
///
/// Malformed packets are dropped, which leaves the previously received state in place.
fn receive_updates(endpoint: &mut UdpEndpoint, drive_ctrl: &mut DriveCtrl) {
    let packets = match endpoint.recv_all() {
        Ok(p) => p,
        Err(e) => {
            warn!("Could not receive updates: {}", e);
            return;
        }
    };

    for packet in packets {
        match decode_update(&packet) {
            Ok(DriveUpdate::TargetSpeed(speed_ms)) => drive_ctrl.queue_target_speed(speed_ms),
            Ok(DriveUpdate::Path {
                current_index,
                points,
            }) => {
                debug!(
                    "Received a path update of {} points at index {}",
                    points.len(),
                    current_index
                );
                drive_ctrl.queue_path_update(
                    current_index,
                    points.into_iter().map(PathPoint::from).collect(),
                );
            }
            Err(e) => warn!("Dropping malformed update: {}", e),
        }
    }
}
