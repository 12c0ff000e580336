//! # Vehicle controllers
//!
//! The low level controllers turning path and speed targets into normalised actuator demands:
//!
//! - [`PidController`]: a generic PID with clamped integral and output,
//! - [`SpeedCtrl`]: longitudinal control, splitting a PID output into throttle and brake,
//! - [`SteerCtrl`]: lateral control along a path, combining a heading term, a speed scheduled
//!   cross track term and anticipation of upcoming curves,
//! - [`LaneChange`]: the lane change manoeuvre, producing a steering offset on top of the
//!   lateral control.
//!
//! Steering is positive to the left, throttle and brake are in [0, 1].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod lane_change;
pub mod params;
pub mod pid;
pub mod speed;
pub mod steer;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use lane_change::*;
pub use params::*;
pub use pid::*;
pub use speed::*;
pub use steer::*;
