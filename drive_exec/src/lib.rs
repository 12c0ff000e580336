//! # Drive controller library
//!
//! Computes steering, throttle and brake demands which keep a vehicle on a planned path through
//! a road network. The library is split into:
//!
//! - [`path`]: path points and the vehicle state,
//! - [`road`]: the road query interface the controller relies on, and an in-memory road network
//!   implementing it,
//! - [`ctrl`]: the low level controllers (PID, speed, steering and lane change),
//! - [`router`]: turns start/target positions or sparse points into dense drivable paths,
//! - [`path_mgr`]: arbitrates between path sources and tracks progress along the path,
//! - [`drive_ctrl`]: the per-cycle orchestration of all of the above.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod ctrl;
pub mod drive_ctrl;
pub mod path;
pub mod path_mgr;
pub mod road;
pub mod router;
