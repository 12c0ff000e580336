//! # Drive control module
//!
//! Drive control ties the path manager, the router and the vehicle controllers together. Once
//! per control cycle it takes the latest ego state, applies any queued path and speed updates,
//! (re)routes if needed, and produces the actuator demands for following the active path.
//!
//! Nothing in here is fatal. Missing inputs, missing routes and failed road queries all degrade
//! to an explicit [`DriveOutput`] variant or to the safe stop command.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use comms_if::drive::ControlCmd;

pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of one drive control cycle.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub enum DriveOutput {
    /// Demands to send to the vehicle
    Control(ControlCmd),

    /// There is no path to follow
    NoRoute,

    /// There was no ego state or no elapsed time this cycle
    NoInput,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveOutput {
    /// The control command, if one was produced.
    pub fn cmd(&self) -> Option<&ControlCmd> {
        match self {
            DriveOutput::Control(c) => Some(c),
            _ => None,
        }
    }
}
