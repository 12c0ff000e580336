//! # Communications interface crate.
//!
//! Provides the messages exchanged between the drive executable and the simulator or vehicle
//! bridge, along with the network endpoints used to carry them.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Drive messages (ego frames, path and speed updates, control commands)
pub mod drive;

/// Network module
pub mod net;
