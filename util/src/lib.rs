//! Utility library for the drive controller software

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod host;
#[macro_use]
pub mod logger;
pub mod maths;
pub mod params;
pub mod session;
pub mod time;
