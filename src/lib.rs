//! KF2 Warden - Killing Floor 2 fleet controller
//!
//! Logs into the WebAdmin console of each configured server on a fixed
//! interval, reads the player count and current map, and either rotates an
//! idle server back to its desired map or shuts it down when the idle policy
//! says so.

/// Fleet configuration (YAML)
pub mod config;
/// WebAdmin console operations and page scraping
pub mod console;
/// Per-tick fleet checks
pub mod fleet;
/// Per-server active/inactive lifecycle
pub mod lifecycle;
/// Idle map-change and shutdown decisions
pub mod policy;
/// Interval loop driving the fleet controller
pub mod scheduler;
/// Per-server HTTP sessions and cookie jars
pub mod session;
