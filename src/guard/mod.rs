//! # Guard
//!
//! The sampling/decision loop that watches one orb and fires the trigger
//! key once when it runs low.
//!
//! ## Modules
//! - [`session`]: threshold/latch decision and per-run state
//! - [`probe`]: one capture → locate → classify pass
//! - [`engine`]: start/stop controller and the background worker
//! - [`events`]: status delivery to the shell

pub mod engine;
pub mod events;
pub mod probe;
pub mod session;

pub use engine::DecisionEngine;
pub use events::{GuardEvent, RunEnd, Severity};
pub use probe::VisionProbe;
pub use session::{GuardConfig, Phase};
