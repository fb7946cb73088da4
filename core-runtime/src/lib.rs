//! # Core Runtime Module
//!
//! Runtime infrastructure shared by the playback crates:
//! - Logging and tracing setup
//! - Configuration and capability checks
//! - Event bus for playback and lifecycle events
//!
//! ## Overview
//!
//! Nothing in here knows about tracks or handles. It establishes the logging
//! conventions, the fail-fast configuration builder and the broadcast channel
//! the playback session publishes its domain events on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
