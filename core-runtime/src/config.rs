//! # Core Configuration Module
//!
//! Provides configuration management for the playback core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! holding the host capabilities and runtime settings the core needs. It
//! enforces fail-fast validation so a missing transport is reported when the
//! application boots instead of on the first tap of a play button.
//!
//! ## Required Dependencies
//!
//! - `AudioTransport` - The host media API that decodes and plays streams
//!
//! ## Optional Dependencies
//!
//! - `LoggerSink` - Mirror structured logs into host logging
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .transport(Arc::new(HostTransport::new()))
//!     .event_buffer_size(256)
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // No transport: fails with an actionable message
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing transport");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{AudioTransport, LoggerSink};
use std::sync::Arc;

/// Upper bound for the event buffer; beyond this a slow subscriber costs
/// more memory than it is worth.
const MAX_EVENT_BUFFER_SIZE: usize = 65_536;

/// Core configuration for the playback core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Host media transport (required)
    pub transport: Arc<dyn AudioTransport>,

    /// Capacity of the event bus channel per subscriber
    pub event_buffer_size: usize,

    /// Optional sink mirroring logs into the host
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("transport", &self.transport.name())
            .field("event_buffer_size", &self.event_buffer_size)
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        Ok(())
    }
}

fn transport_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioTransport".to_string(),
        message: "AudioTransport implementation is required for playback. \
                 Web: inject an adapter over the page's media element. \
                 Mobile: inject the platform media player adapter. \
                 Tests: inject a scripted transport."
            .to_string(),
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    transport: Option<Arc<dyn AudioTransport>>,
    event_buffer_size: Option<usize>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
}

impl CoreConfigBuilder {
    /// Sets the host media transport.
    pub fn transport(mut self, transport: Arc<dyn AudioTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the per-subscriber event buffer size.
    ///
    /// Subscribers that fall further behind receive `RecvError::Lagged`.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the host logger sink.
    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - `CapabilityMissing` when no transport was provided
    /// - `Config` when a value is out of range
    pub fn build(self) -> Result<CoreConfig> {
        let transport = self.transport.ok_or_else(transport_missing_error)?;

        let config = CoreConfig {
            transport,
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            logger_sink: self.logger_sink,
        };

        config.validate()?;

        Ok(config)
    }
}
