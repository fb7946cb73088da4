//! # Host Bridge Traits
//!
//! Contract between the playback core and the host that actually decodes and
//! renders audio (a browser media element, an OS media player).
//!
//! ## Overview
//!
//! The core never talks to a media API directly. It opens handles through an
//! [`AudioTransport`](playback::AudioTransport) supplied by the host and
//! listens to the named [`TransportSignal`](playback::TransportSignal)s each
//! handle raises. Everything platform specific (autoplay policy, streaming,
//! native media keys) stays behind these traits.
//!
//! ## Traits
//!
//! ### Media
//! - [`AudioTransport`](playback::AudioTransport) - Opens one streaming handle per track
//! - [`TransportHandle`](playback::TransportHandle) - Transport control for a live handle
//!
//! ### Utilities
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Host
//! implementations should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Report asynchronous failures as signals rather than panicking
//! - Include the offending resource in error messages
//!
//! ## Thread Safety
//!
//! `AudioTransport` and `LoggerSink` require `Send + Sync`; handles only need
//! `Send` because the session that owns them is the single writer.
//!
//! ## Examples
//!
//! ### Implementing AudioTransport
//!
//! ```ignore
//! use bridge_traits::playback::{AudioTransport, SignalSender, StreamRequest, TransportHandle};
//! use bridge_traits::error::Result;
//!
//! pub struct HostTransport;
//!
//! impl AudioTransport for HostTransport {
//!     fn open(&self, request: StreamRequest, signals: SignalSender) -> Result<Box<dyn TransportHandle>> {
//!         // Create the native player, wire its callbacks to `signals`.
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod log;
pub mod playback;

pub use error::BridgeError;

// Re-export commonly used types
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use playback::{
    AudioTransport, HandleId, SignalSender, StreamRequest, TransportEvent, TransportHandle,
    TransportSignal,
};
