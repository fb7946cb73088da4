//! Workspace façade crate.
//!
//! Host applications (the storefront shell, the media showcase pages) depend
//! on `showcase-workspace` and enable the documented features instead of
//! wiring each crate individually:
//!
//! - `service` (default): the playback provider and the session core.
//! - `catalog`: CMS album/track shapes and their normalisation.
//! - `full`: everything above.

#[cfg(feature = "service")]
pub use core_playback as playback;
#[cfg(feature = "service")]
pub use core_service as service;

#[cfg(feature = "catalog")]
pub use core_library as catalog;
