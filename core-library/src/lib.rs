//! # Catalog Module
//!
//! Album and track shapes as delivered by the CMS, and the one place they are
//! normalised into what the playback core consumes.
//!
//! ## Overview
//!
//! Albums come from two sources: tracks uploaded to the CMS asset store
//! ([`CustomTrack`]) and tracks embedded from a streaming provider
//! ([`EmbeddedTrack`]). They carry their audio locator in different fields.
//! [`AlbumTrack::normalize`] maps both to a [`PlayableTrack`] so the
//! playback core and the album cards never branch on the source type.

pub mod error;
pub mod models;

pub use error::{LibraryError, Result};
pub use models::{Album, AlbumTrack, AssetRef, CustomTrack, EmbeddedTrack, FileRef, PlayableTrack};
