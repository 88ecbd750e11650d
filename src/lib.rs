//! Lazyfetch - cache-first media delivery.
//!
//! This crate resolves remote media through a persistent cache before the
//! network, shows generated placeholders while content is pending, defers
//! off-screen loads until they near the viewport, and warms the cache in batches.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing loading services and DTOs.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing cache, network and configuration adapters.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "lazyfetch";

/// Qualifier used to derive platform directories.
pub const APP_QUALIFIER: &str = "com";

/// Organization used to derive platform directories.
pub const APP_ORGANIZATION: &str = "linuxmobile";
