//! Sketch - configuration hub for an asynchronous image loading pipeline.
//!
//! The hub owns the swappable pipeline strategies (caches, decoder,
//! downloader, executor, displayer, processors, calculators, factories),
//! the request policy flags, the network-aware download pause, and the
//! channel that delivers request completions to one designated thread.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the hub and its slots.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing default strategies and adapters.
pub mod infrastructure;

/// Current version of the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = "sketch";
