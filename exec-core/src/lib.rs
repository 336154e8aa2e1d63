#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]

//! # Engine-Exec-Core
//! Loads the run configuration, wires the instrument cache, the auto-order engine, and the
//! supervisor into one [`EngineContext`], and translates supervisor actions into engine calls.
//! The broker connection, quote feed, and transport are supplied by the caller; this crate owns
//! none of them.

pub mod config;
pub mod context;
pub mod logging;

pub use config::{ConfigError, RunConfig};
pub use context::EngineContext;
