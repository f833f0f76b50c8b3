//! Library side of the `jsbind` binary.

pub mod args;
pub mod resolve;
pub mod tracing_config;

pub use resolve::{Record, run_resolve};
