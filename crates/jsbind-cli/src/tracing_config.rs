//! Tracing setup for the `jsbind` binary.
//!
//! `JSBIND_LOG_FORMAT` picks the output format:
//!
//! - `text` (default): flat `tracing-subscriber` lines
//! - `tree`: indented spans via `tracing-tree`, one level per pass and unit
//! - `json`: one JSON object per event
//!
//! ```bash
//! # Follow one pass unit by unit
//! JSBIND_LOG=debug JSBIND_LOG_FORMAT=tree jsbind resolve Shapes.js Canvas.js
//!
//! # Only the driver, machine-readable
//! JSBIND_LOG="jsbind_driver=trace" JSBIND_LOG_FORMAT=json jsbind resolve Shapes.js
//! ```
//!
//! Nothing is installed unless `JSBIND_LOG` (or `RUST_LOG`) is set.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Tree,
    Json,
}

impl LogFormat {
    /// Format for a `JSBIND_LOG_FORMAT` value; unknown values mean text.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "tree" => Self::Tree,
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    fn from_env() -> Self {
        Self::from_name(&std::env::var("JSBIND_LOG_FORMAT").unwrap_or_default())
    }
}

/// `JSBIND_LOG` wins over `RUST_LOG`; both use the `RUST_LOG` syntax.
fn build_filter() -> EnvFilter {
    match std::env::var("JSBIND_LOG") {
        Ok(directives) => EnvFilter::builder().parse_lossy(directives),
        Err(_) => EnvFilter::from_default_env(),
    }
}

/// Install the global subscriber. Output goes to stderr so stdout only ever
/// carries resolution results.
pub fn init_tracing() {
    if std::env::var_os("JSBIND_LOG").is_none() && std::env::var_os("RUST_LOG").is_none() {
        return;
    }

    let filter = build_filter();
    match LogFormat::from_env() {
        LogFormat::Tree => {
            let tree_layer = tracing_tree::HierarchicalLayer::default()
                .with_writer(std::io::stderr)
                .with_indent_amount(2)
                .with_indent_lines(true)
                .with_deferred_spans(true)
                .with_targets(true);
            Registry::default().with(filter).with(tree_layer).init();
        }
        LogFormat::Json => {
            let json_layer = fmt::layer().json().with_writer(std::io::stderr);
            Registry::default().with(filter).with(json_layer).init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
