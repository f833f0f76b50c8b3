//! Front end for the jsbind binding engine.
//!
//! A unit's contents are a JSON description of a JavaScript unit: package,
//! imports, type declarations with fields and methods, top-level functions and
//! statements. The front end converts that description into a
//! [`jsbind_ast::SyntaxTree`].
//!
//! - **Full parse** converts everything.
//! - **Diet parse** skips function bodies, keeping them as deferred raw JSON
//!   until [`Frontend::parse_bodies`] materializes them.
//!
//! Parsing is tolerant: an unreadable unit becomes an empty tree flagged
//! `MALFORMED`, so one broken unit never fails a batch.

pub mod model;
pub use model::UnitModel;

mod convert;

pub mod frontend;
pub use frontend::{DeferredBody, Frontend, JsonFrontend, ParseError, ParseMode, ParsedUnit};
