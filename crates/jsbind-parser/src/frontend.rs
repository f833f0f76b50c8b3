//! Parsing entry points.
//!
//! A [`Frontend`] turns unit source text into a [`SyntaxTree`]. Parsing is
//! tolerant: a unit that cannot be read yields an empty tree flagged
//! [`SyntaxFlags::MALFORMED`] instead of an error, so one broken unit never
//! stops a resolution pass.
//!
//! A diet parse keeps function signatures and defers bodies. The deferred
//! bodies travel with the [`ParsedUnit`] until [`Frontend::parse_bodies`]
//! materializes them (the analyzer does this before resolving a unit).

use crate::convert::Converter;
use crate::model::UnitModel;
use jsbind_ast::{NodeIndex, NodeKind, SyntaxFlags, SyntaxTree, TreeBuilder};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    #[default]
    Full,
    /// Signatures only; function bodies are deferred.
    Diet,
}

/// A function body skipped by a diet parse.
#[derive(Debug, Clone)]
pub struct DeferredBody {
    pub function: NodeIndex,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct ParsedUnit {
    pub tree: SyntaxTree,
    pub deferred: Vec<DeferredBody>,
}

impl ParsedUnit {
    pub fn is_diet(&self) -> bool {
        self.tree.flags.contains(SyntaxFlags::DIET)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub file_name: String,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file_name, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Source text to syntax tree.
pub trait Frontend: Send + Sync {
    /// Parse a unit. Never fails; unreadable input produces a malformed,
    /// empty tree.
    fn parse(&self, file_name: &str, contents: &str, mode: ParseMode) -> ParsedUnit;

    /// Materialize the bodies a diet parse deferred.
    fn parse_bodies(&self, unit: ParsedUnit) -> ParsedUnit;
}

/// Reads units written as JSON documents (see [`UnitModel`]).
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFrontend;

impl JsonFrontend {
    pub fn new() -> Self {
        JsonFrontend
    }

    /// Parse, reporting unreadable input as an error.
    pub fn parse_strict(
        &self,
        file_name: &str,
        contents: &str,
        mode: ParseMode,
    ) -> Result<ParsedUnit, ParseError> {
        let model: UnitModel = serde_json::from_str(contents).map_err(|err| ParseError {
            file_name: file_name.to_string(),
            message: err.to_string(),
        })?;

        let mut builder = TreeBuilder::new(file_name);
        let mut deferred = Vec::new();
        let (package, imports, types, statements) = Converter {
            builder: &mut builder,
            deferred: &mut deferred,
            mode,
        }
        .unit(&model)?;

        let mut tree = builder.finish(package, imports, types, statements);
        if !deferred.is_empty() {
            tree.flags |= SyntaxFlags::DIET;
        }
        debug!(
            file = file_name,
            nodes = tree.arena.len(),
            deferred = deferred.len(),
            "parsed unit"
        );
        Ok(ParsedUnit { tree, deferred })
    }
}

impl Frontend for JsonFrontend {
    fn parse(&self, file_name: &str, contents: &str, mode: ParseMode) -> ParsedUnit {
        match self.parse_strict(file_name, contents, mode) {
            Ok(unit) => unit,
            Err(err) => {
                warn!(error = %err, "malformed unit");
                let mut tree = SyntaxTree::empty(Arc::from(file_name));
                tree.flags |= SyntaxFlags::MALFORMED;
                ParsedUnit {
                    tree,
                    deferred: Vec::new(),
                }
            }
        }
    }

    fn parse_bodies(&self, unit: ParsedUnit) -> ParsedUnit {
        if unit.deferred.is_empty() {
            return unit;
        }
        let ParsedUnit { tree, deferred } = unit;
        let (mut builder, root, flags) = TreeBuilder::resume(tree);
        let mut ignored = Vec::new();
        for pending in deferred {
            let body = {
                let mut converter = Converter {
                    builder: &mut builder,
                    deferred: &mut ignored,
                    mode: ParseMode::Full,
                };
                match converter.body(&pending.body) {
                    Ok(body) => body,
                    Err(err) => {
                        warn!(error = %err, "skipping unreadable function body");
                        continue;
                    }
                }
            };
            attach_body(&mut builder, pending.function, body);
        }
        let tree = builder.finish_with_root(root, flags - SyntaxFlags::DIET);
        ParsedUnit {
            tree,
            deferred: Vec::new(),
        }
    }
}

fn attach_body(builder: &mut TreeBuilder, function: NodeIndex, body: NodeIndex) {
    let arena = builder.arena_mut();
    let Some(NodeKind::FunctionDeclaration {
        modifiers,
        is_constructor,
        name,
        return_type,
        parameters,
        extra_dimensions,
        doc,
        ..
    }) = arena.kind(function).cloned()
    else {
        return;
    };
    arena.replace(
        function,
        NodeKind::FunctionDeclaration {
            modifiers,
            is_constructor,
            name,
            return_type,
            parameters,
            extra_dimensions,
            doc,
            body,
        },
    );
}

#[cfg(test)]
#[path = "../tests/frontend_tests.rs"]
mod frontend_tests;
