//! The `resolve` command: run one pass and print its results as JSON lines.

use crate::args::{ResolveArgs, unit_name};
use anyhow::{Context, Result};
use jsbind_binding::{Binding, BindingKind, ResolvedAst};
use jsbind_common::Modifiers;
use jsbind_driver::{AstRequestor, PassStats, ResolveRequest, StandardProject, UnitResolver};
use serde::Serialize;
use std::io::Write;
use tracing::debug;

/// One printed line.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Record {
    #[serde(rename_all = "camelCase")]
    Ast {
        file: String,
        has_bindings: bool,
        declarations: Vec<BindingRecord>,
    },
    Binding {
        key: String,
        binding: Option<BindingRecord>,
    },
    Stats(PassStats),
}

#[derive(Debug, Serialize)]
pub struct BindingRecord {
    pub kind: BindingKind,
    pub name: String,
    pub key: String,
    pub modifiers: Modifiers,
    pub recovered: bool,
}

impl From<&Binding> for BindingRecord {
    fn from(binding: &Binding) -> Self {
        BindingRecord {
            kind: binding.kind(),
            name: binding.name().to_string(),
            key: binding.key().to_string(),
            modifiers: binding.modifiers(),
            recovered: binding.is_recovered(),
        }
    }
}

/// Writes every delivered result as soon as it arrives. The first write
/// error is kept and reported once the pass is over.
struct JsonPrinter<'a> {
    out: &'a mut dyn Write,
    pretty: bool,
    error: Option<anyhow::Error>,
}

impl JsonPrinter<'_> {
    fn print(&mut self, record: &Record) {
        if self.error.is_some() {
            return;
        }
        let written = if self.pretty {
            serde_json::to_writer_pretty(&mut *self.out, record)
        } else {
            serde_json::to_writer(&mut *self.out, record)
        };
        let result = written
            .map_err(anyhow::Error::from)
            .and_then(|()| writeln!(self.out).map_err(anyhow::Error::from));
        if let Err(err) = result {
            self.error = Some(err.context("failed to write result"));
        }
    }
}

impl AstRequestor for JsonPrinter<'_> {
    fn accept_ast(&mut self, ast: ResolvedAst) {
        let declarations = ast
            .declarations()
            .iter()
            .map(|(_, binding)| BindingRecord::from(binding))
            .collect();
        self.print(&Record::Ast {
            file: ast.file_name().to_string(),
            has_bindings: ast.has_bindings(),
            declarations,
        });
    }

    fn accept_binding(&mut self, key: &str, binding: Option<Binding>) {
        self.print(&Record::Binding {
            key: key.to_string(),
            binding: binding.as_ref().map(BindingRecord::from),
        });
    }
}

/// Read the unit files named by `args` into a request.
pub fn build_request(args: &ResolveArgs) -> Result<ResolveRequest> {
    let mut request = ResolveRequest::new();
    for path in &args.units {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read unit {}", path.display()))?;
        request = request.unit(&unit_name(path), &contents);
    }
    if args.all_asts {
        request = request.all_asts();
    } else {
        for path in &args.ast_for {
            request = request.ast(&unit_name(path));
        }
    }
    for key in &args.keys {
        request = request.key(key.as_str());
    }
    Ok(request)
}

/// Run the pass and print one record per delivered result, then the pass
/// statistics.
pub fn run_resolve(args: &ResolveArgs, out: &mut dyn Write) -> Result<PassStats> {
    let options = args.resolver_options()?;
    let request = build_request(args)?;
    debug!(?options, units = request.units.len(), "resolving");

    let mut printer = JsonPrinter {
        out,
        pretty: args.pretty,
        error: None,
    };
    let stats = UnitResolver::new(options)
        .resolve(&StandardProject::new("jsbind"), &request, &mut printer)
        .context("resolution failed")?;
    printer.print(&Record::Stats(stats));
    if let Some(err) = printer.error {
        return Err(err);
    }
    Ok(stats)
}
