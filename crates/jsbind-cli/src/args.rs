use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use jsbind_driver::ResolverOptions;
use std::path::{Path, PathBuf};

/// CLI arguments for the jsbind binary.
#[derive(Parser, Debug)]
#[command(
    name = "jsbind",
    version,
    about = "Resolve bindings of JavaScript unit descriptions"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a batch of units and binding keys, printing one JSON object
    /// per result.
    Resolve(ResolveArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Unit description files (JSON). The file name is the unit's name.
    #[arg(required = true)]
    pub units: Vec<PathBuf>,

    /// Binding key to resolve. Repeatable.
    #[arg(short = 'k', long = "key")]
    pub keys: Vec<String>,

    /// Unit whose resolved tree is printed. Repeatable.
    #[arg(long = "ast-for")]
    pub ast_for: Vec<PathBuf>,

    /// Print the resolved tree of every unit.
    #[arg(long)]
    pub all_asts: bool,

    /// Synthesize recovered bindings for types that do not resolve.
    #[arg(long)]
    pub recovery: bool,

    /// Analyze unreadable units as empty units.
    #[arg(long)]
    pub statements_recovery: bool,

    /// Units submitted after this many are diet-parsed.
    #[arg(long)]
    pub parse_threshold: Option<usize>,

    /// Parse without resolving bindings.
    #[arg(long)]
    pub syntax_only: bool,

    /// JSON file with resolver options. Flags override its values.
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Indent the printed JSON.
    #[arg(long)]
    pub pretty: bool,
}

impl ResolveArgs {
    /// Options from `--options`, then the individual flags.
    pub fn resolver_options(&self) -> Result<ResolverOptions> {
        let mut options = match &self.options {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read options file {}", path.display()))?;
                ResolverOptions::from_json(&text)
                    .with_context(|| format!("invalid options file {}", path.display()))?
            }
            None => ResolverOptions::default(),
        };
        if self.recovery {
            options.bindings_recovery = true;
        }
        if self.statements_recovery {
            options.statements_recovery = true;
        }
        if let Some(threshold) = self.parse_threshold {
            options.parse_threshold = threshold;
        }
        if self.syntax_only {
            options.resolve_bindings = false;
        }
        Ok(options)
    }
}

/// Name a unit goes by: the file name of its path.
pub fn unit_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
#[path = "../tests/args_tests.rs"]
mod args_tests;
