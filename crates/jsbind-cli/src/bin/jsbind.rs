use anyhow::Result;
use clap::Parser;
use jsbind_cli::args::{CliArgs, Command};
use std::io::Write;

fn main() -> Result<()> {
    // Initialize tracing if JSBIND_LOG or RUST_LOG is set.
    jsbind_cli::tracing_config::init_tracing();

    let args = CliArgs::parse();
    match args.command {
        Command::Resolve(resolve) => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            jsbind_cli::run_resolve(&resolve, &mut out)?;
            out.flush()?;
        }
    }
    Ok(())
}
