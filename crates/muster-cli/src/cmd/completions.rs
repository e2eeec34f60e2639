use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use clap_complete::{Shell, generate, generate_to};

const BIN_NAME: &str = "muster";

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script into this directory instead of stdout.
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

/// Print or install the completion script for `shell`.
///
/// # Errors
///
/// Fails when the target directory cannot be created or written.
pub fn run_completions(args: &CompletionsArgs, command: &mut clap::Command) -> anyhow::Result<()> {
    let Some(dir) = &args.dir else {
        generate(args.shell, command, BIN_NAME, &mut std::io::stdout());
        return Ok(());
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = generate_to(args.shell, command, BIN_NAME, dir)
        .with_context(|| format!("failed to write completions into {}", dir.display()))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}
