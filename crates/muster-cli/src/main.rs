#![forbid(unsafe_code)]

mod cmd;
mod onebot;
mod output;

use std::env;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use muster_core::config::resolve_config;
use muster_core::error::ErrorCode;
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "muster: group member snapshots and roster rebuilds over OneBot",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format: pretty, text or json.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Config file to use instead of the discovered one.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Bot",
        about = "Show the bot account and its groups",
        long_about = "Query the OneBot endpoint for the logged-in account, implementation version and joined groups.",
        after_help = "EXAMPLES:\n    # Check the connection\n    muster status\n\n    # Emit machine-readable output\n    muster status --json"
    )]
    Status(cmd::status::StatusArgs),

    #[command(
        next_help_heading = "Bot",
        about = "Show a group's details and role counts",
        long_about = "Query the bot for a group's name and capacity, count owners, admins and members of its live roster, and show when it was last backed up.",
        after_help = "EXAMPLES:\n    # Group details\n    muster info 123456\n\n    # Skip the bot's cache\n    muster info 123456 --no-cache"
    )]
    Info(cmd::info::InfoArgs),

    #[command(
        next_help_heading = "Snapshots",
        about = "Snapshot a group's member list",
        long_about = "Fetch the full member list of a group, archive it and record joins and leaves since the previous snapshot.",
        after_help = "EXAMPLES:\n    # Take a manual snapshot\n    muster backup 123456\n\n    # Scheduled snapshot with a note, keeping old ones\n    muster backup 123456 --kind full --note nightly --no-prune"
    )]
    Backup(cmd::backup::BackupArgs),

    #[command(
        next_help_heading = "Snapshots",
        about = "List snapshots of a group",
        long_about = "List stored snapshots of a group, newest first.",
        after_help = "EXAMPLES:\n    # Last 20 snapshots\n    muster history 123456\n\n    # Last 5 as JSON\n    muster history 123456 --limit 5 --json"
    )]
    History(cmd::history::HistoryArgs),

    #[command(
        next_help_heading = "Snapshots",
        about = "Show join and leave events",
        long_about = "Show the membership events recorded for a group, newest first.",
        after_help = "EXAMPLES:\n    # Recent events\n    muster events 123456\n\n    # Tab-separated rows for scripts\n    muster events 123456 --format text"
    )]
    Events(cmd::events::EventsArgs),

    #[command(
        next_help_heading = "Snapshots",
        about = "Compare two snapshots",
        long_about = "Report members who joined, left or changed their group card between two snapshots.",
        after_help = "EXAMPLES:\n    # Compare snapshot 3 with snapshot 7\n    muster diff 3 7"
    )]
    Diff(cmd::diff::DiffArgs),

    #[command(
        next_help_heading = "Snapshots",
        about = "Delete old snapshots",
        long_about = "Keep the newest snapshots of a group and delete the rest along with their archive files.",
        after_help = "EXAMPLES:\n    # Keep the newest 10\n    muster prune 123456 --keep 10"
    )]
    Prune(cmd::prune::PruneArgs),

    #[command(
        next_help_heading = "Snapshots",
        about = "Export a snapshot or a live roster",
        long_about = "Write the archived document of a snapshot, or the live member list of a group, as JSON or CSV.",
        after_help = "EXAMPLES:\n    # Print a snapshot to stdout\n    muster export 7\n\n    # Write a snapshot to a file\n    muster export 7 -o members.json\n\n    # Live roster as CSV\n    muster export --group 123456 --as csv -o members.csv"
    )]
    Export(cmd::export::ExportArgs),

    #[command(
        next_help_heading = "Rebuild",
        about = "Preview a rebuild without changing anything",
        long_about = "Classify every snapshotted member against the live target group and report what a rebuild would do.",
        after_help = "EXAMPLES:\n    # Replay snapshot 7 onto the same group\n    muster preview 7 123456\n\n    # Onto a new group, skipping two members\n    muster preview 7 654321 --exclude 111 --exclude 222"
    )]
    Preview(cmd::preview::PreviewArgs),

    #[command(
        next_help_heading = "Rebuild",
        about = "Restore a group from a snapshot",
        long_about = "Restore cards, titles and admin roles of present members and flag absent ones for invitation, throttled to the configured rate.",
        after_help = "EXAMPLES:\n    # Interactive rebuild\n    muster rebuild 7 123456\n\n    # Non-interactive, checking the snapshot's origin\n    muster rebuild 7 654321 --source 123456 --yes"
    )]
    Rebuild(cmd::rebuild::RebuildArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        long_about = "Generate a shell completion script for muster.",
        after_help = "EXAMPLES:\n    # Bash\n    muster completions bash > ~/.local/share/bash-completion/completions/muster\n\n    # Install into a directory\n    muster completions zsh --dir ~/.zfunc"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("MUSTER_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "muster=debug,info"
        } else {
            "muster=info,warn"
        })
    });

    let format = env::var("MUSTER_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let output = cli.output_mode();

    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args, &mut command);
    }

    let cwd = env::current_dir()?;
    let config = match resolve_config(cli.config.as_deref(), &cwd) {
        Ok(config) => config,
        Err(err) => {
            render_error(
                output,
                &CliError::from_code(ErrorCode::ConfigParseError, format!("{err:#}")),
            )?;
            return Err(err);
        }
    };
    debug!(
        base_url = %config.onebot.base_url,
        database = %config.storage.database.display(),
        "configuration loaded"
    );

    match &cli.command {
        Commands::Status(args) => cmd::status::run_status(args, &config, output),
        Commands::Info(args) => cmd::info::run_info(args, &config, output),
        Commands::Backup(args) => cmd::backup::run_backup(args, &config, output),
        Commands::History(args) => cmd::history::run_history(args, &config, output),
        Commands::Events(args) => cmd::events::run_events(args, &config, output),
        Commands::Diff(args) => cmd::diff::run_diff(args, &config, output),
        Commands::Prune(args) => cmd::prune::run_prune(args, &config, output),
        Commands::Export(args) => cmd::export::run_export(args, &config, output),
        Commands::Preview(args) => cmd::preview::run_preview(args, &config, output),
        Commands::Rebuild(args) => cmd::rebuild::run_rebuild(args, &config, output),
        Commands::Completions(_) => Ok(()),
    }
}
