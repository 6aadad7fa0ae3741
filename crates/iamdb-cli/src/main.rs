use clap::{ArgAction, Parser, Subcommand};
use commands::{check, clear, config, sync, Workspace};
use iamdb_config::PathManager;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "iamdb")]
#[command(about = "iamdb - Enrich the movies you've watched and keep them in your database")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Path to the configuration file
    #[arg(long, global = true, env = "IAMDB_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match the watch list against the dataset and upsert the results
    #[command(long_about = "Read the configured watch list, match every entry against the public dataset snapshot, and upsert the enriched movies into the database. Entries without a dataset match are reported as warnings. Exits nonzero if any upsert fails.")]
    Sync {
        /// Download the dataset again even if a fresh cached snapshot exists
        #[arg(long, action = ArgAction::SetTrue)]
        refresh: bool,

        /// Match and report, but write nothing to the database
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Audit stored records for missing data
    #[command(long_about = "Scan every stored movie and flag records missing a public rating or genres, and records whose identifier is no longer in the current dataset. Flagged identifiers are printed to standard output and the exit code is nonzero when anything is flagged. Nothing is modified.")]
    Check {
        /// Download the dataset again even if a fresh cached snapshot exists
        #[arg(long, action = ArgAction::SetTrue)]
        refresh: bool,
    },
    /// View or create configuration and stored credentials
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
    /// Clear cached data
    #[command(long_about = "Clear cached dataset snapshots or stored credentials. Use --cache to clear downloaded snapshots, --credentials to clear stored passwords, or --all to clear everything.")]
    Clear {
        /// Clear cache and credentials
        #[arg(long, action = ArgAction::SetTrue)]
        all: bool,

        /// Clear downloaded dataset snapshots
        #[arg(long, action = ArgAction::SetTrue)]
        cache: bool,

        /// Clear stored credentials
        #[arg(long, action = ArgAction::SetTrue)]
        credentials: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (masks sensitive data)
    Show {
        /// Show full values instead of masking secrets
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },

    /// Write a configuration file, prompting for the essentials
    Init {
        /// Overwrite an existing configuration file without asking
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },

    /// Store the MongoDB password in the system keyring (or the credentials file without one)
    Password {
        /// MongoDB user (defaults to remote.user from the configuration)
        #[arg(long)]
        user: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let paths = PathManager::default();
    let config_file = cli.config.clone().unwrap_or_else(|| paths.config_file());
    let workspace = Workspace::new(paths, config_file);

    logging::init_logging_with_file(cli.verbose, cli.quiet, workspace.log_file())
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Sync { refresh, dry_run } => {
            sync::run_sync(&workspace, refresh, dry_run, &output).await
        }
        Commands::Check { refresh } => check::run_check(&workspace, refresh, &output).await,
        Commands::Config { cmd } => config::run_config(cmd, &workspace, &output),
        Commands::Clear { all, cache, credentials } => {
            clear::run_clear(all, cache, credentials, &workspace, &output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync_flags() {
        let cli = Cli::try_parse_from(["iamdb", "-vv", "sync", "--dry-run", "--output", "json"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, output::OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Sync { refresh: false, dry_run: true }));
    }

    #[test]
    fn test_parse_config_password_user() {
        let cli = Cli::try_parse_from(["iamdb", "config", "password", "--user", "alice"]).unwrap();
        match cli.command {
            Commands::Config { cmd: ConfigCommands::Password { user } } => {
                assert_eq!(user.as_deref(), Some("alice"))
            }
            _ => panic!("expected config password"),
        }
    }
}
