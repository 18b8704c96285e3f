//! Command-line arguments.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

/// Top-level CLI entry point for the SSH login alert provisioner.
#[derive(Parser, Debug)]
#[command(
    name = "ssh-alert",
    about = "Provision email alerts for SSH logins",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Settings file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install the mail client and the SSH login alert
    Provision(ProvisionOpts),
    /// Remove everything provision created
    Deprovision(DeprovisionOpts),
    /// Print a shell completion script
    Completions(CompletionsOpts),
    /// Print version information
    Version,
}

/// Options for the `provision` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct ProvisionOpts {
    /// Envelope sender address
    #[arg(long, value_name = "ADDR")]
    pub from: Option<String>,

    /// SMTP login name
    #[arg(long, value_name = "ADDR")]
    pub user: Option<String>,

    /// Address that receives login alerts
    #[arg(long, value_name = "ADDR")]
    pub recipient: Option<String>,

    /// Never prompt; fail if an input is missing and answer yes to confirmations
    #[arg(long)]
    pub non_interactive: bool,

    /// Read the SMTP secret from the first line of stdin
    #[arg(long)]
    pub secret_stdin: bool,

    /// Leave the mail client's access-control profile alone
    #[arg(long)]
    pub skip_access_control: bool,
}

/// Options for the `deprovision` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct DeprovisionOpts {
    /// System user to remove (defaults to the configured user)
    #[arg(long, value_name = "NAME")]
    pub user: Option<String>,

    /// Do not ask for confirmation
    #[arg(long)]
    pub non_interactive: bool,
}

/// Options for the `completions` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CompletionsOpts {
    /// Target shell
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
