//! `ssh-alert` binary: parses arguments and dispatches to the commands.
use anyhow::Result;
use clap::Parser;

use ssh_alert_cli::{cli, commands, logging, provisioner};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    let command = match &args.command {
        cli::Command::Provision(_) => "provision",
        cli::Command::Deprovision(_) => "deprovision",
        cli::Command::Completions(opts) => {
            commands::completions::run(opts);
            return Ok(());
        }
        cli::Command::Version => {
            commands::version::run();
            return Ok(());
        }
    };

    logging::init_subscriber(args.verbose, command);
    let log = logging::Logger::new(command);

    // The first Ctrl+C lets the current step finish; a second one aborts.
    if let Err(e) = ctrlc::set_handler(|| {
        if provisioner::interrupt() {
            std::process::exit(130);
        }
        tracing::warn!("interrupt received; stopping after the current step");
    }) {
        log.debug(&format!("ctrl-c handler not installed: {e}"));
    }

    let result = match args.command {
        cli::Command::Provision(opts) => commands::provision::run(&args.global, &opts, &log),
        cli::Command::Deprovision(opts) => commands::deprovision::run(&args.global, &opts, &log),
        cli::Command::Completions(_) | cli::Command::Version => Ok(()),
    };

    if provisioner::interrupted() {
        std::process::exit(130);
    }
    result
}
