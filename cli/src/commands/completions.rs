//! Command: print a shell completion script.
use clap::CommandFactory as _;

use crate::cli::{Cli, CompletionsOpts};

/// Write the completion script for `opts.shell` to `out`.
pub fn write(opts: &CompletionsOpts, out: &mut dyn std::io::Write) {
    clap_complete::generate(opts.shell, &mut Cli::command(), "ssh-alert", out);
}

/// Print the completion script to stdout.
pub fn run(opts: &CompletionsOpts) {
    write(opts, &mut std::io::stdout());
}
