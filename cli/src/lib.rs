//! SSH login alert provisioner.
//!
//! Installs a mail client shim, renders its configuration, creates the
//! system accounts and log files it needs, optionally relaxes its
//! access-control profile, and registers a login hook so every SSH login
//! sends an email.  Every step is idempotent: re-running converges without
//! further mutations, and a failed run is recovered by fixing the cause and
//! running again.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: TOML settings and their validation
//! - **[`host`]**: the [`HostEnvironment`](host::HostEnvironment) capability
//!   interface, with a real and an in-memory implementation
//! - **[`resources`]**: idempotent `check + apply + remove` primitives
//! - **[`plan`]** and **[`steps`]**: the desired state and the ordered step lists
//! - **[`provisioner`]**: sequential, fail-fast step execution
//! - **[`commands`]**: top-level subcommand orchestration (`provision`, `deprovision`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod exec;
pub mod host;
pub mod logging;
pub mod plan;
pub mod prompt;
pub mod provisioner;
pub mod render;
pub mod resources;
pub mod steps;
