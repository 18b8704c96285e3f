//! Domain-specific error types for the provisioning engine.
//!
//! Internal modules return typed errors (e.g. [`ValidationError`],
//! [`ConfigError`]) while command handlers at the CLI boundary convert them to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! AlertError
//! ├── Config(ConfigError)          # settings file I/O and parsing
//! ├── Validation(ValidationError)  # operator input, raised before any mutation
//! ├── Prompt(PromptError)          # terminal interaction failures
//! └── Resource(ResourceError)      # step failures (package manager, filesystem, …)
//! ```

use thiserror::Error;

pub use crate::resources::error::ResourceError;

/// Top-level error type for the provisioning engine.
#[derive(Error, Debug)]
pub enum AlertError {
    /// Settings could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Operator input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Interaction with the operator failed.
    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    /// A convergence step failed.
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),
}

/// Errors that arise while loading the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The settings file exists but could not be read.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The settings file is not valid TOML or contains unknown keys.
    #[error("Invalid config file {path}: {message}")]
    Parse {
        /// Path to the offending file.
        path: String,
        /// Parser diagnostic.
        message: String,
    },
}

/// Errors in operator-supplied credential input.
///
/// Every variant is raised during credential collection, which runs before
/// the first convergence step, so a validation failure never leaves the host
/// modified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty after trimming.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the empty field.
        field: &'static str,
    },

    /// The two secret entries never matched.
    #[error("secret entries did not match after {attempts} attempt(s)")]
    SecretMismatch {
        /// Number of double-entry attempts made.
        attempts: u32,
    },

    /// A field contains a control character (newline, tab, …).
    #[error("{field} must not contain control characters")]
    ControlCharacter {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A field was not supplied and the run cannot prompt for it.
    #[error("{field} is required in non-interactive mode (pass {flag})")]
    MissingNonInteractive {
        /// Name of the missing field.
        field: &'static str,
        /// Command-line flag that supplies it.
        flag: &'static str,
    },
}

/// Errors raised by a [`Prompter`](crate::prompt::Prompter).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// The operator cancelled the prompt (Esc / Ctrl+C).
    #[error("prompt cancelled by operator")]
    Cancelled,

    /// The terminal could not be used for prompting.
    #[error("terminal prompt failed: {0}")]
    Terminal(String),

    /// No answer is available (non-interactive run or exhausted script).
    #[error("no answer available for prompt '{0}'")]
    Exhausted(String),
}
