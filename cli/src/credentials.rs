//! Operator credential collection and validation.
//!
//! Credentials are gathered once, before the first convergence step, from
//! command-line values and (when allowed) interactive prompts.  Every field is
//! validated up front so invalid input never leaves the host half-provisioned.
use std::fmt;

use crate::error::{AlertError, ValidationError};
use crate::prompt::Prompter;

/// Number of double-entry rounds allowed for the secret.
pub const MAX_SECRET_ATTEMPTS: u32 = 3;

const FROM: &str = "from address";
const USER: &str = "user address";
const SECRET: &str = "secret";
const RECIPIENT: &str = "recipient address";

/// Validated mail credentials.
///
/// Held in process memory and written only to the rendered mail client
/// configuration; the `Debug` output never contains the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Envelope sender address.
    pub from: String,
    /// SMTP login name.
    pub user: String,
    /// SMTP password, kept verbatim.
    pub secret: String,
    /// Address that receives login alerts.
    pub recipient: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("from", &self.from)
            .field("user", &self.user)
            .field("secret", &"<redacted>")
            .field("recipient", &self.recipient)
            .finish()
    }
}

/// Raw credential input supplied up front (command-line flags, stdin).
#[derive(Clone, Default)]
pub struct CredentialInput {
    /// `--from`
    pub from: Option<String>,
    /// `--user`
    pub user: Option<String>,
    /// `--recipient`
    pub recipient: Option<String>,
    /// First line read from stdin with `--secret-stdin`.
    pub secret_stdin: Option<String>,
    /// Never prompt; missing fields are errors.
    pub non_interactive: bool,
}

impl fmt::Debug for CredentialInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialInput")
            .field("from", &self.from)
            .field("user", &self.user)
            .field("recipient", &self.recipient)
            .field("secret_stdin", &self.secret_stdin.as_ref().map(|_| "<redacted>"))
            .field("non_interactive", &self.non_interactive)
            .finish()
    }
}

/// Gather all four credential fields and validate them.
///
/// Prompts in the order from, user, secret, recipient for whatever `input`
/// does not already carry.  The secret is read twice per attempt; an empty or
/// mismatched pair uses up one of [`MAX_SECRET_ATTEMPTS`].
///
/// # Errors
///
/// Returns [`AlertError::Validation`] for empty, malformed, or missing
/// non-interactive input and [`AlertError::Prompt`] if the prompter fails.
pub fn collect(
    input: &CredentialInput,
    prompter: &dyn Prompter,
) -> Result<Credentials, AlertError> {
    let from = text_field(input.from.as_deref(), FROM, "--from", input, prompter)?;
    let user = text_field(input.user.as_deref(), USER, "--user", input, prompter)?;
    let secret = match &input.secret_stdin {
        Some(secret) => secret.clone(),
        None if input.non_interactive => {
            return Err(ValidationError::MissingNonInteractive {
                field: SECRET,
                flag: "--secret-stdin",
            }
            .into());
        }
        None => read_secret_twice(prompter)?,
    };
    let recipient = text_field(
        input.recipient.as_deref(),
        RECIPIENT,
        "--recipient",
        input,
        prompter,
    )?;

    let credentials = Credentials {
        from: from.trim().to_string(),
        user: user.trim().to_string(),
        secret,
        recipient: recipient.trim().to_string(),
    };
    validate(&credentials)?;
    Ok(credentials)
}

fn text_field(
    given: Option<&str>,
    field: &'static str,
    flag: &'static str,
    input: &CredentialInput,
    prompter: &dyn Prompter,
) -> Result<String, AlertError> {
    match given {
        Some(value) => Ok(value.to_string()),
        None if input.non_interactive => {
            Err(ValidationError::MissingNonInteractive { field, flag }.into())
        }
        None => Ok(prompter.read_text(&capitalize(field))?),
    }
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn read_secret_twice(prompter: &dyn Prompter) -> Result<String, AlertError> {
    for attempt in 1..=MAX_SECRET_ATTEMPTS {
        let first = prompter.read_secret("Secret")?;
        let second = prompter.read_secret("Confirm secret")?;
        if !first.trim().is_empty() && first == second {
            return Ok(first);
        }
        if attempt < MAX_SECRET_ATTEMPTS {
            tracing::warn!(
                "secret entries were empty or did not match ({attempt}/{MAX_SECRET_ATTEMPTS})"
            );
        }
    }
    Err(ValidationError::SecretMismatch {
        attempts: MAX_SECRET_ATTEMPTS,
    }
    .into())
}

/// Check that every field is non-empty after trimming and free of control
/// characters.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found, checking fields in the order
/// from, user, secret, recipient.
pub fn validate(credentials: &Credentials) -> Result<(), ValidationError> {
    for (field, value) in [
        (FROM, &credentials.from),
        (USER, &credentials.user),
        (SECRET, &credentials.secret),
        (RECIPIENT, &credentials.recipient),
    ] {
        if value.trim().is_empty() {
            return Err(ValidationError::Empty { field });
        }
        if value.chars().any(char::is_control) {
            return Err(ValidationError::ControlCharacter { field });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::error::PromptError;
    use crate::prompt::{MockPrompter, NonInteractivePrompter, ScriptedPrompter};

    fn full_flags() -> CredentialInput {
        CredentialInput {
            from: Some("a@x.com".to_string()),
            user: Some("a@x.com".to_string()),
            recipient: Some("b@y.com".to_string()),
            secret_stdin: Some("pw".to_string()),
            non_interactive: true,
        }
    }

    #[test]
    fn flags_only_never_prompt() {
        let mut prompter = MockPrompter::new();
        prompter.expect_read_text().never();
        prompter.expect_read_secret().never();
        let creds = collect(&full_flags(), &prompter).unwrap();
        assert_eq!(creds.from, "a@x.com");
        assert_eq!(creds.secret, "pw");
        assert_eq!(creds.recipient, "b@y.com");
    }

    #[test]
    fn interactive_prompts_for_missing_fields_in_order() {
        let prompter = ScriptedPrompter::new()
            .text(" a@x.com ")
            .text("a@x.com")
            .text("b@y.com")
            .secret("pw")
            .secret("pw");
        let creds = collect(&CredentialInput::default(), &prompter).unwrap();
        assert_eq!(creds.from, "a@x.com", "addresses are trimmed");
        assert_eq!(
            prompter.asked(),
            vec![
                "From address",
                "User address",
                "Secret",
                "Confirm secret",
                "Recipient address"
            ]
        );
    }

    #[test]
    fn secret_is_kept_verbatim() {
        let mut input = full_flags();
        input.secret_stdin = Some(" p w ".to_string());
        let creds = collect(&input, &NonInteractivePrompter).unwrap();
        assert_eq!(creds.secret, " p w ");
    }

    #[test]
    fn mismatch_then_match_succeeds() {
        let mut input = full_flags();
        input.secret_stdin = None;
        input.non_interactive = false;
        let prompter = ScriptedPrompter::new()
            .secret("pw")
            .secret("pW")
            .secret("pw")
            .secret("pw");
        let creds = collect(&input, &prompter).unwrap();
        assert_eq!(creds.secret, "pw");
        assert_eq!(prompter.call_count(), 4);
    }

    #[test]
    fn mismatch_exhausts_after_bounded_attempts() {
        let mut input = full_flags();
        input.secret_stdin = None;
        input.non_interactive = false;
        let mut prompter = ScriptedPrompter::new();
        for _ in 0..MAX_SECRET_ATTEMPTS {
            prompter = prompter.secret("pw").secret("other");
        }
        let err = collect(&input, &prompter).unwrap_err();
        assert!(matches!(
            err,
            AlertError::Validation(ValidationError::SecretMismatch { attempts: 3 })
        ));
        assert_eq!(prompter.call_count(), 6);
    }

    #[test]
    fn empty_secret_pair_counts_as_failed_attempt() {
        let mut input = full_flags();
        input.secret_stdin = None;
        input.non_interactive = false;
        let prompter = ScriptedPrompter::new()
            .secret("")
            .secret("")
            .secret("pw")
            .secret("pw");
        assert_eq!(collect(&input, &prompter).unwrap().secret, "pw");
    }

    #[test]
    fn empty_recipient_is_rejected() {
        let mut input = full_flags();
        input.recipient = Some("   ".to_string());
        let err = collect(&input, &NonInteractivePrompter).unwrap_err();
        assert!(matches!(
            err,
            AlertError::Validation(ValidationError::Empty {
                field: "recipient address"
            })
        ));
    }

    #[test]
    fn control_characters_are_rejected() {
        let mut input = full_flags();
        input.secret_stdin = Some("pw\naccount evil".to_string());
        let err = collect(&input, &NonInteractivePrompter).unwrap_err();
        assert!(matches!(
            err,
            AlertError::Validation(ValidationError::ControlCharacter { field: "secret" })
        ));
    }

    #[test]
    fn non_interactive_missing_field_names_flag() {
        let mut input = full_flags();
        input.user = None;
        let err = collect(&input, &NonInteractivePrompter).unwrap_err();
        assert!(matches!(
            err,
            AlertError::Validation(ValidationError::MissingNonInteractive {
                field: "user address",
                flag: "--user"
            })
        ));
    }

    #[test]
    fn non_interactive_missing_secret() {
        let mut input = full_flags();
        input.secret_stdin = None;
        let err = collect(&input, &NonInteractivePrompter).unwrap_err();
        assert!(err.to_string().contains("--secret-stdin"));
    }

    #[test]
    fn cancelled_prompt_propagates() {
        let mut prompter = MockPrompter::new();
        prompter
            .expect_read_text()
            .returning(|_| Err(PromptError::Cancelled));
        let err = collect(&CredentialInput::default(), &prompter).unwrap_err();
        assert!(matches!(err, AlertError::Prompt(PromptError::Cancelled)));
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = collect(&full_flags(), &NonInteractivePrompter).unwrap();
        let rendered = format!("{creds:?} {:?}", full_flags());
        assert!(!rendered.contains("\"pw\""), "{rendered}");
        assert!(rendered.contains("<redacted>"));
    }
}
