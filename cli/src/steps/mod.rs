//! Convergence steps: a resource plus the direction it is driven in.
//!
//! A [`ConvergeStep`] brings a resource to its desired state and a
//! [`RemoveStep`] undoes it.  Both are driven by the
//! [`Provisioner`](crate::provisioner::Provisioner) through the object-safe
//! [`Step`] trait.
pub mod deprovision;
pub mod provision;

use anyhow::Result;

use crate::resources::{Resource, ResourceChange, ResourceState};

/// What a step's check found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// `apply` must run; carries what is currently wrong, if known.
    NeedsWork(Option<String>),
    /// Nothing to do.
    Converged,
    /// The step cannot run on this host right now.
    NotApplicable(String),
}

/// The kind of a step, used in step names and dry-run messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Create a system group.
    EnsureGroup,
    /// Create a system user.
    EnsureSystemUser,
    /// Create a directory with owner and mode.
    EnsureDirectory,
    /// Create an empty file with owner and mode.
    EnsureFile,
    /// Install a package.
    EnsurePackage,
    /// Put an access-control profile in complain mode.
    SetComplainMode,
    /// Write a generated file.
    RenderConfigFile,
    /// Create or retarget a symlink.
    EnsureSymlink,
    /// Add a marker line to a script.
    EnsureHookScript,
    /// Remove a symlink.
    RemoveSymlink,
    /// Remove a package.
    RemovePackage,
    /// Remove a file or directory tree.
    RemoveFile,
    /// Remove a marker line from a script.
    RemoveHookScript,
    /// Remove a system user.
    RemoveUser,
    /// Remove a system group.
    RemoveGroup,
    /// Remove the provision run log.
    RemoveRunLog,
}

impl StepKind {
    /// Verb used in dry-run messages.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::EnsureGroup
            | Self::EnsureSystemUser
            | Self::EnsureDirectory
            | Self::EnsureFile
            | Self::EnsureSymlink => "create",
            Self::EnsurePackage => "install",
            Self::SetComplainMode => "enable",
            Self::RenderConfigFile => "write",
            Self::EnsureHookScript => "add hook line to",
            Self::RemoveHookScript => "remove hook line from",
            Self::RemoveSymlink
            | Self::RemovePackage
            | Self::RemoveFile
            | Self::RemoveUser
            | Self::RemoveGroup
            | Self::RemoveRunLog => "remove",
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// One unit of the provisioning sequence.
pub trait Step: std::fmt::Debug {
    /// Kind of the step.
    fn kind(&self) -> StepKind;

    /// Human-readable name (the resource description).
    fn name(&self) -> String;

    /// Question to ask the operator before applying, if any.
    fn confirmation(&self) -> Option<&str> {
        None
    }

    /// Observe the host and decide whether `apply` must run.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot be queried.
    fn check(&self) -> Result<Check>;

    /// Perform the mutation.
    ///
    /// # Errors
    ///
    /// Returns an error if the host rejects the mutation.
    fn apply(&self) -> Result<ResourceChange>;

    /// Message logged instead of applying during a dry run.
    fn dry_run_message(&self) -> String {
        format!("would {} {}", self.kind().verb(), self.name())
    }
}

/// Drives a resource towards its desired state.
#[derive(Debug)]
pub struct ConvergeStep<R> {
    kind: StepKind,
    resource: R,
    confirm: Option<String>,
}

impl<R: Resource> ConvergeStep<R> {
    /// Wrap `resource`.
    #[must_use]
    pub const fn new(kind: StepKind, resource: R) -> Self {
        Self {
            kind,
            resource,
            confirm: None,
        }
    }

    /// Ask `question` before applying.
    #[must_use]
    pub fn confirm(mut self, question: impl Into<String>) -> Self {
        self.confirm = Some(question.into());
        self
    }
}

impl<R: Resource + std::fmt::Debug> Step for ConvergeStep<R> {
    fn kind(&self) -> StepKind {
        self.kind
    }

    fn name(&self) -> String {
        self.resource.description()
    }

    fn confirmation(&self) -> Option<&str> {
        self.confirm.as_deref()
    }

    fn check(&self) -> Result<Check> {
        let state = self.resource.current_state()?;
        if let ResourceState::Invalid { reason } = state {
            return Ok(Check::NotApplicable(reason));
        }
        if !self.resource.needs_change()? {
            return Ok(Check::Converged);
        }
        Ok(Check::NeedsWork(match state {
            ResourceState::Incorrect { current } => Some(current),
            ResourceState::Correct => Some("rewritten on every run".to_string()),
            ResourceState::Missing | ResourceState::Invalid { .. } => None,
        }))
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.resource.apply()
    }
}

/// Undoes a resource, touching only what is present.
#[derive(Debug)]
pub struct RemoveStep<R> {
    kind: StepKind,
    resource: R,
}

impl<R: Resource> RemoveStep<R> {
    /// Wrap `resource`.
    #[must_use]
    pub const fn new(kind: StepKind, resource: R) -> Self {
        Self { kind, resource }
    }
}

impl<R: Resource + std::fmt::Debug> Step for RemoveStep<R> {
    fn kind(&self) -> StepKind {
        self.kind
    }

    fn name(&self) -> String {
        self.resource.description()
    }

    fn check(&self) -> Result<Check> {
        if self.resource.needs_removal()? {
            Ok(Check::NeedsWork(None))
        } else {
            Ok(Check::Converged)
        }
    }

    fn apply(&self) -> Result<ResourceChange> {
        self.resource.remove()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::resources::Applicable;

    #[derive(Debug)]
    struct Fixed {
        state: ResourceState,
        always: bool,
    }

    impl Applicable for Fixed {
        fn description(&self) -> String {
            "fixed thing".to_string()
        }

        fn apply(&self) -> Result<ResourceChange> {
            Ok(ResourceChange::Applied)
        }

        fn remove(&self) -> Result<ResourceChange> {
            Ok(ResourceChange::Applied)
        }
    }

    impl Resource for Fixed {
        fn current_state(&self) -> Result<ResourceState> {
            Ok(self.state.clone())
        }

        fn needs_change(&self) -> Result<bool> {
            Ok(self.always
                || matches!(
                    self.state,
                    ResourceState::Missing | ResourceState::Incorrect { .. }
                ))
        }
    }

    fn converge(state: ResourceState) -> ConvergeStep<Fixed> {
        ConvergeStep::new(
            StepKind::EnsureFile,
            Fixed {
                state,
                always: false,
            },
        )
    }

    #[test]
    fn check_maps_resource_state() {
        assert_eq!(
            converge(ResourceState::Missing).check().unwrap(),
            Check::NeedsWork(None)
        );
        assert_eq!(
            converge(ResourceState::Incorrect {
                current: "mode 0600".to_string()
            })
            .check()
            .unwrap(),
            Check::NeedsWork(Some("mode 0600".to_string()))
        );
        assert_eq!(
            converge(ResourceState::Correct).check().unwrap(),
            Check::Converged
        );
        assert_eq!(
            converge(ResourceState::Invalid {
                reason: "no tooling".to_string()
            })
            .check()
            .unwrap(),
            Check::NotApplicable("no tooling".to_string())
        );
    }

    #[test]
    fn always_rewritten_resource_needs_work_when_correct() {
        let step = ConvergeStep::new(
            StepKind::RenderConfigFile,
            Fixed {
                state: ResourceState::Correct,
                always: true,
            },
        );
        assert!(matches!(step.check().unwrap(), Check::NeedsWork(Some(_))));
    }

    #[test]
    fn remove_step_checks_presence() {
        let present = RemoveStep::new(
            StepKind::RemoveFile,
            Fixed {
                state: ResourceState::Correct,
                always: false,
            },
        );
        let absent = RemoveStep::new(
            StepKind::RemoveFile,
            Fixed {
                state: ResourceState::Missing,
                always: false,
            },
        );
        assert_eq!(present.check().unwrap(), Check::NeedsWork(None));
        assert_eq!(absent.check().unwrap(), Check::Converged);
    }

    #[test]
    fn dry_run_message_uses_verb() {
        let step = converge(ResourceState::Missing).confirm("Create it?");
        assert_eq!(step.dry_run_message(), "would create fixed thing");
        assert_eq!(step.confirmation(), Some("Create it?"));
        assert_eq!(StepKind::EnsurePackage.to_string(), "EnsurePackage");
    }
}
