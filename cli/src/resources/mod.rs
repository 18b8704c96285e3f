//! Idempotent resource primitives (check + apply + remove pattern).
//!
//! Each resource holds its desired state and a shared
//! [`HostEnvironment`](crate::host::HostEnvironment); every call re-observes
//! the host.
pub mod complain;
pub mod directory;
pub mod error;
pub mod file;
pub mod group;
pub mod helpers;
pub mod hook;
pub mod package;
pub mod rendered;
pub mod symlink;
pub mod user;

pub use complain::ComplainModeResource;
pub use directory::DirectoryResource;
pub use file::FileResource;
pub use group::GroupResource;
pub use hook::HookLineResource;
pub use package::PackageResource;
pub use rendered::{RenderedFileResource, RewritePolicy};
pub use symlink::SymlinkResource;
pub use user::SystemUserResource;

use anyhow::Result;

/// Minimal interface for resources that can be described, applied, and removed.
pub trait Applicable {
    /// Human-readable description of this resource.
    fn description(&self) -> String;

    /// Apply the resource change.
    ///
    /// # Errors
    ///
    /// Returns a [`ResourceError`](error::ResourceError) (wrapped in
    /// [`anyhow::Error`]) if the host rejects the mutation.
    fn apply(&self) -> Result<ResourceChange>;

    /// Remove the resource, undoing a previous `apply()`.
    ///
    /// Default implementation returns an error; override in resources
    /// that support removal.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be removed, or if removal is not supported
    /// for this resource type.
    fn remove(&self) -> Result<ResourceChange> {
        anyhow::bail!(
            "operation 'remove' is not supported for resource '{}'",
            self.description()
        )
    }
}

/// State of a resource on the host.
///
/// # Examples
///
/// ```
/// use ssh_alert_cli::resources::ResourceState;
///
/// let missing = ResourceState::Missing;
/// let correct = ResourceState::Correct;
/// let wrong = ResourceState::Incorrect { current: "mode 0644".into() };
/// let skip = ResourceState::Invalid { reason: "mail client not installed".into() };
///
/// assert_ne!(missing, correct);
/// assert_eq!(correct, ResourceState::Correct);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Resource does not exist or is not present.
    Missing,
    /// Resource exists and matches the desired state.
    Correct,
    /// Resource exists but does not match the desired state.
    Incorrect {
        /// The current value of the resource.
        current: String,
    },
    /// Resource cannot be applied on this host right now.
    Invalid {
        /// Reason why the resource cannot be applied.
        reason: String,
    },
}

/// Result of applying or removing a resource.
///
/// # Examples
///
/// ```
/// use ssh_alert_cli::resources::ResourceChange;
///
/// let applied = ResourceChange::Applied;
/// let noop = ResourceChange::AlreadyCorrect;
///
/// assert_eq!(applied, ResourceChange::Applied);
/// assert_ne!(applied, noop);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// Resource was created, updated, or removed.
    Applied,
    /// Resource was already correct (no change needed).
    AlreadyCorrect,
    /// Resource was skipped.
    Skipped {
        /// Reason why the resource was skipped.
        reason: String,
    },
}

/// Unified interface for resources that can be checked and applied.
///
/// ```ignore
/// // All resources follow the same check-then-apply pattern:
/// if resource.needs_change()? {
///     resource.apply()?;
/// }
/// ```
pub trait Resource: Applicable {
    /// Check the current state of the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the host cannot be queried.
    fn current_state(&self) -> Result<ResourceState>;

    /// Determine if the resource needs to be changed.
    ///
    /// # Errors
    ///
    /// Propagates errors from `current_state()`.
    fn needs_change(&self) -> Result<bool> {
        Ok(matches!(
            self.current_state()?,
            ResourceState::Missing | ResourceState::Incorrect { .. }
        ))
    }

    /// Determine if `remove()` has anything to undo.
    ///
    /// By default anything that exists is removable; resources that must only
    /// remove what they created themselves override this.
    ///
    /// # Errors
    ///
    /// Propagates errors from `current_state()`.
    fn needs_removal(&self) -> Result<bool> {
        Ok(matches!(
            self.current_state()?,
            ResourceState::Correct | ResourceState::Incorrect { .. }
        ))
    }
}

/// Shared test helpers for resource and host unit tests.
#[cfg(test)]
pub mod test_helpers {
    use crate::exec::{ExecResult, Executor};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// A queued mock executor.
    ///
    /// Responses are `(exit code, stdout)` pairs consumed in FIFO order.
    /// When the queue is empty any call returns exit code 127 with
    /// `"unexpected call"` on stderr.  Every invocation is recorded as
    /// `"program arg1 arg2"` and can be inspected with [`calls`](Self::calls).
    #[derive(Debug)]
    pub struct MockExecutor {
        responses: Mutex<VecDeque<(i32, String)>>,
        calls: Mutex<Vec<String>>,
        which_result: bool,
    }

    impl MockExecutor {
        /// A mock with a single successful response.
        #[must_use]
        pub fn ok(stdout: &str) -> Self {
            Self::with_exits(vec![(0, stdout)])
        }

        /// A mock whose first call fails with exit code 1.
        #[must_use]
        pub fn fail() -> Self {
            Self::with_exits(vec![(1, "")])
        }

        /// A mock from an ordered list of `(exit code, stdout)` pairs.
        #[must_use]
        pub fn with_exits(responses: Vec<(i32, &str)>) -> Self {
            Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .map(|(code, out)| (code, out.to_string()))
                        .collect(),
                ),
                calls: Mutex::new(Vec::new()),
                which_result: false,
            }
        }

        /// Set the value returned by every [`Executor::which`] call.
        #[must_use]
        pub const fn with_which(mut self, result: bool) -> Self {
            self.which_result = result;
            self
        }

        /// Command lines invoked so far.
        #[must_use]
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().map_or_else(|_| vec![], |g| g.clone())
        }

        fn next(&self, program: &str, args: &[&str]) -> ExecResult {
            if let Ok(mut calls) = self.calls.lock() {
                let mut line = program.to_string();
                for arg in args {
                    line.push(' ');
                    line.push_str(arg);
                }
                calls.push(line);
            }
            let (code, stdout) = self
                .responses
                .lock()
                .ok()
                .and_then(|mut q| q.pop_front())
                .unwrap_or((127, String::new()));
            ExecResult {
                stdout,
                stderr: if code == 127 {
                    "unexpected call".to_string()
                } else {
                    String::new()
                },
                success: code == 0,
                code: Some(code),
            }
        }
    }

    impl Executor for MockExecutor {
        fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
            let result = self.next(program, args);
            if !result.success {
                anyhow::bail!("{program} failed (exit {})", result.code.unwrap_or(-1));
            }
            Ok(result)
        }

        fn run_unchecked_with_env(
            &self,
            program: &str,
            args: &[&str],
            _: &[(&str, &str)],
        ) -> anyhow::Result<ExecResult> {
            Ok(self.next(program, args))
        }

        fn run_unchecked(&self, program: &str, args: &[&str]) -> anyhow::Result<ExecResult> {
            Ok(self.next(program, args))
        }

        fn which(&self, _: &str) -> bool {
            self.which_result
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    struct TestResource {
        state: ResourceState,
    }

    impl Applicable for TestResource {
        fn description(&self) -> String {
            "test resource".to_string()
        }

        fn apply(&self) -> Result<ResourceChange> {
            Ok(ResourceChange::Applied)
        }
    }

    impl Resource for TestResource {
        fn current_state(&self) -> Result<ResourceState> {
            Ok(self.state.clone())
        }
    }

    fn resource(state: ResourceState) -> TestResource {
        TestResource { state }
    }

    #[test]
    fn needs_change_for_missing_and_incorrect() {
        assert!(resource(ResourceState::Missing).needs_change().unwrap());
        assert!(
            resource(ResourceState::Incorrect {
                current: "wrong".to_string()
            })
            .needs_change()
            .unwrap()
        );
    }

    #[test]
    fn no_change_for_correct_or_invalid() {
        assert!(!resource(ResourceState::Correct).needs_change().unwrap());
        assert!(
            !resource(ResourceState::Invalid {
                reason: "n/a".to_string()
            })
            .needs_change()
            .unwrap()
        );
    }

    #[test]
    fn needs_removal_when_present() {
        assert!(resource(ResourceState::Correct).needs_removal().unwrap());
        assert!(
            resource(ResourceState::Incorrect {
                current: "mode 0600".to_string()
            })
            .needs_removal()
            .unwrap()
        );
        assert!(!resource(ResourceState::Missing).needs_removal().unwrap());
    }

    #[test]
    fn default_remove_returns_error() {
        let err = resource(ResourceState::Correct).remove().unwrap_err();
        assert!(
            err.to_string().contains("not supported"),
            "expected 'not supported' in: {err}"
        );
        assert!(
            err.to_string().contains("test resource"),
            "expected resource description in: {err}"
        );
    }
}
