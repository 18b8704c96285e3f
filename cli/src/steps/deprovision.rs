//! The ordered deprovision sequence.
//!
//! Mirrors the provision sequence in reverse dependency order.  Every step is
//! presence-checked, so running it on a clean host performs no mutations.
//! Complain mode is left as it is.
use std::path::Path;
use std::sync::Arc;

use super::{RemoveStep, Step, StepKind};
use crate::config::Settings;
use crate::host::{HostEnvironment, Ownership};
use crate::plan::{self, ALERT_SCRIPT_MODE, CONFIG_FILE_MODE, HookSpec, LOG_DIR_MODE};
use crate::resources::{
    DirectoryResource, FileResource, GroupResource, HookLineResource, PackageResource,
    SymlinkResource, SystemUserResource,
};

/// Build the deprovision steps, in execution order.
///
/// `user` is the system user to remove; `run_log` is the provision run log,
/// removed last when given.
#[must_use]
pub fn deprovision_steps(
    settings: &Settings,
    user: &str,
    run_log: Option<&Path>,
    host: &Arc<dyn HostEnvironment>,
) -> Vec<Box<dyn Step>> {
    let paths = &settings.paths;
    let group = &settings.accounts.group;
    let sendmail = plan::sendmail_link(settings);

    let mut steps: Vec<Box<dyn Step>> = vec![Box::new(RemoveStep::new(
        StepKind::RemoveSymlink,
        SymlinkResource::new(sendmail.source, sendmail.link, Arc::clone(host)),
    ))];

    for package in &settings.packages.names {
        steps.push(Box::new(RemoveStep::new(
            StepKind::RemovePackage,
            PackageResource::new(package.clone(), Arc::clone(host)),
        )));
    }

    steps.push(Box::new(RemoveStep::new(
        StepKind::RemoveFile,
        FileResource::new(
            paths.config_file.clone(),
            Ownership::root(),
            CONFIG_FILE_MODE,
            Arc::clone(host),
        ),
    )));
    steps.push(Box::new(RemoveStep::new(
        StepKind::RemoveFile,
        FileResource::new(
            paths.alert_script.clone(),
            Ownership::root(),
            ALERT_SCRIPT_MODE,
            Arc::clone(host),
        ),
    )));
    steps.push(Box::new(RemoveStep::new(
        StepKind::RemoveFile,
        DirectoryResource::new(
            paths.log_dir.clone(),
            Ownership::new("root", group.clone()),
            LOG_DIR_MODE,
            Arc::clone(host),
        ),
    )));

    steps.push(hook_removal(&plan::login_hook(settings), host));
    steps.push(hook_removal(&plan::boot_hook(settings), host));

    steps.push(Box::new(RemoveStep::new(
        StepKind::RemoveUser,
        SystemUserResource::new(user, group.clone(), Arc::clone(host)),
    )));
    steps.push(Box::new(RemoveStep::new(
        StepKind::RemoveGroup,
        GroupResource::new(group.clone(), Arc::clone(host)),
    )));

    if let Some(run_log) = run_log {
        steps.push(Box::new(RemoveStep::new(
            StepKind::RemoveRunLog,
            FileResource::new(
                run_log.to_path_buf(),
                Ownership::root(),
                0o644,
                Arc::clone(host),
            ),
        )));
    }
    steps
}

fn hook_removal(spec: &HookSpec, host: &Arc<dyn HostEnvironment>) -> Box<dyn Step> {
    Box::new(RemoveStep::new(
        StepKind::RemoveHookScript,
        HookLineResource::new(
            spec.path.clone(),
            spec.marker.clone(),
            spec.header.clone(),
            spec.create_mode,
            Arc::clone(host),
        ),
    ))
}
