//! The ordered provision sequence.
use std::sync::Arc;

use super::{ConvergeStep, Step, StepKind};
use crate::host::HostEnvironment;
use crate::plan::{HookSpec, ProvisionPlan, RenderedSpec};
use crate::resources::{
    ComplainModeResource, DirectoryResource, FileResource, GroupResource, HookLineResource,
    PackageResource, RenderedFileResource, SymlinkResource, SystemUserResource,
};

/// Build the provision steps for `plan`, in execution order.
///
/// Group and user precede everything owned by them; the package precedes
/// complain mode and the symlink, which need the profile and binary it ships.
#[must_use]
pub fn provision_steps(
    plan: &ProvisionPlan,
    host: &Arc<dyn HostEnvironment>,
) -> Vec<Box<dyn Step>> {
    let mut steps: Vec<Box<dyn Step>> = vec![
        Box::new(ConvergeStep::new(
            StepKind::EnsureGroup,
            GroupResource::new(plan.group.clone(), Arc::clone(host)),
        )),
        Box::new(ConvergeStep::new(
            StepKind::EnsureSystemUser,
            SystemUserResource::new(plan.user.clone(), plan.group.clone(), Arc::clone(host)),
        )),
        Box::new(ConvergeStep::new(
            StepKind::EnsureDirectory,
            DirectoryResource::new(
                plan.log_dir.path.clone(),
                plan.log_dir.owner.clone(),
                plan.log_dir.mode,
                Arc::clone(host),
            ),
        )),
        Box::new(ConvergeStep::new(
            StepKind::EnsureFile,
            FileResource::new(
                plan.log_file.path.clone(),
                plan.log_file.owner.clone(),
                plan.log_file.mode,
                Arc::clone(host),
            ),
        )),
    ];

    for package in &plan.packages {
        steps.push(Box::new(
            ConvergeStep::new(
                StepKind::EnsurePackage,
                PackageResource::new(package.clone(), Arc::clone(host)),
            )
            .confirm(format!("Install package {package}?")),
        ));
    }

    if let Some(access_control) = &plan.access_control {
        steps.push(Box::new(
            ConvergeStep::new(
                StepKind::SetComplainMode,
                ComplainModeResource::new(
                    access_control.profile_path.clone(),
                    access_control.profile_name.clone(),
                    Arc::clone(host),
                ),
            )
            .confirm(format!(
                "Put access-control profile {} in complain mode?",
                access_control.profile_name
            )),
        ));
        steps.push(hook_step(&access_control.boot_hook, host));
    }

    steps.push(rendered_step(&plan.config_file, host));
    steps.push(Box::new(ConvergeStep::new(
        StepKind::EnsureSymlink,
        SymlinkResource::new(
            plan.sendmail.source.clone(),
            plan.sendmail.link.clone(),
            Arc::clone(host),
        ),
    )));
    steps.push(rendered_step(&plan.alert_script, host));
    steps.push(hook_step(&plan.login_hook, host));
    steps
}

fn rendered_step(spec: &RenderedSpec, host: &Arc<dyn HostEnvironment>) -> Box<dyn Step> {
    Box::new(ConvergeStep::new(
        StepKind::RenderConfigFile,
        RenderedFileResource::new(
            spec.path.clone(),
            spec.content.clone(),
            spec.owner.clone(),
            spec.mode,
            spec.policy,
            Arc::clone(host),
        ),
    ))
}

fn hook_step(spec: &HookSpec, host: &Arc<dyn HostEnvironment>) -> Box<dyn Step> {
    Box::new(ConvergeStep::new(
        StepKind::EnsureHookScript,
        HookLineResource::new(
            spec.path.clone(),
            spec.marker.clone(),
            spec.header.clone(),
            spec.create_mode,
            Arc::clone(host),
        ),
    ))
}
