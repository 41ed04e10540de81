use crate::builder::{Context, Phase, TaskUnit, watch_task};
use crate::config::CopySpec;
use crate::error::ConfigError;
use crate::task::{Task, watch_name};

/// One unit per entry: `<name>` copies the sources, `<name>Watch` copies them
/// again whenever they change.
pub(crate) fn build(copy: &CopySpec, cx: &Context) -> Result<Vec<TaskUnit>, ConfigError> {
    let mut units = Vec::with_capacity(copy.len());

    for (name, entry) in copy {
        let owner = format!("include.copy.{name}");
        let dest = entry
            .dest
            .clone()
            .ok_or_else(|| ConfigError::shape(&owner, "missing destination"))?;

        let toolchain = cx.toolchain.clone();
        let src = entry.src.clone();
        let primary = Task::new(name, move || toolchain.copy(&src, &dest));

        let watch = watch_task(&cx.toolchain, watch_name(name), entry.src.clone(), primary.clone());

        units.push(TaskUnit::new(owner, Phase::Build, primary).with_watch(watch));
    }

    Ok(units)
}
