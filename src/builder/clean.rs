use crate::builder::{Context, Phase, TaskUnit};
use crate::config::Globs;
use crate::task::Task;

pub(crate) const CLEAN: &str = "clean";

/// `clean` deletes the configured paths. It has nothing to watch.
pub(crate) fn build(globs: &Globs, cx: &Context) -> TaskUnit {
    let toolchain = cx.toolchain.clone();
    let targets = globs.clone();

    let primary = Task::new(CLEAN, move || toolchain.delete(&targets));

    TaskUnit::new("include.clean", Phase::Prepare, primary)
}
