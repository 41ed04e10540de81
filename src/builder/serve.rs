use crate::builder::{Context, Phase, TaskUnit};
use crate::config::ServeSpec;
use crate::task::Task;

pub(crate) const SERVE: &str = "serve";

/// `serve` starts the dev server and returns as soon as it listens. The
/// server itself is refreshed by the deploy watcher.
pub(crate) fn build(spec: &ServeSpec, cx: &Context) -> TaskUnit {
    let toolchain = cx.toolchain.clone();
    let spec = spec.clone();

    let primary = Task::new(SERVE, move || toolchain.serve(&spec));

    TaskUnit::new("include.serve", Phase::Serve, primary)
}
