use crate::builder::{Context, Phase, TaskUnit, watch_task};
use crate::config::StyleSpec;
use crate::task::{Task, watch_name};

pub(crate) const SCSS: &str = "scss";

/// `scss` compiles the style sheets, `scssWatch` recompiles them when
/// `watchSrc` (or `src`) changes.
pub(crate) fn build(spec: &StyleSpec, cx: &Context) -> TaskUnit {
    let toolchain = cx.toolchain.clone();
    let owned = spec.clone();
    let primary = Task::new(SCSS, move || toolchain.compile_styles(&owned));

    let watch = watch_task(&cx.toolchain, watch_name(SCSS), spec.watched().clone(), primary.clone());

    TaskUnit::new("include.scss", Phase::Build, primary).with_watch(watch)
}
