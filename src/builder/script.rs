use crate::builder::{Context, Phase, TaskUnit, watch_task};
use crate::config::{BundleSpec, RollupSpec, ScriptSpec};
use crate::task::{Plan, Task, rollup_name, watch_name};

pub(crate) const TS: &str = "ts";
pub(crate) const TS_COMPILE: &str = "tsCompile";
pub(crate) const ROLLUP: &str = "rollup";
pub(crate) const DECLARATIONS: &str = "declarations";
pub(crate) const TS_CLEAN: &str = "tsClean";

/// The `ts` unit.
///
/// `ts` runs `tsCompile` first, then every bundle together with
/// `declarations`, then `tsClean`. Each step is also exposed by name, and
/// each distinct set of inputs gets its own watcher.
pub(crate) fn build(spec: &ScriptSpec, cx: &Context) -> TaskUnit {
    let compile = {
        let toolchain = cx.toolchain.clone();
        let (src, dest, tsconfig) = (spec.src.clone(), spec.dest.clone(), spec.tsconfig.clone());
        Task::new(TS_COMPILE, move || toolchain.compile_scripts(&src, &dest, &tsconfig))
    };

    let bundles: Vec<(Task, &BundleSpec)> = match &spec.rollup {
        Some(RollupSpec::Single(bundle)) => vec![(bundle_task(ROLLUP, bundle, cx), bundle)],
        Some(RollupSpec::Multi(bundles)) => bundles
            .iter()
            .map(|(name, bundle)| (bundle_task(rollup_name(name), bundle, cx), bundle))
            .collect(),
        None => Vec::new(),
    };

    let declarations = spec.declarations.as_ref().map(|declarations| {
        let toolchain = cx.toolchain.clone();
        let (src, dest) = (declarations.src.clone(), declarations.dest.clone());
        Task::new(DECLARATIONS, move || toolchain.copy(&src, &dest))
    });

    let clean = spec.clean.as_ref().map(|globs| {
        let toolchain = cx.toolchain.clone();
        let targets = globs.clone();
        Task::new(TS_CLEAN, move || toolchain.delete(&targets))
    });

    let plan = Plan::new()
        .then(compile.clone())
        .then_all(
            bundles
                .iter()
                .map(|(task, _)| task.clone())
                .chain(declarations.clone()),
        )
        .then_maybe(clean.clone());

    let mut unit = TaskUnit::new("include.ts", Phase::Build, Task::sequence(TS, plan))
        .with_watch(watch_task(&cx.toolchain, watch_name(TS), spec.src.clone(), compile.clone()))
        .with_named(compile);

    for (task, bundle) in bundles {
        let watch = watch_task(&cx.toolchain, watch_name(task.name()), bundle.watched(), task.clone());
        unit = unit.with_watch(watch).with_named(task);
    }

    if let (Some(task), Some(declared)) = (declarations, &spec.declarations) {
        let watch = watch_task(&cx.toolchain, watch_name(DECLARATIONS), declared.src.clone(), task.clone());
        unit = unit.with_watch(watch).with_named(task);
    }

    if let Some(task) = clean {
        unit = unit.with_named(task);
    }

    unit
}

fn bundle_task(name: impl AsRef<str>, bundle: &BundleSpec, cx: &Context) -> Task {
    let toolchain = cx.toolchain.clone();
    let options = bundle.options.clone().unwrap_or_else(|| cx.preset.clone());
    let bundle = bundle.clone();

    Task::new(name, move || toolchain.bundle(&bundle, &options))
}
