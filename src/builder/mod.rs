//! One builder per build concern.
//!
//! Every builder turns its slice of the config into a [`TaskUnit`]: the task
//! that does the work, the tasks that watch its inputs and any sub-tasks that
//! should be invokable on their own. Builders only construct tasks, they
//! never run them.

mod clean;
mod copy;
mod deploy;
mod script;
mod serve;
mod styles;

use std::sync::Arc;

use crate::config::{BundleOptions, Globs, Include};
use crate::error::ConfigError;
use crate::task::{Task, TaskResult};
use crate::toolchain::Toolchain;

/// Where a unit's primary task is placed in the pipeline compositions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Runs before everything else in `build`.
    Prepare,
    /// Member of the parallel build set.
    Build,
    /// Runs after `build` in `buildAndWatch`.
    Deploy,
    /// Runs after deploy in `buildAndWatch`.
    Serve,
}

/// The tasks contributed by one concern.
#[derive(Debug, Clone)]
pub struct TaskUnit {
    /// Config path of the concern, e.g. `include.copy.html`.
    pub owner: String,
    pub phase: Phase,
    pub primary: Task,
    pub watches: Vec<Task>,
    /// Sub-tasks exposed by name next to the primary one.
    pub named: Vec<Task>,
}

impl TaskUnit {
    pub(crate) fn new(owner: impl Into<String>, phase: Phase, primary: Task) -> Self {
        Self {
            owner: owner.into(),
            phase,
            primary,
            watches: Vec::new(),
            named: Vec::new(),
        }
    }

    pub(crate) fn with_watch(mut self, task: Task) -> Self {
        self.watches.push(task);
        self
    }

    pub(crate) fn with_named(mut self, task: Task) -> Self {
        self.named.push(task);
        self
    }

    /// Every task this unit registers under its own name.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        std::iter::once(&self.primary)
            .chain(&self.watches)
            .chain(&self.named)
    }
}

/// Shared inputs of the builders.
pub(crate) struct Context<'a> {
    pub toolchain: Arc<dyn Toolchain>,
    pub preset: &'a BundleOptions,
    /// Whether the dev server is part of the pipeline.
    pub serving: bool,
}

/// Build the units of every active concern, in a fixed order.
pub(crate) fn units(include: &Include, cx: &Context) -> Result<Vec<TaskUnit>, ConfigError> {
    let mut units = Vec::new();

    if let Some(globs) = &include.clean {
        units.push(clean::build(globs, cx));
    }
    if let Some(copy) = &include.copy {
        units.extend(copy::build(copy, cx)?);
    }
    if let Some(scss) = &include.scss {
        units.push(styles::build(scss, cx));
    }
    if let Some(ts) = &include.ts {
        units.push(script::build(ts, cx));
    }
    if let Some(deploy) = &include.deploy {
        units.push(deploy::build(deploy, cx));
    }
    if let Some(serve) = &include.serve {
        units.push(serve::build(serve, cx));
    }

    Ok(units)
}

/// A task observing `globs` and running `target` after every change.
pub(crate) fn watch_task(toolchain: &Arc<dyn Toolchain>, name: impl AsRef<str>, globs: Globs, target: Task) -> Task {
    let toolchain = toolchain.clone();

    Task::new(name, move || {
        toolchain.watch(&globs, &|| -> TaskResult {
            let diagnostics = target.run()?;
            tracing::debug!("re-ran {} in {:?}", target.name(), diagnostics.elapsed());
            Ok(())
        })
    })
}
