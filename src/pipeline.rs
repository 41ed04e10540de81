//! Assembly of the task units into a runnable pipeline.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::builder::{self, Context, Phase, TaskUnit};
use crate::config::{BuildConfig, BundleOptions, Include, validate};
use crate::engine::Diagnostics;
use crate::error::{AssembleError, KumitateError};
use crate::task::{Plan, Stage, Task};
use crate::toolchain::Toolchain;

pub const BUILD: &str = "build";
pub const WATCH: &str = "watch";
pub const BUILD_AND_WATCH: &str = "buildAndWatch";
pub const DEFAULT: &str = "default";

/// Names taken by the compositions. No concern may produce a task under one
/// of them.
pub const RESERVED: [&str; 4] = [BUILD, WATCH, BUILD_AND_WATCH, DEFAULT];

/// Turns a [`BuildConfig`] into a [`Pipeline`] whose tasks act through the
/// given toolchain.
pub struct Assembler {
    toolchain: Arc<dyn Toolchain>,
    preset: BundleOptions,
}

impl Assembler {
    pub fn new(toolchain: Arc<dyn Toolchain>) -> Self {
        Self {
            toolchain,
            preset: BundleOptions::legacy(),
        }
    }

    /// Options for bundles which do not carry their own.
    pub fn with_bundle_preset(mut self, preset: BundleOptions) -> Self {
        self.preset = preset;
        self
    }

    pub fn assemble(&self, config: &BuildConfig) -> Result<Pipeline, AssembleError> {
        self.assemble_include(config.include())
    }

    pub fn assemble_include(&self, include: &Include) -> Result<Pipeline, AssembleError> {
        validate(include)?;

        for key in include.unknown.keys() {
            warn!("ignoring unknown concern 'include.{key}'");
        }

        let cx = Context {
            toolchain: self.toolchain.clone(),
            preset: &self.preset,
            serving: include.serve.is_some(),
        };

        let units = builder::units(include, &cx)?;
        let pipeline = Pipeline::from_units(units)?;

        debug!("assembled {} tasks", pipeline.tasks.len());
        Ok(pipeline)
    }
}

/// Every named task of a build plus the three compositions.
#[derive(Debug, Clone)]
pub struct Pipeline {
    tasks: BTreeMap<String, Task>,
    build: Task,
    watch: Task,
    build_and_watch: Task,
}

impl Pipeline {
    /// Compose the pipeline out of the units, rejecting clashing names.
    pub fn from_units(units: Vec<TaskUnit>) -> Result<Self, AssembleError> {
        let mut tasks = BTreeMap::new();
        let mut owners: BTreeMap<&str, &str> = BTreeMap::new();

        for unit in &units {
            for task in unit.tasks() {
                let name = task.name();

                if RESERVED.contains(&name) {
                    return Err(AssembleError::ReservedName {
                        name: name.to_string(),
                        owner: unit.owner.clone(),
                    });
                }

                if let Some(first) = owners.insert(name, unit.owner.as_str()) {
                    return Err(AssembleError::DuplicateName {
                        name: name.to_string(),
                        first: first.to_string(),
                        second: unit.owner.clone(),
                    });
                }

                tasks.insert(name.to_string(), task.clone());
            }
        }

        let primaries = |phase: Phase| {
            units
                .iter()
                .filter(move |unit| unit.phase == phase)
                .map(|unit| unit.primary.clone())
                .collect::<Vec<_>>()
        };

        let build = Task::sequence(
            BUILD,
            Plan::new()
                .then_all(primaries(Phase::Prepare))
                .then_all(primaries(Phase::Build)),
        );

        let watches: Vec<_> = units.iter().flat_map(|unit| unit.watches.clone()).collect();
        let watch = match watches.is_empty() {
            true => Task::noop(WATCH),
            false => Task::sequence(WATCH, Plan::new().then_all(watches)),
        };

        let build_and_watch = Task::sequence(
            BUILD_AND_WATCH,
            Plan::new()
                .then(build.clone())
                .then_all(primaries(Phase::Deploy))
                .then_all(primaries(Phase::Serve))
                .then(watch.clone()),
        );

        Ok(Self {
            tasks,
            build,
            watch,
            build_and_watch,
        })
    }

    /// The individually invokable tasks, keyed by name.
    pub fn tasks(&self) -> &BTreeMap<String, Task> {
        &self.tasks
    }

    /// Look up a named task or one of the compositions.
    pub fn task(&self, name: &str) -> Option<&Task> {
        match name {
            BUILD => Some(&self.build),
            WATCH => Some(&self.watch),
            BUILD_AND_WATCH | DEFAULT => Some(&self.build_and_watch),
            _ => self.tasks.get(name),
        }
    }

    pub fn build(&self) -> &Task {
        &self.build
    }

    pub fn watch(&self) -> &Task {
        &self.watch
    }

    pub fn build_and_watch(&self) -> &Task {
        &self.build_and_watch
    }

    /// Same task as [`Pipeline::build_and_watch`].
    pub fn default_task(&self) -> &Task {
        &self.build_and_watch
    }

    /// Every name [`Pipeline::task`] accepts.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str).chain(RESERVED)
    }

    /// Run a task by name and wait for it to finish.
    pub fn run(&self, name: &str) -> Result<Diagnostics, KumitateError> {
        let task = self
            .task(name)
            .ok_or_else(|| KumitateError::TaskNotFound(name.to_string()))?;

        Ok(task.run()?)
    }
}

struct Stages<'a>(&'a Task);

impl Display for Stages<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Some(plan) = self.0.plan() else {
            return write!(f, "(nothing)");
        };

        if plan.is_empty() {
            return write!(f, "(nothing)");
        }

        for (i, stage) in plan.stages().iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            match stage {
                Stage::Run(task) => write!(f, "{}", task.name())?,
                Stage::Parallel(tasks) => {
                    let names: Vec<_> = tasks.iter().map(Task::name).collect();
                    write!(f, "[{}]", names.join(", "))?;
                }
            }
        }

        Ok(())
    }
}

impl Display for Pipeline {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Tasks:")?;
        for name in self.tasks.keys() {
            writeln!(f, "  {name}")?;
        }

        writeln!(f, "Compositions:")?;
        writeln!(f, "  {BUILD}: {}", Stages(&self.build))?;
        writeln!(f, "  {WATCH}: {}", Stages(&self.watch))?;
        writeln!(f, "  {BUILD_AND_WATCH}: {}", Stages(&self.build_and_watch))?;
        writeln!(f, "  {DEFAULT}: alias of {BUILD_AND_WATCH}")
    }
}
