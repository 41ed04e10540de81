//! Tasks and their composition.
//!
//! A [`Task`] is a named unit of work. Its body is either a leaf action, a
//! [`Plan`] of other tasks, or nothing at all. Plans are plain data: an
//! ordered list of [`Stage`]s, each of which runs one task or a group of
//! tasks concurrently. Building a plan never runs anything; execution is the
//! job of the [`engine`](crate::engine).

use std::fmt::Debug;
use std::sync::Arc;

use crate::engine::{Diagnostics, Runner};
use crate::error::TaskError;

/// Result of a single leaf action.
pub type TaskResult<T = ()> = anyhow::Result<T>;

/// Leaf action. Every task shape, whether it copies files or starts a server,
/// reports completion the same way: by returning.
pub(crate) type ActionFn = Arc<dyn Fn() -> TaskResult + Send + Sync>;

#[derive(Clone)]
pub(crate) enum Body {
    Action(ActionFn),
    Plan(Arc<Plan>),
    Noop,
}

#[derive(Clone)]
pub struct Task {
    name: Arc<str>,
    pub(crate) body: Body,
}

impl Task {
    pub fn new<F>(name: impl AsRef<str>, action: F) -> Self
    where
        F: Fn() -> TaskResult + Send + Sync + 'static,
    {
        Self {
            name: name.as_ref().into(),
            body: Body::Action(Arc::new(action)),
        }
    }

    /// A task which runs the stages of `plan` in order.
    pub fn sequence(name: impl AsRef<str>, plan: Plan) -> Self {
        Self {
            name: name.as_ref().into(),
            body: Body::Plan(Arc::new(plan)),
        }
    }

    /// A task which completes immediately.
    pub fn noop(name: impl AsRef<str>) -> Self {
        Self {
            name: name.as_ref().into(),
            body: Body::Noop,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The plan behind a composed task.
    pub fn plan(&self) -> Option<&Plan> {
        match &self.body {
            Body::Plan(plan) => Some(plan),
            _ => None,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self.body, Body::Noop)
    }

    /// Run this task to completion on the calling thread.
    pub fn run(&self) -> Result<Diagnostics, TaskError> {
        let runner = Runner::new();
        runner.run(self)?;
        Ok(runner.finish())
    }
}

impl Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.body {
            Body::Action(_) => write!(f, "Task({})", self.name),
            Body::Plan(plan) => write!(f, "Task({}, {:?})", self.name, plan),
            Body::Noop => write!(f, "Task({}, noop)", self.name),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Stage {
    /// Run one task.
    Run(Task),
    /// Run every task concurrently and wait for all of them.
    Parallel(Vec<Task>),
}

impl Stage {
    pub fn tasks(&self) -> &[Task] {
        match self {
            Stage::Run(task) => std::slice::from_ref(task),
            Stage::Parallel(tasks) => tasks,
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.tasks().iter().map(Task::name).collect()
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, Stage::Parallel(_))
    }
}

/// Ordered list of stages.
#[derive(Clone, Debug, Default)]
pub struct Plan {
    stages: Vec<Stage>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, task: Task) -> Self {
        self.stages.push(Stage::Run(task));
        self
    }

    pub fn then_maybe(self, task: Option<Task>) -> Self {
        match task {
            Some(task) => self.then(task),
            None => self,
        }
    }

    /// Add a concurrent group. An empty group adds nothing and a group of one
    /// becomes a plain run stage.
    pub fn then_all(mut self, tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut tasks: Vec<Task> = tasks.into_iter().collect();
        match tasks.len() {
            0 => {}
            1 => self.stages.extend(tasks.pop().map(Stage::Run)),
            _ => self.stages.push(Stage::Parallel(tasks)),
        }
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Name of the watch task derived from a primary task.
pub(crate) fn watch_name(base: &str) -> String {
    format!("{base}Watch")
}

/// Name of a bundle task in the multi-bundle form.
pub(crate) fn rollup_name(bundle: &str) -> String {
    format!("{bundle}Rollup")
}
