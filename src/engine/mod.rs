//! Task execution.
//!
//! The scheduler walks a task's [`Plan`] stage by stage. A run stage is
//! executed in place, a parallel stage spawns one scoped thread per member and
//! waits for all of them. Members of a parallel stage may run indefinitely
//! (watchers do), so they are never multiplexed onto a fixed-size pool.
//!
//! A failed stage stops the plan it belongs to. Siblings inside a parallel
//! stage are not cancelled; their failures are collected and reported
//! together once every member has returned.

mod diagnostics;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{LazyLock, Mutex, PoisonError};
use std::time::Instant;

use indicatif::ProgressStyle;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

pub use crate::engine::diagnostics::{Diagnostics, TaskExecution};
use crate::error::TaskError;
use crate::task::{ActionFn, Body, Plan, Stage, Task};
use crate::utils::as_overhead;

static TASK_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_spinner()
        .template("{spinner:.blue} [{elapsed}] {msg}")
        .expect("Error setting progress bar template")
});

pub(crate) struct Runner {
    executions: Mutex<Vec<TaskExecution>>,
}

impl Runner {
    pub(crate) fn new() -> Self {
        Self {
            executions: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn finish(self) -> Diagnostics {
        let mut executions = self
            .executions
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        executions.sort_by_key(|execution| execution.start);
        Diagnostics { executions }
    }

    pub(crate) fn run(&self, task: &Task) -> Result<(), TaskError> {
        match &task.body {
            Body::Noop => Ok(()),
            Body::Action(action) => self.run_action(task.name(), action),
            Body::Plan(plan) => {
                let span = tracing::info_span!("plan", name = task.name());
                span.in_scope(|| self.run_plan(plan))
            }
        }
    }

    fn run_plan(&self, plan: &Plan) -> Result<(), TaskError> {
        for stage in plan.stages() {
            match stage {
                Stage::Run(task) => self.run(task)?,
                Stage::Parallel(tasks) => self.run_parallel(tasks)?,
            }
        }

        Ok(())
    }

    fn run_parallel(&self, tasks: &[Task]) -> Result<(), TaskError> {
        let parent = Span::current();

        let mut failures: Vec<TaskError> = std::thread::scope(|s| {
            let handles: Vec<_> = tasks
                .iter()
                .map(|task| {
                    let parent = parent.clone();
                    let handle = std::thread::Builder::new()
                        .name(task.name().to_string())
                        .spawn_scoped(s, move || parent.in_scope(|| self.run(task)));
                    (task, handle)
                })
                .collect();

            handles
                .into_iter()
                .filter_map(|(task, handle)| {
                    let result = match handle {
                        Ok(handle) => handle.join().unwrap_or_else(|panic| {
                            Err(TaskError::Failed(task.name().into(), panic_error(panic)))
                        }),
                        Err(e) => Err(TaskError::Failed(task.name().into(), e.into())),
                    };
                    result.err()
                })
                .collect()
        });

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(TaskError::Parallel(failures)),
        }
    }

    fn run_action(&self, name: &str, action: &ActionFn) -> Result<(), TaskError> {
        let span = tracing::info_span!("task", name);
        span.pb_set_style(&TASK_STYLE);
        span.pb_set_message(&format!("Running {name}"));
        let _enter = span.enter();

        tracing::debug!("starting '{name}'");
        let start = Instant::now();

        // A panicking action must not take its siblings down with it, it is
        // reported as a failure of this task instead.
        let result = match catch_unwind(AssertUnwindSafe(|| action())) {
            Ok(result) => result,
            Err(panic) => Err(panic_error(panic)),
        };

        self.executions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(TaskExecution {
                name: name.to_string(),
                start,
                duration: start.elapsed(),
                ok: result.is_ok(),
            });

        match result {
            Ok(()) => {
                tracing::info!("finished '{name}' {}", as_overhead(start));
                Ok(())
            }
            Err(e) => {
                tracing::error!("'{name}' failed {}: {e:#}", as_overhead(start));
                Err(TaskError::Failed(name.to_string(), e))
            }
        }
    }
}

fn panic_error(panic: Box<dyn std::any::Any + Send>) -> anyhow::Error {
    let msg = if let Some(s) = panic.downcast_ref::<&str>() {
        format!("Task panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("Task panicked: {s}")
    } else {
        String::from("Task panicked with unknown payload")
    };

    anyhow::anyhow!(msg)
}
