use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

/// Timing of one leaf action.
#[derive(Debug, Clone)]
pub struct TaskExecution {
    pub name: String,
    pub start: Instant,
    pub duration: Duration,
    pub ok: bool,
}

/// Execution metrics of a task run, ordered by start time.
///
/// Only leaf actions are recorded. Compositions have no work of their own.
#[derive(Debug, Default)]
pub struct Diagnostics {
    pub executions: Vec<TaskExecution>,
}

impl Diagnostics {
    /// Names of the executed actions, in the order they started.
    pub fn names(&self) -> Vec<&str> {
        self.executions
            .iter()
            .map(|execution| execution.name.as_str())
            .collect()
    }

    /// Wall time from the first start to the last finish.
    pub fn elapsed(&self) -> Duration {
        let Some(first) = self.executions.first() else {
            return Duration::ZERO;
        };

        self.executions
            .iter()
            .map(|execution| execution.start + execution.duration)
            .max()
            .map(|end| end.duration_since(first.start))
            .unwrap_or_default()
    }
}

fn format_duration(duration: Duration) -> String {
    let micros = duration.as_micros() as f64;
    if micros < 1000.0 {
        format!("{micros:.0}µs")
    } else {
        format!("{:.2}ms", micros / 1000.0)
    }
}

/// Renders a plain-text waterfall: one row per action with its offset from
/// the first start and its duration.
impl Display for Diagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Some(first) = self.executions.first() else {
            return writeln!(f, "No tasks ran");
        };

        let width = self
            .executions
            .iter()
            .map(|execution| execution.name.len())
            .max()
            .unwrap_or(0);

        for execution in &self.executions {
            let offset = execution.start.duration_since(first.start);
            let status = if execution.ok { "ok" } else { "FAILED" };
            writeln!(
                f,
                "{:<width$}  +{:>10}  {:>10}  {status}",
                execution.name,
                format_duration(offset),
                format_duration(execution.duration),
            )?;
        }

        writeln!(f, "total {}", format_duration(self.elapsed()))
    }
}
