#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use camino::Utf8Path;
use kumitate::config::{BuildConfig, BundleOptions, BundleSpec, Globs, ServeSpec, StyleSpec};
use kumitate::toolchain::{OnChange, OutputCache, Toolchain};
use kumitate::{Assembler, Pipeline, TaskResult};

/// Toolchain that performs nothing and remembers every call.
///
/// `watch` reports one change and returns, so watch tasks terminate.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the call recorded as `event` fail.
    pub fn fail_on(&self, event: impl Into<String>) {
        self.failing.lock().unwrap().insert(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    fn record(&self, event: String) -> TaskResult {
        self.events.lock().unwrap().push(event.clone());

        if self.failing.lock().unwrap().contains(&event) {
            anyhow::bail!("forced failure of {event}");
        }

        Ok(())
    }
}

impl Toolchain for Recorder {
    fn copy(&self, src: &Globs, dest: &Utf8Path) -> TaskResult {
        self.record(format!("copy {src} -> {dest}"))
    }

    fn copy_cached(&self, src: &Globs, dest: &Utf8Path, cache: &OutputCache) -> TaskResult {
        let _ = cache.len();
        self.record(format!("copy_cached {src} -> {dest}"))
    }

    fn delete(&self, targets: &Globs) -> TaskResult {
        self.record(format!("delete {targets}"))
    }

    fn compile_styles(&self, spec: &StyleSpec) -> TaskResult {
        self.record(format!("scss {} -> {}", spec.src, spec.dest))
    }

    fn compile_scripts(&self, src: &Globs, dest: &Utf8Path, tsconfig: &Utf8Path) -> TaskResult {
        self.record(format!("tsc {src} -> {dest} ({tsconfig})"))
    }

    fn bundle(&self, bundle: &BundleSpec, options: &BundleOptions) -> TaskResult {
        self.record(format!(
            "bundle {} -> {} ({})",
            bundle.src,
            bundle.dest,
            options.format.as_str()
        ))
    }

    fn serve(&self, spec: &ServeSpec) -> TaskResult {
        self.record(format!("serve {} on {}", spec.proxy_url(), spec.port))
    }

    fn reload(&self) -> TaskResult {
        self.record("reload".to_string())
    }

    fn watch(&self, globs: &Globs, on_change: OnChange<'_>) -> TaskResult {
        self.record(format!("watch {globs}"))?;

        if let Err(e) = on_change() {
            self.events.lock().unwrap().push(format!("watch error: {e:#}"));
        }

        Ok(())
    }
}

pub fn assemble(recorder: &Arc<Recorder>, json: &str) -> Pipeline {
    try_assemble(recorder, json).unwrap()
}

pub fn try_assemble(recorder: &Arc<Recorder>, json: &str) -> Result<Pipeline, kumitate::AssembleError> {
    let config = BuildConfig::from_json(json).unwrap();
    Assembler::new(recorder.clone()).assemble(&config)
}

/// Task names of every stage of a composed task.
pub fn stage_names(pipeline: &Pipeline, name: &str) -> Vec<Vec<String>> {
    let task = pipeline.task(name).unwrap();

    task.plan()
        .map(|plan| {
            plan.stages()
                .iter()
                .map(|stage| stage.names().into_iter().map(String::from).collect())
                .collect()
        })
        .unwrap_or_default()
}
