mod common;

use std::sync::Arc;

use common::{Recorder, assemble};
use kumitate::config::{BuildConfig, BundleFormat, BundleOptions};
use kumitate::{Assembler, KumitateError};
use pretty_assertions::assert_eq;

const SITE: &str = r#"{
  "include": {
    "clean": "dist",
    "copy": { "html": ["src/**/*.html", "dist"] },
    "scss": { "src": "styles/main.scss", "dest": "dist/css" },
    "ts": {
      "src": "src/**/*.ts",
      "dest": "build",
      "declarations": { "src": "build/**/*.d.ts", "dest": "types" },
      "rollup": { "src": "build/main.js", "dest": "dist/main.js" },
      "clean": "build"
    }
  }
}"#;

const DEV: &str = r#"{
  "include": {
    "copy": { "html": ["src/**/*.html", "dist"] },
    "deploy": { "src": "dist/**/*", "dest": "../server/public" },
    "serve": { "proxy": "localhost:8080" }
  }
}"#;

const TSC: &str = "tsc src/**/*.ts -> build (tsconfig.json)";
const BUNDLE: &str = "bundle build/main.js -> dist/main.js (iife)";

#[test]
fn build_runs_clean_first_and_orders_the_ts_unit() {
    let recorder = Recorder::new();
    let pipeline = assemble(&recorder, SITE);

    let diagnostics = pipeline.run("build").unwrap();
    let events = recorder.events();

    assert_eq!(events.len(), 7);
    assert_eq!(events[0], "delete dist");

    let at = |event: &str| recorder.position(event).unwrap();
    assert!(at(TSC) < at(BUNDLE));
    assert!(at(TSC) < at("copy build/**/*.d.ts -> types"));
    assert!(at(BUNDLE) < at("delete build"));
    assert!(at("copy build/**/*.d.ts -> types") < at("delete build"));

    assert_eq!(diagnostics.executions.len(), 7);
    assert_eq!(diagnostics.names()[0], "clean");
    assert!(diagnostics.executions.iter().all(|execution| execution.ok));
}

#[test]
fn build_never_runs_watchers() {
    let recorder = Recorder::new();
    assemble(&recorder, SITE).run("build").unwrap();

    assert!(!recorder.events().iter().any(|event| event.starts_with("watch")));
}

#[test]
fn failing_step_stops_its_sequence_and_names_the_task() {
    let recorder = Recorder::new();
    recorder.fail_on(TSC);
    let pipeline = assemble(&recorder, SITE);

    let error = pipeline.run("build").unwrap_err();

    match &error {
        KumitateError::Task(task) => assert_eq!(task.failed_tasks(), vec!["tsCompile"]),
        other => panic!("expected a task failure, got {other:?}"),
    }
    assert!(error.to_string().contains("tsCompile"));

    let events = recorder.events();
    assert!(!events.iter().any(|event| event.starts_with("bundle")));
    assert!(!events.contains(&"delete build".to_string()));

    // siblings in the parallel build stage still ran
    assert!(events.contains(&"copy src/**/*.html -> dist".to_string()));
    assert!(events.contains(&"scss styles/main.scss -> dist/css".to_string()));
}

#[test]
fn failing_clean_skips_the_build_stage() {
    let recorder = Recorder::new();
    recorder.fail_on("delete dist");

    let error = assemble(&recorder, SITE).run("build").unwrap_err();

    assert!(matches!(error, KumitateError::Task(_)));
    assert_eq!(recorder.events(), vec!["delete dist"]);
}

#[test]
fn parallel_failures_are_collected() {
    let recorder = Recorder::new();
    recorder.fail_on("copy src/**/*.html -> dist");
    recorder.fail_on("scss styles/main.scss -> dist/css");

    let error = assemble(&recorder, SITE).run("build").unwrap_err();

    let KumitateError::Task(task) = error else {
        panic!("expected a task failure");
    };
    let mut failed = task.failed_tasks();
    failed.sort();
    assert_eq!(failed, vec!["html", "scss"]);

    // the ts unit is not cancelled by its failing siblings
    assert!(recorder.position("delete build").is_some());
}

#[test]
fn build_and_watch_deploys_then_serves_then_watches() {
    let recorder = Recorder::new();
    let pipeline = assemble(&recorder, DEV);

    pipeline.run("default").unwrap();

    let at = |event: &str| recorder.position(event).unwrap();
    assert!(at("copy src/**/*.html -> dist") < at("copy dist/**/* -> ../server/public"));
    assert!(at("copy dist/**/* -> ../server/public") < at("serve http://localhost:8080 on 3000"));
    assert!(at("serve http://localhost:8080 on 3000") < at("watch dist/**/*"));
    assert!(at("serve http://localhost:8080 on 3000") < at("watch src/**/*.html"));
}

#[test]
fn deploy_watch_with_serve_uses_the_cache_and_reloads() {
    let recorder = Recorder::new();
    let pipeline = assemble(&recorder, DEV);

    pipeline.run("deployWatch").unwrap();

    assert_eq!(
        recorder.events(),
        vec![
            "watch dist/**/*",
            "copy_cached dist/**/* -> ../server/public",
            "reload",
        ]
    );
}

#[test]
fn deploy_watch_without_serve_copies_again() {
    let recorder = Recorder::new();
    let pipeline = assemble(
        &recorder,
        r#"{ "include": { "deploy": { "src": "dist/**/*", "dest": "public" } } }"#,
    );

    pipeline.run("watch").unwrap();

    assert_eq!(
        recorder.events(),
        vec!["watch dist/**/*", "copy dist/**/* -> public"]
    );
}

#[test]
fn watchers_rerun_their_targets() {
    let recorder = Recorder::new();
    let pipeline = assemble(&recorder, SITE);

    pipeline.run("rollupWatch").unwrap();
    pipeline.run("tsWatch").unwrap();
    pipeline.run("htmlWatch").unwrap();

    assert_eq!(
        recorder.events(),
        vec![
            "watch build/**/*, !dist/main.js",
            BUNDLE,
            "watch src/**/*.ts",
            TSC,
            "watch src/**/*.html",
            "copy src/**/*.html -> dist",
        ]
    );
}

#[test]
fn failed_rerun_keeps_the_watcher_alive() {
    let recorder = Recorder::new();
    recorder.fail_on("scss styles/main.scss -> dist/css");
    let pipeline = assemble(&recorder, SITE);

    pipeline.run("scssWatch").unwrap();

    let events = recorder.events();
    assert_eq!(events.len(), 3);
    assert!(events[2].starts_with("watch error: Task 'scss' failed"));
}

#[test]
fn sub_tasks_run_on_their_own() {
    let recorder = Recorder::new();
    let pipeline = assemble(&recorder, SITE);

    let diagnostics = pipeline.run("ts").unwrap();
    let mut names = diagnostics.names();
    names[1..3].sort();
    assert_eq!(names, vec!["tsCompile", "declarations", "rollup", "tsClean"]);

    pipeline.run("declarations").unwrap();
    assert_eq!(
        recorder.events().last().map(String::as_str),
        Some("copy build/**/*.d.ts -> types")
    );
}

#[test]
fn unknown_task_is_reported() {
    let pipeline = assemble(&Recorder::new(), SITE);

    let error = pipeline.run("lint").unwrap_err();
    assert!(matches!(error, KumitateError::TaskNotFound(name) if name == "lint"));
}

#[test]
fn bundle_preset_is_injected() {
    let recorder = Recorder::new();
    let config = BuildConfig::from_json(
        r#"{ "include": { "ts": {
            "src": "src/**/*.ts", "dest": "build",
            "rollup": {
                "app": { "src": "build/app.js", "dest": "dist/app.js" },
                "lib": { "src": "build/lib.js", "dest": "dist/lib.js", "options": { "format": "cjs" } }
            }
        } } }"#,
    )
    .unwrap();

    let preset = BundleOptions {
        format: BundleFormat::Esm,
        ..BundleOptions::legacy()
    };
    let pipeline = Assembler::new(recorder.clone())
        .with_bundle_preset(preset)
        .assemble(&config)
        .unwrap();

    pipeline.run("appRollup").unwrap();
    pipeline.run("libRollup").unwrap();

    assert_eq!(
        recorder.events(),
        vec![
            "bundle build/app.js -> dist/app.js (esm)",
            "bundle build/lib.js -> dist/lib.js (cjs)",
        ]
    );
}

#[test]
fn pipelines_are_independent() {
    let first = Recorder::new();
    let second = Recorder::new();
    let a = assemble(&first, SITE);
    let b = Arc::new(assemble(&second, SITE));

    a.run("html").unwrap();

    assert_eq!(first.events().len(), 1);
    assert!(second.events().is_empty());
    assert_eq!(b.tasks().len(), a.tasks().len());
}
