mod common;

use common::{Recorder, assemble, stage_names, try_assemble};
use kumitate::{AssembleError, ConfigError, Pipeline};
use pretty_assertions::assert_eq;

const FULL: &str = r#"{
  "include": {
    "clean": "dist",
    "copy": {
      "html": ["src/**/*.html", "dist"],
      "images": ["src/img/*", "dist/img"]
    },
    "scss": { "src": "styles/main.scss", "dest": "dist/css", "watchSrc": "styles/**/*.scss" },
    "ts": {
      "src": "src/**/*.ts",
      "dest": "build",
      "declarations": { "src": "build/**/*.d.ts", "dest": "types" },
      "rollup": { "src": "build/main.js", "dest": "dist/main.js" },
      "clean": "build"
    },
    "deploy": { "src": "dist/**/*", "dest": "../server/public" },
    "serve": { "proxy": "localhost:8080" }
  }
}"#;

fn names(pipeline: &Pipeline) -> Vec<&str> {
    pipeline.tasks().keys().map(String::as_str).collect()
}

fn stages(list: &[&[&str]]) -> Vec<Vec<String>> {
    list.iter()
        .map(|stage| stage.iter().map(|name| name.to_string()).collect())
        .collect()
}

#[test]
fn full_config_registers_every_task() {
    let pipeline = assemble(&Recorder::new(), FULL);

    assert_eq!(
        names(&pipeline),
        vec![
            "clean",
            "declarations",
            "declarationsWatch",
            "deploy",
            "deployWatch",
            "html",
            "htmlWatch",
            "images",
            "imagesWatch",
            "rollup",
            "rollupWatch",
            "scss",
            "scssWatch",
            "serve",
            "ts",
            "tsClean",
            "tsCompile",
            "tsWatch",
        ]
    );
}

#[test]
fn full_config_compositions() {
    let pipeline = assemble(&Recorder::new(), FULL);

    assert_eq!(
        stage_names(&pipeline, "build"),
        stages(&[&["clean"], &["html", "images", "scss", "ts"]])
    );
    assert_eq!(
        stage_names(&pipeline, "watch"),
        stages(&[&[
            "htmlWatch",
            "imagesWatch",
            "scssWatch",
            "tsWatch",
            "rollupWatch",
            "declarationsWatch",
            "deployWatch",
        ]])
    );
    assert_eq!(
        stage_names(&pipeline, "buildAndWatch"),
        stages(&[&["build"], &["deploy"], &["serve"], &["watch"]])
    );
}

#[test]
fn default_is_build_and_watch() {
    let pipeline = assemble(&Recorder::new(), FULL);

    assert_eq!(pipeline.task("default").unwrap().name(), "buildAndWatch");
    assert_eq!(pipeline.default_task().name(), "buildAndWatch");
    assert!(pipeline.names().any(|name| name == "default"));
}

#[test]
fn each_copy_entry_adds_two_tasks() {
    let base = assemble(&Recorder::new(), r#"{ "include": { "clean": "dist" } }"#);
    let pipeline = assemble(
        &Recorder::new(),
        r#"{ "include": { "clean": "dist", "copy": {
            "a": ["a/*", "out/a"],
            "b": ["b/*", "out/b"],
            "c": ["c/*", "out/c"]
        } } }"#,
    );

    assert_eq!(pipeline.tasks().len(), base.tasks().len() + 6);
    assert_eq!(
        stage_names(&pipeline, "build"),
        stages(&[&["clean"], &["a", "b", "c"]])
    );
    assert_eq!(stage_names(&pipeline, "watch"), stages(&[&["aWatch", "bWatch", "cWatch"]]));
}

#[test]
fn empty_include_builds_nothing() {
    for json in [r#"{}"#, r#"{ "include": {} }"#, r#"{ "include": { "copy": {} } }"#] {
        let recorder = Recorder::new();
        let pipeline = assemble(&recorder, json);

        assert!(pipeline.tasks().is_empty());
        assert!(pipeline.build().plan().unwrap().is_empty());
        assert!(pipeline.watch().is_noop());
        assert_eq!(
            stage_names(&pipeline, "buildAndWatch"),
            stages(&[&["build"], &["watch"]])
        );

        pipeline.run("default").unwrap();
        assert!(recorder.events().is_empty());
    }
}

#[test]
fn clean_only_has_no_parallel_stage() {
    let pipeline = assemble(&Recorder::new(), r#"{ "include": { "clean": ["dist", "build"] } }"#);

    assert_eq!(names(&pipeline), vec!["clean"]);
    assert_eq!(stage_names(&pipeline, "build"), stages(&[&["clean"]]));
    assert!(!pipeline.build().plan().unwrap().stages()[0].is_parallel());
    assert!(pipeline.watch().is_noop());
}

#[test]
fn single_build_concern_is_a_plain_stage() {
    let pipeline = assemble(
        &Recorder::new(),
        r#"{ "include": { "scss": { "src": "main.scss", "dest": "css" } } }"#,
    );

    let plan = pipeline.build().plan().unwrap();
    assert_eq!(plan.stages().len(), 1);
    assert!(!plan.stages()[0].is_parallel());
    assert_eq!(stage_names(&pipeline, "watch"), stages(&[&["scssWatch"]]));
}

#[test]
fn single_rollup_names() {
    let pipeline = assemble(
        &Recorder::new(),
        r#"{ "include": { "ts": {
            "src": "src/**/*.ts", "dest": "build",
            "rollup": { "src": "build/main.js", "dest": "dist/main.js" }
        } } }"#,
    );

    assert_eq!(
        names(&pipeline),
        vec!["rollup", "rollupWatch", "ts", "tsCompile", "tsWatch"]
    );
    assert_eq!(stage_names(&pipeline, "ts"), stages(&[&["tsCompile"], &["rollup"]]));
}

#[test]
fn multi_rollup_names() {
    let pipeline = assemble(
        &Recorder::new(),
        r#"{ "include": { "ts": {
            "src": "src/**/*.ts", "dest": "build",
            "rollup": {
                "b": { "src": "build/b.js", "dest": "dist/b.js" },
                "a": { "src": "build/a.js", "dest": "dist/a.js" }
            }
        } } }"#,
    );

    let names = names(&pipeline);
    assert_eq!(
        names,
        vec!["aRollup", "aRollupWatch", "bRollup", "bRollupWatch", "ts", "tsCompile", "tsWatch"]
    );
    assert!(!names.contains(&"rollup"));
    assert_eq!(
        stage_names(&pipeline, "ts"),
        stages(&[&["tsCompile"], &["aRollup", "bRollup"]])
    );
}

#[test]
fn declarations_without_rollup() {
    let pipeline = assemble(
        &Recorder::new(),
        r#"{ "include": { "ts": {
            "src": "src/**/*.ts", "dest": "build",
            "declarations": { "src": "build/**/*.d.ts", "dest": "types" },
            "clean": "build"
        } } }"#,
    );

    assert_eq!(
        stage_names(&pipeline, "ts"),
        stages(&[&["tsCompile"], &["declarations"], &["tsClean"]])
    );
}

#[test]
fn bundles_and_declarations_share_a_stage() {
    let pipeline = assemble(&Recorder::new(), FULL);

    let ts = pipeline.task("ts").unwrap().plan().unwrap();
    assert!(ts.stages()[1].is_parallel());
    assert_eq!(
        stage_names(&pipeline, "ts"),
        stages(&[&["tsCompile"], &["rollup", "declarations"], &["tsClean"]])
    );
}

#[test]
fn compile_only_ts() {
    let pipeline = assemble(
        &Recorder::new(),
        r#"{ "include": { "ts": { "src": "src/**/*.ts", "dest": "build" } } }"#,
    );

    assert_eq!(stage_names(&pipeline, "ts"), stages(&[&["tsCompile"]]));
}

#[test]
fn deploy_without_serve() {
    let pipeline = assemble(
        &Recorder::new(),
        r#"{ "include": { "deploy": { "src": "dist/**/*", "dest": "public" } } }"#,
    );

    assert_eq!(
        stage_names(&pipeline, "buildAndWatch"),
        stages(&[&["build"], &["deploy"], &["watch"]])
    );
    assert!(pipeline.build().plan().unwrap().is_empty());
}

#[test]
fn serve_without_deploy() {
    let pipeline = assemble(
        &Recorder::new(),
        r#"{ "include": { "serve": { "proxy": "localhost:8080" } } }"#,
    );

    assert_eq!(names(&pipeline), vec!["serve"]);
    assert_eq!(
        stage_names(&pipeline, "buildAndWatch"),
        stages(&[&["build"], &["serve"], &["watch"]])
    );
}

#[test]
fn assembly_is_deterministic() {
    let first = assemble(&Recorder::new(), FULL);
    let second = assemble(&Recorder::new(), FULL);

    assert_eq!(names(&first), names(&second));
    assert_eq!(stage_names(&first, "watch"), stage_names(&second, "watch"));
    assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn unknown_concerns_are_ignored() {
    let pipeline = assemble(
        &Recorder::new(),
        r#"{ "include": { "clean": "dist", "less": { "src": "a.less" } } }"#,
    );

    assert_eq!(names(&pipeline), vec!["clean"]);
}

#[test]
fn duplicate_names_are_rejected() {
    let result = try_assemble(
        &Recorder::new(),
        r#"{ "include": {
            "copy": { "scss": ["static/*", "dist"] },
            "scss": { "src": "main.scss", "dest": "css" }
        } }"#,
    );

    match result {
        Err(AssembleError::DuplicateName { name, first, second }) => {
            assert_eq!(name, "scss");
            assert_eq!(first, "include.copy.scss");
            assert_eq!(second, "include.scss");
        }
        other => panic!("expected a duplicate name, got {other:?}"),
    }
}

#[test]
fn copy_entry_clashing_with_a_watch_is_rejected() {
    let result = try_assemble(
        &Recorder::new(),
        r#"{ "include": { "copy": {
            "html": ["src/*.html", "dist"],
            "htmlWatch": ["src/*.htm", "dist"]
        } } }"#,
    );

    assert!(matches!(
        result,
        Err(AssembleError::DuplicateName { name, .. }) if name == "htmlWatch"
    ));
}

#[test]
fn reserved_names_are_rejected() {
    for reserved in ["build", "watch", "buildAndWatch", "default"] {
        let json = format!(r#"{{ "include": {{ "copy": {{ "{reserved}": ["a/*", "b"] }} }} }}"#);
        let result = try_assemble(&Recorder::new(), &json);

        match result {
            Err(AssembleError::ReservedName { name, owner }) => {
                assert_eq!(name, reserved);
                assert_eq!(owner, format!("include.copy.{reserved}"));
            }
            other => panic!("expected a reserved name error, got {other:?}"),
        }
    }
}

fn shape_error(json: &str) -> (String, String) {
    match try_assemble(&Recorder::new(), json) {
        Err(AssembleError::Config(ConfigError::Shape { concern, reason })) => (concern, reason),
        other => panic!("expected a shape error, got {other:?}"),
    }
}

#[test]
fn copy_entry_without_destination_is_rejected() {
    let (concern, reason) = shape_error(r#"{ "include": { "copy": { "html": "src/*.html" } } }"#);

    assert_eq!(concern, "include.copy.html");
    assert_eq!(reason, "missing destination");
}

#[test]
fn half_tls_pair_is_rejected() {
    let (concern, _) = shape_error(
        r#"{ "include": { "serve": { "proxy": "localhost:8080", "sslKey": "key.pem" } } }"#,
    );

    assert!(concern.starts_with("include.serve"));
}

#[test]
fn invalid_glob_is_rejected() {
    let (concern, _) = shape_error(r#"{ "include": { "clean": "dist/[oops" } }"#);

    assert_eq!(concern, "include.clean");
}

#[test]
fn pipeline_display_lists_compositions() {
    let pipeline = assemble(&Recorder::new(), FULL);
    let text = pipeline.to_string();

    assert!(text.contains("  build: clean -> [html, images, scss, ts]\n"));
    assert!(text.contains("  buildAndWatch: build -> deploy -> serve -> watch\n"));
    assert!(text.contains("  default: alias of buildAndWatch"));

    let empty = assemble(&Recorder::new(), "{}").to_string();
    assert!(empty.contains("  watch: (nothing)\n"));
}
