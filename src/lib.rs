#![forbid(unsafe_code)]
//! Front-end build pipelines from a declarative config.
//!
//! A [`BuildConfig`] lists the build concerns that are switched on: cleaning,
//! copying assets, compiling SCSS, compiling and bundling TypeScript,
//! deploying the output and serving it with live reload. [`assemble`] turns it
//! into a [`Pipeline`] of named tasks plus three compositions:
//!
//! - `build` runs `clean`, then every build concern in parallel,
//! - `watch` runs every watcher in parallel,
//! - `buildAndWatch` (also `default`) builds, deploys, serves and watches.
//!
//! ```rust,no_run
//! let config = kumitate::BuildConfig::load("kumitate.json")?;
//! let pipeline = kumitate::assemble(&config)?;
//! pipeline.run("build")?;
//! # Ok::<(), kumitate::KumitateError>(())
//! ```
//!
//! All side effects go through the [`Toolchain`] trait. [`Native`] is the
//! implementation used by [`assemble`]; an [`Assembler`] accepts any other.

mod builder;
pub mod config;
mod engine;
mod error;
#[cfg(feature = "logging")]
pub mod logging;
mod pipeline;
pub mod serve;
mod task;
pub mod toolchain;
mod utils;
mod watch;

use std::sync::Arc;

pub use crate::builder::{Phase, TaskUnit};
pub use crate::config::BuildConfig;
pub use crate::engine::{Diagnostics, TaskExecution};
pub use crate::error::*;
pub use crate::pipeline::{Assembler, BUILD, BUILD_AND_WATCH, DEFAULT, Pipeline, RESERVED, WATCH};
pub use crate::task::{Plan, Stage, Task, TaskResult};
pub use crate::toolchain::{Native, Toolchain};

/// Assemble `config` into a pipeline backed by the [`Native`] toolchain and
/// the legacy bundle preset.
pub fn assemble(config: &BuildConfig) -> Result<Pipeline, AssembleError> {
    Assembler::new(Arc::new(Native::default())).assemble(config)
}
