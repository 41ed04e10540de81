//! The external capabilities a pipeline is built from.
//!
//! The assembler only decides *what* runs and in which order. Every actual
//! side effect goes through a [`Toolchain`], so the same pipeline can be
//! driven by the [`Native`] implementation or by a recording fake in tests.

mod cache;
mod files;
mod native;

use camino::Utf8Path;

pub use crate::toolchain::cache::OutputCache;
pub use crate::toolchain::native::Native;
use crate::config::{BundleOptions, BundleSpec, Globs, ServeSpec, StyleSpec};
use crate::task::TaskResult;

/// Callback invoked by [`Toolchain::watch`] after each relevant change.
pub type OnChange<'a> = &'a (dyn Fn() -> TaskResult + Sync);

pub trait Toolchain: Send + Sync {
    /// Copy every file matched by `src` into `dest`, keeping paths relative
    /// to the glob base.
    fn copy(&self, src: &Globs, dest: &Utf8Path) -> TaskResult;

    /// Like [`Toolchain::copy`], skipping files whose content did not change
    /// since the last call with the same cache.
    fn copy_cached(&self, src: &Globs, dest: &Utf8Path, cache: &OutputCache) -> TaskResult;

    /// Delete files and directories matched by `targets`.
    fn delete(&self, targets: &Globs) -> TaskResult;

    fn compile_styles(&self, spec: &StyleSpec) -> TaskResult;

    /// Compile the typed sources into `dest` using a compiler project file.
    ///
    /// The project file decides which sources are compiled. `src` does not
    /// narrow the compile, an empty match only skips it.
    fn compile_scripts(&self, src: &Globs, dest: &Utf8Path, tsconfig: &Utf8Path) -> TaskResult;

    fn bundle(&self, bundle: &BundleSpec, options: &BundleOptions) -> TaskResult;

    /// Start the live-reload dev server and return once it is listening.
    fn serve(&self, spec: &ServeSpec) -> TaskResult;

    /// Tell connected browsers to reload.
    fn reload(&self) -> TaskResult;

    /// Observe `globs` and call `on_change` after every change. Blocks for as
    /// long as the observation lasts. Failures of `on_change` are reported
    /// and do not end the observation.
    fn watch(&self, globs: &Globs, on_change: OnChange<'_>) -> TaskResult;
}
