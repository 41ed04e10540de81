use std::process::{Command, Stdio};
use std::sync::OnceLock;

use anyhow::{Context, bail};
use camino::Utf8Path;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, warn};

use crate::config::{BundleOptions, BundleSpec, Globs, ServeSpec, StyleSpec};
use crate::serve::LiveReload;
use crate::task::TaskResult;
use crate::toolchain::cache::{Hash32, OutputCache};
use crate::toolchain::files::{self, copy_file};
use crate::toolchain::{OnChange, Toolchain};

/// Toolchain backed by the local file system and the usual front-end
/// executables.
///
/// Styles are compiled in process with `grass`. TypeScript and bundling shell
/// out to `tsc` and `esbuild`, which must be available in `PATH` unless
/// overridden with [`Native::with_tsc`] and [`Native::with_esbuild`].
pub struct Native {
    tsc: String,
    esbuild: String,
    reload: OnceLock<LiveReload>,
}

impl Native {
    pub fn new() -> Self {
        Self {
            tsc: "tsc".to_string(),
            esbuild: "esbuild".to_string(),
            reload: OnceLock::new(),
        }
    }

    pub fn with_tsc(mut self, program: impl Into<String>) -> Self {
        self.tsc = program.into();
        self
    }

    pub fn with_esbuild(mut self, program: impl Into<String>) -> Self {
        self.esbuild = program.into();
        self
    }

    /// The live-reload hub, started on first use.
    #[cfg(feature = "server")]
    fn live_reload(&self, port: Option<u16>) -> anyhow::Result<&LiveReload> {
        if let Some(hub) = self.reload.get() {
            return Ok(hub);
        }

        let hub = LiveReload::start(port).context("starting the live-reload server")?;
        Ok(self.reload.get_or_init(|| hub))
    }
}

impl Default for Native {
    fn default() -> Self {
        Self::new()
    }
}

impl Toolchain for Native {
    fn copy(&self, src: &Globs, dest: &Utf8Path) -> TaskResult {
        let matched = files::expand(src)?;

        matched.par_iter().try_for_each(|file| {
            copy_file(&file.path, &dest.join(&file.relative))
                .with_context(|| format!("copying {} to {dest}", file.path))
        })?;

        debug!("copied {} files from {src} to {dest}", matched.len());
        Ok(())
    }

    fn copy_cached(&self, src: &Globs, dest: &Utf8Path, cache: &OutputCache) -> TaskResult {
        let matched = files::expand(src)?;

        let written = matched
            .par_iter()
            .map(|file| -> anyhow::Result<usize> {
                let target = dest.join(&file.relative);
                let hash = Hash32::hash_file(&file.path)
                    .with_context(|| format!("hashing {}", file.path))?;

                if cache.is_current(&target, hash) {
                    return Ok(0);
                }

                copy_file(&file.path, &target)
                    .with_context(|| format!("copying {} to {dest}", file.path))?;
                cache.record(&target, hash);
                Ok(1)
            })
            .try_reduce(|| 0, |a, b| Ok(a + b))?;

        debug!(
            "copied {written} of {} files from {src} to {dest}",
            matched.len()
        );
        Ok(())
    }

    fn delete(&self, targets: &Globs) -> TaskResult {
        let paths = files::expand_any(targets)?;

        for path in &paths {
            files::remove(path).with_context(|| format!("deleting {path}"))?;
        }

        debug!("deleted {} paths matching {targets}", paths.len());
        Ok(())
    }

    #[cfg(feature = "grass")]
    fn compile_styles(&self, spec: &StyleSpec) -> TaskResult {
        // Partials are only ever pulled in through `@use` and `@import`.
        let matched: Vec<_> = files::expand(&spec.src)?
            .into_iter()
            .filter(|file| !file.path.file_name().is_some_and(|name| name.starts_with('_')))
            .collect();

        matched.par_iter().try_for_each(|file| -> anyhow::Result<()> {
            let mut options = grass::Options::default();
            if spec.options.compressed {
                options = options.style(grass::OutputStyle::Compressed);
            }
            for path in &spec.options.load_paths {
                options = options.load_path(path);
            }

            let css = grass::from_path(&file.path, &options)
                .map_err(|e| anyhow::anyhow!("{}: {e}", file.path))?;
            let target = spec.dest.join(&file.relative).with_extension("css");
            files::write_file(&target, css).with_context(|| format!("writing {target}"))?;
            Ok(())
        })?;

        debug!("compiled {} style sheets into {}", matched.len(), spec.dest);
        Ok(())
    }

    #[cfg(not(feature = "grass"))]
    fn compile_styles(&self, _: &StyleSpec) -> TaskResult {
        bail!("style compilation requires the `grass` feature")
    }

    fn compile_scripts(&self, src: &Globs, dest: &Utf8Path, tsconfig: &Utf8Path) -> TaskResult {
        // The compiler reads its inputs from the project file, the glob only
        // tells us whether there is anything to compile.
        if files::expand(src)?.is_empty() {
            warn!("no sources match {src}, skipping compilation");
            return Ok(());
        }

        let output = Command::new(&self.tsc)
            .arg("--project")
            .arg(tsconfig.as_str())
            .arg("--outDir")
            .arg(dest.as_str())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("running {}", self.tsc))?;

        if !output.status.success() {
            // tsc reports diagnostics on stdout
            bail!(
                "{} exited with {}:\n{}{}",
                self.tsc,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr),
            );
        }

        Ok(())
    }

    fn bundle(&self, bundle: &BundleSpec, options: &BundleOptions) -> TaskResult {
        if let Some(dir) = bundle.dest.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let mut command = Command::new(&self.esbuild);
        command
            .arg(bundle.src.as_str())
            .arg("--bundle")
            .arg(format!("--outfile={}", bundle.dest))
            .arg(format!("--format={}", options.format.as_str()))
            .arg(format!("--target={}", options.target));

        if options.minify {
            command.arg("--minify");
        }
        if options.sourcemap {
            command.arg("--sourcemap");
        }
        if let Some(name) = &options.global_name {
            command.arg(format!("--global-name={name}"));
        }
        for module in &options.external {
            command.arg(format!("--external:{module}"));
        }

        let output = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("running {}", self.esbuild))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}:\n{}",
                self.esbuild,
                output.status,
                String::from_utf8_lossy(&output.stderr),
            );
        }

        Ok(())
    }

    #[cfg(feature = "server")]
    fn serve(&self, spec: &ServeSpec) -> TaskResult {
        let hub = self.live_reload(spec.reload_port)?;
        crate::serve::start(spec, hub.port())?;
        Ok(())
    }

    #[cfg(not(feature = "server"))]
    fn serve(&self, _: &ServeSpec) -> TaskResult {
        bail!("serving requires the `server` feature")
    }

    fn reload(&self) -> TaskResult {
        match self.reload.get() {
            Some(hub) => hub.broadcast(),
            None => {
                debug!("live reload is not running, nothing to notify");
                Ok(())
            }
        }
    }

    fn watch(&self, globs: &Globs, on_change: OnChange<'_>) -> TaskResult {
        info!("watching {globs}");
        crate::watch::observe(globs, on_change)
    }
}
