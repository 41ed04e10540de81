//! File observation for the watch tasks.
//!
//! Each glob is split into a static root, which is watched recursively, and an
//! absolute pattern used to filter the debounced events. Roots nested inside
//! other roots are dropped since the watcher is recursive anyway.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::bail;
use camino::{Utf8Path, Utf8PathBuf};
use glob::Pattern;
use notify::RecursiveMode;
use notify_debouncer_full::new_debouncer;
use tracing::{debug, error, info, warn};

use crate::config::Globs;
use crate::toolchain::OnChange;

const DEBOUNCE: Duration = Duration::from_millis(250);

/// Watch the files selected by `globs` and call `on_change` once per batch of
/// relevant events. Blocks until the underlying watcher shuts down.
pub(crate) fn observe(globs: &Globs, on_change: OnChange<'_>) -> anyhow::Result<()> {
    let mut roots = HashSet::new();
    let mut filters = Vec::new();

    for glob in globs.includes() {
        match resolve_watch_path(glob) {
            Ok((root, pattern)) => {
                roots.insert(root);
                filters.push(pattern);
            }
            Err(e) => warn!("cannot watch {glob}: {e}"),
        }
    }

    if roots.is_empty() {
        bail!("none of {globs} can be watched");
    }

    let excludes = globs
        .excludes()
        .map(absolute_pattern)
        .collect::<anyhow::Result<Vec<_>>>()?;

    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(DEBOUNCE, None, tx)?;

    for root in collapse_watch_paths(roots) {
        debug!("watching {root}");
        debouncer.watch(&root, RecursiveMode::Recursive)?;
    }

    for result in rx {
        let events = match result {
            Ok(events) => events,
            Err(errors) => {
                error!("watch error: {errors:?}");
                continue;
            }
        };

        let relevant = events
            .iter()
            .flat_map(|event| &event.event.paths)
            .any(|path| {
                filters.iter().any(|filter| filter.matches_path(path))
                    && !excludes.iter().any(|exclude| exclude.matches_path(path))
            });

        if !relevant {
            continue;
        }

        info!("change detected in {globs}");
        if let Err(e) = on_change() {
            error!("{e:#}");
        }
    }

    Ok(())
}

/// Splits a glob string into a canonicalized static root path (for
/// watching) and a compiled absolute Pattern (for matching).
pub(crate) fn resolve_watch_path(glob_str: impl AsRef<str>) -> anyhow::Result<(Utf8PathBuf, Pattern)> {
    let path = Utf8Path::new(glob_str.as_ref());

    let components: Vec<_> = path.components().collect();
    let split_idx = components
        .iter()
        .position(|c| c.as_str().contains(['*', '?', '[']))
        .unwrap_or(components.len());

    let root_part: Utf8PathBuf = components.iter().take(split_idx).collect();
    let suffix_part: Utf8PathBuf = components.iter().skip(split_idx).collect();

    let root_part = match root_part.as_str() {
        "" => Utf8PathBuf::from("."),
        _ => root_part,
    };

    // Must exist on disk.
    let absolute_root = root_part.canonicalize_utf8()?;

    let (watch_root, pattern) = match suffix_part.as_str() {
        // A concrete file is watched through its parent so that atomic
        // replacement by editors is still seen.
        "" if absolute_root.is_file() => {
            let parent = absolute_root
                .parent()
                .unwrap_or(&absolute_root)
                .to_path_buf();
            (parent, absolute_root)
        }
        "" => {
            let pattern = absolute_root.join("**");
            (absolute_root, pattern)
        }
        _ => {
            let pattern = absolute_root.join(&suffix_part);
            (absolute_root, pattern)
        }
    };

    let pattern = Pattern::new(pattern.as_str())?;

    Ok((watch_root, pattern))
}

/// Exclusions are written relative to the working directory, the events
/// carry absolute paths.
fn absolute_pattern(glob: &str) -> anyhow::Result<Pattern> {
    let path = Utf8Path::new(glob);
    let pattern = match path.is_absolute() {
        true => path.to_path_buf(),
        false => Utf8PathBuf::try_from(std::env::current_dir()?)?.join(path),
    };

    Ok(Pattern::new(pattern.as_str())?)
}

/// Reduces a set of paths to the minimal set of watch roots.
///
/// If we watch `/a` and `/a/b`, we only need to watch `/a` because
/// the watcher is recursive.
fn collapse_watch_paths(paths: HashSet<Utf8PathBuf>) -> Vec<Utf8PathBuf> {
    let mut paths: Vec<_> = paths.into_iter().collect();
    paths.sort();

    let mut filtered = Vec::new();
    for path in paths {
        if let Some(last) = filtered.last()
            && path.starts_with(last)
        {
            continue;
        }
        filtered.push(path);
    }

    filtered
}
