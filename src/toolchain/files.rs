use std::collections::BTreeMap;
use std::fs;

use anyhow::bail;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use glob::Pattern;

use crate::config::Globs;

/// A file selected by a glob, with its path relative to the glob base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Matched {
    pub path: Utf8PathBuf,
    pub relative: Utf8PathBuf,
}

fn is_magic(component: &str) -> bool {
    component.contains(['*', '?', '['])
}

/// Static part of a pattern, i.e. every component before the first wildcard.
/// A pattern without wildcards is its own base.
pub(crate) fn glob_base(pattern: &str) -> Utf8PathBuf {
    Utf8Path::new(pattern)
        .components()
        .take_while(|component| !is_magic(component.as_str()))
        .collect()
}

fn without_cur_dir(path: &Utf8Path) -> Utf8PathBuf {
    path.components()
        .filter(|component| !matches!(component, Utf8Component::CurDir))
        .collect()
}

/// Path of `path` below `base`. Leading `./` on either side is ignored.
fn relative_to(path: &Utf8Path, base: &Utf8Path) -> anyhow::Result<Utf8PathBuf> {
    let path = without_cur_dir(path);
    let base = without_cur_dir(base);

    match path.strip_prefix(&base) {
        Ok(relative) => Ok(relative.to_owned()),
        Err(_) => bail!("matched {path} lies outside of the glob base {base}"),
    }
}

/// Expand `globs` into the files they select, sorted and without duplicates.
///
/// A pattern naming an existing directory selects everything below it. Files
/// matched by any `!` pattern are dropped.
pub(crate) fn expand(globs: &Globs) -> anyhow::Result<Vec<Matched>> {
    let excludes = globs
        .excludes()
        .map(Pattern::new)
        .collect::<Result<Vec<_>, _>>()?;

    let mut found = BTreeMap::new();

    for pattern in globs.includes() {
        let (pattern, base) = match Utf8Path::new(pattern) {
            dir if !is_magic(pattern) && dir.is_dir() => (dir.join("**/*").into_string(), dir.to_owned()),
            file if !is_magic(pattern) => {
                let base = file.parent().unwrap_or(Utf8Path::new("")).to_owned();
                (pattern.to_string(), base)
            }
            _ => (pattern.to_string(), glob_base(pattern)),
        };

        for entry in glob::glob(&pattern)? {
            let path = Utf8PathBuf::try_from(entry?)?;

            if !path.is_file() || excludes.iter().any(|exclude| exclude.matches_path(path.as_std_path())) {
                continue;
            }

            let relative = relative_to(&path, &base)?;

            found.entry(path.clone()).or_insert(Matched { path, relative });
        }
    }

    Ok(found.into_values().collect())
}

/// Paths matched by `globs`, files and directories alike, for deletion.
pub(crate) fn expand_any(globs: &Globs) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let excludes = globs
        .excludes()
        .map(Pattern::new)
        .collect::<Result<Vec<_>, _>>()?;

    let mut found = Vec::new();
    for pattern in globs.includes() {
        for entry in glob::glob(pattern)? {
            let path = Utf8PathBuf::try_from(entry?)?;
            if !excludes.iter().any(|exclude| exclude.matches_path(path.as_std_path())) {
                found.push(path);
            }
        }
    }

    // Parents sort before their children, removing them first makes the
    // children vanish, which `remove` tolerates.
    found.sort();
    found.dedup();
    Ok(found)
}

/// Copy one file, creating the parent directories of the target.
pub(crate) fn copy_file(from: &Utf8Path, to: &Utf8Path) -> std::io::Result<()> {
    if let Some(dir) = to.parent() {
        fs::create_dir_all(dir)?;
    }

    fs::copy(from, to)?;
    Ok(())
}

/// Write `data` to `to`, creating the parent directories.
#[cfg(any(feature = "grass", test))]
pub(crate) fn write_file(to: &Utf8Path, data: impl AsRef<[u8]>) -> std::io::Result<()> {
    if let Some(dir) = to.parent() {
        fs::create_dir_all(dir)?;
    }

    fs::write(to, data)
}

/// Remove a file or a whole directory. Missing paths are not an error.
pub(crate) fn remove(path: &Utf8Path) -> std::io::Result<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) => Err(e),
    };

    match result {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
