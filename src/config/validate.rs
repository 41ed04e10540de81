use camino::Utf8Path;

use crate::config::model::{
    BundleSpec, CopySpec, Globs, Include, RollupSpec, ScriptSpec, ServeSpec, StyleSpec,
};
use crate::error::ConfigError;

/// Check the shape of every active concern.
///
/// This catches what the type system cannot: empty paths, copy entries
/// without a destination, glob syntax errors, a half-configured TLS pair and
/// proxy targets the dev server cannot reach. Unknown keys are not errors.
pub fn validate(include: &Include) -> Result<(), ConfigError> {
    if let Some(clean) = &include.clean {
        validate_globs("include.clean", clean)?;
    }

    if let Some(copy) = &include.copy {
        validate_copy(copy)?;
    }

    if let Some(scss) = &include.scss {
        validate_styles(scss)?;
    }

    if let Some(ts) = &include.ts {
        validate_scripts(ts)?;
    }

    if let Some(deploy) = &include.deploy {
        validate_globs("include.deploy.src", &deploy.src)?;
        validate_path("include.deploy.dest", &deploy.dest)?;
    }

    if let Some(serve) = &include.serve {
        validate_serve(serve)?;
    }

    Ok(())
}

fn validate_copy(copy: &CopySpec) -> Result<(), ConfigError> {
    for (name, entry) in copy {
        if name.trim().is_empty() {
            return Err(ConfigError::shape(
                "include.copy",
                "copy task names must not be empty",
            ));
        }

        let concern = format!("include.copy.{name}");
        validate_globs(&concern, &entry.src)?;

        match &entry.dest {
            Some(dest) => validate_path(&concern, dest)?,
            None => return Err(ConfigError::shape(concern, "missing destination")),
        }
    }

    Ok(())
}

fn validate_styles(scss: &StyleSpec) -> Result<(), ConfigError> {
    validate_globs("include.scss.src", &scss.src)?;
    validate_path("include.scss.dest", &scss.dest)?;

    if let Some(watch_src) = &scss.watch_src {
        validate_globs("include.scss.watchSrc", watch_src)?;
    }

    Ok(())
}

fn validate_scripts(ts: &ScriptSpec) -> Result<(), ConfigError> {
    validate_globs("include.ts.src", &ts.src)?;
    validate_path("include.ts.dest", &ts.dest)?;
    validate_path("include.ts.tsconfig", &ts.tsconfig)?;

    if let Some(declarations) = &ts.declarations {
        validate_globs("include.ts.declarations.src", &declarations.src)?;
        validate_path("include.ts.declarations.dest", &declarations.dest)?;
    }

    if let Some(clean) = &ts.clean {
        validate_globs("include.ts.clean", clean)?;
    }

    match &ts.rollup {
        Some(RollupSpec::Single(bundle)) => validate_bundle("include.ts.rollup", bundle)?,
        Some(RollupSpec::Multi(bundles)) => {
            for (name, bundle) in bundles {
                if name.trim().is_empty() {
                    return Err(ConfigError::shape(
                        "include.ts.rollup",
                        "bundle names must not be empty",
                    ));
                }
                validate_bundle(&format!("include.ts.rollup.{name}"), bundle)?;
            }
        }
        None => {}
    }

    Ok(())
}

fn validate_bundle(concern: &str, bundle: &BundleSpec) -> Result<(), ConfigError> {
    validate_path(&format!("{concern}.src"), &bundle.src)?;
    validate_path(&format!("{concern}.dest"), &bundle.dest)?;

    if let Some(watch) = &bundle.watch {
        validate_globs(&format!("{concern}.watch"), watch)?;
    }

    Ok(())
}

fn validate_serve(serve: &ServeSpec) -> Result<(), ConfigError> {
    let proxy = serve.proxy.trim();
    if proxy.is_empty() {
        return Err(ConfigError::shape("include.serve.proxy", "missing proxy target"));
    }

    if proxy.contains("://") && !proxy.starts_with("http://") {
        return Err(ConfigError::shape(
            "include.serve.proxy",
            format!("unsupported proxy target '{proxy}', expected an http:// URL"),
        ));
    }

    match (&serve.ssl_key, &serve.ssl_cert) {
        (Some(_), None) => Err(ConfigError::shape(
            "include.serve",
            "sslKey is set but sslCert is missing",
        )),
        (None, Some(_)) => Err(ConfigError::shape(
            "include.serve",
            "sslCert is set but sslKey is missing",
        )),
        _ => Ok(()),
    }
}

fn validate_globs(concern: &str, globs: &Globs) -> Result<(), ConfigError> {
    if globs.is_empty() {
        return Err(ConfigError::shape(concern, "no source patterns given"));
    }

    for pattern in globs.patterns() {
        let bare = pattern.strip_prefix('!').unwrap_or(pattern);
        if bare.trim().is_empty() {
            return Err(ConfigError::shape(concern, "empty source pattern"));
        }

        if let Err(e) = glob::Pattern::new(bare) {
            return Err(ConfigError::shape(
                concern,
                format!("invalid pattern '{pattern}': {e}"),
            ));
        }
    }

    if globs.includes().next().is_none() {
        return Err(ConfigError::shape(
            concern,
            "only exclusions given, nothing would be selected",
        ));
    }

    Ok(())
}

fn validate_path(concern: &str, path: &Utf8Path) -> Result<(), ConfigError> {
    if path.as_str().trim().is_empty() {
        return Err(ConfigError::shape(concern, "empty path"));
    }

    if path.as_str().contains(['*', '?', '[']) {
        return Err(ConfigError::shape(
            concern,
            format!("'{path}' is a pattern, expected a plain path"),
        ));
    }

    Ok(())
}
