use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

/// Compiler project file used when `ts.tsconfig` is not given.
pub const DEFAULT_TSCONFIG: &str = "tsconfig.json";

/// Port of the dev server when `serve.port` is not given.
pub const DEFAULT_SERVE_PORT: u16 = 3000;

/// Top-level build configuration.
///
/// ```json
/// {
///   "include": {
///     "clean": "dist",
///     "copy": { "html": ["src/**/*.html", "dist"] },
///     "scss": { "src": "styles/main.scss", "dest": "dist/css", "watchSrc": "styles/**/*.scss" },
///     "ts": { "src": "src/**/*.ts", "dest": "build", "rollup": { "src": "build/main.js", "dest": "dist/main.js" } },
///     "deploy": { "src": "dist/**/*", "dest": "../server/public" },
///     "serve": { "proxy": "localhost:8080" }
///   }
/// }
/// ```
///
/// Every concern is optional; a missing `include` is the same as an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub include: Option<Include>,
}

/// The set of build concerns which are switched on. Absence of a field means
/// the concern is inactive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Include {
    /// Paths deleted before anything else is built.
    pub clean: Option<Globs>,
    /// Named copy tasks.
    pub copy: Option<CopySpec>,
    pub scss: Option<StyleSpec>,
    pub ts: Option<ScriptSpec>,
    pub deploy: Option<DeploySpec>,
    pub serve: Option<ServeSpec>,
    /// Keys this version does not know about. They are reported and otherwise
    /// left alone.
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

impl Include {
    pub(crate) const EMPTY: Include = Include {
        clean: None,
        copy: None,
        scss: None,
        ts: None,
        deploy: None,
        serve: None,
        unknown: BTreeMap::new(),
    };
}

/// One glob pattern or an ordered list of them. Patterns starting with `!`
/// exclude whatever the other patterns matched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "OneOrMany")]
pub struct Globs(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Globs {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(pattern) => Globs(vec![pattern]),
            OneOrMany::Many(patterns) => Globs(patterns),
        }
    }
}

impl Globs {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Globs(patterns.into_iter().map(Into::into).collect())
    }

    pub fn patterns(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Patterns selecting files.
    pub fn includes(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .map(String::as_str)
            .filter(|pattern| !pattern.starts_with('!'))
    }

    /// Patterns removing files from the selection, without the leading `!`.
    pub fn excludes(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|pattern| pattern.strip_prefix('!'))
    }

    /// Same selection with an extra exclusion appended.
    pub fn excluding(&self, path: impl AsRef<str>) -> Self {
        let mut patterns = self.0.clone();
        patterns.push(format!("!{}", path.as_ref()));
        Globs(patterns)
    }
}

impl From<&str> for Globs {
    fn from(pattern: &str) -> Self {
        Globs(vec![pattern.to_string()])
    }
}

impl From<String> for Globs {
    fn from(pattern: String) -> Self {
        Globs(vec![pattern])
    }
}

impl From<Vec<&str>> for Globs {
    fn from(patterns: Vec<&str>) -> Self {
        Globs::new(patterns)
    }
}

impl std::fmt::Display for Globs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

/// Copy tasks keyed by task name.
pub type CopySpec = BTreeMap<String, CopyEntry>;

/// A `[src, dest]` pair. The destination is optional only so that a config
/// which forgot it can be reported with a useful message.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawCopyEntry")]
pub struct CopyEntry {
    pub src: Globs,
    pub dest: Option<Utf8PathBuf>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCopyEntry {
    Pair(Globs, Utf8PathBuf),
    Source(Globs),
}

impl From<RawCopyEntry> for CopyEntry {
    fn from(value: RawCopyEntry) -> Self {
        match value {
            RawCopyEntry::Pair(src, dest) => CopyEntry {
                src,
                dest: Some(dest),
            },
            RawCopyEntry::Source(src) => CopyEntry { src, dest: None },
        }
    }
}

impl CopyEntry {
    pub fn new(src: impl Into<Globs>, dest: impl Into<Utf8PathBuf>) -> Self {
        Self {
            src: src.into(),
            dest: Some(dest.into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSpec {
    pub src: Globs,
    pub dest: Utf8PathBuf,
    #[serde(default)]
    pub options: StyleOptions,
    /// Files observed by `scssWatch`, usually wider than `src` so that
    /// partials trigger a rebuild of the entry points.
    pub watch_src: Option<Globs>,
}

impl StyleSpec {
    pub fn new(src: impl Into<Globs>, dest: impl Into<Utf8PathBuf>) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
            options: StyleOptions::default(),
            watch_src: None,
        }
    }

    pub fn watched(&self) -> &Globs {
        self.watch_src.as_ref().unwrap_or(&self.src)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleOptions {
    pub compressed: bool,
    pub load_paths: Vec<Utf8PathBuf>,
}

/// The `ts` concern: compile, then optionally bundle, copy declarations and
/// clean up.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSpec {
    pub src: Globs,
    pub dest: Utf8PathBuf,
    #[serde(default = "default_tsconfig")]
    pub tsconfig: Utf8PathBuf,
    pub declarations: Option<DeclarationsSpec>,
    pub rollup: Option<RollupSpec>,
    pub clean: Option<Globs>,
}

fn default_tsconfig() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_TSCONFIG)
}

impl ScriptSpec {
    pub fn new(src: impl Into<Globs>, dest: impl Into<Utf8PathBuf>) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
            tsconfig: default_tsconfig(),
            declarations: None,
            rollup: None,
            clean: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeclarationsSpec {
    pub src: Globs,
    pub dest: Utf8PathBuf,
}

/// Either one bundle or several bundles keyed by name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RollupSpec {
    Single(BundleSpec),
    Multi(BTreeMap<String, BundleSpec>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct BundleSpec {
    /// Entry module.
    pub src: Utf8PathBuf,
    /// Output file.
    pub dest: Utf8PathBuf,
    pub options: Option<BundleOptions>,
    /// Files observed by the bundle's watch task. Defaults to the directory
    /// of the entry module, minus the output file.
    pub watch: Option<Globs>,
}

impl BundleSpec {
    pub fn new(src: impl Into<Utf8PathBuf>, dest: impl Into<Utf8PathBuf>) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
            options: None,
            watch: None,
        }
    }

    pub fn watched(&self) -> Globs {
        match &self.watch {
            Some(globs) => globs.clone(),
            None => {
                let dir = self.src.parent().unwrap_or(Utf8Path::new(""));
                let pattern = if dir.as_str().is_empty() {
                    Utf8PathBuf::from("**/*")
                } else {
                    dir.join("**/*")
                };
                Globs::from(pattern.into_string()).excluding(&self.dest)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleFormat {
    #[default]
    Iife,
    Esm,
    Cjs,
}

impl BundleFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            BundleFormat::Iife => "iife",
            BundleFormat::Esm => "esm",
            BundleFormat::Cjs => "cjs",
        }
    }
}

/// Options handed to the bundler. Fields missing from a config file are taken
/// from [`BundleOptions::legacy`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BundleOptions {
    pub format: BundleFormat,
    pub target: String,
    pub minify: bool,
    pub sourcemap: bool,
    pub global_name: Option<String>,
    pub external: Vec<String>,
}

impl BundleOptions {
    /// Transpile down for older browsers and minify.
    pub fn legacy() -> Self {
        Self {
            format: BundleFormat::Iife,
            target: "es2015".to_string(),
            minify: true,
            sourcemap: false,
            global_name: None,
            external: Vec::new(),
        }
    }
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self::legacy()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeploySpec {
    pub src: Globs,
    pub dest: Utf8PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServeSpec {
    /// Upstream server, e.g. `localhost:8080` or `http://127.0.0.1:8000`.
    pub proxy: String,
    pub ssl_key: Option<Utf8PathBuf>,
    pub ssl_cert: Option<Utf8PathBuf>,
    #[serde(default = "default_serve_port")]
    pub port: u16,
    /// Websocket port for live reload. Any free port is used when not given.
    pub reload_port: Option<u16>,
}

fn default_serve_port() -> u16 {
    DEFAULT_SERVE_PORT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl ServeSpec {
    pub fn new(proxy: impl Into<String>) -> Self {
        Self {
            proxy: proxy.into(),
            ssl_key: None,
            ssl_cert: None,
            port: DEFAULT_SERVE_PORT,
            reload_port: None,
        }
    }

    /// Either TLS field switches the server to HTTPS.
    pub fn scheme(&self) -> Scheme {
        if self.ssl_key.is_some() || self.ssl_cert.is_some() {
            Scheme::Https
        } else {
            Scheme::Http
        }
    }

    /// `(key, cert)` when both are present.
    pub fn tls(&self) -> Option<(&Utf8Path, &Utf8Path)> {
        match (&self.ssl_key, &self.ssl_cert) {
            (Some(key), Some(cert)) => Some((key, cert)),
            _ => None,
        }
    }

    /// Proxy target with an explicit scheme and no trailing slash.
    pub fn proxy_url(&self) -> String {
        let proxy = self.proxy.trim().trim_end_matches('/');
        if proxy.contains("://") {
            proxy.to_string()
        } else {
            format!("http://{proxy}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globs_split_includes_and_excludes() {
        let globs = Globs::new(["src/**/*.html", "!src/drafts/**", "static/*"]);

        assert_eq!(
            globs.includes().collect::<Vec<_>>(),
            vec!["src/**/*.html", "static/*"]
        );
        assert_eq!(globs.excludes().collect::<Vec<_>>(), vec!["src/drafts/**"]);
    }

    #[test]
    fn test_bundle_watch_defaults_to_entry_directory() {
        let bundle = BundleSpec::new("build/main.js", "dist/bundle.js");
        let watched = bundle.watched();

        assert_eq!(watched.patterns(), ["build/**/*", "!dist/bundle.js"]);
    }

    #[test]
    fn test_bundle_watch_entry_in_cwd() {
        let bundle = BundleSpec::new("main.js", "bundle.js");

        assert_eq!(bundle.watched().patterns(), ["**/*", "!bundle.js"]);
    }

    #[test]
    fn test_serve_scheme() {
        let mut serve = ServeSpec::new("localhost:8080");
        assert_eq!(serve.scheme(), Scheme::Http);

        serve.ssl_cert = Some("cert.pem".into());
        assert_eq!(serve.scheme(), Scheme::Https);
        assert!(serve.tls().is_none());

        serve.ssl_key = Some("key.pem".into());
        assert!(serve.tls().is_some());
    }

    #[test]
    fn test_proxy_url() {
        assert_eq!(
            ServeSpec::new("localhost:8080").proxy_url(),
            "http://localhost:8080"
        );
        assert_eq!(
            ServeSpec::new("http://127.0.0.1:8000/").proxy_url(),
            "http://127.0.0.1:8000"
        );
    }
}
