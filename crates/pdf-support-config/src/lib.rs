//! Configuration for the pdf-support toolkit.
//!
//! Settings come from up to four layers, later ones winning field by field:
//! built-in defaults, the git root's `.pdf-support.toml`, the working
//! directory's `.pdf-support.toml`, and an explicit override file.
//! Resolution happens once, in [`Config::load`]; the returned value is
//! immutable and nothing downstream re-reads configuration afterwards.

use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const CONFIG_FILE_NAME: &str = ".pdf-support.toml";

/// Built-in directory that receives finished documents.
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "documents";

/// Built-in scratch directory holding the cover/header/footer support files.
pub const DEFAULT_SUPPORT_DIRECTORY: &str = "pdfkit";

/// Built-in log filter directive used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Settings resolved once by [`Config::load`].
#[derive(Clone, Debug)]
pub struct Config {
    pub directories: DirectorySettings,
    pub logging: LoggingSettings,
    pub sources: ConfigSources,
}

impl Config {
    /// Build a configuration from explicit directory paths, bypassing any
    /// on-disk layers.
    pub fn with_directories(output: impl Into<PathBuf>, support: impl Into<PathBuf>) -> Self {
        Config {
            directories: DirectorySettings {
                default_directory_path: output.into(),
                support_directory_path: support.into(),
            },
            ..Config::default()
        }
    }
}

/// Directory locations shared with the external renderer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DirectorySettings {
    /// Where finished documents land.
    pub default_directory_path: PathBuf,
    /// Scratch directory for the support files.
    pub support_directory_path: PathBuf,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        DirectorySettings {
            default_directory_path: PathBuf::from(DEFAULT_OUTPUT_DIRECTORY),
            support_directory_path: PathBuf::from(DEFAULT_SUPPORT_DIRECTORY),
        }
    }
}

/// Logging settings consumed by binaries when installing a subscriber.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoggingSettings {
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}

/// Layers that contributed to a [`Config`], lowest precedence first.
#[derive(Clone, Debug)]
pub struct ConfigSources {
    pub working_directory: PathBuf,
    pub layers: Vec<ConfigSource>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    /// `None` for the built-in defaults.
    pub path: Option<PathBuf>,
}

impl ConfigSource {
    fn builtin() -> Self {
        ConfigSource {
            kind: ConfigSourceKind::Default,
            path: None,
        }
    }

    fn file(kind: ConfigSourceKind, path: PathBuf) -> Self {
        ConfigSource {
            kind,
            path: Some(path),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} at {}", self.kind, path.display()),
            None => write!(f, "{}", self.kind),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigSourceKind {
    Default,
    GitRoot,
    Local,
    Override,
}

impl fmt::Display for ConfigSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigSourceKind::Default => "built-in defaults",
            ConfigSourceKind::GitRoot => "git-root config",
            ConfigSourceKind::Local => "local config",
            ConfigSourceKind::Override => "override config",
        })
    }
}

/// Inputs to [`Config::load`]. Both default to the process environment.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot use {attempted} as working directory: {source}")]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("override config {path} does not exist")]
    OverrideNotFound { path: PathBuf },
    #[error("failed to read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid configuration:\n{0}")]
    Validation(ConfigValidationErrors),
}

impl Config {
    /// Apply every layer that exists on disk over the built-in defaults and
    /// validate the result.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = resolve_working_dir(options.working_dir)?;
        let override_path = options.override_path.map(|path| working_dir.join(path));
        if let Some(path) = &override_path {
            if !path.exists() {
                return Err(ConfigError::OverrideNotFound { path: path.clone() });
            }
        }

        let mut candidates = Vec::new();
        if let Some(root) = find_git_root(&working_dir).filter(|root| root != &working_dir) {
            candidates.push((ConfigSourceKind::GitRoot, root.join(CONFIG_FILE_NAME)));
        }
        candidates.push((ConfigSourceKind::Local, working_dir.join(CONFIG_FILE_NAME)));
        if let Some(path) = &override_path {
            candidates.push((ConfigSourceKind::Override, path.clone()));
        }

        let mut layered = Layered::defaults();
        let mut layers = vec![ConfigSource::builtin()];
        for (kind, path) in candidates {
            // A discovered file passed as the override is applied once, last.
            let shadowed =
                kind != ConfigSourceKind::Override && override_path.as_ref() == Some(&path);
            if shadowed || !path.exists() {
                continue;
            }
            let raw = read_layer(&path)?;
            let source = ConfigSource::file(kind, path);
            layered.apply(raw, &source);
            layers.push(source);
        }

        let (directories, logging) = layered
            .finalize(&working_dir)
            .map_err(ConfigError::Validation)?;
        Ok(Config {
            directories,
            logging,
            sources: ConfigSources {
                working_directory: working_dir,
                layers,
            },
        })
    }
}

impl Default for Config {
    /// Built-in defaults, without consulting the filesystem.
    fn default() -> Self {
        Config {
            directories: DirectorySettings::default(),
            logging: LoggingSettings::default(),
            sources: ConfigSources {
                working_directory: PathBuf::from("."),
                layers: vec![ConfigSource::builtin()],
            },
        }
    }
}

fn resolve_working_dir(requested: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    let resolved = match &requested {
        Some(path) => fs::canonicalize(path),
        None => env::current_dir(),
    };
    resolved.map_err(|source| ConfigError::WorkingDirectory {
        attempted: requested.unwrap_or_else(|| PathBuf::from(".")),
        source,
    })
}

fn find_git_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

fn read_layer(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// A setting paired with the layer that last set it.
#[derive(Clone, Debug)]
struct Located<T> {
    value: T,
    source: ConfigSource,
}

impl<T> Located<T> {
    fn new(value: T, source: &ConfigSource) -> Self {
        Located {
            value,
            source: source.clone(),
        }
    }
}

impl Located<PathBuf> {
    /// Built-in defaults stay relative to the process directory; relative
    /// paths from a file are joined onto the directory holding that file.
    fn resolve(&self) -> PathBuf {
        match self.source.path.as_deref().and_then(Path::parent) {
            Some(dir) => dir.join(&self.value),
            None => self.value.clone(),
        }
    }
}

/// Current winner for each setting while layers are applied.
#[derive(Clone, Debug)]
struct Layered {
    output_directory: Located<PathBuf>,
    support_directory: Located<PathBuf>,
    log_filter: Located<String>,
}

impl Layered {
    fn defaults() -> Self {
        let builtin = ConfigSource::builtin();
        Layered {
            output_directory: Located::new(PathBuf::from(DEFAULT_OUTPUT_DIRECTORY), &builtin),
            support_directory: Located::new(PathBuf::from(DEFAULT_SUPPORT_DIRECTORY), &builtin),
            log_filter: Located::new(DEFAULT_LOG_FILTER.to_owned(), &builtin),
        }
    }

    fn apply(&mut self, raw: RawConfig, source: &ConfigSource) {
        let directories = raw.directories.unwrap_or_default();
        if let Some(value) = directories.default_directory_path {
            self.output_directory = Located::new(value, source);
        }
        if let Some(value) = directories.support_directory_path {
            self.support_directory = Located::new(value, source);
        }
        if let Some(value) = raw.logging.and_then(|logging| logging.filter) {
            self.log_filter = Located::new(value, source);
        }
    }

    fn finalize(
        self,
        working_dir: &Path,
    ) -> Result<(DirectorySettings, LoggingSettings), ConfigValidationErrors> {
        let Layered {
            output_directory,
            support_directory,
            log_filter,
        } = self;
        let mut errors = Vec::new();

        let output_empty = output_directory.value.as_os_str().is_empty();
        let support_empty = support_directory.value.as_os_str().is_empty();
        if output_empty {
            errors.push(ConfigValidationError::new(
                &output_directory.source,
                "directories.default_directory_path cannot be empty",
            ));
        }
        if support_empty {
            errors.push(ConfigValidationError::new(
                &support_directory.source,
                "directories.support_directory_path cannot be empty",
            ));
        }
        if log_filter.value.trim().is_empty() {
            errors.push(ConfigValidationError::new(
                &log_filter.source,
                "logging.filter cannot be empty",
            ));
        }

        let output = output_directory.resolve();
        let support = support_directory.resolve();

        // Teardown removes the support directory recursively, so it must not
        // be the output directory or one of its ancestors.
        if !output_empty && !support_empty {
            let output_at = normalize(&working_dir.join(&output));
            let support_at = normalize(&working_dir.join(&support));
            if output_at.starts_with(&support_at) {
                errors.push(ConfigValidationError::new(
                    &support_directory.source,
                    format!(
                        "directories.support_directory_path ({}) must not contain \
                         directories.default_directory_path ({})",
                        support_at.display(),
                        output_at.display()
                    ),
                ));
            }
        }

        if !errors.is_empty() {
            return Err(ConfigValidationErrors(errors));
        }
        Ok((
            DirectorySettings {
                default_directory_path: output,
                support_directory_path: support,
            },
            LoggingSettings {
                filter: log_filter.value,
            },
        ))
    }
}

/// Drop `.` segments and fold `..` into its parent without touching the disk.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Every validation failure found in the final settings, one per line.
#[derive(Debug)]
pub struct ConfigValidationErrors(pub Vec<ConfigValidationError>);

impl ConfigValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigValidationError> {
        self.0.iter()
    }
}

impl fmt::Display for ConfigValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.0.iter().map(|err| format!("- {err}")).collect();
        f.write_str(&lines.join("\n"))
    }
}

#[derive(Clone, Debug)]
pub struct ConfigValidationError {
    /// Layer that supplied the offending value.
    pub source: ConfigSource,
    pub message: String,
}

impl ConfigValidationError {
    fn new(source: &ConfigSource, message: impl Into<String>) -> Self {
        ConfigValidationError {
            source: source.clone(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.source)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    directories: Option<RawDirectories>,
    logging: Option<RawLogging>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDirectories {
    default_directory_path: Option<PathBuf>,
    support_directory_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLogging {
    filter: Option<String>,
}
