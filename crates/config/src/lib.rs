//! Manages application configuration by loading settings from standard locations.
//!
//! This crate provides a unified configuration object (`Config`) that aggregates
//! settings from the built-in defaults, the user's configuration directory, the
//! project being locked, and environment variables. Unlike a process-wide static,
//! the loaded value is handed explicitly to whoever needs it, so the lock
//! machinery can be driven from tests with any configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use etcetera::BaseStrategy;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::{Figment, Metadata, Provider};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The default configuration values
const DEFAULT_TOML_CONFIG: &str = include_str!("./reqlock.default.toml");

/// The file name looked up in every configuration location.
pub const CONFIG_FILE: &str = "reqlock.toml";

/// Prefix of every environment override.
const ENV_PREFIX: &str = "REQLOCK_";

/// The project runtime version key, read verbatim since figment would parse `3.10`
/// as the float `3.1`.
const RUNTIME_VERSION_KEY: &str = "PROJECT__RUNTIME_VERSION";

/// Submodule paths that are never dependencies, whatever the configuration says.
pub const ALWAYS_EXCLUDED: [&str; 2] = ["submodules/template", "submodules/typings"];

//================================================================================================
// Types
//================================================================================================

/// A target platform the external resolver can compile for.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Linux, the default project platform.
    Linux,
    /// macOS.
    Macos,
    /// Windows.
    Windows,
}

/// Returned when a string names no known [`Platform`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown platform `{0}`")]
pub struct UnknownPlatform(pub String);

/// How to invoke the external resolver.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// The resolver executable, relative to the project root or on `PATH`.
    pub program: PathBuf,
    /// Arguments selecting the compile operation (e.g. `pip compile`).
    pub subcommand: Vec<String>,
    /// Extra arguments appended to every compile invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// The project's canonical compilation axis.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Platform the canonical direct dependencies are resolved for.
    pub platform: Platform,
    /// Runtime version the canonical direct dependencies are resolved for.
    pub runtime_version: String,
    /// Interpreter probed with `--version` to detect the running runtime version.
    pub interpreter: String,
}

/// The supported (platform x runtime version) matrix.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MatrixConfig {
    /// Supported platforms.
    pub platforms: Vec<Platform>,
    /// Supported runtime versions, unless `versions_file` exists.
    pub runtime_versions: Vec<String>,
    /// A file listing one supported runtime version per line.
    pub versions_file: PathBuf,
}

/// Project-relative paths consumed during compilation.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PathsConfig {
    /// Declared requirements, including `-e <path>` editable lines.
    pub requirements: PathBuf,
    /// Overrides satisfying otherwise incompatible combinations.
    pub overrides: PathBuf,
    /// Dependencies whose transitive dependencies must not be resolved.
    pub nodeps: PathBuf,
    /// Manifest file name inside each editable package.
    pub manifest: String,
    /// Lockfile stem; `lock` yields `lock.json` and `lock-high.json`.
    pub lockfile: String,
}

/// How version-control submodules map to direct dependencies.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SubmoduleConfig {
    /// Directory prefix stripped from a submodule path to name its package.
    pub prefix: String,
    /// Submodule paths never treated as dependencies, on top of [`ALWAYS_EXCLUDED`].
    pub exclude: Vec<PathBuf>,
}

/// Represents the application's primary configuration structure.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// External resolver invocation.
    pub resolver: ResolverConfig,
    /// Canonical axis.
    pub project: ProjectConfig,
    /// Supported matrix.
    pub matrix: MatrixConfig,
    /// Input and output paths.
    pub paths: PathsConfig,
    /// Submodule handling.
    pub submodules: SubmoduleConfig,
}

//================================================================================================
// Impls
//================================================================================================

impl Platform {
    /// Every recognized platform, in lexical order.
    pub const ALL: [Platform; 3] = [Platform::Linux, Platform::Macos, Platform::Windows];

    /// The identifier used on the resolver command line and in lockfile keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Macos => "macos",
            Platform::Windows => "windows",
        }
    }

    /// The platform this binary was built for, if it is a recognized one.
    pub fn current() -> Option<Platform> {
        std::env::consts::OS.parse().ok()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "macos" | "darwin" => Ok(Platform::Macos),
            "windows" | "win32" => Ok(Platform::Windows),
            _ => Err(UnknownPlatform(s.to_owned())),
        }
    }
}

impl SubmoduleConfig {
    /// Whether the submodule at `path` is kept out of the direct dependencies.
    pub fn is_excluded(&self, path: &Path) -> bool {
        ALWAYS_EXCLUDED.iter().any(|e| path == Path::new(e))
            || self.exclude.iter().any(|e| e == path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig {
                program: "bin/uv".into(),
                subcommand: vec!["pip".into(), "compile".into()],
                extra_args: vec!["--all-extras".into()],
            },
            project: ProjectConfig {
                platform: Platform::Linux,
                runtime_version: "3.11".into(),
                interpreter: "python3".into(),
            },
            matrix: MatrixConfig {
                platforms: Platform::ALL.to_vec(),
                runtime_versions: ["3.9", "3.10", "3.11", "3.12"]
                    .map(String::from)
                    .to_vec(),
                versions_file: ".python-versions".into(),
            },
            paths: PathsConfig {
                requirements: "requirements/dev.in".into(),
                overrides: "requirements/override.txt".into(),
                nodeps: "requirements/nodeps.in".into(),
                manifest: "pyproject.toml".into(),
                lockfile: "lock".into(),
            },
            submodules: SubmoduleConfig {
                prefix: "submodules/".into(),
                exclude: Vec::new(),
            },
        }
    }
}

impl Config {
    /// Constructs a `Figment` instance for configuration loading.
    ///
    /// Layers, later winning: built-in defaults, the user configuration directory,
    /// `reqlock.toml` in the project root, `.git/info/reqlock.toml`, and finally
    /// `REQLOCK_` environment variables (`__` separates nested keys).
    pub fn figment() -> Figment {
        let mut fig = Figment::from(Config::default()).merge(Toml::string(DEFAULT_TOML_CONFIG));

        if let Ok(c) = etcetera::choose_base_strategy() {
            let config = c.config_dir().join(CONFIG_FILE);
            fig = fig.merge(Toml::file(config));
        }

        fig = fig.merge(Toml::file(project_root().join(CONFIG_FILE)));

        #[cfg(feature = "git")]
        if let Ok(r) = gix::ThreadSafeRepository::discover(".") {
            let repo_config = r.git_dir().join("info").join(CONFIG_FILE);
            fig = fig.merge(Toml::file(repo_config));
        };

        fig = fig.merge(
            Env::prefixed(ENV_PREFIX)
                .filter(|k| !k.as_str().eq_ignore_ascii_case(RUNTIME_VERSION_KEY))
                .split("__"),
        );

        match std::env::var(format!("{}{}", ENV_PREFIX, RUNTIME_VERSION_KEY)) {
            Ok(version) => fig.merge(Serialized::default(
                "project",
                [("runtime_version", version)]
                    .into_iter()
                    .collect::<std::collections::BTreeMap<_, _>>(),
            )),
            Err(_) => fig,
        }
    }

    /// Creates a `Config` instance from a given provider.
    pub fn from<T: Provider>(provider: T) -> Result<Config, Box<figment::Error>> {
        Figment::from(provider).extract().map_err(Box::new)
    }

    /// Loads the configuration from every default source.
    pub fn load() -> Result<Config, Box<figment::Error>> {
        Config::from(Config::figment())
    }
}

impl Provider for Config {
    fn metadata(&self) -> figment::Metadata {
        Metadata::named("reqlock defaults")
    }

    fn data(
        &self,
    ) -> Result<figment::value::Map<figment::Profile, figment::value::Dict>, figment::Error> {
        figment::providers::Serialized::defaults(self).data()
    }
}

//================================================================================================
// Functions
//================================================================================================

/// The directory holding the project's files: the repository work tree if there is
/// one, else the current directory.
pub fn project_root() -> PathBuf {
    #[cfg(feature = "git")]
    if let Some(dir) = gix::ThreadSafeRepository::discover(".")
        .ok()
        .and_then(|r| r.work_dir().map(Path::to_path_buf))
    {
        return dir;
    }
    std::env::current_dir().unwrap_or_else(|_| Path::new(".").to_path_buf())
}

//================================================================================================
// Tests
//================================================================================================

#[cfg(test)]
mod test {
    use figment::Jail;

    use super::*;

    #[test]
    fn defaults_match_embedded_toml() {
        let from_toml: Config = Figment::from(Toml::string(DEFAULT_TOML_CONFIG))
            .extract()
            .expect("embedded defaults must parse");
        assert_eq!(from_toml, Config::default());
    }

    #[test]
    fn project_file_and_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                [matrix]
                platforms = ["linux", "windows"]
                "#,
            )?;
            jail.set_env("REQLOCK_PROJECT__RUNTIME_VERSION", "3.12");

            let config = Config::load().map_err(|e| *e)?;
            assert_eq!(config.matrix.platforms, vec![Platform::Linux, Platform::Windows]);
            assert_eq!(config.project.runtime_version, "3.12");
            assert_eq!(config.paths.lockfile, "lock");
            Ok(())
        });
    }

    #[test]
    fn unknown_platform_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE, "[project]\nplatform = \"beos\"\n")?;
            assert!(Config::load().is_err());
            Ok(())
        });
    }

    #[test]
    fn runtime_version_from_env_keeps_its_text() {
        Jail::expect_with(|jail| {
            jail.set_env("REQLOCK_PROJECT__RUNTIME_VERSION", "3.10");
            jail.set_env("REQLOCK_PROJECT__INTERPRETER", "python3.10");

            let config = Config::load().map_err(|e| *e)?;
            assert_eq!(config.project.runtime_version, "3.10");
            assert_eq!(config.project.interpreter, "python3.10");
            assert_eq!(config.project.platform, Platform::Linux);
            Ok(())
        });
    }

    #[test]
    fn template_and_typings_cannot_be_included() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                "[submodules]\nexclude = [\"submodules/legacy\"]\n",
            )?;

            let config = Config::load().map_err(|e| *e)?;
            let submodules = &config.submodules;
            assert!(submodules.is_excluded(Path::new("submodules/template")));
            assert!(submodules.is_excluded(Path::new("submodules/typings")));
            assert!(submodules.is_excluded(Path::new("submodules/legacy")));
            assert!(!submodules.is_excluded(Path::new("submodules/widget")));
            Ok(())
        });
    }

    #[test]
    fn unknown_platform_message() {
        let err = "plan9".parse::<Platform>().unwrap_err();
        assert_eq!(err.to_string(), "unknown platform `plan9`");
    }

    #[test]
    fn platform_parsing() {
        assert_eq!("Linux".parse::<Platform>(), Ok(Platform::Linux));
        assert_eq!("darwin".parse::<Platform>(), Ok(Platform::Macos));
        assert_eq!("win32".parse::<Platform>(), Ok(Platform::Windows));
        assert!("plan9".parse::<Platform>().is_err());
    }
}
