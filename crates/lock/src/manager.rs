//! # Lock Manager
//!
//! The [`LockManager`] owns the lockfile. It decides whether the cached document still
//! describes the current inputs and recompiles the whole matrix when it does not.
//!
//! ## Staleness
//!
//! [`LockManager::check_compilation`] walks these checks in order, recompiling at the
//! first one that fails:
//!
//! 1. The newest-versions lockfile is never served from cache.
//! 2. A lockfile must exist and parse. A corrupt one is logged and replaced.
//! 3. The cached canonical [`Compiler`] must equal the one built for the current
//!    settings, and every axis of the matrix must hold requirement text.
//! 4. The direct dependencies derived from the current inputs must equal the cached
//!    ones. If the inputs hash to the recorded fingerprint they cannot have changed,
//!    so this check costs no resolver run.
//!
//! When every check passes the running axis' requirement text is served as is.
//!
//! ## Recompilation
//!
//! [`LockManager::lock`] resolves the direct dependencies once on the canonical axis
//! and pins them on every axis, the canonical one included, so the axes only differ
//! in their transitive closures. The document is written once, after every axis compiled; a failed run
//! leaves the previous lockfile in place.

use crate::compilation::Compilation;
use crate::compiler::{Axis, Compiler};
use crate::dep::DirectMap;
use crate::directs::extract_directs;
use crate::lockfile::Lockfile;
use crate::resolver::{self, Resolver};
use crate::settings::Settings;
use crate::submodule::{self, SubmoduleSource};
use crate::Result;


//================================================================================================
// Types
//================================================================================================

/// Computes, caches and validates the lockfile of one project.
#[derive(Debug)]
pub struct LockManager<R, S> {
    resolver: R,
    submodules: S,
    settings: Settings,
    running: Axis,
}

/// Why a cached lockfile cannot be served.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Stale {
    Missing,
    Corrupt,
    Compiler,
    Axis(String),
    Directs,
}

//================================================================================================
// Impls
//================================================================================================

impl<R: Resolver, S: SubmoduleSource> LockManager<R, S> {
    /// A manager for the project described by `settings`, serving requirements for
    /// the `running` axis.
    pub fn new(resolver: R, submodules: S, settings: Settings, running: Axis) -> Self {
        Self {
            resolver,
            submodules,
            settings,
            running,
        }
    }

    /// The settings this manager runs against.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The resolver this manager runs.
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// The submodule metadata source.
    pub fn submodules(&self) -> &S {
        &self.submodules
    }

    /// The axis requirements are served for.
    pub fn running(&self) -> &Axis {
        &self.running
    }

    /// Returns the requirement text of the running axis, recompiling the lockfile
    /// first if it is stale.
    pub fn check_compilation(&self, high: bool) -> Result<String> {
        if high {
            tracing::info!("newest versions are never cached");
            return self.lock(true);
        }

        let path = self.settings.lockfile(false);
        let cached = match Lockfile::load(&path) {
            Ok(Some(cached)) => cached,
            Ok(None) => return self.relock(Stale::Missing),
            Err(e) if e.is_recoverable() => {
                tracing::warn!(error = %e, "discarding lockfile");
                return self.relock(Stale::Corrupt);
            },
            Err(e) => return Err(e),
        };

        let compiler = self.compiler(false)?;
        if cached.compiler() != compiler {
            return self.relock(Stale::Compiler);
        }

        let missing = self.settings.matrix().iter().find(|axis| {
            cached
                .compilation(axis)
                .is_none_or(|c| !c.is_valid())
        });
        if let Some(axis) = missing {
            return self.relock(Stale::Axis(axis.key()));
        }

        let submodules = self.submodule_directs()?;
        let fingerprint = self.fingerprint(&compiler, &submodules)?;
        if cached.inputs() != Some(fingerprint.as_str()) {
            tracing::debug!("inputs changed since the last lock, comparing direct dependencies");
            if &self.directs(&compiler, submodules)? != cached.directs() {
                return self.relock(Stale::Directs);
            }
        }

        match cached.compilation(&self.running) {
            Some(c) if c.is_valid() => {
                tracing::info!(axis = %self.running, "lockfile is up to date");
                Ok(c.into_requirements())
            },
            _ => {
                tracing::info!(
                    axis = %self.running,
                    "running axis is not locked, compiling it against the locked directs"
                );
                let running = compiler.on_axis(self.running.clone());
                Ok(self.compile(&running, cached.directs())?.into_requirements())
            },
        }
    }

    /// Recompiles every axis, replaces the lockfile, and returns the requirement text
    /// of the running axis.
    pub fn lock(&self, high: bool) -> Result<String> {
        let compiler = self.compiler(high)?;
        let submodules = self.submodule_directs()?;
        let inputs = self.fingerprint(&compiler, &submodules)?;

        let directs = {
            let span = tracing::info_span!("directs", axis = %compiler.axis());
            crate::log::set_sub_task(&span, &format!("📌 resolving direct dependencies on {}", compiler.axis()));
            let _enter = span.enter();
            self.directs(&compiler, submodules)?
        };
        tracing::info!(count = directs.len(), "resolved direct dependencies");

        let canonical = self.compile(&compiler, &directs)?;

        let mut lockfile = Lockfile::new(&canonical, Some(inputs));
        let mut running = (compiler.axis() == &self.running).then(|| canonical.requirements().to_owned());

        let progress = tracing::info_span!("matrix");
        crate::log::set_bar(&progress, "🔒 compiling matrix", self.settings.matrix().len() as u64);
        {
            let _guard = progress.enter();
            for axis in self.settings.matrix() {
                let compilation = if axis == compiler.axis() {
                    canonical.clone()
                } else {
                    self.compile(&compiler.on_axis(axis.clone()), &directs)?
                };
                lockfile.insert(&compilation);
                if axis == &self.running {
                    running = Some(compilation.into_requirements());
                }
                crate::log::tick(&progress);
            }
        }

        let path = self.settings.lockfile(high);
        lockfile.write_atomic(&path)?;
        tracing::info!(path = %path.display(), axes = self.settings.matrix().len(), "wrote lockfile");

        match running {
            Some(requirements) => Ok(requirements),
            None => {
                let compiler = compiler.on_axis(self.running.clone());
                Ok(self.compile(&compiler, &directs)?.into_requirements())
            },
        }
    }

    /// The canonical compiler configuration for the current settings.
    pub fn compiler(&self, high: bool) -> Result<Compiler> {
        Ok(Compiler::new(
            self.resolver.version()?,
            self.settings.project().clone(),
            high,
            self.settings.overrides(),
            self.settings.source_paths()?,
        ))
    }

    /// The current direct dependencies: the submodule records, overlaid with whatever
    /// a no-transitive resolution of the sources lists, `# nodeps` block included.
    pub fn directs(&self, compiler: &Compiler, submodules: DirectMap) -> Result<DirectMap> {
        let output = resolver::invoke(
            &self.resolver,
            &self.settings,
            &compiler.without_transitive(),
            None,
        )?;
        Ok(submodules.layered(extract_directs(&output.requirements)?))
    }

    /// Compiles `compiler` with `directs` pinned.
    pub fn compile(&self, compiler: &Compiler, directs: &DirectMap) -> Result<Compilation> {
        let output = self.run_axis(compiler, directs)?;
        Ok(Compilation::new(
            compiler.clone(),
            output.time,
            output.requirements,
            directs.clone(),
        ))
    }

    fn run_axis(&self, compiler: &Compiler, pinned: &DirectMap) -> Result<resolver::Output> {
        let span = tracing::info_span!("compile", axis = %compiler.axis());
        crate::log::set_sub_task(&span, &format!("⚙️ {}", compiler.axis()));
        let _enter = span.enter();
        tracing::debug!(pinned = pinned.len(), "compiling");
        resolver::invoke(&self.resolver, &self.settings, compiler, Some(pinned))
    }

    fn submodule_directs(&self) -> Result<DirectMap> {
        submodule::submodule_directs(&self.submodules, self.settings.submodules())
    }

    /// Hashes everything the direct dependencies are derived from.
    fn fingerprint(&self, compiler: &Compiler, submodules: &DirectMap) -> Result<String> {
        let mut hasher = blake3::Hasher::new();
        let mut field = |bytes: &[u8]| {
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        };

        let resolver = self.settings.resolver();
        field(compiler.resolver_version().as_bytes());
        field(resolver.program.to_string_lossy().as_bytes());
        for arg in resolver.subcommand.iter().chain(&resolver.extra_args) {
            field(arg.as_bytes());
        }
        let project = compiler.axis();
        field(project.platform.as_str().as_bytes());
        field(project.runtime_version.as_bytes());
        field(&[u8::from(compiler.high())]);

        for file in self.settings.input_files()? {
            field(file.as_bytes());
            match std::fs::read(self.settings.root().join(&file)) {
                Ok(contents) => field(&contents),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => field(b"\0missing"),
                Err(e) => return Err(e.into()),
            }
        }
        field(submodules.to_requirements().as_bytes());

        Ok(hasher.finalize().to_hex().to_string())
    }

    fn relock(&self, reason: Stale) -> Result<String> {
        match &reason {
            Stale::Missing => tracing::info!("no lockfile yet"),
            Stale::Corrupt => tracing::info!("replacing corrupt lockfile"),
            Stale::Compiler => tracing::info!("compiler configuration changed"),
            Stale::Axis(key) => tracing::info!(axis = %key, "lockfile lacks an axis"),
            Stale::Directs => tracing::info!("direct dependencies changed"),
        }
        self.lock(false)
    }
}
