//! # Lock Crate
//!
//! The `lock` crate computes, caches, and validates a reproducible set of resolved
//! dependencies across a matrix of target platforms and runtime versions. The actual
//! constraint solving is delegated to an external resolver executable; this crate
//! owns everything wrapped around it.
//!
//! ## Key Concepts
//!
//! **Direct dependencies** are the packages a project (or one of its submodules)
//! declares itself, as opposed to those pulled in transitively. They are the pivot of
//! the lockfile: every axis of the matrix is resolved with the same direct versions
//! pinned, so only transitive closures may differ between platforms.
//!
//! **Staleness** is detected without re-resolving: the cached compiler configuration
//! and direct dependencies are compared against the current ones, and only a mismatch
//! triggers a full recompilation of the matrix.
//!
//! ## Architecture
//!
//! - [`dep`] - Operators, validated package names, dependency records and maps.
//! - [`directs`] - Extraction of direct dependencies from requirement text.
//! - [`submodule`] - Direct dependencies synthesized from version-control submodules.
//! - [`compiler`] - The immutable description of one resolution axis.
//! - [`resolver`] - The process boundary to the external resolver.
//! - [`compilation`] - The result of compiling one axis.
//! - [`lockfile`] - The persisted JSON document.
//! - [`settings`] - The explicit configuration the manager runs against.
//! - [`manager`] - The staleness state machine and the sole writer of the lockfile.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use lock::manager::LockManager;
//! use lock::resolver::ProcessResolver;
//! use lock::settings::Settings;
//! use lock::submodule::GitCli;
//!
//! let settings = Settings::new(&config::Config::default(), ".").unwrap();
//! let running = settings.project().clone();
//! let manager = LockManager::new(
//!     ProcessResolver::new(&settings),
//!     GitCli::new(settings.root()),
//!     settings,
//!     running,
//! );
//! let requirements = manager.check_compilation(false).unwrap();
//! println!("{requirements}");
//! ```

#![deny(missing_docs)]

pub use self::compilation::Compilation;
pub use self::compiler::{Axis, Compiler};
pub use self::dep::{Dep, DirectMap, Name, Op};
pub use self::error::{Error, Result};
pub use self::lockfile::Lockfile;
pub use self::manager::LockManager;
pub use config::Platform;

pub mod compilation;
pub mod compiler;
pub mod dep;
pub mod directs;
mod error;
pub mod lockfile;
pub mod log;
pub mod manager;
pub mod resolver;
pub mod settings;
pub mod submodule;
