//! Declarative convergence engine for WordPress-style installations.
//!
//! A build manifest declares the desired state of one installation: core
//! version and bootstrap parameters, plus plugins and themes with version
//! expressions. The engine probes what is actually installed, computes the
//! minimal transition for each item, and executes it through the platform
//! CLI. Runs are idempotent: a second run over a converged installation
//! does nothing.
//!
//! The seams are traits so the whole engine runs under test without a
//! network or a real installation: [`registry::Registry`] for metadata and
//! archives, [`backend::PlatformCli`] for mutations, [`report::Reporter`]
//! for progress, and [`prompt::CredentialSource`] for missing bootstrap
//! values.

pub mod backend;
pub mod core;
pub mod error;
pub mod executor;
pub mod manifest;
pub mod probe;
pub mod prompt;
pub mod reconcile;
pub mod registry;
pub mod report;
pub mod types;
pub mod version;

pub use backend::{CliOutput, Invocation, PlatformCli, WpCli};
pub use self::core::{CoreOverrides, CorePhase, CoreReport, CoreRunner};
pub use error::{Error, ErrorCategory, Result};
pub use manifest::{Manifest, ManifestFormat};
pub use probe::Prober;
pub use prompt::CredentialSource;
pub use reconcile::Reconciler;
pub use registry::{HttpRegistry, Registry, RegistryItemInfo};
pub use report::{NullReporter, Reporter};
pub use types::{
    CategoryReport, CoreState, InstallationRoot, ItemKind, ItemReport, ItemState, ItemStatus,
    RunOptions, Transition,
};
pub use version::VersionSpec;
