//! ctxfmt - thread `context.Context` through Go code.
//!
//! ctxfmt is a codemod in two stages:
//!
//! 1. The declaration scanner (`inject`) finds method and interface
//!    declarations missing a leading `ctx context.Context` parameter and
//!    either reports them or inserts it.
//! 2. The call-site patcher (`patch`) type-checks a package, reads the
//!    "not enough arguments" diagnostics that stage 1 caused and inserts
//!    `context.TODO()` at each broken call.
//!
//! # Architecture
//!
//! - `syntax`: tree-sitter Go adapter, facts and byte-range edits
//! - `policy`: eligibility rules built from the `config` document
//! - `diagnostics`: type-checker output parsing and name extraction
//! - `loader`: package loading through the `go` command
//! - `writer`: persists a unit only when it changed
//! - `report`: output formatting (pretty, JSON)

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod inject;
pub mod loader;
pub mod patch;
pub mod policy;
pub mod report;
pub mod syntax;
pub mod writer;

pub use config::{Config, MarkerConfig};
pub use error::{CtxfmtError, Result};
pub use inject::{FileOutcome, Injector, Mode};
pub use loader::{GoToolchain, Package, PackageLoader};
pub use patch::{PatchOutcome, Patcher, Targets};
pub use policy::{Category, Policy};
pub use report::{Finding, FindingKind};
pub use syntax::SourceUnit;

use tracing_subscriber::EnvFilter;

/// Initialize logging to stderr.
///
/// `RUST_LOG` wins when set; otherwise `verbose` picks the level.
pub fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "ctxfmt=warn",
        1 => "ctxfmt=info",
        _ => "ctxfmt=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
