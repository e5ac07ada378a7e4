//! Command-line interface for ctxfmt.

use std::io;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{self, Config};
use crate::inject::{Injector, Mode};
use crate::loader::GoToolchain;
use crate::patch::Patcher;
use crate::policy::Policy;
use crate::report::{self, Finding};
use crate::syntax;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Thread context.Context through Go declarations and their call sites.
///
/// `def` adds the parameter to method and interface declarations; `call`
/// asks the Go type-checker which call sites broke and patches them with a
/// placeholder argument.
#[derive(Parser)]
#[command(name = "ctxfmt")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add the context parameter to declarations
    Def(DefArgs),
    /// Add a placeholder context argument to broken call sites
    Call(CallArgs),
    /// Create a ctxfmt config file from the default template
    Init(InitArgs),
}

/// Output format for dry-run findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Pretty,
    Json,
}

/// Options shared by `def` and `call`.
#[derive(Args)]
pub struct RunArgs {
    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Report what would change without writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// With --dry-run, exit 1 when there are findings
    #[arg(long)]
    pub check: bool,

    /// Output format for findings
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: Format,

    /// Never touch names containing this substring (repeatable)
    #[arg(long = "ignore-func", value_name = "SUBSTR")]
    pub ignore_funcs: Vec<String>,
}

/// Arguments for the def command.
#[derive(Args)]
pub struct DefArgs {
    /// Files to scan, in order
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Descend into directories
    #[arg(short, long)]
    pub recursive: bool,

    /// Only rewrite interfaces whose name contains this substring (repeatable)
    #[arg(long = "allow-interface", value_name = "SUBSTR")]
    pub allow_interfaces: Vec<String>,

    /// Leave method declarations alone
    #[arg(long)]
    pub skip_method: bool,

    /// Leave interface declarations alone
    #[arg(long)]
    pub skip_interface: bool,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Arguments for the call command.
#[derive(Args)]
pub struct CallArgs {
    /// Directory the package pattern is resolved from
    pub dir: PathBuf,

    /// Package pattern passed to the Go toolchain
    #[arg(default_value = ".")]
    pub package: String,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Arguments for the init command.
#[derive(Args)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "ctxfmt.yaml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

const CONFIG_TEMPLATE: &str = include_str!("templates/ctxfmt.yaml");

/// Load the config: explicit path, discovered file, or defaults.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => config::discover(),
    };

    let config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            Config::parse_file(&path)
                .map_err(|e| anyhow::anyhow!("cannot load config {}: {}", path.display(), e))?
        }
        None => Config::default(),
    };
    Ok(config)
}

/// Build the immutable policy for this run.
fn build_policy(config: Config) -> anyhow::Result<Policy> {
    config::validate(&config).map_err(|e| anyhow::anyhow!("invalid config: {}", e))?;
    Policy::from_config(&config)
}

/// Expand directories into the Go files below them.
fn collect_files(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            if e.depth() > 0 && e.file_type().is_dir() {
                // Skip hidden, vendored and fixture directories
                return !(name.starts_with('.') || name == "vendor" || name == "testdata");
            }
            true
        })
    {
        let entry = entry?;
        if entry.file_type().is_file() && syntax::is_go_file(entry.path()) {
            files.push(entry.path().to_path_buf());
        }
    }

    Ok(files)
}

fn mode(args: &RunArgs) -> Mode {
    if args.dry_run {
        Mode::DryRun
    } else {
        Mode::Rewrite
    }
}

/// Print findings and pick the exit code.
fn finish(args: &RunArgs, findings: &[Finding]) -> anyhow::Result<i32> {
    if args.dry_run {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        match args.format {
            Format::Json => report::write_json(&mut out, findings)?,
            Format::Pretty => report::write_pretty(&mut out, findings)?,
        }
    }

    if args.dry_run && args.check && !findings.is_empty() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the def command.
pub fn run_def(args: &DefArgs) -> anyhow::Result<i32> {
    let mut config = load_config(args.run.config.as_deref())?;
    config.ignore_funcs.extend(args.run.ignore_funcs.iter().cloned());
    config.allow_interfaces.extend(args.allow_interfaces.iter().cloned());
    config.skip_method |= args.skip_method;
    config.skip_interface |= args.skip_interface;
    let policy = build_policy(config)?;

    let mut files = Vec::new();
    for path in &args.paths {
        if args.recursive && path.is_dir() {
            files.extend(collect_files(path)?);
        } else {
            files.push(path.clone());
        }
    }
    if files.is_empty() {
        warn!("no files to scan");
    }

    let injector = Injector::new(&policy, mode(&args.run));
    let mut findings = Vec::new();
    for file in &files {
        let outcome = injector.scan_file(file)?;
        if outcome.rewritten {
            report::print_processed(file);
        }
        findings.extend(outcome.findings);
    }

    finish(&args.run, &findings)
}

/// Run the call command.
pub fn run_call(args: &CallArgs) -> anyhow::Result<i32> {
    let mut config = load_config(args.run.config.as_deref())?;
    config.ignore_funcs.extend(args.run.ignore_funcs.iter().cloned());
    let policy = build_policy(config)?;

    if !args.dir.is_dir() {
        warn!(dir = %args.dir.display(), "not a directory, nothing to do");
        return Ok(EXIT_SUCCESS);
    }
    let dir = args.dir.canonicalize()?;

    let patcher = Patcher::new(GoToolchain::new(), &policy, mode(&args.run));
    let outcome = patcher.run(&args.package, &dir)?;
    for path in &outcome.rewritten {
        report::print_processed(path);
    }

    finish(&args.run, &outcome.findings)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() && !args.force {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Use --force to overwrite it");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(&args.output, CONFIG_TEMPLATE)?;

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to list names to ignore", args.output.display());
    println!("  2. Run: ctxfmt def --dry-run --recursive .");

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_template_is_valid_config() {
        let config = Config::parse_str(CONFIG_TEMPLATE).unwrap();
        assert!(config::validate(&config).is_ok());
        assert_eq!(config.ignore_files, vec!["mock_"]);
    }

    #[test]
    fn test_collect_files_skips_hidden_vendor_testdata() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for dir in ["pkg", ".git", "vendor/x", "testdata"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        for file in ["a.go", "pkg/b.go", "pkg/README.md", ".git/c.go", "vendor/x/d.go", "testdata/e.go"] {
            fs::write(root.join(file), "package x\n").unwrap();
        }

        let files = collect_files(root).unwrap();
        let rel: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(rel, vec!["a.go", "pkg/b.go"]);
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("ctxfmt.yaml");
        fs::write(&output, "keep: me\n").unwrap();

        let args = InitArgs {
            output: output.clone(),
            force: false,
        };
        assert_eq!(run_init(&args).unwrap(), EXIT_ERROR);
        assert_eq!(fs::read_to_string(&output).unwrap(), "keep: me\n");

        let args = InitArgs {
            output: output.clone(),
            force: true,
        };
        assert_eq!(run_init(&args).unwrap(), EXIT_SUCCESS);
        assert_eq!(fs::read_to_string(&output).unwrap(), CONFIG_TEMPLATE);
    }

    #[test]
    fn test_cli_parses_def() {
        let cli = Cli::try_parse_from([
            "ctxfmt",
            "-vv",
            "def",
            "--dry-run",
            "--ignore-func",
            "Pre",
            "--format",
            "json",
            "a.go",
            "b.go",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Def(args) = cli.command else {
            panic!("expected def");
        };
        assert_eq!(args.paths, vec![PathBuf::from("a.go"), PathBuf::from("b.go")]);
        assert!(args.run.dry_run);
        assert_eq!(args.run.format, Format::Json);
        assert_eq!(args.run.ignore_funcs, vec!["Pre"]);
    }

    #[test]
    fn test_cli_call_default_package() {
        let cli = Cli::try_parse_from(["ctxfmt", "call", "./svc"]).unwrap();
        let Commands::Call(args) = cli.command else {
            panic!("expected call");
        };
        assert_eq!(args.package, ".");
        assert!(!args.run.dry_run);
    }

    #[test]
    fn test_explicit_missing_config_is_fatal() {
        assert!(load_config(Some(Path::new("/nonexistent/ctxfmt.yaml"))).is_err());
    }
}
