// src/main.rs

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pkgwire::local::{DryRunSettings, LocalPackageSource, LocalSolution};
use pkgwire::{
    Architecture, BarProgress, CachedPackageSource, EngineConfig, PackageId, ReconciliationEngine,
    ReferenceManifest, SelectionTree,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use tracing::info;

#[derive(Parser)]
#[command(name = "pkgwire")]
#[command(author, version, about = "Reconcile package references across a solution", long_about = None)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Identifies the package variant to reconcile
#[derive(Args)]
struct PackageArgs {
    /// Solution description (TOML)
    #[arg(short, long)]
    solution: PathBuf,

    /// Installed package index (TOML)
    #[arg(short, long)]
    index: PathBuf,

    /// Package name
    #[arg(short, long)]
    package: String,

    /// Package version
    #[arg(long = "pkg-version")]
    version: String,

    /// Package architecture (x86, x64, any)
    #[arg(short, long, default_value = "any")]
    arch: String,

    /// Package flavor, e.g. "[vc10]"
    #[arg(short, long, default_value = "")]
    flavor: String,
}

impl PackageArgs {
    fn package_id(&self) -> Result<PackageId> {
        let architecture: Architecture = self.arch.parse()?;
        Ok(PackageId::new(
            self.package.as_str(),
            &self.flavor,
            self.version.as_str(),
            architecture,
        ))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the reference manifest of a project directory
    Manifest {
        /// Project directory
        project_dir: PathBuf,
    },
    /// Print the selection tree for a package
    Tree {
        #[command(flatten)]
        package: PackageArgs,
    },
    /// Edit the selection tree and show the resulting changes
    ///
    /// Manifests are written; build-setting mutations are only printed.
    Apply {
        #[command(flatten)]
        package: PackageArgs,

        /// Node path to check, e.g. "app/Release|x64/zlib.lib"
        #[arg(long)]
        check: Vec<String>,

        /// Node path to uncheck
        #[arg(long)]
        uncheck: Vec<String>,
    },
}

fn build_engine(config: &EngineConfig, index: &Path) -> Result<ReconciliationEngine> {
    let source = LocalPackageSource::load(index)
        .with_context(|| format!("loading package index {}", index.display()))?;
    Ok(
        ReconciliationEngine::new(CachedPackageSource::new(source, config.package_cache_ttl()))
            .with_config(config.clone())
            .with_progress(BarProgress::new("Probing projects")),
    )
}

fn build_tree(
    engine: &mut ReconciliationEngine,
    args: &PackageArgs,
) -> Result<Option<SelectionTree>> {
    let solution = LocalSolution::load(&args.solution)
        .with_context(|| format!("loading solution {}", args.solution.display()))?;
    let package = args.package_id()?;
    let cancel = AtomicBool::new(false);

    let outcome = engine.build_tree(&solution, &package, &cancel)?;
    for failure in &outcome.failures {
        eprintln!("warning: {}", failure);
    }
    if outcome.tree.is_none() {
        println!("No project in {} can reference {}", solution.name(), package);
    }
    Ok(outcome.tree)
}

fn set_paths(tree: &mut SelectionTree, paths: &[String], checked: bool) -> Result<()> {
    for path in paths {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        tree.set_checked_path(&segments, checked)
            .ok_or_else(|| anyhow::anyhow!("No tree node at '{}'", path))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Manifest { project_dir } => {
            let path = config.manifest_path(&project_dir);
            let manifest = ReferenceManifest::load(&path)?;
            if manifest.is_empty() {
                println!("No package references in {}", path.display());
                return Ok(());
            }
            for entry in manifest.entries() {
                println!("{}", entry.package);
                for lib in &entry.libraries {
                    match &lib.configuration {
                        Some(configuration) => println!("  {} ({})", lib.name, configuration),
                        None => println!("  {}", lib.name),
                    }
                }
            }
            Ok(())
        }
        Commands::Tree { package } => {
            let mut engine = build_engine(&config, &package.index)?;
            if let Some(tree) = build_tree(&mut engine, &package)? {
                print!("{}", tree);
                engine.cancel()?;
            }
            Ok(())
        }
        Commands::Apply {
            package,
            check,
            uncheck,
        } => {
            let mut engine = build_engine(&config, &package.index)?;
            let Some(mut tree) = build_tree(&mut engine, &package)? else {
                return Ok(());
            };

            set_paths(&mut tree, &uncheck, false)?;
            set_paths(&mut tree, &check, true)?;
            print!("{}", tree);

            let mut settings = DryRunSettings::new();
            let report = engine.commit(&tree, &mut settings)?;
            info!("{} projects updated", report.updated.len());

            for mutation in report.mutations() {
                println!("{}", mutation);
            }
            if let Some(message) = report.failure_message() {
                for failure in &report.failures {
                    eprintln!("  {}", failure);
                }
                return Err(anyhow::anyhow!(message));
            }
            Ok(())
        }
    }
}
