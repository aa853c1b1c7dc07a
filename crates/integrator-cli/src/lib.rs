//! Integrator CLI - applies a plugin wiring manifest to a PHP project
//!
//! Reads the manifest and the lock file, runs the integrator over the
//! selected classes and stores the updated lock file.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use integrator_core::{
    Integrator, IntegratorConfig, IoNotifier, LockReader, LockWriter, Manifest, PhpParser,
    PhpPrinter, RunSummary,
};
use tracing::debug;

pub mod notifier;

pub use notifier::ConsoleNotifier;

/// Everything a run needs, as given on the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config: IntegratorConfig,
    /// Class-name filters; empty means all classes
    pub classes: Vec<String>,
    pub debug: bool,
    pub quiet: bool,
}

pub fn build_command() -> Command {
    Command::new("integrator")
        .version(integrator_core::VERSION)
        .about("Apply a plugin wiring manifest to the dependency-provider classes of a PHP project")
        .arg(
            Arg::new("project-root")
                .long("project-root")
                .value_name("DIR")
                .help("Project root directory")
                .default_value("."),
        )
        .arg(
            Arg::new("manifest")
                .long("manifest")
                .value_name("FILE")
                .help("Manifest file, relative to the project root"),
        )
        .arg(
            Arg::new("lock")
                .long("lock")
                .value_name("FILE")
                .help("Lock file, relative to the project root"),
        )
        .arg(
            Arg::new("source-root")
                .long("source-root")
                .value_name("DIR")
                .help("Directory searched for class files (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("class")
                .long("class")
                .value_name("NAME")
                .help("Only process classes whose name contains NAME (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("dry")
                .long("dry")
                .help("Report changes without writing class files or the lock file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Only print warnings, errors and the summary")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
}

pub fn options_from_matches(matches: &ArgMatches) -> RunOptions {
    let project_root = matches
        .get_one::<String>("project-root")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut config = IntegratorConfig::with_project_root(project_root);
    if let Some(manifest) = matches.get_one::<String>("manifest") {
        config.manifest_file = manifest.into();
    }
    if let Some(lock) = matches.get_one::<String>("lock") {
        config.lock_file = lock.into();
    }
    if let Some(roots) = matches.get_many::<String>("source-root") {
        config.source_roots = roots.map(PathBuf::from).collect();
    }
    config.dry_run = matches.get_flag("dry");

    RunOptions {
        config,
        classes: matches
            .get_many::<String>("class")
            .map(|classes| classes.cloned().collect())
            .unwrap_or_default(),
        debug: matches.get_flag("debug"),
        quiet: matches.get_flag("quiet"),
    }
}

/// Loads manifest and lock file, integrates and stores the lock file again
/// (not in dry mode).
pub fn run(options: &RunOptions, notifier: &dyn IoNotifier) -> Result<RunSummary> {
    let config = &options.config;
    let manifest = Manifest::load(&config.manifest_file_path())?;
    let mut lock = LockReader::new(config.lock_file_path()).load()?;
    debug!(
        classes = manifest.len(),
        recorded = lock.len(),
        "Manifest and lock file loaded"
    );

    let summary = Integrator::new(config.clone(), &PhpParser, &PhpPrinter, notifier)
        .with_class_filter(options.classes.clone())
        .run(&manifest, &mut lock);

    if config.dry_run {
        notifier.write("Dry run: lock file left untouched");
    } else {
        LockWriter::new(config.lock_file_path()).store(&lock)?;
    }
    Ok(summary)
}
