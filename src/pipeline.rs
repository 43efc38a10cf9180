//! Run orchestration.
//!
//! One invocation is one pipeline: guard (init only) → walk → resolve →
//! merge → synchronize → persist. Any failure aborts the remaining steps;
//! the manifest on disk is only rewritten after every selected entry has
//! synchronized, so a failed run leaves prior state exactly as it was.

use crate::config::VendorConfig;
use crate::errors::VendoError;
use crate::imports::Walker;
use crate::manifest::Manifest;
use crate::resolve::{GitLocator, Locator, Resolver};
use crate::sync::{Fetcher, GitFetcher, Synchronizer};
use anyhow::{Result, bail};
use colored::*;

#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    /// Bootstrap mode: requires that no vendor state exists yet.
    pub init: bool,
    /// Import-root prefixes selecting the entries to (re)synchronize;
    /// empty selects every entry.
    pub filter: Vec<String>,
    /// Explicit repin; the CLI guarantees exactly one filter path with it.
    pub revision: Option<String>,
    pub verbose: bool,
}

/// Run the full pipeline with the git-backed capabilities.
pub fn run(config: &VendorConfig, options: &RunOptions) -> Result<()> {
    let locator = GitLocator::new(config);
    run_with(config, options, &locator, &GitFetcher)
}

/// Pipeline entry point with injectable capabilities; tests swap in fakes.
pub fn run_with(
    config: &VendorConfig,
    options: &RunOptions,
    locator: &dyn Locator,
    fetcher: &dyn Fetcher,
) -> Result<()> {
    if options.init {
        guard_init(config)?;
    }
    let mut manifest = if options.init {
        Manifest::default()
    } else {
        Manifest::load(&config.manifest_path())?
    };

    println!(
        "{} Collecting imports of {}...",
        "🔎".cyan(),
        config.project_import_path
    );
    let imports = Walker::new(config).walk()?;
    if options.verbose {
        println!(
            "   {} internal, {} vendored, {} external root(s)",
            imports.internal.len(),
            imports.vendored.len(),
            imports.external.len()
        );
    }

    let resolver = Resolver::new(locator);
    let mut updates = resolver.resolve(&manifest, &imports.external, &options.filter)?;
    if let Some(revision) = &options.revision {
        let Some(root) = options.filter.first() else {
            bail!("a revision override needs an import root to apply to");
        };
        updates.push(resolver.repin(&manifest, root, revision)?);
    }
    if !updates.is_empty() {
        println!("   {} Recording {} manifest update(s)", "+".green(), updates.len());
    }
    manifest.merge(updates);

    let selected = manifest.selected(&options.filter);
    println!("{} Synchronizing {} package(s)...", "📦".blue(), selected.len());
    Synchronizer::new(config, fetcher).sync(&selected, options.verbose)?;

    manifest.save(&config.manifest_path())?;
    println!("{} Success", "✓".green());
    Ok(())
}

/// Init protects manually curated vendor state: it refuses to run over an
/// existing vendor directory or manifest.
fn guard_init(config: &VendorConfig) -> Result<()> {
    let vendor_dir = config.vendor_dir();
    if vendor_dir.exists() {
        return Err(VendoError::VendorAlreadyExists { path: vendor_dir }.into());
    }
    let manifest_path = config.manifest_path();
    if manifest_path.exists() {
        return Err(VendoError::VendorAlreadyExists {
            path: manifest_path,
        }
        .into());
    }
    Ok(())
}
