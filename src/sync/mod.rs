//! Vendor tree synchronization.
//!
//! Each selected manifest entry is fetched at its pinned revision into a
//! staging directory, filtered, and swapped into the vendor directory as
//! one uninterruptible unit. Entries synchronize in parallel on a bounded
//! worker pool; the first failure aborts the run and the manifest is never
//! persisted after a partial pass.

mod copy;
mod git;

pub use copy::{copy_tree_filtered, keep_path, swap_subtree};
pub use git::{Fetcher, GitFetcher};

use crate::config::VendorConfig;
use crate::errors::VendoError;
use crate::manifest::ManifestEntry;
use anyhow::{Context, Result};
use colored::*;
use rayon::prelude::*;
use std::fs;

const MAX_PARALLEL_FETCHES: usize = 4;

pub struct Synchronizer<'a> {
    config: &'a VendorConfig,
    fetcher: &'a dyn Fetcher,
}

impl<'a> Synchronizer<'a> {
    pub fn new(config: &'a VendorConfig, fetcher: &'a dyn Fetcher) -> Self {
        Self { config, fetcher }
    }

    /// Synchronize every selected entry. Completion order within a wave is
    /// irrelevant; entries already swapped before a failure stay in place
    /// (each swap is atomic on its own) and the caller skips the manifest
    /// write. A hand-written manifest may carry nested roots whose
    /// destinations overlap, so an entry nested below another selected
    /// entry swaps only after its ancestor has.
    pub fn sync(&self, entries: &[&ManifestEntry], verbose: bool) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let vendor_dir = self.config.vendor_dir();
        fs::create_dir_all(&vendor_dir).map_err(|e| VendoError::WriteFailed {
            path: vendor_dir.clone(),
            source: e,
        })?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(MAX_PARALLEL_FETCHES.min(entries.len()))
            .build()
            .context("failed to build the sync worker pool")?;
        for wave in nesting_waves(entries) {
            pool.install(|| {
                wave.par_iter()
                    .try_for_each(|entry| self.sync_entry(entry, verbose))
            })?;
        }
        Ok(())
    }

    fn sync_entry(&self, entry: &ManifestEntry, verbose: bool) -> Result<()> {
        if verbose {
            println!(
                "   {} Fetching {} @ {}",
                "📦".blue(),
                entry.import_root,
                short_rev(&entry.revision)
            );
        }
        let vendor_dir = self.config.vendor_dir();
        // Staged inside the vendor directory so the final rename never
        // crosses a filesystem boundary.
        let staging = tempfile::tempdir_in(&vendor_dir).map_err(|e| VendoError::WriteFailed {
            path: vendor_dir.clone(),
            source: e,
        })?;

        let checkout = staging.path().join("checkout");
        self.fetcher
            .fetch(&entry.repository, &entry.revision, &checkout)?;

        let src = match &entry.sub_path {
            Some(sub) => checkout.join(sub),
            None => checkout.clone(),
        };
        if !src.is_dir() {
            return Err(VendoError::FetchFailed {
                repository: entry.repository.clone(),
                revision: entry.revision.clone(),
                reason: format!(
                    "sub-path {} not present in repository",
                    entry.sub_path.as_deref().unwrap_or(".")
                ),
            }
            .into());
        }

        let staged_pkg = staging.path().join("staged");
        copy_tree_filtered(
            &src,
            &staged_pkg,
            &self.config.vendor_dir_name,
            self.config.flatten,
        )?;
        let dest = vendor_dir.join(&entry.import_root);
        swap_subtree(&staged_pkg, &dest)?;

        println!(
            "   {} Vendored {} @ {}",
            "✓".green(),
            entry.import_root,
            short_rev(&entry.revision)
        );
        Ok(())
    }
}

/// Group entries by the number of selected ancestor roots. Wave N+1 holds
/// the entries nested below a wave-N entry; waves run sequentially so a
/// child's swap never races the rename-and-delete of the tree it lands in.
fn nesting_waves<'e>(entries: &[&'e ManifestEntry]) -> Vec<Vec<&'e ManifestEntry>> {
    let mut waves: Vec<Vec<&ManifestEntry>> = Vec::new();
    for entry in entries {
        let ancestors = entries
            .iter()
            .filter(|other| {
                entry
                    .import_root
                    .starts_with(&format!("{}/", other.import_root))
            })
            .count();
        while waves.len() <= ancestors {
            waves.push(Vec::new());
        }
        waves[ancestors].push(entry);
    }
    waves
}

/// First seven characters of a revision. Revisions are opaque strings, so
/// truncation has to respect char boundaries, not bytes.
fn short_rev(revision: &str) -> &str {
    match revision.char_indices().nth(7) {
        Some((idx, _)) => &revision[..idx],
        None => revision,
    }
}
