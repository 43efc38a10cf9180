//! git-backed fetch capability.

use crate::errors::VendoError;
use anyhow::Result;
use git2::Repository;
use git2::build::CheckoutBuilder;
use std::path::Path;

/// Fetch capability: produce a working tree for one repository pinned at
/// one revision, or fail. `Sync` so entries can fetch in parallel.
pub trait Fetcher: Sync {
    fn fetch(&self, repository: &str, revision: &str, dest: &Path) -> Result<()>;
}

/// Clones the repository and force-checks-out the pinned revision with a
/// detached HEAD.
pub struct GitFetcher;

impl Fetcher for GitFetcher {
    fn fetch(&self, repository: &str, revision: &str, dest: &Path) -> Result<()> {
        let fetch_failed = |reason: String| VendoError::FetchFailed {
            repository: repository.to_string(),
            revision: revision.to_string(),
            reason,
        };
        let repo = Repository::clone(repository, dest)
            .map_err(|e| fetch_failed(e.message().to_string()))?;
        checkout(&repo, revision)
            .map_err(|e| fetch_failed(format!("revision not found: {}", e.message())))?;
        Ok(())
    }
}

fn checkout(repo: &Repository, revision: &str) -> Result<(), git2::Error> {
    let obj = match git2::Oid::from_str(revision) {
        Ok(oid) => repo.find_object(oid, None)?,
        // tags and abbreviated ids
        Err(_) => repo.revparse_single(revision)?,
    };
    let commit = obj.peel(git2::ObjectType::Commit)?;
    repo.set_head_detached(commit.id())?;
    let mut opts = CheckoutBuilder::new();
    opts.force();
    repo.checkout_tree(&commit, Some(&mut opts))?;
    Ok(())
}
