//! Revision resolution for external import roots.
//!
//! New roots discovered by the walker are mapped to a repository location
//! and the revision currently checked out in the workspace. Entries already
//! recorded in the manifest keep their pin; re-running the tool never moves
//! a revision unless a repin is explicitly requested.

use crate::config::VendorConfig;
use crate::errors::VendoError;
use crate::manifest::{Manifest, ManifestEntry, matches_filter};
use anyhow::{Context, Result};
use git2::{Repository, StatusOptions};
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::fs;

/// Repository coordinates of one import root in the external workspace.
#[derive(Debug, Clone)]
pub struct Located {
    pub repository: String,
    pub revision: String,
    pub sub_path: Option<String>,
}

/// Source-location capability: map an import root to its repository and the
/// revision of the copy present in the workspace.
pub trait Locator {
    fn locate(&self, import_root: &str) -> Result<Located>;
}

/// Locates packages through the git checkout enclosing them under
/// `<workspace>/src/`.
pub struct GitLocator<'a> {
    config: &'a VendorConfig,
}

impl<'a> GitLocator<'a> {
    pub fn new(config: &'a VendorConfig) -> Self {
        Self { config }
    }
}

impl Locator for GitLocator<'_> {
    fn locate(&self, import_root: &str) -> Result<Located> {
        let pkg_dir = self.config.src_root().join(import_root);
        if !pkg_dir.is_dir() {
            return Err(VendoError::UnresolvedImport {
                import_path: import_root.to_string(),
                referenced_from: "external workspace".to_string(),
            }
            .into());
        }
        let pkg_dir = fs::canonicalize(&pkg_dir)?;

        let repo = Repository::discover(&pkg_dir)
            .with_context(|| format!("no git repository found above {}", pkg_dir.display()))?;
        let workdir = repo
            .workdir()
            .with_context(|| format!("bare repository for {}", import_root))?;
        let workdir = fs::canonicalize(workdir)?;

        if is_dirty(&repo)? {
            return Err(VendoError::DirtyRevision {
                import_root: import_root.to_string(),
                path: workdir,
            }
            .into());
        }

        let head = repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .with_context(|| format!("no commit checked out in {}", workdir.display()))?;
        let revision = head.id().to_string();

        let sub_path = pkg_dir
            .strip_prefix(&workdir)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(|rel| {
                rel.iter()
                    .map(|c| c.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            });

        let repository = repo
            .find_remote("origin")
            .ok()
            .and_then(|remote| remote.url().map(str::to_owned))
            .unwrap_or_else(|| fallback_repository(self.config, &workdir, import_root));

        Ok(Located {
            repository,
            revision,
            sub_path,
        })
    }
}

/// Without an origin remote the hosting convention names the repository:
/// the workspace-relative path of the checkout, fetched over https.
fn fallback_repository(
    config: &VendorConfig,
    workdir: &std::path::Path,
    import_root: &str,
) -> String {
    let src_root = fs::canonicalize(config.src_root()).unwrap_or_else(|_| config.src_root());
    match workdir.strip_prefix(&src_root) {
        Ok(rel) if !rel.as_os_str().is_empty() => format!(
            "https://{}",
            rel.iter()
                .map(|c| c.to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        ),
        _ => format!("https://{}", import_root),
    }
}

/// Modified or untracked (non-ignored) files make the checkout
/// non-reproducible; resolution refuses to pin it.
fn is_dirty(repo: &Repository) -> Result<bool> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true).include_ignored(false);
    let statuses = repo.statuses(Some(&mut opts))?;
    Ok(!statuses.is_empty())
}

pub struct Resolver<'a> {
    locator: &'a dyn Locator,
}

impl<'a> Resolver<'a> {
    pub fn new(locator: &'a dyn Locator) -> Self {
        Self { locator }
    }

    /// Produce manifest updates for external roots that have no entry yet.
    /// Recorded entries are left untouched; with an active filter, only new
    /// roots inside the filter are resolved so unrelated entries stay
    /// byte-for-byte stable.
    pub fn resolve(
        &self,
        manifest: &Manifest,
        external_roots: &BTreeSet<String>,
        filter: &[String],
    ) -> Result<Vec<ManifestEntry>> {
        let mut updates = Vec::new();
        for root in external_roots {
            if manifest.contains(root) || !matches_filter(root, filter) {
                continue;
            }
            let located = self.locator.locate(root)?;
            updates.push(ManifestEntry {
                import_root: root.clone(),
                repository: located.repository,
                revision: located.revision,
                sub_path: located.sub_path,
            });
        }
        collapse(updates)
    }

    /// Replace the pin for one root, creating the entry if the package is
    /// installed in the workspace but not recorded yet.
    pub fn repin(
        &self,
        manifest: &Manifest,
        import_root: &str,
        revision: &str,
    ) -> Result<ManifestEntry> {
        match manifest.get(import_root) {
            Some(existing) => Ok(ManifestEntry {
                revision: revision.to_string(),
                ..existing.clone()
            }),
            None => {
                let located = self.locator.locate(import_root)?;
                Ok(ManifestEntry {
                    import_root: import_root.to_string(),
                    repository: located.repository,
                    revision: revision.to_string(),
                    sub_path: located.sub_path,
                })
            }
        }
    }
}

/// Fold roots that share one repository into a single entry keyed by the
/// shortest root. Two roots pinned at different revisions of the same
/// repository are a conflict the user has to resolve; guessing one of the
/// two would vendor a tree nobody asked for.
fn collapse(updates: Vec<ManifestEntry>) -> Result<Vec<ManifestEntry>> {
    let mut out: Vec<ManifestEntry> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for entry in updates {
        match seen.get(&entry.repository) {
            None => {
                seen.insert(entry.repository.clone(), out.len());
                out.push(entry);
            }
            Some(&i) => {
                let kept = &mut out[i];
                if kept.revision != entry.revision {
                    return Err(VendoError::RevisionConflict {
                        repository: entry.repository,
                        first_root: kept.import_root.clone(),
                        first_revision: kept.revision.clone(),
                        second_root: entry.import_root,
                        second_revision: entry.revision,
                    }
                    .into());
                }
                if entry.import_root.len() < kept.import_root.len() {
                    *kept = entry;
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeLocator {
        packages: HashMap<String, Located>,
    }

    impl FakeLocator {
        fn new(packages: &[(&str, &str, &str)]) -> Self {
            let packages = packages
                .iter()
                .map(|(root, repo, rev)| {
                    (
                        root.to_string(),
                        Located {
                            repository: repo.to_string(),
                            revision: rev.to_string(),
                            sub_path: None,
                        },
                    )
                })
                .collect();
            Self { packages }
        }
    }

    impl Locator for FakeLocator {
        fn locate(&self, import_root: &str) -> Result<Located> {
            self.packages.get(import_root).cloned().ok_or_else(|| {
                VendoError::UnresolvedImport {
                    import_path: import_root.to_string(),
                    referenced_from: "fake workspace".to_string(),
                }
                .into()
            })
        }
    }

    fn roots(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_roots_are_resolved_and_recorded_ones_kept() {
        let locator = FakeLocator::new(&[
            ("github.com/a/b", "https://github.com/a/b", "newrev"),
            ("github.com/c/d", "https://github.com/c/d", "ccc111"),
        ]);
        let mut manifest = Manifest::default();
        manifest.merge(vec![ManifestEntry {
            import_root: "github.com/a/b".to_string(),
            repository: "https://github.com/a/b".to_string(),
            revision: "pinned".to_string(),
            sub_path: None,
        }]);

        let resolver = Resolver::new(&locator);
        let updates = resolver
            .resolve(&manifest, &roots(&["github.com/a/b", "github.com/c/d"]), &[])
            .unwrap();

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].import_root, "github.com/c/d");
        assert_eq!(updates[0].revision, "ccc111");
    }

    #[test]
    fn test_filter_restricts_new_resolution() {
        let locator = FakeLocator::new(&[
            ("github.com/a/b", "https://github.com/a/b", "aaa"),
            ("github.com/c/d", "https://github.com/c/d", "ccc"),
        ]);
        let manifest = Manifest::default();
        let resolver = Resolver::new(&locator);

        let updates = resolver
            .resolve(
                &manifest,
                &roots(&["github.com/a/b", "github.com/c/d"]),
                &["github.com/a".to_string()],
            )
            .unwrap();

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].import_root, "github.com/a/b");
    }

    #[test]
    fn test_shared_repository_collapses_to_shortest_root() {
        let locator = FakeLocator::new(&[
            ("golang.org/x/net", "https://go.googlesource.com/net", "n1"),
            ("golang.org/x/net/context", "https://go.googlesource.com/net", "n1"),
        ]);
        let resolver = Resolver::new(&locator);
        let updates = resolver
            .resolve(
                &Manifest::default(),
                &roots(&["golang.org/x/net", "golang.org/x/net/context"]),
                &[],
            )
            .unwrap();

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].import_root, "golang.org/x/net");
    }

    #[test]
    fn test_revision_drift_is_a_conflict() {
        let locator = FakeLocator::new(&[
            ("example.com/a/repo", "https://example.com/repo", "rev1"),
            ("example.com/b/repo", "https://example.com/repo", "rev2"),
        ]);
        let resolver = Resolver::new(&locator);
        let err = resolver
            .resolve(
                &Manifest::default(),
                &roots(&["example.com/a/repo", "example.com/b/repo"]),
                &[],
            )
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VendoError>(),
            Some(VendoError::RevisionConflict { .. })
        ));
    }

    #[test]
    fn test_repin_keeps_repository_of_existing_entry() {
        let locator = FakeLocator::new(&[]);
        let mut manifest = Manifest::default();
        manifest.merge(vec![ManifestEntry {
            import_root: "github.com/a/b".to_string(),
            repository: "https://github.com/a/b".to_string(),
            revision: "old".to_string(),
            sub_path: Some("pkg".to_string()),
        }]);

        let resolver = Resolver::new(&locator);
        let entry = resolver.repin(&manifest, "github.com/a/b", "new").unwrap();
        assert_eq!(entry.revision, "new");
        assert_eq!(entry.repository, "https://github.com/a/b");
        assert_eq!(entry.sub_path.as_deref(), Some("pkg"));
    }

    mod git {
        use super::super::*;
        use crate::config::VendorConfig;
        use std::fs;
        use std::path::Path;

        fn commit_all(repo: &Repository, msg: &str) -> git2::Oid {
            let mut index = repo.index().unwrap();
            index
                .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
                .unwrap();
            index.write().unwrap();
            let tree_id = index.write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            let sig = git2::Signature::now("tester", "tester@example.com").unwrap();
            let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
            let parents: Vec<&git2::Commit> = parent.iter().collect();
            repo.commit(Some("HEAD"), &sig, &sig, msg, &tree, &parents)
                .unwrap()
        }

        fn init_package(dir: &Path) -> (Repository, git2::Oid) {
            fs::create_dir_all(dir).unwrap();
            fs::write(dir.join("lib.go"), "package lib\n").unwrap();
            let repo = Repository::init(dir).unwrap();
            let oid = commit_all(&repo, "initial");
            (repo, oid)
        }

        fn config_for(ws: &Path) -> VendorConfig {
            let proj = ws.join("src/example.com/me/proj");
            fs::create_dir_all(&proj).unwrap();
            VendorConfig::new(ws.to_path_buf(), proj).unwrap()
        }

        #[test]
        fn test_locate_pins_head_commit() {
            let ws = tempfile::tempdir().unwrap();
            let config = config_for(ws.path());
            let dep = ws.path().join("src/github.com/a/b");
            let (repo, oid) = init_package(&dep);
            repo.remote("origin", "https://github.com/a/b").unwrap();

            let located = GitLocator::new(&config).locate("github.com/a/b").unwrap();
            assert_eq!(located.revision, oid.to_string());
            assert_eq!(located.repository, "https://github.com/a/b");
            assert_eq!(located.sub_path, None);
        }

        #[test]
        fn test_locate_records_sub_path_for_nested_package() {
            let ws = tempfile::tempdir().unwrap();
            let config = config_for(ws.path());
            let dep = ws.path().join("src/github.com/a/b");
            fs::create_dir_all(dep.join("nested/pkg")).unwrap();
            fs::write(dep.join("nested/pkg/p.go"), "package pkg\n").unwrap();
            let (_repo, _oid) = init_package(&dep);

            let located = GitLocator::new(&config)
                .locate("github.com/a/b/nested/pkg")
                .unwrap();
            assert_eq!(located.sub_path.as_deref(), Some("nested/pkg"));
            // No origin remote: the hosting convention names the repository.
            assert_eq!(located.repository, "https://github.com/a/b");
        }

        #[test]
        fn test_dirty_checkout_blocks_resolution() {
            let ws = tempfile::tempdir().unwrap();
            let config = config_for(ws.path());
            let dep = ws.path().join("src/github.com/a/b");
            init_package(&dep);
            fs::write(dep.join("scratch.go"), "package lib // uncommitted\n").unwrap();

            let err = GitLocator::new(&config)
                .locate("github.com/a/b")
                .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<VendoError>(),
                Some(VendoError::DirtyRevision { import_root, .. }) if import_root == "github.com/a/b"
            ));
        }
    }
}
