//! Transitive import discovery over a workspace.
//!
//! Starting from every buildable source unit under the project root (test
//! sources included), imports are expanded breadth-first and partitioned
//! into internal, vendored and external-candidate sets. Vendor trees are
//! never re-walked: a dependency brings its own already-resolved packages,
//! and descending into them would re-vendor transitive vendor trees.

use crate::config::VendorConfig;
use crate::errors::VendoError;
use crate::imports::parse::ImportParser;
use crate::imports::roots;
use anyhow::{Context, Result};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Partition of every import reachable from the project's own packages.
/// Transient; rebuilt on every run.
#[derive(Debug, Default)]
pub struct ImportSet {
    /// Packages under the project's own root.
    pub internal: BTreeSet<String>,
    /// Imports already satisfied by a vendor tree.
    pub vendored: BTreeSet<String>,
    /// Import roots of external candidates, in need of manifest entries.
    pub external: BTreeSet<String>,
}

/// A package directory queued for scanning.
struct Pending {
    /// Import path of the package, for error reporting.
    import_path: String,
    dir: PathBuf,
    /// Repository or project root whose vendor directory governs imports
    /// made from this package.
    vendor_base: PathBuf,
    include_tests: bool,
}

pub struct Walker<'a> {
    config: &'a VendorConfig,
    parser: ImportParser,
}

impl<'a> Walker<'a> {
    pub fn new(config: &'a VendorConfig) -> Self {
        Self {
            config,
            parser: ImportParser::new(),
        }
    }

    /// Discover and partition every import reachable from the project.
    pub fn walk(&self) -> Result<ImportSet> {
        let mut set = ImportSet::default();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<Pending> = VecDeque::new();

        for dir in self.project_package_dirs() {
            let import_path = match dir.strip_prefix(&self.config.project_root) {
                Ok(rel) if rel.as_os_str().is_empty() => {
                    self.config.project_import_path.clone()
                }
                Ok(rel) => format!("{}/{}", self.config.project_import_path, slash(rel)),
                Err(_) => continue,
            };
            queue.push_back(Pending {
                import_path,
                dir,
                vendor_base: self.config.project_root.clone(),
                include_tests: true,
            });
        }

        while let Some(pkg) = queue.pop_front() {
            for import in self.scan_dir(&pkg.dir, pkg.include_tests)? {
                if roots::is_standard(&import) || !visited.insert(import.clone()) {
                    continue;
                }
                self.classify(&import, &pkg, &mut set, &mut queue)?;
            }
        }
        Ok(set)
    }

    fn classify(
        &self,
        import: &str,
        from: &Pending,
        set: &mut ImportSet,
        queue: &mut VecDeque<Pending>,
    ) -> Result<()> {
        let project = &self.config.project_import_path;
        if import == project || import.starts_with(&format!("{}/", project)) {
            let rel = import
                .strip_prefix(project.as_str())
                .unwrap_or("")
                .trim_start_matches('/');
            if !self.config.project_root.join(rel).is_dir() {
                return Err(self.unresolved(import, from));
            }
            // Every project package is already a seed; no need to re-queue.
            set.internal.insert(import.to_string());
            return Ok(());
        }

        // Already satisfied by a vendor tree: the project's own, or the one
        // belonging to the dependency that holds the importing package.
        let vendored = from
            .vendor_base
            .join(&self.config.vendor_dir_name)
            .join(import);
        if vendored.is_dir() {
            set.vendored.insert(import.to_string());
            return Ok(());
        }

        let dir = self.config.src_root().join(import);
        if dir.is_dir() {
            let root = roots::import_root(import);
            set.external.insert(root.clone());
            queue.push_back(Pending {
                import_path: import.to_string(),
                dir,
                vendor_base: self.config.src_root().join(&root),
                include_tests: false,
            });
            return Ok(());
        }

        Err(self.unresolved(import, from))
    }

    fn unresolved(&self, import: &str, from: &Pending) -> anyhow::Error {
        VendoError::UnresolvedImport {
            import_path: import.to_string(),
            referenced_from: from.import_path.clone(),
        }
        .into()
    }

    /// Every directory under the project root holding buildable sources,
    /// skipping the vendor directory, testdata and hidden directories.
    fn project_package_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        let walker = WalkDir::new(&self.config.project_root)
            .into_iter()
            .filter_entry(|e| self.enter(e));
        for entry in walker.filter_map(|e| e.ok()) {
            if entry.file_type().is_dir() && has_go_files(entry.path()) {
                dirs.push(entry.path().to_path_buf());
            }
        }
        dirs
    }

    fn enter(&self, entry: &walkdir::DirEntry) -> bool {
        if !entry.file_type().is_dir() || entry.depth() == 0 {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        name != self.config.vendor_dir_name && name != "testdata" && !name.starts_with('.')
    }

    /// Imports declared by the sources of one package directory.
    fn scan_dir(&self, dir: &Path, include_tests: bool) -> Result<Vec<String>> {
        let mut imports = Vec::new();
        let entries = fs::read_dir(dir)
            .with_context(|| format!("failed to read package directory {}", dir.display()))?;
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(".go") || (!include_tests && name.ends_with("_test.go")) {
                continue;
            }
            if !path.is_file() {
                continue;
            }
            let source = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            imports.extend(self.parser.parse(&source));
        }
        Ok(imports)
    }
}

fn has_go_files(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries.filter_map(|e| e.ok()).any(|e| {
                e.file_type().is_ok_and(|t| t.is_file())
                    && e.path().extension().is_some_and(|ext| ext == "go")
            })
        })
        .unwrap_or(false)
}

fn slash(rel: &Path) -> String {
    rel.iter()
        .map(|c| c.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
