//! The `vendor.conf` manifest store.
//!
//! One entry per line, whitespace delimited:
//!
//! ```text
//! <import-root> <repository> <revision> [<sub-path>]
//! ```
//!
//! `#` comments and blank lines are tolerated on load and dropped on save.
//! Entries keep their first-seen order across load, merge and save so a
//! re-serialized manifest produces minimal diffs.

use crate::errors::VendoError;
use anyhow::Result;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Shortest import-path prefix naming an independently fetchable
    /// repository. Unique within a manifest.
    pub import_root: String,
    /// Repository location (URL or local path).
    pub repository: String,
    /// Pinned revision; opaque to the engine.
    pub revision: String,
    /// Location of the package below the repository root, when it does not
    /// live at the root itself.
    pub sub_path: Option<String>,
}

impl ManifestEntry {
    fn to_line(&self) -> String {
        match &self.sub_path {
            Some(sub) => format!(
                "{} {} {} {}",
                self.import_root, self.repository, self.revision, sub
            ),
            None => format!("{} {} {}", self.import_root, self.repository, self.revision),
        }
    }

    /// True if this entry is selected by the run filter. An empty filter
    /// selects everything; otherwise the import root must equal a filter
    /// element or sit below one.
    pub fn matches(&self, filter: &[String]) -> bool {
        matches_filter(&self.import_root, filter)
    }
}

/// Shared filter rule for manifest entries and freshly discovered roots.
pub fn matches_filter(import_root: &str, filter: &[String]) -> bool {
    filter.is_empty()
        || filter.iter().any(|f| {
            import_root == f || import_root.starts_with(&format!("{}/", f))
        })
}

/// Ordered mapping of manifest entries keyed by import root.
#[derive(Debug, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    index: HashMap<String, usize>,
}

impl Manifest {
    /// Load a manifest from disk. A missing file is an empty manifest.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| VendoError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let mut manifest = Self::default();
        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 3 || fields.len() > 4 {
                return Err(VendoError::ManifestCorrupt {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    reason: format!("expected 3 or 4 fields, found {}", fields.len()),
                }
                .into());
            }
            let entry = ManifestEntry {
                import_root: fields[0].to_string(),
                repository: fields[1].to_string(),
                revision: fields[2].to_string(),
                sub_path: fields.get(3).map(|s| s.to_string()),
            };
            if manifest.index.contains_key(&entry.import_root) {
                return Err(VendoError::ManifestDuplicate {
                    import_root: entry.import_root,
                }
                .into());
            }
            manifest.index.insert(entry.import_root.clone(), manifest.entries.len());
            manifest.entries.push(entry);
        }
        Ok(manifest)
    }

    /// Serialize all entries in their current order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(out, "{}", entry.to_line());
        }
        out
    }

    /// Write the manifest atomically: the content lands in a temp file next
    /// to the destination and is renamed over it, so a crash mid-write
    /// cannot corrupt the previous manifest.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = path.parent().unwrap_or(Path::new("."));
        let write_failed = |source: std::io::Error| VendoError::WriteFailed {
            path: path.to_path_buf(),
            source,
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_failed)?;
        tmp.write_all(self.render().as_bytes()).map_err(write_failed)?;
        tmp.persist(path).map_err(|e| write_failed(e.error))?;
        Ok(())
    }

    /// Fold updates in: replace in place when the import root exists,
    /// append otherwise. Untouched entries never move.
    pub fn merge(&mut self, updates: impl IntoIterator<Item = ManifestEntry>) {
        for entry in updates {
            match self.index.get(&entry.import_root) {
                Some(&i) => self.entries[i] = entry,
                None => {
                    self.index.insert(entry.import_root.clone(), self.entries.len());
                    self.entries.push(entry);
                }
            }
        }
    }

    pub fn get(&self, import_root: &str) -> Option<&ManifestEntry> {
        self.index.get(import_root).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, import_root: &str) -> bool {
        self.index.contains_key(import_root)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries selected by the run filter, in manifest order.
    pub fn selected(&self, filter: &[String]) -> Vec<&ManifestEntry> {
        self.entries.iter().filter(|e| e.matches(filter)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entry(root: &str, rev: &str) -> ManifestEntry {
        ManifestEntry {
            import_root: root.to_string(),
            repository: format!("https://{}", root),
            revision: rev.to_string(),
            sub_path: None,
        }
    }

    #[test]
    fn test_parse_three_and_four_fields() {
        let content = "\
# comment line
github.com/a/b https://github.com/a/b abc123

gopkg.in/yaml.v2 https://gopkg.in/yaml.v2 def456 pkg/yaml
";
        let m = Manifest::parse(content, &PathBuf::from("vendor.conf")).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.get("github.com/a/b").unwrap().revision, "abc123");
        let yaml = m.get("gopkg.in/yaml.v2").unwrap();
        assert_eq!(yaml.sub_path.as_deref(), Some("pkg/yaml"));
    }

    #[test]
    fn test_parse_wrong_field_count() {
        let content = "github.com/a/b https://github.com/a/b\n";
        let err = Manifest::parse(content, &PathBuf::from("vendor.conf")).unwrap_err();
        let corrupt = err.downcast_ref::<VendoError>().unwrap();
        match corrupt {
            VendoError::ManifestCorrupt { line, .. } => assert_eq!(*line, 1),
            other => panic!("expected ManifestCorrupt, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_duplicate_root() {
        let content = "\
github.com/a/b https://github.com/a/b abc123
github.com/a/b https://github.com/a/b def456
";
        let err = Manifest::parse(content, &PathBuf::from("vendor.conf")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VendoError>(),
            Some(VendoError::ManifestDuplicate { import_root }) if import_root == "github.com/a/b"
        ));
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let content = "\
github.com/a/b https://github.com/a/b abc123
github.com/c/d https://github.com/c/d def456 sub/dir
";
        let m = Manifest::parse(content, &PathBuf::from("vendor.conf")).unwrap();
        let rendered = m.render();
        assert_eq!(rendered, content);
        let again = Manifest::parse(&rendered, &PathBuf::from("vendor.conf")).unwrap();
        assert_eq!(again.render(), rendered);
    }

    #[test]
    fn test_merge_replaces_in_place_and_appends() {
        let mut m = Manifest::default();
        m.merge(vec![entry("github.com/a/b", "v1"), entry("github.com/c/d", "v1")]);
        m.merge(vec![entry("github.com/a/b", "v2"), entry("github.com/e/f", "v1")]);

        let roots: Vec<&str> = m.iter().map(|e| e.import_root.as_str()).collect();
        assert_eq!(roots, ["github.com/a/b", "github.com/c/d", "github.com/e/f"]);
        assert_eq!(m.get("github.com/a/b").unwrap().revision, "v2");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vendor.conf");

        let mut m = Manifest::default();
        m.merge(vec![entry("github.com/a/b", "abc123")]);
        m.save(&path).unwrap();

        let loaded = Manifest::load(&path).unwrap();
        assert_eq!(loaded.render(), m.render());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let m = Manifest::load(&dir.path().join("vendor.conf")).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn test_unreadable_manifest_is_a_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the manifest path exists but cannot be read as a
        // file; that is an I/O failure, not corrupt persisted state.
        let path = dir.path().join("vendor.conf");
        fs::create_dir(&path).unwrap();

        let err = Manifest::load(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<VendoError>(),
            Some(VendoError::ReadFailed { .. })
        ));
    }

    #[test]
    fn test_filter_matching() {
        let e = entry("github.com/coreos/etcd", "v1");
        assert!(e.matches(&[]));
        assert!(e.matches(&["github.com/coreos/etcd".to_string()]));
        assert!(e.matches(&["github.com/coreos".to_string()]));
        assert!(!e.matches(&["github.com/coreos/etc".to_string()]));
        assert!(!e.matches(&["github.com/docker".to_string()]));
    }

    #[test]
    fn test_selected_preserves_order() {
        let mut m = Manifest::default();
        m.merge(vec![
            entry("github.com/x/b", "v1"),
            entry("github.com/y/a", "v1"),
            entry("github.com/x/a", "v1"),
        ]);
        let selected = m.selected(&["github.com/x".to_string()]);
        let roots: Vec<&str> = selected.iter().map(|e| e.import_root.as_str()).collect();
        assert_eq!(roots, ["github.com/x/b", "github.com/x/a"]);
    }
}
