//! Engine error taxonomy.
//!
//! Every failure mode the engine can hit has a dedicated variant so the CLI
//! can surface a distinct message per case. All of them are fatal for the
//! run: the tool never retries, and a failed run never persists a manifest.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VendoError {
    /// A manifest line has the wrong shape.
    #[error("corrupt manifest {}: line {line}: {reason}", path.display())]
    ManifestCorrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// The same import root appears twice in a persisted manifest.
    #[error("duplicate manifest entry for {import_root}")]
    ManifestDuplicate { import_root: String },

    /// An import is neither internal, vendored, nor installed in the
    /// workspace. A missing dependency blocks vendoring outright; silently
    /// skipping it would produce an incomplete vendor tree.
    #[error("unable to resolve import {import_path} (referenced from {referenced_from})")]
    UnresolvedImport {
        import_path: String,
        referenced_from: String,
    },

    /// A candidate dependency has uncommitted local changes. Pinning its
    /// HEAD would record a revision that does not match the files on disk.
    #[error("{import_root} has uncommitted changes in {}; commit or stash them before vendoring", path.display())]
    DirtyRevision { import_root: String, path: PathBuf },

    /// Two import roots collapse to one repository but are checked out at
    /// different revisions in the workspace.
    #[error("{first_root} ({first_revision}) and {second_root} ({second_revision}) both map to {repository} at different revisions")]
    RevisionConflict {
        repository: String,
        first_root: String,
        first_revision: String,
        second_root: String,
        second_revision: String,
    },

    /// The repository is unreachable or the pinned revision is missing.
    #[error("failed to fetch {repository} at {revision}: {reason}")]
    FetchFailed {
        repository: String,
        revision: String,
        reason: String,
    },

    /// The manifest exists but could not be read. Distinct from
    /// `ManifestCorrupt`: the persisted state may be fine.
    #[error("failed to read {}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The vendor directory or manifest destination is not writable.
    #[error("failed to write {}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Init-mode guard: a vendor directory (or manifest) is already there.
    #[error("There must not be an existing vendor directory or manifest at {} when running init", path.display())]
    VendorAlreadyExists { path: PathBuf },
}
