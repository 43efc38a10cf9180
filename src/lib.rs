//! # vendo - Workspace Dependency Vendoring
//!
//! vendo discovers every external package a project imports, pins each one
//! to an exact git revision, and mirrors the pinned trees into the
//! project's `vendor/` directory. The mapping lives in a plain-text
//! `vendor.conf` manifest so the whole operation is reproducible.
//!
//! ## Quick Start
//!
//! ```bash
//! # Bootstrap a manifest from the packages installed in the workspace
//! vendo init
//!
//! # Re-vendor everything at the recorded revisions
//! vendo
//!
//! # Re-vendor a single dependency
//! vendo github.com/coreos/etcd
//! ```
//!
//! ## Module Organization
//!
//! - [`imports`] - Transitive import discovery and partitioning
//! - [`manifest`] - The `vendor.conf` store
//! - [`resolve`] - Mapping import roots to repositories and revisions
//! - [`sync`] - Fetching pinned trees into the vendor directory
//! - [`pipeline`] - Per-invocation orchestration

/// Run configuration threaded through every component.
pub mod config;

/// Engine error taxonomy.
pub mod errors;

/// Import graph discovery.
pub mod imports;

/// The `vendor.conf` manifest store.
pub mod manifest;

/// Per-invocation orchestration.
pub mod pipeline;

/// Revision resolution for external import roots.
pub mod resolve;

/// Vendor tree synchronization.
pub mod sync;
