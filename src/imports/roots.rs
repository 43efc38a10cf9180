//! Hosting-convention rules for import roots.
//!
//! The root is the shortest import-path prefix that names an independently
//! fetchable repository. For the common hosts that is `host/org/repo`;
//! `gopkg.in` packages can live one level higher.

/// Derive the import root of an import path.
pub fn import_root(import_path: &str) -> String {
    let segments: Vec<&str> = import_path.split('/').collect();
    let take = match segments[0] {
        "gopkg.in" => {
            // gopkg.in/pkg.v3 or gopkg.in/user/pkg.v3
            if segments.len() >= 2 && segments[1].contains(".v") {
                2
            } else {
                3
            }
        }
        // github.com, gitlab.com, bitbucket.org, golang.org and anything
        // else following the host/org/repo layout
        _ => 3,
    };
    segments
        .iter()
        .take(take.min(segments.len()))
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}

/// Standard-library imports carry no host: their first segment has no dot.
pub fn is_standard(import_path: &str) -> bool {
    match import_path.split('/').next() {
        Some(first) if !first.is_empty() => !first.contains('.'),
        _ => true,
    }
}
