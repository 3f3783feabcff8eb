//! URL-path to filesystem-path resolution.
//!
//! # Responsibilities
//! - Percent-decode and lexically normalize the request path
//! - Join it to the document root and prove the result stays inside
//! - Fail closed: a missing or unreadable root resolves nothing
//!
//! # Design Decisions
//! - Safety is judged on the normalized, joined result, never on the raw
//!   string, so encoded traversal (`%2e%2e%2f`) gets no special casing
//! - A `..` that would climb above the root marks the whole request
//!   unsafe instead of being clamped
//! - Filesystem errors during the root check yield `safe = false` rather
//!   than propagating

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Outcome of resolving one URL path against a document root.
///
/// `safe == false` means the pipeline must not touch the filesystem at
/// `path`; the request is a resolution failure, not merely forbidden.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub path: PathBuf,
    pub safe: bool,
    pub root: PathBuf,
}

impl ResolvedTarget {
    fn unsafe_at(root: &Path) -> Self {
        Self {
            path: root.to_path_buf(),
            safe: false,
            root: root.to_path_buf(),
        }
    }
}

/// Resolve `url_path` against `root`.
pub async fn resolve(root: &Path, url_path: &str) -> ResolvedTarget {
    // Fail closed when the root itself is absent or not a directory.
    match tokio::fs::metadata(root).await {
        Ok(meta) if meta.is_dir() => {}
        _ => return ResolvedTarget::unsafe_at(root),
    }

    let decoded = percent_decode_str(url_path).decode_utf8_lossy();
    let Some(relative) = normalize(decoded.trim_start_matches('/')) else {
        return ResolvedTarget::unsafe_at(root);
    };

    let joined = root.join(&relative);
    // Re-check on the joined result: the relative part must exist, must not
    // begin with a parent segment, and must not be absolute on its own.
    let safe = match joined.strip_prefix(root) {
        Ok(rest) => {
            !rest.is_absolute()
                && !matches!(rest.components().next(), Some(Component::ParentDir))
        }
        Err(_) => false,
    };

    ResolvedTarget {
        path: joined,
        safe,
        root: root.to_path_buf(),
    }
}

/// Lexically collapse `.` and `..` segments. Returns `None` when the path
/// climbs above its starting point or smuggles in a new root.
fn normalize(relative: &str) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    let mut depth: usize = 0;
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(segment) => {
                out.push(segment);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                out.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}
