//! Filesystem probing and index-file discovery.
//!
//! # Responsibilities
//! - Decide whether a resolved path is a directory, a file, or absent
//! - Discover index candidates inside directories
//! - Read template sources for template-extension files
//!
//! # Design Decisions
//! - The template index (`index.tera`) has strict priority over the HTML
//!   index (`index.html`) regardless of directory listing order: finding
//!   it stops the scan, while the HTML index is only remembered
//! - Entry names are collected during the same scan so a listing renderer
//!   never walks the directory twice
//! - Not-found maps to `Missing`; every other I/O failure maps to
//!   `ReadFailure` and surfaces as 400

use std::io::ErrorKind;
use std::path::Path;

use crate::routing::classify::ContentClassifier;
use crate::routing::resolver::ResolvedTarget;

/// File name of the template index.
pub const TEMPLATE_INDEX: &str = "index.tera";
/// File name of the plain HTML index.
pub const HTML_INDEX: &str = "index.html";
/// Extension that routes a file through the template engine.
pub const TEMPLATE_EXTENSION: &str = "tera";

/// Index candidate found in a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Template,
    Html,
}

impl IndexKind {
    pub fn file_name(self) -> &'static str {
        match self {
            IndexKind::Template => TEMPLATE_INDEX,
            IndexKind::Html => HTML_INDEX,
        }
    }
}

/// What the probe found at a resolved path.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A directory, with its index candidate (if any) and raw entry names.
    Directory {
        index: Option<IndexKind>,
        entries: Vec<String>,
    },
    /// A regular file to serve verbatim (or transformed).
    StaticFile { content_type: String },
    /// A template file; the raw source has been read.
    TemplatePage { source: Vec<u8> },
    /// Nothing exists at the path.
    Missing,
    /// Listing denied (decided downstream, kept for pipeline symmetry).
    Forbidden,
    /// The resolver refused the path; never touch the filesystem.
    ResolutionError,
    /// An I/O failure other than not-found (permissions and the like).
    ReadFailure,
}

/// Probe a resolved target.
pub async fn probe(target: &ResolvedTarget, classifier: &ContentClassifier) -> DispatchOutcome {
    if !target.safe {
        return DispatchOutcome::ResolutionError;
    }

    let meta = match tokio::fs::metadata(&target.path).await {
        Ok(meta) => meta,
        Err(err) => return outcome_for_error(err),
    };

    if meta.is_dir() {
        return probe_directory(&target.path).await;
    }

    let is_template = target
        .path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(TEMPLATE_EXTENSION));
    if is_template {
        return match tokio::fs::read(&target.path).await {
            Ok(source) => DispatchOutcome::TemplatePage { source },
            Err(err) => outcome_for_error(err),
        };
    }

    DispatchOutcome::StaticFile {
        content_type: classifier.classify(&target.path).content_type,
    }
}

async fn probe_directory(path: &Path) -> DispatchOutcome {
    let mut reader = match tokio::fs::read_dir(path).await {
        Ok(reader) => reader,
        Err(err) => return outcome_for_error(err),
    };

    let mut index = None;
    let mut entries = Vec::new();
    loop {
        match reader.next_entry().await {
            Ok(Some(entry)) => {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name == TEMPLATE_INDEX {
                    index = Some(IndexKind::Template);
                    // Template index wins outright; no later entry changes it.
                    entries.push(name);
                    break;
                }
                if name == HTML_INDEX && index.is_none() {
                    index = Some(IndexKind::Html);
                }
                entries.push(name);
            }
            Ok(None) => break,
            Err(err) => return outcome_for_error(err),
        }
    }

    DispatchOutcome::Directory { index, entries }
}

fn outcome_for_error(err: std::io::Error) -> DispatchOutcome {
    if err.kind() == ErrorKind::NotFound {
        DispatchOutcome::Missing
    } else {
        DispatchOutcome::ReadFailure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn classifier() -> ContentClassifier {
        ContentClassifier::from_embedded().unwrap()
    }

    fn target(path: PathBuf) -> ResolvedTarget {
        ResolvedTarget {
            root: path.parent().unwrap().to_path_buf(),
            path,
            safe: true,
        }
    }

    #[tokio::test]
    async fn template_index_beats_html_index() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "html").unwrap();
        fs::write(dir.path().join("index.tera"), "tera").unwrap();
        fs::write(dir.path().join("other.txt"), "x").unwrap();

        let outcome = probe(&target(dir.path().to_path_buf()), &classifier()).await;
        match outcome {
            DispatchOutcome::Directory { index, .. } => {
                assert_eq!(index, Some(IndexKind::Template));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn html_index_used_when_alone() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "html").unwrap();

        let outcome = probe(&target(dir.path().to_path_buf()), &classifier()).await;
        match outcome {
            DispatchOutcome::Directory { index, .. } => {
                assert_eq!(index, Some(IndexKind::Html));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn indexless_directory_reports_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();

        let outcome = probe(&target(dir.path().to_path_buf()), &classifier()).await;
        match outcome {
            DispatchOutcome::Directory { index, mut entries } => {
                assert_eq!(index, None);
                entries.sort();
                assert_eq!(entries, vec!["a.txt", "b.txt"]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn absent_path_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = probe(&target(dir.path().join("nope.html")), &classifier()).await;
        assert!(matches!(outcome, DispatchOutcome::Missing));
    }

    #[tokio::test]
    async fn template_file_source_is_read() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("page.tera"), "{{ GET.q }}").unwrap();
        let outcome = probe(&target(dir.path().join("page.tera")), &classifier()).await;
        match outcome {
            DispatchOutcome::TemplatePage { source } => {
                assert_eq!(source, b"{{ GET.q }}");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn plain_file_is_classified() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.js"), "let x = 1;").unwrap();
        let outcome = probe(&target(dir.path().join("app.js")), &classifier()).await;
        match outcome {
            DispatchOutcome::StaticFile { content_type } => {
                assert_eq!(content_type, "text/javascript");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsafe_target_never_touches_disk() {
        let outcome = probe(
            &ResolvedTarget {
                path: PathBuf::from("/etc/passwd"),
                safe: false,
                root: PathBuf::from("/srv/www"),
            },
            &classifier(),
        )
        .await;
        assert!(matches!(outcome, DispatchOutcome::ResolutionError));
    }
}
