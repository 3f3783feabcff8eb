//! Content classification.
//!
//! Maps a resolved path's extension to a MIME type and decides whether the
//! body is treated as text (read as UTF-8) or raw bytes. The extension
//! table ships with the binary (`etc/mime.json`) and is parsed once.

use std::collections::HashMap;
use std::path::Path;

const MIME_TABLE: &str = include_str!("../../etc/mime.json");

/// Fallback for extensions the table does not know. Deliberately a text
/// type, not application/octet-stream.
const UNKNOWN_EXTENSION: &str = "text/plain";

/// Extensionless paths (directory requests included) classify as HTML.
const NO_EXTENSION: &str = "text/html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub content_type: String,
    pub is_text: bool,
}

/// Immutable extension → MIME lookup.
#[derive(Debug)]
pub struct ContentClassifier {
    table: HashMap<String, String>,
}

impl ContentClassifier {
    /// Parse the embedded MIME table.
    pub fn from_embedded() -> Result<Self, serde_json::Error> {
        let table: HashMap<String, String> = serde_json::from_str(MIME_TABLE)?;
        Ok(Self { table })
    }

    /// Classify a path by its lower-cased extension.
    pub fn classify(&self, path: &Path) -> Classification {
        let content_type = match path.extension().and_then(|ext| ext.to_str()) {
            None => NO_EXTENSION.to_string(),
            Some(ext) => {
                let key = format!(".{}", ext.to_ascii_lowercase());
                self.table
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_EXTENSION.to_string())
            }
        };
        let is_text = content_type.starts_with("text/") || content_type == "text/javascript";
        Classification {
            content_type,
            is_text,
        }
    }
}
