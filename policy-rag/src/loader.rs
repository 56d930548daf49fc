//! Loads the policy corpus from disk.

use std::path::Path;

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::document::Document;
use crate::error::{RagError, Result};

/// Read every Markdown file under `dir`, recursively, ordered by path.
///
/// Each document's id is its path relative to `dir` with `/` separators, so
/// same-named files in different folders stay distinct. The full path is kept
/// in `source_uri` and the `source` metadata entry.
///
/// # Errors
///
/// Returns [`RagError::Io`] if `dir` does not exist or a file cannot be read
/// as UTF-8.
pub fn load_documents(dir: impl AsRef<Path>) -> Result<Vec<Document>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(RagError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("document directory not found: {}", dir.display()),
        )));
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| RagError::Io(e.into()))?;
        let is_markdown = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
        if entry.file_type().is_file() && is_markdown {
            paths.push(entry.into_path());
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let text = std::fs::read_to_string(&path)?;
        let full = path.display().to_string();
        debug!(path = %full, bytes = text.len(), "loaded document");

        let id = relative_id(dir, &path);
        let mut document = Document::new(id, text).with_source_uri(full.clone());
        document.metadata.insert("source".to_string(), full);
        documents.push(document);
    }

    info!(dir = %dir.display(), document_count = documents.len(), "loaded corpus");
    Ok(documents)
}

fn relative_id(dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(dir).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_markdown_recursively_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("shipping_policy.md"), "Ships in 3 days.").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::create_dir(dir.path().join("billing")).unwrap();
        std::fs::write(dir.path().join("billing").join("refund_policy.md"), "Refunds.").unwrap();

        let documents = load_documents(dir.path()).unwrap();
        let ids: Vec<_> = documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["billing/refund_policy.md", "shipping_policy.md"]);

        let refund = &documents[0];
        assert_eq!(refund.text, "Refunds.");
        assert!(refund.source_uri.as_deref().unwrap().ends_with("refund_policy.md"));
        assert_eq!(refund.metadata.get("source"), refund.source_uri.as_ref());
    }

    #[test]
    fn same_file_name_in_two_folders_keeps_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        for folder in ["a", "b"] {
            std::fs::create_dir(dir.path().join(folder)).unwrap();
            std::fs::write(dir.path().join(folder).join("policy.md"), folder).unwrap();
        }

        let documents = load_documents(dir.path()).unwrap();
        let ids: Vec<_> = documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a/policy.md", "b/policy.md"]);
    }

    #[test]
    fn empty_directory_is_an_empty_corpus() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_documents(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_documents(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, RagError::Io(_)));
    }
}
