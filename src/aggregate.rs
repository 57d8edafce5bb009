use crate::models::Document;
use std::collections::HashSet;

/// Drop file documents whose path was already seen. First occurrence wins.
///
/// Scan roots may overlap (a memory directory nested inside a scanned
/// workspace), so the same file can be discovered more than once.
pub fn dedup_by_path(files: Vec<Document>) -> Vec<Document> {
    let mut seen = HashSet::new();
    files
        .into_iter()
        .filter(|doc| match doc.file_path() {
            Some(path) => seen.insert(path.clone()),
            None => true,
        })
        .collect()
}

/// Combine scanned files with database rows into one list.
///
/// Order is not meaningful here; ranking happens afterwards.
pub fn merge(files: Vec<Document>, db_docs: Vec<Document>) -> Vec<Document> {
    let files = dedup_by_path(files);
    debug_assert!(files.iter().all(|d| d.source.is_file()));
    debug_assert!(db_docs.iter().all(|d| !d.source.is_file()));

    let mut merged = db_docs;
    merged.reserve(files.len());
    merged.extend(files);
    merged
}
