use crate::models::Document;
use std::collections::BTreeSet;

/// Folders offered even before any document lives in them.
pub const BASELINE_FOLDERS: &[&str] = &[
    "Getting Started",
    "Planning",
    "Family",
    "Development",
    "Notes",
];

/// Distinct folder names across the database, scanned files and the
/// baseline set, sorted. The "All" entry is left to the caller.
pub fn folder_facets<S: AsRef<str>>(
    db_folders: &[String],
    files: &[Document],
    baseline: &[S],
) -> Vec<String> {
    let mut folders: BTreeSet<&str> = BTreeSet::new();
    folders.extend(baseline.iter().map(|f| f.as_ref()));
    folders.extend(db_folders.iter().map(String::as_str));
    folders.extend(files.iter().map(|d| d.folder.as_str()));

    folders
        .into_iter()
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}
