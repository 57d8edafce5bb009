use crate::markdown::{self, Extracted};
use crate::models::{Author, Document, DocumentSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Prefix of every file-backed document id.
pub const FILE_ID_PREFIX: &str = "file:";

/// A directory the scanner enumerates for Markdown files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRoot {
    pub path: PathBuf,
    /// Descend into subdirectories. Flat roots only look at direct children.
    pub recursive: bool,
}

impl ScanRoot {
    pub fn deep(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            recursive: true,
        }
    }

    pub fn flat(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            recursive: false,
        }
    }
}

#[derive(Debug)]
pub struct ScanError {
    pub path: PathBuf,
    pub message: String,
}

/// Everything one scan produced: the documents that could be read and the
/// entries that could not.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub documents: Vec<Document>,
    pub errors: Vec<ScanError>,
}

impl ScanReport {
    pub fn record(&mut self, path: &Path, outcome: io::Result<Document>) {
        match outcome {
            Ok(doc) => self.documents.push(doc),
            Err(e) => self.errors.push(ScanError {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Log every per-file failure and keep the successes.
    pub fn into_documents(self) -> Vec<Document> {
        for err in &self.errors {
            log::warn!("Skipping {}: {}", err.path.display(), err.message);
        }
        self.documents
    }
}

/// Scan all roots and return the readable documents, logging failures.
pub fn scan_roots(roots: &[ScanRoot], skip_dirs: &[String]) -> Vec<Document> {
    let report = scan(roots, skip_dirs);
    log::debug!(
        "Scanned {} roots: {} documents, {} errors",
        roots.len(),
        report.documents.len(),
        report.errors.len()
    );
    report.into_documents()
}

/// Scan all roots, keeping per-file errors in the report.
///
/// Roots are canonicalized first so that aliased roots (`..` components,
/// symlinks) yield the same document paths and ids. Roots that do not exist
/// or are not directories contribute nothing.
pub fn scan(roots: &[ScanRoot], skip_dirs: &[String]) -> ScanReport {
    let mut report = ScanReport::default();

    for root in roots {
        let root_path = match fs::canonicalize(&root.path) {
            Ok(p) => p,
            Err(e) => {
                log::debug!("Skipping scan root {}: {}", root.path.display(), e);
                continue;
            }
        };

        if !root_path.is_dir() {
            log::debug!("Skipping scan root {}: not a directory", root_path.display());
            continue;
        }

        scan_root(&root_path, root.recursive, skip_dirs, &mut report);
    }

    report
}

fn scan_root(root: &Path, recursive: bool, skip_dirs: &[String], report: &mut ScanReport) {
    let max_depth = if recursive { usize::MAX } else { 1 };

    let walker = WalkDir::new(root)
        .follow_links(false)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped(e, skip_dirs));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                report.errors.push(ScanError {
                    path,
                    message: e.to_string(),
                });
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_markdown(&entry) {
            continue;
        }

        report.record(entry.path(), read_document(root, entry.path()));
    }
}

fn is_skipped(entry: &DirEntry, skip_dirs: &[String]) -> bool {
    let name = entry.file_name().to_string_lossy();
    if name.starts_with('.') {
        return true;
    }
    entry.file_type().is_dir() && skip_dirs.iter().any(|d| d.as_str() == name)
}

fn is_markdown(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().ends_with(".md")
}

/// Read one Markdown file into a document. Opens the file read-only.
fn read_document(root: &Path, path: &Path) -> io::Result<Document> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes).into_owned();

    let metadata = fs::metadata(path)?;
    let modified = metadata.modified()?;
    let created = metadata.created().unwrap_or(modified);

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let Extracted { title, preview } = markdown::extract(&content, &filename);

    Ok(Document {
        id: file_id(path),
        title,
        content,
        preview,
        folder: derive_folder(path, root),
        author: Author::Larry,
        pinned: false,
        tags: Vec::new(),
        created_at: DateTime::<Utc>::from(created),
        updated_at: DateTime::<Utc>::from(modified),
        source: DocumentSource::File {
            path: path.to_path_buf(),
        },
    })
}

/// Stable id for a file: the hex-encoded absolute path.
pub fn file_id(path: &Path) -> String {
    format!(
        "{}{}",
        FILE_ID_PREFIX,
        hex::encode(path.as_os_str().as_encoded_bytes())
    )
}

pub fn is_file_id(id: &str) -> bool {
    id.starts_with(FILE_ID_PREFIX)
}

/// Folder label for a file: the first directory under the root, or the
/// root's own name for files at the top level. Never empty.
pub fn derive_folder(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<_> = relative.components().collect();

    if parts.len() > 1 {
        let first = parts[0].as_os_str().to_string_lossy();
        if !first.is_empty() {
            return first.into_owned();
        }
    }

    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| root.display().to_string())
}
