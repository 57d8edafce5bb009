use crate::models::Document;
use std::cmp::Ordering;

/// The folder value that means "no folder filter".
pub const ALL_FOLDERS: &str = "All";

/// Folder restriction for a listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FolderFilter {
    #[default]
    All,
    Named(String),
}

impl FolderFilter {
    /// `None`, an empty value and `"All"` all mean no filter.
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") | Some(ALL_FOLDERS) => FolderFilter::All,
            Some(name) => FolderFilter::Named(name.to_string()),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            FolderFilter::All => true,
            FolderFilter::Named(name) => doc.folder == *name,
        }
    }
}

/// Filters applied to the merged document list.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub search: Option<String>,
    pub folder: FolderFilter,
}

impl Filters {
    pub fn new(search: Option<&str>, folder: FolderFilter) -> Self {
        let search = search
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);
        Self { search, folder }
    }
}

/// Case-insensitive substring match over title, content and folder.
/// `needle` must already be lowercase.
pub fn matches_search(doc: &Document, needle: &str) -> bool {
    [&doc.title, &doc.content, &doc.folder]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

/// Pinned documents first, then most recently updated first.
pub fn compare(a: &Document, b: &Document) -> Ordering {
    b.pinned
        .cmp(&a.pinned)
        .then_with(|| b.updated_at.cmp(&a.updated_at))
}

/// Filter then order the documents. The sort is stable.
pub fn rank(mut docs: Vec<Document>, filters: &Filters) -> Vec<Document> {
    if let Some(needle) = &filters.search {
        docs.retain(|d| matches_search(d, needle));
    }
    docs.retain(|d| filters.folder.matches(d));
    docs.sort_by(compare);
    docs
}
