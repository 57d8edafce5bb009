use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Who wrote a document. File-backed documents are attributed to `larry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    Dj,
    #[default]
    Larry,
    System,
}

impl Author {
    pub fn as_str(&self) -> &'static str {
        match self {
            Author::Dj => "dj",
            Author::Larry => "larry",
            Author::System => "system",
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Author {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dj" => Ok(Author::Dj),
            "larry" => Ok(Author::Larry),
            "system" => Ok(Author::System),
            other => Err(format!("unknown author: {}", other)),
        }
    }
}

/// Provenance of a document, serialized as `"source": "db" | "file"`.
///
/// File documents also carry the absolute path they were read from
/// (`filePath` on the wire). The path is the deduplication key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source")]
pub enum DocumentSource {
    #[serde(rename = "db")]
    Database,
    #[serde(rename = "file")]
    File {
        #[serde(rename = "filePath")]
        path: PathBuf,
    },
}

impl DocumentSource {
    pub fn is_file(&self) -> bool {
        matches!(self, DocumentSource::File { .. })
    }
}

/// A document from either the database or a scanned Markdown file.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Plain-text excerpt of `content`, see [`crate::markdown::extract_preview`].
    pub preview: String,
    pub folder: String,
    pub author: Author,
    pub pinned: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub source: DocumentSource,
}

impl Document {
    /// Absolute path for file-backed documents.
    pub fn file_path(&self) -> Option<&PathBuf> {
        match &self.source {
            DocumentSource::File { path } => Some(path),
            DocumentSource::Database => None,
        }
    }
}

fn default_folder() -> String {
    "Uncategorized".to_string()
}

/// Request body for creating a database document.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_folder")]
    pub folder: String,
    #[serde(default)]
    pub author: Author,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update for a database document. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub folder: Option<String>,
    pub author: Option<Author>,
    pub pinned: Option<bool>,
    pub tags: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(source: DocumentSource) -> Document {
        let ts = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        Document {
            id: "abc".to_string(),
            title: "Title".to_string(),
            content: "Body".to_string(),
            preview: "Body".to_string(),
            folder: "Notes".to_string(),
            author: Author::Dj,
            pinned: false,
            tags: vec![],
            created_at: ts,
            updated_at: ts,
            source,
        }
    }

    #[test]
    fn test_database_document_shape() {
        let json = serde_json::to_value(sample(DocumentSource::Database)).unwrap();
        assert_eq!(json["source"], "db");
        assert_eq!(json["author"], "dj");
        assert!(json.get("filePath").is_none());
    }

    #[test]
    fn test_file_document_shape() {
        let doc = sample(DocumentSource::File {
            path: PathBuf::from("/notes/a.md"),
        });
        let json = serde_json::to_value(doc).unwrap();
        assert_eq!(json["source"], "file");
        assert_eq!(json["filePath"], "/notes/a.md");
    }

    #[test]
    fn test_new_document_defaults() {
        let doc: NewDocument = serde_json::from_str(r#"{"title":"Plan"}"#).unwrap();
        assert_eq!(doc.folder, "Uncategorized");
        assert_eq!(doc.author, Author::Larry);
        assert!(!doc.pinned);
        assert!(doc.tags.is_empty());
        assert!(doc.content.is_empty());
    }

    #[test]
    fn test_author_round_trips_through_str() {
        for author in [Author::Dj, Author::Larry, Author::System] {
            assert_eq!(author.as_str().parse::<Author>().unwrap(), author);
        }
        assert!("bob".parse::<Author>().is_err());
    }
}
