//! Regulation source records and format classification

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label used when manual text is entered without a name
pub const DEFAULT_MANUAL_LABEL: &str = "수동 입력 규정";

/// Format tag of a regulation source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Plain text (uploaded .txt or manual entry)
    Text,
    /// PDF document
    Pdf,
    /// Excel spreadsheet (.xlsx)
    Xlsx,
    /// Old Excel spreadsheet (.xls)
    Xls,
    /// CSV file
    Csv,
    /// Microsoft Word document (.docx)
    Docx,
    /// Image file
    Image,
    /// Anything else, decoded as text
    Unknown,
}

impl SourceKind {
    /// Detect kind from a file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "txt" | "text" => Self::Text,
            "pdf" => Self::Pdf,
            "xlsx" => Self::Xlsx,
            "xls" => Self::Xls,
            "csv" => Self::Csv,
            "docx" => Self::Docx,
            "jpg" | "jpeg" | "png" | "webp" => Self::Image,
            _ => Self::Unknown,
        }
    }

    /// Detect kind from a filename, using the text after the last dot
    pub fn from_filename(filename: &str) -> Self {
        match filename.rsplit_once('.') {
            Some((_, ext)) => Self::from_extension(ext),
            None => Self::Unknown,
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Pdf => "PDF",
            Self::Xlsx => "Excel Spreadsheet (.xlsx)",
            Self::Xls => "Excel Spreadsheet (.xls)",
            Self::Csv => "CSV",
            Self::Docx => "Word Document (.docx)",
            Self::Image => "Image",
            Self::Unknown => "Unknown",
        }
    }
}

/// One ingested regulation document or manually entered text block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegulationSource {
    /// Unique source ID
    pub id: Uuid,
    /// Display name (original filename or manual label)
    pub name: String,
    /// Format tag
    pub kind: SourceKind,
    /// Extracted plain text
    pub content: String,
    /// Rendered page snapshots as data URIs, ordered from page 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_pages: Option<Vec<String>>,
    /// Ingestion timestamp
    pub created_at: DateTime<Utc>,
}

impl RegulationSource {
    /// Create a new source. An empty snapshot list is stored as absent.
    pub fn new(
        name: impl Into<String>,
        kind: SourceKind,
        content: String,
        visual_pages: Option<Vec<String>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            content,
            visual_pages: visual_pages.filter(|pages| !pages.is_empty()),
            created_at: Utc::now(),
        }
    }

    /// Create a text source from manual entry
    pub fn manual(label: &str, content: String) -> Self {
        let label = label.trim();
        let name = if label.is_empty() { DEFAULT_MANUAL_LABEL } else { label };
        Self::new(name, SourceKind::Text, content, None)
    }

    /// Number of page snapshots attached
    pub fn page_count(&self) -> usize {
        self.visual_pages.as_ref().map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_filename() {
        assert_eq!(SourceKind::from_filename("Policy.XLSX"), SourceKind::Xlsx);
        assert_eq!(SourceKind::from_filename("rules.pdf"), SourceKind::Pdf);
        assert_eq!(SourceKind::from_filename("notes.txt"), SourceKind::Text);
        assert_eq!(SourceKind::from_filename("photo.JPeG"), SourceKind::Image);
        assert_eq!(SourceKind::from_filename("archive.tar.gz"), SourceKind::Unknown);
        assert_eq!(SourceKind::from_filename("README"), SourceKind::Unknown);
    }

    #[test]
    fn test_empty_visual_pages_become_absent() {
        let source = RegulationSource::new("a.pdf", SourceKind::Pdf, String::new(), Some(vec![]));
        assert!(source.visual_pages.is_none());
        assert_eq!(source.page_count(), 0);
    }

    #[test]
    fn test_manual_label_fallback() {
        let source = RegulationSource::manual("   ", "Article 1".to_string());
        assert_eq!(source.name, DEFAULT_MANUAL_LABEL);
        assert_eq!(source.kind, SourceKind::Text);
    }

    #[test]
    fn test_json_field_names() {
        let source = RegulationSource::new(
            "scan.pdf",
            SourceKind::Pdf,
            "text".to_string(),
            Some(vec!["data:image/png;base64,AAAA".to_string()]),
        );
        let value = serde_json::to_value(&source).unwrap();

        assert_eq!(value["kind"], "pdf");
        assert!(value.get("visualPages").is_some());
        assert!(value.get("createdAt").is_some());
    }
}
