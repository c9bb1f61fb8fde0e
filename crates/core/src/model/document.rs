use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use crate::model::ids::DocumentId;

/// File format of an uploaded study document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
}

impl DocumentKind {
    /// Guess the kind from a file name extension.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" | "md" => Some(Self::Text),
            _ => None,
        }
    }

    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentKind::Text => "text/plain",
        }
    }
}

/// Ingestion status of a document. Only `Ready` documents can feed generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentStatus {
    Ready,
    Pending,
    Error,
}

/// An ingested study document.
///
/// The payload is opaque to the core; it is handed as-is to the generation
/// collaborator.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceDocument {
    id: DocumentId,
    name: String,
    kind: DocumentKind,
    status: DocumentStatus,
    uploaded_at: DateTime<Utc>,
    data: Arc<[u8]>,
}

impl SourceDocument {
    #[must_use]
    pub fn new(
        id: DocumentId,
        name: impl Into<String>,
        kind: DocumentKind,
        status: DocumentStatus,
        uploaded_at: DateTime<Utc>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            status,
            uploaded_at,
            data: data.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Topic under which sessions generated from this document are grouped.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    #[must_use]
    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == DocumentStatus::Ready
    }

    #[must_use]
    pub fn uploaded_at(&self) -> DateTime<Utc> {
        self.uploaded_at
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn set_status(&mut self, status: DocumentStatus) {
        self.status = status;
    }
}

impl fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDocument")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("status", &self.status)
            .field("uploaded_at", &self.uploaded_at)
            .field("size_bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn kind_from_extension_is_case_insensitive() {
        assert_eq!(DocumentKind::from_file_name("notes.PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_file_name("a.b.docx"), Some(DocumentKind::Docx));
        assert_eq!(DocumentKind::from_file_name("readme"), None);
        assert_eq!(DocumentKind::from_file_name("image.png"), None);
    }

    #[test]
    fn topic_is_document_name() {
        let doc = SourceDocument::new(
            DocumentId::new(1),
            "Algebra.pdf",
            DocumentKind::Pdf,
            DocumentStatus::Ready,
            fixed_now(),
            vec![1_u8, 2, 3],
        );
        assert_eq!(doc.topic(), "Algebra.pdf");
        assert_eq!(doc.size_bytes(), 3);
        assert!(doc.is_ready());
    }

    #[test]
    fn debug_omits_payload() {
        let doc = SourceDocument::new(
            DocumentId::new(1),
            "a.txt",
            DocumentKind::Text,
            DocumentStatus::Pending,
            fixed_now(),
            b"secret".to_vec(),
        );
        let rendered = format!("{doc:?}");
        assert!(rendered.contains("size_bytes: 6"));
        assert!(!rendered.contains("secret"));
    }
}
