//! Media type detection for fetched documents.
//!
//! The source site serves PDFs and both generations of Word files with
//! unreliable Content-Type headers, so the payload's magic bytes are the
//! only signal worth trusting.

/// The document formats the pipeline knows how to hand off for text
/// extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Pdf,
    /// Legacy OLE-container Word file.
    Doc,
    /// OOXML Word file.
    Docx,
}

impl MediaType {
    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Pdf => "pdf",
            MediaType::Doc => "doc",
            MediaType::Docx => "docx",
        }
    }
}

/// Identify a payload by its magic bytes.
pub fn sniff(payload: &[u8]) -> Option<MediaType> {
    if payload.starts_with(b"%PDF") {
        Some(MediaType::Pdf)
    } else if payload.starts_with(b"PK\x03\x04") {
        Some(MediaType::Docx)
    } else if payload.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]) {
        Some(MediaType::Doc)
    } else {
        None
    }
}
