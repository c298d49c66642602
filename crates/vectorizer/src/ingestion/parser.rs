//! Page-aware text extraction for PDF and plain-text documents

use std::collections::BTreeMap;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// How long the whole-document PDF fallback may run before it is abandoned
const PDF_FALLBACK_TIMEOUT: Duration = Duration::from_secs(60);

/// Unicode punctuation and ligatures that PDF fonts commonly emit, with plain replacements
const GLYPH_REPLACEMENTS: &[(char, &str)] = &[
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2013}', "-"),
    ('\u{2014}', "--"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2022}', "* "),
    ('\u{2026}', "..."),
    ('\u{00A0}', " "),
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Text of one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// Page number (1-indexed)
    pub page: u32,
    pub text: String,
}

/// Supported document types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Text,
}

impl FileType {
    /// Detect from content first, then from the filename extension
    pub fn detect(filename: &str, data: &[u8]) -> Result<Self> {
        if data.starts_with(b"%PDF-") {
            return Ok(Self::Pdf);
        }

        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "txt" | "text" | "md" | "markdown" => Ok(Self::Text),
            "" => Err(Error::UnsupportedFileType(format!(
                "'{}' has no extension and is not a PDF",
                filename
            ))),
            other => Err(Error::UnsupportedFileType(other.to_string())),
        }
    }
}

/// Turns raw document bytes into page texts in reading order
pub trait DocumentExtractor: Send + Sync {
    /// Extract text per page. Malformed input fails with `Error::Extraction`;
    /// a readable document without text returns pages with empty text.
    fn extract(&self, source_name: &str, data: &[u8]) -> Result<Vec<PageText>>;
}

/// PDF extraction: per page with lopdf, whole document with pdf-extract as fallback
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PdfExtractor {
    fn extract_pages(doc: &lopdf::Document) -> Vec<PageText> {
        let pages: BTreeMap<u32, lopdf::ObjectId> = doc.get_pages();
        let mut extracted = Vec::with_capacity(pages.len());

        for page in pages.keys() {
            match doc.extract_text(&[*page]) {
                Ok(text) => extracted.push(PageText {
                    page: *page,
                    text: cleanup_pdf_text(&text),
                }),
                Err(e) => {
                    tracing::debug!("Could not extract text for page {}: {}", page, e);
                    extracted.push(PageText {
                        page: *page,
                        text: String::new(),
                    });
                }
            }
        }

        extracted
    }

    /// Whole-document extraction on a worker thread, abandoned after a timeout.
    /// Some fonts make pdf-extract hang or panic.
    fn extract_whole(data: &[u8]) -> std::result::Result<String, String> {
        let data = data.to_vec();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data).map_err(|e| e.to_string());
            let _ = tx.send(result);
        });

        match rx.recv_timeout(PDF_FALLBACK_TIMEOUT) {
            Ok(result) => {
                let _ = handle.join();
                result
            }
            Err(mpsc::RecvTimeoutError::Timeout) => Err(format!(
                "timed out after {}s",
                PDF_FALLBACK_TIMEOUT.as_secs()
            )),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err("extraction thread crashed".to_string())
            }
        }
    }
}

impl DocumentExtractor for PdfExtractor {
    fn extract(&self, source_name: &str, data: &[u8]) -> Result<Vec<PageText>> {
        let pages = match lopdf::Document::load_mem(data) {
            Ok(doc) => Self::extract_pages(&doc),
            Err(e) => {
                tracing::warn!("lopdf could not load '{}': {}, trying pdf-extract", source_name, e);
                Vec::new()
            }
        };

        if pages.iter().any(|p| !p.text.trim().is_empty()) {
            return Ok(pages);
        }

        match Self::extract_whole(data) {
            Ok(text) => Ok(vec![PageText {
                page: 1,
                text: cleanup_pdf_text(&text),
            }]),
            // The document loaded but holds no text (image-only, empty pages)
            Err(e) if !pages.is_empty() => {
                tracing::debug!("pdf-extract fallback failed for '{}': {}", source_name, e);
                Ok(pages)
            }
            Err(e) => Err(Error::extraction(source_name, format!("unreadable PDF: {}", e))),
        }
    }
}

/// UTF-8 text; form feeds separate pages
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl DocumentExtractor for PlainTextExtractor {
    fn extract(&self, source_name: &str, data: &[u8]) -> Result<Vec<PageText>> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::extraction(source_name, format!("invalid UTF-8: {}", e)))?;

        Ok(text
            .split('\x0c')
            .enumerate()
            .map(|(i, page)| PageText {
                page: i as u32 + 1,
                text: page.to_string(),
            })
            .collect())
    }
}

/// Normalize glyphs and drop blank lines and NUL bytes
fn cleanup_pdf_text(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == '\0' {
            continue;
        }
        match GLYPH_REPLACEMENTS.iter().find(|(glyph, _)| *glyph == ch) {
            Some((_, replacement)) => cleaned.push_str(replacement),
            None => cleaned.push(ch),
        }
    }

    cleaned
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// One line of Courier text per page
    fn build_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_pdf_pages_in_reading_order() {
        let data = build_pdf(&["Refund policy", "Shipping terms", "Total Amount Due"]);
        assert_eq!(FileType::detect("invoice", &data).unwrap(), FileType::Pdf);

        let pages = PdfExtractor.extract("invoice.pdf", &data).unwrap();

        let numbers: Vec<u32> = pages.iter().map(|p| p.page).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(pages[0].text.contains("Refund policy"));
        assert!(pages[1].text.contains("Shipping terms"));
        assert!(pages[2].text.contains("Total Amount Due"));
    }

    #[test]
    fn test_detect_file_type() {
        assert_eq!(FileType::detect("a.bin", b"%PDF-1.7\n").unwrap(), FileType::Pdf);
        assert_eq!(FileType::detect("Report.PDF", b"").unwrap(), FileType::Pdf);
        assert_eq!(FileType::detect("notes.txt", b"hi").unwrap(), FileType::Text);
        assert!(matches!(
            FileType::detect("sheet.xlsx", b"PK"),
            Err(Error::UnsupportedFileType(_))
        ));
        assert!(matches!(
            FileType::detect("noext", b"hello"),
            Err(Error::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn test_plain_text_pages() {
        let pages = PlainTextExtractor
            .extract("a.txt", b"page one\x0cpage two\x0c\x0cpage four")
            .unwrap();

        assert_eq!(pages.len(), 4);
        assert_eq!(pages[0], PageText { page: 1, text: "page one".into() });
        assert_eq!(pages[2].text, "");
        assert_eq!(pages[3].page, 4);
    }

    #[test]
    fn test_plain_text_rejects_invalid_utf8() {
        let err = PlainTextExtractor.extract("a.txt", &[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
    }

    #[test]
    fn test_garbage_pdf_fails_extraction() {
        let err = PdfExtractor
            .extract("broken.pdf", b"%PDF-1.4 this is not really a pdf")
            .unwrap_err();
        assert_eq!(err.kind(), "extraction_error");
    }

    #[test]
    fn test_cleanup_pdf_text() {
        let cleaned = cleanup_pdf_text("  \u{FB01}nal \u{201C}total\u{201D}\0  \n\n  due\u{2026}  ");
        assert_eq!(cleaned, "final \"total\"\ndue...");
    }
}
