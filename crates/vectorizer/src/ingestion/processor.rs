//! Document pipeline: raw bytes to ordered chunk records

use std::sync::Arc;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::ChunkRecord;

use super::chunker::{RecursiveSplitter, TextSplitter};
use super::parser::{DocumentExtractor, FileType, PageText, PdfExtractor, PlainTextExtractor};

/// Extracts text from a document and splits it page by page
pub struct DocumentPipeline {
    pdf: Arc<dyn DocumentExtractor>,
    text: Arc<dyn DocumentExtractor>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentPipeline {
    /// Create a pipeline with the default extractors
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        RecursiveSplitter::new(chunk_size, chunk_overlap)?;
        Ok(Self {
            pdf: Arc::new(PdfExtractor),
            text: Arc::new(PlainTextExtractor),
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Replace the PDF extractor
    pub fn with_pdf_extractor(mut self, extractor: Arc<dyn DocumentExtractor>) -> Self {
        self.pdf = extractor;
        self
    }

    /// Split with the configured chunk size and overlap
    pub fn process(&self, data: &[u8], source_name: &str) -> Result<Vec<ChunkRecord>> {
        self.split(data, source_name, self.chunk_size, self.chunk_overlap)
    }

    /// Turn a document into chunk records in reading order
    pub fn split(
        &self,
        data: &[u8],
        source_name: &str,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Vec<ChunkRecord>> {
        let pages = self.extract(data, source_name)?;
        self.chunk(pages, source_name, chunk_size, chunk_overlap)
    }

    /// Extract page texts, sorted by page number
    pub fn extract(&self, data: &[u8], source_name: &str) -> Result<Vec<PageText>> {
        if data.is_empty() {
            return Err(Error::EmptyDocument(source_name.to_string()));
        }

        let extractor = match FileType::detect(source_name, data)? {
            FileType::Pdf => &self.pdf,
            FileType::Text => &self.text,
        };

        let mut pages = extractor.extract(source_name, data)?;
        pages.sort_by_key(|p| p.page);
        Ok(pages)
    }

    /// Split extracted pages with the configured chunk size and overlap
    pub fn chunk_pages(&self, pages: Vec<PageText>, source_name: &str) -> Result<Vec<ChunkRecord>> {
        self.chunk(pages, source_name, self.chunk_size, self.chunk_overlap)
    }

    /// Split each page on its own, so a record never spans two pages and
    /// page numbers never decrease along the sequence
    pub fn chunk(
        &self,
        pages: Vec<PageText>,
        source_name: &str,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Vec<ChunkRecord>> {
        let splitter = RecursiveSplitter::new(chunk_size, chunk_overlap)?;

        let mut records = Vec::new();
        for page in pages {
            for text in splitter.split(&page.text) {
                records.push(ChunkRecord {
                    text,
                    page: page.page,
                    position: records.len(),
                });
            }
        }

        if records.is_empty() {
            return Err(Error::EmptyDocument(source_name.to_string()));
        }

        tracing::debug!("Split '{}' into {} records", source_name, records.len());
        Ok(records)
    }
}
