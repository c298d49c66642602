//! Document ingestion: extraction, splitting, chunk identity and upload coordination

mod chunker;
mod coordinator;
pub mod identity;
mod parser;
mod processor;
mod upload;

pub use chunker::{RecursiveSplitter, TextSplitter};
pub use coordinator::{IngestOutcome, IngestState, IngestionCoordinator};
pub use parser::{DocumentExtractor, FileType, PageText, PdfExtractor, PlainTextExtractor};
pub use processor::DocumentPipeline;
pub use upload::{UploadAccumulator, UploadFrame, UploadHeader};
