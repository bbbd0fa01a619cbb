//! Document ingestion pipeline: PDF parsing, chunking, embedding

mod chunker;
mod parser;
mod processor;

pub use chunker::TextChunker;
pub use parser::{FileParser, PageContent, ParsedDocument};
pub use processor::IngestPipeline;
