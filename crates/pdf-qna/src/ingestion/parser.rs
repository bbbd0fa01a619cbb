//! PDF text extraction

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// Upper bound for a single `pdf-extract` run; some fonts make it spin
const PDF_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// The header may be preceded by junk, but must appear in the first 1KB
const SIGNATURE_WINDOW: usize = 1024;

/// Parsed document with per-page text
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Original filename
    pub filename: String,
    /// Total pages reported by the PDF
    pub total_pages: u32,
    /// Pages that produced text, in order
    pub pages: Vec<PageContent>,
}

impl ParsedDocument {
    /// All page text joined with blank lines
    pub fn content(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Content from a single page
#[derive(Debug, Clone)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Text content of the page
    pub content: String,
}

/// PDF parser
pub struct FileParser;

impl FileParser {
    /// Parse a PDF held in memory.
    ///
    /// Pages are extracted with `lopdf`; when that yields nothing the whole
    /// document goes through `pdf-extract` and is treated as one page.
    pub fn parse_pdf(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        if data.is_empty() {
            return Err(Error::processing(format!("'{}' is empty", filename)));
        }
        if !has_pdf_signature(data) {
            return Err(Error::processing(format!(
                "'{}' is not a PDF document",
                filename
            )));
        }

        let (total_pages, raw_pages) = match Self::extract_pages(data) {
            Ok((total, pages)) if pages.iter().any(|(_, text)| !text.trim().is_empty()) => {
                (total, pages)
            }
            Ok((total, _)) => {
                tracing::debug!("lopdf found no text in '{}', trying pdf-extract", filename);
                (total.max(1), vec![(1, Self::extract_with_timeout(data)?)])
            }
            Err(e) => {
                tracing::warn!("lopdf failed on '{}': {}, trying pdf-extract", filename, e);
                (1, vec![(1, Self::extract_with_timeout(data)?)])
            }
        };

        let pages: Vec<PageContent> = raw_pages
            .into_iter()
            .map(|(page_number, text)| PageContent {
                page_number,
                content: cleanup_pdf_text(&text),
            })
            .filter(|p| !p.content.is_empty())
            .collect();

        if pages.is_empty() {
            return Err(Error::processing(format!(
                "No text content could be extracted from '{}' (it may be image-based)",
                filename
            )));
        }

        tracing::debug!(
            "Parsed '{}': {} of {} pages with text",
            filename,
            pages.len(),
            total_pages
        );

        Ok(ParsedDocument {
            filename: filename.to_string(),
            total_pages,
            pages,
        })
    }

    /// Page-by-page extraction with lopdf
    fn extract_pages(data: &[u8]) -> std::result::Result<(u32, Vec<(u32, String)>), lopdf::Error> {
        let doc = lopdf::Document::load_mem(data)?;
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();

        let mut pages = Vec::with_capacity(page_numbers.len());
        for page_number in &page_numbers {
            match doc.extract_text(&[*page_number]) {
                Ok(text) => pages.push((*page_number, text)),
                Err(e) => tracing::debug!("No text on page {}: {}", page_number, e),
            }
        }

        Ok((page_numbers.len() as u32, pages))
    }

    /// Whole-document extraction with pdf-extract, bounded by a timeout
    fn extract_with_timeout(data: &[u8]) -> Result<String> {
        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        // The thread cannot be killed on timeout; it is left to finish alone.
        thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(PDF_EXTRACT_TIMEOUT) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(Error::processing(format!("Failed to extract PDF text: {}", e))),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!(
                    "PDF extraction timed out after {}s",
                    PDF_EXTRACT_TIMEOUT.as_secs()
                );
                Err(Error::processing("PDF text extraction timed out"))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(Error::processing("PDF extraction thread crashed"))
            }
        }
    }
}

fn has_pdf_signature(data: &[u8]) -> bool {
    data[..data.len().min(SIGNATURE_WINDOW)]
        .windows(5)
        .any(|w| w == b"%PDF-")
}

/// Normalize ligatures and typographic punctuation, trim lines and keep at
/// most one blank line between paragraphs
fn cleanup_pdf_text(text: &str) -> String {
    let normalized = text
        .replace('\0', "")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace(['\u{2010}', '\u{2011}', '\u{2013}'], "-")
        .replace('\u{2014}', "--")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ");

    let mut out = String::with_capacity(normalized.len());
    let mut blank_run = false;
    for line in normalized.lines().map(str::trim) {
        if line.is_empty() {
            blank_run = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run { "\n\n" } else { "\n" });
        }
        out.push_str(line);
        blank_run = false;
    }
    out
}
