//! Text extraction from the source document

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use docrag_core::{Error, Result};
use tracing::{debug, info};

/// Document formats the extractor understands, resolved once from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentFormat {
    /// Resolve the format from a path's extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "docx" => Ok(DocumentFormat::Docx),
            "txt" => Ok(DocumentFormat::PlainText),
            _ => Err(Error::UnsupportedFormat(format!(
                "{} (expected .pdf, .docx or .txt)",
                path.display()
            ))),
        }
    }

    /// Get the display name for this format
    pub fn display_name(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "PDF",
            DocumentFormat::Docx => "DOCX",
            DocumentFormat::PlainText => "TXT",
        }
    }

    /// Whether this build can read the format
    pub fn is_supported(&self) -> bool {
        match self {
            DocumentFormat::Docx => docx_supported(),
            DocumentFormat::Pdf | DocumentFormat::PlainText => true,
        }
    }

    /// Extract the full text content of `path`
    pub fn extract(&self, path: &Path) -> Result<String> {
        if !self.is_supported() {
            return Err(Error::UnsupportedFormat(format!(
                "{} support is not compiled into this build (enable the `docx` feature)",
                self.display_name()
            )));
        }

        match self {
            DocumentFormat::PlainText => read_plain_text(path),
            DocumentFormat::Pdf => read_pdf(path),
            DocumentFormat::Docx => read_docx(path),
        }
    }
}

/// Whether word-processor documents can be read by this build
pub fn docx_supported() -> bool {
    cfg!(feature = "docx")
}

/// Extract the text of a single document, dispatching on its extension
pub fn extract_text(path: &Path) -> Result<String> {
    let format = DocumentFormat::from_path(path)?;
    info!(path = %path.display(), format = format.display_name(), "Extracting document text");
    let text = format.extract(path)?;
    debug!(chars = text.len(), "Extracted text");
    Ok(text)
}

/// Find the single supported document in `dir`.
///
/// No candidate is an [`Error::UnsupportedFormat`]; more than one is an
/// [`Error::AmbiguousDocument`] so the caller has to name the file explicitly.
pub fn discover_document(dir: &Path) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && DocumentFormat::from_path(path).is_ok())
        .collect();
    candidates.sort();

    match candidates.len() {
        0 => Err(Error::UnsupportedFormat(format!(
            "no supported document found in {} (expected .pdf, .docx or .txt)",
            dir.display()
        ))),
        1 => Ok(candidates.remove(0)),
        _ => Err(Error::AmbiguousDocument(candidates)),
    }
}

/// Use `explicit` when given, otherwise discover the document in `data_dir`
pub fn resolve_document(explicit: Option<&Path>, data_dir: &Path) -> Result<PathBuf> {
    match explicit {
        Some(path) => {
            DocumentFormat::from_path(path)?;
            if !path.is_file() {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("document not found: {}", path.display()),
                )));
            }
            Ok(path.to_path_buf())
        }
        None => discover_document(data_dir),
    }
}

fn read_plain_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    String::from_utf8(bytes)
        .map_err(|e| Error::Extraction(format!("{} is not valid UTF-8: {}", path.display(), e)))
}

fn read_pdf(path: &Path) -> Result<String> {
    // pdf-extract panics on some malformed inputs instead of returning an error
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text(path)));
    match outcome {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(Error::Extraction(format!("{}: {}", path.display(), e))),
        Err(_) => Err(Error::Extraction(format!(
            "{}: PDF parser aborted on malformed input",
            path.display()
        ))),
    }
}

#[cfg(feature = "docx")]
fn read_docx(path: &Path) -> Result<String> {
    use std::io::Read;

    let file = fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::Extraction(format!("{}: {}", path.display(), e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| Error::Extraction(format!("{}: {}", path.display(), e)))?
        .read_to_string(&mut xml)?;

    docx_paragraphs(&xml)
        .map(|paragraphs| paragraphs.join(" "))
        .map_err(|e| Error::Extraction(format!("{}: {}", path.display(), e)))
}

#[cfg(not(feature = "docx"))]
fn read_docx(path: &Path) -> Result<String> {
    Err(Error::UnsupportedFormat(format!(
        "{}: DOCX support is not compiled into this build",
        path.display()
    )))
}

/// Collect the text of every `<w:p>` paragraph in a WordprocessingML body
#[cfg(feature = "docx")]
fn docx_paragraphs(xml: &str) -> std::result::Result<Vec<String>, quick_xml::Error> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::End(ref e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Empty(ref e) => {
                if matches!(e.local_name().as_ref(), b"tab" | b"br") {
                    current.push(' ');
                }
            }
            Event::Text(ref t) if in_text => current.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs)
}
