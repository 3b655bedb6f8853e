use crate::error::IngestError;
use crate::models::PageText;
use lopdf::Document;
use quick_xml::events::Event;
use std::io::Read;
use std::path::Path;

/// Decompressed-size cap for a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extracts the ordered page texts of a document, dispatching on the file
/// extension. PDFs keep their native pagination; word-processor formats
/// collapse to a single page.
pub fn extract_pages(path: &Path) -> Result<Vec<PageText>, IngestError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => extract_pdf_pages(path),
        "doc" | "docx" => extract_docx_pages(path),
        _ => Err(IngestError::UnsupportedFileType(
            path.to_string_lossy().to_string(),
        )),
    }
}

fn extract_pdf_pages(path: &Path) -> Result<Vec<PageText>, IngestError> {
    let document =
        Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

    let mut pages = Vec::new();
    for (page_no, _page_id) in document.get_pages() {
        let text = document
            .extract_text(&[page_no])
            .map_err(|error| IngestError::PdfParse(error.to_string()))?;

        // Blank pages are kept so page numbering stays contiguous.
        pages.push(PageText {
            number: page_no,
            text,
        });
    }

    if pages.is_empty() {
        return Err(IngestError::PdfParse(format!(
            "pdf has no pages: {}",
            path.display()
        )));
    }

    Ok(pages)
}

fn extract_docx_pages(path: &Path) -> Result<Vec<PageText>, IngestError> {
    let bytes = std::fs::read(path)?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.as_slice()))
        .map_err(|error| IngestError::DocxParse(error.to_string()))?;

    let mut document_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|error| IngestError::DocxParse(error.to_string()))?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut document_xml)?;
        if document_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err(IngestError::DocxParse(
                "word/document.xml exceeds size limit".to_string(),
            ));
        }
    }

    let text = collect_run_texts(&document_xml)?;
    Ok(vec![PageText { number: 1, text }])
}

/// Walks `word/document.xml` and concatenates every `w:t` run, emitting a
/// newline at each paragraph end.
fn collect_run_texts(xml: &[u8]) -> Result<String, IngestError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(element)) => {
                if element.local_name().as_ref() == b"t" {
                    if let Ok(Event::Text(text)) = reader.read_event_into(&mut buf) {
                        out.push_str(text.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(Event::End(element)) => {
                if element.local_name().as_ref() == b"p" {
                    out.push('\n');
                }
            }
            Ok(Event::Eof) => break,
            Err(error) => return Err(IngestError::DocxParse(error.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}
