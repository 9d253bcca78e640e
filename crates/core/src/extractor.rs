use crate::error::IngestError;
use crate::models::MediaType;
use lopdf::Document;

/// Extracts plain text from raw document bytes according to the declared
/// media type. PDF pages are concatenated in page order; plain text and
/// Markdown are decoded as UTF-8 with no further interpretation.
pub fn extract_text(bytes: &[u8], media_type: MediaType) -> Result<String, IngestError> {
    match media_type {
        MediaType::Pdf => extract_pdf_text(bytes),
        MediaType::PlainText | MediaType::Markdown => Ok(String::from_utf8(bytes.to_vec())?),
    }
}

fn extract_pdf_text(bytes: &[u8]) -> Result<String, IngestError> {
    let document =
        Document::load_mem(bytes).map_err(|error| IngestError::PdfParse(error.to_string()))?;

    let mut text = String::new();
    for (page_no, _page_id) in document.get_pages() {
        let page_text = document
            .extract_text(&[page_no])
            .map_err(|error| IngestError::PdfParse(error.to_string()))?;

        if !page_text.trim().is_empty() {
            text.push_str(&page_text);
            if !text.ends_with('\n') {
                text.push('\n');
            }
        }
    }

    Ok(text)
}
