//! PDF page-text extraction on top of `lopdf`.

use std::path::Path;

use crate::types::GradingError;

/// Reads the text of every page in the PDF at `path`, in page order.
///
/// Returns one string per page; a page with no extractable text yields an
/// empty string rather than an error. Fails with [`GradingError::NotFound`]
/// when the path does not resolve and [`GradingError::Parse`] when the file
/// is not a readable PDF.
pub fn load_pdf(path: impl AsRef<Path>) -> Result<Vec<String>, GradingError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(GradingError::NotFound(format!(
            "PDF file {} does not exist",
            path.display()
        )));
    }

    let document =
        lopdf::Document::load(path).map_err(|err| GradingError::Parse(err.to_string()))?;

    // get_pages returns a BTreeMap keyed by 1-based page number, so iteration
    // order is page order.
    let mut pages = Vec::new();
    for (page_number, _object_id) in document.get_pages() {
        let text = document
            .extract_text(&[page_number])
            .unwrap_or_default();
        pages.push(text);
    }

    tracing::debug!(path = %path.display(), pages = pages.len(), "extracted PDF pages");
    Ok(pages)
}
