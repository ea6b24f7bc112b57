//! PDF text extraction

use crate::error::{Error, Result};

/// Extract the text of every page, in page order
#[cfg(feature = "pdf")]
pub fn extract_pdf(bytes: &[u8]) -> Result<String> {
    // pdf-extract panics on some malformed files
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));

    match result {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(Error::Extraction(format!("Cannot read PDF file: {}", e))),
        Err(_) => Err(Error::Extraction(
            "Cannot read PDF file: the document is malformed".to_string(),
        )),
    }
}

#[cfg(not(feature = "pdf"))]
pub fn extract_pdf(_bytes: &[u8]) -> Result<String> {
    Err(Error::Extraction(
        "PDF support is not enabled in this build".to_string(),
    ))
}

#[cfg(all(test, feature = "pdf"))]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_extraction_error() {
        let err = extract_pdf(b"%PDF-1.4 this is not really a pdf").unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }
}
