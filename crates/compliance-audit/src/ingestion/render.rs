//! Page snapshots for page-oriented documents
//!
//! Rendering is blocking work and is always invoked from `spawn_blocking`.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::Result;

/// Rasterizes document pages to PNG bytes
pub trait PageRenderer: Send + Sync {
    /// Render up to `max_pages` pages starting at page 1, scaled by `scale`.
    /// Returned images are ordered by page number.
    fn render_pages(&self, data: &[u8], max_pages: u32, scale: f32) -> Result<Vec<Vec<u8>>>;

    /// Get renderer name for logging
    fn name(&self) -> &str;
}

/// Wrap encoded image bytes in a `data:` URI
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Split a data URI into mime type and base64 payload.
/// Input without a `data:` header is taken as a bare PNG payload.
pub fn split_data_uri(uri: &str) -> (&str, &str) {
    match uri.split_once(',') {
        Some((header, payload)) => {
            let mime = header
                .strip_prefix("data:")
                .and_then(|h| h.split(';').next())
                .filter(|m| !m.is_empty())
                .unwrap_or("image/png");
            (mime, payload)
        }
        None => ("image/png", uri),
    }
}

#[cfg(feature = "render")]
pub use pdfium::PdfiumRenderer;

#[cfg(feature = "render")]
mod pdfium {
    use pdfium_render::prelude::*;
    use std::io::Cursor;
    use std::path::PathBuf;

    use super::PageRenderer;
    use crate::error::{Error, Result};

    /// Renderer backed by the pdfium shared library
    pub struct PdfiumRenderer {
        library_path: Option<PathBuf>,
    }

    impl PdfiumRenderer {
        /// Bind once to check the library is loadable
        pub fn probe(library_path: Option<PathBuf>) -> Result<Self> {
            let renderer = Self { library_path };
            renderer.bind()?;
            Ok(renderer)
        }

        fn bind(&self) -> Result<Pdfium> {
            let bindings = match &self.library_path {
                Some(path) => Pdfium::bind_to_library(path),
                None => Pdfium::bind_to_system_library(),
            }
            .map_err(|e| Error::Config(format!("Failed to load pdfium: {}", e)))?;
            Ok(Pdfium::new(bindings))
        }
    }

    impl PageRenderer for PdfiumRenderer {
        fn render_pages(&self, data: &[u8], max_pages: u32, scale: f32) -> Result<Vec<Vec<u8>>> {
            let pdfium = self.bind()?;
            let document = pdfium
                .load_pdf_from_byte_slice(data, None)
                .map_err(|e| Error::file_parse("document.pdf", format!("pdfium: {}", e)))?;

            let config = PdfRenderConfig::new().scale_page_by_factor(scale);
            let mut snapshots = Vec::new();

            for (index, page) in document.pages().iter().take(max_pages as usize).enumerate() {
                let bitmap = page.render_with_config(&config).map_err(|e| {
                    Error::file_parse(
                        "document.pdf",
                        format!("Failed to render page {}: {}", index + 1, e),
                    )
                })?;

                let mut png = Cursor::new(Vec::new());
                bitmap
                    .as_image()
                    .write_to(&mut png, image::ImageFormat::Png)
                    .map_err(|e| Error::internal(format!("PNG encoding failed: {}", e)))?;
                snapshots.push(png.into_inner());
            }

            Ok(snapshots)
        }

        fn name(&self) -> &str {
            "pdfium"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri_round_trip_parts() {
        let uri = to_data_uri("image/jpeg", b"abc");
        assert_eq!(uri, "data:image/jpeg;base64,YWJj");

        let (mime, payload) = split_data_uri(&uri);
        assert_eq!(mime, "image/jpeg");
        assert_eq!(payload, "YWJj");
    }

    #[test]
    fn test_bare_payload_defaults_to_png() {
        assert_eq!(split_data_uri("YWJj"), ("image/png", "YWJj"));
    }
}
