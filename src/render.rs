use crate::error::ConversionError;
use image::{DynamicImage, RgbaImage};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

const POINTS_PER_INCH: f32 = 72.0;

/// Rasterizes PDF pages for recognition.
pub trait PageRenderer {
    /// Renders every page in order at `dpi`, handing each image to `visit`
    /// together with its zero-based index. Returns the number of pages.
    fn render_pages(
        &self,
        pdf: &Path,
        dpi: u32,
        visit: &mut dyn FnMut(usize, DynamicImage) -> Result<(), ConversionError>,
    ) -> Result<usize, ConversionError>;
}

/// Renders through Google's PDFium, bound at first use.
///
/// The library is bound per document rather than held, so a missing PDFium
/// only affects files that actually need rendering.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRenderer {
    library_path: Option<PathBuf>,
}

impl PdfiumRenderer {
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }

    fn bind(&self) -> Result<Pdfium, ConversionError> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| ConversionError::Recognition(format!("PDFium unavailable: {e}")))?;
        Ok(Pdfium::new(bindings))
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render_pages(
        &self,
        pdf: &Path,
        dpi: u32,
        visit: &mut dyn FnMut(usize, DynamicImage) -> Result<(), ConversionError>,
    ) -> Result<usize, ConversionError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_file(pdf, None)
            .map_err(|e| ConversionError::Recognition(format!("PDFium could not open PDF: {e}")))?;

        let config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / POINTS_PER_INCH);

        let mut count = 0;
        for (index, page) in document.pages().iter().enumerate() {
            let bitmap = page.render_with_config(&config).map_err(|e| {
                ConversionError::Recognition(format!("rendering page {}: {e}", index + 1))
            })?;
            let (width, height) = (bitmap.width() as u32, bitmap.height() as u32);
            let rgba = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes()).ok_or_else(|| {
                ConversionError::Recognition(format!(
                    "page {} bitmap does not match {width}x{height}",
                    index + 1
                ))
            })?;
            debug!(page = index + 1, width, height, dpi, "page rendered");
            visit(index, DynamicImage::ImageRgba8(rgba))?;
            count += 1;
        }
        Ok(count)
    }
}
