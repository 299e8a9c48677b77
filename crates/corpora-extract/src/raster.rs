//! Page rasterization for the PDF OCR fallback.
//!
//! [`PdftoppmRasterizer`] renders a whole page with poppler, the same
//! renderer pdf2image uses. When poppler is not installed,
//! [`EmbeddedImageRasterizer`] decodes the images embedded in the page with
//! lopdf, which covers the common case of scanned pages.

use async_trait::async_trait;
use corpora_core::ExtractError;
use flate2::read::ZlibDecoder;
use image::DynamicImage;
use lopdf::Document;
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info};

use crate::run_blocking;

/// Default render resolution, matching pdf2image.
pub const DEFAULT_DPI: u32 = 200;

/// Skip tiny embedded images (icons, rules, etc.)
const MIN_DIMENSION: i64 = 50;

/// Turns one PDF page into images for OCR.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Rasterizer name.
    fn name(&self) -> &str;

    /// Render `page` (1-based) of the PDF at `path`, whose contents are `bytes`.
    async fn rasterize(
        &self,
        path: &Path,
        bytes: &[u8],
        page: u32,
    ) -> Result<Vec<DynamicImage>, ExtractError>;
}

/// Pick `pdftoppm` when it can be found, otherwise embedded-image decoding.
#[must_use]
pub fn locate_rasterizer(pdftoppm: impl AsRef<OsStr>, dpi: u32) -> Arc<dyn PageRasterizer> {
    match PdftoppmRasterizer::locate(pdftoppm, dpi) {
        Ok(rasterizer) => {
            debug!("Rendering text-less PDF pages with {:?}", rasterizer.binary);
            Arc::new(rasterizer)
        }
        Err(e) => {
            info!("{e}; falling back to embedded page images for PDF OCR");
            Arc::new(EmbeddedImageRasterizer::new())
        }
    }
}

// ============================================================================
// pdftoppm
// ============================================================================

/// Renders pages with poppler's `pdftoppm`.
pub struct PdftoppmRasterizer {
    binary: PathBuf,
    dpi: u32,
}

impl PdftoppmRasterizer {
    /// Find `program` on `PATH`.
    pub fn locate(program: impl AsRef<OsStr>, dpi: u32) -> Result<Self, ExtractError> {
        let program = program.as_ref();
        let binary = which::which(program).map_err(|e| {
            ExtractError::Failed(format!("PDF renderer {} not found: {e}", program.to_string_lossy()))
        })?;
        Ok(Self::with_binary(binary, dpi))
    }

    #[must_use]
    pub fn with_binary(binary: impl Into<PathBuf>, dpi: u32) -> Self {
        Self {
            binary: binary.into(),
            dpi,
        }
    }
}

#[async_trait]
impl PageRasterizer for PdftoppmRasterizer {
    fn name(&self) -> &str {
        "pdftoppm"
    }

    async fn rasterize(
        &self,
        path: &Path,
        _bytes: &[u8],
        page: u32,
    ) -> Result<Vec<DynamicImage>, ExtractError> {
        let out_dir = tempfile::tempdir()?;
        let page_arg = page.to_string();

        let output = Command::new(&self.binary)
            .arg("-f")
            .arg(&page_arg)
            .arg("-l")
            .arg(&page_arg)
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .arg(path)
            .arg(out_dir.path().join("page"))
            .output()
            .await?;

        if !output.status.success() {
            return Err(ExtractError::Failed(format!(
                "pdftoppm failed on page {page}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let dir = out_dir.path().to_path_buf();
        let images = run_blocking(move || load_rendered_pages(&dir)).await?;
        debug!("Rendered page {} of {:?} into {} image(s)", page, path, images.len());
        Ok(images)
    }
}

/// Load every PNG pdftoppm wrote, in file-name order.
fn load_rendered_pages(dir: &Path) -> Result<Vec<DynamicImage>, ExtractError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|p| {
            image::open(p).map_err(|e| ExtractError::Parse(format!("rendered page image: {e}")))
        })
        .collect()
}

// ============================================================================
// Embedded images
// ============================================================================

/// Decodes the raster images embedded in a page.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedImageRasterizer;

impl EmbeddedImageRasterizer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PageRasterizer for EmbeddedImageRasterizer {
    fn name(&self) -> &str {
        "embedded"
    }

    async fn rasterize(
        &self,
        path: &Path,
        bytes: &[u8],
        page: u32,
    ) -> Result<Vec<DynamicImage>, ExtractError> {
        let bytes = bytes.to_vec();
        let images = run_blocking(move || extract_page_images(&bytes, page)).await?;
        debug!("Page {} of {:?} has {} embedded image(s)", page, path, images.len());
        Ok(images)
    }
}

/// Decode the images on one page of a PDF using lopdf.
fn extract_page_images(bytes: &[u8], page: u32) -> Result<Vec<DynamicImage>, ExtractError> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| ExtractError::Parse(format!("Failed to load PDF for rasterizing: {e}")))?;

    let Some(page_id) = doc.get_pages().get(&page).copied() else {
        return Err(ExtractError::Failed(format!("PDF has no page {page}")));
    };

    let page_images = match doc.get_page_images(page_id) {
        Ok(images) => images,
        Err(e) => {
            debug!("Failed to get images from page {}: {}", page, e);
            return Ok(vec![]);
        }
    };

    let mut images = Vec::new();
    for pdf_image in page_images {
        if pdf_image.width < MIN_DIMENSION || pdf_image.height < MIN_DIMENSION {
            debug!(
                "Skipping small image: {}x{}",
                pdf_image.width, pdf_image.height
            );
            continue;
        }

        if let Some(decoded) = decode_pdf_image(&pdf_image) {
            images.push(decoded);
        }
    }

    Ok(images)
}

/// Decode a PDF image `XObject` by its filter.
fn decode_pdf_image(pdf_image: &lopdf::xobject::PdfImage) -> Option<DynamicImage> {
    let filters = pdf_image.filters.as_ref()?;

    if filters.iter().any(|f| f == "DCTDecode") {
        match image::load_from_memory_with_format(pdf_image.content, image::ImageFormat::Jpeg) {
            Ok(img) => Some(img),
            Err(e) => {
                debug!("Failed to decode DCTDecode image: {}", e);
                None
            }
        }
    } else if filters.iter().any(|f| f == "FlateDecode") {
        match decode_flate_image(pdf_image) {
            Ok(img) => Some(img),
            Err(e) => {
                debug!("Failed to decode FlateDecode image: {}", e);
                None
            }
        }
    } else {
        debug!("Unsupported image filter: {:?}", filters);
        None
    }
}

/// Decode a `FlateDecode` raw pixel image.
fn decode_flate_image(pdf_image: &lopdf::xobject::PdfImage) -> Result<DynamicImage, String> {
    let mut decoder = ZlibDecoder::new(pdf_image.content);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| format!("Decompression failed: {e}"))?;

    let color_space = pdf_image.color_space.as_deref().unwrap_or("DeviceRGB");
    let width = u32::try_from(pdf_image.width).map_err(|e| e.to_string())?;
    let height = u32::try_from(pdf_image.height).map_err(|e| e.to_string())?;

    let img = match color_space {
        "DeviceGray" | "Gray" => {
            image::GrayImage::from_raw(width, height, decompressed).map(DynamicImage::ImageLuma8)
        }
        "DeviceCMYK" | "CMYK" => image::RgbImage::from_raw(width, height, cmyk_to_rgb(&decompressed))
            .map(DynamicImage::ImageRgb8),
        _ => image::RgbImage::from_raw(width, height, decompressed).map(DynamicImage::ImageRgb8),
    };

    img.ok_or_else(|| "Failed to create image from raw data".to_string())
}

/// Convert CMYK bytes to RGB.
#[allow(clippy::many_single_char_names)]
fn cmyk_to_rgb(cmyk: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity((cmyk.len() / 4) * 3);
    for chunk in cmyk.chunks_exact(4) {
        let k = 255 - u16::from(chunk[3]);
        for &ink in &chunk[..3] {
            let value = (255 - u16::from(ink)) * k / 255;
            #[allow(clippy::cast_possible_truncation)]
            rgb.push(value as u8);
        }
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmyk_to_rgb() {
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0]), vec![255, 255, 255]);
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 255]), vec![0, 0, 0]);
        assert_eq!(cmyk_to_rgb(&[255, 0, 0, 0]), vec![0, 255, 255]);
        // Trailing partial pixel is ignored
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0, 7]).len(), 3);
    }

    #[test]
    fn test_load_rendered_pages_sorted_png_only() {
        let temp_dir = tempfile::tempdir().unwrap();
        DynamicImage::new_luma8(3, 3)
            .save_with_format(temp_dir.path().join("page-2.png"), image::ImageFormat::Png)
            .unwrap();
        DynamicImage::new_luma8(5, 5)
            .save_with_format(temp_dir.path().join("page-1.png"), image::ImageFormat::Png)
            .unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let images = load_rendered_pages(temp_dir.path()).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].width(), 5);
        assert_eq!(images[1].width(), 3);
    }

    #[test]
    fn test_pdftoppm_locate_missing() {
        let result = PdftoppmRasterizer::locate("/nonexistent/pdftoppm-corpora", DEFAULT_DPI);
        assert!(result.is_err());
    }

    #[test]
    fn test_locate_rasterizer_falls_back_to_embedded() {
        let rasterizer = locate_rasterizer("/nonexistent/pdftoppm-corpora", DEFAULT_DPI);
        assert_eq!(rasterizer.name(), "embedded");
    }

    #[tokio::test]
    async fn test_embedded_rejects_invalid_pdf() {
        let result = EmbeddedImageRasterizer::new()
            .rasterize(Path::new("bad.pdf"), b"not a pdf", 1)
            .await;
        assert!(result.is_err());
    }
}
