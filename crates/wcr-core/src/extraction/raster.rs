use crate::error::WcrError;
use crate::extraction::{Document, DocumentKind, LineSpan};
use crate::region::{CropBox, PageSize};
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageEncoder};
use std::path::Path;

/// File extensions handled as single-page raster documents.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "gif", "webp"];

/// True if the path's extension marks a raster image.
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// An uploaded scan or photo. One page, no text layer, units are pixels.
pub struct ImageDocument {
    name: String,
    image: DynamicImage,
}

impl ImageDocument {
    pub fn open(path: &Path) -> Result<Self, WcrError> {
        let image = image::open(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, image })
    }

    pub fn from_image(name: &str, image: DynamicImage) -> Self {
        Self {
            name: name.to_string(),
            image,
        }
    }
}

impl Document for ImageDocument {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DocumentKind {
        DocumentKind::Image
    }

    fn page_count(&self) -> usize {
        1
    }

    fn page_size(&self, page: usize) -> Result<PageSize, WcrError> {
        if page != 1 {
            return Err(WcrError::RegionOutOfBounds(format!(
                "page {page} is outside image '{}'",
                self.name
            )));
        }
        Ok(PageSize {
            width: f64::from(self.image.width()),
            height: f64::from(self.image.height()),
        })
    }

    fn text_in(&self, _page: usize, _crop: &CropBox) -> Result<Option<String>, WcrError> {
        Ok(None)
    }

    fn line_spans(&self, _page: usize) -> Result<Vec<LineSpan>, WcrError> {
        Ok(Vec::new())
    }

    fn render(&self, _page: usize, crop: &CropBox) -> Result<Vec<u8>, WcrError> {
        let (iw, ih) = (self.image.width(), self.image.height());
        let x = (crop.x0.floor().max(0.0) as u32).min(iw);
        let y = (crop.y0.floor().max(0.0) as u32).min(ih);
        let x1 = (crop.x1.ceil().max(0.0) as u32).min(iw);
        let y1 = (crop.y1.ceil().max(0.0) as u32).min(ih);
        if x1 <= x || y1 <= y {
            return Err(WcrError::RegionOutOfBounds(format!(
                "crop ({}, {}, {}, {}) covers no pixels of '{}'",
                crop.x0, crop.y0, crop.x1, crop.y1, self.name
            )));
        }

        let cropped = self.image.crop_imm(x, y, x1 - x, y1 - y).to_rgb8();
        let mut buffer = Vec::new();
        PngEncoder::new(&mut buffer).write_image(
            cropped.as_raw(),
            cropped.width(),
            cropped.height(),
            image::ColorType::Rgb8,
        )?;
        Ok(buffer)
    }
}
