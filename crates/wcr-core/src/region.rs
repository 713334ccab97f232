//! Coordinate normalization between the rendered preview and the source page.
//!
//! A selection made on a preview is first turned into a page-relative
//! fraction, which does not depend on the preview's resolution. The fraction
//! is only turned back into absolute units against the page's intrinsic size
//! as reported by the document itself (points for PDFs, pixels for images).

use crate::error::WcrError;
use serde::{Deserialize, Serialize};

/// Slack allowed on `x + w` and `y + h` to absorb float noise from division.
const EDGE_EPSILON: f64 = 1e-9;

/// Size of the rendered preview the user drew on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// A rectangle in the preview's pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewSelection {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Intrinsic size of a page in document units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Page-relative region. Always inside the unit square with positive area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRegion")]
pub struct FractionalRegion {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

#[derive(Deserialize)]
struct RawRegion {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

impl TryFrom<RawRegion> for FractionalRegion {
    type Error = WcrError;

    fn try_from(raw: RawRegion) -> Result<Self, Self::Error> {
        FractionalRegion::new(raw.x, raw.y, raw.w, raw.h)
    }
}

/// Absolute crop rectangle in document units, contained in the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl CropBox {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// True if the two boxes overlap with positive area.
    pub fn intersects(&self, other: &CropBox) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &CropBox) -> CropBox {
        CropBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

impl FractionalRegion {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Result<Self, WcrError> {
        let all_finite = [x, y, w, h].iter().all(|v| v.is_finite());
        if !all_finite {
            return Err(WcrError::RegionOutOfBounds(format!(
                "non-finite region ({x}, {y}, {w}, {h})"
            )));
        }
        if x < 0.0 || y < 0.0 {
            return Err(WcrError::RegionOutOfBounds(format!(
                "negative origin ({x}, {y})"
            )));
        }
        if w <= 0.0 || h <= 0.0 {
            return Err(WcrError::RegionOutOfBounds(format!(
                "empty region {w} x {h}"
            )));
        }
        if x + w > 1.0 + EDGE_EPSILON || y + h > 1.0 + EDGE_EPSILON {
            return Err(WcrError::RegionOutOfBounds(format!(
                "region ({x}, {y}, {w}, {h}) extends past the page edge"
            )));
        }
        Ok(Self { x, y, w, h })
    }

    /// The whole page.
    pub fn full_page() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            w: 1.0,
            h: 1.0,
        }
    }

    /// Region covering `crop` on a page of `page` size.
    pub fn from_crop_box(crop: &CropBox, page: PageSize) -> Result<Self, WcrError> {
        if page.width <= 0.0 || page.height <= 0.0 {
            return Err(WcrError::RegionOutOfBounds(format!(
                "page has no area ({} x {})",
                page.width, page.height
            )));
        }
        let x0 = crop.x0.clamp(0.0, page.width);
        let y0 = crop.y0.clamp(0.0, page.height);
        let x1 = crop.x1.clamp(x0, page.width);
        let y1 = crop.y1.clamp(y0, page.height);
        Self::new(
            x0 / page.width,
            y0 / page.height,
            (x1 - x0) / page.width,
            (y1 - y0) / page.height,
        )
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn w(&self) -> f64 {
        self.w
    }

    pub fn h(&self) -> f64 {
        self.h
    }

    /// Scale to the page's intrinsic size, clamped so the box never leaves
    /// the page.
    pub fn to_crop_box(&self, page: PageSize) -> CropBox {
        let x0 = (self.x * page.width).clamp(0.0, page.width);
        let y0 = (self.y * page.height).clamp(0.0, page.height);
        let x1 = ((self.x + self.w) * page.width).clamp(x0, page.width);
        let y1 = ((self.y + self.h) * page.height).clamp(y0, page.height);
        CropBox { x0, y0, x1, y1 }
    }
}

/// Convert a preview selection into a page-relative fraction.
pub fn normalize(
    viewport: Viewport,
    selection: PreviewSelection,
) -> Result<FractionalRegion, WcrError> {
    if !(viewport.width > 0.0 && viewport.height > 0.0) {
        return Err(WcrError::RegionOutOfBounds(format!(
            "viewport has no area ({} x {})",
            viewport.width, viewport.height
        )));
    }
    FractionalRegion::new(
        selection.x / viewport.width,
        selection.y / viewport.height,
        selection.w / viewport.width,
        selection.h / viewport.height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_normalize_divides_by_viewport() {
        let r = normalize(
            Viewport {
                width: 800.0,
                height: 1000.0,
            },
            PreviewSelection {
                x: 80.0,
                y: 250.0,
                w: 400.0,
                h: 500.0,
            },
        )
        .unwrap();
        assert!(approx(r.x(), 0.1));
        assert!(approx(r.y(), 0.25));
        assert!(approx(r.w(), 0.5));
        assert!(approx(r.h(), 0.5));
    }

    #[test]
    fn test_same_selection_at_two_preview_scales() {
        let small = normalize(
            Viewport {
                width: 612.0,
                height: 792.0,
            },
            PreviewSelection {
                x: 61.2,
                y: 79.2,
                w: 306.0,
                h: 396.0,
            },
        )
        .unwrap();
        let large = normalize(
            Viewport {
                width: 1224.0,
                height: 1584.0,
            },
            PreviewSelection {
                x: 122.4,
                y: 158.4,
                w: 612.0,
                h: 792.0,
            },
        )
        .unwrap();
        assert!(approx(small.x(), large.x()));
        assert!(approx(small.h(), large.h()));
    }

    #[test]
    fn test_crop_box_uses_true_page_size() {
        let r = FractionalRegion::new(0.5, 0.5, 0.5, 0.25).unwrap();
        let letter = r.to_crop_box(PageSize {
            width: 612.0,
            height: 792.0,
        });
        assert!(approx(letter.x0, 306.0));
        assert!(approx(letter.y1, 594.0));

        let a4_scan = r.to_crop_box(PageSize {
            width: 2480.0,
            height: 3508.0,
        });
        assert!(approx(a4_scan.x1, 2480.0));
        assert!(approx(a4_scan.y0, 1754.0));
    }

    #[test]
    fn test_crop_box_contained_in_page() {
        let page = PageSize {
            width: 595.0,
            height: 842.0,
        };
        let steps = [0.0, 0.1, 0.3, 0.5, 0.7, 0.9];
        for &x in &steps {
            for &y in &steps {
                let w = 1.0 - x;
                let h = 1.0 - y;
                if w <= 0.0 || h <= 0.0 {
                    continue;
                }
                let crop = FractionalRegion::new(x, y, w, h).unwrap().to_crop_box(page);
                assert!(crop.x0 >= 0.0 && crop.y0 >= 0.0);
                assert!(crop.x1 <= page.width && crop.y1 <= page.height);
                assert!(crop.x0 <= crop.x1 && crop.y0 <= crop.y1);
            }
        }
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        assert!(FractionalRegion::new(-0.1, 0.0, 0.5, 0.5).is_err());
        assert!(FractionalRegion::new(0.6, 0.0, 0.5, 0.5).is_err());
        assert!(FractionalRegion::new(0.0, 0.7, 0.5, 0.5).is_err());
        assert!(FractionalRegion::new(0.0, 0.0, 0.0, 0.5).is_err());
        assert!(FractionalRegion::new(f64::NAN, 0.0, 0.5, 0.5).is_err());
    }

    #[test]
    fn test_zero_viewport_rejected() {
        let err = normalize(
            Viewport {
                width: 0.0,
                height: 100.0,
            },
            PreviewSelection {
                x: 0.0,
                y: 0.0,
                w: 1.0,
                h: 1.0,
            },
        );
        assert!(matches!(err, Err(WcrError::RegionOutOfBounds(_))));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: FractionalRegion =
            serde_json::from_str(r#"{"x":0.1,"y":0.1,"w":0.2,"h":0.2}"#).unwrap();
        assert!(approx(ok.w(), 0.2));
        let bad: Result<FractionalRegion, _> =
            serde_json::from_str(r#"{"x":0.9,"y":0.1,"w":0.2,"h":0.2}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_from_crop_box_round_trip_bounds() {
        let page = PageSize {
            width: 200.0,
            height: 100.0,
        };
        let r = FractionalRegion::from_crop_box(
            &CropBox {
                x0: -5.0,
                y0: 10.0,
                x1: 100.0,
                y1: 150.0,
            },
            page,
        )
        .unwrap();
        assert!(approx(r.x(), 0.0));
        assert!(approx(r.y(), 0.1));
        assert!(approx(r.w(), 0.5));
        assert!(approx(r.h(), 0.9));
    }
}
