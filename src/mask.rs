//! Binary inpainting masks and the regions used to build them.
//!
//! A [`Mask`] has the same dimensions as the image it applies to. Each pixel
//! is either `0` (keep) or [`MARKED`] (replace by inpainting). Masks are built
//! incrementally from rectangles and brush discs, or loaded from an image file
//! where any non-zero luma counts as marked.

use std::path::Path;
use std::str::FromStr;

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::error::{Error, Result};

/// Raw value of a marked mask pixel.
pub const MARKED: u8 = 255;

/// Axis-aligned rectangle in image pixel coordinates.
///
/// The far edge is exclusive: a rectangle at `x` with `width` covers columns
/// `x..x + width`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left column.
    pub x: u32,
    /// Top row.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Create a rectangle from its top-left corner and size.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build the rectangle spanned by two drag corners.
    ///
    /// Corners may be given in any order. Negative coordinates are clamped to
    /// zero, so a drag that starts or ends left of / above the image still
    /// covers the visible part.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn from_corners(a: (i32, i32), b: (i32, i32)) -> Self {
        let x0 = a.0.min(b.0).max(0) as u32;
        let y0 = a.1.min(b.1).max(0) as u32;
        let x1 = a.0.max(b.0).max(0) as u32;
        let y1 = a.1.max(b.1).max(0) as u32;
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Whether the rectangle covers no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Clip the rectangle to a `width` x `height` raster.
    #[must_use]
    pub fn clip(&self, width: u32, height: u32) -> Self {
        let x0 = self.x.min(width);
        let y0 = self.y.min(height);
        let x1 = self.x.saturating_add(self.width).min(width);
        let y1 = self.y.saturating_add(self.height).min(height);
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// A region to mark, as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Rectangle, written `x,y,w,h`.
    Rect(Rect),
    /// Filled disc, written `x,y,r`.
    Disc {
        /// Center column.
        x: u32,
        /// Center row.
        y: u32,
        /// Radius in pixels.
        radius: u32,
    },
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::InvalidRegion(format!("`{s}`: {e}")))?;

        match parts.as_slice() {
            &[x, y, width, height] => {
                let rect = Rect::new(x, y, width, height);
                if rect.is_empty() {
                    return Err(Error::InvalidRegion(format!("`{s}`: rectangle is empty")));
                }
                Ok(Self::Rect(rect))
            }
            &[x, y, radius] => Ok(Self::Disc { x, y, radius }),
            _ => Err(Error::InvalidRegion(format!(
                "`{s}`: expected `x,y,w,h` or `x,y,r`"
            ))),
        }
    }
}

/// Binary raster marking the pixels to replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    raster: GrayImage,
}

impl Mask {
    /// Create an empty mask.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            raster: GrayImage::new(width, height),
        }
    }

    /// Wrap a grayscale raster. Any non-zero pixel counts as marked.
    #[must_use]
    pub fn from_gray(mut raster: GrayImage) -> Self {
        for px in raster.pixels_mut() {
            if px[0] != 0 {
                px[0] = MARKED;
            }
        }
        Self { raster }
    }

    /// Load a mask from an image file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Image`] if the file cannot be opened or decoded.
    pub fn open(path: &Path) -> Result<Self> {
        let raster = image::open(path)?.to_luma8();
        Ok(Self::from_gray(raster))
    }

    /// Mask width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    /// Mask height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    /// `(width, height)` of the mask.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.raster.dimensions()
    }

    /// Borrow the underlying raster.
    #[must_use]
    pub fn as_gray(&self) -> &GrayImage {
        &self.raster
    }

    /// Whether the pixel at `(x, y)` is marked. Out-of-bounds pixels are not.
    #[must_use]
    pub fn is_marked(&self, x: u32, y: u32) -> bool {
        self.raster
            .get_pixel_checked(x, y)
            .is_some_and(|px| px[0] != 0)
    }

    /// Number of marked pixels.
    #[must_use]
    pub fn marked_count(&self) -> u64 {
        self.raster.pixels().filter(|px| px[0] != 0).count() as u64
    }

    /// Sum of the raw mask values (`marked_count() * 255`).
    #[must_use]
    pub fn weight(&self) -> u64 {
        self.raster.pixels().map(|px| u64::from(px[0])).sum()
    }

    /// Whether no pixel is marked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raster.pixels().all(|px| px[0] == 0)
    }

    /// Mark every pixel inside `rect`, clipped to the mask bounds.
    pub fn fill_rect(&mut self, rect: Rect) {
        let r = rect.clip(self.width(), self.height());
        for y in r.y..r.y + r.height {
            for x in r.x..r.x + r.width {
                self.raster.put_pixel(x, y, Luma([MARKED]));
            }
        }
    }

    /// Stamp a filled disc centered on `(cx, cy)`.
    ///
    /// With `erase` the disc is cleared instead of marked. The center may lie
    /// outside the raster; only the overlapping part is touched.
    pub fn stamp(&mut self, cx: i32, cy: i32, radius: u32, erase: bool) {
        self.stamp_at(i64::from(cx), i64::from(cy), radius, erase);
    }

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn stamp_at(&mut self, cx: i64, cy: i64, radius: u32, erase: bool) {
        let value = if erase { 0 } else { MARKED };
        let r = i64::from(radius);
        let r2 = i128::from(r) * i128::from(r);
        let (w, h) = (i64::from(self.width()), i64::from(self.height()));

        let y0 = (cy - r).max(0);
        let y1 = (cy + r).min(h - 1);
        let x0 = (cx - r).max(0);
        let x1 = (cx + r).min(w - 1);

        for y in y0..=y1 {
            let dy = i128::from(y - cy);
            for x in x0..=x1 {
                let dx = i128::from(x - cx);
                if dx * dx + dy * dy <= r2 {
                    self.raster.put_pixel(x as u32, y as u32, Luma([value]));
                }
            }
        }
    }

    /// Stamp discs along the segment `from`..=`to`.
    ///
    /// Discs are spaced at most half a radius apart so that a fast drag
    /// between two pointer events still leaves a continuous stroke. Only the
    /// part of the segment whose discs can reach the raster is walked.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn stroke(&mut self, from: (i32, i32), to: (i32, i32), radius: u32, erase: bool) {
        let r = f64::from(radius);
        let bounds = (
            -r,
            -r,
            f64::from(self.width()) - 1.0 + r,
            f64::from(self.height()) - 1.0 + r,
        );
        let start = (f64::from(from.0), f64::from(from.1));
        let end = (f64::from(to.0), f64::from(to.1));
        let Some((start, end)) = clip_segment(start, end, bounds) else {
            return;
        };

        let dx = end.0 - start.0;
        let dy = end.1 - start.1;
        let spacing = (r / 2.0).max(1.0);
        let steps = (dx.hypot(dy) / spacing).ceil().max(1.0) as u32;

        for i in 0..=steps {
            let t = f64::from(i) / f64::from(steps);
            let x = (start.0 + dx * t).round() as i64;
            let y = (start.1 + dy * t).round() as i64;
            self.stamp_at(x, y, radius, erase);
        }
    }

    /// Mark a [`Region`].
    pub fn apply(&mut self, region: Region) {
        match region {
            Region::Rect(rect) => self.fill_rect(rect),
            Region::Disc { x, y, radius } => {
                self.stamp_at(i64::from(x), i64::from(y), radius, false);
            }
        }
    }

    /// Copy of `image` with every marked pixel painted `color`.
    ///
    /// Pixels outside the mask (when sizes differ) are left untouched.
    #[must_use]
    pub fn overlay(&self, image: &RgbImage, color: Rgb<u8>) -> RgbImage {
        let mut preview = image.clone();
        for (x, y, px) in preview.enumerate_pixels_mut() {
            if self.is_marked(x, y) {
                *px = color;
            }
        }
        preview
    }
}

/// Clip the segment `a`..`b` to the box `(min_x, min_y, max_x, max_y)`
/// (Liang-Barsky). Returns `None` when the segment misses the box.
fn clip_segment(
    a: (f64, f64),
    b: (f64, f64),
    (min_x, min_y, max_x, max_y): (f64, f64, f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    for (p, q) in [
        (-dx, a.0 - min_x),
        (dx, max_x - a.0),
        (-dy, a.1 - min_y),
        (dy, max_y - a.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
        }
    }

    if t0 > t1 {
        return None;
    }
    Some((
        (a.0 + dx * t0, a.1 + dy * t0),
        (a.0 + dx * t1, a.1 + dy * t1),
    ))
}
