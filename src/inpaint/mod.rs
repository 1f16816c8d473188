//! Classical inpainting of masked image regions.
//!
//! Two estimators share one fast-marching front:
//!
//! - [`Method::Telea`]: first-order extrapolation from the known border,
//!   sharp and fast on thin or small regions.
//! - [`Method::NavierStokes`]: isophote-following average that carries edges
//!   across the hole, better suited to larger regions.
//!
//! [`Method::for_mask`] picks one from the mask size.

mod fmm;
mod navier_stokes;
mod telea;

use std::fmt;
use std::str::FromStr;

use image::{Rgb, RgbImage};

use crate::error::{Error, Result};
use crate::mask::Mask;

use self::fmm::Field;
use self::navier_stokes::NavierStokes;
use self::telea::Telea;

/// Masks whose raw weight (sum of 0/255 values) is below this use Telea.
///
/// The weight counts every marked pixel as 255, so this is 39 pixels.
pub const SMALL_MASK_WEIGHT: u64 = 10_000;

/// Default neighborhood radius in pixels.
pub const DEFAULT_RADIUS: u32 = 7;

/// Inpainting algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Telea fast-marching method.
    Telea,
    /// Navier–Stokes (isophote continuation) method.
    NavierStokes,
}

impl Method {
    /// Choose a method from the mask size: Telea for small masks,
    /// Navier–Stokes otherwise.
    #[must_use]
    pub fn for_mask(mask: &Mask) -> Self {
        if mask.weight() < SMALL_MASK_WEIGHT {
            Self::Telea
        } else {
            Self::NavierStokes
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Telea => f.write_str("telea"),
            Self::NavierStokes => f.write_str("navier-stokes"),
        }
    }
}

/// How to pick the method for an inpainting run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MethodChoice {
    /// Decide per mask with [`Method::for_mask`].
    #[default]
    Auto,
    /// Always use the given method.
    Fixed(Method),
}

impl MethodChoice {
    /// Resolve the choice against a concrete mask.
    #[must_use]
    pub fn resolve(self, mask: &Mask) -> Method {
        match self {
            Self::Auto => Method::for_mask(mask),
            Self::Fixed(method) => method,
        }
    }
}

impl FromStr for MethodChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "telea" => Ok(Self::Fixed(Method::Telea)),
            "ns" | "navier-stokes" | "navier_stokes" => Ok(Self::Fixed(Method::NavierStokes)),
            other => Err(Error::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Inpaint the marked pixels of `image`.
///
/// Returns a new image; unmarked pixels are copied unchanged. `radius` is the
/// neighborhood considered around each synthesized pixel and is raised to 1
/// if zero.
///
/// # Errors
///
/// - [`Error::MaskSizeMismatch`] if the mask and image differ in size.
/// - [`Error::NoSourcePixels`] if every pixel is marked.
pub fn inpaint(image: &RgbImage, mask: &Mask, radius: u32, method: Method) -> Result<RgbImage> {
    if image.dimensions() != mask.dimensions() {
        return Err(Error::MaskSizeMismatch {
            image: image.dimensions(),
            mask: mask.dimensions(),
        });
    }

    let marked = mask.marked_count();
    if marked == 0 {
        return Ok(image.clone());
    }
    if marked == u64::from(image.width()) * u64::from(image.height()) {
        return Err(Error::NoSourcePixels);
    }

    let radius = radius.max(1);
    let mut pixels: Vec<[f32; 3]> = image
        .pixels()
        .map(|px| [f32::from(px[0]), f32::from(px[1]), f32::from(px[2])])
        .collect();
    let mut field = Field::new(mask);

    let filled = match method {
        Method::Telea => fmm::march(&mut field, &mut pixels, &Telea { radius }),
        Method::NavierStokes => fmm::march(&mut field, &mut pixels, &NavierStokes { radius }),
    };
    log::debug!("{method}: synthesized {filled} of {marked} marked pixels (radius {radius})");

    let mut output = image.clone();
    for (x, y, px) in output.enumerate_pixels_mut() {
        if mask.is_marked(x, y) {
            let v = pixels[field.index(x as usize, y as usize)];
            *px = Rgb(v.map(to_channel));
        }
    }
    Ok(output)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::Rect;

    fn checkerboard(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgb([200, 180, 160])
            } else {
                Rgb([40, 60, 80])
            }
        })
    }

    #[test]
    fn heuristic_picks_telea_below_threshold() {
        let mut mask = Mask::new(100, 100);
        // 6x6 = 36 pixels -> weight 9180
        mask.fill_rect(Rect::new(0, 0, 6, 6));
        assert_eq!(Method::for_mask(&mask), Method::Telea);

        // 40 pixels -> weight 10200
        mask.fill_rect(Rect::new(0, 6, 4, 1));
        assert_eq!(mask.marked_count(), 40);
        assert_eq!(Method::for_mask(&mask), Method::NavierStokes);
    }

    #[test]
    fn empty_mask_uses_telea() {
        assert_eq!(Method::for_mask(&Mask::new(10, 10)), Method::Telea);
    }

    #[test]
    fn method_choice_parses_and_resolves() {
        let mask = Mask::new(4, 4);
        assert_eq!("auto".parse::<MethodChoice>().unwrap(), MethodChoice::Auto);
        assert_eq!(
            "NS".parse::<MethodChoice>().unwrap(),
            MethodChoice::Fixed(Method::NavierStokes)
        );
        assert_eq!(
            "telea".parse::<MethodChoice>().unwrap().resolve(&mask),
            Method::Telea
        );
        assert_eq!(MethodChoice::Auto.resolve(&mask), Method::Telea);
        assert!("patchmatch".parse::<MethodChoice>().is_err());
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let img = RgbImage::new(10, 10);
        let mask = Mask::new(10, 11);
        let err = inpaint(&img, &mask, 3, Method::Telea).unwrap_err();
        assert!(matches!(err, Error::MaskSizeMismatch { .. }));
    }

    #[test]
    fn full_mask_has_no_source() {
        let img = RgbImage::new(4, 4);
        let mut mask = Mask::new(4, 4);
        mask.fill_rect(Rect::new(0, 0, 4, 4));
        let err = inpaint(&img, &mask, 3, Method::NavierStokes).unwrap_err();
        assert!(matches!(err, Error::NoSourcePixels));
    }

    #[test]
    fn empty_mask_returns_identical_image() {
        let img = checkerboard(16, 16);
        let out = inpaint(&img, &Mask::new(16, 16), 5, Method::Telea).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn unmarked_pixels_are_never_modified() {
        let img = checkerboard(32, 32);
        let mut mask = Mask::new(32, 32);
        mask.fill_rect(Rect::new(10, 10, 8, 8));

        for method in [Method::Telea, Method::NavierStokes] {
            let out = inpaint(&img, &mask, 5, method).unwrap();
            for (x, y, px) in out.enumerate_pixels() {
                if !mask.is_marked(x, y) {
                    assert_eq!(px, img.get_pixel(x, y), "{method} changed ({x},{y})");
                }
            }
        }
    }

    #[test]
    fn watermark_on_flat_background_is_removed() {
        let background = Rgb([90, 140, 200]);
        let mut img = RgbImage::from_pixel(40, 30, background);
        for y in 12..18 {
            for x in 15..25 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let mut mask = Mask::new(40, 30);
        mask.fill_rect(Rect::new(14, 11, 12, 8));

        for method in [Method::Telea, Method::NavierStokes] {
            let out = inpaint(&img, &mask, DEFAULT_RADIUS, method).unwrap();
            for px in out.pixels() {
                for c in 0..3 {
                    let diff = (i32::from(px[c]) - i32::from(background[c])).abs();
                    assert!(diff <= 1, "{method}: {px:?}");
                }
            }
        }
    }

    #[test]
    fn zero_radius_is_raised_to_one() {
        let img = RgbImage::from_pixel(8, 8, Rgb([50, 50, 50]));
        let mut mask = Mask::new(8, 8);
        mask.stamp(4, 4, 1, false);
        let out = inpaint(&img, &mask, 0, Method::Telea).unwrap();
        assert_eq!(*out.get_pixel(4, 4), Rgb([50, 50, 50]));
    }

    #[test]
    fn mask_touching_image_border_is_filled() {
        let img = RgbImage::from_pixel(20, 20, Rgb([10, 200, 30]));
        let mut mask = Mask::new(20, 20);
        mask.fill_rect(Rect::new(0, 0, 6, 20));
        let out = inpaint(&img, &mask, 3, Method::NavierStokes).unwrap();
        assert_eq!(*out.get_pixel(0, 0), Rgb([10, 200, 30]));
        assert_eq!(*out.get_pixel(0, 19), Rgb([10, 200, 30]));
    }
}
