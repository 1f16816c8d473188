//! One-shot removal pipeline: load, mask, inpaint, save.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage};

use crate::error::{Error, Result};
use crate::inpaint::{self, Method, MethodChoice, DEFAULT_RADIUS};
use crate::mask::{Mask, Region};

/// JPEG quality used when saving.
const JPEG_QUALITY: u8 = 95;

/// Options controlling a removal run.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Regions to mark on every image.
    pub regions: Vec<Region>,
    /// Mask image to start from (non-zero pixels are marked).
    pub mask_path: Option<PathBuf>,
    /// Inpainting neighborhood radius in pixels.
    pub radius: u32,
    /// Inpainting method selection.
    pub method: MethodChoice,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            mask_path: None,
            radius: DEFAULT_RADIUS,
            method: MethodChoice::Auto,
            verbose: false,
            quiet: false,
        }
    }
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Whether the file was skipped (nothing marked).
    pub skipped: bool,
    /// Method used, if any pixels were inpainted.
    pub method: Option<Method>,
    /// Number of marked pixels.
    pub marked: u64,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            success: false,
            skipped: false,
            method: None,
            marked: 0,
            message: String::new(),
        }
    }
}

/// Outcome of a successful [`Remover::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    /// Method that filled the region.
    pub method: Method,
    /// Number of pixels replaced.
    pub marked: u64,
}

/// Removes marked regions from images.
///
/// Create once with [`Remover::new()`] and reuse for multiple images. A mask
/// file given in the options is decoded once at construction.
#[derive(Debug, Default)]
pub struct Remover {
    base_mask: Option<Mask>,
}

impl Remover {
    /// Create a remover, loading `opts.mask_path` if set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Image`] if the mask file cannot be decoded.
    pub fn new(opts: &ProcessOptions) -> Result<Self> {
        let base_mask = opts.mask_path.as_deref().map(Mask::open).transpose()?;
        Ok(Self { base_mask })
    }

    /// Build the mask for a `width` x `height` image from the base mask and
    /// the configured regions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MaskSizeMismatch`] if the base mask has another size.
    pub fn mask_for(&self, width: u32, height: u32, opts: &ProcessOptions) -> Result<Mask> {
        let mut mask = match &self.base_mask {
            Some(base) if base.dimensions() != (width, height) => {
                return Err(Error::MaskSizeMismatch {
                    image: (width, height),
                    mask: base.dimensions(),
                });
            }
            Some(base) => base.clone(),
            None => Mask::new(width, height),
        };
        for region in &opts.regions {
            mask.apply(*region);
        }
        Ok(mask)
    }

    /// Inpaint the configured regions of `image` in place.
    ///
    /// Returns what was done, or `None` when nothing was marked.
    ///
    /// # Errors
    ///
    /// Propagates mask and inpainting errors.
    pub fn remove(&self, image: &mut RgbImage, opts: &ProcessOptions) -> Result<Option<Removal>> {
        let mask = self.mask_for(image.width(), image.height(), opts)?;
        if mask.is_empty() {
            return Ok(None);
        }
        let method = opts.method.resolve(&mask);
        *image = inpaint::inpaint(image, &mask, opts.radius, method)?;
        Ok(Some(Removal {
            method,
            marked: mask.marked_count(),
        }))
    }

    /// Process a single image file: load, mask, inpaint, save.
    ///
    /// Returns a [`ProcessResult`] indicating success, skip, or failure.
    #[must_use]
    pub fn process_file(
        &self,
        input: &Path,
        output: &Path,
        opts: &ProcessOptions,
    ) -> ProcessResult {
        let mut result = ProcessResult::new(input);

        let mut rgb_img = match image::open(input) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                result.message = format!("Failed to load: {e}");
                return result;
            }
        };

        let removal = match self.remove(&mut rgb_img, opts) {
            Ok(Some(removal)) => removal,
            Ok(None) => {
                log::warn!("{}: no pixels marked", input.display());
                result.skipped = true;
                result.success = true;
                result.message = "No region marked inside the image".to_string();
                return result;
            }
            Err(e) => {
                result.message = format!("Failed to inpaint: {e}");
                return result;
            }
        };
        let method = removal.method;
        result.method = Some(method);
        result.marked = removal.marked;

        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    result.message = format!("Failed to create output directory: {e}");
                    return result;
                }
            }
        }

        match save_image(&rgb_img, output) {
            Ok(()) => {
                result.success = true;
                result.message = format!(
                    "Inpainted {} pixels with {method} (radius {})",
                    result.marked, opts.radius
                );
            }
            Err(e) => {
                result.message = format!("Failed to save: {e}");
            }
        }

        result
    }

    /// Process all supported images in a directory.
    ///
    /// Uses parallel iteration when the `cli` feature is enabled (via rayon).
    /// Returns a [`ProcessResult`] for each image found.
    #[must_use]
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        opts: &ProcessOptions,
    ) -> Vec<ProcessResult> {
        let entries: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .filter(|p| is_supported_image(p))
                .collect(),
            Err(e) => {
                let mut failed = ProcessResult::new(input_dir);
                failed.message = format!("Failed to read directory: {e}");
                return vec![failed];
            }
        };

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                let mut failed = ProcessResult::new(output_dir);
                failed.message = format!("Failed to create output directory: {e}");
                return vec![failed];
            }
        }

        let run = |input_path: &PathBuf| {
            let output_path = match input_path.file_name() {
                Some(name) => output_dir.join(name),
                None => output_dir.join(default_output_path(input_path)),
            };
            self.process_file(input_path, &output_path, opts)
        };

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            entries.par_iter().map(run).collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            entries.iter().map(run).collect()
        }
    }
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "bmp" | "tif" | "tiff" | "webp"
        ),
        None => false,
    }
}

/// Save an RGB image with format-specific quality settings.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &RgbImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;

    match format {
        ImageFormat::Jpeg => {
            let mut writer = BufWriter::new(File::create(path)?);
            JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY).encode_image(img)?;
            writer.flush()?;
        }
        ImageFormat::Png | ImageFormat::Bmp | ImageFormat::Tiff | ImageFormat::WebP => {
            let mut writer = BufWriter::new(File::create(path)?);
            DynamicImage::ImageRgb8(img.clone()).write_to(&mut writer, format)?;
            writer.flush()?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    log::info!("saved {}", path.display());
    Ok(())
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.jpg"` becomes `"photo_inpainted.jpg"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let ext = input.extension().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_inpainted.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::Rect;

    #[test]
    fn default_output_path_appends_inpainted_suffix() {
        let p = default_output_path(Path::new("/tmp/photo.jpg"));
        assert_eq!(p, PathBuf::from("/tmp/photo_inpainted.jpg"));

        let p = default_output_path(Path::new("image.png"));
        assert_eq!(
            p.file_name().unwrap().to_str().unwrap(),
            "image_inpainted.png"
        );
    }

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.bmp")));
        assert!(is_supported_image(Path::new("scan.tif")));
        assert!(is_supported_image(Path::new("scan.TIFF")));
        assert!(is_supported_image(Path::new("photo.webp")));
    }

    #[test]
    fn is_supported_image_rejects_unsupported_formats() {
        assert!(!is_supported_image(Path::new("photo.gif")));
        assert!(!is_supported_image(Path::new("photo.txt")));
        assert!(!is_supported_image(Path::new("photo")));
    }

    #[test]
    fn save_image_rejects_unknown_extension() {
        let img = RgbImage::new(2, 2);
        let err = save_image(&img, Path::new("out.xyz")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn mask_for_applies_regions() {
        let remover = Remover::default();
        let opts = ProcessOptions {
            regions: vec![
                Region::Rect(Rect::new(0, 0, 2, 2)),
                Region::Disc {
                    x: 10,
                    y: 10,
                    radius: 0,
                },
            ],
            ..ProcessOptions::default()
        };
        let mask = remover.mask_for(20, 20, &opts).unwrap();
        assert_eq!(mask.marked_count(), 5);
    }

    #[test]
    fn mask_for_rejects_base_mask_of_other_size() {
        let remover = Remover {
            base_mask: Some(Mask::new(8, 8)),
        };
        let err = remover
            .mask_for(10, 10, &ProcessOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::MaskSizeMismatch { .. }));
    }

    #[test]
    fn remove_without_regions_is_a_no_op() {
        let remover = Remover::default();
        let mut img = RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3]));
        let before = img.clone();
        let removal = remover.remove(&mut img, &ProcessOptions::default()).unwrap();
        assert!(removal.is_none());
        assert_eq!(img, before);
    }

    #[test]
    fn remove_reports_method_and_marked_pixels() {
        let remover = Remover::default();
        let mut img = RgbImage::from_pixel(16, 16, image::Rgb([40, 50, 60]));
        img.put_pixel(5, 5, image::Rgb([255, 255, 255]));
        let opts = ProcessOptions {
            regions: vec![Region::Rect(Rect::new(4, 4, 3, 3))],
            ..ProcessOptions::default()
        };

        let removal = remover.remove(&mut img, &opts).unwrap().unwrap();
        assert_eq!(removal.method, Method::Telea);
        assert_eq!(removal.marked, 9);
        assert_eq!(*img.get_pixel(5, 5), image::Rgb([40, 50, 60]));
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "watermark-inpaint-engine-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[allow(clippy::cast_possible_truncation)]
    fn gradient_image() -> RgbImage {
        RgbImage::from_fn(24, 16, |x, y| {
            image::Rgb([(x * 10) as u8, (y * 12) as u8, 128])
        })
    }

    #[test]
    fn save_image_round_trips_every_format() {
        let dir = scratch("formats");
        let img = gradient_image();

        // JPEG is lossy; the others must match exactly.
        for (ext, tolerance) in [
            ("jpg", 24u8),
            ("png", 0),
            ("bmp", 0),
            ("tif", 0),
            ("webp", 0),
        ] {
            let path = dir.join(format!("out.{ext}"));
            save_image(&img, &path).unwrap();

            let loaded = image::open(&path).unwrap().to_rgb8();
            assert_eq!(loaded.dimensions(), img.dimensions(), "{ext}");
            for (x, y) in [(0, 0), (12, 8), (23, 15)] {
                let (a, b) = (loaded.get_pixel(x, y), img.get_pixel(x, y));
                assert!(
                    a.0.iter().zip(b.0).all(|(p, q)| p.abs_diff(q) <= tolerance),
                    "{ext} at ({x}, {y}): {a:?} vs {b:?}"
                );
            }
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_image_reports_uncreatable_path() {
        let dir = scratch("blocked");
        let blocker = dir.join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let img = gradient_image();

        for name in ["out.jpg", "out.png"] {
            let err = save_image(&img, &blocker.join(name)).unwrap_err();
            assert!(matches!(err, Error::Io(_)), "{name}: {err:?}");
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn save_image_reports_failed_write() {
        let dir = scratch("full");
        let img = gradient_image();

        for name in ["out.jpg", "out.png", "out.tif"] {
            let path = dir.join(name);
            std::os::unix::fs::symlink("/dev/full", &path).unwrap();
            assert!(save_image(&img, &path).is_err(), "{name} reported success");
        }

        let _ = std::fs::remove_dir_all(&dir);
    }
}
