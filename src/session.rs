//! Interactive editing session.
//!
//! A [`Session`] is the state machine behind the editor: it owns the original
//! image, the processed result, the accumulated mask and the undo/redo
//! history. Pointer gestures arrive in view coordinates (scaled by the zoom
//! level) and are translated to image pixels before touching the mask.
//!
//! Every commit inpaints the *original* image with the whole accumulated
//! mask, so the mask fully describes the edit: erasing part of it and
//! committing again restores the original pixels there.

use std::path::Path;
use std::str::FromStr;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::engine;
use crate::error::{Error, Result};
use crate::inpaint::{self, Method, MethodChoice, DEFAULT_RADIUS};
use crate::mask::{Mask, Rect};

/// Smallest brush radius in pixels.
pub const MIN_BRUSH_SIZE: u32 = 1;
/// Largest brush radius in pixels.
pub const MAX_BRUSH_SIZE: u32 = 50;
/// Brush radius of a fresh session.
pub const DEFAULT_BRUSH_SIZE: u32 = 10;

/// Smallest inpainting radius.
pub const MIN_RADIUS: u32 = 1;
/// Largest inpainting radius.
pub const MAX_RADIUS: u32 = 20;

/// Zoom level bounds.
pub const MIN_ZOOM: f32 = 0.1;
/// Zoom level bounds.
pub const MAX_ZOOM: f32 = 5.0;
/// Factor applied by [`Session::zoom_in`].
pub const ZOOM_IN_FACTOR: f32 = 1.2;
/// Factor applied by [`Session::zoom_out`].
pub const ZOOM_OUT_FACTOR: f32 = 0.8;

/// Number of undo steps kept by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Color used to show marked pixels in [`Session::preview`].
pub const PREVIEW_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Active pointer tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Drag out a rectangle; inpaint on release.
    #[default]
    Rectangle,
    /// Paint the mask with a round brush; inpaint on release.
    Brush,
    /// Clear the mask with a round brush; inpaint on release.
    Eraser,
}

impl FromStr for Tool {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rect" | "rectangle" => Ok(Self::Rectangle),
            "brush" => Ok(Self::Brush),
            "eraser" => Ok(Self::Eraser),
            other => Err(Error::UnknownTool(other.to_string())),
        }
    }
}

/// Tunable parameters of a session.
#[derive(Debug, Clone)]
pub struct EditSettings {
    /// Brush radius in image pixels.
    pub brush_size: u32,
    /// Inpainting neighborhood radius.
    pub radius: u32,
    /// Inpainting method selection.
    pub method: MethodChoice,
    /// Maximum number of undo steps.
    pub history_limit: usize,
}

impl Default for EditSettings {
    fn default() -> Self {
        Self {
            brush_size: DEFAULT_BRUSH_SIZE,
            radius: DEFAULT_RADIUS,
            method: MethodChoice::Auto,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    image: RgbImage,
    mask: Option<Mask>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
    Idle,
    Rect { anchor: (i32, i32) },
    Stroke { last: (i32, i32), erase: bool },
}

/// Editing session over one image.
#[derive(Debug)]
pub struct Session {
    original: RgbImage,
    current: RgbImage,
    mask: Option<Mask>,
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
    // State before the mask edits that have not been committed yet.
    pending: Option<Snapshot>,
    tool: Tool,
    settings: EditSettings,
    zoom: f32,
    gesture: Gesture,
}

impl Session {
    /// Start a session on an in-memory image.
    #[must_use]
    pub fn new(image: RgbImage) -> Self {
        Self::with_settings(image, EditSettings::default())
    }

    /// Start a session with explicit settings. Out-of-range values are
    /// clamped.
    #[must_use]
    pub fn with_settings(image: RgbImage, settings: EditSettings) -> Self {
        let mut session = Self {
            current: image.clone(),
            original: image,
            mask: None,
            undo: Vec::new(),
            redo: Vec::new(),
            pending: None,
            tool: Tool::default(),
            settings: EditSettings::default(),
            zoom: 1.0,
            gesture: Gesture::Idle,
        };
        session.set_brush_size(settings.brush_size);
        session.set_radius(settings.radius);
        session.set_method(settings.method);
        session.settings.history_limit = settings.history_limit;
        session
    }

    /// Load an image file and start a session on it.
    ///
    /// Grayscale and alpha images are converted to RGB.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Image`] if the file cannot be opened or decoded.
    pub fn open(path: &Path) -> Result<Self> {
        let image = image::open(path)?.to_rgb8();
        log::info!(
            "opened {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Self::new(image))
    }

    /// The image as loaded.
    #[must_use]
    pub fn original(&self) -> &RgbImage {
        &self.original
    }

    /// The processed image.
    #[must_use]
    pub fn image(&self) -> &RgbImage {
        &self.current
    }

    /// The accumulated mask, if anything has been marked.
    #[must_use]
    pub fn mask(&self) -> Option<&Mask> {
        self.mask.as_ref()
    }

    /// Active tool.
    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> &EditSettings {
        &self.settings
    }

    /// Current zoom level.
    #[must_use]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Select a tool. Any gesture in progress is abandoned.
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
        self.gesture = Gesture::Idle;
    }

    /// Switch between brush and eraser. Has no effect on the rectangle tool.
    pub fn toggle_eraser(&mut self) {
        match self.tool {
            Tool::Brush => self.set_tool(Tool::Eraser),
            Tool::Eraser => self.set_tool(Tool::Brush),
            Tool::Rectangle => {}
        }
    }

    /// Set the brush radius, clamped to `1..=50`.
    pub fn set_brush_size(&mut self, size: u32) {
        self.settings.brush_size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
    }

    /// Set the inpainting radius, clamped to `1..=20`.
    pub fn set_radius(&mut self, radius: u32) {
        self.settings.radius = radius.clamp(MIN_RADIUS, MAX_RADIUS);
    }

    /// Set the inpainting method selection.
    pub fn set_method(&mut self, method: MethodChoice) {
        self.settings.method = method;
    }

    /// Multiply the zoom level by `factor`, clamped to `0.1..=5.0`.
    pub fn zoom_by(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    /// Zoom in one step.
    pub fn zoom_in(&mut self) {
        self.zoom_by(ZOOM_IN_FACTOR);
    }

    /// Zoom out one step.
    pub fn zoom_out(&mut self) {
        self.zoom_by(ZOOM_OUT_FACTOR);
    }

    /// Back to 100%.
    pub fn reset_zoom(&mut self) {
        self.zoom = 1.0;
    }

    /// Convert a view position to image pixel coordinates.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_image_coords(&self, view: (f32, f32)) -> (i32, i32) {
        ((view.0 / self.zoom) as i32, (view.1 / self.zoom) as i32)
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            image: self.current.clone(),
            mask: self.mask.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.current = snapshot.image;
        self.mask = snapshot.mask;
    }

    fn mask_mut(&mut self) -> &mut Mask {
        if self.pending.is_none() {
            self.pending = Some(self.snapshot());
        }
        let (w, h) = self.original.dimensions();
        self.mask.get_or_insert_with(|| Mask::new(w, h))
    }

    /// Mark a rectangle given in image coordinates. Takes effect on the next
    /// [`apply`](Self::apply).
    pub fn mark_rect(&mut self, rect: Rect) {
        self.mask_mut().fill_rect(rect);
    }

    /// Stamp the brush at an image position. Takes effect on the next
    /// [`apply`](Self::apply).
    pub fn paint(&mut self, at: (i32, i32), erase: bool) {
        let size = self.settings.brush_size;
        self.mask_mut().stamp(at.0, at.1, size, erase);
    }

    /// Pointer pressed at a view position.
    pub fn press(&mut self, view: (f32, f32)) {
        let at = self.to_image_coords(view);
        self.gesture = match self.tool {
            Tool::Rectangle => Gesture::Rect { anchor: at },
            Tool::Brush | Tool::Eraser => {
                let erase = self.tool == Tool::Eraser;
                self.paint(at, erase);
                Gesture::Stroke { last: at, erase }
            }
        };
    }

    /// Pointer dragged to a view position.
    pub fn drag(&mut self, view: (f32, f32)) {
        let at = self.to_image_coords(view);
        if let Gesture::Stroke { last, erase } = self.gesture {
            let size = self.settings.brush_size;
            self.mask_mut().stroke(last, at, size, erase);
            self.gesture = Gesture::Stroke { last: at, erase };
        }
    }

    /// Pointer released at a view position: finish the gesture and inpaint.
    ///
    /// Returns whether a new result was committed.
    ///
    /// # Errors
    ///
    /// Propagates inpainting errors; the session keeps its previous result.
    pub fn release(&mut self, view: (f32, f32)) -> Result<bool> {
        let at = self.to_image_coords(view);
        if let Gesture::Rect { anchor } = self.gesture {
            self.mark_rect(Rect::from_corners(anchor, at));
        }
        self.gesture = Gesture::Idle;
        self.apply()
    }

    /// Inpaint the original image with the accumulated mask.
    ///
    /// Does nothing when nothing has been marked yet. Otherwise the state
    /// before the pending mask edits is pushed onto the undo stack and the
    /// redo stack is cleared.
    ///
    /// # Errors
    ///
    /// Propagates inpainting errors (for example a mask covering the whole
    /// image); the session keeps its previous result and the mask edits stay
    /// pending.
    pub fn apply(&mut self) -> Result<bool> {
        let Some(mask) = &self.mask else {
            return Ok(false);
        };

        let method = self.settings.method.resolve(mask);
        let result = inpaint::inpaint(&self.original, mask, self.settings.radius, method)?;
        log::info!(
            "inpainted {} pixels with {method} (radius {})",
            mask.marked_count(),
            self.settings.radius
        );

        let before = self.pending.take().unwrap_or_else(|| self.snapshot());
        self.push_undo(before);
        self.redo.clear();
        self.current = result;
        Ok(true)
    }

    /// Method the next [`apply`](Self::apply) would use.
    #[must_use]
    pub fn next_method(&self) -> Option<Method> {
        self.mask
            .as_ref()
            .map(|mask| self.settings.method.resolve(mask))
    }

    fn push_undo(&mut self, snapshot: Snapshot) {
        self.undo.push(snapshot);
        if self.undo.len() > self.settings.history_limit {
            let excess = self.undo.len() - self.settings.history_limit;
            self.undo.drain(..excess);
        }
    }

    /// Step back to the state before the last commit.
    ///
    /// Uncommitted mask edits are discarded. Returns whether anything changed.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo.pop() else {
            return false;
        };
        let committed = self.pending.take().unwrap_or_else(|| self.snapshot());
        self.redo.push(committed);
        self.restore(previous);
        self.gesture = Gesture::Idle;
        log::debug!("undo ({} left)", self.undo.len());
        true
    }

    /// Re-apply the last undone commit.
    ///
    /// Uncommitted mask edits are discarded. Returns whether anything changed.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        let committed = self.pending.take().unwrap_or_else(|| self.snapshot());
        self.push_undo(committed);
        self.restore(next);
        self.gesture = Gesture::Idle;
        log::debug!("redo ({} left)", self.redo.len());
        true
    }

    /// Whether [`undo`](Self::undo) would do anything.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether [`redo`](Self::redo) would do anything.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// The processed image with marked pixels painted red.
    #[must_use]
    pub fn preview(&self) -> RgbImage {
        match &self.mask {
            Some(mask) => mask.overlay(&self.current, PREVIEW_COLOR),
            None => self.current.clone(),
        }
    }

    /// The preview scaled by the zoom level.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn render(&self) -> RgbImage {
        let preview = self.preview();
        if (self.zoom - 1.0).abs() < f32::EPSILON {
            return preview;
        }
        let w = ((preview.width() as f32 * self.zoom) as u32).max(1);
        let h = ((preview.height() as f32 * self.zoom) as u32).max(1);
        imageops::resize(&preview, w, h, FilterType::Lanczos3)
    }

    /// Save the processed image.
    ///
    /// # Errors
    ///
    /// See [`save_image`](crate::save_image).
    pub fn save(&self, path: &Path) -> Result<()> {
        engine::save_image(&self.current, path)
    }
}
