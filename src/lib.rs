//! Remove watermarks and unwanted objects from images by inpainting.
//!
//! Mark the pixels to replace with a [`Mask`] (rectangles, brush strokes or a
//! mask image) and fill them from their surroundings with one of two
//! classical algorithms: Telea's fast marching method or a Navier–Stokes
//! style isophote continuation. By default the algorithm is chosen from the
//! mask size.
//!
//! # Quick Start
//!
//! ```no_run
//! use watermark_inpaint::{inpaint, Mask, Method, Rect};
//!
//! let img = image::open("photo.jpg").unwrap().to_rgb8();
//! let mut mask = Mask::new(img.width(), img.height());
//! mask.fill_rect(Rect::new(900, 620, 110, 80));
//! let cleaned = inpaint(&img, &mask, 7, Method::for_mask(&mask)).unwrap();
//! cleaned.save("cleaned.jpg").unwrap();
//! ```
//!
//! # Editing sessions
//!
//! [`Session`] models an interactive editor: pointer gestures build up a
//! mask, every release inpaints, and each commit can be undone and redone.
//!
//! ```no_run
//! use watermark_inpaint::{Session, Tool};
//!
//! let mut session = Session::open("photo.png".as_ref()).unwrap();
//! session.set_tool(Tool::Brush);
//! session.press((120.0, 80.0));
//! session.drag((180.0, 85.0));
//! session.release((180.0, 85.0)).unwrap();
//! session.undo();
//! session.redo();
//! session.save("cleaned.png".as_ref()).unwrap();
//! ```

#![deny(missing_docs)]

mod engine;
pub mod error;
pub mod inpaint;
pub mod mask;
pub mod script;
pub mod session;

pub use engine::{
    default_output_path, is_supported_image, save_image, ProcessOptions, ProcessResult, Removal,
    Remover,
};
pub use error::{Error, Result};
pub use inpaint::{inpaint, Method, MethodChoice};
pub use mask::{Mask, Rect, Region};
pub use script::Script;
pub use session::{EditSettings, Session, Tool};
