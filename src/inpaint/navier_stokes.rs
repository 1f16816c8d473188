//! Navier–Stokes style inpainting estimator.
//!
//! Image intensity is treated as a stream function: its isophotes (lines of
//! constant brightness) are the streamlines, and the fill continues them into
//! the hole. Each known neighbor `q` contributes in proportion to how well
//! the offset `p - q` follows the isophote through `q`, which is
//! perpendicular to the luminance gradient there.

use super::fmm::{Estimator, Field};

/// Squared luminance gradient below which a neighbor counts as flat.
///
/// Flat neighbors have no isophote to follow and contribute fully.
const FLAT_GRADIENT2: f32 = 1.0;

/// Floor for neighbors lying across an isophote.
const MIN_ALIGNMENT: f32 = 0.01;

pub(crate) struct NavierStokes {
    pub(crate) radius: u32,
}

fn luma(px: [f32; 3]) -> f32 {
    0.299 * px[0] + 0.587 * px[1] + 0.114 * px[2]
}

impl Estimator for NavierStokes {
    #[allow(
        clippy::cast_possible_wrap,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn estimate(&self, field: &Field, pixels: &[[f32; 3]], x: usize, y: usize) -> [f32; 3] {
        let r = self.radius as isize;
        let (xi, yi) = (x as isize, y as isize);
        let mut sum = [0.0_f32; 3];
        let mut weight_sum = 0.0_f32;

        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                let (qx, qy) = (xi + dx, yi + dy);
                let Some(q) = field.source_index(qx, qy) else {
                    continue;
                };

                let vx = -dx as f32;
                let vy = -dy as f32;
                let len2 = vx * vx + vy * vy;
                let distance = 1.0 / (len2 * len2.sqrt());

                let (gx, gy) = field.gradient(qx as usize, qy as usize, |i| luma(pixels[i]));
                let grad2 = gx * gx + gy * gy;
                let alignment = if grad2 < FLAT_GRADIENT2 {
                    1.0
                } else {
                    // Isophote direction is (-gy, gx).
                    ((-gy * vx + gx * vy).abs() / (len2 * grad2).sqrt()).max(MIN_ALIGNMENT)
                };

                let w = distance * alignment;
                for (acc, v) in sum.iter_mut().zip(pixels[q]) {
                    *acc += w * v;
                }
                weight_sum += w;
            }
        }

        if weight_sum <= 0.0 {
            return pixels[field.index(x, y)];
        }
        sum.map(|v| (v / weight_sum).clamp(0.0, 255.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inpaint::fmm::march;
    use crate::mask::{Mask, Rect};

    fn run(pixels: &mut [[f32; 3]], mask: &Mask, radius: u32) {
        let mut field = Field::new(mask);
        march(&mut field, pixels, &NavierStokes { radius });
    }

    #[test]
    fn luma_weights_sum_to_one() {
        assert!((luma([100.0, 100.0, 100.0]) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn flat_region_stays_flat() {
        let mut mask = Mask::new(12, 12);
        mask.fill_rect(Rect::new(3, 3, 6, 6));
        let mut pixels = vec![[40.0, 80.0, 160.0]; 144];
        run(&mut pixels, &mask, 5);
        for px in &pixels {
            assert!((px[0] - 40.0).abs() < 0.5);
            assert!((px[1] - 80.0).abs() < 0.5);
            assert!((px[2] - 160.0).abs() < 0.5);
        }
    }

    #[test]
    fn horizontal_edge_is_continued_across_hole() {
        // Top half dark, bottom half bright; a vertical band hides the middle.
        let (w, h) = (30usize, 20usize);
        let mut pixels: Vec<[f32; 3]> = (0..w * h)
            .map(|i| if i / w < 10 { [20.0; 3] } else { [220.0; 3] })
            .collect();
        let mut mask = Mask::new(w as u32, h as u32);
        mask.fill_rect(Rect::new(12, 0, 6, 20));
        for y in 0..h {
            for x in 12..18 {
                pixels[y * w + x] = [128.0; 3];
            }
        }

        run(&mut pixels, &mask, 5);

        for x in 12..18 {
            let top = pixels[3 * w + x][0];
            let bottom = pixels[16 * w + x][0];
            assert!(top < 80.0, "column {x}: top {top}");
            assert!(bottom > 160.0, "column {x}: bottom {bottom}");
        }
    }
}
