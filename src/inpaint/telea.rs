//! Telea (2004) fast-marching inpainting estimator.
//!
//! Each pixel is a weighted average of first-order extrapolations from the
//! known pixels within the radius:
//! `I(p) = sum w(p,q) * (I(q) + grad I(q) . (p - q)) / sum w(p,q)`.
//! Weights favor pixels along the marching normal, close to `p`, and on the
//! same distance level set.

use super::fmm::{Estimator, Field};

/// Directional factors below this magnitude are treated as orthogonal.
const MIN_DIRECTION: f32 = 0.01;

/// Weight used for neighbors orthogonal to the marching direction.
const ORTHOGONAL_WEIGHT: f32 = 1.0e-6;

pub(crate) struct Telea {
    pub(crate) radius: u32,
}

impl Estimator for Telea {
    #[allow(
        clippy::cast_possible_wrap,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn estimate(&self, field: &Field, pixels: &[[f32; 3]], x: usize, y: usize) -> [f32; 3] {
        let p = field.index(x, y);
        let tp = field.time(p);
        let (gtx, gty) = field.gradient(x, y, |i| field.time(i));

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

                // Vector from q to p.
                let vx = -dx as f32;
                let vy = -dy as f32;
                let len2 = vx * vx + vy * vy;

                let distance = 1.0 / (len2 * len2.sqrt());
                let level = 1.0 / (1.0 + (field.time(q) - tp).abs());
                let mut direction = vx * gtx + vy * gty;
                if direction.abs() <= MIN_DIRECTION {
                    direction = ORTHOGONAL_WEIGHT;
                }
                let w = (distance * level * direction).abs();

                let (ux, uy) = (qx as usize, qy as usize);
                for (c, acc) in sum.iter_mut().enumerate() {
                    let (gx, gy) = field.gradient(ux, uy, |i| pixels[i][c]);
                    *acc += w * (pixels[q][c] + gx * vx + gy * vy);
                }
                weight_sum += w;
            }
        }

        if weight_sum <= 0.0 {
            return pixels[p];
        }
        sum.map(|v| (v / weight_sum).clamp(0.0, 255.0))
    }
}
