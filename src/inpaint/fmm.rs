//! Fast marching over the masked region.
//!
//! Marked pixels are visited in order of their distance to the mask border,
//! computed on the fly by solving `|grad T| = 1` with the upwind scheme from
//! Telea (2004). Every marked pixel is synthesized exactly once, the moment
//! the front reaches it, so later pixels can sample earlier results.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::mask::Mask;

/// Arrival time assigned to pixels the front has not reached yet.
pub(crate) const FAR: f32 = 1.0e6;

/// Per-pixel marching state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// Value is final (original pixel or already synthesized).
    Known,
    /// On the front: value is available, neighbors may still be unknown.
    Band,
    /// Marked and not yet reached.
    Inside,
}

/// Arrival times and states for every pixel of the image.
pub(crate) struct Field {
    width: usize,
    height: usize,
    time: Vec<f32>,
    state: Vec<State>,
}

impl Field {
    pub(crate) fn new(mask: &Mask) -> Self {
        let (w, h) = mask.dimensions();
        let (width, height) = (w as usize, h as usize);
        let mut time = vec![0.0; width * height];
        let mut state = vec![State::Known; width * height];

        for (x, y, px) in mask.as_gray().enumerate_pixels() {
            if px[0] != 0 {
                let idx = y as usize * width + x as usize;
                time[idx] = FAR;
                state[idx] = State::Inside;
            }
        }

        Self {
            width,
            height,
            time,
            state,
        }
    }

    pub(crate) fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Linear index of `(x, y)` if it lies inside the raster.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    pub(crate) fn checked_index(&self, x: isize, y: isize) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as isize || y >= self.height as isize {
            None
        } else {
            Some(self.index(x as usize, y as usize))
        }
    }

    /// Index of `(x, y)` if it is in bounds and holds a usable value.
    pub(crate) fn source_index(&self, x: isize, y: isize) -> Option<usize> {
        self.checked_index(x, y)
            .filter(|&i| self.state[i] != State::Inside)
    }

    pub(crate) fn is_source(&self, x: isize, y: isize) -> bool {
        self.source_index(x, y).is_some()
    }

    pub(crate) fn time(&self, idx: usize) -> f32 {
        self.time[idx]
    }

    /// Finite-difference gradient of `sample` at `(x, y)`.
    ///
    /// Uses central differences where both neighbors hold values, one-sided
    /// differences against the center where only one does, and zero
    /// otherwise.
    #[allow(clippy::cast_possible_wrap)]
    pub(crate) fn gradient<F>(&self, x: usize, y: usize, sample: F) -> (f32, f32)
    where
        F: Fn(usize) -> f32,
    {
        let (xi, yi) = (x as isize, y as isize);
        let center = sample(self.index(x, y));
        let axis = |before: (isize, isize), after: (isize, isize)| -> f32 {
            let b = self.source_index(before.0, before.1);
            let a = self.source_index(after.0, after.1);
            match (b, a) {
                (Some(b), Some(a)) => (sample(a) - sample(b)) * 0.5,
                (None, Some(a)) => sample(a) - center,
                (Some(b), None) => center - sample(b),
                (None, None) => 0.0,
            }
        };

        let gx = axis((xi - 1, yi), (xi + 1, yi));
        let gy = axis((xi, yi - 1), (xi, yi + 1));
        (gx, gy)
    }

    fn state_at(&self, x: isize, y: isize) -> State {
        self.checked_index(x, y)
            .map_or(State::Inside, |i| self.state[i])
    }

    fn time_at(&self, x: isize, y: isize) -> f32 {
        self.checked_index(x, y).map_or(FAR, |i| self.time[i])
    }

    /// Upwind solution of the Eikonal equation from two orthogonal neighbors.
    fn solve(&self, a: (isize, isize), b: (isize, isize)) -> f32 {
        let a_known = self.state_at(a.0, a.1) != State::Inside;
        let b_known = self.state_at(b.0, b.1) != State::Inside;
        let ta = self.time_at(a.0, a.1);
        let tb = self.time_at(b.0, b.1);

        match (a_known, b_known) {
            (true, true) => {
                let d = ta - tb;
                if d.abs() >= 1.0 {
                    1.0 + ta.min(tb)
                } else {
                    (ta + tb + (2.0 - d * d).sqrt()) * 0.5
                }
            }
            (true, false) => 1.0 + ta,
            (false, true) => 1.0 + tb,
            (false, false) => FAR,
        }
    }

    /// Arrival time of the front at `(x, y)`: best of the four quadrants.
    #[allow(clippy::cast_possible_wrap)]
    fn arrival(&self, x: usize, y: usize) -> f32 {
        let (x, y) = (x as isize, y as isize);
        self.solve((x, y - 1), (x - 1, y))
            .min(self.solve((x + 1, y), (x, y - 1)))
            .min(self.solve((x, y + 1), (x - 1, y)))
            .min(self.solve((x + 1, y), (x, y + 1)))
    }

    fn neighbors(&self, x: usize, y: usize) -> impl Iterator<Item = (usize, usize)> {
        let (w, h) = (self.width, self.height);
        [
            (x.wrapping_sub(1), y),
            (x + 1, y),
            (x, y.wrapping_sub(1)),
            (x, y + 1),
        ]
        .into_iter()
        .filter(move |&(nx, ny)| nx < w && ny < h)
    }
}

/// Synthesizes the value of one marked pixel from the known pixels around it.
pub(crate) trait Estimator {
    /// Estimate the RGB value at `(x, y)`.
    ///
    /// `pixels` holds final values for every pixel that `field` reports as a
    /// source; the pixel itself is still `Inside`.
    fn estimate(&self, field: &Field, pixels: &[[f32; 3]], x: usize, y: usize) -> [f32; 3];
}

/// Heap entry ordered so that [`BinaryHeap`] pops the smallest arrival time.
#[derive(Debug, Clone, Copy)]
struct Node {
    time: f32,
    x: usize,
    y: usize,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| (other.y, other.x).cmp(&(self.y, self.x)))
    }
}

/// Run the fast marching method, filling every `Inside` pixel of `pixels`.
///
/// Returns the number of pixels synthesized.
pub(crate) fn march<E: Estimator>(
    field: &mut Field,
    pixels: &mut [[f32; 3]],
    estimator: &E,
) -> usize {
    let mut heap = BinaryHeap::new();

    // Seed the band with known pixels touching the mask.
    for y in 0..field.height {
        for x in 0..field.width {
            let idx = field.index(x, y);
            if field.state[idx] != State::Known {
                continue;
            }
            let touches_mask = field
                .neighbors(x, y)
                .any(|(nx, ny)| field.state[field.index(nx, ny)] == State::Inside);
            if touches_mask {
                field.state[idx] = State::Band;
                heap.push(Node { time: 0.0, x, y });
            }
        }
    }

    let mut filled = 0;
    while let Some(node) = heap.pop() {
        let idx = field.index(node.x, node.y);
        field.state[idx] = State::Known;

        let reached: Vec<(usize, usize)> = field
            .neighbors(node.x, node.y)
            .filter(|&(nx, ny)| field.state[field.index(nx, ny)] == State::Inside)
            .collect();

        for (nx, ny) in reached {
            let n = field.index(nx, ny);
            let time = field.arrival(nx, ny);
            field.time[n] = time;
            pixels[n] = estimator.estimate(field, pixels, nx, ny);
            field.state[n] = State::Band;
            heap.push(Node {
                time,
                x: nx,
                y: ny,
            });
            filled += 1;
        }
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::Rect;

    /// Copies the left neighbor's value; enough to observe marching order.
    struct CopyLeft;

    impl Estimator for CopyLeft {
        fn estimate(&self, field: &Field, pixels: &[[f32; 3]], x: usize, y: usize) -> [f32; 3] {
            pixels[y * field.width() + x - 1]
        }
    }

    #[test]
    fn field_marks_inside_pixels() {
        let mut mask = Mask::new(5, 5);
        mask.fill_rect(Rect::new(1, 1, 2, 2));
        let field = Field::new(&mask);
        assert!(field.is_source(0, 0));
        assert!(!field.is_source(1, 1));
        assert!(!field.is_source(-1, 0));
        assert!(!field.is_source(5, 0));
        assert!((field.time(field.index(2, 2)) - FAR).abs() < f32::EPSILON);
    }

    #[test]
    fn arrival_times_grow_into_the_hole() {
        let mut mask = Mask::new(11, 11);
        mask.fill_rect(Rect::new(2, 2, 7, 7));
        let mut field = Field::new(&mask);
        let mut pixels = vec![[0.0; 3]; 121];
        let filled = march(&mut field, &mut pixels, &CopyLeft);
        assert_eq!(filled, 49);

        let edge = field.time(field.index(2, 5));
        let center = field.time(field.index(5, 5));
        assert!((edge - 1.0).abs() < 1e-4, "edge time {edge}");
        assert!(center > edge + 2.0, "center time {center}");
        assert!(center < 5.0, "center time {center}");
    }

    #[test]
    fn every_inside_pixel_becomes_known() {
        let mut mask = Mask::new(8, 6);
        mask.stamp(4, 3, 2, false);
        let mut field = Field::new(&mask);
        let mut pixels = vec![[1.0; 3]; 48];
        march(&mut field, &mut pixels, &CopyLeft);
        assert!(field.state.iter().all(|&s| s == State::Known));
    }

    #[test]
    fn gradient_uses_central_and_one_sided_differences() {
        let mask = Mask::new(3, 1);
        let field = Field::new(&mask);
        let values = [1.0_f32, 3.0, 7.0];
        let (gx, gy) = field.gradient(1, 0, |i| values[i]);
        assert!((gx - 3.0).abs() < 1e-6);
        assert!(gy.abs() < 1e-6);

        let (edge_gx, _) = field.gradient(0, 0, |i| values[i]);
        assert!((edge_gx - 2.0).abs() < 1e-6);
    }

    #[test]
    fn gradient_ignores_inside_neighbors() {
        let mut mask = Mask::new(3, 1);
        mask.stamp(2, 0, 0, false);
        let field = Field::new(&mask);
        let values = [1.0_f32, 3.0, 100.0];
        let (gx, _) = field.gradient(1, 0, |i| values[i]);
        assert!((gx - 2.0).abs() < 1e-6);
    }

    #[test]
    fn heap_pops_smallest_time_first() {
        let mut heap = BinaryHeap::new();
        heap.push(Node { time: 3.0, x: 0, y: 0 });
        heap.push(Node { time: 1.0, x: 1, y: 0 });
        heap.push(Node { time: 2.0, x: 2, y: 0 });
        let order: Vec<usize> = std::iter::from_fn(|| heap.pop()).map(|n| n.x).collect();
        assert_eq!(order, vec![1, 2, 0]);
    }
}
