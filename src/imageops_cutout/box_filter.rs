use itertools::iproduct;

use crate::imageops_cutout::summed_area_table::SummedAreaTable;

/// Row-major single-channel `f64` buffer used by the matting solver
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    width: u32,
    height: u32,
    data: Vec<f64>,
}

impl Plane {
    /// # Panics
    ///
    /// If `data.len()` differs from `width * height`.
    #[must_use]
    pub fn new(width: u32, height: u32, data: Vec<f64>) -> Self {
        assert_eq!(data.len(), width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    #[must_use]
    pub fn filled(width: u32, height: u32, value: f64) -> Self {
        Self::new(width, height, vec![value; width as usize * height as usize])
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Elementwise `f(self[i], other[i])`
    #[must_use]
    pub fn zip_map<F>(&self, other: &Self, f: F) -> Self
    where
        F: Fn(f64, f64) -> f64,
    {
        debug_assert_eq!(self.data.len(), other.data.len());
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| f(a, b))
            .collect();
        Self::new(self.width, self.height, data)
    }

    /// Sum over the `(2r+1)^2` window centred on each pixel, clipped at the borders
    #[must_use]
    pub fn box_sum(&self, radius: u32) -> Self {
        self.box_reduce(radius, |sum, _| sum)
    }

    /// Mean over the clipped window centred on each pixel
    #[must_use]
    pub fn box_mean(&self, radius: u32) -> Self {
        self.box_reduce(radius, |sum, area| sum / area)
    }

    /// Number of pixels inside each clipped window
    #[must_use]
    pub fn window_sizes(width: u32, height: u32, radius: u32) -> Self {
        let data = iproduct!(0..height, 0..width)
            .map(|(y, x)| {
                f64::from(window_extent(y, height, radius) * window_extent(x, width, radius))
            })
            .collect();
        Self::new(width, height, data)
    }

    fn box_reduce<F>(&self, radius: u32, finish: F) -> Self
    where
        F: Fn(f64, f64) -> f64,
    {
        let (width, height) = (self.width, self.height);
        let sat = SummedAreaTable::from_data(&self.data, width, height);
        let r = i64::from(radius);

        let mut data = Vec::with_capacity(self.data.len());
        for y in 0..height {
            let y = i64::from(y);
            let y1 = (y - r).max(0);
            let y2 = (y + r).min(i64::from(height) - 1);
            for x in 0..width {
                let x = i64::from(x);
                let x1 = (x - r).max(0);
                let x2 = (x + r).min(i64::from(width) - 1);

                let sum = sat.rectangle_sum(x1, y1, x2, y2);
                let area = ((x2 - x1 + 1) * (y2 - y1 + 1)) as f64;
                data.push(finish(sum, area));
            }
        }

        Self::new(width, height, data)
    }
}

/// Length of the window `[c - r, c + r]` clipped to `[0, len)`
fn window_extent(center: u32, len: u32, radius: u32) -> u32 {
    let lo = center.saturating_sub(radius);
    let hi = center.saturating_add(radius).min(len - 1);
    hi - lo + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_mean_of_constant_is_constant() {
        let plane = Plane::filled(7, 5, 0.25);
        let mean = plane.box_mean(2);
        assert!(mean.data().iter().all(|&v| (v - 0.25).abs() < 1e-12));
    }

    #[test]
    fn test_box_sum_interior_and_corner() {
        let plane = Plane::filled(5, 5, 1.0);
        let sum = plane.box_sum(1);
        // corner window is 2x2, interior is 3x3
        assert_eq!(sum.data()[0], 4.0);
        assert_eq!(sum.data()[2 * 5 + 2], 9.0);
    }

    #[test]
    fn test_window_sizes_match_box_sum_of_ones() {
        let ones = Plane::filled(6, 4, 1.0);
        assert_eq!(Plane::window_sizes(6, 4, 1), ones.box_sum(1));
        assert_eq!(Plane::window_sizes(6, 4, 3), ones.box_sum(3));
    }

    #[test]
    fn test_box_mean_values() {
        let plane = Plane::new(3, 1, vec![0.0, 3.0, 6.0]);
        let mean = plane.box_mean(1);
        assert_eq!(mean.data(), &[1.5, 3.0, 4.5]);
    }

    #[test]
    fn test_zip_map() {
        let a = Plane::new(2, 1, vec![1.0, 2.0]);
        let b = Plane::new(2, 1, vec![3.0, 4.0]);
        assert_eq!(a.zip_map(&b, |x, y| x * y).data(), &[3.0, 8.0]);
    }
}
