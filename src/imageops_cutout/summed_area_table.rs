use image::Primitive;

/// Summed-area table over a single row-major channel
///
/// Each entry holds the sum of all source values in the rectangle spanned by
/// the origin and that entry, so any axis-aligned rectangle sum costs four
/// lookups.
#[derive(Debug, Clone)]
pub struct SummedAreaTable<T> {
    data: Vec<T>,
    width: u32,
    height: u32,
}

impl<T> SummedAreaTable<T>
where
    T: Primitive,
{
    /// Builds the table from row-major `data` of `width * height` values
    ///
    /// # Panics
    ///
    /// If `data.len()` differs from `width * height`.
    #[must_use]
    pub fn from_data(data: &[T], width: u32, height: u32) -> Self {
        let w = width as usize;
        assert_eq!(data.len(), w * height as usize);

        let mut table = vec![T::zero(); data.len()];

        for y in 0..height as usize {
            let mut row_sum = T::zero();
            for x in 0..w {
                let index = y * w + x;
                row_sum = row_sum + data[index];
                // sat(x, y) = row prefix + sat(x, y - 1)
                table[index] = if y > 0 {
                    row_sum + table[index - w]
                } else {
                    row_sum
                };
            }
        }

        Self {
            data: table,
            width,
            height,
        }
    }

    /// Table value at `(x, y)`, zero outside the image
    #[must_use]
    pub fn get(&self, x: i64, y: i64) -> T {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            T::zero()
        } else {
            self.data[y as usize * self.width as usize + x as usize]
        }
    }

    /// Sum over the inclusive rectangle `(x1, y1)..=(x2, y2)`, clipped to the image
    #[must_use]
    pub fn rectangle_sum(&self, x1: i64, y1: i64, x2: i64, y2: i64) -> T {
        let x1 = x1.max(0);
        let y1 = y1.max(0);
        let x2 = x2.min(i64::from(self.width) - 1);
        let y2 = y2.min(i64::from(self.height) - 1);

        if x1 > x2 || y1 > y2 {
            return T::zero();
        }

        // Sum = sat(x2, y2) - sat(x1-1, y2) - sat(x2, y1-1) + sat(x1-1, y1-1)
        let bottom_right = self.get(x2, y2);
        let top_right = self.get(x2, y1 - 1);
        let bottom_left = self.get(x1 - 1, y2);
        let top_left = self.get(x1 - 1, y1 - 1);

        bottom_right + top_left - top_right - bottom_left
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}
