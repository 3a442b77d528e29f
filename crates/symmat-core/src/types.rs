//! Core type definitions: Shape, Region.

/// Matrix shape (rows × columns).
///
/// Every expression in the graph is two-dimensional; scalars are 1×1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// The 1×1 shape.
    pub const fn scalar() -> Self {
        Self::new(1, 1)
    }

    /// Total number of elements.
    pub const fn numel(&self) -> usize {
        self.rows * self.cols
    }

    pub const fn is_scalar(&self) -> bool {
        self.rows == 1 && self.cols == 1
    }

    pub const fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Row or column vector (a 1×1 value counts as both).
    pub const fn is_vector(&self) -> bool {
        self.rows == 1 || self.cols == 1
    }

    /// Shape with rows and columns swapped.
    pub const fn transposed(&self) -> Self {
        Self::new(self.cols, self.rows)
    }

    /// The region covering the whole shape.
    pub const fn full_region(&self) -> Region {
        Region::new(0, 0, self.rows, self.cols)
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.rows, self.cols)
    }
}

/// A rectangular sub-region of a matrix: top-left corner plus extent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Region {
    pub const fn new(row: usize, col: usize, rows: usize, cols: usize) -> Self {
        Self {
            row,
            col,
            rows,
            cols,
        }
    }

    /// The 1×1 region at `(row, col)`.
    pub const fn cell(row: usize, col: usize) -> Self {
        Self::new(row, col, 1, 1)
    }

    /// Shape of the extracted block.
    pub const fn shape(&self) -> Shape {
        Shape::new(self.rows, self.cols)
    }

    /// Whether the region lies entirely within `shape`.
    ///
    /// Overflowing corner coordinates never fit.
    pub fn fits_in(&self, shape: Shape) -> bool {
        match (self.row.checked_add(self.rows), self.col.checked_add(self.cols)) {
            (Some(row_end), Some(col_end)) => row_end <= shape.rows && col_end <= shape.cols,
            _ => false,
        }
    }

    /// Whether the region is exactly the whole of `shape`.
    pub fn covers(&self, shape: Shape) -> bool {
        *self == shape.full_region()
    }

    /// Whether `(row, col)` lies inside the region. A far corner past
    /// `usize::MAX` is treated as unbounded.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row.checked_sub(self.row).is_some_and(|dr| dr < self.rows)
            && col.checked_sub(self.col).is_some_and(|dc| dc < self.cols)
    }
}

fn write_span(f: &mut std::fmt::Formatter<'_>, start: usize, len: usize) -> std::fmt::Result {
    match start.checked_add(len) {
        Some(end) => write!(f, "{start}..{end}"),
        None => write!(f, "{start}+{len}"),
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("rows ")?;
        write_span(f, self.row, self.rows)?;
        f.write_str(", cols ")?;
        write_span(f, self.col, self.cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_numel() {
        assert_eq!(Shape::new(2, 3).numel(), 6);
        assert_eq!(Shape::scalar().numel(), 1);
        assert_eq!(Shape::new(0, 5).numel(), 0);
    }

    #[test]
    fn test_shape_predicates() {
        assert!(Shape::new(3, 3).is_square());
        assert!(!Shape::new(3, 2).is_square());
        assert!(Shape::new(1, 4).is_vector());
        assert!(Shape::new(4, 1).is_vector());
        assert!(!Shape::new(2, 2).is_vector());
        assert_eq!(Shape::new(2, 5).transposed(), Shape::new(5, 2));
    }

    #[test]
    fn test_region_fits() {
        let s = Shape::new(3, 4);
        assert!(Region::new(0, 0, 3, 4).fits_in(s));
        assert!(Region::new(1, 2, 2, 2).fits_in(s));
        assert!(!Region::new(1, 2, 3, 2).fits_in(s));
        assert!(!Region::cell(3, 0).fits_in(s));
        assert!(!Region::new(usize::MAX, 0, 2, 1).fits_in(s));
    }

    #[test]
    fn test_region_covers_and_contains() {
        let s = Shape::new(2, 2);
        assert!(Region::new(0, 0, 2, 2).covers(s));
        assert!(!Region::cell(0, 0).covers(s));
        let r = Region::new(1, 1, 2, 3);
        assert!(r.contains(1, 1));
        assert!(r.contains(2, 3));
        assert!(!r.contains(3, 1));
        assert!(!r.contains(0, 2));
    }

    #[test]
    fn test_overflowing_region_is_handled() {
        let r = Region::new(usize::MAX, 0, 2, 1);
        assert!(r.contains(usize::MAX, 0));
        assert!(!r.contains(0, 0));
        assert!(!r.contains(usize::MAX, 1));
        assert_eq!(r.to_string(), format!("rows {}+2, cols 0..1", usize::MAX));
    }

    #[test]
    fn test_display() {
        assert_eq!(Shape::new(2, 3).to_string(), "[2, 3]");
        assert_eq!(Region::new(1, 0, 2, 1).to_string(), "rows 1..3, cols 0..1");
    }
}
