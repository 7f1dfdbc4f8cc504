use std::ops::Range;

const WORD: usize = u64::BITS as usize;

/// Claimed grid cells, one growable bitset per column.
///
/// Columns and rows that were never reserved are free, so the matrix only
/// stores what the layout actually touched.
#[derive(Debug, Clone, Default)]
pub struct OccupancyMatrix {
    columns: Vec<Vec<u64>>,
}

impl OccupancyMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.columns
            .get(x)
            .and_then(|col| col.get(y / WORD))
            .is_some_and(|&word| word & (1u64 << (y % WORD)) != 0)
    }

    pub fn is_free(&self, x: usize, rows: Range<usize>) -> bool {
        rows.into_iter().all(|y| !self.is_set(x, y))
    }

    pub fn reserve(&mut self, x: usize, rows: Range<usize>) {
        if rows.is_empty() {
            return;
        }
        if self.columns.len() <= x {
            self.columns.resize_with(x + 1, Vec::new);
        }

        let col = &mut self.columns[x];
        let words = rows.end.div_ceil(WORD);
        if col.len() < words {
            col.resize(words, 0);
        }
        for y in rows {
            col[y / WORD] |= 1u64 << (y % WORD);
        }
    }

    /// First column at or right of `from_x` where every row in `rows` is free
    pub fn find_free_column(&self, from_x: usize, rows: Range<usize>) -> usize {
        // any column past the last reserved one is empty
        let last = self.columns.len().max(from_x);
        (from_x..=last)
            .find(|&x| self.is_free(x, rows.clone()))
            .unwrap_or(last)
    }

    /// Number of columns with at least one reservation slot
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_marks_only_the_range() {
        let mut grid = OccupancyMatrix::new();
        grid.reserve(2, 3..70);

        assert!(!grid.is_set(2, 2));
        assert!(grid.is_set(2, 3));
        assert!(grid.is_set(2, 64));
        assert!(grid.is_set(2, 69));
        assert!(!grid.is_set(2, 70));
        assert!(!grid.is_set(1, 10));
        assert_eq!(grid.width(), 3);
    }

    #[test]
    fn test_find_free_column_skips_overlaps() {
        let mut grid = OccupancyMatrix::new();
        grid.reserve(0, 0..5);
        grid.reserve(1, 2..4);

        assert_eq!(grid.find_free_column(0, 1..3), 2);
        assert_eq!(grid.find_free_column(1, 4..6), 1);
        assert_eq!(grid.find_free_column(0, 5..8), 0);
        assert_eq!(grid.find_free_column(7, 0..1), 7);
    }

    #[test]
    fn test_empty_range_is_always_free() {
        let mut grid = OccupancyMatrix::new();
        grid.reserve(0, 0..3);
        grid.reserve(0, 1..1);

        assert!(grid.is_free(0, 2..2));
        assert_eq!(grid.width(), 1);
    }
}
