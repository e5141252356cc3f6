//! Dense N×N grid container for per-regime-pair quantities
//!
//! The mixture smoother manipulates several N×N collections (pairwise
//! transforms, pairwise smoothed Gaussians, pairwise cross-covariances)
//! where N is the number of regimes, fixed at construction. A flat
//! row-major `Vec` indexed by `(j, k)` keeps these dense and allocation-free
//! during the backward pass.

/// Dense N×N grid indexed by an ordered regime pair `(j, k)`
///
/// Convention throughout the crate: `j` indexes the predecessor regime at
/// time t, `k` the successor regime at time t+1.
#[derive(Debug, Clone)]
pub struct Grid<T> {
    n: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Build a grid by evaluating `f(j, k)` for every ordered pair
    pub fn from_fn(n: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut cells = Vec::with_capacity(n * n);
        for j in 0..n {
            for k in 0..n {
                cells.push(f(j, k));
            }
        }
        Self { n, cells }
    }

    /// Number of regimes (the grid is `n x n`)
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Reference to the cell at `(j, k)`
    #[inline]
    pub fn get(&self, j: usize, k: usize) -> &T {
        &self.cells[j * self.n + k]
    }

    /// Mutable reference to the cell at `(j, k)`
    #[inline]
    pub fn get_mut(&mut self, j: usize, k: usize) -> &mut T {
        &mut self.cells[j * self.n + k]
    }

    /// Iterate over row `j` (successor regime varies)
    pub fn row(&self, j: usize) -> impl Iterator<Item = &T> {
        self.cells[j * self.n..(j + 1) * self.n].iter()
    }

    /// Iterate over column `k` (predecessor regime varies)
    pub fn column(&self, k: usize) -> impl Iterator<Item = &T> {
        (0..self.n).map(move |j| self.get(j, k))
    }

    /// Iterate over all cells with their `(j, k)` indices, row-major
    pub fn iter_indexed(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, v)| (i / self.n, i % self.n, v))
    }
}

impl<T: Clone> Grid<T> {
    /// Fill an entire grid with copies of one value
    pub fn from_element(n: usize, value: T) -> Self {
        Self {
            n,
            cells: vec![value; n * n],
        }
    }

    /// Clone out row `j` as a `Vec`
    pub fn row_vec(&self, j: usize) -> Vec<T> {
        self.row(j).cloned().collect()
    }

    /// Clone out column `k` as a `Vec`
    pub fn column_vec(&self, k: usize) -> Vec<T> {
        self.column(k).cloned().collect()
    }
}
