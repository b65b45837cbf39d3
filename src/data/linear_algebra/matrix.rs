//! # Sparse matrices
//!
//! A matrix is stored as a list of major vectors (columns for `ColumnMajor`, rows for `RowMajor`),
//! each a sorted list of `(minor index, value)` tuples without explicit zeros. The constraint
//! matrix of a linear program is stored column major; the simplex engine keeps a row major copy
//! for pricing.
use std::fmt::Debug;
use std::marker::PhantomData;

use index_utils::{remove_indices, remove_sparse_indices};
use num_traits::Zero;

use crate::data::linear_algebra::SparseTuple;

/// Orientation of the storage of a sparse matrix.
pub trait Order: Clone + Debug + PartialEq {
    /// The opposite orientation.
    type Transposed: Order<Transposed = Self>;
    /// Whether the major vectors are columns.
    const COLUMN_MAJOR: bool;

    /// Number of major vectors in a matrix of this orientation.
    fn nr_majors(nr_rows: usize, nr_columns: usize) -> usize;
    /// Map a (row, column) coordinate to a (major, minor) coordinate.
    fn major_minor(row: usize, column: usize) -> (usize, usize);
}

/// Columns are stored.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub struct ColumnMajor;

/// Rows are stored.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub struct RowMajor;

impl Order for ColumnMajor {
    type Transposed = RowMajor;
    const COLUMN_MAJOR: bool = true;

    fn nr_majors(_nr_rows: usize, nr_columns: usize) -> usize {
        nr_columns
    }

    fn major_minor(row: usize, column: usize) -> (usize, usize) {
        (column, row)
    }
}

impl Order for RowMajor {
    type Transposed = ColumnMajor;
    const COLUMN_MAJOR: bool = false;

    fn nr_majors(nr_rows: usize, _nr_columns: usize) -> usize {
        nr_rows
    }

    fn major_minor(row: usize, column: usize) -> (usize, usize) {
        (row, column)
    }
}

/// Sparse matrix stored as major ordered sparse vectors.
#[derive(PartialEq, Clone, Debug)]
pub struct Sparse<O> {
    data: Vec<Vec<SparseTuple<f64>>>,
    nr_rows: usize,
    nr_columns: usize,

    phantom_order: PhantomData<O>,
}

/// Constraint matrix as stored by a linear program.
pub type ColumnMatrix = Sparse<ColumnMajor>;
/// Transposed copy used for row-wise access.
pub type RowMatrix = Sparse<RowMajor>;

impl<O: Order> Sparse<O> {
    /// Create a new instance.
    ///
    /// # Arguments
    ///
    /// * `data`: Major vectors, each sorted by minor index and without explicit zeros.
    /// * `nr_rows`: Number of rows of the matrix.
    /// * `nr_columns`: Number of columns of the matrix.
    pub fn new(data: Vec<Vec<SparseTuple<f64>>>, nr_rows: usize, nr_columns: usize) -> Self {
        debug_assert_eq!(data.len(), O::nr_majors(nr_rows, nr_columns));
        debug_assert!(data.iter().all(|major| major.windows(2).all(|w| w[0].0 < w[1].0)));
        debug_assert!(data.iter().all(|major| major.iter().all(|&(_, v)| v != 0_f64)));

        Self {
            data,
            nr_rows,
            nr_columns,

            phantom_order: PhantomData,
        }
    }

    /// Create an empty matrix.
    pub fn zeros(nr_rows: usize, nr_columns: usize) -> Self {
        Self::new(vec![Vec::new(); O::nr_majors(nr_rows, nr_columns)], nr_rows, nr_columns)
    }

    /// Build a matrix from (row, column, value) triplets.
    ///
    /// Duplicate coordinates are summed, zero results are dropped.
    pub fn from_triplets(
        nr_rows: usize,
        nr_columns: usize,
        triplets: &[(usize, usize, f64)],
    ) -> Self {
        let mut data = vec![Vec::new(); O::nr_majors(nr_rows, nr_columns)];
        for &(row, column, value) in triplets {
            debug_assert!(row < nr_rows && column < nr_columns);

            let (major, minor) = O::major_minor(row, column);
            data[major].push((minor, value));
        }

        for major in &mut data {
            major.sort_by_key(|&(i, _)| i);
            let mut merged: Vec<SparseTuple<f64>> = Vec::with_capacity(major.len());
            for &(i, value) in major.iter() {
                match merged.last_mut() {
                    Some((last, total)) if *last == i => *total += value,
                    _ => merged.push((i, value)),
                }
            }
            merged.retain(|&(_, value)| !value.is_zero());
            *major = merged;
        }

        Self::new(data, nr_rows, nr_columns)
    }

    /// Build a matrix from dense rows; convenient for small hand written problems.
    pub fn from_dense_rows(rows: &[Vec<f64>]) -> Self {
        let nr_rows = rows.len();
        let nr_columns = rows.first().map_or(0, Vec::len);
        debug_assert!(rows.iter().all(|row| row.len() == nr_columns));

        let triplets = rows.iter().enumerate()
            .flat_map(|(i, row)| row.iter().enumerate().map(move |(j, &v)| (i, j, v)))
            .filter(|&(_, _, v)| v != 0_f64)
            .collect::<Vec<_>>();

        Self::from_triplets(nr_rows, nr_columns, &triplets)
    }

    /// Number of rows.
    pub fn nr_rows(&self) -> usize {
        self.nr_rows
    }

    /// Number of columns.
    pub fn nr_columns(&self) -> usize {
        self.nr_columns
    }

    /// Number of stored nonzero values.
    pub fn nnz(&self) -> usize {
        self.data.iter().map(Vec::len).sum()
    }

    /// A single major vector (a column for `ColumnMajor`, a row for `RowMajor`).
    pub fn major(&self, index: usize) -> &[SparseTuple<f64>] {
        &self.data[index]
    }

    /// Iterate over the major vectors.
    pub fn iter_majors(&self) -> impl Iterator<Item = &Vec<SparseTuple<f64>>> {
        self.data.iter()
    }

    /// Value at a coordinate.
    pub fn get(&self, row: usize, column: usize) -> f64 {
        debug_assert!(row < self.nr_rows && column < self.nr_columns);

        let (major, minor) = O::major_minor(row, column);
        match self.data[major].binary_search_by_key(&minor, |&(i, _)| i) {
            Ok(index) => self.data[major][index].1,
            Err(_) => 0_f64,
        }
    }

    /// Overwrite the value at a coordinate.
    ///
    /// Setting a value to zero removes it from the storage.
    pub fn set(&mut self, row: usize, column: usize, value: f64) {
        debug_assert!(row < self.nr_rows && column < self.nr_columns);

        let (major, minor) = O::major_minor(row, column);
        let vector = &mut self.data[major];
        match (vector.binary_search_by_key(&minor, |&(i, _)| i), value.is_zero()) {
            (Ok(index), true) => { vector.remove(index); },
            (Ok(index), false) => vector[index].1 = value,
            (Err(_), true) => {},
            (Err(index), false) => vector.insert(index, (minor, value)),
        }
    }

    /// Inner product of a major vector with a dense vector indexed by minor index.
    pub fn major_dot(&self, index: usize, dense: &[f64]) -> f64 {
        self.data[index].iter().map(|&(i, v)| v * dense[i]).sum()
    }

    /// Append major vectors.
    ///
    /// The minor dimension doesn't change.
    pub fn push_majors(&mut self, majors: Vec<Vec<SparseTuple<f64>>>) {
        let nr_new = majors.len();
        debug_assert!(majors.iter().all(|major| major.windows(2).all(|w| w[0].0 < w[1].0)));

        self.data.extend(majors);
        if O::COLUMN_MAJOR {
            self.nr_columns += nr_new;
        } else {
            self.nr_rows += nr_new;
        }
    }

    /// Grow the minor dimension, existing major vectors remain valid.
    pub fn extend_minor(&mut self, extra: usize) {
        if O::COLUMN_MAJOR {
            self.nr_rows += extra;
        } else {
            self.nr_columns += extra;
        }
    }

    /// Remove major vectors.
    ///
    /// # Arguments
    ///
    /// * `indices`: Sorted, unique indices of major vectors to remove.
    pub fn remove_majors(&mut self, indices: &[usize]) {
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));

        remove_indices(&mut self.data, indices);
        if O::COLUMN_MAJOR {
            self.nr_columns -= indices.len();
        } else {
            self.nr_rows -= indices.len();
        }
    }

    /// Remove minor indices from every major vector, shifting the remaining indices.
    ///
    /// # Arguments
    ///
    /// * `indices`: Sorted, unique minor indices to remove.
    pub fn remove_minors(&mut self, indices: &[usize]) {
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));

        for major in &mut self.data {
            remove_sparse_indices(major, indices);
        }
        if O::COLUMN_MAJOR {
            self.nr_rows -= indices.len();
        } else {
            self.nr_columns -= indices.len();
        }
    }

    /// Change the orientation of the storage.
    pub fn transpose(&self) -> Sparse<O::Transposed> {
        let nr_new_majors = O::Transposed::nr_majors(self.nr_rows, self.nr_columns);
        let mut counts = vec![0; nr_new_majors];
        for major in &self.data {
            for &(i, _) in major {
                counts[i] += 1;
            }
        }

        let mut data = counts.into_iter().map(Vec::with_capacity).collect::<Vec<_>>();
        // Majors are visited in increasing order, so the new majors come out sorted
        for (j, major) in self.data.iter().enumerate() {
            for &(i, value) in major {
                data[i].push((j, value));
            }
        }

        Sparse::new(data, self.nr_rows, self.nr_columns)
    }

    /// Dense copy, row by row.
    pub fn to_dense_rows(&self) -> Vec<Vec<f64>> {
        let mut rows = vec![vec![0_f64; self.nr_columns]; self.nr_rows];
        for (major, vector) in self.data.iter().enumerate() {
            for &(minor, value) in vector {
                let (row, column) = if O::COLUMN_MAJOR {
                    (minor, major)
                } else {
                    (major, minor)
                };
                rows[row][column] = value;
            }
        }

        rows
    }
}

impl Sparse<ColumnMajor> {
    /// Column `j` as sorted (row, value) tuples.
    pub fn column(&self, j: usize) -> &[SparseTuple<f64>] {
        self.major(j)
    }

    /// Compute `A x` for a dense `x`.
    pub fn multiply(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.nr_columns);

        let mut result = vec![0_f64; self.nr_rows];
        for (column, &x_j) in self.data.iter().zip(x) {
            if x_j != 0_f64 {
                for &(i, value) in column {
                    result[i] += value * x_j;
                }
            }
        }

        result
    }

    /// Compute `A^T y` for a dense `y`.
    pub fn multiply_transposed(&self, y: &[f64]) -> Vec<f64> {
        debug_assert_eq!(y.len(), self.nr_rows);

        (0..self.nr_columns).map(|j| self.major_dot(j, y)).collect()
    }
}

impl Sparse<RowMajor> {
    /// Row `i` as sorted (column, value) tuples.
    pub fn row(&self, i: usize) -> &[SparseTuple<f64>] {
        self.major(i)
    }
}

#[cfg(test)]
mod test {
    use crate::data::linear_algebra::matrix::{ColumnMatrix, RowMatrix};

    fn matrix() -> ColumnMatrix {
        ColumnMatrix::from_dense_rows(&[
            vec![1_f64, 0_f64, 2_f64],
            vec![0_f64, 3_f64, 0_f64],
        ])
    }

    #[test]
    fn triplets() {
        let m = ColumnMatrix::from_triplets(2, 2, &[(0, 0, 1_f64), (1, 0, 2_f64), (0, 0, 3_f64), (1, 1, 0_f64)]);
        assert_eq!(m.column(0), &[(0, 4_f64), (1, 2_f64)]);
        assert!(m.column(1).is_empty());
        assert_eq!(m.nnz(), 2);
    }

    #[test]
    fn transpose() {
        let m = matrix();
        let t: RowMatrix = m.transpose();
        assert_eq!(t.row(0), &[(0, 1_f64), (2, 2_f64)]);
        assert_eq!(t.row(1), &[(1, 3_f64)]);
        assert_eq!(t.transpose(), m);
        assert_eq!(t.to_dense_rows(), m.to_dense_rows());
    }

    #[test]
    fn get_set() {
        let mut m = matrix();
        assert_eq!(m.get(0, 2), 2_f64);
        m.set(0, 2, 0_f64);
        assert!(m.column(2).is_empty());
        m.set(1, 2, 5_f64);
        m.set(0, 2, 4_f64);
        assert_eq!(m.column(2), &[(0, 4_f64), (1, 5_f64)]);
        m.set(1, 1, -1_f64);
        assert_eq!(m.get(1, 1), -1_f64);
    }

    #[test]
    fn products() {
        let m = matrix();
        assert_eq!(m.multiply(&[1_f64, 1_f64, 1_f64]), vec![3_f64, 3_f64]);
        assert_eq!(m.multiply_transposed(&[1_f64, 2_f64]), vec![1_f64, 6_f64, 2_f64]);
    }

    #[test]
    fn remove() {
        let mut m = matrix();
        m.remove_majors(&[1]);
        assert_eq!(m.nr_columns(), 2);
        assert_eq!(m.column(1), &[(0, 2_f64)]);
        m.remove_minors(&[0]);
        assert_eq!(m.nr_rows(), 1);
        assert!(m.column(0).is_empty());
        assert!(m.column(1).is_empty());

        let mut m = matrix();
        m.remove_minors(&[0]);
        assert_eq!(m.column(1), &[(0, 3_f64)]);
    }

    #[test]
    fn grow() {
        let mut m = matrix();
        m.extend_minor(1);
        m.push_majors(vec![vec![(2, 7_f64)]]);
        assert_eq!(m.nr_rows(), 3);
        assert_eq!(m.nr_columns(), 4);
        assert_eq!(m.get(2, 3), 7_f64);
    }
}
