//! # LU decomposition
//!
//! Decompose the basis matrix `B` into `PBQ = LU`. The row permutation `P` and the permutation of
//! the basis positions `Q` are given by the order in which the elimination pivots; the triangular
//! factors are stored in the index space of those pivot steps.
use std::collections::BTreeMap;
use std::mem;

use fifo_set::FIFOSet;

use crate::data::linear_algebra::{SparseTuple, TINY};
use crate::data::linear_algebra::vector::WorkVector;
use crate::algorithm::simplex::factor::permutation::FullPermutation;

/// The basis matrix could not be decomposed completely.
///
/// The positions and rows are those that were not pivoted on, in increasing order. There are as
/// many of each.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RankDeficiency {
    /// Basis positions without a pivot.
    pub positions: Vec<usize>,
    /// Rows without a pivot.
    pub rows: Vec<usize>,
}

impl RankDeficiency {
    /// Number of missing pivots.
    pub fn rank_deficiency(&self) -> usize {
        self.positions.len()
    }
}

/// Triangular factors of a basis matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct LUDecomposition {
    /// Step at which each row was pivoted, `P`.
    rows: FullPermutation,
    /// Step at which each basis position was pivoted, `Q`.
    positions: FullPermutation,
    /// Lower triangular `L` with an implicit unit diagonal, by column: for each step, the later
    /// steps with their multipliers.
    lower_columns: Vec<Vec<SparseTuple<f64>>>,
    /// Lower triangular `L` by row: for each step, the earlier steps with their multipliers.
    lower_rows: Vec<Vec<SparseTuple<f64>>>,
    upper_diagonal: Vec<f64>,
    /// Strictly upper triangular part of `U` by column: for each step, the earlier steps.
    upper_columns: Vec<Vec<SparseTuple<f64>>>,
    /// Strictly upper triangular part of `U` by row: for each step, the later steps.
    upper_rows: Vec<Vec<SparseTuple<f64>>>,
}

impl LUDecomposition {
    /// Decomposition of the identity matrix.
    pub fn identity(m: usize) -> Self {
        Self {
            rows: FullPermutation::identity(m),
            positions: FullPermutation::identity(m),
            lower_columns: vec![Vec::new(); m],
            lower_rows: vec![Vec::new(); m],
            upper_diagonal: vec![1_f64; m],
            upper_columns: vec![Vec::new(); m],
            upper_rows: vec![Vec::new(); m],
        }
    }

    /// Compute the factorization `PBQ = LU`.
    ///
    /// Column singletons are pivoted first, then row singletons that are large enough, and the
    /// remaining pivots are chosen by Markowitz's rule, minimizing `(r_i - 1)(c_j - 1)` among the
    /// entries that are at least `threshold` times the largest entry in their column.
    ///
    /// # Arguments
    ///
    /// * `columns`: The column of each basis position, with row indices.
    /// * `threshold`: Relative pivot threshold in `(0, 1]`.
    /// * `tolerance`: Entries at most this large are never pivots.
    ///
    /// # Return value
    ///
    /// The decomposition, or the positions and rows left without pivot when no acceptable pivot
    /// remains.
    pub fn decompose(
        columns: &[Vec<SparseTuple<f64>>],
        threshold: f64,
        tolerance: f64,
    ) -> Result<Self, RankDeficiency> {
        let m = columns.len();

        // Active submatrix, row-wise. Entries that cancel are kept as explicit zeros.
        let mut rows = vec![Vec::new(); m];
        let mut column_rows = vec![Vec::new(); m];
        for (position, column) in columns.iter().enumerate() {
            for &(row, value) in column {
                if value != 0_f64 {
                    rows[row].push((position, value));
                    column_rows[position].push(row);
                }
            }
        }
        let mut column_count = column_rows.iter().map(Vec::len).collect::<Vec<_>>();
        let mut row_active = vec![true; m];
        let mut position_active = vec![true; m];

        let mut column_singletons = (0..m)
            .filter(|&position| column_count[position] == 1)
            .collect::<FIFOSet<_>>();
        let mut row_singletons = (0..m)
            .filter(|&row| rows[row].len() == 1)
            .collect::<FIFOSet<_>>();

        let mut row_order = Vec::with_capacity(m);
        let mut position_order = Vec::with_capacity(m);
        let mut upper_diagonal = Vec::with_capacity(m);
        // (step, row, multiplier)
        let mut lower = Vec::new();
        // (step, position, value)
        let mut upper = Vec::new();
        // Index of each position in the row being updated
        let mut marker = vec![usize::MAX; m];

        for k in 0..m {
            let chosen = {
                let active = ActiveSubmatrix { rows: &rows, column_rows: &column_rows, row_active: &row_active };
                active.column_singleton(&mut column_singletons, &column_count, &position_active, tolerance)
                    .or_else(|| active.row_singleton(&mut row_singletons, threshold, tolerance))
                    .or_else(|| active.markowitz(&column_count, &position_active, threshold, tolerance))
            };
            let Some((pivot_row, pivot_position, pivot_value)) = chosen else {
                break;
            };

            row_order.push(pivot_row);
            position_order.push(pivot_position);
            upper_diagonal.push(pivot_value);
            row_active[pivot_row] = false;
            position_active[pivot_position] = false;

            // The rest of the pivot row becomes a row of `U`
            let pivot_row_values = mem::take(&mut rows[pivot_row]).into_iter()
                .filter(|&(position, _)| position != pivot_position)
                .collect::<Vec<_>>();
            for &(position, value) in &pivot_row_values {
                column_count[position] -= 1;
                if column_count[position] == 1 {
                    column_singletons.push(position);
                }
                if value != 0_f64 {
                    upper.push((k, position, value));
                }
            }

            // Eliminate the pivot column from the other active rows
            let other_rows = column_rows[pivot_position].iter()
                .copied()
                .filter(|&row| row_active[row])
                .collect::<Vec<_>>();
            for row in other_rows {
                let Some(index) = rows[row].iter().position(|&(position, _)| position == pivot_position) else {
                    continue;
                };
                let (_, value) = rows[row].swap_remove(index);
                if value == 0_f64 {
                    continue;
                }

                let multiplier = value / pivot_value;
                lower.push((k, row, multiplier));

                for (index, &(position, _)) in rows[row].iter().enumerate() {
                    marker[position] = index;
                }
                for &(position, value) in &pivot_row_values {
                    if value == 0_f64 {
                        continue;
                    }
                    match marker[position] {
                        usize::MAX => {
                            rows[row].push((position, -multiplier * value));
                            column_rows[position].push(row);
                            column_count[position] += 1;
                        },
                        index => {
                            let new_value = rows[row][index].1 - multiplier * value;
                            rows[row][index].1 = if new_value.abs() < TINY { 0_f64 } else { new_value };
                        },
                    }
                }
                for &(position, _) in &rows[row] {
                    marker[position] = usize::MAX;
                }

                if rows[row].len() == 1 {
                    row_singletons.push(row);
                }
            }
            column_count[pivot_position] = 0;
        }

        if row_order.len() < m {
            return Err(RankDeficiency {
                positions: (0..m).filter(|&position| position_active[position]).collect(),
                rows: (0..m).filter(|&row| row_active[row]).collect(),
            });
        }

        let rows = FullPermutation::from_order(row_order);
        let positions = FullPermutation::from_order(position_order);

        let mut lower_columns = vec![Vec::new(); m];
        let mut lower_rows = vec![Vec::new(); m];
        for (step, row, multiplier) in lower {
            let row_step = rows.step(row);
            lower_columns[step].push((row_step, multiplier));
            lower_rows[row_step].push((step, multiplier));
        }
        let mut upper_columns = vec![Vec::new(); m];
        let mut upper_rows = vec![Vec::new(); m];
        for (step, position, value) in upper {
            let column_step = positions.step(position);
            upper_rows[step].push((column_step, value));
            upper_columns[column_step].push((step, value));
        }

        Ok(Self { rows, positions, lower_columns, lower_rows, upper_diagonal, upper_columns, upper_rows })
    }

    /// Dimension of the decomposed matrix.
    pub fn m(&self) -> usize {
        self.upper_diagonal.len()
    }

    /// Number of stored nonzeros in both factors, including the diagonal.
    pub fn nnz(&self) -> usize {
        self.m()
            + self.lower_columns.iter().map(Vec::len).sum::<usize>()
            + self.upper_columns.iter().map(Vec::len).sum::<usize>()
    }

    /// Solve `B x = rhs` in place.
    ///
    /// The right-hand side is indexed by row, the result by basis position.
    ///
    /// # Arguments
    ///
    /// * `rhs`: Right-hand side, overwritten with the solution.
    /// * `hyper_sparse`: Whether to traverse only the steps that become nonzero. Both traversals
    /// perform the same floating point operations in the same order.
    pub fn solve_right(&self, rhs: &mut WorkVector, hyper_sparse: bool) {
        debug_assert_eq!(rhs.len(), self.m());

        let initial = rhs.iter().map(|(row, value)| (self.rows.step(row), value));
        let result = if hyper_sparse {
            let lower = sweep_forward_sparse(initial.collect(), |step, value| {
                self.lower_columns[step].iter().map(move |&(later, l)| (later, l * value))
            }, |_, value| value);
            sweep_backward_sparse(lower.into_iter().collect(), |step, value| {
                self.upper_columns[step].iter().map(move |&(earlier, u)| (earlier, u * value))
            }, |step, value| value / self.upper_diagonal[step])
        } else {
            let mut work = vec![0_f64; self.m()];
            for (step, value) in initial {
                work[step] = value;
            }
            for step in 0..self.m() {
                let value = work[step];
                if value != 0_f64 {
                    for &(later, l) in &self.lower_columns[step] {
                        work[later] -= l * value;
                    }
                }
            }
            for step in (0..self.m()).rev() {
                if work[step] != 0_f64 {
                    let value = work[step] / self.upper_diagonal[step];
                    work[step] = value;
                    for &(earlier, u) in &self.upper_columns[step] {
                        work[earlier] -= u * value;
                    }
                }
            }
            collect_nonzero(work)
        };

        rhs.clear();
        for (step, value) in result {
            rhs.set(self.positions.index(step), value);
        }
    }

    /// Solve `B^T y = rhs` in place.
    ///
    /// The right-hand side is indexed by basis position, the result by row.
    ///
    /// # Arguments
    ///
    /// * `rhs`: Right-hand side, overwritten with the solution.
    /// * `hyper_sparse`: Whether to traverse only the steps that become nonzero. Both traversals
    /// perform the same floating point operations in the same order.
    pub fn solve_left(&self, rhs: &mut WorkVector, hyper_sparse: bool) {
        debug_assert_eq!(rhs.len(), self.m());

        let initial = rhs.iter().map(|(position, value)| (self.positions.step(position), value));
        let result = if hyper_sparse {
            let upper = sweep_forward_sparse(initial.collect(), |step, value| {
                self.upper_rows[step].iter().map(move |&(later, u)| (later, u * value))
            }, |step, value| value / self.upper_diagonal[step]);
            sweep_backward_sparse(upper.into_iter().collect(), |step, value| {
                self.lower_rows[step].iter().map(move |&(earlier, l)| (earlier, l * value))
            }, |_, value| value)
        } else {
            let mut work = vec![0_f64; self.m()];
            for (step, value) in initial {
                work[step] = value;
            }
            for step in 0..self.m() {
                if work[step] != 0_f64 {
                    let value = work[step] / self.upper_diagonal[step];
                    work[step] = value;
                    for &(later, u) in &self.upper_rows[step] {
                        work[later] -= u * value;
                    }
                }
            }
            for step in (0..self.m()).rev() {
                let value = work[step];
                if value != 0_f64 {
                    for &(earlier, l) in &self.lower_rows[step] {
                        work[earlier] -= l * value;
                    }
                }
            }
            collect_nonzero(work)
        };

        rhs.clear();
        for (step, value) in result {
            rhs.set(self.rows.index(step), value);
        }
    }
}

/// Read-only view on the part of the matrix that is still to be decomposed.
struct ActiveSubmatrix<'a> {
    rows: &'a [Vec<SparseTuple<f64>>],
    column_rows: &'a [Vec<usize>],
    row_active: &'a [bool],
}

impl ActiveSubmatrix<'_> {
    /// Active entries of a column.
    fn column(&self, position: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.column_rows[position].iter()
            .filter(move |&&row| self.row_active[row])
            .filter_map(move |&row| {
                self.rows[row].iter()
                    .find(|&&(other, _)| other == position)
                    .map(|&(_, value)| (row, value))
            })
    }

    fn column_max(&self, position: usize) -> f64 {
        self.column(position).map(|(_, value)| value.abs()).fold(0_f64, f64::max)
    }

    fn column_singleton(
        &self,
        queue: &mut FIFOSet<usize>,
        column_count: &[usize],
        position_active: &[bool],
        tolerance: f64,
    ) -> Option<(usize, usize, f64)> {
        while let Some(position) = queue.pop() {
            if !position_active[position] || column_count[position] != 1 {
                continue;
            }
            if let Some((row, value)) = self.column(position).find(|&(_, value)| value.abs() > tolerance) {
                return Some((row, position, value));
            }
        }

        None
    }

    fn row_singleton(
        &self,
        queue: &mut FIFOSet<usize>,
        threshold: f64,
        tolerance: f64,
    ) -> Option<(usize, usize, f64)> {
        while let Some(row) = queue.pop() {
            if !self.row_active[row] || self.rows[row].len() != 1 {
                continue;
            }
            let (position, value) = self.rows[row][0];
            if value.abs() > tolerance && value.abs() >= threshold * self.column_max(position) {
                return Some((row, position, value));
            }
        }

        None
    }

    fn markowitz(
        &self,
        column_count: &[usize],
        position_active: &[bool],
        threshold: f64,
        tolerance: f64,
    ) -> Option<(usize, usize, f64)> {
        // TODO(PERFORMANCE): Search only the columns with the smallest counts.
        let mut best: Option<(usize, f64, (usize, usize, f64))> = None;
        for position in (0..column_count.len()).filter(|&position| position_active[position]) {
            if column_count[position] == 0 {
                continue;
            }
            let max = self.column_max(position);
            if max <= tolerance {
                continue;
            }

            for (row, value) in self.column(position) {
                if value.abs() <= tolerance || value.abs() < threshold * max {
                    continue;
                }
                let cost = (self.rows[row].len() - 1) * (column_count[position] - 1);
                let better = match best {
                    None => true,
                    Some((best_cost, best_size, _)) => {
                        cost < best_cost || (cost == best_cost && value.abs() > best_size)
                    },
                };
                if better {
                    best = Some((cost, value.abs(), (row, position, value)));
                }
            }
        }

        best.map(|(_, _, pivot)| pivot)
    }
}

/// Process steps in increasing order, visiting only those that are nonzero.
///
/// # Arguments
///
/// * `rhs`: Values by step.
/// * `scatter`: Changes to later steps caused by the final value of a step, to be subtracted.
/// * `finalize`: Final value of a step given its accumulated value.
fn sweep_forward_sparse<I>(
    mut rhs: BTreeMap<usize, f64>,
    scatter: impl Fn(usize, f64) -> I,
    finalize: impl Fn(usize, f64) -> f64,
) -> Vec<SparseTuple<f64>>
where
    I: Iterator<Item = SparseTuple<f64>>,
{
    let mut result = Vec::with_capacity(rhs.len());
    while let Some((step, value)) = rhs.pop_first() {
        if value != 0_f64 {
            let value = finalize(step, value);
            for (later, change) in scatter(step, value) {
                *rhs.entry(later).or_insert(0_f64) -= change;
            }
            result.push((step, value));
        }
    }

    result
}

/// Process steps in decreasing order, visiting only those that are nonzero.
///
/// See `sweep_forward_sparse`.
fn sweep_backward_sparse<I>(
    mut rhs: BTreeMap<usize, f64>,
    scatter: impl Fn(usize, f64) -> I,
    finalize: impl Fn(usize, f64) -> f64,
) -> Vec<SparseTuple<f64>>
where
    I: Iterator<Item = SparseTuple<f64>>,
{
    let mut result = Vec::with_capacity(rhs.len());
    while let Some((step, value)) = rhs.pop_last() {
        if value != 0_f64 {
            let value = finalize(step, value);
            for (earlier, change) in scatter(step, value) {
                *rhs.entry(earlier).or_insert(0_f64) -= change;
            }
            result.push((step, value));
        }
    }

    result
}

fn collect_nonzero(work: Vec<f64>) -> Vec<SparseTuple<f64>> {
    work.into_iter()
        .enumerate()
        .filter(|&(_, value)| value != 0_f64)
        .collect()
}
