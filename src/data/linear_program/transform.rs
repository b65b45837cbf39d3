//! # Transformations of linear programs
//!
//! Before solving, a linear program may be replaced by its dual or have its columns reordered.
//! Both transformations produce a new, owned program and leave the original untouched. They keep
//! the information needed to map solutions and bases back to the original program.
use cumsum::cumsum_array_owned;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::linear_algebra::matrix::ColumnMatrix;
use crate::data::linear_algebra::SparseTuple;
use crate::data::linear_program::elements::{BoundKind, Objective};
use crate::data::linear_program::LinearProgram;
use crate::data::linear_program::solution::{Basis, BasisStatus, Solution};

/// Complete a solution from column values and row duals using the data of the program.
///
/// Row activities, reduced costs and the objective value are recomputed, so they are consistent
/// with the program as given.
pub fn complete_solution(
    program: &LinearProgram,
    col_value: Vec<f64>,
    row_dual: Vec<f64>,
) -> Solution {
    let row_value = program.matrix().multiply(&col_value);
    let col_dual = program.matrix().multiply_transposed(&row_dual).into_iter()
        .zip(program.col_cost())
        .map(|(aty, c)| c - aty)
        .collect();
    let objective_value = program.objective_value(&col_value);

    Solution { col_value, row_value, col_dual, row_dual, objective_value }
}

/// The dual of a linear program, written as a minimization problem in bounded form.
///
/// With `c'` the costs of the primal written as a minimization problem, the dual has one row per
/// primal column, bounded by `c'_j` on the side(s) given by the primal column bounds. It has one
/// column per primal row that is not free, sign restricted by the bounds of that row, and an extra
/// column for every primal row or column with two different finite bounds. Primal columns are
/// shifted by a finite bound `b_j` (zero for free columns), which moves a term into the dual costs
/// and offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dualized {
    dual: LinearProgram,

    /// The factor that made the primal costs costs to minimize.
    sense: f64,
    /// Shift `b_j` of each primal column.
    shift: Vec<f64>,
    /// Dual column holding the multiplier of each primal row, if that row isn't free.
    row_column: Vec<Option<usize>>,
    /// Extra dual column for a primal row with two bounds, carrying its upper bound.
    row_extra: Vec<Option<usize>>,
    /// Extra dual column for a primal column with two bounds, carrying its upper bound.
    column_extra: Vec<Option<usize>>,
}

impl Dualized {
    /// Build the dual of a linear program.
    pub fn new(primal: &LinearProgram) -> Self {
        let nr_columns = primal.nr_columns();
        let nr_rows = primal.nr_rows();
        let sense = primal.objective().sense();
        let cost = primal.col_cost().iter().map(|c| sense * c).collect::<Vec<_>>();

        let row_kinds = (0..nr_rows).map(|i| primal.row_bound_kind(i)).collect::<Vec<_>>();
        let column_kinds = (0..nr_columns).map(|j| primal.column_bound_kind(j)).collect::<Vec<_>>();

        let nr_row_columns = row_kinds.iter().filter(|&&kind| kind != BoundKind::Free).count();
        let nr_row_extras = row_kinds.iter().filter(|&&kind| kind == BoundKind::Boxed).count();
        let nr_column_extras = column_kinds.iter().filter(|&&kind| kind == BoundKind::Boxed).count();
        let group_end = cumsum_array_owned([nr_row_columns, nr_row_extras, nr_column_extras]);
        let nr_dual_columns = group_end[2];

        let shift = column_kinds.iter().enumerate()
            .map(|(j, kind)| match kind {
                BoundKind::Free => 0_f64,
                BoundKind::Upper => primal.col_upper()[j],
                BoundKind::Lower | BoundKind::Boxed | BoundKind::Fixed => primal.col_lower()[j],
            })
            .collect::<Vec<_>>();

        // Dual columns with the value `h` they carry in the dual objective (maximization form)
        let mut columns = vec![Vec::new(); nr_dual_columns];
        let mut lower = vec![0_f64; nr_dual_columns];
        let mut upper = vec![f64::INFINITY; nr_dual_columns];
        let mut carried = vec![0_f64; nr_dual_columns];

        let rows = primal.matrix().transpose();
        let mut row_column = vec![None; nr_rows];
        let mut row_extra = vec![None; nr_rows];
        let mut next_row_column = 0;
        let mut next_row_extra = group_end[0];
        for (i, &kind) in row_kinds.iter().enumerate() {
            let (row_lower, row_upper) = (primal.row_lower()[i], primal.row_upper()[i]);
            let (bounds, value) = match kind {
                BoundKind::Free => continue,
                BoundKind::Lower | BoundKind::Boxed => ((0_f64, f64::INFINITY), row_lower),
                BoundKind::Upper => ((f64::NEG_INFINITY, 0_f64), row_upper),
                BoundKind::Fixed => ((f64::NEG_INFINITY, f64::INFINITY), row_lower),
            };
            let k = next_row_column;
            next_row_column += 1;
            columns[k] = rows.row(i).to_vec();
            (lower[k], upper[k]) = bounds;
            carried[k] = value;
            row_column[i] = Some(k);

            if kind == BoundKind::Boxed {
                let k = next_row_extra;
                next_row_extra += 1;
                columns[k] = rows.row(i).iter().map(|&(j, v)| (j, -v)).collect();
                carried[k] = -row_upper;
                row_extra[i] = Some(k);
            }
        }

        let mut column_extra = vec![None; nr_columns];
        let mut next_column_extra = group_end[1];
        let mut dual_row_lower = vec![f64::NEG_INFINITY; nr_columns];
        let mut dual_row_upper = vec![f64::INFINITY; nr_columns];
        for (j, &kind) in column_kinds.iter().enumerate() {
            match kind {
                BoundKind::Lower => dual_row_upper[j] = cost[j],
                BoundKind::Upper => dual_row_lower[j] = cost[j],
                BoundKind::Free => {
                    dual_row_lower[j] = cost[j];
                    dual_row_upper[j] = cost[j];
                },
                BoundKind::Fixed => {},
                BoundKind::Boxed => {
                    dual_row_upper[j] = cost[j];
                    let k = next_column_extra;
                    next_column_extra += 1;
                    columns[k] = vec![(j, -1_f64)];
                    carried[k] = -primal.col_upper()[j];
                    column_extra[j] = Some(k);
                },
            }
        }
        debug_assert_eq!(next_row_column, group_end[0]);
        debug_assert_eq!(next_row_extra, group_end[1]);
        debug_assert_eq!(next_column_extra, group_end[2]);

        let dual_cost = columns.iter().zip(&carried)
            .map(|(column, h)| -h + column.iter().map(|&(j, g)| shift[j] * g).sum::<f64>())
            .collect();
        let offset = -shift.iter().zip(&cost).map(|(b, c)| b * c).sum::<f64>();

        let dual = LinearProgram::from_valid_parts(
            Objective::Minimize,
            offset,
            dual_cost,
            lower,
            upper,
            dual_row_lower,
            dual_row_upper,
            ColumnMatrix::new(columns, nr_columns, nr_dual_columns),
            Vec::new(),
        );

        Self { dual, sense, shift, row_column, row_extra, column_extra }
    }

    /// The dual program.
    pub fn program(&self) -> &LinearProgram {
        &self.dual
    }

    /// Map an optimal solution of the dual program to a solution of the primal program.
    ///
    /// # Arguments
    ///
    /// * `dual_solution`: Solution of the program returned by `program`.
    /// * `primal`: The program this instance was created from.
    pub fn undualize(&self, dual_solution: &Solution, primal: &LinearProgram) -> Solution {
        debug_assert_eq!(dual_solution.row_dual.len(), primal.nr_columns());

        let col_value = self.shift.iter().zip(&dual_solution.row_dual)
            .map(|(b, pi)| b - pi)
            .collect();
        let row_dual = self.row_column.iter().zip(&self.row_extra)
            .map(|(column, extra)| {
                let value = column.map_or(0_f64, |k| dual_solution.col_value[k])
                    - extra.map_or(0_f64, |k| dual_solution.col_value[k]);
                self.sense * value
            })
            .collect();

        complete_solution(primal, col_value, row_dual)
    }

    /// Primal basis complementary to a basis of the dual program.
    ///
    /// A primal column is basic when its dual row is active; a primal row is basic when none of
    /// its dual columns are. The number of basic variables need not equal the number of primal
    /// rows when the dual basis is degenerate.
    pub fn primal_basis_hint(&self, dual_basis: &Basis, primal: &LinearProgram) -> Basis {
        let is_basic = |k: Option<usize>| k.is_some_and(|k| dual_basis.col_status[k] == BasisStatus::Basic);

        let col_status = (0..primal.nr_columns())
            .map(|j| {
                let extra_basic = is_basic(self.column_extra[j]);
                if dual_basis.row_status[j] != BasisStatus::Basic && !extra_basic {
                    BasisStatus::Basic
                } else {
                    match primal.column_bound_kind(j) {
                        BoundKind::Free => BasisStatus::Zero,
                        BoundKind::Upper => BasisStatus::Upper,
                        BoundKind::Boxed if extra_basic => BasisStatus::Upper,
                        _ => BasisStatus::Lower,
                    }
                }
            })
            .collect();

        let row_status = (0..primal.nr_rows())
            .map(|i| {
                let column_basic = is_basic(self.row_column[i]);
                let extra_basic = is_basic(self.row_extra[i]);
                match primal.row_bound_kind(i) {
                    _ if !column_basic && !extra_basic => BasisStatus::Basic,
                    BoundKind::Upper => BasisStatus::Upper,
                    BoundKind::Boxed if extra_basic => BasisStatus::Upper,
                    _ => BasisStatus::Lower,
                }
            })
            .collect();

        Basis { col_status, row_status }
    }
}

/// A linear program with its columns reordered.
///
/// Column `k` of the permuted program is column `permutation[k]` of the original.
#[derive(Debug, Clone, PartialEq)]
pub struct Permuted {
    permuted: LinearProgram,
    permutation: Vec<usize>,
}

impl Permuted {
    /// Reorder the columns of a program randomly.
    ///
    /// # Arguments
    ///
    /// * `original`: Program to permute.
    /// * `seed`: Seed of the random generator; the same seed gives the same permutation.
    pub fn new(original: &LinearProgram, seed: u64) -> Self {
        let mut permutation = (0..original.nr_columns()).collect::<Vec<_>>();
        permutation.shuffle(&mut StdRng::seed_from_u64(seed));

        Self::with_permutation(original, permutation)
    }

    /// Reorder the columns of a program with a given permutation.
    pub fn with_permutation(original: &LinearProgram, permutation: Vec<usize>) -> Self {
        debug_assert_eq!(permutation.len(), original.nr_columns());

        let pick = |values: &[f64]| permutation.iter().map(|&j| values[j]).collect::<Vec<_>>();
        let columns = permutation.iter()
            .map(|&j| original.matrix().column(j).to_vec())
            .collect::<Vec<Vec<SparseTuple<f64>>>>();
        let integrality = if original.integrality().is_empty() {
            Vec::new()
        } else {
            permutation.iter().map(|&j| original.integrality()[j]).collect()
        };

        let permuted = LinearProgram::from_valid_parts(
            original.objective(),
            original.offset(),
            pick(original.col_cost()),
            pick(original.col_lower()),
            pick(original.col_upper()),
            original.row_lower().to_vec(),
            original.row_upper().to_vec(),
            ColumnMatrix::new(columns, original.nr_rows(), original.nr_columns()),
            integrality,
        );

        Self { permuted, permutation }
    }

    /// The permuted program.
    pub fn program(&self) -> &LinearProgram {
        &self.permuted
    }

    /// The permutation: original column index of each permuted column.
    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    /// Map values of the permuted columns to the original order.
    pub fn unpermute_column_vector<T: Copy + Default>(&self, values: &[T]) -> Vec<T> {
        debug_assert_eq!(values.len(), self.permutation.len());

        let mut original = vec![T::default(); values.len()];
        for (&j, &value) in self.permutation.iter().zip(values) {
            original[j] = value;
        }
        original
    }

    /// Map values of the original columns to the permuted order.
    pub fn permute_column_vector<T: Copy>(&self, values: &[T]) -> Vec<T> {
        debug_assert_eq!(values.len(), self.permutation.len());

        self.permutation.iter().map(|&j| values[j]).collect()
    }

    /// Map a solution of the permuted program to the original program.
    pub fn unpermute_solution(&self, solution: Solution) -> Solution {
        Solution {
            col_value: self.unpermute_column_vector(&solution.col_value),
            col_dual: self.unpermute_column_vector(&solution.col_dual),
            ..solution
        }
    }

    /// Map a basis of the original program to the permuted program.
    pub fn permute_basis(&self, basis: &Basis) -> Basis {
        Basis {
            col_status: self.permute_column_vector(&basis.col_status),
            row_status: basis.row_status.clone(),
        }
    }

    /// Map a basis of the permuted program to the original program.
    pub fn unpermute_basis(&self, basis: Basis) -> Basis {
        let mut col_status = vec![BasisStatus::Lower; basis.col_status.len()];
        for (&j, &status) in self.permutation.iter().zip(&basis.col_status) {
            col_status[j] = status;
        }

        Basis { col_status, ..basis }
    }
}
