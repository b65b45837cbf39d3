//! # Representing linear programs
//!
//! A linear program is stored in the bounded form
//!
//! ```text
//! min / max  c^T x + offset
//! s.t.       row_lower <= A x <= row_upper
//!            col_lower <=   x <= col_upper
//! ```
//!
//! with possibly infinite bounds. The data is validated when the program is created and before
//! every modification, so that a `LinearProgram` is always well formed.
use crate::data::linear_algebra::matrix::ColumnMatrix;
use crate::data::linear_algebra::SparseTuple;
use crate::data::linear_program::elements::{BoundKind, Objective, VariableType};
use crate::error::{check_bounds, check_finite, check_index, check_len, Error};

pub mod elements;
pub mod solution;
pub mod transform;

/// A linear program in bounded form.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearProgram {
    objective: Objective,
    offset: f64,

    col_cost: Vec<f64>,
    col_lower: Vec<f64>,
    col_upper: Vec<f64>,
    row_lower: Vec<f64>,
    row_upper: Vec<f64>,

    /// Constraint matrix, `row_lower.len()` rows and `col_cost.len()` columns.
    matrix: ColumnMatrix,
    /// Either empty or one entry per column.
    integrality: Vec<VariableType>,
}

impl LinearProgram {
    /// Create a new instance.
    ///
    /// # Arguments
    ///
    /// * `objective`: Direction of optimization.
    /// * `col_cost`: Cost of each column, finite.
    /// * `col_lower`, `col_upper`: Bounds of each column, possibly infinite.
    /// * `row_lower`, `row_upper`: Bounds of each row activity, possibly infinite.
    /// * `matrix`: Constraint matrix.
    ///
    /// # Return value
    ///
    /// The linear program, or an error describing which of the arrays is malformed.
    pub fn new(
        objective: Objective,
        col_cost: Vec<f64>,
        col_lower: Vec<f64>,
        col_upper: Vec<f64>,
        row_lower: Vec<f64>,
        row_upper: Vec<f64>,
        matrix: ColumnMatrix,
    ) -> Result<Self, Error> {
        let program = Self {
            objective,
            offset: 0_f64,
            col_cost,
            col_lower,
            col_upper,
            row_lower,
            row_upper,
            matrix,
            integrality: Vec::new(),
        };
        program.validate()?;

        Ok(program)
    }

    /// Assemble a program from parts that are known to be well formed.
    ///
    /// Used for programs derived from a validated program, such as its dual.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_valid_parts(
        objective: Objective,
        offset: f64,
        col_cost: Vec<f64>,
        col_lower: Vec<f64>,
        col_upper: Vec<f64>,
        row_lower: Vec<f64>,
        row_upper: Vec<f64>,
        matrix: ColumnMatrix,
        integrality: Vec<VariableType>,
    ) -> Self {
        let program = Self {
            objective,
            offset,
            col_cost,
            col_lower,
            col_upper,
            row_lower,
            row_upper,
            matrix,
            integrality,
        };
        debug_assert!(program.validate().is_ok());

        program
    }

    /// Set a constant term of the objective function.
    #[must_use]
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// Tag columns as integer or continuous.
    pub fn with_integrality(mut self, integrality: Vec<VariableType>) -> Result<Self, Error> {
        check_len("integrality", &integrality, self.nr_columns())?;

        self.integrality = integrality;
        Ok(self)
    }

    /// Check that all arrays agree in length and contain usable values.
    pub fn validate(&self) -> Result<(), Error> {
        let nr_columns = self.matrix.nr_columns();
        let nr_rows = self.matrix.nr_rows();

        check_len("col_cost", &self.col_cost, nr_columns)?;
        check_len("col_lower", &self.col_lower, nr_columns)?;
        check_len("col_upper", &self.col_upper, nr_columns)?;
        check_len("row_lower", &self.row_lower, nr_rows)?;
        check_len("row_upper", &self.row_upper, nr_rows)?;
        if !self.integrality.is_empty() {
            check_len("integrality", &self.integrality, nr_columns)?;
        }

        check_finite("col_cost", &self.col_cost)?;
        check_bounds("column bounds", &self.col_lower, &self.col_upper)?;
        check_bounds("row bounds", &self.row_lower, &self.row_upper)?;
        if !self.offset.is_finite() {
            return Err(Error::InvalidValue { what: "offset", index: 0 });
        }
        for (j, column) in self.matrix.iter_majors().enumerate() {
            if column.iter().any(|&(i, v)| i >= nr_rows || !v.is_finite()) {
                return Err(Error::InvalidValue { what: "matrix column", index: j });
            }
        }

        Ok(())
    }

    /// Direction of optimization.
    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Constant term of the objective function.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Number of columns (variables).
    pub fn nr_columns(&self) -> usize {
        self.col_cost.len()
    }

    /// Number of rows (constraints).
    pub fn nr_rows(&self) -> usize {
        self.row_lower.len()
    }

    /// Costs of the columns.
    pub fn col_cost(&self) -> &[f64] {
        &self.col_cost
    }

    /// Lower bounds of the columns.
    pub fn col_lower(&self) -> &[f64] {
        &self.col_lower
    }

    /// Upper bounds of the columns.
    pub fn col_upper(&self) -> &[f64] {
        &self.col_upper
    }

    /// Lower bounds of the rows.
    pub fn row_lower(&self) -> &[f64] {
        &self.row_lower
    }

    /// Upper bounds of the rows.
    pub fn row_upper(&self) -> &[f64] {
        &self.row_upper
    }

    /// Constraint matrix.
    pub fn matrix(&self) -> &ColumnMatrix {
        &self.matrix
    }

    /// Integrality tags, empty if none were given.
    pub fn integrality(&self) -> &[VariableType] {
        &self.integrality
    }

    /// Which bounds of a column are finite.
    pub fn column_bound_kind(&self, j: usize) -> BoundKind {
        BoundKind::of(self.col_lower[j], self.col_upper[j])
    }

    /// Which bounds of a row are finite.
    pub fn row_bound_kind(&self, i: usize) -> BoundKind {
        BoundKind::of(self.row_lower[i], self.row_upper[i])
    }

    /// Objective function value of column values, including the offset.
    pub fn objective_value(&self, col_value: &[f64]) -> f64 {
        debug_assert_eq!(col_value.len(), self.nr_columns());

        self.offset + self.col_cost.iter().zip(col_value).map(|(c, x)| c * x).sum::<f64>()
    }

    /// Add columns.
    ///
    /// # Arguments
    ///
    /// * `cost`, `lower`, `upper`: Data of the new columns.
    /// * `columns`: For each new column, the (row, value) pairs. Need not be sorted.
    pub fn add_columns(
        &mut self,
        cost: &[f64],
        lower: &[f64],
        upper: &[f64],
        columns: Vec<Vec<SparseTuple<f64>>>,
    ) -> Result<(), Error> {
        let nr_new = cost.len();
        check_len("new column lower bounds", lower, nr_new)?;
        check_len("new column upper bounds", upper, nr_new)?;
        check_len("new columns", &columns, nr_new)?;
        check_finite("new column costs", cost)?;
        check_bounds("new column bounds", lower, upper)?;
        let columns = columns.into_iter()
            .map(|column| normalize_sparse("new column", column, self.nr_rows()))
            .collect::<Result<Vec<_>, _>>()?;

        self.col_cost.extend_from_slice(cost);
        self.col_lower.extend_from_slice(lower);
        self.col_upper.extend_from_slice(upper);
        self.matrix.push_majors(columns);
        if !self.integrality.is_empty() {
            self.integrality.extend(itertools::repeat_n(VariableType::Continuous, nr_new));
        }

        Ok(())
    }

    /// Add rows.
    ///
    /// # Arguments
    ///
    /// * `lower`, `upper`: Bounds of the new rows.
    /// * `rows`: For each new row, the (column, value) pairs. Need not be sorted.
    pub fn add_rows(
        &mut self,
        lower: &[f64],
        upper: &[f64],
        rows: Vec<Vec<SparseTuple<f64>>>,
    ) -> Result<(), Error> {
        let nr_new = lower.len();
        check_len("new row upper bounds", upper, nr_new)?;
        check_len("new rows", &rows, nr_new)?;
        check_bounds("new row bounds", lower, upper)?;
        let rows = rows.into_iter()
            .map(|row| normalize_sparse("new row", row, self.nr_columns()))
            .collect::<Result<Vec<_>, _>>()?;

        let first_new = self.nr_rows();
        self.row_lower.extend_from_slice(lower);
        self.row_upper.extend_from_slice(upper);
        self.matrix.extend_minor(nr_new);
        for (k, row) in rows.into_iter().enumerate() {
            for (j, value) in row {
                // New rows have the highest indices, so this appends to each column
                self.matrix.set(first_new + k, j, value);
            }
        }

        Ok(())
    }

    /// Delete columns.
    ///
    /// # Return value
    ///
    /// The deleted indices, sorted and without duplicates.
    pub fn delete_columns(&mut self, indices: &[usize]) -> Result<Vec<usize>, Error> {
        let indices = normalize_indices("column", indices, self.nr_columns())?;

        index_utils::remove_indices(&mut self.col_cost, &indices);
        index_utils::remove_indices(&mut self.col_lower, &indices);
        index_utils::remove_indices(&mut self.col_upper, &indices);
        if !self.integrality.is_empty() {
            index_utils::remove_indices(&mut self.integrality, &indices);
        }
        self.matrix.remove_majors(&indices);

        Ok(indices)
    }

    /// Delete rows.
    ///
    /// # Return value
    ///
    /// The deleted indices, sorted and without duplicates.
    pub fn delete_rows(&mut self, indices: &[usize]) -> Result<Vec<usize>, Error> {
        let indices = normalize_indices("row", indices, self.nr_rows())?;

        index_utils::remove_indices(&mut self.row_lower, &indices);
        index_utils::remove_indices(&mut self.row_upper, &indices);
        self.matrix.remove_minors(&indices);

        Ok(indices)
    }

    /// Change the cost of a column.
    pub fn change_cost(&mut self, column: usize, cost: f64) -> Result<(), Error> {
        check_index("column", column, self.nr_columns())?;
        check_finite("cost", &[cost])?;

        self.col_cost[column] = cost;
        Ok(())
    }

    /// Change the bounds of a column.
    pub fn change_column_bounds(&mut self, column: usize, lower: f64, upper: f64) -> Result<(), Error> {
        check_index("column", column, self.nr_columns())?;
        check_bounds("column bounds", &[lower], &[upper])?;

        self.col_lower[column] = lower;
        self.col_upper[column] = upper;
        Ok(())
    }

    /// Change the bounds of a row.
    pub fn change_row_bounds(&mut self, row: usize, lower: f64, upper: f64) -> Result<(), Error> {
        check_index("row", row, self.nr_rows())?;
        check_bounds("row bounds", &[lower], &[upper])?;

        self.row_lower[row] = lower;
        self.row_upper[row] = upper;
        Ok(())
    }

    /// Change a single coefficient of the constraint matrix; a zero value removes it.
    pub fn change_coefficient(&mut self, row: usize, column: usize, value: f64) -> Result<(), Error> {
        check_index("row", row, self.nr_rows())?;
        check_index("column", column, self.nr_columns())?;
        check_finite("coefficient", &[value])?;

        self.matrix.set(row, column, value);
        Ok(())
    }
}

/// Sort, merge and check a sparse vector given by a caller.
fn normalize_sparse(
    what: &'static str,
    mut values: Vec<SparseTuple<f64>>,
    len: usize,
) -> Result<Vec<SparseTuple<f64>>, Error> {
    for &(i, value) in &values {
        check_index(what, i, len)?;
        check_finite(what, &[value])?;
    }

    values.sort_unstable_by_key(|&(i, _)| i);
    let mut merged: Vec<SparseTuple<f64>> = Vec::with_capacity(values.len());
    for (i, value) in values {
        match merged.last_mut() {
            Some((last, total)) if *last == i => *total += value,
            _ => merged.push((i, value)),
        }
    }
    merged.retain(|&(_, value)| value != 0_f64);

    Ok(merged)
}

/// Sort, deduplicate and check a set of indices given by a caller.
fn normalize_indices(what: &'static str, indices: &[usize], len: usize) -> Result<Vec<usize>, Error> {
    for &index in indices {
        check_index(what, index, len)?;
    }

    let mut indices = indices.to_vec();
    indices.sort_unstable();
    indices.dedup();

    Ok(indices)
}

#[cfg(test)]
mod test {
    use crate::data::linear_algebra::matrix::ColumnMatrix;
    use crate::data::linear_program::elements::Objective;
    use crate::data::linear_program::LinearProgram;
    use crate::error::Error;

    fn lp() -> LinearProgram {
        LinearProgram::new(
            Objective::Minimize,
            vec![1_f64, 2_f64],
            vec![0_f64, 0_f64],
            vec![f64::INFINITY, 4_f64],
            vec![1_f64],
            vec![f64::INFINITY],
            ColumnMatrix::from_dense_rows(&[vec![1_f64, 1_f64]]),
        ).unwrap()
    }

    #[test]
    fn malformed() {
        let result = LinearProgram::new(
            Objective::Minimize,
            vec![1_f64],
            vec![0_f64, 0_f64],
            vec![1_f64],
            vec![],
            vec![],
            ColumnMatrix::zeros(0, 1),
        );
        assert_eq!(result, Err(Error::Dimension { what: "col_lower", expected: 1, actual: 2 }));

        let result = LinearProgram::new(
            Objective::Minimize,
            vec![f64::INFINITY],
            vec![0_f64],
            vec![1_f64],
            vec![],
            vec![],
            ColumnMatrix::zeros(0, 1),
        );
        assert!(matches!(result, Err(Error::InvalidValue { what: "col_cost", index: 0 })));
    }

    #[test]
    fn add_and_delete_columns() {
        let mut lp = lp();
        lp.add_columns(&[3_f64], &[0_f64], &[1_f64], vec![vec![(0, 2_f64), (0, 1_f64)]]).unwrap();
        assert_eq!(lp.nr_columns(), 3);
        assert_eq!(lp.matrix().column(2), &[(0, 3_f64)]);

        // Rejected without modification
        assert!(lp.add_columns(&[3_f64], &[0_f64], &[1_f64], vec![vec![(5, 1_f64)]]).is_err());
        assert_eq!(lp.nr_columns(), 3);

        assert_eq!(lp.delete_columns(&[1, 0, 1]), Ok(vec![0, 1]));
        assert_eq!(lp.col_cost(), &[3_f64]);
        assert_eq!(lp.matrix().nr_columns(), 1);
        assert!(lp.validate().is_ok());
    }

    #[test]
    fn add_and_delete_rows() {
        let mut lp = lp();
        lp.add_rows(&[f64::NEG_INFINITY], &[5_f64], vec![vec![(1, -1_f64)]]).unwrap();
        assert_eq!(lp.nr_rows(), 2);
        assert_eq!(lp.matrix().get(1, 1), -1_f64);
        assert_eq!(lp.matrix().column(1), &[(0, 1_f64), (1, -1_f64)]);

        lp.delete_rows(&[0]).unwrap();
        assert_eq!(lp.nr_rows(), 1);
        assert_eq!(lp.row_upper(), &[5_f64]);
        assert!(lp.matrix().column(0).is_empty());
        assert!(lp.validate().is_ok());

        assert_eq!(lp.delete_rows(&[3]), Err(Error::IndexOutOfRange { what: "row", index: 3, len: 1 }));
    }

    #[test]
    fn changes() {
        let mut lp = lp();
        lp.change_cost(1, -1_f64).unwrap();
        lp.change_column_bounds(0, -1_f64, 1_f64).unwrap();
        lp.change_row_bounds(0, f64::NEG_INFINITY, 2_f64).unwrap();
        lp.change_coefficient(0, 0, 0_f64).unwrap();
        assert_eq!(lp.col_cost(), &[1_f64, -1_f64]);
        assert_eq!(lp.col_lower(), &[-1_f64, 0_f64]);
        assert_eq!(lp.row_lower(), &[f64::NEG_INFINITY]);
        assert_eq!(lp.matrix().nnz(), 1);
        assert!(lp.change_cost(0, f64::NAN).is_err());
        assert_eq!(lp.objective_value(&[1_f64, 2_f64]), -1_f64);
    }
}
