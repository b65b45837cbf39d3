//! # Basis partition
//!
//! The variables of the simplex engine are the `n` columns followed by one logical variable per
//! row, `n + m` in total. Exactly `m` of them are basic, one for each row of the basis matrix. The
//! others are nonbasic and sit at a bound, described by their move direction.
use crate::data::linear_program::solution::{Basis, BasisStatus};
use crate::error::Error;

/// Direction in which a nonbasic variable can move away from its current value.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Move {
    /// At the lower bound, can increase.
    Up,
    /// At the upper bound, can decrease.
    Down,
    /// Fixed, free at zero or basic.
    Zero,
}

impl Move {
    /// Sign of the direction.
    pub fn sign(self) -> f64 {
        match self {
            Move::Up => 1_f64,
            Move::Down => -1_f64,
            Move::Zero => 0_f64,
        }
    }

    /// Natural position of a nonbasic variable with the given bounds.
    ///
    /// Variables with a finite lower bound start there, otherwise at a finite upper bound, and free
    /// variables at zero.
    pub fn default_for(lower: f64, upper: f64) -> Self {
        if lower == upper {
            Move::Zero
        } else if lower.is_finite() {
            Move::Up
        } else if upper.is_finite() {
            Move::Down
        } else {
            Move::Zero
        }
    }

    /// Value of a nonbasic variable that moves this way.
    pub fn value(self, lower: f64, upper: f64) -> f64 {
        match self {
            Move::Up => lower,
            Move::Down => upper,
            Move::Zero if lower.is_finite() => lower,
            Move::Zero if upper.is_finite() => upper,
            Move::Zero => 0_f64,
        }
    }
}

/// The partition of the variables into basic and nonbasic ones.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SimplexBasis {
    /// Variable that is basic in each row.
    basic_index: Vec<usize>,
    /// For each variable, whether it is nonbasic.
    nonbasic_flag: Vec<bool>,
    /// For each variable, its move direction; `Zero` for basic variables.
    nonbasic_move: Vec<Move>,
    /// Exclusive or of the keys of the basic variables.
    hash: u64,
}

impl SimplexBasis {
    /// The basis in which all logical variables are basic.
    ///
    /// # Arguments
    ///
    /// * `nr_columns`: Number of structural variables.
    /// * `lower`, `upper`: Bounds of all `n + m` variables.
    /// * `keys`: Hash key of each variable.
    pub fn logical(nr_columns: usize, lower: &[f64], upper: &[f64], keys: &[u64]) -> Self {
        let nr_total = lower.len();
        debug_assert!(nr_columns <= nr_total);

        let basic_index = (nr_columns..nr_total).collect::<Vec<_>>();
        let nonbasic_flag = (0..nr_total).map(|j| j < nr_columns).collect();
        let nonbasic_move = (0..nr_total)
            .map(|j| if j < nr_columns { Move::default_for(lower[j], upper[j]) } else { Move::Zero })
            .collect();
        let hash = Self::compute_hash(&basic_index, keys);

        Self { basic_index, nonbasic_flag, nonbasic_move, hash }
    }

    /// Convert a basis given by statuses.
    ///
    /// # Arguments
    ///
    /// * `basis`: Status of each column and row.
    /// * `lower`, `upper`: Bounds of all `n + m` variables.
    /// * `keys`: Hash key of each variable.
    /// * `lenient`: When set, a wrong number of basic variables is repaired by making surplus
    /// structural variables nonbasic or additional logical variables basic. Otherwise, it is an
    /// error.
    pub fn from_statuses(
        basis: &Basis,
        lower: &[f64],
        upper: &[f64],
        keys: &[u64],
        lenient: bool,
    ) -> Result<Self, Error> {
        let nr_columns = basis.col_status.len();
        let nr_rows = basis.row_status.len();
        let nr_total = nr_columns + nr_rows;
        if lower.len() != nr_total {
            return Err(Error::Dimension { what: "basis statuses", expected: lower.len(), actual: nr_total });
        }

        let mut nonbasic_flag = vec![true; nr_total];
        let mut nonbasic_move = vec![Move::Zero; nr_total];
        for (j, &status) in basis.col_status.iter().chain(&basis.row_status).enumerate() {
            let is_logical = j >= nr_columns;
            let (l, u) = (lower[j], upper[j]);
            // For rows, the logical variable is minus the row activity
            let at_lower = match (status, is_logical) {
                (BasisStatus::Basic, _) => {
                    nonbasic_flag[j] = false;
                    continue;
                },
                (BasisStatus::Lower, false) | (BasisStatus::Upper, true) => Some(true),
                (BasisStatus::Upper, false) | (BasisStatus::Lower, true) => Some(false),
                (BasisStatus::Zero, _) => None,
            };
            nonbasic_move[j] = match at_lower {
                _ if l == u => Move::Zero,
                Some(true) if l.is_finite() => Move::Up,
                Some(false) if u.is_finite() => Move::Down,
                None if !l.is_finite() && !u.is_finite() => Move::Zero,
                _ => Move::default_for(l, u),
            };
        }

        let mut basic_index = (0..nr_total).filter(|&j| !nonbasic_flag[j]).collect::<Vec<_>>();
        if basic_index.len() != nr_rows {
            if !lenient {
                return Err(Error::InvalidBasis(format!(
                    "{} basic variables for {} rows", basic_index.len(), nr_rows,
                )));
            }

            // Surplus structurals with the highest indices become nonbasic
            while basic_index.len() > nr_rows {
                let position = basic_index.iter().rposition(|&j| j < nr_columns)
                    .unwrap_or(basic_index.len() - 1);
                let j = basic_index.remove(position);
                nonbasic_flag[j] = true;
                nonbasic_move[j] = Move::default_for(lower[j], upper[j]);
            }
            // Missing rows get their logical
            let mut row = 0;
            while basic_index.len() < nr_rows {
                let j = nr_columns + row;
                if nonbasic_flag[j] {
                    nonbasic_flag[j] = false;
                    nonbasic_move[j] = Move::Zero;
                    basic_index.push(j);
                }
                row += 1;
            }
        }

        let hash = Self::compute_hash(&basic_index, keys);
        Ok(Self { basic_index, nonbasic_flag, nonbasic_move, hash })
    }

    /// Describe the basis by statuses.
    ///
    /// # Arguments
    ///
    /// * `nr_columns`: Number of structural variables.
    /// * `lower`, `upper`: Bounds of all `n + m` variables, used to describe fixed variables.
    pub fn to_statuses(&self, nr_columns: usize, lower: &[f64], upper: &[f64]) -> Basis {
        let status = |j: usize| {
            let is_logical = j >= nr_columns;
            match (self.nonbasic_flag[j], self.nonbasic_move[j], is_logical) {
                (false, _, _) => BasisStatus::Basic,
                (true, Move::Up, false) | (true, Move::Down, true) => BasisStatus::Lower,
                (true, Move::Down, false) | (true, Move::Up, true) => BasisStatus::Upper,
                (true, Move::Zero, _) => {
                    if lower[j].is_finite() || upper[j].is_finite() {
                        BasisStatus::Lower
                    } else {
                        BasisStatus::Zero
                    }
                },
            }
        };

        Basis {
            col_status: (0..nr_columns).map(status).collect(),
            row_status: (nr_columns..self.nr_total()).map(status).collect(),
        }
    }

    fn compute_hash(basic_index: &[usize], keys: &[u64]) -> u64 {
        basic_index.iter().fold(0, |hash, &j| hash ^ keys[j])
    }

    /// Number of rows.
    pub fn nr_rows(&self) -> usize {
        self.basic_index.len()
    }

    /// Number of variables.
    pub fn nr_total(&self) -> usize {
        self.nonbasic_flag.len()
    }

    /// The basic variable of each row.
    pub fn basic_index(&self) -> &[usize] {
        &self.basic_index
    }

    /// Whether a variable is basic.
    pub fn is_basic(&self, variable: usize) -> bool {
        !self.nonbasic_flag[variable]
    }

    /// Move direction of a variable.
    pub fn nonbasic_move(&self, variable: usize) -> Move {
        self.nonbasic_move[variable]
    }

    /// Set the move direction of a nonbasic variable, for example after a bound flip.
    pub fn set_nonbasic_move(&mut self, variable: usize, direction: Move) {
        debug_assert!(self.nonbasic_flag[variable]);

        self.nonbasic_move[variable] = direction;
    }

    /// Hash of the set of basic variables.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Hash the basis would have after a basis change.
    pub fn hash_after_change(&self, variable_in: usize, row_out: usize, keys: &[u64]) -> u64 {
        self.hash ^ keys[variable_in] ^ keys[self.basic_index[row_out]]
    }

    /// Exchange a basic variable for a nonbasic one.
    ///
    /// # Arguments
    ///
    /// * `variable_in`: Nonbasic variable that becomes basic.
    /// * `row_out`: Row of the basic variable that becomes nonbasic.
    /// * `move_out`: Move direction of the leaving variable.
    /// * `keys`: Hash key of each variable.
    ///
    /// # Return value
    ///
    /// The leaving variable.
    pub fn change(&mut self, variable_in: usize, row_out: usize, move_out: Move, keys: &[u64]) -> usize {
        debug_assert!(self.nonbasic_flag[variable_in]);

        let variable_out = self.basic_index[row_out];
        self.hash ^= keys[variable_in] ^ keys[variable_out];
        self.basic_index[row_out] = variable_in;
        self.nonbasic_flag[variable_in] = false;
        self.nonbasic_move[variable_in] = Move::Zero;
        self.nonbasic_flag[variable_out] = true;
        self.nonbasic_move[variable_out] = move_out;

        variable_out
    }

    /// Append variables: new nonbasic columns and new rows with basic logicals.
    ///
    /// Variable indices of existing logicals shift by the number of new columns.
    ///
    /// # Arguments
    ///
    /// * `nr_columns`: Number of structural variables before the change.
    /// * `new_column_moves`: Move direction of each new column.
    /// * `nr_new_rows`: Number of new rows.
    /// * `keys`: Hash keys for the new total number of variables.
    pub fn extend(
        &mut self,
        nr_columns: usize,
        new_column_moves: &[Move],
        nr_new_rows: usize,
        keys: &[u64],
    ) {
        let nr_new_columns = new_column_moves.len();
        let nr_old_rows = self.nr_rows();

        for j in &mut self.basic_index {
            if *j >= nr_columns {
                *j += nr_new_columns;
            }
        }
        let logical_flags = self.nonbasic_flag.split_off(nr_columns);
        let logical_moves = self.nonbasic_move.split_off(nr_columns);
        self.nonbasic_flag.extend(itertools::repeat_n(true, nr_new_columns));
        self.nonbasic_move.extend_from_slice(new_column_moves);
        self.nonbasic_flag.extend(logical_flags);
        self.nonbasic_move.extend(logical_moves);

        let first_new_logical = nr_columns + nr_new_columns + nr_old_rows;
        for k in 0..nr_new_rows {
            self.basic_index.push(first_new_logical + k);
            self.nonbasic_flag.push(false);
            self.nonbasic_move.push(Move::Zero);
        }

        self.hash = Self::compute_hash(&self.basic_index, keys);
        debug_assert!(self.is_consistent());
    }

    /// Remove variables; the basic count is repaired afterwards.
    ///
    /// # Arguments
    ///
    /// * `nr_columns`: Number of structural variables before the change.
    /// * `columns`: Sorted structural variables to remove.
    /// * `rows`: Sorted rows to remove; their logicals are removed as well.
    /// * `lower`, `upper`: Bounds of the variables after the change.
    /// * `keys`: Hash keys for the new total number of variables.
    pub fn remove(
        &mut self,
        nr_columns: usize,
        columns: &[usize],
        rows: &[usize],
        lower: &[f64],
        upper: &[f64],
        keys: &[u64],
    ) {
        let removed = columns.iter().copied()
            .chain(rows.iter().map(|&i| nr_columns + i))
            .collect::<Vec<_>>();
        // Map from old to new variable index
        let mut new_index = Vec::with_capacity(self.nr_total());
        let mut shift = 0;
        for j in 0..self.nr_total() {
            if removed.binary_search(&j).is_ok() {
                shift += 1;
                new_index.push(None);
            } else {
                new_index.push(Some(j - shift));
            }
        }

        index_utils::remove_indices(&mut self.nonbasic_flag, &removed);
        index_utils::remove_indices(&mut self.nonbasic_move, &removed);

        let nr_columns = nr_columns - columns.len();
        let nr_rows = self.nr_rows() - rows.len();
        let mut basic_index = self.basic_index.iter()
            .filter_map(|&j| new_index[j])
            .collect::<Vec<_>>();

        // Repair the number of basic variables
        while basic_index.len() > nr_rows {
            let position = basic_index.iter().rposition(|&j| j < nr_columns)
                .unwrap_or(basic_index.len() - 1);
            let j = basic_index.remove(position);
            self.nonbasic_flag[j] = true;
            self.nonbasic_move[j] = Move::default_for(lower[j], upper[j]);
        }
        let mut row = 0;
        while basic_index.len() < nr_rows {
            let j = nr_columns + row;
            if self.nonbasic_flag[j] {
                self.nonbasic_flag[j] = false;
                self.nonbasic_move[j] = Move::Zero;
                basic_index.push(j);
            }
            row += 1;
        }

        self.basic_index = basic_index;
        self.hash = Self::compute_hash(&self.basic_index, keys);
        debug_assert!(self.is_consistent());
    }

    /// Replace the basic variables of some rows by the logicals of other rows.
    ///
    /// Used to repair a singular basis matrix.
    ///
    /// # Arguments
    ///
    /// * `replacements`: (basis row, logical variable) pairs; the logicals must be nonbasic.
    /// * `lower`, `upper`: Bounds of all variables.
    /// * `keys`: Hash key of each variable.
    ///
    /// # Return value
    ///
    /// The variables that became nonbasic.
    pub fn replace(
        &mut self,
        replacements: &[(usize, usize)],
        lower: &[f64],
        upper: &[f64],
        keys: &[u64],
    ) -> Vec<usize> {
        replacements.iter()
            .map(|&(row, logical)| {
                let variable_out = self.basic_index[row];
                let move_out = Move::default_for(lower[variable_out], upper[variable_out]);
                self.change(logical, row, move_out, keys)
            })
            .collect()
    }

    /// Whether exactly one variable is basic in every row and the flags agree.
    pub fn is_consistent(&self) -> bool {
        let mut seen = vec![false; self.nr_total()];
        for &j in &self.basic_index {
            if j >= self.nr_total() || seen[j] || self.nonbasic_flag[j] {
                return false;
            }
            seen[j] = true;
        }

        let nr_basic = self.nonbasic_flag.iter().filter(|&&flag| !flag).count();
        nr_basic == self.basic_index.len()
    }
}

#[cfg(test)]
mod test {
    use crate::algorithm::simplex::basis::{Move, SimplexBasis};
    use crate::data::linear_program::solution::{Basis, BasisStatus};
    use crate::error::Error;

    const KEYS: [u64; 6] = [3, 5, 17, 257, 1 << 20, 1 << 40];

    fn bounds() -> (Vec<f64>, Vec<f64>) {
        // Two columns, two rows: a boxed column, a free column, a <= row and an equality row
        (
            vec![0_f64, f64::NEG_INFINITY, -4_f64, 1_f64],
            vec![2_f64, f64::INFINITY, f64::INFINITY, 1_f64],
        )
    }

    #[test]
    fn logical() {
        let (lower, upper) = bounds();
        let basis = SimplexBasis::logical(2, &lower, &upper, &KEYS);
        assert_eq!(basis.basic_index(), &[2, 3]);
        assert_eq!(basis.nonbasic_move(0), Move::Up);
        assert_eq!(basis.nonbasic_move(1), Move::Zero);
        assert_eq!(basis.hash(), 17 ^ 257);
        assert!(basis.is_consistent());
    }

    #[test]
    fn change_and_hash() {
        let (lower, upper) = bounds();
        let mut basis = SimplexBasis::logical(2, &lower, &upper, &KEYS);
        let expected = basis.hash_after_change(0, 1, &KEYS);
        let out = basis.change(0, 1, Move::Down, &KEYS);
        assert_eq!(out, 3);
        assert_eq!(basis.hash(), expected);
        assert_eq!(basis.basic_index(), &[2, 0]);
        assert!(basis.is_basic(0));
        assert_eq!(basis.nonbasic_move(3), Move::Down);
        assert!(basis.is_consistent());
    }

    #[test]
    fn statuses() {
        let (lower, upper) = bounds();
        let given = Basis {
            col_status: vec![BasisStatus::Upper, BasisStatus::Basic],
            row_status: vec![BasisStatus::Basic, BasisStatus::Lower],
        };
        let basis = SimplexBasis::from_statuses(&given, &lower, &upper, &KEYS, false).unwrap();
        assert_eq!(basis.basic_index(), &[1, 2]);
        assert_eq!(basis.nonbasic_move(0), Move::Down);
        // Fixed logical
        assert_eq!(basis.nonbasic_move(3), Move::Zero);
        assert_eq!(basis.to_statuses(2, &lower, &upper), given);
    }

    #[test]
    fn wrong_count() {
        let (lower, upper) = bounds();
        let given = Basis {
            col_status: vec![BasisStatus::Basic, BasisStatus::Basic],
            row_status: vec![BasisStatus::Basic, BasisStatus::Lower],
        };
        let result = SimplexBasis::from_statuses(&given, &lower, &upper, &KEYS, false);
        assert!(matches!(result, Err(Error::InvalidBasis(_))));

        let basis = SimplexBasis::from_statuses(&given, &lower, &upper, &KEYS, true).unwrap();
        assert_eq!(basis.basic_index(), &[0, 2]);
        assert!(basis.is_consistent());

        let given = Basis {
            col_status: vec![BasisStatus::Lower, BasisStatus::Zero],
            row_status: vec![BasisStatus::Lower, BasisStatus::Lower],
        };
        let basis = SimplexBasis::from_statuses(&given, &lower, &upper, &KEYS, true).unwrap();
        assert_eq!(basis.basic_index(), &[2, 3]);
    }

    #[test]
    fn extend_and_remove() {
        let (lower, upper) = bounds();
        let mut basis = SimplexBasis::logical(2, &lower, &upper, &KEYS);
        basis.change(0, 0, Move::Up, &KEYS);

        // One new column and one new row
        let keys = [1, 2, 4, 8, 16, 32];
        basis.extend(2, &[Move::Up], 1, &keys);
        assert_eq!(basis.nr_total(), 6);
        assert_eq!(basis.basic_index(), &[0, 4, 5]);
        assert!(!basis.is_basic(2));
        assert!(!basis.is_basic(3));
        assert!(basis.is_consistent());

        // Remove the first column and the second row
        let lower = [f64::NEG_INFINITY, 0_f64, -4_f64, 0_f64];
        let upper = [f64::INFINITY, 1_f64, f64::INFINITY, 0_f64];
        basis.remove(3, &[0], &[1], &lower, &upper, &[1, 2, 4, 8]);
        assert_eq!(basis.nr_total(), 4);
        assert_eq!(basis.nr_rows(), 2);
        assert!(basis.is_consistent());
        // The logical of the first row fills in for the removed column
        assert_eq!(basis.basic_index(), &[3, 2]);
    }
}
