//! # Algorithms
//!
//! The `Solver` connects a linear program to the simplex engine. It solves the program directly,
//! through its dual or with permuted columns, and keeps the engine state between solves such that
//! a modified program is solved again starting from the last basis.
use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use log::{debug, info, warn};

use crate::algorithm::simplex::options::{DualizeStrategy, Options};
use crate::algorithm::simplex::state::State;
use crate::algorithm::simplex::status::Statistics;
use crate::data::linear_algebra::SparseTuple;
use crate::data::linear_program::LinearProgram;
use crate::data::linear_program::solution::{Basis, BasisStatus, Solution};
use crate::data::linear_program::transform::{Dualized, Permuted};
use crate::error::{check_index, check_len, Error};

pub mod simplex;

pub use simplex::status::ModelStatus;

/// Solves a linear program and keeps what is needed to solve it again after modifications.
///
/// The program is borrowed until it is modified through one of the methods of this type.
#[derive(Debug)]
pub struct Solver<'a> {
    program: Cow<'a, LinearProgram>,
    options: Options,
    /// Engine state of the last direct solve, kept in sync with the program.
    state: Option<State>,
    /// The last basis, in terms of the program.
    basis: Option<Basis>,

    status: ModelStatus,
    solution: Option<Solution>,
    statistics: Statistics,
    /// Rays found while solving a transformed program, in terms of the program.
    primal_ray: Option<Vec<f64>>,
    dual_ray: Option<Vec<f64>>,

    interrupt: Arc<AtomicBool>,
}

impl<'a> Solver<'a> {
    /// Create a solver with the default options.
    pub fn new(program: &'a LinearProgram) -> Self {
        Self::with_options(program, Options::default())
    }

    /// Create a solver.
    pub fn with_options(program: &'a LinearProgram, options: Options) -> Self {
        Self::from_cow(Cow::Borrowed(program), options)
    }

    /// Create a solver that owns its program.
    pub fn owned(program: LinearProgram, options: Options) -> Solver<'static> {
        Solver::from_cow(Cow::Owned(program), options)
    }

    fn from_cow(program: Cow<'a, LinearProgram>, options: Options) -> Self {
        Self {
            program,
            options,
            state: None,
            basis: None,

            status: ModelStatus::NotSet,
            solution: None,
            statistics: Statistics::default(),
            primal_ray: None,
            dual_ray: None,

            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The program, including all modifications.
    pub fn program(&self) -> &LinearProgram {
        &self.program
    }

    /// The options used by the next solve.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Replace the options used by the next solve.
    pub fn set_options(&mut self, options: Options) {
        self.options = options;
    }

    /// Flag that, when set from another thread, stops the solve at the next iteration.
    ///
    /// The flag is not reset by the solver.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    /// Solve the program, starting from the last basis if there is one.
    ///
    /// # Errors
    ///
    /// Only when the program is malformed. Infeasibility and the like are reported through the
    /// returned status.
    pub fn solve(&mut self) -> Result<ModelStatus, Error> {
        self.program.validate()?;
        self.clear_outcome();

        let nr_columns = self.program.nr_columns();
        let nr_rows = self.program.nr_rows();
        let dualize = match self.options.dualize {
            DualizeStrategy::Off => false,
            DualizeStrategy::On => true,
            DualizeStrategy::Choose => nr_rows as f64 > self.options.dualize_ratio * nr_columns as f64,
        };
        info!(
            "Solving a program with {} columns, {} rows and {} nonzeros{}",
            nr_columns, nr_rows, self.program.matrix().nnz(),
            if dualize { " through its dual" } else if self.options.permute { " with permuted columns" } else { "" },
        );

        self.status = if dualize {
            self.solve_dualized()
        } else if self.options.permute {
            self.solve_permuted()
        } else {
            self.solve_direct()
        };

        Ok(self.status)
    }

    fn solve_direct(&mut self) -> ModelStatus {
        let options = self.options.clone();
        let state = self.ensure_state();
        state.begin_solve(options);
        let status = simplex::solve(state);

        let statistics = state.statistics().clone();
        let solution = state.solution();
        let basis = state.basis_statuses();
        self.statistics = statistics;
        self.solution = Some(solution);
        self.basis = Some(basis);

        status
    }

    /// Solve the dual program, then clean up with the primal program from the complementary
    /// basis.
    fn solve_dualized(&mut self) -> ModelStatus {
        let dualized = Dualized::new(&self.program);
        let mut state = State::new(dualized.program(), self.options.clone(), Arc::clone(&self.interrupt));
        state.begin_solve(self.options.clone());
        let status = simplex::solve(&mut state);
        let dual_iterations = state.statistics().iterations;
        debug!("Dual program solved with status \"{}\" in {} iterations", status, dual_iterations);

        match status {
            ModelStatus::Optimal => {
                let undualized = dualized.undualize(&state.solution(), &self.program);
                self.state = None;
                self.basis = Some(dualized.primal_basis_hint(&state.basis_statuses(), &self.program));

                let status = self.solve_direct();
                self.statistics.iterations += dual_iterations;
                match (status, &self.solution) {
                    (ModelStatus::Optimal, Some(solution)) => {
                        debug!(
                            "Primal cleanup differs from the dual solution by at most {:.3e}",
                            solution.max_primal_difference(&undualized),
                        );
                        ModelStatus::Optimal
                    },
                    _ => {
                        warn!("Primal cleanup ended with status \"{}\", using the dual solution", status);
                        self.solution = Some(undualized);
                        ModelStatus::Optimal
                    },
                }
            },
            ModelStatus::Infeasible => {
                self.statistics = state.statistics().clone();
                self.state = None;
                ModelStatus::UnboundedOrInfeasible
            },
            _ => {
                debug!("Falling back to solving the program directly");
                self.state = None;
                let status = self.solve_direct();
                self.statistics.iterations += dual_iterations;
                status
            },
        }
    }

    fn solve_permuted(&mut self) -> ModelStatus {
        let permuted = Permuted::new(&self.program, self.options.random_seed);
        let mut state = State::new(permuted.program(), self.options.clone(), Arc::clone(&self.interrupt));
        if let Some(basis) = &self.basis {
            if let Err(error) = state.set_basis(&permuted.permute_basis(basis), true) {
                warn!("Ignoring the previous basis: {}", error);
            }
        }
        state.begin_solve(self.options.clone());
        let status = simplex::solve(&mut state);

        match status {
            ModelStatus::Unbounded => {
                self.primal_ray = state.materialize_primal_ray()
                    .map(|ray| permuted.unpermute_column_vector(&ray));
            },
            ModelStatus::Infeasible => self.dual_ray = state.materialize_dual_ray(),
            _ => {},
        }
        self.statistics = state.statistics().clone();
        self.solution = Some(permuted.unpermute_solution(state.solution()));
        self.basis = Some(permuted.unpermute_basis(state.basis_statuses()));
        self.state = None;

        status
    }

    /// Status of the last solve.
    pub fn status(&self) -> ModelStatus {
        self.status
    }

    /// Solution of the last solve.
    ///
    /// Only optimal when the status is `ModelStatus::Optimal`; after a limit it describes the
    /// basis at which the solve stopped.
    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    /// Basis of the last solve, or the basis that was set.
    pub fn basis(&self) -> Option<&Basis> {
        self.basis.as_ref()
    }

    /// Start the next solve from a given basis.
    ///
    /// # Errors
    ///
    /// When the dimensions don't match or the number of basic variables isn't the number of rows.
    pub fn set_basis(&mut self, basis: Basis) -> Result<(), Error> {
        check_len("column statuses", &basis.col_status, self.program.nr_columns())?;
        check_len("row statuses", &basis.row_status, self.program.nr_rows())?;

        self.ensure_state().set_basis(&basis, false)?;
        self.basis = Some(basis);
        self.clear_outcome();

        Ok(())
    }

    /// Number of simplex iterations of the last solve.
    pub fn iteration_count(&self) -> usize {
        self.statistics.iterations
    }

    /// Counters of the last solve.
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Direction proving unboundedness, over the columns.
    ///
    /// Only available when the last solve ended with `ModelStatus::Unbounded`.
    pub fn primal_ray(&mut self) -> Option<Vec<f64>> {
        if self.status != ModelStatus::Unbounded {
            return None;
        }
        match &self.primal_ray {
            Some(ray) => Some(ray.clone()),
            None => self.state.as_mut()?.materialize_primal_ray(),
        }
    }

    /// Row multipliers proving infeasibility.
    ///
    /// Only available when the last solve ended with `ModelStatus::Infeasible` because of a bound
    /// violation that no combination of columns can repair.
    pub fn dual_ray(&mut self) -> Option<Vec<f64>> {
        if self.status != ModelStatus::Infeasible {
            return None;
        }
        match &self.dual_ray {
            Some(ray) => Some(ray.clone()),
            None => self.state.as_mut()?.materialize_dual_ray(),
        }
    }

    /// Add columns; they start nonbasic at a bound.
    pub fn add_columns(
        &mut self,
        cost: &[f64],
        lower: &[f64],
        upper: &[f64],
        columns: Vec<Vec<SparseTuple<f64>>>,
    ) -> Result<(), Error> {
        self.program.to_mut().add_columns(cost, lower, upper, columns)?;
        if let Some(state) = &mut self.state {
            state.extend(&self.program);
        }
        self.after_dimension_change();

        Ok(())
    }

    /// Add rows; their logical variables start basic.
    pub fn add_rows(&mut self, lower: &[f64], upper: &[f64], rows: Vec<Vec<SparseTuple<f64>>>) -> Result<(), Error> {
        self.program.to_mut().add_rows(lower, upper, rows)?;
        if let Some(state) = &mut self.state {
            state.extend(&self.program);
        }
        self.after_dimension_change();

        Ok(())
    }

    /// Delete columns.
    ///
    /// Deleted basic columns are replaced by logical variables.
    pub fn delete_columns(&mut self, indices: &[usize]) -> Result<(), Error> {
        let indices = self.program.to_mut().delete_columns(indices)?;
        if let Some(state) = &mut self.state {
            state.remove(&self.program, &indices, &[]);
        }
        self.after_dimension_change();

        Ok(())
    }

    /// Delete rows.
    ///
    /// When a deleted row had a nonbasic logical, a structural variable leaves the basis.
    pub fn delete_rows(&mut self, indices: &[usize]) -> Result<(), Error> {
        let indices = self.program.to_mut().delete_rows(indices)?;
        if let Some(state) = &mut self.state {
            state.remove(&self.program, &[], &indices);
        }
        self.after_dimension_change();

        Ok(())
    }

    /// Change the cost of a column.
    pub fn change_cost(&mut self, column: usize, cost: f64) -> Result<(), Error> {
        self.program.to_mut().change_cost(column, cost)?;
        if let Some(state) = &mut self.state {
            state.change_cost(column, cost);
        }
        self.clear_outcome();

        Ok(())
    }

    /// Change the bounds of a column.
    pub fn change_column_bounds(&mut self, column: usize, lower: f64, upper: f64) -> Result<(), Error> {
        self.program.to_mut().change_column_bounds(column, lower, upper)?;
        if let Some(state) = &mut self.state {
            state.change_bounds(column, lower, upper);
        }
        self.clear_outcome();

        Ok(())
    }

    /// Change the bounds of a row.
    pub fn change_row_bounds(&mut self, row: usize, lower: f64, upper: f64) -> Result<(), Error> {
        self.program.to_mut().change_row_bounds(row, lower, upper)?;
        let nr_columns = self.program.nr_columns();
        if let Some(state) = &mut self.state {
            state.change_bounds(nr_columns + row, -upper, -lower);
        }
        self.clear_outcome();

        Ok(())
    }

    /// Change a coefficient of the constraint matrix.
    ///
    /// A zero value removes the coefficient.
    pub fn change_coefficient(&mut self, row: usize, column: usize, value: f64) -> Result<(), Error> {
        self.program.to_mut().change_coefficient(row, column, value)?;
        if let Some(state) = &mut self.state {
            state.change_coefficient(row, column, value);
        }
        self.clear_outcome();

        Ok(())
    }

    /// Solve `B x = rhs` with the basis matrix of the current basis.
    ///
    /// # Arguments
    ///
    /// * `rhs`: Indexed by row.
    ///
    /// # Return value
    ///
    /// Indexed by basis position, see `basic_variables`.
    pub fn ftran(&mut self, rhs: &[f64]) -> Result<Vec<f64>, Error> {
        check_len("right-hand side", rhs, self.program.nr_rows())?;
        self.ensure_state().external_ftran(rhs)
    }

    /// Solve `B^T y = rhs` with the basis matrix of the current basis.
    ///
    /// # Arguments
    ///
    /// * `rhs`: Indexed by basis position, see `basic_variables`.
    ///
    /// # Return value
    ///
    /// Indexed by row.
    pub fn btran(&mut self, rhs: &[f64]) -> Result<Vec<f64>, Error> {
        check_len("right-hand side", rhs, self.program.nr_rows())?;
        self.ensure_state().external_btran(rhs)
    }

    /// Estimate of the condition number of the current basis matrix in the 1-norm.
    ///
    /// A lower bound that is usually within a small factor of the true value.
    pub fn basis_condition(&mut self) -> Result<f64, Error> {
        self.ensure_state().basis_condition()
    }

    /// The basic variable of each basis position.
    ///
    /// Variables `0..n` are the columns, variable `n + i` is the logical variable of row `i`,
    /// whose column in the basis matrix is the unit vector `e_i`.
    pub fn basic_variables(&mut self) -> Vec<usize> {
        self.ensure_state().basis().basic_index().to_vec()
    }

    /// Value of a variable in the current iterate of the engine.
    pub fn variable_status(&mut self, variable: usize) -> Result<BasisStatus, Error> {
        let nr_columns = self.program.nr_columns();
        check_index("variable", variable, nr_columns + self.program.nr_rows())?;
        let basis = self.ensure_state().basis_statuses();

        Ok(if variable < nr_columns {
            basis.col_status[variable]
        } else {
            basis.row_status[variable - nr_columns]
        })
    }

    fn ensure_state(&mut self) -> &mut State {
        let program = &self.program;
        let options = &self.options;
        let interrupt = &self.interrupt;
        let basis = &self.basis;
        self.state.get_or_insert_with(|| {
            let mut state = State::new(program, options.clone(), Arc::clone(interrupt));
            if let Some(basis) = basis {
                if let Err(error) = state.set_basis(basis, true) {
                    warn!("Ignoring the previous basis: {}", error);
                }
            }
            state
        })
    }

    fn after_dimension_change(&mut self) {
        // Without a state, the statuses can't be patched
        self.basis = self.state.as_ref().map(State::basis_statuses);
        self.clear_outcome();
    }

    fn clear_outcome(&mut self) {
        self.status = ModelStatus::NotSet;
        self.solution = None;
        self.primal_ray = None;
        self.dual_ray = None;
    }
}

#[cfg(test)]
mod test {
    use crate::algorithm::{ModelStatus, Solver};
    use crate::algorithm::simplex::options::{DualizeStrategy, Options};
    use crate::data::linear_program::solution::{Basis, BasisStatus};
    use crate::error::Error;
    use crate::tests::{problem_1, problem_2};

    #[test]
    fn borrow_until_modified() {
        let program = problem_1::create();
        let mut solver = Solver::new(&program);
        assert_eq!(solver.status(), ModelStatus::NotSet);
        assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));
        assert!((solver.solution().unwrap().objective_value - problem_1::OBJECTIVE).abs() < 1e-10);

        solver.change_cost(0, -2_f64).unwrap();
        assert_eq!(solver.status(), ModelStatus::NotSet);
        assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));
        assert!((solver.solution().unwrap().objective_value + 20_f64).abs() < 1e-10);
        // The borrowed program is untouched
        assert_eq!(program.col_cost(), &[-1_f64, -1_f64]);
        assert_eq!(solver.program().col_cost(), &[-2_f64, -1_f64]);
    }

    #[test]
    fn dualized_and_permuted() {
        let program = problem_2::create();
        for options in [
            Options { dualize: DualizeStrategy::On, ..Options::default() },
            Options { permute: true, ..Options::default() },
        ] {
            let mut solver = Solver::with_options(&program, options);
            assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));
            let solution = solver.solution().unwrap();
            assert!((solution.objective_value - problem_2::OBJECTIVE).abs() < 1e-8);
            for (value, expected) in solution.col_value.iter().zip(problem_2::COLUMN_VALUES) {
                assert!((value - expected).abs() < 1e-8);
            }
        }
    }

    #[test]
    fn invalid_input() {
        let program = problem_1::create();
        let mut solver = Solver::new(&program);
        assert!(matches!(solver.change_cost(2, 1_f64), Err(Error::IndexOutOfRange { .. })));
        assert!(matches!(solver.ftran(&[1_f64, 2_f64]), Err(Error::Dimension { .. })));
        assert_eq!(solver.program().col_cost(), program.col_cost());

        let basis = Basis {
            col_status: vec![BasisStatus::Basic, BasisStatus::Lower],
            row_status: vec![BasisStatus::Basic],
        };
        assert!(matches!(solver.set_basis(basis), Err(Error::InvalidBasis(_))));
    }

    #[test]
    fn basis_condition() {
        let program = problem_2::create();
        let mut solver = Solver::new(&program);
        // Logical basis
        assert_eq!(solver.basis_condition(), Ok(1_f64));

        assert_eq!(solver.solve(), Ok(ModelStatus::Optimal));
        assert!(solver.basis_condition().unwrap() >= 1_f64 - 1e-12);
    }

    #[test]
    fn variable_statuses() {
        let program = problem_1::create();
        let mut solver = Solver::new(&program);
        solver.solve().unwrap();
        assert_eq!(solver.basic_variables().len(), 1);
        assert_eq!(solver.variable_status(2), Ok(BasisStatus::Upper));
        assert!(solver.variable_status(3).is_err());
    }
}
