//! # Certificates
//!
//! When a ratio test finds no pivot, the index that proves infeasibility or unboundedness is
//! recorded right away. The dense ray is only computed when it is asked for, because that takes
//! an extra basis solve.
use crate::data::linear_program::LinearProgram;
use crate::data::linear_program::elements::Objective;

/// What the current ray is derived from.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum RayKind {
    /// There is no ray.
    #[default]
    None,
    /// Dual ray: the dual ratio test found no entering variable for a leaving row.
    ///
    /// The sign is `1` when the leaving variable is below its lower bound and `-1` when it is
    /// above its upper bound.
    Row {
        /// Row of the basis in which the dual ratio test failed.
        row: usize,
        /// Direction of the bound violation.
        sign: f64,
    },
    /// Dual ray: primal phase one found no improving direction while infeasibilities remain.
    PhaseOne,
    /// Primal ray: the primal ratio test found no bound for an entering variable.
    Column {
        /// The entering variable.
        variable: usize,
        /// `1` when it increases, `-1` when it decreases.
        direction: f64,
    },
}

/// The ray of the last solve, with its dense value once computed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RayRecord {
    kind: RayKind,
    value: Option<Vec<f64>>,
}

impl RayRecord {
    /// Record a new ray; a previously computed value is dropped.
    pub fn set(&mut self, kind: RayKind) {
        self.kind = kind;
        self.value = None;
    }

    /// Forget the ray.
    pub fn clear(&mut self) {
        self.set(RayKind::None);
    }

    /// What the ray is derived from.
    pub fn kind(&self) -> RayKind {
        self.kind
    }

    /// Whether a dual ray is available.
    pub fn has_dual_ray(&self) -> bool {
        matches!(self.kind, RayKind::Row { .. } | RayKind::PhaseOne)
    }

    /// Whether a primal ray is available.
    pub fn has_primal_ray(&self) -> bool {
        matches!(self.kind, RayKind::Column { .. })
    }

    /// The computed value, if any.
    pub fn value(&self) -> Option<&[f64]> {
        self.value.as_deref()
    }

    /// Store the computed value.
    pub fn cache(&mut self, value: Vec<f64>) {
        debug_assert_ne!(self.kind, RayKind::None);

        self.value = Some(value);
    }
}

/// Evaluate a Farkas certificate of infeasibility.
///
/// For any feasible `x` with row activity `r = A x`, `y^T r = (A^T y)^T x`, so the difference
///
/// ```text
/// sup_{r in [row_lower, row_upper]} y^T r - inf_{x in [col_lower, col_upper]} (A^T y)^T x
/// ```
///
/// is nonnegative. A negative value proves that the program is infeasible. Entries of `y` and of
/// `A^T y` smaller than `tolerance` in absolute value are treated as zero.
pub fn farkas_gap(program: &LinearProgram, y: &[f64], tolerance: f64) -> f64 {
    debug_assert_eq!(y.len(), program.nr_rows());

    let y = y.iter()
        .map(|&y_i| if y_i.abs() > tolerance { y_i } else { 0_f64 })
        .collect::<Vec<_>>();
    let row_part = y.iter().enumerate()
        .filter(|&(_, &y_i)| y_i != 0_f64)
        .map(|(i, &y_i)| {
            if y_i > 0_f64 { y_i * program.row_upper()[i] } else { y_i * program.row_lower()[i] }
        })
        .sum::<f64>();

    let z = program.matrix().multiply_transposed(&y);
    let column_part = z.iter().enumerate()
        .filter(|&(_, &z_j)| z_j.abs() > tolerance)
        .map(|(j, &z_j)| {
            if z_j > 0_f64 { z_j * program.col_lower()[j] } else { z_j * program.col_upper()[j] }
        })
        .sum::<f64>();

    row_part - column_part
}

/// Whether `d` is a direction in which the objective improves without bound.
///
/// Checks that the objective strictly improves along `d`, and that moving along `d` never
/// reaches a finite column or row bound, up to `tolerance`.
pub fn is_primal_ray(program: &LinearProgram, d: &[f64], tolerance: f64) -> bool {
    debug_assert_eq!(d.len(), program.nr_columns());

    let slope = program.col_cost().iter().zip(d).map(|(c, d_j)| c * d_j).sum::<f64>();
    let improves = match program.objective() {
        Objective::Minimize => slope < -tolerance,
        Objective::Maximize => slope > tolerance,
    };

    let fits = |value: f64, lower: f64, upper: f64| {
        (value <= tolerance || upper == f64::INFINITY)
            && (value >= -tolerance || lower == f64::NEG_INFINITY)
    };
    let columns_fit = (0..program.nr_columns())
        .all(|j| fits(d[j], program.col_lower()[j], program.col_upper()[j]));
    let activity = program.matrix().multiply(d);
    let rows_fit = (0..program.nr_rows())
        .all(|i| fits(activity[i], program.row_lower()[i], program.row_upper()[i]));

    improves && columns_fit && rows_fit
}

#[cfg(test)]
mod test {
    use crate::algorithm::simplex::ray::{farkas_gap, is_primal_ray, RayKind, RayRecord};
    use crate::data::linear_algebra::matrix::ColumnMatrix;
    use crate::data::linear_program::elements::Objective;
    use crate::data::linear_program::LinearProgram;

    fn contradicting() -> LinearProgram {
        // x <= 1 and x >= 2
        LinearProgram::new(
            Objective::Minimize,
            vec![1_f64],
            vec![f64::NEG_INFINITY],
            vec![f64::INFINITY],
            vec![f64::NEG_INFINITY, 2_f64],
            vec![1_f64, f64::INFINITY],
            ColumnMatrix::from_dense_rows(&[vec![1_f64], vec![1_f64]]),
        ).unwrap()
    }

    #[test]
    fn record() {
        let mut ray = RayRecord::default();
        assert_eq!(ray.kind(), RayKind::None);
        assert!(!ray.has_dual_ray());

        ray.set(RayKind::Row { row: 1, sign: -1_f64 });
        assert!(ray.has_dual_ray());
        assert!(ray.value().is_none());
        ray.cache(vec![1_f64, -1_f64]);
        assert_eq!(ray.value(), Some(&[1_f64, -1_f64][..]));

        ray.set(RayKind::Column { variable: 0, direction: 1_f64 });
        assert!(ray.has_primal_ray());
        assert!(ray.value().is_none());
        ray.clear();
        assert_eq!(ray, RayRecord::default());
    }

    #[test]
    fn farkas() {
        let program = contradicting();
        assert!(farkas_gap(&program, &[1_f64, -1_f64], 1e-9) < 0_f64);
        assert!(farkas_gap(&program, &[-1_f64, 1_f64], 1e-9) > 0_f64);
        // Not a certificate: A^T y is unbounded below
        assert_eq!(farkas_gap(&program, &[1_f64, 0_f64], 1e-9), f64::INFINITY);
    }

    #[test]
    fn farkas_noise() {
        // x <= 1, x >= 2 and x >= 0
        let program = LinearProgram::new(
            Objective::Minimize,
            vec![1_f64],
            vec![f64::NEG_INFINITY],
            vec![f64::INFINITY],
            vec![f64::NEG_INFINITY, 2_f64, 0_f64],
            vec![1_f64, f64::INFINITY, f64::INFINITY],
            ColumnMatrix::from_dense_rows(&[vec![1_f64], vec![1_f64], vec![1_f64]]),
        ).unwrap();

        // Rounding noise on a row with an infinite upper bound
        let y = [1_f64, -1_f64, 2.78e-17];
        assert!((farkas_gap(&program, &y, 1e-9) + 1_f64).abs() < 1e-12);
        assert_eq!(farkas_gap(&program, &y, 0_f64), f64::INFINITY);
    }

    #[test]
    fn primal_ray() {
        // min -x, x >= 0
        let program = LinearProgram::new(
            Objective::Minimize,
            vec![-1_f64],
            vec![0_f64],
            vec![f64::INFINITY],
            vec![],
            vec![],
            ColumnMatrix::zeros(0, 1),
        ).unwrap();
        assert!(is_primal_ray(&program, &[1_f64], 1e-9));
        assert!(!is_primal_ray(&program, &[-1_f64], 1e-9));
        assert!(!is_primal_ray(&program, &[0_f64], 1e-9));
    }
}
