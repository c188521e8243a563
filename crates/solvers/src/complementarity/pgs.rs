use impulse_core::Vector;

use super::{BoxedProblem, NonSmoothSolver, SolverOptions, SolverOutput, SolverStatus};

/// Projected Gauss–Seidel solver.
///
/// Each sweep updates rows in order with
///
/// ```text
/// z_i ← Π[lo_i, hi_i]( −(q_i + Σ_{j≠i} M_ij z_j) / M_ii )
/// ```
///
/// which equals `z_i − w_i / M_ii` projected onto the bounds. Once the last
/// tangent row of a friction cone is updated, the tangent block is scaled
/// back into the disk of radius `μ z_n`. Convergence is declared when the
/// natural-map residual falls below the tolerance. The diagonal of `M` must
/// be strictly positive.
///
/// Starting from zero, a problem with `q = 0` returns `z = 0` exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectedGaussSeidel;

impl NonSmoothSolver for ProjectedGaussSeidel {
    fn solve(&self, problem: &BoxedProblem, options: &SolverOptions) -> SolverOutput {
        let n = problem.size();
        let m = problem.m();
        let q = problem.q();
        let lower = problem.lower();
        let upper = problem.upper();

        let mut closing = vec![None; n];
        for cone in problem.cones() {
            closing[cone.end() - 1] = Some(cone);
        }

        let mut z = match problem.initial_guess() {
            Some(z0) if options.warm_start() => {
                let mut z = z0.clone();
                problem.project(&mut z);
                z
            }
            _ => Vector::zeros(n),
        };

        if let Some(row) = (0..n).find(|&i| !(m[[i, i]] > 0.0 && m[[i, i]].is_finite())) {
            let w = m.dot(&z) + q;
            return SolverOutput {
                z,
                w,
                status: SolverStatus::SingularDiagonal { row },
            };
        }

        let mut w = m.dot(&z) + q;
        let mut residual = problem.residual(&z, &w);
        if residual <= options.tolerance() {
            return SolverOutput {
                z,
                w,
                status: SolverStatus::Converged { iters: 0 },
            };
        }

        for iter in 1..=options.max_iters() {
            for i in 0..n {
                let mut off_diagonal = q[i];
                for j in (0..n).filter(|&j| j != i) {
                    off_diagonal += m[[i, j]] * z[j];
                }
                z[i] = (-off_diagonal / m[[i, i]]).clamp(lower[i], upper[i]);
                if let Some(cone) = closing[i] {
                    let normal = z[cone.normal];
                    cone.project(&mut z, normal);
                }
            }

            w = m.dot(&z) + q;
            residual = problem.residual(&z, &w);
            tracing::trace!(iter, residual, "projected Gauss-Seidel sweep");

            if residual <= options.tolerance() {
                return SolverOutput {
                    z,
                    w,
                    status: SolverStatus::Converged { iters: iter },
                };
            }
        }

        SolverOutput {
            z,
            w,
            status: SolverStatus::MaxIters { residual },
        }
    }
}
