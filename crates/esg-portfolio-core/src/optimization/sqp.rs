//! Sequential quadratic programming over the capped simplex
//! `{ w : lower <= w <= upper, sum(w) = 1 }`.
//!
//! Each outer iteration solves a convex QP built from a damped-BFGS
//! Hessian approximation and the objective gradient, then backtracks along
//! the QP step with an Armijo test. All constraints are linear, so every
//! iterate stays feasible and no merit-function penalty is needed. The
//! returned point is a local optimum that depends on the starting point
//! and tolerances; for convex objectives it is also global.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::optimization::linalg::{dot, identity, mat_vec, norm_inf, solve};
use crate::optimization::objective::Objective;

/// Solver tolerances and limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub max_iterations: u32,
    /// Stop when the QP step or the objective change falls below this.
    pub tolerance: f64,
    pub max_line_search_steps: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-9,
            max_line_search_steps: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverOutcome {
    pub x: Vec<f64>,
    pub objective_value: f64,
    pub iterations: u32,
    pub converged: bool,
    pub message: String,
}

/// Minimize `objective` subject to box bounds and a unit-sum equality.
///
/// `x0` must be feasible.
pub fn minimize_on_simplex(
    objective: &impl Objective,
    x0: Vec<f64>,
    lower: &[f64],
    upper: &[f64],
    config: &SolverConfig,
) -> SolverOutcome {
    let n = x0.len();
    let mut x = x0;
    let mut f = objective.value(&x);
    let mut g = objective.gradient(&x);
    let mut hess = identity(n);

    let mut converged = false;
    let mut message = format!("Iteration limit ({}) reached", config.max_iterations);
    let mut iterations = 0;

    while iterations < config.max_iterations {
        iterations += 1;

        let lo: Vec<f64> = (0..n).map(|i| (lower[i] - x[i]).min(0.0)).collect();
        let hi: Vec<f64> = (0..n).map(|i| (upper[i] - x[i]).max(0.0)).collect();
        let d = solve_qp_subproblem(&hess, &g, &lo, &hi);

        if norm_inf(&d) < config.tolerance {
            converged = true;
            message = "Optimization terminated successfully (step below tolerance)".into();
            break;
        }

        let slope = dot(&g, &d);
        if slope >= 0.0 {
            // No descent left along the feasible QP direction.
            converged = slope.abs() < config.tolerance.sqrt();
            message = "Positive directional derivative for line search".into();
            break;
        }

        let mut alpha = 1.0;
        let mut accepted = None;
        for _ in 0..config.max_line_search_steps {
            let trial: Vec<f64> = (0..n)
                .map(|i| (x[i] + alpha * d[i]).clamp(lower[i], upper[i]))
                .collect();
            let f_trial = objective.value(&trial);
            if f_trial <= f + 1e-4 * alpha * slope {
                accepted = Some((trial, f_trial));
                break;
            }
            alpha *= 0.5;
        }

        let Some((x_new, f_new)) = accepted else {
            message = "Line search failed to decrease the objective".into();
            break;
        };

        let g_new = objective.gradient(&x_new);
        let s: Vec<f64> = (0..n).map(|i| x_new[i] - x[i]).collect();
        let y: Vec<f64> = (0..n).map(|i| g_new[i] - g[i]).collect();
        damped_bfgs_update(&mut hess, &s, &y);

        let df = (f - f_new).abs();
        debug!(iteration = iterations, objective = f_new, step = alpha, df, "sqp iteration");

        x = x_new;
        f = f_new;
        g = g_new;

        if df < config.tolerance && norm_inf(&s) < config.tolerance.sqrt() {
            converged = true;
            message = "Optimization terminated successfully (objective change below tolerance)".into();
            break;
        }
    }

    SolverOutcome {
        x,
        objective_value: f,
        iterations,
        converged,
        message,
    }
}

/// Powell-damped BFGS update keeping `hess` positive definite.
fn damped_bfgs_update(hess: &mut [Vec<f64>], s: &[f64], y: &[f64]) {
    let bs = mat_vec(hess, s);
    let sbs = dot(s, &bs);
    if sbs <= 1e-16 {
        return;
    }
    let sy = dot(s, y);
    let theta = if sy >= 0.2 * sbs {
        1.0
    } else {
        0.8 * sbs / (sbs - sy)
    };
    let r: Vec<f64> = y
        .iter()
        .zip(&bs)
        .map(|(yi, bsi)| theta * yi + (1.0 - theta) * bsi)
        .collect();
    let sr = dot(s, &r);
    if sr <= 1e-16 {
        return;
    }
    for (i, row) in hess.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell += r[i] * r[j] / sr - bs[i] * bs[j] / sbs;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Free,
    Lower,
    Upper,
}

/// Primal active-set solution of
/// `min 0.5 d'Hd + g'd  s.t.  sum(d) = 0, lo <= d <= hi`
/// starting from the feasible point `d = 0` (requires `lo <= 0 <= hi`).
#[allow(clippy::needless_range_loop)]
pub(crate) fn solve_qp_subproblem(h: &[Vec<f64>], g: &[f64], lo: &[f64], hi: &[f64]) -> Vec<f64> {
    let n = g.len();
    let mut d = vec![0.0; n];
    let mut state: Vec<Bound> = (0..n)
        .map(|i| if hi[i] - lo[i] <= 0.0 { Bound::Lower } else { Bound::Free })
        .collect();

    let max_iter = 10 * n + 50;
    for _ in 0..max_iter {
        let free: Vec<usize> = (0..n).filter(|&i| state[i] == Bound::Free).collect();
        if free.is_empty() {
            break;
        }
        let q: Vec<f64> = mat_vec(h, &d).iter().zip(g).map(|(a, b)| a + b).collect();

        // KKT system over free variables: [H_FF 1; 1' 0] [p; lambda] = [-q_F; 0]
        let m = free.len();
        let mut kkt = vec![vec![0.0; m + 1]; m + 1];
        let mut rhs = vec![0.0; m + 1];
        for (a, &i) in free.iter().enumerate() {
            for (b, &j) in free.iter().enumerate() {
                kkt[a][b] = h[i][j];
            }
            kkt[a][m] = 1.0;
            kkt[m][a] = 1.0;
            rhs[a] = -q[i];
        }
        let Some(sol) = solve(&kkt, &rhs) else {
            break;
        };
        let lambda = sol[m];
        let mut p = vec![0.0; n];
        for (a, &i) in free.iter().enumerate() {
            p[i] = sol[a];
        }

        if norm_inf(&p) < 1e-13 {
            // Stationary on the working set: check bound multipliers.
            let mut worst: Option<(usize, f64)> = None;
            for i in 0..n {
                let mu = match state[i] {
                    Bound::Free => continue,
                    _ if hi[i] - lo[i] <= 0.0 => continue,
                    Bound::Lower => q[i] + lambda,
                    Bound::Upper => -(q[i] + lambda),
                };
                if mu < worst.map_or(-1e-12, |(_, w)| w) {
                    worst = Some((i, mu));
                }
            }
            match worst {
                Some((i, _)) => state[i] = Bound::Free,
                None => break,
            }
            continue;
        }

        let mut step = 1.0;
        let mut blocking: Option<(usize, Bound)> = None;
        for &i in &free {
            if p[i] < 0.0 {
                let ratio = (lo[i] - d[i]) / p[i];
                if ratio < step {
                    step = ratio.max(0.0);
                    blocking = Some((i, Bound::Lower));
                }
            } else if p[i] > 0.0 {
                let ratio = (hi[i] - d[i]) / p[i];
                if ratio < step {
                    step = ratio.max(0.0);
                    blocking = Some((i, Bound::Upper));
                }
            }
        }

        for i in 0..n {
            d[i] += step * p[i];
        }
        if let Some((i, bound)) = blocking {
            d[i] = if bound == Bound::Lower { lo[i] } else { hi[i] };
            state[i] = bound;
        }
    }

    d
}
