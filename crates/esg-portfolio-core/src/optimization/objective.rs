use serde::{Deserialize, Serialize};

use crate::optimization::linalg::{dot, mat_vec, quad_form};

/// Below this portfolio volatility the risk term is treated as being at
/// its kink and the per-asset volatility is used as a subgradient.
const SIGMA_FLOOR: f64 = 1e-12;

/// A smooth (almost everywhere) function of the weight vector.
pub trait Objective {
    fn value(&self, w: &[f64]) -> f64;
    fn gradient(&self, w: &[f64]) -> Vec<f64>;
}

/// Coefficients of the blended objective
/// `risk_coef * sqrt(w'Cw) - return_coef * w.R - esg_coef * w.S`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveTerms {
    pub return_coef: f64,
    pub esg_coef: f64,
    pub risk_coef: f64,
}

/// Blend constants for the three solved strategies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveConstants {
    /// Risk penalty in `max_return` and `esg` modes.
    pub risk_aversion: f64,
    /// Return bonus in `min_volatility` mode.
    pub return_tilt: f64,
    /// Return bonus in `esg` mode.
    pub esg_return_coef: f64,
    /// ESG score bonus in `esg` mode.
    pub esg_coef: f64,
}

impl Default for ObjectiveConstants {
    fn default() -> Self {
        Self {
            risk_aversion: 0.9,
            return_tilt: 0.2,
            esg_return_coef: 0.2,
            esg_coef: 0.9,
        }
    }
}

/// Linear reward terms minus a volatility penalty over annualized inputs.
///
/// With non-negative coefficients this is convex: `sqrt(w'Cw)` is a norm
/// for positive semi-definite `C` and the remaining terms are linear.
#[derive(Debug, Clone)]
pub struct BlendedObjective<'a> {
    expected_returns: &'a [f64],
    covariance: &'a [Vec<f64>],
    esg_scores: Option<&'a [f64]>,
    terms: ObjectiveTerms,
}

impl<'a> BlendedObjective<'a> {
    pub fn new(
        expected_returns: &'a [f64],
        covariance: &'a [Vec<f64>],
        esg_scores: Option<&'a [f64]>,
        terms: ObjectiveTerms,
    ) -> Self {
        Self {
            expected_returns,
            covariance,
            esg_scores,
            terms,
        }
    }

    pub fn volatility(&self, w: &[f64]) -> f64 {
        quad_form(self.covariance, w).max(0.0).sqrt()
    }

    fn esg_term(&self, w: &[f64]) -> f64 {
        match self.esg_scores {
            Some(s) if self.terms.esg_coef != 0.0 => dot(w, s),
            _ => 0.0,
        }
    }
}

impl Objective for BlendedObjective<'_> {
    fn value(&self, w: &[f64]) -> f64 {
        let t = &self.terms;
        t.risk_coef * self.volatility(w)
            - t.return_coef * dot(w, self.expected_returns)
            - t.esg_coef * self.esg_term(w)
    }

    fn gradient(&self, w: &[f64]) -> Vec<f64> {
        let t = &self.terms;
        let cw = mat_vec(self.covariance, w);
        let sigma = dot(w, &cw).max(0.0).sqrt();

        (0..w.len())
            .map(|i| {
                let risk = if sigma > SIGMA_FLOOR {
                    cw[i] / sigma
                } else {
                    self.covariance[i][i].max(0.0).sqrt()
                };
                let esg = match self.esg_scores {
                    Some(s) => s[i],
                    None => 0.0,
                };
                t.risk_coef * risk - t.return_coef * self.expected_returns[i] - t.esg_coef * esg
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(r: f64, e: f64, k: f64) -> ObjectiveTerms {
        ObjectiveTerms {
            return_coef: r,
            esg_coef: e,
            risk_coef: k,
        }
    }

    #[test]
    fn test_value_matches_formula() {
        let mu = vec![0.10, 0.05];
        let cov = vec![vec![0.04, 0.0], vec![0.0, 0.01]];
        let esg = vec![3.0, 6.0];
        let obj = BlendedObjective::new(&mu, &cov, Some(&esg), terms(0.2, 0.9, 0.9));
        let w = [0.5, 0.5];
        let sigma = (0.25_f64 * 0.04 + 0.25 * 0.01).sqrt();
        let expected = 0.9 * sigma - 0.2 * 0.075 - 0.9 * 4.5;
        assert!((obj.value(&w) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let mu = vec![0.12, 0.07, 0.03];
        let cov = vec![
            vec![0.05, 0.01, 0.002],
            vec![0.01, 0.03, 0.004],
            vec![0.002, 0.004, 0.02],
        ];
        let obj = BlendedObjective::new(&mu, &cov, None, terms(1.0, 0.0, 0.9));
        let w = [0.2, 0.5, 0.3];
        let g = obj.gradient(&w);
        let h = 1e-6;
        for i in 0..3 {
            let mut up = w;
            let mut dn = w;
            up[i] += h;
            dn[i] -= h;
            let fd = (obj.value(&up) - obj.value(&dn)) / (2.0 * h);
            assert!((g[i] - fd).abs() < 1e-6, "component {}: {} vs {}", i, g[i], fd);
        }
    }

    #[test]
    fn test_gradient_at_zero_volatility_uses_asset_vol() {
        let mu = vec![0.0, 0.0];
        let cov = vec![vec![0.04, 0.0], vec![0.0, 0.0]];
        let obj = BlendedObjective::new(&mu, &cov, None, terms(0.0, 0.0, 1.0));
        let g = obj.gradient(&[0.0, 1.0]);
        assert!((g[0] - 0.2).abs() < 1e-12);
        assert_eq!(g[1], 0.0);
    }
}
