use std::f64::consts::PI;

use log::info;
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, Axis, ShapeBuilder, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::f;

/// Bayesian ridge regression. Fitting alternates a closed-form ridge solve
/// with re-estimation of the noise precision `alpha` and weight precision
/// `lambda`, maximizing the marginal likelihood of the data.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BayesianRidge {
    pub max_iter: usize,
    pub tol: f64,
    pub normalize: bool,
    pub compute_score: bool,
    pub verbose: bool,

    pub coef: Array1<f64>,
    pub intercept: f64,
    /// noise precision
    pub alpha: f64,
    /// weight precision
    pub lambda: f64,
    /// posterior covariance of the coefficients, in the normalized basis
    pub sigma: Array2<f64>,
    /// log marginal likelihood per iteration, when compute_score is set
    pub scores: Vec<f64>,
    pub n_iter: usize,

    x_mean: Array1<f64>,
    x_scale: Array1<f64>,
    y_mean: f64,
}

impl Default for BayesianRidge {
    fn default() -> Self {
        Self::new()
    }
}

impl BayesianRidge {
    pub fn new() -> Self {
        Self {
            max_iter: 300,
            tol: 1e-6,
            normalize: false,
            compute_score: false,
            verbose: false,
            coef: Array1::zeros(0),
            intercept: 0.,
            alpha: 0.,
            lambda: 0.,
            sigma: Array2::zeros((0, 0)),
            scores: vec![],
            n_iter: 0,
            x_mean: Array1::zeros(0),
            x_scale: Array1::zeros(0),
            y_mean: 0.,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let (n_samples, n_features) = x.dim();
        if y.len() != n_samples || n_samples == 0 {
            return Err(Error::DimensionMismatch {
                expected: (n_samples, 1),
                got: (y.len(), 1),
            });
        }

        // center, optionally scale; the statistics are reused at predict time
        self.x_mean = x.mean_axis(Axis(0)).unwrap();
        let mut xc = x - &self.x_mean;
        self.x_scale = Array1::ones(n_features);
        if self.normalize {
            for (j, mut col) in xc.columns_mut().into_iter().enumerate() {
                let scale = col.pow2().sum().sqrt();
                if scale > 0. {
                    col /= scale;
                    self.x_scale[j] = scale;
                }
            }
        }
        self.y_mean = y.mean().unwrap_or(0.);
        let yc = y - self.y_mean;

        let y_var = yc.pow2().sum() / n_samples as f64;
        self.alpha = if y_var > 0. { 1. / y_var } else { 1. };
        self.lambda = 1.;

        // eigendecomposition of XᵀX, computed once and reused every
        // iteration; each ridge solve is then O(n_features²)
        let xtx = xc.t().dot(&xc);
        let eigen = SymmetricEigen::new(DMatrix::from_row_slice(
            n_features,
            n_features,
            xtx.as_slice().unwrap(),
        ));
        let eig: Array1<f64> = eigen.eigenvalues.iter().map(|&e| e.max(0.)).collect();
        let v = Array2::from_shape_vec(
            (n_features, n_features).f(),
            eigen.eigenvectors.as_slice().to_vec(),
        )
        .unwrap();

        let xty = xc.t().dot(&yc);
        let vt_xty = v.t().dot(&xty);

        let mut coef = Array1::<f64>::zeros(n_features);
        self.scores.clear();
        self.n_iter = 0;

        for iter in 0..self.max_iter {
            // ridge solve in the eigenbasis with the current precisions
            let c = Zip::from(&vt_xty)
                .and(&eig)
                .map_collect(|&p, &e| self.alpha * p / (self.lambda + self.alpha * e));
            let coef_new = v.dot(&c);

            // effective degrees of freedom
            let gamma: f64 = eig
                .iter()
                .map(|&e| self.alpha * e / (self.lambda + self.alpha * e))
                .sum();
            let sse = (&yc - &xc.dot(&coef_new)).pow2().sum();
            let coef_sq = coef_new.pow2().sum();

            if coef_sq > 0. {
                self.lambda = gamma / coef_sq;
            }
            if sse > 0. {
                self.alpha = (n_samples as f64 - gamma) / sse;
            }

            if self.compute_score {
                self.scores
                    .push(self.log_marginal(n_samples, n_features, sse, coef_sq, &eig));
            }
            if self.verbose {
                info!(
                    "evidence iteration {}: alpha={:.6e} lambda={:.6e}",
                    iter, self.alpha, self.lambda
                );
            }

            let delta = f::l2(&(&coef_new - &coef));
            coef = coef_new;
            self.n_iter = iter + 1;
            if iter > 0 && delta < self.tol {
                break;
            }
        }

        // posterior covariance from the cached decomposition
        let mut vs = v.clone();
        for (k, mut col) in vs.columns_mut().into_iter().enumerate() {
            col /= self.lambda + self.alpha * eig[k];
        }
        self.sigma = vs.dot(&v.t());

        self.coef = &coef / &self.x_scale;
        self.intercept = self.y_mean - self.coef.dot(&self.x_mean);
        Ok(self)
    }

    fn log_marginal(
        &self,
        n_samples: usize,
        n_features: usize,
        sse: f64,
        coef_sq: f64,
        eig: &Array1<f64>,
    ) -> f64 {
        let logdet_sigma: f64 = -eig
            .iter()
            .map(|&e| (self.lambda + self.alpha * e).ln())
            .sum::<f64>();

        0.5 * (n_features as f64 * self.lambda.ln() + n_samples as f64 * self.alpha.ln()
            - self.alpha * sse
            - self.lambda * coef_sq
            + logdet_sigma
            - n_samples as f64 * (2. * PI).ln())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.coef.is_empty() {
            return Err(Error::NotFitted);
        }
        if x.ncols() != self.coef.len() {
            return Err(Error::DimensionMismatch {
                expected: (x.nrows(), self.coef.len()),
                got: x.dim(),
            });
        }
        Ok(x.dot(&self.coef) + self.intercept)
    }

    /// Point predictions plus the predictive standard deviation.
    pub fn predict_with_std(&self, x: &Array2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        let mean = self.predict(x)?;
        let xn = (x - &self.x_mean) / &self.x_scale;
        let q = (xn.dot(&self.sigma) * &xn).sum_axis(Axis(1));
        let std = (q + 1. / self.alpha).mapv(f64::sqrt);
        Ok((mean, std))
    }

    /// Coefficient of determination.
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let pred = self.predict(x)?;
        f::r2_score(
            &y.view().insert_axis(Axis(1)),
            &pred.view().insert_axis(Axis(1)),
        )
    }
}
