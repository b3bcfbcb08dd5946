use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayView2, ArrayViewMut2, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type ScalarFn = fn(f64) -> f64;

fn dims_check(a: (usize, usize), b: (usize, usize)) -> Result<()> {
    if a != b {
        return Err(Error::DimensionMismatch {
            expected: a,
            got: b,
        });
    }
    Ok(())
}

// ELEMENTWISE OPERATORS

pub fn zip_sum(
    a: &ArrayView2<f64>,
    b: &ArrayView2<f64>,
    f: impl Fn(f64, f64) -> f64,
) -> Result<f64> {
    dims_check(a.dim(), b.dim())?;
    Ok(Zip::from(a).and(b).fold(0., |acc, &x, &y| acc + f(x, y)))
}

pub fn zip_assign(
    out: &mut ArrayViewMut2<f64>,
    a: &ArrayView2<f64>,
    b: &ArrayView2<f64>,
    scale: f64,
    f: impl Fn(f64, f64) -> f64,
) -> Result<()> {
    dims_check(out.dim(), a.dim())?;
    dims_check(a.dim(), b.dim())?;
    Zip::from(out.view_mut())
        .and(a)
        .and(b)
        .for_each(|o, &x, &y| *o = scale * f(x, y));
    Ok(())
}

pub fn map_assign(
    out: &mut ArrayViewMut2<f64>,
    a: &ArrayView2<f64>,
    f: impl Fn(f64) -> f64,
) -> Result<()> {
    dims_check(out.dim(), a.dim())?;
    Zip::from(out.view_mut()).and(a).for_each(|o, &x| *o = f(x));
    Ok(())
}

// ACTIVATIONS
//
// Derivatives are written in terms of the activation output H rather than
// the pre-activation Z; each of the four has a closed form in H.

pub fn identity(z: f64) -> f64 {
    z
}

pub fn d_identity(_h: f64) -> f64 {
    1.
}

pub fn logistic(z: f64) -> f64 {
    1. / (1. + (-z).exp())
}

pub fn d_logistic(h: f64) -> f64 {
    h * (1. - h)
}

pub fn tanh(z: f64) -> f64 {
    z.tanh()
}

pub fn d_tanh(h: f64) -> f64 {
    1. - h * h
}

pub fn relu(z: f64) -> f64 {
    z.max(0.)
}

pub fn d_relu(h: f64) -> f64 {
    if h > 0. { 1. } else { 0. }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Identity,
    Logistic,
    Tanh,
    Relu,
}

impl Activation {
    pub fn wake(&self) -> (ScalarFn, ScalarFn) {
        match self {
            Self::Identity => (identity, d_identity),
            Self::Logistic => (logistic, d_logistic),
            Self::Tanh => (tanh, d_tanh),
            Self::Relu => (relu, d_relu),
        }
    }

    /// H = f(Z)
    pub fn forward(&self, z: &ArrayView2<f64>, h: &mut ArrayViewMut2<f64>) -> Result<()> {
        map_assign(h, z, self.wake().0)
    }

    /// dH/dZ, evaluated from the output H
    pub fn grad(&self, h: &ArrayView2<f64>, out: &mut ArrayViewMut2<f64>) -> Result<()> {
        map_assign(out, h, self.wake().1)
    }
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "identity" => Ok(Self::Identity),
            "logistic" => Ok(Self::Logistic),
            "tanh" => Ok(Self::Tanh),
            "relu" => Ok(Self::Relu),
            other => Err(Error::UnknownActivation(other.to_string())),
        }
    }
}

// MISC

pub fn l2(v: &Array1<f64>) -> f64 {
    v.pow2().sum().sqrt()
}

pub fn clip_grad(grad: &mut Array2<f64>, clip: f64) {
    let norm = grad.pow2().sum().sqrt();

    if norm > clip {
        grad.mapv_inplace(|x| x * (clip / norm));
    }
}

pub fn sgn(x: f64) -> f64 {
    if x > 0. {
        return 1.;
    }

    if x < 0. {
        return -1.;
    }

    0.
}

/// Column-averaged coefficient of determination. A constant target column
/// has no explainable variance and contributes 0.
pub fn r2_score(ytrue: &ArrayView2<f64>, ypred: &ArrayView2<f64>) -> Result<f64> {
    dims_check(ytrue.dim(), ypred.dim())?;
    let n_outputs = ytrue.ncols();
    if n_outputs == 0 {
        return Ok(0.);
    }

    let mut total = 0.;
    for (yt, yp) in ytrue.columns().into_iter().zip(ypred.columns()) {
        let mean = yt.mean().unwrap_or(0.);
        let ss_tot = yt.mapv(|y| (y - mean) * (y - mean)).sum();
        let ss_res = Zip::from(&yt)
            .and(&yp)
            .fold(0., |acc, &y, &h| acc + (y - h) * (y - h));
        total += if ss_tot == 0. { 0. } else { 1. - ss_res / ss_tot };
    }

    Ok(total / n_outputs as f64)
}

/// Fraction of rows where every label matches.
pub fn accuracy_score(ytrue: &ArrayView2<f64>, ypred: &ArrayView2<f64>) -> Result<f64> {
    dims_check(ytrue.dim(), ypred.dim())?;
    let n_samples = ytrue.nrows();
    if n_samples == 0 {
        return Ok(0.);
    }

    let hits = ytrue
        .rows()
        .into_iter()
        .zip(ypred.rows())
        .filter(|(t, p)| t.iter().zip(p.iter()).all(|(a, b)| a == b))
        .count();

    Ok(hits as f64 / n_samples as f64)
}
