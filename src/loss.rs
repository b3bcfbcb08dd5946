use std::str::FromStr;

use ndarray::{ArrayView2, ArrayViewMut2};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::f;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    Square,
    Log,
    CrossEntropy,
}

impl Loss {
    /// Mean loss over samples. When `grad` is given it is overwritten with
    /// dJ/dYpred, scaled by 1/n_samples.
    pub fn loss(
        &self,
        ytrue: &ArrayView2<f64>,
        ypred: &ArrayView2<f64>,
        grad: Option<&mut ArrayViewMut2<f64>>,
    ) -> Result<f64> {
        let n = ytrue.nrows() as f64;

        match self {
            Loss::Square => {
                // J = (h - y)^2 / 2
                let j = f::zip_sum(ytrue, ypred, |y, h| {
                    let d = h - y;
                    d * d / 2.
                })? / n;
                if let Some(g) = grad {
                    f::zip_assign(g, ytrue, ypred, 1. / n, |y, h| h - y)?;
                }
                Ok(j)
            }
            Loss::Log => {
                // J = -y log(h), with h clamped away from zero so an
                // exactly-zero prediction stays finite
                let j = f::zip_sum(ytrue, ypred, |y, h| -y * h.max(1e-15).ln())? / n;
                if let Some(g) = grad {
                    f::zip_assign(g, ytrue, ypred, 1. / n, |y, h| -y / h.max(1e-12))?;
                }
                Ok(j)
            }
            Loss::CrossEntropy => {
                // J = -y log(h) - (1 - y) log(1 - h)
                let j = f::zip_sum(ytrue, ypred, |y, h| {
                    let h = h.clamp(1e-15, 1. - 1e-15);
                    -y * h.ln() - (1. - y) * (1. - h).ln()
                })? / n;
                if let Some(g) = grad {
                    f::zip_assign(g, ytrue, ypred, 1. / n, |y, h| {
                        let h = h.clamp(1e-12, 1. - 1e-12);
                        -y / h + (1. - y) / (1. - h)
                    })?;
                }
                Ok(j)
            }
        }
    }
}

impl FromStr for Loss {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "square" => Ok(Self::Square),
            "log" => Ok(Self::Log),
            "cross-entropy" => Ok(Self::CrossEntropy),
            other => Err(Error::UnknownLoss(other.to_string())),
        }
    }
}
