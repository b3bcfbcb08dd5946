use std::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub mod adadelta;
pub mod adagrad;
pub mod adam;
pub mod agd;
pub mod rmsprop;

pub use adadelta::Adadelta;
pub use adagrad::Adagrad;
pub use adam::Adam;
pub use agd::Agd;
pub use rmsprop::RmsProp;

/// Name registry for optimizer constructors. Resolved once at estimator
/// construction; an unknown name never survives past lookup.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Solver {
    Agd,
    Adagrad,
    Rmsprop,
    Adadelta,
    Adam,
}

impl Solver {
    /// Build a fresh optimizer with its own independent state.
    pub fn optimizer(&self) -> Optim {
        match self {
            Self::Agd => Optim::Agd(Agd::default()),
            Self::Adagrad => Optim::Adagrad(Adagrad::default()),
            Self::Rmsprop => Optim::Rmsprop(RmsProp::default()),
            Self::Adadelta => Optim::Adadelta(Adadelta::default()),
            Self::Adam => Optim::Adam(Adam::default()),
        }
    }
}

impl FromStr for Solver {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "agd" => Ok(Self::Agd),
            "adagrad" => Ok(Self::Adagrad),
            "rmsprop" => Ok(Self::Rmsprop),
            "adadelta" => Ok(Self::Adadelta),
            "adam" => Ok(Self::Adam),
            other => Err(Error::UnknownSolver(other.to_string())),
        }
    }
}

/// One optimizer instance. Given a gradient it fills `update` with the step
/// to add to the parameters; the step is already negated for descent.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Optim {
    Agd(Agd),
    Adagrad(Adagrad),
    Rmsprop(RmsProp),
    Adadelta(Adadelta),
    Adam(Adam),
}

impl Optim {
    pub fn compute_update(&mut self, update: &mut Array2<f64>, grad: &Array2<f64>) {
        match self {
            Optim::Agd(o) => o.compute_update(update, grad),
            Optim::Adagrad(o) => o.compute_update(update, grad),
            Optim::Rmsprop(o) => o.compute_update(update, grad),
            Optim::Adadelta(o) => o.compute_update(update, grad),
            Optim::Adam(o) => o.compute_update(update, grad),
        }
    }
}
