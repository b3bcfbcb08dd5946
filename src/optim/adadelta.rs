use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Adadelta {
    pub rho: f64,
    pub eps: f64,
    accum_grad: Array2<f64>,
    accum_update: Array2<f64>,
}

impl Default for Adadelta {
    fn default() -> Self {
        Self {
            rho: 0.95,
            eps: 1e-6,
            accum_grad: Array2::zeros((0, 0)),
            accum_update: Array2::zeros((0, 0)),
        }
    }
}

impl Adadelta {
    pub fn compute_update(&mut self, update: &mut Array2<f64>, grad: &Array2<f64>) {
        if self.accum_grad.dim() != grad.dim() {
            self.accum_grad = Array2::zeros(grad.dim());
            self.accum_update = Array2::zeros(grad.dim());
        }

        Zip::from(&mut self.accum_grad)
            .and(grad)
            .for_each(|a, &g| *a = self.rho * *a + (1. - self.rho) * g * g);
        Zip::from(update.view_mut())
            .and(&self.accum_grad)
            .and(&self.accum_update)
            .and(grad)
            .for_each(|u, &ag, &au, &g| *u = -((au + self.eps).sqrt() / (ag + self.eps).sqrt()) * g);
        Zip::from(&mut self.accum_update)
            .and(update.view())
            .for_each(|au, &u| *au = self.rho * *au + (1. - self.rho) * u * u);
    }
}
