use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Adagrad {
    pub learning_rate: f64,
    pub eps: f64,
    accum: Array2<f64>,
}

impl Default for Adagrad {
    fn default() -> Self {
        Self {
            learning_rate: 1e-2,
            eps: 1e-8,
            accum: Array2::zeros((0, 0)),
        }
    }
}

impl Adagrad {
    pub fn compute_update(&mut self, update: &mut Array2<f64>, grad: &Array2<f64>) {
        if self.accum.dim() != grad.dim() {
            self.accum = Array2::zeros(grad.dim());
        }

        Zip::from(&mut self.accum)
            .and(grad)
            .for_each(|a, &g| *a += g * g);
        Zip::from(update.view_mut())
            .and(&self.accum)
            .and(grad)
            .for_each(|u, &a, &g| *u = -self.learning_rate * g / (a.sqrt() + self.eps));
    }
}
