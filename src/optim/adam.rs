use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    t: u64,
    m: Array2<f64>,
    v: Array2<f64>,
}

impl Default for Adam {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            t: 0,
            m: Array2::zeros((0, 0)),
            v: Array2::zeros((0, 0)),
        }
    }
}

impl Adam {
    pub fn compute_update(&mut self, update: &mut Array2<f64>, grad: &Array2<f64>) {
        if self.m.dim() != grad.dim() {
            self.m = Array2::zeros(grad.dim());
            self.v = Array2::zeros(grad.dim());
            self.t = 0;
        }

        self.t += 1;
        Zip::from(&mut self.m)
            .and(grad)
            .for_each(|m, &g| *m = self.beta1 * *m + (1. - self.beta1) * g);
        Zip::from(&mut self.v)
            .and(grad)
            .for_each(|v, &g| *v = self.beta2 * *v + (1. - self.beta2) * g * g);

        let bc1 = 1. - self.beta1.powi(self.t as i32);
        let bc2 = 1. - self.beta2.powi(self.t as i32);
        let lr = self.learning_rate;
        let eps = self.eps;
        Zip::from(update.view_mut())
            .and(&self.m)
            .and(&self.v)
            .for_each(|u, &m, &v| *u = -lr * (m / bc1) / ((v / bc2).sqrt() + eps));
    }
}
