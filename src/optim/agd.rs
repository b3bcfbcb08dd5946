use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// Gradient descent with momentum.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Agd {
    pub learning_rate: f64,
    pub momentum: f64,
    velocity: Array2<f64>,
}

impl Default for Agd {
    fn default() -> Self {
        Self {
            learning_rate: 1e-2,
            momentum: 0.9,
            velocity: Array2::zeros((0, 0)),
        }
    }
}

impl Agd {
    pub fn compute_update(&mut self, update: &mut Array2<f64>, grad: &Array2<f64>) {
        if self.velocity.dim() != grad.dim() {
            self.velocity = Array2::zeros(grad.dim());
        }

        Zip::from(&mut self.velocity)
            .and(grad)
            .for_each(|v, &g| *v = self.momentum * *v - self.learning_rate * g);
        update.assign(&self.velocity);
    }
}
