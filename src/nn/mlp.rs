use log::debug;
use ndarray::linalg::general_mat_mul;
use ndarray::{s, Array2, ArrayView2, ArrayViewMut2, Axis, Zip};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_stats::QuantileExt;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::f::{self, Activation};
use crate::loss::Loss;
use crate::optim::{Optim, Solver};

/// Batch-sized scratch matrix. The backing storage only grows; every view
/// is resliced to the current batch size, so values never leak between
/// mini-batches of different sizes.
#[derive(Debug, Clone, Default)]
struct Buf {
    data: Vec<f64>,
}

impl Buf {
    fn view_mut(&mut self, rows: usize, cols: usize) -> ArrayViewMut2<'_, f64> {
        let size = rows * cols;
        if self.data.len() < size {
            self.data.resize(size, 0.);
        }
        ArrayViewMut2::from_shape((rows, cols), &mut self.data[..size]).unwrap()
    }

    fn view(&self, rows: usize, cols: usize) -> ArrayView2<'_, f64> {
        ArrayView2::from_shape((rows, cols), &self.data[..rows * cols]).unwrap()
    }
}

/// One affine+activation layer. Theta lives in the owning network's flat
/// parameter buffer; the layer records only its region.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Layer {
    pub activation: Activation,
    /// offset of this layer's Theta region in the flat buffer
    pub theta_off: usize,
    /// 1 + n_inputs; row 0 is the bias row
    pub theta_rows: usize,
    pub theta_cols: usize,
    pub grad: Array2<f64>,
    pub update: Array2<f64>,
    pub optim: Optim,

    #[serde(skip)]
    z: Buf,
    #[serde(skip)]
    ypred: Buf,
    #[serde(skip)]
    ytrue: Buf,
    #[serde(skip)]
    ydiff: Buf,
    #[serde(skip)]
    hgrad: Buf,
}

impl Layer {
    fn new(
        theta_off: usize,
        theta_rows: usize,
        theta_cols: usize,
        activation: Activation,
        optim: Optim,
    ) -> Self {
        Self {
            activation,
            theta_off,
            theta_rows,
            theta_cols,
            grad: Array2::zeros((theta_rows, theta_cols)),
            update: Array2::zeros((theta_rows, theta_cols)),
            optim,
            z: Buf::default(),
            ypred: Buf::default(),
            ytrue: Buf::default(),
            ydiff: Buf::default(),
            hgrad: Buf::default(),
        }
    }

    pub fn theta_len(&self) -> usize {
        self.theta_rows * self.theta_cols
    }

    fn theta_view<'a>(&self, buf: &'a [f64]) -> ArrayView2<'a, f64> {
        ArrayView2::from_shape(
            (self.theta_rows, self.theta_cols),
            &buf[self.theta_off..self.theta_off + self.theta_len()],
        )
        .unwrap()
    }
}

/// Multilayer perceptron trained by mini-batch gradient descent.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MLPRegressor {
    pub hidden_layer_sizes: Vec<usize>,
    pub activation: Activation,
    pub solver: Solver,
    pub loss: Loss,
    /// elastic-net strength; 0 disables regularization
    pub alpha: f64,
    /// blend between L1 (1) and L2 (0) penalty terms
    pub l1_ratio: f64,
    /// rescale a gradient whose L2 norm exceeds this; 0 disables
    pub gradient_clipping: f64,
    /// 0 selects ceil(1e6 / n_samples)
    pub epochs: usize,
    /// 0 selects full-batch
    pub mini_batch_size: usize,

    pub layers: Vec<Layer>,
    theta: Vec<f64>,
    /// loss after the last epoch
    pub j: f64,
    /// loss after the first epoch
    pub j_first: f64,
}

impl MLPRegressor {
    /// `activation` and `solver` are looked up by name; empty strings select
    /// the defaults (relu, adam). Unknown names fail here, not at fit time.
    pub fn new(
        hidden_layer_sizes: Vec<usize>,
        activation: &str,
        solver: &str,
        alpha: f64,
    ) -> Result<Self> {
        let activation = if activation.is_empty() {
            Activation::Relu
        } else {
            activation.parse()?
        };
        let solver = if solver.is_empty() {
            Solver::Adam
        } else {
            solver.parse()?
        };

        Ok(Self {
            hidden_layer_sizes,
            activation,
            solver,
            loss: Loss::Square,
            alpha,
            l1_ratio: 0.,
            gradient_clipping: 0.,
            epochs: 0,
            mini_batch_size: 0,
            layers: vec![],
            theta: vec![],
            j: f64::INFINITY,
            j_first: f64::INFINITY,
        })
    }

    pub fn set_solver(&mut self, solver: Solver) {
        self.solver = solver;
    }

    /// Length of the flat parameter buffer backing every layer's Theta.
    pub fn theta_len(&self) -> usize {
        self.theta.len()
    }

    pub fn theta(&self) -> &[f64] {
        &self.theta
    }

    fn alloc_layers(&mut self, n_features: usize, n_outputs: usize, rng: &mut impl Rng) {
        let output_activation = match self.loss {
            Loss::Log | Loss::CrossEntropy => Activation::Logistic,
            Loss::Square => self.activation,
        };

        let mut shapes = Vec::with_capacity(self.hidden_layer_sizes.len() + 1);
        let mut inputs = n_features;
        for &outputs in &self.hidden_layer_sizes {
            shapes.push((inputs, outputs, self.activation));
            inputs = outputs;
        }
        shapes.push((inputs, n_outputs, output_activation));

        let theta_len: usize = shapes.iter().map(|&(i, o, _)| (1 + i) * o).sum();
        self.theta = (0..theta_len)
            .map(|_| rng.sample::<f64, _>(StandardNormal))
            .collect();

        let mut layers = Vec::with_capacity(shapes.len());
        let mut off = 0;
        for (i, o, act) in shapes {
            let layer = Layer::new(off, 1 + i, o, act, self.solver.optimizer());
            off += layer.theta_len();
            layers.push(layer);
        }
        // the per-layer regions must tile the buffer exactly
        assert_eq!(off, self.theta.len());
        self.layers = layers;
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array2<f64>) -> Result<&mut Self> {
        let (n_samples, n_features) = x.dim();
        let (yn, n_outputs) = y.dim();
        if yn != n_samples || n_samples == 0 {
            return Err(Error::DimensionMismatch {
                expected: x.dim(),
                got: y.dim(),
            });
        }

        let mut rng = rand::thread_rng();
        self.alloc_layers(n_features, n_outputs, &mut rng);
        self.j = f64::INFINITY;
        self.j_first = f64::INFINITY;

        let epochs = if self.epochs == 0 {
            (1e6 / n_samples as f64).ceil() as usize
        } else {
            self.epochs
        };
        for epoch in 0..epochs {
            self.fit_epoch(x, y, epoch, &mut rng)?;
        }
        Ok(self)
    }

    fn fit_epoch(
        &mut self,
        x: &Array2<f64>,
        y: &Array2<f64>,
        epoch: usize,
        rng: &mut impl Rng,
    ) -> Result<()> {
        let n_samples = x.nrows();

        // one permutation, applied to rows and targets jointly
        let mut order: Vec<usize> = (0..n_samples).collect();
        order.shuffle(rng);
        let xs = x.select(Axis(0), &order);
        let ys = y.select(Axis(0), &order);

        let batch = if self.mini_batch_size == 0 {
            n_samples
        } else {
            self.mini_batch_size
        };

        let mut j_sum = 0.;
        let mut start = 0;
        while start < n_samples {
            let end = (start + batch).min(n_samples);
            let xb = xs.slice(s![start..end, ..]);
            let yb = ys.slice(s![start..end, ..]);
            self.predict_zh(&xb)?;
            let j_mini = self.backprop(&xb, &yb)?;
            j_sum += j_mini * (end - start) as f64;
            start = end;
        }

        self.j = j_sum / n_samples as f64;
        if epoch == 0 {
            self.j_first = self.j;
        }
        if epoch % 100 == 0 {
            debug!("epoch {}: loss {:.6}", epoch, self.j);
        }
        Ok(())
    }

    /// Forward pass: each layer computes Z = [1 | X] · Theta, then
    /// H = activation(Z). The leading 1-column realizes the bias row.
    fn predict_zh(&mut self, x: &ArrayView2<f64>) -> Result<()> {
        let n_samples = x.nrows();

        for l in 0..self.layers.len() {
            let (before, rest) = self.layers.split_at_mut(l);
            let layer = &mut rest[0];

            let xl: ArrayView2<f64> = if l == 0 {
                x.view()
            } else {
                let prev = &before[l - 1];
                prev.ypred.view(n_samples, prev.theta_cols)
            };
            if xl.ncols() + 1 != layer.theta_rows {
                return Err(Error::DimensionMismatch {
                    expected: (n_samples, layer.theta_rows - 1),
                    got: xl.dim(),
                });
            }

            let theta = layer.theta_view(&self.theta);
            let w = theta.slice(s![1.., ..]);
            let b = theta.row(0);

            let mut z = layer.z.view_mut(n_samples, layer.theta_cols);
            general_mat_mul(1., &xl, &w, 0., &mut z);
            z += &b;

            let mut h = layer.ypred.view_mut(n_samples, layer.theta_cols);
            layer.activation.forward(&z.view(), &mut h)?;
            if h.iter().any(|v| v.is_nan()) {
                // a NaN here means training diverged; there is no way to
                // continue meaningfully
                panic!("forward pass produced NaN at layer {l}");
            }
        }
        Ok(())
    }

    /// Backward pass, output layer to input layer. Returns the mini-batch
    /// loss including regularization penalties.
    fn backprop(&mut self, x: &ArrayView2<f64>, y: &ArrayView2<f64>) -> Result<f64> {
        let n_samples = x.nrows();
        let n_outputs = y.ncols();
        let output_layer = self.layers.len() - 1;
        let mut j = 0.;

        for l in (0..=output_layer).rev() {
            let (before, rest) = self.layers.split_at_mut(l);
            let (cur, after) = rest.split_at_mut(1);
            let layer = &mut cur[0];
            let cols = layer.theta_cols;

            let xl: ArrayView2<f64> = if l == 0 {
                x.view()
            } else {
                let prev = &before[l - 1];
                prev.ypred.view(n_samples, prev.theta_cols)
            };

            // this layer's activation derivative at its own output
            {
                let h = layer.ypred.view(n_samples, cols);
                let mut hg = layer.hgrad.view_mut(n_samples, cols);
                layer.activation.grad(&h, &mut hg)?;
            }

            if l == output_layer {
                {
                    let mut yt = layer.ytrue.view_mut(n_samples, cols);
                    yt.assign(y);
                }
                // binary cross-entropy is the single-output specialization
                // of the log loss
                let last_loss = if self.loss == Loss::Log && n_outputs == 1 {
                    Loss::CrossEntropy
                } else {
                    self.loss
                };
                let yt = layer.ytrue.view(n_samples, cols);
                let h = layer.ypred.view(n_samples, cols);
                let mut yd = layer.ydiff.view_mut(n_samples, cols);
                j = last_loss.loss(&yt, &h, Some(&mut yd))?;
            } else {
                // propagate the next layer's error through its weights,
                // excluding the bias row
                let next = &after[0];
                let d_next = next.ydiff.view(n_samples, next.theta_cols);
                let theta_next = next.theta_view(&self.theta);
                let w_next = theta_next.slice(s![1.., ..]);
                {
                    let mut yd = layer.ydiff.view_mut(n_samples, cols);
                    general_mat_mul(1., &d_next, &w_next.t(), 0., &mut yd);
                    yd *= &layer.hgrad.view(n_samples, cols);
                }
                {
                    let h = layer.ypred.view(n_samples, cols);
                    let yd = layer.ydiff.view(n_samples, cols);
                    let mut yt = layer.ytrue.view_mut(n_samples, cols);
                    Zip::from(&mut yt)
                        .and(&h)
                        .and(&yd)
                        .for_each(|t, &p, &d| *t = p - d);
                }
                // square loss keeps the accumulation path uniform; the
                // scalar is bookkeeping only and does not enter J
                let yt = layer.ytrue.view(n_samples, cols);
                let h = layer.ypred.view(n_samples, cols);
                let mut yd = layer.ydiff.view_mut(n_samples, cols);
                Loss::Square.loss(&yt, &h, Some(&mut yd))?;
            }

            // convert the propagated error into a gradient wrt this layer's
            // own pre-activation, then accumulate over the bias-extended
            // input
            {
                let mut yd = layer.ydiff.view_mut(n_samples, cols);
                yd *= &layer.hgrad.view(n_samples, cols);
            }
            {
                let yd = layer.ydiff.view(n_samples, cols);
                layer.grad.row_mut(0).assign(&yd.sum_axis(Axis(0)));
                let mut gw = layer.grad.slice_mut(s![1.., ..]);
                general_mat_mul(1., &xl.t(), &yd, 0., &mut gw);
            }

            // elastic-net penalty on everything but the bias row
            if self.alpha > 0. {
                let n = n_samples as f64;
                let theta = layer.theta_view(&self.theta);
                let theta_reg = theta.slice(s![1.., ..]);
                if self.l1_ratio > 0. {
                    j += self.alpha * self.l1_ratio / n * theta_reg.mapv(f64::abs).sum();
                    let scale = self.alpha * self.l1_ratio / n;
                    let mut gw = layer.grad.slice_mut(s![1.., ..]);
                    gw.zip_mut_with(&theta_reg, |g, &t| *g += scale * f::sgn(t));
                }
                if self.l1_ratio < 1. {
                    j += self.alpha * (1. - self.l1_ratio) / 2. / n * theta_reg.pow2().sum();
                    let scale = self.alpha * (1. - self.l1_ratio) / n;
                    let mut gw = layer.grad.slice_mut(s![1.., ..]);
                    gw.zip_mut_with(&theta_reg, |g, &t| *g += scale * t);
                }
            }

            if self.gradient_clipping > 0. {
                f::clip_grad(&mut layer.grad, self.gradient_clipping);
            }

            let off = layer.theta_off;
            let rows = layer.theta_rows;
            {
                let Layer {
                    optim,
                    update,
                    grad,
                    ..
                } = &mut *layer;
                optim.compute_update(update, grad);
            }
            let region = &mut self.theta[off..off + rows * cols];
            let mut th = ArrayViewMut2::from_shape((rows, cols), region).unwrap();
            th += &layer.update;
        }

        Ok(j)
    }

    pub fn predict(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.layers.is_empty() {
            return Err(Error::NotFitted);
        }
        self.predict_zh(&x.view())?;
        let last = self.layers.last().unwrap();
        Ok(last.ypred.view(x.nrows(), last.theta_cols).to_owned())
    }

    /// Coefficient of determination of the predictions.
    pub fn score(&mut self, x: &Array2<f64>, y: &Array2<f64>) -> Result<f64> {
        let pred = self.predict(x)?;
        f::r2_score(&y.view(), &pred.view())
    }
}

/// MLP classifier: a regressor trained under the log loss, with
/// label-producing predict.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MLPClassifier {
    pub base: MLPRegressor,
}

impl MLPClassifier {
    pub fn new(
        hidden_layer_sizes: Vec<usize>,
        activation: &str,
        solver: &str,
        alpha: f64,
    ) -> Result<Self> {
        let mut base = MLPRegressor::new(hidden_layer_sizes, activation, solver, alpha)?;
        base.loss = Loss::Log;
        Ok(Self { base })
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array2<f64>) -> Result<&mut Self> {
        self.base.fit(x, y)?;
        Ok(self)
    }

    /// Raw probability outputs of the network.
    pub fn predict_proba(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.base.predict(x)
    }

    /// Hard labels: 0/1 threshold for a single output, row argmax one-hot
    /// otherwise.
    pub fn predict(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let proba = self.predict_proba(x)?;
        let mut labels = Array2::zeros(proba.dim());

        if proba.ncols() == 1 {
            Zip::from(&mut labels)
                .and(&proba)
                .for_each(|l, &p| *l = if p > 0.5 { 1. } else { 0. });
        } else {
            for (mut lrow, prow) in labels.rows_mut().into_iter().zip(proba.rows()) {
                if let Ok(k) = prow.argmax() {
                    lrow[k] = 1.;
                }
            }
        }
        Ok(labels)
    }

    /// Fraction of correctly labeled rows.
    pub fn score(&mut self, x: &Array2<f64>, y: &Array2<f64>) -> Result<f64> {
        let labels = self.predict(x)?;
        f::accuracy_score(&y.view(), &labels.view())
    }
}
