use minilearn::linear::BayesianRidge;
use ndarray::{array, Array1, Array2, Axis};
use ndarray_rand::{rand_distr::Uniform, RandomExt};

fn synthetic(n: usize, lo: f64, hi: f64, noise: f64) -> (Array2<f64>, Array1<f64>) {
    let x = Array2::random((n, 3), Uniform::new(lo, hi));
    let y = x.map_axis(Axis(1), |r| 1. + 2. * r[0] + 3. * r[1] + 4. * r[2])
        + Array1::random(n, Uniform::new(-noise, noise));
    (x, y)
}

#[test]
fn recovers_known_linear_coefficients() {
    for normalize in [false, true] {
        let (x, y) = synthetic(10_000, -10., 10., 0.25);

        let mut model = BayesianRidge::new();
        model.normalize = normalize;
        model.compute_score = true;
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&array![[7., 8., 9.]]).unwrap();
        let expected = 1. + 2. * 7. + 3. * 8. + 4. * 9.;
        assert!(
            (pred[0] - expected).abs() < 0.1,
            "normalize={normalize}: predicted {} expected {expected}",
            pred[0]
        );
        assert!(model.n_iter >= 1 && model.n_iter <= model.max_iter);
        println!(
            "normalize={normalize}: coef {:?} intercept {} after {} iterations",
            model.coef, model.intercept, model.n_iter
        );
    }
}

#[test]
fn score_is_high_on_a_near_noiseless_relationship() {
    let (x, y) = synthetic(5_000, 0., 1., 0.25);

    let mut model = BayesianRidge::new();
    model.fit(&x, &y).unwrap();

    let score = model.score(&x, &y).unwrap();
    assert!(score > 0.95, "r2 = {score}");
}

#[test]
fn score_trace_is_non_decreasing_at_convergence() {
    let (x, y) = synthetic(2_000, -1., 1., 0.1);

    let mut model = BayesianRidge::new();
    model.compute_score = true;
    model.fit(&x, &y).unwrap();

    assert_eq!(model.scores.len(), model.n_iter);
    for w in model.scores.windows(2).rev().take(3) {
        let slack = 1e-6 * (w[0].abs() + 1.);
        assert!(
            w[1] >= w[0] - slack,
            "marginal likelihood decreased near convergence: {w:?}"
        );
    }
}

#[test]
fn predictive_std_is_positive_and_grows_off_distribution() {
    let (x, y) = synthetic(1_000, 0., 1., 0.1);

    let mut model = BayesianRidge::new();
    model.fit(&x, &y).unwrap();

    let (mean, std) = model
        .predict_with_std(&array![[0.5, 0.5, 0.5], [50., 50., 50.]])
        .unwrap();
    assert_eq!(mean.len(), 2);
    assert!(std.iter().all(|&s| s > 0.));
    assert!(
        std[1] > std[0],
        "uncertainty should grow far from the data: {std:?}"
    );
}

#[test]
fn score_handles_constant_targets() {
    let x = Array2::random((50, 2), Uniform::new(0., 1.));
    let y = Array1::from_elem(50, 2.5);

    let mut model = BayesianRidge::new();
    model.fit(&x, &y).unwrap();
    assert_eq!(model.score(&x, &y).unwrap(), 0.);
}

#[test]
fn predict_before_fit_is_an_error() {
    let model = BayesianRidge::new();
    assert!(model.predict(&array![[1., 2.]]).is_err());
}

#[test]
fn fit_rejects_mismatched_targets() {
    let x = Array2::random((10, 2), Uniform::new(0., 1.));
    let y = Array1::zeros(7);
    assert!(BayesianRidge::new().fit(&x, &y).is_err());
}
