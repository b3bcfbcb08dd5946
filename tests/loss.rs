use approx::assert_abs_diff_eq;
use minilearn::loss::Loss;
use ndarray::{array, Array2};
use ndarray_rand::{rand_distr::Uniform, RandomExt};

#[test]
fn loss_registry_resolves_known_names() {
    for name in ["square", "log", "cross-entropy"] {
        assert!(name.parse::<Loss>().is_ok(), "{name} did not resolve");
    }
    assert!("hinge".parse::<Loss>().is_err());
    assert!("".parse::<Loss>().is_err());
}

#[test]
fn square_loss_vanishes_at_equality_for_every_shape() {
    for shape in [(1, 1), (5, 2), (7, 3)] {
        let y = Array2::random(shape, Uniform::new(-5., 5.));
        let mut grad = Array2::ones(shape);

        let j = Loss::Square
            .loss(&y.view(), &y.view(), Some(&mut grad.view_mut()))
            .unwrap();
        assert_eq!(j, 0., "shape {shape:?}");
        assert!(grad.iter().all(|&g| g == 0.), "shape {shape:?}");
    }
}

#[test]
fn cross_entropy_is_symmetric_under_relabeling() {
    let y = Array2::random((30, 1), Uniform::new(0., 1.)).mapv(f64::round);
    let h = Array2::random((30, 1), Uniform::new(0.05, 0.95));

    let j = Loss::CrossEntropy.loss(&y.view(), &h.view(), None).unwrap();
    let j_flipped = Loss::CrossEntropy
        .loss(
            &y.mapv(|v| 1. - v).view(),
            &h.mapv(|v| 1. - v).view(),
            None,
        )
        .unwrap();

    assert_abs_diff_eq!(j, j_flipped, epsilon = 1e-12);
}

#[test]
fn loss_gradients_match_numeric_derivative() {
    for loss in [Loss::Square, Loss::Log, Loss::CrossEntropy] {
        let n = 6;
        let y = Array2::random((n, 1), Uniform::new(0., 1.)).mapv(f64::round);
        let mut h = Array2::random((n, 1), Uniform::new(0.1, 0.9));

        let mut grad = Array2::zeros((n, 1));
        loss.loss(&y.view(), &h.view(), Some(&mut grad.view_mut()))
            .unwrap();

        let eps = 1e-7;
        for i in 0..n {
            let orig = h[[i, 0]];
            h[[i, 0]] = orig + eps;
            let jp = loss.loss(&y.view(), &h.view(), None).unwrap();
            h[[i, 0]] = orig - eps;
            let jm = loss.loss(&y.view(), &h.view(), None).unwrap();
            h[[i, 0]] = orig;

            assert_abs_diff_eq!(grad[[i, 0]], (jp - jm) / (2. * eps), epsilon = 1e-5);
        }
    }
}

#[test]
fn log_loss_stays_finite_at_zero_predictions() {
    let y = array![[1.], [0.]];
    let h = array![[0.], [0.]];
    let mut grad = Array2::zeros((2, 1));

    let j = Loss::Log
        .loss(&y.view(), &h.view(), Some(&mut grad.view_mut()))
        .unwrap();
    assert!(j.is_finite());
    assert!(grad.iter().all(|g| g.is_finite()));
}

#[test]
fn cross_entropy_stays_finite_at_saturated_predictions() {
    let y = array![[1.], [0.]];
    let h = array![[0.], [1.]];
    let mut grad = Array2::zeros((2, 1));

    let j = Loss::CrossEntropy
        .loss(&y.view(), &h.view(), Some(&mut grad.view_mut()))
        .unwrap();
    assert!(j.is_finite());
    assert!(grad.iter().all(|g| g.is_finite()));
}

#[test]
fn losses_reject_mismatched_shapes() {
    let y = Array2::<f64>::zeros((2, 2));
    let h = Array2::<f64>::zeros((2, 3));
    assert!(Loss::Square.loss(&y.view(), &h.view(), None).is_err());
}
