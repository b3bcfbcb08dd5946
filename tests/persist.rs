use minilearn::linear::BayesianRidge;
use minilearn::nn::MLPRegressor;
use minilearn::persist;
use ndarray::{Array1, Array2, Axis};
use ndarray_rand::{rand_distr::Uniform, RandomExt};

#[test]
fn saved_mlp_predicts_identically_after_reload() {
    let x = Array2::random((200, 3), Uniform::new(0., 1.));
    let y = x
        .map_axis(Axis(1), |r| r[0] + 2. * r[1] - r[2])
        .insert_axis(Axis(1));

    let mut regr = MLPRegressor::new(vec![3], "tanh", "adam", 0.).unwrap();
    regr.epochs = 5;
    regr.mini_batch_size = 50;
    regr.fit(&x, &y).unwrap();
    let before = regr.predict(&x).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mlp.bin");
    persist::save(&regr, &path).unwrap();

    let mut loaded: MLPRegressor = persist::load(&path).unwrap();
    let after = loaded.predict(&x).unwrap();
    assert_eq!(before, after);
}

#[test]
fn saved_bayesian_ridge_round_trips() {
    let x = Array2::random((300, 2), Uniform::new(-1., 1.));
    let y = x.map_axis(Axis(1), |r| 0.5 + 3. * r[0] - 2. * r[1])
        + Array1::random(300, Uniform::new(-0.05, 0.05));

    let mut model = BayesianRidge::new();
    model.normalize = true;
    model.fit(&x, &y).unwrap();
    let before = model.predict(&x).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bayes.bin");
    persist::save(&model, &path).unwrap();

    let loaded: BayesianRidge = persist::load(&path).unwrap();
    let after = loaded.predict(&x).unwrap();
    assert_eq!(before, after);
}
