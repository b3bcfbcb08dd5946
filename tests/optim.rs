use minilearn::optim::Solver;
use ndarray::Array2;

#[test]
fn solver_registry_resolves_known_names() {
    for name in ["agd", "adagrad", "rmsprop", "adadelta", "adam"] {
        assert!(name.parse::<Solver>().is_ok(), "{name} did not resolve");
    }
    assert!("lbfgs".parse::<Solver>().is_err());
}

#[test]
fn every_solver_descends_a_quadratic() {
    // J = ||theta||^2 / 2, so grad = theta
    for name in ["agd", "adagrad", "rmsprop", "adadelta", "adam"] {
        let solver: Solver = name.parse().unwrap();
        let mut optim = solver.optimizer();

        let mut theta = Array2::from_elem((3, 2), 1.);
        let mut update = Array2::zeros((3, 2));
        let start = theta.pow2().sum();

        for _ in 0..200 {
            let grad = theta.clone();
            optim.compute_update(&mut update, &grad);
            theta += &update;
        }

        let end = theta.pow2().sum();
        assert!(
            end < start,
            "{name} failed to reduce the objective: {start} -> {end}"
        );
    }
}

#[test]
fn solver_state_resizes_with_the_gradient() {
    let mut optim = "adam".parse::<Solver>().unwrap().optimizer();

    let mut update = Array2::zeros((2, 2));
    optim.compute_update(&mut update, &Array2::from_elem((2, 2), 1.));

    // a new shape must not reuse stale moment estimates
    let mut update = Array2::zeros((4, 3));
    optim.compute_update(&mut update, &Array2::from_elem((4, 3), 1.));
    assert!(update.iter().all(|u| u.is_finite()));
}
