//! Integration tests for the GPB2 mixture smoother
//!
//! Covers the boundary condition, responsibility normalization, weight
//! conservation, the cross-covariance stores consumed by EM, determinism,
//! and error propagation.

use gpb2_smoothers::model::{LinearModel, SwitchingModel};
use gpb2_smoothers::sequence::GmmSequence;
use gpb2_smoothers::smoother::gpb2;
use gpb2_smoothers::types::{Gaussian, Gmm, Grid};
use gpb2_smoothers::SmootherError;
use nalgebra::{DMatrix, DVector};

fn scalar(v: f64) -> DMatrix<f64> {
    DMatrix::from_vec(1, 1, vec![v])
}

fn two_regime_model(z: DMatrix<f64>) -> SwitchingModel {
    SwitchingModel::new(
        vec![
            LinearModel::random_walk(1, 0.01, 0.5),
            LinearModel::random_walk(1, 1.0, 0.5),
        ],
        z,
    )
    .unwrap()
}

fn uniform_z() -> DMatrix<f64> {
    DMatrix::from_row_slice(2, 2, &[0.5, 0.5, 0.5, 0.5])
}

/// Two time steps with uniform filtered weights in both mixtures.
fn uniform_two_step_sequence() -> GmmSequence {
    let filtered = vec![
        Gmm::uniform(vec![
            Gaussian::new(DVector::from_vec(vec![0.0]), scalar(1.0)),
            Gaussian::new(DVector::from_vec(vec![0.2]), scalar(2.0)),
        ]),
        Gmm::uniform(vec![
            Gaussian::new(DVector::from_vec(vec![1.0]), scalar(0.5)),
            Gaussian::new(DVector::from_vec(vec![1.3]), scalar(1.5)),
        ]),
    ];
    let crossvar = Grid::from_element(2, vec![scalar(0.0), scalar(0.3)]);
    GmmSequence::new(filtered, crossvar).unwrap()
}

#[test]
fn test_boundary_collapsed_smoothed_equals_filtered() {
    let model = two_regime_model(uniform_z());
    let seq = uniform_two_step_sequence();
    let smoothed = gpb2::smooth_sequence(seq, &model).unwrap();

    let last = smoothed.len() - 1;
    assert_eq!(
        smoothed.smoothed_collapsed[last].mean,
        smoothed.filtered_collapsed[last].mean
    );
    assert_eq!(
        smoothed.smoothed_collapsed[last].covar,
        smoothed.filtered_collapsed[last].covar
    );
    for k in 0..2 {
        assert_eq!(
            smoothed.smoothed[last].components[k].mean,
            smoothed.filtered[last].components[k].mean
        );
    }
}

#[test]
fn test_uniform_scenario_responsibilities() {
    // Uniform Z and uniform weights at both times make the backward and
    // forward responsibilities uniform and the smoothed weights [0.5, 0.5].
    let model = two_regime_model(uniform_z());
    let seq = uniform_two_step_sequence();
    let smoothed = gpb2::smooth_sequence(seq, &model).unwrap();

    let gmm = &smoothed.smoothed[0];
    assert!((gmm.weights[0] - 0.5).abs() < 1e-12);
    assert!((gmm.weights[1] - 0.5).abs() < 1e-12);

    let w_t = gmm.pr_stplus1_st.as_ref().expect("responsibilities stored");
    for j in 0..2 {
        for k in 0..2 {
            assert!((w_t[(j, k)] - 0.5).abs() < 1e-12);
        }
    }
}

#[test]
fn test_weights_and_responsibilities_normalize() {
    let model = two_regime_model(DMatrix::from_row_slice(2, 2, &[0.8, 0.2, 0.3, 0.7]));

    let filtered = vec![
        Gmm::new(
            vec![
                Gaussian::new(DVector::from_vec(vec![0.0]), scalar(1.0)),
                Gaussian::new(DVector::from_vec(vec![0.4]), scalar(2.0)),
            ],
            DVector::from_vec(vec![0.65, 0.35]),
        ),
        Gmm::new(
            vec![
                Gaussian::new(DVector::from_vec(vec![0.9]), scalar(0.6)),
                Gaussian::new(DVector::from_vec(vec![1.4]), scalar(1.1)),
            ],
            DVector::from_vec(vec![0.55, 0.45]),
        ),
        Gmm::new(
            vec![
                Gaussian::new(DVector::from_vec(vec![1.8]), scalar(0.5)),
                Gaussian::new(DVector::from_vec(vec![2.2]), scalar(0.9)),
            ],
            DVector::from_vec(vec![0.4, 0.6]),
        ),
    ];
    let crossvar = Grid::from_element(2, vec![scalar(0.0), scalar(0.25), scalar(0.2)]);
    let seq = GmmSequence::new(filtered, crossvar).unwrap();

    let smoothed = gpb2::smooth_sequence(seq, &model).unwrap();

    for t in 0..smoothed.len() - 1 {
        let gmm = &smoothed.smoothed[t];
        assert!(
            (gmm.weights.sum() - 1.0).abs() < 1e-10,
            "weights not normalized at t={}",
            t
        );

        let w_t = gmm.pr_stplus1_st.as_ref().expect("responsibilities stored");
        for j in 0..2 {
            let row_sum: f64 = w_t.row(j).iter().sum();
            assert!((row_sum - 1.0).abs() < 1e-10, "W_t row {} at t={}", j, t);
        }
    }
}

#[test]
fn test_cross_covariance_stores_are_populated() {
    let model = two_regime_model(DMatrix::from_row_slice(2, 2, &[0.9, 0.1, 0.2, 0.8]));
    let seq = uniform_two_step_sequence();
    let smoothed = gpb2::smooth_sequence(seq, &model).unwrap();

    // Per-pair smoothed cross-covariances at t+1 = 1.
    for j in 0..2 {
        for k in 0..2 {
            let cell = &smoothed.smoothed_crossvar.get(j, k)[1];
            assert!(cell[(0, 0)].is_finite());
            assert!(cell[(0, 0)].abs() > 0.0, "empty store at ({}, {})", j, k);
        }
    }

    // Collapsed (regime-free) cross-covariance at t+1 = 1.
    let collapsed = &smoothed.smoothed_crossvar_collapsed[1];
    assert!(collapsed[(0, 0)].is_finite());
    assert!(collapsed[(0, 0)].abs() > 0.0);
}

#[test]
fn test_smoothing_pass_is_deterministic() {
    let model = two_regime_model(DMatrix::from_row_slice(2, 2, &[0.8, 0.2, 0.3, 0.7]));
    let seq = uniform_two_step_sequence();

    let a = gpb2::smooth_sequence(seq.clone(), &model).unwrap();
    let b = gpb2::smooth_sequence(seq, &model).unwrap();

    for t in 0..a.len() {
        assert_eq!(a.smoothed_collapsed[t].mean, b.smoothed_collapsed[t].mean);
        assert_eq!(a.smoothed_collapsed[t].covar, b.smoothed_collapsed[t].covar);
        for k in 0..2 {
            assert_eq!(
                a.smoothed[t].components[k].mean,
                b.smoothed[t].components[k].mean
            );
        }
    }
    assert_eq!(
        a.smoothed_crossvar_collapsed[1],
        b.smoothed_crossvar_collapsed[1]
    );
}

#[test]
fn test_singular_pairwise_covariance_raises_error() {
    // A regime with zero process noise and a zero filtered covariance makes
    // one pairwise predicted covariance singular.
    let model = SwitchingModel::new(
        vec![
            LinearModel::new(scalar(1.0), scalar(0.0), scalar(1.0), scalar(1.0)),
            LinearModel::random_walk(1, 1.0, 0.5),
        ],
        uniform_z(),
    )
    .unwrap();

    let filtered = vec![
        Gmm::uniform(vec![
            Gaussian::new(DVector::from_vec(vec![0.0]), scalar(0.0)),
            Gaussian::new(DVector::from_vec(vec![0.2]), scalar(2.0)),
        ]),
        Gmm::uniform(vec![
            Gaussian::new(DVector::from_vec(vec![1.0]), scalar(0.5)),
            Gaussian::new(DVector::from_vec(vec![1.3]), scalar(1.5)),
        ]),
    ];
    let crossvar = Grid::from_element(2, vec![scalar(0.0), scalar(0.3)]);
    let seq = GmmSequence::new(filtered, crossvar).unwrap();

    let err = gpb2::smooth_sequence(seq, &model).unwrap_err();
    assert!(matches!(err, SmootherError::SingularMatrix { .. }));
}
