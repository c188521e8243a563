use super::*;

use std::convert::Infallible;

use approx::assert_relative_eq;
use proptest::prelude::*;

// --- Test fixtures ---

fn parabola(x: f64) -> Result<f64, Infallible> {
    Ok(2.0 - x * x)
}

// --- Tests ---

#[test]
fn finds_root_on_the_non_positive_side() {
    let solution =
        bisect_unobserved(parabola, [0.0, 2.0], &Config::default()).expect("should solve");

    assert_eq!(solution.status, Status::Converged);
    assert!(solution.x >= std::f64::consts::SQRT_2);
    assert!(solution.residual <= 0.0);
    assert_relative_eq!(solution.x, std::f64::consts::SQRT_2, epsilon = 1e-10);
    assert!(solution.bracket[0] < solution.bracket[1]);
}

#[test]
fn exact_zero_stops_immediately() {
    let line = |x: f64| Ok::<_, Infallible>(0.5 - x);
    let solution =
        bisect_unobserved(line, [0.0, 1.0], &Config::default()).expect("should solve");

    assert_eq!(solution.status, Status::Converged);
    assert_eq!(solution.iters, 1);
    assert_relative_eq!(solution.x, 0.5);
    assert_relative_eq!(solution.residual, 0.0);
}

#[test]
fn reversed_sign_change_is_located() {
    let solution =
        bisect_unobserved(|x| Ok::<_, Infallible>(x - 0.3), [0.0, 1.0], &Config::default())
            .expect("should solve");

    assert_eq!(solution.status, Status::Converged);
    assert!(solution.x <= 0.3);
    assert_relative_eq!(solution.x, 0.3, epsilon = 1e-10);
}

#[test]
fn reports_iteration_cap() {
    let config = Config::new(3, 0.0, 0.0, 0.0).expect("valid config");
    let solution = bisect_unobserved(parabola, [0.0, 2.0], &config).expect("should run");

    assert_eq!(solution.status, Status::MaxIters);
    assert_eq!(solution.iters, 3);
    assert_eq!(solution.bracket, [1.25, 1.5]);
    assert_relative_eq!(solution.x, 1.5);
}

#[test]
fn observer_can_stop_early() {
    let observer = |event: &Event| (event.iter == 3).then_some(Action::StopEarly);
    let solution = bisect(parabola, [0.0, 2.0], &Config::default(), observer).expect("should stop");

    assert_eq!(solution.status, Status::StoppedByObserver);
    assert_eq!(solution.iters, 3);
}

#[test]
fn observer_can_assume_sign() {
    // Treating every midpoint as positive drives the bracket to the right end.
    let config = Config::new(10, 0.0, 0.0, 0.0).expect("valid config");
    let observer = |_: &Event| Some(Action::assume_positive());
    let solution = bisect(parabola, [0.0, 2.0], &config, observer).expect("should run");

    assert_relative_eq!(solution.x, 2.0);
    assert!(solution.bracket[0] > 1.99);
}

#[test]
fn events_report_midpoints() {
    let mut seen = Vec::new();
    let config = Config::new(2, 0.0, 0.0, 0.0).expect("valid config");
    bisect(parabola, [0.0, 2.0], &config, |event: &Event| {
        seen.push((event.iter, event.x, event.bracket));
        None
    })
    .expect("should run");

    assert_eq!(seen, vec![(1, 1.0, [0.0, 2.0]), (2, 1.5, [1.0, 2.0])]);
}

#[test]
fn invalid_bracket_is_an_error() {
    let result = bisect_unobserved(parabola, [0.0, 1.0], &Config::default());
    assert!(matches!(
        result,
        Err(Error::InvalidBracket(BracketError::NoSignChange(..)))
    ));
}

#[test]
fn function_errors_propagate() {
    let result = bisect_unobserved(
        |x: f64| if x > 0.5 && x < 1.5 { Err(std::fmt::Error) } else { Ok(1.0 - x) },
        [0.0, 2.0],
        &Config::default(),
    );
    assert!(matches!(result, Err(Error::Function(_))));
}

#[test]
fn config_rejects_bad_tolerances() {
    assert_eq!(Config::new(10, -1.0, 0.0, 0.0), Err(ConfigError::XAbs));
    assert_eq!(Config::new(10, 0.0, f64::NAN, 0.0), Err(ConfigError::XRel));
    assert_eq!(Config::new(10, 0.0, 0.0, f64::INFINITY), Err(ConfigError::Residual));
}

proptest! {
    #[test]
    fn root_is_never_before_the_crossing(root in 0.001f64..0.999) {
        let solution = bisect_unobserved(
            |x| Ok::<_, Infallible>(root - x),
            [0.0, 1.0],
            &Config::default(),
        )
        .expect("should solve");

        prop_assert!(solution.x >= root);
        prop_assert!(solution.x - root <= 1e-10);
    }
}
