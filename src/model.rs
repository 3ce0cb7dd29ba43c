//! Nine-parameter activity derivative model.
//!
//! ```text
//! predicted = a1
//! if x_i != 0:
//!     predicted += a2 * x_i^b1
//!     for each x_j != 0:
//!         predicted += (a3 + a4 * x_i^b2) * (a5 + a6 * x_j^b3)
//! ```
//!
//! Every power and logarithm is taken over [`power_base`], which clamps
//! negative activity to zero and shifts by [`EPSILON`]. The forward pass and
//! every partial derivative share the same bases, so the gradient always
//! matches the function being evaluated.

use serde::{Deserialize, Serialize};

use crate::dataset::{Example, Feature};

/// Shift applied to activity before exponentiation.
pub const EPSILON: f64 = 1e-8;

pub const PARAMETER_COUNT: usize = 9;

/// Parameter names in chromosome order.
pub const PARAMETER_NAMES: [&str; PARAMETER_COUNT] =
    ["a1", "a2", "a3", "a4", "a5", "a6", "b1", "b2", "b3"];

/// Partial derivatives of a prediction, in chromosome order.
pub type Gradient = [f64; PARAMETER_COUNT];

/// Strictly positive base used for every power and logarithm.
pub fn power_base(x: f64) -> f64 {
    x.max(0.0) + EPSILON
}

/// One candidate model: six coefficients and three exponents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
    pub a4: f64,
    pub a5: f64,
    pub a6: f64,
    pub b1: f64,
    pub b2: f64,
    pub b3: f64,
}

impl Parameters {
    /// Every parameter set to `value`.
    pub fn splat(value: f64) -> Self {
        Self::from_array([value; PARAMETER_COUNT])
    }

    pub fn from_array(genes: [f64; PARAMETER_COUNT]) -> Self {
        let [a1, a2, a3, a4, a5, a6, b1, b2, b3] = genes;
        Self {
            a1,
            a2,
            a3,
            a4,
            a5,
            a6,
            b1,
            b2,
            b3,
        }
    }

    pub fn to_array(&self) -> [f64; PARAMETER_COUNT] {
        [
            self.a1, self.a2, self.a3, self.a4, self.a5, self.a6, self.b1, self.b2, self.b3,
        ]
    }

    /// Name of the first non-finite parameter, if any.
    pub fn first_non_finite(&self) -> Option<&'static str> {
        self.to_array()
            .iter()
            .zip(PARAMETER_NAMES)
            .find(|(value, _)| !value.is_finite())
            .map(|(_, name)| name)
    }

    /// Predicted derivative for one feature.
    pub fn predict(&self, feature: &Feature) -> f64 {
        let x_i = feature.own_activity;
        let mut predicted = self.a1;
        if x_i == 0.0 {
            return predicted;
        }

        let u = power_base(x_i);
        predicted += self.a2 * u.powf(self.b1);

        let own = self.a3 + self.a4 * u.powf(self.b2);
        for &x_j in feature.neighbor_activities.iter().filter(|&&x| x != 0.0) {
            predicted += own * (self.a5 + self.a6 * power_base(x_j).powf(self.b3));
        }
        predicted
    }

    /// Prediction together with its partial derivatives.
    pub fn evaluate(&self, feature: &Feature) -> (f64, Gradient) {
        let mut grad = [0.0; PARAMETER_COUNT];
        grad[0] = 1.0;

        let x_i = feature.own_activity;
        if x_i == 0.0 {
            return (self.a1, grad);
        }

        let u = power_base(x_i);
        let ln_u = u.ln();
        let u_b1 = u.powf(self.b1);
        let u_b2 = u.powf(self.b2);
        let own = self.a3 + self.a4 * u_b2;

        let mut predicted = self.a1 + self.a2 * u_b1;
        grad[1] = u_b1;
        grad[6] = self.a2 * u_b1 * ln_u;

        for &x_j in feature.neighbor_activities.iter().filter(|&&x| x != 0.0) {
            let w = power_base(x_j);
            let w_b3 = w.powf(self.b3);
            let neighbor = self.a5 + self.a6 * w_b3;

            predicted += own * neighbor;
            grad[2] += neighbor;
            grad[3] += u_b2 * neighbor;
            grad[4] += own;
            grad[5] += own * w_b3;
            grad[7] += self.a4 * u_b2 * ln_u * neighbor;
            grad[8] += own * self.a6 * w_b3 * w.ln();
        }

        (predicted, grad)
    }

    /// Mean squared error over `examples`; NaN for an empty slice.
    pub fn mse(&self, examples: &[Example]) -> f64 {
        let sum: f64 = examples
            .iter()
            .map(|example| {
                let residual = example.target - self.predict(&example.feature);
                residual * residual
            })
            .sum();
        sum / examples.len() as f64
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::splat(0.1)
    }
}

impl std::fmt::Display for Parameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (name, value)) in PARAMETER_NAMES.iter().zip(self.to_array()).enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}={:.6}", name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(own: f64, neighbors: &[f64]) -> Feature {
        Feature::new(own, neighbors.to_vec())
    }

    fn sample_parameters() -> Parameters {
        Parameters::from_array([0.3, -0.7, 0.4, 1.1, -0.2, 0.9, 0.6, -0.4, 1.3])
    }

    #[test]
    fn zero_own_activity_predicts_baseline() {
        let params = sample_parameters();
        for neighbors in [vec![], vec![0.0], vec![3.0, -2.0, 7.5]] {
            let f = feature(0.0, &neighbors);
            assert_eq!(params.predict(&f), params.a1);
            assert_eq!(params.evaluate(&f).0, params.a1);
        }
    }

    #[test]
    fn scenario_prediction_and_error() {
        let params = Parameters::from_array([1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let examples = vec![
            Example::new(feature(2.0, &[1.0, 0.0]), 5.0),
            Example::new(feature(0.0, &[]), 0.0),
        ];

        assert!((params.predict(&examples[0].feature) - 5.0).abs() < 1e-6);
        assert_eq!(params.predict(&examples[1].feature), 1.0);
        assert!((params.mse(&examples) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn zero_neighbors_contribute_nothing() {
        let params = sample_parameters();
        let with_zeros = feature(2.5, &[0.0, 4.0, 0.0]);
        let without = feature(2.5, &[4.0]);
        assert_eq!(params.predict(&with_zeros), params.predict(&without));
    }

    #[test]
    fn negative_and_fractional_inputs_stay_finite() {
        let params = Parameters::from_array([0.1, 0.5, 0.2, 0.3, 0.4, 0.5, -0.5, 0.5, -1.5]);
        let f = feature(-3.0, &[-1.0, 0.5]);
        let (predicted, grad) = params.evaluate(&f);

        assert!(predicted.is_finite());
        assert!(grad.iter().all(|g| g.is_finite()));
        assert_eq!(predicted, params.predict(&f));
    }

    #[test]
    fn evaluate_matches_predict() {
        let params = sample_parameters();
        for f in [
            feature(1.0, &[]),
            feature(3.0, &[1.0, 2.0]),
            feature(0.5, &[0.0, 6.0, 2.0]),
        ] {
            let (predicted, _) = params.evaluate(&f);
            assert!((predicted - params.predict(&f)).abs() < 1e-12);
        }
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let params = sample_parameters();
        let h = 1e-6;

        for f in [
            feature(2.0, &[1.0, 3.0]),
            feature(0.7, &[0.0, 5.0]),
            feature(4.0, &[]),
        ] {
            let (_, grad) = params.evaluate(&f);
            for k in 0..PARAMETER_COUNT {
                let mut plus = params.to_array();
                let mut minus = params.to_array();
                plus[k] += h;
                minus[k] -= h;
                let numeric = (Parameters::from_array(plus).predict(&f)
                    - Parameters::from_array(minus).predict(&f))
                    / (2.0 * h);
                assert!(
                    (numeric - grad[k]).abs() < 1e-5 * (1.0 + numeric.abs()),
                    "d/d{} mismatch: analytic {} numeric {}",
                    PARAMETER_NAMES[k],
                    grad[k],
                    numeric
                );
            }
        }
    }

    #[test]
    fn reports_first_non_finite_parameter() {
        let mut params = Parameters::default();
        assert_eq!(params.first_non_finite(), None);
        params.b2 = f64::NAN;
        params.b3 = f64::INFINITY;
        assert_eq!(params.first_non_finite(), Some("b2"));
    }

    #[test]
    fn array_order_matches_names() {
        let params = Parameters::from_array([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(params.a1, 1.0);
        assert_eq!(params.a6, 6.0);
        assert_eq!(params.b1, 7.0);
        assert_eq!(params.b3, 9.0);
        assert_eq!(params.to_array()[8], 9.0);
    }
}
