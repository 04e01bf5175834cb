//! Proportional symbol scaling.
//!
//! Radii follow Flannery's appearance compensation: circle area grows a little
//! faster than the value so that larger symbols are not perceived as smaller
//! than they are.

use serde::Serialize;

use crate::error::DataError;

pub const FLANNERY_SCALE: f64 = 1.0083;
pub const FLANNERY_EXPONENT: f64 = 0.5715;
/// Radius in pixels of a symbol whose value equals the dataset minimum
/// (before the scale factor is applied).
pub const MIN_RADIUS: f64 = 5.0;

/// Dataset-wide minimum value. Always positive and finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MinValue(f64);

impl MinValue {
    pub fn new(value: f64) -> Result<Self, DataError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(DataError::NonPositiveMinimum(value))
        }
    }

    /// Minimum over every defined value. Fails if there are none or the
    /// smallest is not positive.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Result<Self, DataError> {
        let mut min: Option<f64> = None;
        for value in values {
            if value.is_nan() {
                return Err(DataError::NonPositiveMinimum(value));
            }
            min = Some(min.map_or(value, |m| m.min(value)));
        }
        match min {
            Some(min) => Self::new(min),
            None => Err(DataError::NoValues),
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

pub fn radius(value: f64, min_value: MinValue) -> f64 {
    FLANNERY_SCALE * (value / min_value.get()).powf(FLANNERY_EXPONENT) * MIN_RADIUS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(diff < 1e-9, "expected {expected}, got {actual}, diff {diff}");
    }

    #[test]
    fn value_at_minimum_yields_scaled_base_radius() {
        let min = MinValue::new(5.0).unwrap();
        assert_close(radius(5.0, min), 5.0415);

        let min = MinValue::new(0.25).unwrap();
        assert_close(radius(0.25, min), FLANNERY_SCALE * MIN_RADIUS);
    }

    #[test]
    fn radius_is_monotonic_in_value() {
        let min = MinValue::new(3.0).unwrap();
        let radii: Vec<f64> = [3.0, 3.5, 10.0, 250.0, 1.0e6]
            .iter()
            .map(|v| radius(*v, min))
            .collect();

        assert!(radii.windows(2).all(|w| w[0] < w[1]), "{radii:?}");
    }

    #[test]
    fn radius_follows_power_law() {
        let min = MinValue::new(10.0).unwrap();
        let expected = 1.0083 * 4.0_f64.powf(0.5715) * 5.0;
        assert_close(radius(40.0, min), expected);
    }

    #[test]
    fn min_value_rejects_non_positive_and_non_finite() {
        assert_eq!(MinValue::new(0.0), Err(DataError::NonPositiveMinimum(0.0)));
        assert_eq!(MinValue::new(-2.0), Err(DataError::NonPositiveMinimum(-2.0)));
        assert!(MinValue::new(f64::INFINITY).is_err());
        assert!(MinValue::new(f64::NAN).is_err());
    }

    #[test]
    fn min_value_from_values() {
        let min = MinValue::from_values([20.0, 5.0, 15.0, 10.0]).unwrap();
        assert_close(min.get(), 5.0);

        assert_eq!(MinValue::from_values(Vec::new()), Err(DataError::NoValues));
        assert!(MinValue::from_values([4.0, 0.0, 9.0]).is_err());
        assert!(MinValue::from_values([4.0, f64::NAN, 9.0]).is_err());
    }
}
