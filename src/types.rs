use geo::Point;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::symbols::MinValue;

/// Period label of a time-series attribute, e.g. `2010` for `Yr_2010`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Period(String);

impl Period {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A time-series property name together with the period it encodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AttributeKey {
    pub key: String,
    pub period: Period,
}

impl AttributeKey {
    /// Splits `key` on the first `delimiter`; a key without one is its own period.
    pub fn parse(key: &str, delimiter: &str) -> Self {
        let period = match key.split_once(delimiter) {
            Some((_, rest)) => rest.split(delimiter).next().unwrap_or(rest),
            None => key,
        };
        Self {
            key: key.to_string(),
            period: Period::new(period),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Feature {
    pub label: String,
    pub position: Point<f64>,
    pub values: HashMap<Period, f64>,
}

impl Feature {
    pub fn value(&self, attribute: &AttributeKey) -> Option<f64> {
        self.values.get(&attribute.period).copied()
    }
}

/// A loaded point dataset. Built once during ingestion and never mutated.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: Vec<Feature>,
    pub attributes: Vec<AttributeKey>,
    pub min_value: MinValue,
}
