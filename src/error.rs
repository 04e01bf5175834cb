use thiserror::Error;

/// Reasons a dataset cannot drive a symbol map.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    #[error("GeoJSON must be a FeatureCollection")]
    NotFeatureCollection,
    #[error("feature collection is empty, no features to inspect")]
    EmptyCollection,
    #[error("no attributes matching '{marker}' found on the first feature")]
    NoAttributes { marker: String },
    #[error("expected attribute '{key}' is missing from the first feature")]
    MissingAttribute { key: String },
    #[error("feature {index} does not have a point geometry")]
    InvalidGeometry { index: usize },
    #[error("dataset has no numeric values for any attribute")]
    NoValues,
    #[error("minimum value {0} is not a positive finite number")]
    NonPositiveMinimum(f64),
}
