use crate::config::{AppConfig, InputConfig};
use crate::error::DataError;
use crate::symbols::MinValue;
use crate::types::{AttributeKey, Dataset, Feature};
use anyhow::{Context, Result};
use geojson::{GeoJson, JsonObject};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use tracing::{debug, info, warn};

pub fn load_dataset(config: &AppConfig) -> Result<Dataset> {
    let path = &config.input.geojson;
    info!(?path, "Loading GeoJSON");
    let file = File::open(path).with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let reader = BufReader::new(file);

    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;
    let dataset = parse_dataset(geojson, &config.input)
        .with_context(|| format!("Unusable dataset in {:?}", path))?;

    info!(
        features = dataset.features.len(),
        attributes = dataset.attributes.len(),
        min_value = dataset.min_value.get(),
        "Loaded dataset"
    );
    Ok(dataset)
}

pub fn parse_dataset(geojson: GeoJson, input: &InputConfig) -> Result<Dataset, DataError> {
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(DataError::NotFeatureCollection),
    };

    let attributes = extract_attributes(
        &collection.features,
        &input.attribute_marker,
        &input.delimiter,
    )?;

    if let Some(range) = &input.periods {
        for key in range.keys(&input.delimiter) {
            if !attributes.iter().any(|a| a.key == key) {
                return Err(DataError::MissingAttribute { key });
            }
        }
    }

    let mut features = Vec::with_capacity(collection.features.len());
    for (index, feature) in collection.features.into_iter().enumerate() {
        let position = match feature.geometry {
            Some(geometry) => match geo::Geometry::<f64>::try_from(geometry.value) {
                Ok(geo::Geometry::Point(point)) => point,
                _ => return Err(DataError::InvalidGeometry { index }),
            },
            None => return Err(DataError::InvalidGeometry { index }),
        };

        let empty = JsonObject::new();
        let properties = feature.properties.as_ref().unwrap_or(&empty);

        let label = match properties.get(&input.label_field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                debug!(index, field = %input.label_field, "Feature has no label");
                String::new()
            }
        };

        let values: HashMap<_, _> = attributes
            .iter()
            .filter_map(|attr| {
                properties
                    .get(&attr.key)
                    .and_then(numeric_value)
                    .map(|v| (attr.period.clone(), v))
            })
            .collect();

        features.push(Feature {
            label,
            position,
            values,
        });
    }

    let min_value = calculate_min_value(&features)?;

    Ok(Dataset {
        features,
        attributes,
        min_value,
    })
}

/// Time-series attribute keys of the first feature, in property order.
pub fn extract_attributes(
    features: &[geojson::Feature],
    marker: &str,
    delimiter: &str,
) -> Result<Vec<AttributeKey>, DataError> {
    let first = features.first().ok_or(DataError::EmptyCollection)?;

    let mut seen = HashSet::new();
    let mut attributes = Vec::new();
    if let Some(properties) = &first.properties {
        for name in properties.keys().filter(|name| name.contains(marker)) {
            let attribute = AttributeKey::parse(name, delimiter);
            if !seen.insert(attribute.period.clone()) {
                warn!(key = %name, period = %attribute.period, "Skipping attribute with duplicate period");
                continue;
            }
            attributes.push(attribute);
        }
    }

    if attributes.is_empty() {
        return Err(DataError::NoAttributes {
            marker: marker.to_string(),
        });
    }

    debug!(?attributes, "Extracted attributes");
    Ok(attributes)
}

pub fn calculate_min_value(features: &[Feature]) -> Result<MinValue, DataError> {
    MinValue::from_values(features.iter().flat_map(|f| f.values.values().copied()))
}

/// Numbers or numeric strings; non-finite values count as missing.
fn numeric_value(value: &Value) -> Option<f64> {
    let value = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    value.filter(|v: &f64| v.is_finite())
}
