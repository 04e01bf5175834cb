use maud::html;

use crate::config::PopupConfig;
use crate::types::{AttributeKey, Feature};

/// Popup body for one feature under one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupContent {
    pub label: String,
    pub period: String,
    pub value: Option<f64>,
    pub formatted: String,
}

impl PopupContent {
    pub fn new(config: &PopupConfig, feature: &Feature, attribute: &AttributeKey) -> Self {
        let value = feature.value(attribute);
        let period = attribute.period.to_string();

        let formatted = html! {
            p { b { (config.place_title) ":" } " " (feature.label) }
            p {
                b { (config.value_title) " in " (period) ":" } " "
                @match value {
                    Some(v) => { (format_value(v)) " " (config.unit) }
                    None => { "No data" }
                }
            }
        }
        .into_string();

        Self {
            label: feature.label.clone(),
            period,
            value,
            formatted,
        }
    }
}

/// Integers print without a fractional part, everything else as given.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
