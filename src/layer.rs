use tracing::{debug, info};

use crate::config::{PopupConfig, SymbolStyle};
use crate::host::{CircleMarker, MapHost, MarkerId, Popup};
use crate::popup::PopupContent;
use crate::symbols::{radius, MIN_RADIUS};
use crate::types::{AttributeKey, Dataset};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SymbolMarker {
    id: MarkerId,
    feature: usize,
}

/// The proportional symbols of one dataset, one marker per feature.
#[derive(Debug, Clone)]
pub struct SymbolLayer {
    markers: Vec<SymbolMarker>,
    popup: PopupConfig,
}

impl SymbolLayer {
    /// Adds a marker for every feature, sized by the first attribute.
    pub fn build<H: MapHost>(
        host: &mut H,
        dataset: &Dataset,
        style: &SymbolStyle,
        popup: &PopupConfig,
    ) -> Self {
        let markers = match dataset.attributes.first() {
            Some(attribute) => dataset
                .features
                .iter()
                .enumerate()
                .map(|(index, feature)| {
                    let radius = feature
                        .value(attribute)
                        .map_or(MIN_RADIUS, |v| radius(v, dataset.min_value));
                    let content = PopupContent::new(popup, feature, attribute);

                    let id = host.add_marker(CircleMarker {
                        position: feature.position.into(),
                        radius,
                        style: style.clone(),
                        popup: Some(bind_popup(content, radius)),
                    });
                    SymbolMarker { id, feature: index }
                })
                .collect(),
            None => Vec::new(),
        };

        info!(markers = markers.len(), "Built symbol layer");
        Self {
            markers,
            popup: popup.clone(),
        }
    }

    /// Resizes and re-popups every marker with a value for `attribute`.
    /// Markers without one keep their previous state. Returns the number
    /// of markers changed.
    pub fn update<H: MapHost>(&self, host: &mut H, dataset: &Dataset, attribute: &AttributeKey) -> usize {
        let mut updated = 0;
        for marker in &self.markers {
            let Some(feature) = dataset.features.get(marker.feature) else {
                continue;
            };
            let Some(value) = feature.value(attribute) else {
                continue;
            };

            let radius = radius(value, dataset.min_value);
            host.set_radius(marker.id, radius);
            let content = PopupContent::new(&self.popup, feature, attribute);
            host.set_popup(marker.id, bind_popup(content, radius));
            updated += 1;
        }

        debug!(attribute = %attribute.key, updated, "Updated symbols");
        updated
    }

    pub fn clear<H: MapHost>(&mut self, host: &mut H) {
        for marker in self.markers.drain(..) {
            host.remove_marker(marker.id);
        }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Marker drawn for the feature at `feature` index.
    pub fn marker_for(&self, feature: usize) -> Option<MarkerId> {
        self.markers
            .iter()
            .find(|m| m.feature == feature)
            .map(|m| m.id)
    }
}

fn bind_popup(content: PopupContent, radius: f64) -> Popup {
    Popup {
        html: content.formatted,
        offset: [0.0, -radius],
    }
}
