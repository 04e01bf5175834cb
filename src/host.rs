//! The map surface symbols and controls are drawn on.
//!
//! `MapHost` is the seam between the symbol logic and whatever displays it.
//! `SceneHost` keeps everything in memory; the viewer server serializes it for
//! the browser and the frame renderer rasterizes it.

use geo::Point;
use serde::Serialize;

use crate::config::SymbolStyle;
use crate::controls::Control;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl From<Point<f64>> for LatLng {
    fn from(point: Point<f64>) -> Self {
        Self {
            lat: point.y(),
            lng: point.x(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileLayer {
    pub url_template: String,
    pub attribution: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MarkerId(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub html: String,
    /// Pixel offset [x, y] from the marker anchor.
    pub offset: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircleMarker {
    pub position: LatLng,
    pub radius: f64,
    pub style: SymbolStyle,
    pub popup: Option<Popup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

pub trait MapHost {
    fn set_view(&mut self, view: MapView);
    fn add_tile_layer(&mut self, layer: TileLayer);
    fn add_marker(&mut self, marker: CircleMarker) -> MarkerId;
    fn set_radius(&mut self, id: MarkerId, radius: f64);
    fn set_popup(&mut self, id: MarkerId, popup: Popup);
    fn remove_marker(&mut self, id: MarkerId);
    fn add_control(&mut self, corner: Corner, control: Control);
    fn remove_control(&mut self, corner: Corner);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedControl {
    pub corner: Corner,
    #[serde(flatten)]
    pub control: Control,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedMarker {
    pub id: MarkerId,
    #[serde(flatten)]
    pub marker: CircleMarker,
}

/// In-memory map surface.
#[derive(Debug, Clone, Default)]
pub struct SceneHost {
    view: Option<MapView>,
    tile_layers: Vec<TileLayer>,
    // Removed markers leave a hole so ids stay stable.
    markers: Vec<Option<CircleMarker>>,
    controls: Vec<PlacedControl>,
}

impl SceneHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> Option<MapView> {
        self.view
    }

    pub fn tile_layers(&self) -> &[TileLayer] {
        &self.tile_layers
    }

    pub fn marker(&self, id: MarkerId) -> Option<&CircleMarker> {
        self.markers.get(id.0).and_then(Option::as_ref)
    }

    pub fn markers(&self) -> impl Iterator<Item = PlacedMarker> + '_ {
        self.markers.iter().enumerate().filter_map(|(i, slot)| {
            slot.as_ref().map(|marker| PlacedMarker {
                id: MarkerId(i),
                marker: marker.clone(),
            })
        })
    }

    pub fn marker_count(&self) -> usize {
        self.markers.iter().filter(|m| m.is_some()).count()
    }

    pub fn controls(&self) -> &[PlacedControl] {
        &self.controls
    }
}

impl MapHost for SceneHost {
    fn set_view(&mut self, view: MapView) {
        self.view = Some(view);
    }

    fn add_tile_layer(&mut self, layer: TileLayer) {
        self.tile_layers.push(layer);
    }

    fn add_marker(&mut self, marker: CircleMarker) -> MarkerId {
        self.markers.push(Some(marker));
        MarkerId(self.markers.len() - 1)
    }

    fn set_radius(&mut self, id: MarkerId, radius: f64) {
        if let Some(Some(marker)) = self.markers.get_mut(id.0) {
            marker.radius = radius;
        }
    }

    fn set_popup(&mut self, id: MarkerId, popup: Popup) {
        if let Some(Some(marker)) = self.markers.get_mut(id.0) {
            marker.popup = Some(popup);
        }
    }

    fn remove_marker(&mut self, id: MarkerId) {
        if let Some(slot) = self.markers.get_mut(id.0) {
            *slot = None;
        }
    }

    fn add_control(&mut self, corner: Corner, control: Control) {
        self.controls.push(PlacedControl { corner, control });
    }

    fn remove_control(&mut self, corner: Corner) {
        self.controls.retain(|placed| placed.corner != corner);
    }
}
