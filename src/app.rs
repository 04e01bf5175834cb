use thiserror::Error;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::controls::{SequenceControl, SequenceEvent};
use crate::data;
use crate::host::{Corner, LatLng, MapHost, MapView, TileLayer};
use crate::layer::SymbolLayer;
use crate::legend::Legend;
use crate::sequence::SequenceController;
use crate::types::{AttributeKey, Dataset};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("index {index} is outside the slider range 0..={max}")]
    IndexOutOfRange { index: usize, max: usize },
    #[error("no dataset is loaded")]
    NoDataset,
}

/// Everything that exists only once a dataset has loaded.
#[derive(Debug)]
struct Series {
    dataset: Dataset,
    layer: SymbolLayer,
    sequence: SequenceController,
    legend: Legend,
}

/// Application state: the map surface plus the loaded series, if any.
#[derive(Debug)]
pub struct MapApp<H: MapHost> {
    config: AppConfig,
    host: H,
    series: Option<Series>,
}

impl<H: MapHost> MapApp<H> {
    /// Sets up the base map only: view and tile layer.
    pub fn new(config: &AppConfig, mut host: H) -> Self {
        let [lat, lng] = config.map.center;
        host.set_view(MapView {
            center: LatLng { lat, lng },
            zoom: config.map.zoom,
        });
        host.add_tile_layer(TileLayer {
            url_template: config.map.tile_url.clone(),
            attribution: config.map.attribution.clone(),
        });

        Self {
            config: config.clone(),
            host,
            series: None,
        }
    }

    /// Base map plus the configured dataset. A dataset that fails to load is
    /// logged and the map stays tile-only.
    pub fn open(config: &AppConfig, host: H) -> Self {
        let mut app = Self::new(config, host);
        match data::load_dataset(config) {
            Ok(dataset) => app.load(dataset),
            Err(e) => error!("Failed to load dataset, showing base map only: {:#}", e),
        }
        app
    }

    /// Draws symbols, sequence control and legend for `dataset`, replacing any
    /// previously loaded series.
    pub fn load(&mut self, dataset: Dataset) {
        if let Some(mut previous) = self.series.take() {
            previous.layer.clear(&mut self.host);
            self.host.remove_control(Corner::BottomRight);
            self.host.remove_control(Corner::BottomLeft);
        }

        let layer = SymbolLayer::build(
            &mut self.host,
            &dataset,
            &self.config.symbols,
            &self.config.popup,
        );
        let sequence = SequenceController::new(dataset.attributes.len());
        let legend = Legend::new(&dataset.attributes, &self.config.legend.palette());

        self.host.add_control(
            Corner::BottomRight,
            SequenceControl::new(dataset.attributes.len()).into(),
        );
        self.host.add_control(Corner::BottomLeft, legend.clone().into());

        info!(
            attributes = dataset.attributes.len(),
            markers = layer.len(),
            "Series ready"
        );
        self.series = Some(Series {
            dataset,
            layer,
            sequence,
            legend,
        });
    }

    /// Applies one sequence event and updates the symbols before returning.
    pub fn handle(&mut self, event: SequenceEvent) -> Result<&AttributeKey, AppError> {
        let Series {
            dataset,
            layer,
            sequence,
            ..
        } = self.series.as_mut().ok_or(AppError::NoDataset)?;

        if let SequenceEvent::Slide(index) = event {
            let max = sequence.len() - 1;
            if index > max {
                return Err(AppError::IndexOutOfRange { index, max });
            }
        }

        let host = &mut self.host;
        let index = sequence.apply(event, |index| {
            layer.update(host, dataset, &dataset.attributes[index]);
        });
        Ok(&dataset.attributes[index])
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.series.as_ref().map(|s| &s.dataset)
    }

    pub fn layer(&self) -> Option<&SymbolLayer> {
        self.series.as_ref().map(|s| &s.layer)
    }

    pub fn legend(&self) -> Option<&Legend> {
        self.series.as_ref().map(|s| &s.legend)
    }

    /// The sequence control for the loaded series, for mapping raw inputs.
    pub fn sequence_control(&self) -> Option<SequenceControl> {
        self.series
            .as_ref()
            .map(|s| SequenceControl::new(s.sequence.len()))
    }

    pub fn active_index(&self) -> Option<usize> {
        self.series.as_ref().map(|s| s.sequence.index())
    }

    pub fn active_attribute(&self) -> Option<&AttributeKey> {
        self.series
            .as_ref()
            .map(|s| &s.dataset.attributes[s.sequence.index()])
    }
}
