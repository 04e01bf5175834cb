//! Time-series proportional symbol maps from GeoJSON point data.

pub mod app;
pub mod config;
pub mod controls;
pub mod data;
pub mod error;
pub mod host;
pub mod layer;
pub mod legend;
pub mod popup;
pub mod render;
pub mod sequence;
pub mod server;
pub mod symbols;
pub mod types;
