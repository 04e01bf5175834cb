use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::legend::Palette;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub symbols: SymbolStyle,
    #[serde(default)]
    pub popup: PopupConfig,
    #[serde(default)]
    pub legend: LegendConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub geojson: PathBuf,
    #[serde(default = "default_label_field")]
    pub label_field: String,
    /// Substring that marks a property as a time-series attribute.
    #[serde(default = "default_attribute_marker")]
    pub attribute_marker: String,
    /// Separator between the attribute prefix and the period label.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    pub periods: Option<PeriodRange>,
}

/// Expected period range, e.g. 2010..=2100 step 10 for `Yr_2010`..`Yr_2100`.
#[derive(Debug, Deserialize, Clone)]
pub struct PeriodRange {
    pub prefix: String,
    pub start: i32,
    pub end: i32,
    #[serde(default = "default_step")]
    pub step: i32,
}

impl PeriodRange {
    pub fn keys(&self, delimiter: &str) -> Vec<String> {
        let step = usize::try_from(self.step.max(1)).unwrap_or(1);
        (self.start..=self.end)
            .step_by(step)
            .map(|year| format!("{}{}{}", self.prefix, delimiter, year))
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    /// [lat, lon]
    pub center: [f64; 2],
    pub zoom: u8,
    pub tile_url: String,
    pub attribution: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: [0.0, 0.0],
            zoom: 2,
            tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "&copy; <a href=\"http://www.openstreetmap.org/copyright\">OpenStreetMap contributors</a>"
                .to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, serde::Serialize)]
#[serde(default)]
pub struct SymbolStyle {
    pub fill_color: String,
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
    pub fill_opacity: f64,
}

impl Default for SymbolStyle {
    fn default() -> Self {
        Self {
            fill_color: "#ff7800".to_string(),
            color: "#000000".to_string(),
            weight: 1.0,
            opacity: 1.0,
            fill_opacity: 0.8,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PopupConfig {
    pub place_title: String,
    pub value_title: String,
    pub unit: String,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            place_title: "Town".to_string(),
            value_title: "Population Density".to_string(),
            unit: "per square kilometer".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LegendConfig {
    /// Overrides the built-in decade palette when non-empty.
    pub palette: Vec<PaletteEntry>,
    pub default_color: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaletteEntry {
    pub period: String,
    pub color: String,
}

impl LegendConfig {
    pub fn palette(&self) -> Palette {
        let mut palette = if self.palette.is_empty() {
            Palette::default()
        } else {
            Palette::new(
                self.palette
                    .iter()
                    .map(|e| (e.period.clone(), e.color.clone())),
            )
        };
        if let Some(color) = &self.default_color {
            palette = palette.with_default(color.clone());
        }
        palette
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub frame_dir: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            frame_dir: PathBuf::from("output/frames"),
            width: 1024,
            height: 768,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            static_dir: PathBuf::from("static"),
        }
    }
}

fn default_label_field() -> String {
    "Town".to_string()
}

fn default_attribute_marker() -> String {
    "Yr".to_string()
}

fn default_delimiter() -> String {
    "_".to_string()
}

fn default_step() -> i32 {
    1
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        if config.input.delimiter.is_empty() {
            bail!("input.delimiter must not be empty");
        }
        if config.input.attribute_marker.is_empty() {
            bail!("input.attribute_marker must not be empty");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = AppConfig::from_toml("[input]\ngeojson = \"data/towns.geojson\"\n").unwrap();

        assert_eq!(config.input.label_field, "Town");
        assert_eq!(config.input.attribute_marker, "Yr");
        assert_eq!(config.input.delimiter, "_");
        assert!(config.input.periods.is_none());
        assert_eq!(config.map.zoom, 2);
        assert_eq!(config.symbols.fill_color, "#ff7800");
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn period_range_expands_to_keys() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            geojson = "attendance.geojson"
            label_field = "Stadium"
            periods = { prefix = "Yr", start = 2010, end = 2030, step = 10 }

            [popup]
            value_title = "Attendance"
            unit = "fans"
            "#,
        )
        .unwrap();

        let range = config.input.periods.as_ref().unwrap();
        assert_eq!(range.keys("_"), vec!["Yr_2010", "Yr_2020", "Yr_2030"]);
        assert_eq!(config.popup.value_title, "Attendance");
        assert_eq!(config.popup.place_title, "Town");
    }

    #[test]
    fn legend_palette_override_keeps_custom_default() {
        let config = AppConfig::from_toml(
            r##"
            [input]
            geojson = "x.geojson"

            [legend]
            default_color = "#cccccc"
            palette = [{ period = "1990", color = "#123456" }]
            "##,
        )
        .unwrap();

        let palette = config.legend.palette();
        assert_eq!(palette.color("1990"), "#123456");
        assert_eq!(palette.color("2010"), "#cccccc");
    }

    #[test]
    fn partial_map_section_keeps_tile_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            geojson = "x.geojson"

            [map]
            center = [1.0, 2.0]
            zoom = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.map.center, [1.0, 2.0]);
        assert_eq!(config.map.zoom, 5);
        assert_eq!(config.map.tile_url, MapConfig::default().tile_url);
        assert_eq!(config.map.attribution, MapConfig::default().attribution);
    }

    #[test]
    fn empty_delimiter_or_marker_is_rejected() {
        let err = AppConfig::from_toml("[input]\ngeojson = \"x.geojson\"\ndelimiter = \"\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("delimiter"), "{err}");

        let err =
            AppConfig::from_toml("[input]\ngeojson = \"x.geojson\"\nattribute_marker = \"\"\n")
                .unwrap_err();
        assert!(err.to_string().contains("attribute_marker"), "{err}");
    }
}
