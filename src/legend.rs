use maud::{html, Markup};
use serde::Serialize;

use crate::types::AttributeKey;

pub const DEFAULT_COLOR: &str = "#000000";

const DECADE_PALETTE: [(&str, &str); 10] = [
    ("2010", "#ff7800"),
    ("2020", "#ff0000"),
    ("2030", "#00ff00"),
    ("2040", "#0000ff"),
    ("2050", "#ffff00"),
    ("2060", "#4f1511"),
    ("2070", "#94e2fe"),
    ("2080", "#093b4d"),
    ("2090", "#4d0940"),
    ("2100", "#d36abf"),
];

/// Period label to color lookup. Unknown periods get the default color.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<(String, String)>,
    default: String,
}

impl Palette {
    pub fn new(colors: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            colors: colors.into_iter().collect(),
            default: DEFAULT_COLOR.to_string(),
        }
    }

    pub fn with_default(mut self, color: String) -> Self {
        self.default = color;
        self
    }

    pub fn color(&self, period: &str) -> &str {
        self.colors
            .iter()
            .find(|(p, _)| p == period)
            .map_or(self.default.as_str(), |(_, c)| c.as_str())
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(
            DECADE_PALETTE
                .iter()
                .map(|(p, c)| ((*p).to_string(), (*c).to_string())),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    pub period: String,
    pub color: String,
}

/// Legend of the whole series. Built once; it does not follow the active period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Legend {
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    pub fn new(attributes: &[AttributeKey], palette: &Palette) -> Self {
        let entries = attributes
            .iter()
            .map(|attr| LegendEntry {
                period: attr.period.to_string(),
                color: palette.color(attr.period.as_str()).to_string(),
            })
            .collect();
        Self { entries }
    }

    pub fn markup(&self) -> Markup {
        html! {
            div class="info legend" {
                ul {
                    @for entry in &self.entries {
                        li {
                            span class="legend-color" style={ "background:" (entry.color) } {}
                            (entry.period)
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attributes(keys: &[&str]) -> Vec<AttributeKey> {
        keys.iter().map(|k| AttributeKey::parse(k, "_")).collect()
    }

    #[test]
    fn known_periods_use_palette_colors() {
        let legend = Legend::new(&attributes(&["Yr_2010", "Yr_2100"]), &Palette::default());

        assert_eq!(legend.entries[0].period, "2010");
        assert_eq!(legend.entries[0].color, "#ff7800");
        assert_eq!(legend.entries[1].color, "#d36abf");
    }

    #[test]
    fn unknown_periods_render_black() {
        let legend = Legend::new(&attributes(&["Yr_1995", "Yr_2020"]), &Palette::default());

        assert_eq!(legend.entries[0].color, DEFAULT_COLOR);
        assert_eq!(legend.entries[1].color, "#ff0000");
    }

    #[test]
    fn markup_lists_every_period_in_order() {
        let legend = Legend::new(&attributes(&["Yr_2020", "Yr_2010"]), &Palette::default());
        let html = legend.markup().into_string();

        assert_eq!(
            html,
            "<div class=\"info legend\"><ul>\
             <li><span class=\"legend-color\" style=\"background:#ff0000\"></span>2020</li>\
             <li><span class=\"legend-color\" style=\"background:#ff7800\"></span>2010</li>\
             </ul></div>"
        );
    }
}
