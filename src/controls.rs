use maud::{html, Markup};
use serde::Serialize;

use crate::legend::Legend;

/// User input on the sequence control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceEvent {
    Forward,
    Reverse,
    Slide(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slider {
    pub min: usize,
    pub max: usize,
    pub step: usize,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepButton {
    pub id: &'static str,
    pub title: &'static str,
}

/// Slider plus reverse/forward buttons over `len` attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceControl {
    pub slider: Slider,
    pub buttons: [StepButton; 2],
}

impl SequenceControl {
    pub fn new(len: usize) -> Self {
        Self {
            slider: Slider {
                min: 0,
                max: len.saturating_sub(1),
                step: 1,
                value: 0,
            },
            buttons: [
                StepButton {
                    id: "reverse",
                    title: "Reverse",
                },
                StepButton {
                    id: "forward",
                    title: "Forward",
                },
            ],
        }
    }

    /// Maps a DOM-style input (button id or slider value) to an event.
    pub fn event_for(&self, target: &str, value: Option<&str>) -> Option<SequenceEvent> {
        match target {
            "forward" => Some(SequenceEvent::Forward),
            "reverse" => Some(SequenceEvent::Reverse),
            "range-slider" => value
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|i| (self.slider.min..=self.slider.max).contains(i))
                .map(SequenceEvent::Slide),
            _ => None,
        }
    }

    pub fn markup(&self) -> Markup {
        html! {
            div class="sequence-control-container" {
                input class="range-slider" type="range"
                    min=(self.slider.min) max=(self.slider.max)
                    step=(self.slider.step) value=(self.slider.value);
                @for button in &self.buttons {
                    button class="step" id=(button.id) title=(button.title) { (button.title) }
                }
            }
        }
    }
}

/// A positioned map control, as handed to `MapHost::add_control`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Control {
    Sequence {
        #[serde(flatten)]
        control: SequenceControl,
        html: String,
    },
    Legend {
        #[serde(flatten)]
        legend: Legend,
        html: String,
    },
}

impl From<SequenceControl> for Control {
    fn from(control: SequenceControl) -> Self {
        let html = control.markup().into_string();
        Self::Sequence { control, html }
    }
}

impl From<Legend> for Control {
    fn from(legend: Legend) -> Self {
        let html = legend.markup().into_string();
        Self::Legend { legend, html }
    }
}
