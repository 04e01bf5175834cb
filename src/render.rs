use crate::app::MapApp;
use crate::config::AppConfig;
use crate::controls::SequenceEvent;
use crate::host::{MapView, PlacedMarker, SceneHost};
use crate::types::Dataset;
use anyhow::{anyhow, Context, Result};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use std::f64::consts::PI;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

// Constants for Web Mercator
const TILE_SIZE: u32 = 256;
const BACKGROUND: Rgba<u8> = Rgba([242, 239, 233, 255]);

/// One period's markers, ready to rasterize.
struct Frame {
    index: usize,
    period: String,
    markers: Vec<PlacedMarker>,
}

/// Writes one PNG per period plus `legend.html` into the frame directory.
pub fn render_frames(config: &AppConfig, dataset: Dataset) -> Result<Vec<PathBuf>> {
    let out_dir = &config.output.frame_dir;
    fs::create_dir_all(out_dir).with_context(|| format!("Failed to create frame directory: {:?}", out_dir))?;

    let mut app = MapApp::new(config, SceneHost::new());
    app.load(dataset);
    let view = app
        .host()
        .view()
        .ok_or_else(|| anyhow!("Map view was not set"))?;

    // Step through the series the way a user would, snapshotting each state.
    let count = app.dataset().map_or(0, |d| d.attributes.len());
    let mut frames = Vec::with_capacity(count);
    for index in 0..count {
        let attribute = app.handle(SequenceEvent::Slide(index))?;
        frames.push(Frame {
            index,
            period: attribute.period.to_string(),
            markers: app.host().markers().collect(),
        });
    }

    if let Some(legend) = app.legend() {
        let legend_path = out_dir.join("legend.html");
        fs::write(&legend_path, legend.markup().into_string())
            .with_context(|| format!("Failed to write legend: {:?}", legend_path))?;
    }

    info!(frames = frames.len(), dir = ?out_dir, "Rendering frames");
    let (width, height) = (config.output.width, config.output.height);

    let paths: Vec<PathBuf> = frames
        .par_iter()
        .filter_map(|frame| {
            let img = render_frame(&view, width, height, &frame.markers);
            let path = out_dir.join(format!("{:02}_{}.png", frame.index, frame.period));
            match img.save(&path) {
                Ok(()) => Some(path),
                Err(e) => {
                    error!("Failed to save frame {:?}: {:?}", path, e);
                    None
                }
            }
        })
        .collect();

    Ok(paths)
}

fn render_frame(view: &MapView, width: u32, height: u32, markers: &[PlacedMarker]) -> RgbaImage {
    let mut img = RgbaImage::from_pixel(width, height, BACKGROUND);
    let (cx, cy) = lat_lon_to_world_pixel(view.center.lat, view.center.lng, view.zoom);
    let origin = (cx - f64::from(width) / 2.0, cy - f64::from(height) / 2.0);

    // Larger symbols first so small ones stay visible on top.
    let mut ordered: Vec<&PlacedMarker> = markers.iter().collect();
    ordered.sort_by(|a, b| b.marker.radius.total_cmp(&a.marker.radius));

    for placed in ordered {
        let marker = &placed.marker;
        let (wx, wy) = lat_lon_to_world_pixel(marker.position.lat, marker.position.lng, view.zoom);
        let style = &marker.style;
        draw_circle(
            &mut img,
            (wx - origin.0, wy - origin.1),
            marker.radius,
            with_alpha(hex_to_rgba(&style.fill_color), style.fill_opacity),
            with_alpha(hex_to_rgba(&style.color), style.opacity),
            style.weight,
        );
    }

    img
}

/// Fills a circle and strokes its outline, blending over what is there.
fn draw_circle(
    img: &mut RgbaImage,
    center: (f64, f64),
    radius: f64,
    fill: Rgba<u8>,
    stroke: Rgba<u8>,
    weight: f64,
) {
    let outer = radius + weight / 2.0;
    let inner = (radius - weight / 2.0).max(0.0);
    let (w, h) = (f64::from(img.width()), f64::from(img.height()));

    let x0 = (center.0 - outer).floor().max(0.0);
    let x1 = (center.0 + outer).ceil().min(w - 1.0);
    let y0 = (center.1 - outer).floor().max(0.0);
    let y1 = (center.1 + outer).ceil().min(h - 1.0);
    if x0 > x1 || y0 > y1 {
        return;
    }

    for py in (y0 as u32)..=(y1 as u32) {
        for px in (x0 as u32)..=(x1 as u32) {
            let dx = f64::from(px) + 0.5 - center.0;
            let dy = f64::from(py) + 0.5 - center.1;
            let dist = (dx * dx + dy * dy).sqrt();

            let color = if dist <= inner {
                fill
            } else if dist <= outer && weight > 0.0 {
                stroke
            } else if dist <= radius {
                fill
            } else {
                continue;
            };
            blend(img.get_pixel_mut(px, py), color);
        }
    }
}

fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let alpha = f64::from(src[3]) / 255.0;
    for c in 0..3 {
        let mixed = f64::from(src[c]) * alpha + f64::from(dst[c]) * (1.0 - alpha);
        dst[c] = mixed.round() as u8;
    }
    dst[3] = 255;
}

fn with_alpha(mut color: Rgba<u8>, opacity: f64) -> Rgba<u8> {
    color[3] = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    color
}

fn hex_to_rgba(hex: &str) -> Rgba<u8> {
    let hex = hex.trim_start_matches('#');
    // Expand shorthand like "#000".
    let hex: String = if hex.len() == 3 {
        hex.chars().flat_map(|c| [c, c]).collect()
    } else {
        hex.to_string()
    };
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .unwrap_or(0)
    };
    Rgba([channel(0..2), channel(2..4), channel(4..6), 255])
}

// Coordinate conversions
fn lat_lon_to_world_pixel(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
    let n = 2.0_f64.powi(i32::from(zoom)) * f64::from(TILE_SIZE);
    let x = (lon + 180.0) / 360.0 * n;
    let lat_rad = lat.to_radians();
    let y = (1.0 - (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() / PI) / 2.0 * n;
    (x, y)
}
